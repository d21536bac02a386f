//! # ModeController
//!
//! Owns the single active editing mode.
//!
//! ## Transitions
//!
//! ```text
//!            toggle(m), m == active
//!   active ─────────────────────────► Normal
//!
//!            toggle(m), m != active
//!   active ──► teardown(active) ──► setup(m) ──► m
//! ```
//!
//! Teardown always completes before setup starts. It runs the manager's
//! own `deactivate`, then removes everything the mode left in the shared
//! registries: its listeners, its pointer-move handler and its inline
//! style overrides. The mode's control is repainted to the neutral state.

use crate::image::ImageEditManager;
use crate::inspect::InspectManager;
use crate::listeners::{Owner, PointerHandler};
use crate::region::RegionEditManager;
use crate::session::EditorSession;
use crate::text::TextEditManager;
use crate::ui;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// No editing mode active
    #[default]
    Normal,
    Inspect,
    RegionEdit,
    TextEdit,
    ImageEdit,
}

impl Mode {
    /// The four toggleable modes, in control order
    pub const EDITING: [Mode; 4] = [
        Mode::Inspect,
        Mode::RegionEdit,
        Mode::TextEdit,
        Mode::ImageEdit,
    ];

    pub fn is_editing(self) -> bool {
        self != Mode::Normal
    }
}

/// Mode-specific setup and teardown
pub trait ModeBehavior {
    fn mode(&self) -> Mode;

    /// Pointer-move handler to bind while active, if any
    fn pointer_handler(&self) -> Option<PointerHandler>;

    fn activate(&mut self, session: &mut EditorSession);

    /// Undo mode-specific state. Listeners and ledger entries owned by the
    /// mode are cleared by the controller afterwards.
    fn deactivate(&mut self, session: &mut EditorSession);
}

/// One manager per editing mode
#[derive(Debug, Default)]
pub struct Managers {
    pub inspect: InspectManager,
    pub region: RegionEditManager,
    pub text: TextEditManager,
    pub image: ImageEditManager,
}

impl Managers {
    pub fn behavior_mut(&mut self, mode: Mode) -> Option<&mut dyn ModeBehavior> {
        match mode {
            Mode::Normal => None,
            Mode::Inspect => Some(&mut self.inspect as &mut dyn ModeBehavior),
            Mode::RegionEdit => Some(&mut self.region as &mut dyn ModeBehavior),
            Mode::TextEdit => Some(&mut self.text as &mut dyn ModeBehavior),
            Mode::ImageEdit => Some(&mut self.image as &mut dyn ModeBehavior),
        }
    }
}

/// Planned effect of a toggle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub leave: Option<Mode>,
    pub enter: Option<Mode>,
}

#[derive(Debug, Default)]
pub struct ModeController {
    active: Mode,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Mode {
        self.active
    }

    pub fn transition(&self, requested: Mode) -> Transition {
        let leave = Some(self.active).filter(|m| m.is_editing());
        let enter = Some(requested).filter(|m| m.is_editing() && *m != self.active);
        Transition { leave, enter }
    }

    /// Toggle `requested`, returning the mode active afterwards
    pub fn toggle(
        &mut self,
        requested: Mode,
        session: &mut EditorSession,
        managers: &mut Managers,
    ) -> Mode {
        let transition = self.transition(requested);
        debug!(from = ?self.active, requested = ?requested, ?transition, "mode toggle");

        if let Some(leaving) = transition.leave {
            self.teardown(leaving, session, managers);
        }
        if let Some(entering) = transition.enter {
            self.setup(entering, session, managers);
        }
        self.active
    }

    fn teardown(&mut self, mode: Mode, session: &mut EditorSession, managers: &mut Managers) {
        if let Some(behavior) = managers.behavior_mut(mode) {
            behavior.deactivate(session);
        }
        session.listeners.unbind_pointer_move();
        let listeners = session.listeners.unbind_owner(Owner::Mode(mode));
        let styles = session.ledger.restore_owner(&mut session.doc, mode);
        ui::paint_mode_button(&mut session.doc, mode, false);
        self.active = Mode::Normal;
        info!(mode = ?mode, listeners, styles, "mode deactivated");
    }

    fn setup(&mut self, mode: Mode, session: &mut EditorSession, managers: &mut Managers) {
        self.active = mode;
        ui::paint_mode_button(&mut session.doc, mode, true);
        if let Some(behavior) = managers.behavior_mut(mode) {
            behavior.activate(session);
            if let Some(handler) = behavior.pointer_handler() {
                session
                    .listeners
                    .bind_pointer_move(handler, Owner::Mode(mode));
            }
        }
        info!(
            mode = ?mode,
            listeners = session.listeners.count_owned(Owner::Mode(mode)),
            "mode activated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_planning() {
        let mut controller = ModeController::new();
        assert_eq!(
            controller.transition(Mode::Inspect),
            Transition {
                leave: None,
                enter: Some(Mode::Inspect)
            }
        );

        controller.active = Mode::Inspect;
        assert_eq!(
            controller.transition(Mode::Inspect),
            Transition {
                leave: Some(Mode::Inspect),
                enter: None
            }
        );
        assert_eq!(
            controller.transition(Mode::TextEdit),
            Transition {
                leave: Some(Mode::Inspect),
                enter: Some(Mode::TextEdit)
            }
        );
        assert_eq!(
            controller.transition(Mode::Normal),
            Transition {
                leave: Some(Mode::Inspect),
                enter: None
            }
        );
    }
}

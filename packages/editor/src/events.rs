//! Input events fed to the editor by the host, and what the host gets
//! back.

use crate::host::HostCommand;
use crate::reads::SelectedFile;
use livepage_dom::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Pointer moved to viewport coordinates
    PointerMove { x: f64, y: f64 },
    Click { target: NodeId },
    /// Content of a live-editable element changed
    Input { target: NodeId },
    /// A form control changed; `files` holds a file input's selection
    Change {
        target: NodeId,
        files: Vec<SelectedFile>,
    },
    /// The embedding frame posted a command
    Host(HostCommand),
}

/// Result of dispatching one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The host must not run the event's default action (navigation, ...)
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    /// Number of handlers that ran
    pub handled: usize,
}

impl DispatchOutcome {
    pub(crate) fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub(crate) fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

/// Message the host should surface to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Alert(String),
    Warning(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Alert(m) | Notice::Warning(m) => m,
        }
    }
}

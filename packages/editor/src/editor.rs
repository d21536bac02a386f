//! # Editor
//!
//! The host-facing facade. A host (browser shim, headless CLI, test)
//! builds one `Editor` per page, feeds it [`Event`]s, pumps file reads
//! with [`Editor::settle`], and shows whatever [`Notice`]s it queues.
//!
//! ## Event flow
//!
//! ```text
//! PointerMove ──► active mode's pointer handler
//!
//! Click / Input / Change
//!     target ──► parent ──► ... ──► root
//!       each node: run its bound handlers for the event kind,
//!       stop climbing once a handler stopped propagation
//!
//! Click that reached the document
//!     ──► Inspect swallows it ──► HostMessage::Edit queued for the frame
//!
//! Host(SwitchMode) ──► ModeController, no-op if already in that mode
//! ```

use crate::errors::{EditorError, EditorResult};
use crate::events::{DispatchOutcome, Event, Notice};
use crate::geometry::Layout;
use crate::host::{HostCommand, HostMessage};
use crate::listeners::{EventKind, Handler, ListenerRegistry, Owner, PointerHandler};
use crate::mode::{Managers, Mode, ModeController};
use crate::reads::{FileSource, SelectedFile};
use crate::replay::{self, ReplayReport};
use crate::session::EditorSession;
use crate::store::{PersistenceStore, Storage};
use crate::ui::{self, *};
use crate::upload::{self, GallerySubMode, UploadSession};
use livepage_dom::{Document, NodeId};
use tracing::{debug, info, warn};

pub struct Editor {
    session: EditorSession,
    controller: ModeController,
    managers: Managers,
    replay: ReplayReport,
    /// Messages for the embedding frame, oldest first
    outbox: Vec<HostMessage>,
}

impl Editor {
    /// Attach the overlay to `doc`: create the mode controls, wire the
    /// static overlay markup, hydrate the store and replay saved edits.
    pub fn new(
        doc: Document,
        layout: Box<dyn Layout>,
        storage: Box<dyn Storage>,
        files: Box<dyn FileSource>,
    ) -> EditorResult<Self> {
        let body = doc.body().ok_or(EditorError::MissingBody)?;
        let mut store = PersistenceStore::new(storage);
        store.load();

        if let Err(err) = ui::check_overlay(&doc) {
            warn!(error = %err, "overlay markup incomplete; its controls stay inert");
        }
        let mut session = EditorSession::new(doc, layout, store, files);
        for (mode, button) in ui::ensure_mode_buttons(&mut session.doc, body) {
            session
                .listeners
                .bind(button, Handler::ToggleMode(mode), Owner::Overlay);
        }
        bind_overlay_controls(&mut session);

        let replay = replay::replay(&mut session);
        info!(
            applied = replay.applied,
            skipped = replay.skipped,
            bindings = session.listeners.len(),
            "editor attached"
        );

        Ok(Self {
            session,
            controller: ModeController::new(),
            managers: Managers::default(),
            replay,
            outbox: vec![HostMessage::RequestEditMode],
        })
    }

    /// Toggle `mode`, returning the mode active afterwards
    pub fn toggle(&mut self, mode: Mode) -> Mode {
        self.controller
            .toggle(mode, &mut self.session, &mut self.managers)
    }

    pub fn active_mode(&self) -> Mode {
        self.controller.active()
    }

    /// Make `mode` the active mode. Unlike [`Editor::toggle`], asking for
    /// the mode that is already active changes nothing.
    pub fn switch_mode(&mut self, mode: Mode) -> Mode {
        let active = self.active_mode();
        if active == mode {
            return active;
        }
        match mode {
            Mode::Normal => self.toggle(active),
            _ => self.toggle(mode),
        }
    }

    pub fn dispatch(&mut self, event: Event) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        match event {
            Event::PointerMove { x, y } => self.pointer_move(x, y, &mut outcome),
            Event::Click { target } => {
                self.bubble(target, EventKind::Click, &[], &mut outcome);
                if !outcome.propagation_stopped {
                    self.document_click(target, &mut outcome);
                }
            }
            Event::Input { target } => self.bubble(target, EventKind::Input, &[], &mut outcome),
            Event::Change { target, files } => {
                self.bubble(target, EventKind::Change, &files, &mut outcome)
            }
            Event::Host(HostCommand::SwitchMode(mode)) => {
                let active = self.switch_mode(mode);
                debug!(requested = ?mode, ?active, "host switched mode");
                outcome.handled += 1;
            }
        }
        outcome
    }

    /// Document-level click listener: inspection swallows the click, and
    /// the frame hears about it either way
    fn document_click(&mut self, target: NodeId, outcome: &mut DispatchOutcome) {
        if self.active_mode() == Mode::Inspect {
            outcome.prevent_default();
            outcome.stop_propagation();
        }
        if self.session.doc.is_element(target) {
            self.outbox
                .push(HostMessage::edit(&self.session.doc, target));
        }
    }

    /// Drain the messages queued for the embedding frame
    pub fn take_host_messages(&mut self) -> Vec<HostMessage> {
        std::mem::take(&mut self.outbox)
    }

    fn pointer_move(&mut self, x: f64, y: f64, outcome: &mut DispatchOutcome) {
        let Some(handler) = self.session.listeners.pointer_move() else {
            return;
        };
        let session = &mut self.session;
        match handler {
            PointerHandler::Inspect => self.managers.inspect.on_pointer_move(session, x, y),
            PointerHandler::RegionHover => self.managers.region.on_pointer_move(session, x, y),
            PointerHandler::ImageHover => self.managers.image.on_pointer_move(session, x, y),
        }
        outcome.handled += 1;
    }

    fn bubble(
        &mut self,
        target: NodeId,
        kind: EventKind,
        files: &[SelectedFile],
        outcome: &mut DispatchOutcome,
    ) {
        let path: Vec<NodeId> = self.session.doc.ancestors_inclusive(target).collect();
        for current in path {
            for handler in self.session.listeners.handlers(current, kind) {
                // An earlier handler may have torn this one down
                if !self.session.listeners.is_bound(current, handler) {
                    continue;
                }
                outcome.handled += 1;
                self.run(handler, current, target, files, outcome);
            }
            if outcome.propagation_stopped {
                break;
            }
        }
    }

    fn run(
        &mut self,
        handler: Handler,
        current: NodeId,
        target: NodeId,
        files: &[SelectedFile],
        outcome: &mut DispatchOutcome,
    ) {
        let session = &mut self.session;
        match handler {
            Handler::ToggleMode(mode) => {
                self.toggle(mode);
            }
            Handler::Duplicate => {
                self.duplicate_selected();
            }
            Handler::Remove => {
                self.remove_selected();
            }
            Handler::StopPropagation => outcome.stop_propagation(),
            Handler::CancelUpload => upload::close(session),
            Handler::ApplyUpload => upload::apply(session),
            Handler::DismissUpload => {
                // Only the backdrop itself, not clicks inside the dialog
                if target == current {
                    upload::close(session);
                }
            }
            Handler::PickGalleryImage(index) => upload::select_gallery_index(session, index),
            Handler::ChooseSingleFile => upload::choose_single(session, files.first().cloned()),
            Handler::ChooseMultipleFiles => upload::choose_multiple(session, files.to_vec()),
            Handler::ChooseUploadKind => {
                let sub_mode = session
                    .doc
                    .attr(current, "value")
                    .and_then(GallerySubMode::from_radio_value);
                match sub_mode {
                    Some(sub_mode) => upload::set_sub_mode(session, sub_mode),
                    None => warn!(node = ?current, "upload kind radio has no usable value"),
                }
            }
            Handler::PreventDefault | Handler::SuppressNavigation => outcome.prevent_default(),
            Handler::SelectRegion => {
                outcome.prevent_default();
                outcome.stop_propagation();
                self.managers.region.on_select(session, current);
            }
            Handler::OpenUpload(class) => {
                outcome.prevent_default();
                outcome.stop_propagation();
                self.managers.image.open_upload(session, current, class);
            }
            Handler::PersistText => self.managers.text.on_input(session, current),
        }
    }

    /// Run pending file reads and apply every completion that is ready.
    ///
    /// Returns how many completions were handled.
    pub fn settle(&mut self) -> usize {
        let completions = self.session.reads.drain();
        let count = completions.len();
        for completion in completions {
            upload::handle_completion(&mut self.session, completion);
        }
        if count > 0 {
            debug!(count, in_flight = self.session.reads.in_flight(), "reads settled");
        }
        count
    }

    /// Trip the abort token: reads already started finish without effect.
    /// Closing the dialog never does this.
    pub fn abort_in_flight_reads(&mut self) -> usize {
        let dropped = self.session.reads.abort_all();
        self.session.batches.clear();
        info!(dropped, "in-flight reads aborted");
        dropped
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.session.take_notices()
    }

    /// Duplicate a region, whether or not it is selected
    pub fn duplicate_region(&mut self, target: NodeId) -> Option<NodeId> {
        self.managers.region.duplicate(&mut self.session, target)
    }

    pub fn remove_region(&mut self, target: NodeId) -> bool {
        self.managers.region.remove(&mut self.session, target)
    }

    pub fn duplicate_selected(&mut self) -> Option<NodeId> {
        let target = self.session.selected?;
        self.duplicate_region(target)
    }

    pub fn remove_selected(&mut self) -> bool {
        match self.session.selected {
            Some(target) => self.remove_region(target),
            None => false,
        }
    }

    /// Replace `node`'s content the way typing into it would, then persist
    /// it like an input event does
    pub fn edit_text(&mut self, node: NodeId, markup: &str) -> EditorResult<()> {
        self.session.doc.set_inner_html(node, markup)?;
        self.managers.text.on_input(&mut self.session, node);
        Ok(())
    }

    pub fn upload_session(&self) -> Option<&UploadSession> {
        self.session.upload.as_ref()
    }

    pub fn selected_region(&self) -> Option<NodeId> {
        self.session.selected
    }

    pub fn managers(&self) -> &Managers {
        &self.managers
    }

    pub fn replay_report(&self) -> ReplayReport {
        self.replay
    }

    pub fn document(&self) -> &Document {
        &self.session.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.session.doc
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditorSession {
        &mut self.session
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.session.listeners
    }

    pub fn store(&self) -> &PersistenceStore {
        &self.session.store
    }

    pub fn into_document(self) -> Document {
        self.session.doc
    }
}

/// Wire the static overlay markup. Runs once per editor.
fn bind_overlay_controls(session: &mut EditorSession) {
    let controls = [
        (ACTION_CLUSTER_ID, Handler::StopPropagation),
        (DUPLICATE_BUTTON_ID, Handler::Duplicate),
        (REMOVE_BUTTON_ID, Handler::Remove),
        (CANCEL_UPLOAD_ID, Handler::CancelUpload),
        (APPLY_UPLOAD_ID, Handler::ApplyUpload),
        (UPLOAD_MODAL_ID, Handler::DismissUpload),
        (SINGLE_FILE_INPUT_ID, Handler::ChooseSingleFile),
        (MULTI_FILE_INPUT_ID, Handler::ChooseMultipleFiles),
    ];

    let mut missing = Vec::new();
    for (id, handler) in controls {
        match session.doc.get_element_by_id(id) {
            Some(node) => {
                session.listeners.bind(node, handler, Owner::Overlay);
            }
            None => missing.push(id),
        }
    }

    let radios = format!("input[name=\"{}\"]", UPLOAD_KIND_RADIO_NAME);
    for radio in session.doc.query_selector_all(&radios).unwrap_or_default() {
        session
            .listeners
            .bind(radio, Handler::ChooseUploadKind, Owner::Overlay);
    }

    if !missing.is_empty() {
        debug!(?missing, "overlay markup not present; controls left unbound");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::StaticLayout;
    use crate::reads::MemoryFiles;
    use crate::store::MemoryStorage;

    fn editor(html: &str) -> Editor {
        Editor::new(
            Document::parse(html),
            Box::new(StaticLayout::new()),
            Box::new(MemoryStorage::new()),
            Box::new(MemoryFiles::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_requires_body() {
        let result = Editor::new(
            Document::parse("<p>no body</p>"),
            Box::new(StaticLayout::new()),
            Box::new(MemoryStorage::new()),
            Box::new(MemoryFiles::new()),
        );
        assert!(matches!(result, Err(EditorError::MissingBody)));
    }

    #[test]
    fn test_mode_buttons_toggle_through_dispatch() {
        let mut editor = editor("<html><body><div><p>x</p></div></body></html>");
        let button = editor.document().get_element_by_id("textModeBtn").unwrap();

        editor.dispatch(Event::Click { target: button });
        assert_eq!(editor.active_mode(), Mode::TextEdit);
        assert_eq!(editor.document().text_content(button), "Disable Text Edit");

        editor.dispatch(Event::Click { target: button });
        assert_eq!(editor.active_mode(), Mode::Normal);
        assert_eq!(editor.listeners().count_owned(Owner::Overlay), 4);
    }

    #[test]
    fn test_host_switch_mode_is_idempotent() {
        let mut editor = editor("<html><body><div><p>x</p></div></body></html>");
        let edit = HostCommand::parse(r#"{"msgType":"switchMode","dstModeType":1}"#).unwrap();

        editor.dispatch(Event::Host(edit));
        assert_eq!(editor.active_mode(), Mode::RegionEdit);
        editor.dispatch(Event::Host(edit));
        assert_eq!(editor.active_mode(), Mode::RegionEdit);

        editor.dispatch(Event::Host(HostCommand::SwitchMode(Mode::Inspect)));
        assert_eq!(editor.active_mode(), Mode::Inspect);
        editor.dispatch(Event::Host(HostCommand::SwitchMode(Mode::Normal)));
        assert_eq!(editor.active_mode(), Mode::Normal);
        editor.dispatch(Event::Host(HostCommand::SwitchMode(Mode::Normal)));
        assert_eq!(editor.active_mode(), Mode::Normal);
        assert_eq!(editor.listeners().count_owned(Owner::Mode(Mode::Inspect)), 0);
    }

    #[test]
    fn test_frame_hears_attach_and_every_click() {
        let mut editor = editor("<html><body><h2 id=\"t\">Title</h2></body></html>");
        assert_eq!(
            editor.take_host_messages(),
            vec![HostMessage::RequestEditMode]
        );

        let h2 = editor.document().get_element_by_id("t").unwrap();
        let outcome = editor.dispatch(Event::Click { target: h2 });
        assert!(!outcome.default_prevented);
        let messages = editor.take_host_messages();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            HostMessage::Edit {
                tag_name,
                text_content,
                outer_html,
                ..
            } => {
                assert_eq!(tag_name, "H2");
                assert_eq!(text_content, "Title");
                assert_eq!(outer_html, "<h2 id=\"t\">Title</h2>");
            }
            other => panic!("unexpected message {:?}", other),
        }

        editor.toggle(Mode::Inspect);
        let outcome = editor.dispatch(Event::Click { target: h2 });
        assert!(outcome.default_prevented);
        assert!(outcome.propagation_stopped);
        assert_eq!(editor.take_host_messages().len(), 1);
    }

    #[test]
    fn test_clicks_stopped_below_the_document_are_not_reported() {
        let mut editor = editor("<html><body><section id=\"s\"><p>x</p></section></body></html>");
        editor.take_host_messages();
        editor.toggle(Mode::RegionEdit);
        let section = editor.document().get_element_by_id("s").unwrap();
        let outcome = editor.dispatch(Event::Click { target: section });
        assert!(outcome.propagation_stopped);
        assert!(editor.take_host_messages().is_empty());
    }

    #[test]
    fn test_inspect_prevents_default_everywhere() {
        let mut editor = editor("<html><body><a href=\"/x\">link</a></body></html>");
        let link = editor.document().first_element_by_tag("a").unwrap();
        assert!(!editor.dispatch(Event::Click { target: link }).default_prevented);

        editor.toggle(Mode::Inspect);
        assert!(editor.dispatch(Event::Click { target: link }).default_prevented);
    }
}

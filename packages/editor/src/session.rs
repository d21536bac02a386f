//! # Editor Session
//!
//! The shared context every manager works against.
//!
//! One `EditorSession` exists per overlay for the lifetime of the page. It
//! owns the document, the host seams (layout, storage, file reads), the
//! listener and style bookkeeping, and the transient editing state:
//! selection, hover, and the open upload dialog.

use crate::events::Notice;
use crate::geometry::Layout;
use crate::highlight::Highlighter;
use crate::listeners::ListenerRegistry;
use crate::reads::{FileSource, ReadPool};
use crate::store::{EditMap, PersistenceStore};
use crate::style_ledger::StyleLedger;
use crate::upload::{BatchTally, UploadSession};
use livepage_dom::{Document, NodeId};
use std::collections::HashMap;
use tracing::{error, warn};

pub struct EditorSession {
    pub doc: Document,
    pub layout: Box<dyn Layout>,
    pub store: PersistenceStore,
    pub files: Box<dyn FileSource>,
    pub reads: ReadPool,
    pub listeners: ListenerRegistry,
    pub ledger: StyleLedger,
    pub highlighter: Highlighter,

    /// Region currently selected in RegionEdit
    pub selected: Option<NodeId>,

    /// Element under the hover highlight
    pub hovered: Option<NodeId>,

    /// The open upload dialog, if any
    pub upload: Option<UploadSession>,

    /// Commit reads still being counted, keyed by batch id
    pub batches: BatchTally,

    /// Original URL of every image or background the session replaced
    pub originals: HashMap<NodeId, String>,

    notices: Vec<Notice>,
    next_upload_id: u64,
}

impl EditorSession {
    pub fn new(
        mut doc: Document,
        layout: Box<dyn Layout>,
        store: PersistenceStore,
        files: Box<dyn FileSource>,
    ) -> Self {
        let highlighter = Highlighter::install(&mut doc);
        Self {
            doc,
            layout,
            store,
            files,
            reads: ReadPool::new(),
            listeners: ListenerRegistry::new(),
            ledger: StyleLedger::new(),
            highlighter,
            selected: None,
            hovered: None,
            upload: None,
            batches: BatchTally::default(),
            originals: HashMap::new(),
            notices: Vec::new(),
            next_upload_id: 1,
        }
    }

    /// Blocking, user-facing alert
    pub fn alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(message = %message, "alert raised");
        self.notices.push(Notice::Alert(message));
    }

    /// Non-blocking warning shown to the user
    pub fn warn_user(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(message = %message, "warning raised");
        self.notices.push(Notice::Warning(message));
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Write one edit through the store, logging instead of failing
    pub fn persist(&mut self, map: EditMap, key: &str, payload: &str) {
        if let Err(err) = self.store.record(map, key, payload) {
            error!(map = ?map, key = %key, error = %err, "failed to persist edit");
        }
    }

    pub fn touch(&mut self) {
        if let Err(err) = self.store.touch() {
            error!(error = %err, "failed to update pageLastModified");
        }
    }

    /// Original URL for `node`, falling back to its current resolved URL
    pub fn original_url(&self, node: NodeId, current: &str) -> String {
        self.originals
            .get(&node)
            .cloned()
            .unwrap_or_else(|| self.doc.resolve_url(current))
    }

    pub(crate) fn next_upload_id(&mut self) -> u64 {
        let id = self.next_upload_id;
        self.next_upload_id += 1;
        id
    }
}

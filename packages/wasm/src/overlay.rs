//! The overlay running on a live page: one [`Editor`] over a mirror of the
//! page, kept in step after every event.

use crate::seams::{describe, BrowserFiles, WebLayout, WebStorage};
use crate::tree::{self, BrowserTree};
use livepage_dom::NodeId;
use livepage_editor::mirror::{self, Snapshot};
use livepage_editor::{DispatchOutcome, Editor, Event, Notice};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{File, Window};

pub struct Overlay {
    window: Window,
    document: web_sys::Document,
    editor: Editor,
    tree: Rc<RefCell<BrowserTree>>,
    snapshot: Snapshot,
    files: BrowserFiles,
}

impl Overlay {
    pub fn attach(window: Window) -> Result<Rc<RefCell<Self>>, JsValue> {
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document"))?;
        let (doc, browser_tree) = tree::mirror(&document)?;
        // What the page shows right now; the first flush only adds the
        // controls and replayed edits
        let snapshot = Snapshot::capture(&doc);
        let tree = Rc::new(RefCell::new(browser_tree));
        let files = BrowserFiles::new();

        let editor = Editor::new(
            doc,
            Box::new(WebLayout::new(window.clone(), Rc::clone(&tree))),
            Box::new(WebStorage::local(&window)?),
            Box::new(files.clone()),
        )
        .map_err(|e| JsValue::from_str(&format!("Overlay error: {}", e)))?;

        let overlay = Rc::new(RefCell::new(Self {
            window,
            document,
            editor,
            tree,
            snapshot,
            files: files.clone(),
        }));
        overlay.borrow_mut().flush();

        let weak = Rc::downgrade(&overlay);
        files.set_wake(Rc::new(move || {
            let weak = weak.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let Some(overlay) = weak.upgrade() else {
                    return;
                };
                match overlay.try_borrow_mut() {
                    Ok(mut overlay) => overlay.flush(),
                    Err(_) => debug!("overlay busy; reads settle on the next event"),
                };
            });
        }));
        Ok(overlay)
    }

    pub fn dispatch(&mut self, event: Event) -> DispatchOutcome {
        let outcome = self.editor.dispatch(event);
        self.flush();
        outcome
    }

    /// Copy what the user typed into `node` before the runtime sees the input
    pub fn pull(&mut self, node: NodeId) {
        let pulled = self
            .tree
            .borrow_mut()
            .pull(self.editor.document_mut(), node);
        if let Err(err) = pulled {
            warn!(?node, error = %describe(&err), "could not read edited content");
        }
        // The page already shows the typed content
        self.snapshot = Snapshot::capture(self.editor.document());
    }

    pub fn remember(&self, file: File) -> livepage_editor::SelectedFile {
        self.files.remember(file)
    }

    pub fn lookup(&self, node: &web_sys::Node) -> Option<NodeId> {
        self.tree.borrow().lookup(node)
    }

    /// Settle reads, then bring the page, the user and the frame up to date
    pub fn flush(&mut self) {
        self.editor.settle();

        let patches = mirror::sync(&mut self.snapshot, self.editor.document());
        if !patches.is_empty() {
            let applied =
                self.tree
                    .borrow_mut()
                    .apply(&self.document, self.editor.document(), &patches);
            match applied {
                Ok(()) => debug!(patches = patches.len(), "page updated"),
                Err(err) => warn!(error = %describe(&err), "page update failed"),
            }
        }

        for notice in self.editor.take_notices() {
            self.show(&notice);
        }
        self.post_to_frame();
    }

    fn show(&self, notice: &Notice) {
        match notice {
            Notice::Alert(message) => {
                if let Err(err) = self.window.alert_with_message(message) {
                    warn!(error = %describe(&err), %message, "alert failed");
                }
            }
            Notice::Warning(message) => web_sys::console::warn_1(&JsValue::from_str(message)),
        }
    }

    fn post_to_frame(&mut self) {
        let messages = self.editor.take_host_messages();
        let parent = match self.window.parent() {
            Ok(Some(parent)) => parent,
            _ => return,
        };
        // A top-level page is its own parent; nobody is listening
        if parent == self.window {
            return;
        }
        for message in messages {
            let posted = js_sys::JSON::parse(&message.to_json())
                .and_then(|value| parent.post_message(&value, "*"));
            if let Err(err) = posted {
                warn!(error = %describe(&err), "could not post to the frame");
            }
        }
    }
}

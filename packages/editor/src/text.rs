//! # TextEdit mode
//!
//! Leaf text elements become `contenteditable`. Each input event stores
//! the element's markup under its [`PathKey`](crate::path::PathKey).
//!
//! ## Classification
//!
//! ```text
//! candidate ──► overlay? controls? no text? ──yes──► NotEditable
//!      │
//!      └──► >5 child elements AND >10 descendants AND text < 20 chars
//!                 ──yes──► Container
//!                 ──no───► LeafText
//! ```
//!
//! [`classify_text`] only sees a [`TextFacts`] snapshot, never the tree.

use crate::listeners::{Handler, Owner, PointerHandler};
use crate::mode::{Mode, ModeBehavior};
use crate::path::compute_path;
use crate::session::EditorSession;
use crate::store::EditMap;
use crate::ui;
use livepage_dom::{Document, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

pub const EDITABLE_CLASS: &str = "text-editable";
pub const CONTENT_EDITABLE_ATTR: &str = "contenteditable";

pub const TEXT_CANDIDATE_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "span", "li", "td", "th", "button", "a",
];

/// Inline emphasis only counts when it sits directly in a `div`
pub const INLINE_CANDIDATE_TAGS: &[&str] = &["strong", "em", "u"];

const CONTROL_TAGS: &[&str] = &["input", "select", "textarea", "button"];

/// Inline properties cleared when editing ends
pub const AFFORDANCE_PROPERTIES: &[&str] = &[
    "outline",
    "border",
    "padding",
    "margin",
    "cursor",
    "background-color",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextClass {
    LeafText,
    Container,
    NotEditable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFacts {
    /// Character count of the trimmed text content
    pub trimmed_len: usize,
    pub in_overlay: bool,
    pub has_controls: bool,
    pub child_elements: usize,
    pub descendant_nodes: usize,
}

pub fn classify_text(facts: &TextFacts) -> TextClass {
    if facts.in_overlay || facts.has_controls || facts.trimmed_len == 0 {
        return TextClass::NotEditable;
    }
    if facts.child_elements > 5 && facts.descendant_nodes > 10 && facts.trimmed_len < 20 {
        return TextClass::Container;
    }
    TextClass::LeafText
}

pub fn text_facts(doc: &Document, node: NodeId) -> TextFacts {
    let descendants = doc.descendants(node);
    TextFacts {
        trimmed_len: doc.text_content(node).trim().chars().count(),
        in_overlay: ui::is_overlay_ui(doc, node),
        has_controls: descendants
            .iter()
            .any(|d| doc.tag_name(*d).map(|t| CONTROL_TAGS.contains(&t)).unwrap_or(false)),
        child_elements: doc.element_children(node).len(),
        descendant_nodes: descendants.len(),
    }
}

pub fn is_text_candidate(doc: &Document, node: NodeId) -> bool {
    let Some(tag) = doc.tag_name(node) else {
        return false;
    };
    if TEXT_CANDIDATE_TAGS.contains(&tag) {
        return true;
    }
    INLINE_CANDIDATE_TAGS.contains(&tag)
        && doc
            .parent_element(node)
            .map(|p| doc.is_tag(p, "div"))
            .unwrap_or(false)
}

pub fn is_live_editable(doc: &Document, node: NodeId) -> bool {
    doc.has_class(node, EDITABLE_CLASS) || doc.has_attr(node, CONTENT_EDITABLE_ATTR)
}

/// Inner markup of `node` as the page wrote it, without editing markings
/// on nested elements
pub fn persisted_markup(doc: &Document, node: NodeId) -> String {
    doc.inner_html_with(node, &|_, el| {
        if !el.classes().any(|c| c == EDITABLE_CLASS) {
            return None;
        }
        let mut el = el.clone();
        el.remove_attr(CONTENT_EDITABLE_ATTR);
        el.remove_class(EDITABLE_CLASS);
        Some(el)
    })
}

type StyleSnapshot = Vec<(&'static str, Option<String>)>;

#[derive(Debug, Default)]
pub struct TextEditManager {
    /// Affordance properties as they were when each element was marked
    snapshots: HashMap<NodeId, StyleSnapshot>,
}

impl TextEditManager {
    /// Elements made editable by the current activation
    pub fn editable(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.snapshots.keys().copied()
    }

    /// Store the element's current markup under its path
    pub fn on_input(&mut self, session: &mut EditorSession, node: NodeId) {
        let path = compute_path(&session.doc, node);
        let markup = persisted_markup(&session.doc, node);
        debug!(path = %path, bytes = markup.len(), "text edited");
        session.persist(EditMap::Texts, &path, &markup);
    }

    #[instrument(skip_all)]
    fn mark_editable(&mut self, session: &mut EditorSession) -> usize {
        let Some(body) = session.doc.body() else {
            return 0;
        };
        let candidates: Vec<NodeId> = session
            .doc
            .descendant_elements(body)
            .into_iter()
            .filter(|n| is_text_candidate(&session.doc, *n))
            .collect();

        let mut marked = 0;
        for node in candidates {
            let doc = &session.doc;
            if doc.attr(node, CONTENT_EDITABLE_ATTR) == Some("true") {
                continue;
            }
            if classify_text(&text_facts(doc, node)) != TextClass::LeafText {
                continue;
            }

            let snapshot = AFFORDANCE_PROPERTIES
                .iter()
                .map(|p| (*p, doc.style_property(node, p)))
                .collect();
            let doc = &mut session.doc;
            if doc.set_attr(node, CONTENT_EDITABLE_ATTR, "true").is_err()
                || doc.add_class(node, EDITABLE_CLASS).is_err()
            {
                continue;
            }
            session
                .listeners
                .bind(node, Handler::PersistText, Owner::Mode(Mode::TextEdit));
            self.snapshots.insert(node, snapshot);
            marked += 1;
        }
        marked
    }

    /// Strip editability and swap every marked subtree for a fresh clone
    fn unmark_editable(&mut self, session: &mut EditorSession) -> usize {
        let marked: Vec<NodeId> = session
            .doc
            .all_elements()
            .into_iter()
            .filter(|n| is_live_editable(&session.doc, *n) && !ui::is_overlay_ui(&session.doc, *n))
            .collect();

        for node in &marked {
            let doc = &mut session.doc;
            doc.remove_attr(*node, CONTENT_EDITABLE_ATTR);
            doc.remove_class(*node, EDITABLE_CLASS);
            match self.snapshots.get(node) {
                Some(snapshot) => {
                    for (property, value) in snapshot {
                        doc.set_style_property(*node, property, value.as_deref());
                    }
                }
                None => {
                    for property in AFFORDANCE_PROPERTIES {
                        doc.set_style_property(*node, property, None);
                    }
                }
            }
        }

        // Clone only the outermost marked nodes; inner ones are cloned along
        let outermost: Vec<NodeId> = marked
            .iter()
            .copied()
            .filter(|n| {
                !session
                    .doc
                    .ancestors(*n)
                    .any(|a| marked.contains(&a))
            })
            .collect();
        for node in &outermost {
            replace_with_clone(session, *node);
        }
        self.snapshots.clear();
        outermost.len()
    }
}

/// Swap `node` for a deep clone so nothing stays bound to the old nodes
fn replace_with_clone(session: &mut EditorSession, node: NodeId) {
    if session.doc.parent(node).is_none() {
        return;
    }
    let (clone, mapping) = session.doc.clone_subtree(node);
    if let Err(err) = session.doc.replace(node, clone) {
        debug!(node = ?node, error = %err, "could not replace edited node");
        return;
    }
    for (original, copy) in mapping {
        if let Some(url) = session.originals.remove(&original) {
            session.originals.insert(copy, url);
        }
    }
}

impl ModeBehavior for TextEditManager {
    fn mode(&self) -> Mode {
        Mode::TextEdit
    }

    fn pointer_handler(&self) -> Option<PointerHandler> {
        None
    }

    fn activate(&mut self, session: &mut EditorSession) {
        let marked = self.mark_editable(session);
        info!(marked, "text elements editable");
    }

    fn deactivate(&mut self, session: &mut EditorSession) {
        let replaced = self.unmark_editable(session);
        debug!(replaced, "text editing stripped");
    }
}

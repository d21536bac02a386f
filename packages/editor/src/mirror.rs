//! # Host mirror
//!
//! A host that renders the page itself (a browser) keeps its own tree in
//! step with the runtime's [`Document`] by applying [`DomPatch`]es.
//!
//! ```text
//! Snapshot (after last sync) ──diff──► Vec<DomPatch> ──► host tree
//!            ▲                                              │
//!            └──────────── capture(doc) ◄───────────────────┘
//! ```
//!
//! Patches address nodes by [`NodeId`]; the host keeps its own
//! `NodeId -> host node` table. They come in an order the host can apply
//! blindly: a node is created before any `SetChildren` that lists it.

use livepage_dom::{Attribute, Document, NodeData, NodeId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Element {
        attrs: Vec<Attribute>,
        children: Vec<NodeId>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomPatch {
    /// Build a host node for `node` from the document: an element with its
    /// tag and attributes, a text or a comment. Its children follow through
    /// `SetChildren`.
    Create { node: NodeId },
    SetAttributes { node: NodeId, attrs: Vec<Attribute> },
    /// New data of a text or comment node
    SetText { node: NodeId, text: String },
    /// Make the host node's children exactly these, in this order
    SetChildren { node: NodeId, children: Vec<NodeId> },
    /// `node` left the document; the host can drop its handle
    Forget { node: NodeId },
}

/// Shape of every node under the document element at one point in time
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    root: Option<NodeId>,
    shapes: HashMap<NodeId, Shape>,
}

impl Snapshot {
    pub fn capture(doc: &Document) -> Self {
        let mut snapshot = Snapshot {
            root: doc.document_element(),
            shapes: HashMap::new(),
        };
        if let Some(root) = snapshot.root {
            snapshot.record(doc, root);
        }
        snapshot
    }

    fn record(&mut self, doc: &Document, node: NodeId) {
        let Some(shape) = shape_of(doc, node) else {
            return;
        };
        if let Shape::Element { children, .. } = &shape {
            for child in children {
                self.record(doc, *child);
            }
        }
        self.shapes.insert(node, shape);
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.shapes.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Patches that turn the host tree matching `self` into one matching `doc`
    pub fn diff(&self, doc: &Document) -> Vec<DomPatch> {
        let mut patches = Vec::new();
        let mut seen = HashSet::new();
        if let Some(root) = doc.document_element() {
            self.visit(doc, root, &mut patches, &mut seen);
        }

        let mut gone: Vec<NodeId> = self
            .shapes
            .keys()
            .filter(|n| !seen.contains(*n))
            .copied()
            .collect();
        gone.sort();
        patches.extend(gone.into_iter().map(|node| DomPatch::Forget { node }));
        patches
    }

    fn visit(
        &self,
        doc: &Document,
        node: NodeId,
        patches: &mut Vec<DomPatch>,
        seen: &mut HashSet<NodeId>,
    ) {
        let Some(now) = shape_of(doc, node) else {
            return;
        };
        seen.insert(node);
        let before = self.shapes.get(&node);

        match (before, &now) {
            (None, _) => patches.push(DomPatch::Create { node }),
            (Some(Shape::Element { attrs: old, .. }), Shape::Element { attrs: new, .. })
                if old != new =>
            {
                patches.push(DomPatch::SetAttributes {
                    node,
                    attrs: new.clone(),
                });
            }
            (Some(Shape::Text(old)), Shape::Text(new))
            | (Some(Shape::Comment(old)), Shape::Comment(new))
                if old != new =>
            {
                patches.push(DomPatch::SetText {
                    node,
                    text: new.clone(),
                });
            }
            _ => {}
        }

        if let Shape::Element { children, .. } = &now {
            for child in children {
                self.visit(doc, *child, patches, seen);
            }
            let old_children = match before {
                Some(Shape::Element { children, .. }) => children.as_slice(),
                _ => &[],
            };
            if old_children != children.as_slice() {
                patches.push(DomPatch::SetChildren {
                    node,
                    children: children.clone(),
                });
            }
        }
    }
}

/// Diff against `snapshot`, then move `snapshot` forward to `doc`
pub fn sync(snapshot: &mut Snapshot, doc: &Document) -> Vec<DomPatch> {
    let patches = snapshot.diff(doc);
    *snapshot = Snapshot::capture(doc);
    patches
}

fn shape_of(doc: &Document, node: NodeId) -> Option<Shape> {
    let shape = match doc.data(node) {
        NodeData::Element(el) => Shape::Element {
            attrs: el.attrs.clone(),
            children: doc
                .children(node)
                .iter()
                .copied()
                .filter(|c| is_mirrored(doc, *c))
                .collect(),
        },
        NodeData::Text(text) => Shape::Text(text.clone()),
        NodeData::Comment(text) => Shape::Comment(text.clone()),
        NodeData::Document | NodeData::Doctype(_) => return None,
    };
    Some(shape)
}

fn is_mirrored(doc: &Document, node: NodeId) -> bool {
    matches!(
        doc.data(node),
        NodeData::Element(_) | NodeData::Text(_) | NodeData::Comment(_)
    )
}

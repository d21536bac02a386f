//! Two-way link between the browser's DOM and the runtime's [`Document`].
//!
//! [`mirror`] copies the live page once on attach. From then on the
//! runtime owns the content: [`BrowserTree::apply`] replays its patches on
//! the page, and [`BrowserTree::pull`] copies back the one subtree the
//! browser itself edits (a `contenteditable` element the user types in).

use js_sys::Reflect;
use livepage_dom::{Attribute, Document, NodeData, NodeId};
use livepage_editor::DomPatch;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlInputElement, Node};

/// Expando property holding a browser node's runtime id
const NODE_KEY: &str = "__livepageNode";

#[derive(Default)]
pub struct BrowserTree {
    nodes: HashMap<NodeId, Node>,
}

impl BrowserTree {
    fn bind(&mut self, id: NodeId, node: Node) {
        if let Err(err) = Reflect::set(
            &node,
            &JsValue::from_str(NODE_KEY),
            &JsValue::from_f64(id.index() as f64),
        ) {
            warn!(?id, error = ?err, "could not tag browser node");
        }
        self.nodes.insert(id, node);
    }

    fn forget_subtree(&mut self, doc: &Document, id: NodeId) {
        self.nodes.remove(&id);
        for node in doc.descendants(id) {
            self.nodes.remove(&node);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(&id).and_then(|n| n.dyn_ref::<Element>())
    }

    /// Runtime id of `node`, or of its nearest mirrored ancestor
    pub fn lookup(&self, node: &Node) -> Option<NodeId> {
        let mut current = Some(node.clone());
        while let Some(node) = current {
            if let Some(id) = self.tagged_id(&node) {
                return Some(id);
            }
            current = node.parent_node();
        }
        None
    }

    fn tagged_id(&self, node: &Node) -> Option<NodeId> {
        let index = Reflect::get(node, &JsValue::from_str(NODE_KEY))
            .ok()?
            .as_f64()?;
        let id = NodeId::from_index(index as usize);
        // Clones made by page scripts carry the property of their source
        let bound = self.nodes.get(&id)?;
        bound.is_same_node(Some(node)).then_some(id)
    }

    /// Replace the runtime children of `id` with copies of the browser's
    pub fn pull(&mut self, doc: &mut Document, id: NodeId) -> Result<(), JsValue> {
        let Some(host) = self.nodes.get(&id).cloned() else {
            debug!(?id, "pull of unmirrored node");
            return Ok(());
        };
        for child in doc.children(id).to_vec() {
            self.forget_subtree(doc, child);
            doc.detach(child);
        }
        copy_children(doc, self, &host, id)
    }

    /// Replay runtime patches on the page
    pub fn apply(
        &mut self,
        document: &web_sys::Document,
        doc: &Document,
        patches: &[DomPatch],
    ) -> Result<(), JsValue> {
        for patch in patches {
            match patch {
                DomPatch::Create { node } => {
                    let created: Node = match doc.data(*node) {
                        NodeData::Element(el) => {
                            let element = document.create_element(&el.tag)?;
                            for attr in &el.attrs {
                                set_attribute(&element, attr);
                            }
                            element.into()
                        }
                        NodeData::Text(text) => document.create_text_node(text).into(),
                        NodeData::Comment(text) => document.create_comment(text).into(),
                        NodeData::Document | NodeData::Doctype(_) => continue,
                    };
                    self.bind(*node, created);
                }
                DomPatch::SetAttributes { node, attrs } => {
                    if let Some(element) = self.element(*node) {
                        set_attributes(element, attrs)?;
                    }
                }
                DomPatch::SetText { node, text } => {
                    if let Some(host) = self.node(*node) {
                        host.set_node_value(Some(text));
                    }
                }
                DomPatch::SetChildren { node, children } => {
                    if let Some(parent) = self.node(*node) {
                        self.set_children(parent, children)?;
                    }
                }
                DomPatch::Forget { node } => {
                    self.nodes.remove(node);
                }
            }
        }
        Ok(())
    }

    /// Reorder `parent`'s children in place, moving only nodes that are out
    /// of position so untouched content keeps its state (focus, media, ...)
    fn set_children(&self, parent: &Node, children: &[NodeId]) -> Result<(), JsValue> {
        let mut cursor = parent.first_child();
        for child in children {
            let Some(wanted) = self.nodes.get(child) else {
                warn!(?child, "patch names a node the page never got");
                continue;
            };
            match &cursor {
                Some(current) if current.is_same_node(Some(wanted)) => {
                    cursor = current.next_sibling();
                }
                _ => {
                    parent.insert_before(wanted, cursor.as_ref())?;
                }
            }
        }
        while let Some(stale) = cursor {
            cursor = stale.next_sibling();
            parent.remove_child(&stale)?;
        }
        Ok(())
    }
}

fn set_attributes(element: &Element, attrs: &[Attribute]) -> Result<(), JsValue> {
    for name in element.get_attribute_names().iter().filter_map(|n| n.as_string()) {
        if !attrs.iter().any(|a| a.name == name) {
            element.remove_attribute(&name)?;
        }
    }
    for attr in attrs {
        if element.get_attribute(&attr.name).as_deref() != Some(attr.value.as_str()) {
            set_attribute(element, attr);
        }
    }
    // Once the user touched a control, its attribute no longer drives its state
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        if matches!(input.type_().as_str(), "radio" | "checkbox") {
            input.set_checked(attrs.iter().any(|a| a.name == "checked"));
        }
    }
    Ok(())
}

/// Names the lenient parser accepted can still be invalid for the browser
fn set_attribute(element: &Element, attr: &Attribute) {
    if let Err(err) = element.set_attribute(&attr.name, &attr.value) {
        warn!(name = %attr.name, error = ?err, "attribute rejected by the page");
    }
}

/// Copy the live page into a fresh [`Document`]
pub fn mirror(document: &web_sys::Document) -> Result<(Document, BrowserTree), JsValue> {
    let mut doc = Document::new();
    let mut tree = BrowserTree::default();
    if let Some(html) = document.document_element() {
        if let Some(id) = copy_node(&mut doc, &mut tree, &html)? {
            let root = doc.root();
            doc.append_child(root, id).map_err(dom_error)?;
        }
    }
    let base = document
        .base_uri()
        .ok()
        .flatten()
        .and_then(|uri| Url::parse(&uri).ok());
    doc.set_base_url(base);
    debug!(nodes = tree.len(), "page mirrored");
    Ok((doc, tree))
}

fn copy_node(
    doc: &mut Document,
    tree: &mut BrowserTree,
    node: &Node,
) -> Result<Option<NodeId>, JsValue> {
    let id = match node.node_type() {
        Node::ELEMENT_NODE => {
            let element: &Element = node.unchecked_ref();
            doc.create_element_with(&element.local_name(), attributes(element))
        }
        Node::TEXT_NODE => doc.create_text(node.node_value().unwrap_or_default()),
        Node::COMMENT_NODE => doc.create_comment(node.node_value().unwrap_or_default()),
        _ => return Ok(None),
    };
    tree.bind(id, node.clone());
    copy_children(doc, tree, node, id)?;
    Ok(Some(id))
}

fn copy_children(
    doc: &mut Document,
    tree: &mut BrowserTree,
    host: &Node,
    id: NodeId,
) -> Result<(), JsValue> {
    let children = host.child_nodes();
    for index in 0..children.length() {
        let Some(child) = children.item(index) else {
            continue;
        };
        if let Some(child_id) = copy_node(doc, tree, &child)? {
            doc.append_child(id, child_id).map_err(dom_error)?;
        }
    }
    Ok(())
}

fn attributes(element: &Element) -> Vec<Attribute> {
    element
        .get_attribute_names()
        .iter()
        .filter_map(|name| name.as_string())
        .filter_map(|name| {
            element
                .get_attribute(&name)
                .map(|value| Attribute { name, value })
        })
        .collect()
}

fn dom_error(err: livepage_dom::DomError) -> JsValue {
    JsValue::from_str(&format!("DOM error: {}", err))
}

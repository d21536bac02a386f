//! # Arena Document
//!
//! Mutable HTML document stored as a flat arena of nodes.
//!
//! ## Design
//!
//! ```text
//! nodes: [ Document, Doctype, <html>, <head>, <body>, "text", ... ]
//!            │ children: [1, 2]
//!            ▼
//!          NodeId(2) <html> ── parent: Some(NodeId(0))
//! ```
//!
//! Nodes are never freed. Detaching a subtree leaves its ids valid so
//! callers holding a stale id can still ask [`Document::is_attached`].

use crate::error::{DomError, DomResult};
use crate::node::{Attribute, ElementData, Node, NodeData};
use crate::style::{parse_declarations, serialize_declarations};
use crate::{parser, serializer, NodeId};
use url::Url;

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    base_url: Option<Url>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            root: NodeId(0),
            base_url: None,
        }
    }

    /// Parse markup into a new document
    pub fn parse(html: &str) -> Self {
        parser::parse(html)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ---------------------------------------------------------------
    // Node creation and access
    // ---------------------------------------------------------------

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_element_with(&mut self, tag: &str, attrs: Vec<Attribute>) -> NodeId {
        let mut data = ElementData::new(tag);
        data.attrs = attrs;
        self.push(NodeData::Element(data))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Doctype(text.into()))
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    // ---------------------------------------------------------------
    // Traversal
    // ---------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// Ancestors from the parent upward, ending with the root node
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// `id` followed by its ancestors
    pub fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(id).chain(self.ancestors(id))
    }

    /// Descendants of `id` in document (pre-)order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.is_element(*n))
            .collect()
    }

    /// Every attached element in document order
    pub fn all_elements(&self) -> Vec<NodeId> {
        self.descendant_elements(self.root)
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors_inclusive(node).any(|a| a == ancestor)
    }

    /// 1-based position among preceding element siblings sharing the tag
    pub fn nth_of_type(&self, id: NodeId) -> usize {
        let Some(tag) = self.tag_name(id) else {
            return 0;
        };
        let Some(parent) = self.parent(id) else {
            return 1;
        };
        let mut position = 0;
        for sibling in self.children(parent) {
            if self.tag_name(*sibling) == Some(tag) {
                position += 1;
            }
            if *sibling == id {
                break;
            }
        }
        position
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|c| self.is_element(*c))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.first_element_by_tag("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.first_element_by_tag("body")
    }

    pub fn first_element_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.all_elements().into_iter().find(|n| self.is_tag(*n, tag))
    }

    pub fn elements_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendant_elements(scope)
            .into_iter()
            .filter(|n| self.is_tag(*n, tag))
            .collect()
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.all_elements()
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(id))
    }

    // ---------------------------------------------------------------
    // Tree mutation
    // ---------------------------------------------------------------

    fn check_cycle(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.contains(child, parent) {
            return Err(DomError::HierarchyCycle { child });
        }
        Ok(())
    }

    /// Remove `id` from its parent. No-op when already detached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.check_cycle(parent, child)?;
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> DomResult<()> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        self.check_cycle(parent, node)?;
        self.detach(node);
        let pos = self.position_in_parent(parent, reference);
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos, node);
        Ok(())
    }

    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> DomResult<()> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        self.check_cycle(parent, node)?;
        self.detach(node);
        let pos = self.position_in_parent(parent, reference) + 1;
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos, node);
        Ok(())
    }

    /// Put `new` where `old` is and detach `old`
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> DomResult<()> {
        self.insert_before(old, new)?;
        self.detach(old);
        Ok(())
    }

    fn position_in_parent(&self, parent: NodeId, child: NodeId) -> usize {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == child)
            .unwrap_or(self.nodes[parent.0].children.len())
    }

    pub fn remove_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Deep-clone `id` into a detached subtree.
    ///
    /// Returns the clone root and the `(original, clone)` pairs for every
    /// node in the subtree, in document order.
    pub fn clone_subtree(&mut self, id: NodeId) -> (NodeId, Vec<(NodeId, NodeId)>) {
        let mut mapping = Vec::new();
        let clone = self.clone_into(id, &mut mapping);
        (clone, mapping)
    }

    fn clone_into(&mut self, id: NodeId, mapping: &mut Vec<(NodeId, NodeId)>) -> NodeId {
        let data = self.nodes[id.0].data.clone();
        let clone = self.push(data);
        mapping.push((id, clone));
        let children = self.nodes[id.0].children.clone();
        for child in children {
            let child_clone = self.clone_into(child, mapping);
            self.nodes[child_clone.0].parent = Some(clone);
            self.nodes[clone.0].children.push(child_clone);
        }
        clone
    }

    // ---------------------------------------------------------------
    // Attributes and classes
    // ---------------------------------------------------------------

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> DomResult<()> {
        self.element_mut(id)
            .ok_or(DomError::NotAnElement(id))?
            .set_attr(name, value);
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)?.remove_attr(name)
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.element(id)
            .map(|el| el.classes().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).contains(&class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> DomResult<()> {
        if self.has_class(id, class) {
            return Ok(());
        }
        let mut classes: Vec<String> = self.classes(id).into_iter().map(String::from).collect();
        classes.push(class.to_string());
        self.set_attr(id, "class", classes.join(" "))
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let remaining: Vec<String> = self
            .classes(id)
            .into_iter()
            .filter(|c| *c != class)
            .map(String::from)
            .collect();
        if remaining.is_empty() {
            self.remove_attr(id, "class");
        } else if let Some(el) = self.element_mut(id) {
            el.set_attr("class", remaining.join(" "));
        }
    }

    // ---------------------------------------------------------------
    // Inline style
    // ---------------------------------------------------------------

    /// Value of one property from the element's `style` attribute
    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attr(id, "style")?;
        parse_declarations(style)
            .into_iter()
            .rev()
            .find(|d| d.property == property)
            .map(|d| d.value)
    }

    /// Set (or with `None` remove) one inline style property.
    ///
    /// The `style` attribute is dropped once it holds no declarations.
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: Option<&str>) {
        if !self.is_element(id) {
            return;
        }
        let mut decls = self
            .attr(id, "style")
            .map(parse_declarations)
            .unwrap_or_default();
        decls.retain(|d| d.property != property);
        if let Some(value) = value {
            decls.push(crate::style::Declaration::new(property, value));
        }
        if decls.is_empty() {
            self.remove_attr(id, "style");
        } else if let Some(el) = self.element_mut(id) {
            el.set_attr("style", serialize_declarations(&decls));
        }
    }

    // ---------------------------------------------------------------
    // Content
    // ---------------------------------------------------------------

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        if let NodeData::Text(text) = self.data(id) {
            return text.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.data(n) {
                NodeData::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        self.remove_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.nodes[node.0].parent = Some(id);
            self.nodes[id.0].children.push(node);
        }
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        serializer::inner_html(self, id)
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        serializer::outer_html(self, id)
    }

    /// Markup of `id`'s children with start tags passed through `rewrite`
    pub fn inner_html_with(&self, id: NodeId, rewrite: serializer::Rewrite) -> String {
        serializer::inner_html_with(self, id, rewrite)
    }

    /// Replace the children of `id` with the parsed `markup` fragment
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> DomResult<()> {
        if !self.is_element(id) {
            return Err(DomError::NotAnElement(id));
        }
        self.remove_children(id);
        parser::parse_fragment(self, id, markup);
        Ok(())
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        serializer::inner_html(self, self.root)
    }

    // ---------------------------------------------------------------
    // URLs
    // ---------------------------------------------------------------

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn set_base_url(&mut self, base: Option<Url>) {
        self.base_url = base;
    }

    /// Resolve a raw `src`/`url(...)` value against the document base.
    ///
    /// Values that cannot be resolved come back trimmed but otherwise
    /// untouched.
    pub fn resolve_url(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return String::new();
        }
        if let Ok(absolute) = Url::parse(raw) {
            return absolute.to_string();
        }
        match self.base_url.as_ref().and_then(|base| base.join(raw).ok()) {
            Some(joined) => joined.to_string(),
            None => raw.to_string(),
        }
    }

    /// Pick up `<base href>` when it holds an absolute URL
    pub(crate) fn detect_base_url(&mut self) {
        let href = self
            .first_element_by_tag("base")
            .and_then(|b| self.attr(b, "href"))
            .and_then(|href| Url::parse(href).ok());
        if href.is_some() {
            self.base_url = href;
        }
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

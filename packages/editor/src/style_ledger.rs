//! Inline style overrides installed by the modes, with the values they
//! replaced.
//!
//! Every override goes through [`StyleLedger::set`], which remembers the
//! page's own inline value the first time a `(node, mode, property)` is
//! touched. Restoring writes that value back, or removes the property when
//! the page had none.

use crate::mode::Mode;
use livepage_dom::{Document, NodeId};

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    node: NodeId,
    owner: Mode,
    property: &'static str,
    previous: Option<String>,
}

#[derive(Debug, Default)]
pub struct StyleLedger {
    entries: Vec<Entry>,
}

impl StyleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, node: NodeId, owner: Mode, property: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.node == node && e.owner == owner && e.property == property)
    }

    pub fn set(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        owner: Mode,
        property: &'static str,
        value: &str,
    ) {
        if self.position(node, owner, property).is_none() {
            self.entries.push(Entry {
                node,
                owner,
                property,
                previous: doc.style_property(node, property),
            });
        }
        doc.set_style_property(node, property, Some(value));
    }

    pub fn restore(&mut self, doc: &mut Document, node: NodeId, owner: Mode, property: &str) {
        if let Some(index) = self.position(node, owner, property) {
            let entry = self.entries.remove(index);
            doc.set_style_property(node, entry.property, entry.previous.as_deref());
        }
    }

    /// Restore everything `owner` overrode, returning how many properties
    pub fn restore_owner(&mut self, doc: &mut Document, owner: Mode) -> usize {
        let (mine, rest): (Vec<Entry>, Vec<Entry>) =
            self.entries.drain(..).partition(|e| e.owner == owner);
        self.entries = rest;
        // Reverse order so stacked overrides unwind to the oldest value
        for entry in mine.iter().rev() {
            doc.set_style_property(entry.node, entry.property, entry.previous.as_deref());
        }
        mine.len()
    }

    /// Copy entries of each original onto its clone
    pub fn mirror(&mut self, mapping: &[(NodeId, NodeId)]) {
        let mut mirrored = Vec::new();
        for (original, clone) in mapping {
            for entry in self.entries.iter().filter(|e| e.node == *original) {
                mirrored.push(Entry {
                    node: *clone,
                    ..entry.clone()
                });
            }
        }
        self.entries.extend(mirrored);
    }

    pub fn forget(&mut self, nodes: &[NodeId]) {
        self.entries.retain(|e| !nodes.contains(&e.node));
    }

    pub fn is_overridden(&self, node: NodeId, owner: Mode, property: &str) -> bool {
        self.position(node, owner, property).is_some()
    }

    pub fn count_owned(&self, owner: Mode) -> usize {
        self.entries.iter().filter(|e| e.owner == owner).count()
    }
}

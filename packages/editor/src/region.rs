//! # RegionEdit mode
//!
//! Block containers become selectable. The selected region carries a
//! green border and shadow, and the Duplicate/Remove cluster floats just
//! below its bottom-right corner.
//!
//! All styling goes through the [`StyleLedger`](crate::style_ledger::StyleLedger)
//! under `Mode::RegionEdit`, so teardown puts the page's own inline
//! values back, including on regions duplicated while the mode was on.

use crate::highlight::{px, HighlightKind};
use crate::listeners::{Handler, Owner, PointerHandler};
use crate::mode::{Mode, ModeBehavior};
use crate::session::EditorSession;
use crate::ui::{self, ACTION_CLUSTER_ID};
use livepage_dom::{Document, NodeId};
use tracing::{debug, info, warn};

pub const BLOCK_CONTAINER_TAGS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "aside", "nav",
];

pub const SELECTED_BORDER: &str = "2px solid #34a853";
pub const SELECTED_SHADOW: &str = "0 0 10px rgba(52, 168, 83, 0.5)";

/// Cluster is right-aligned this far in from the region's right edge
const CLUSTER_INSET: f64 = 90.0;
const CLUSTER_GAP: f64 = 5.0;

const OWNER: Owner = Owner::Mode(Mode::RegionEdit);

pub fn is_block_container(doc: &Document, node: NodeId) -> bool {
    doc.tag_name(node)
        .map(|tag| BLOCK_CONTAINER_TAGS.contains(&tag))
        .unwrap_or(false)
}

/// Nearest selectable container at or above `node`
pub fn container_at(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.ancestors_inclusive(node)
        .take_while(|n| !doc.is_tag(*n, "body"))
        .find(|n| is_block_container(doc, *n) && !ui::is_overlay_ui(doc, *n))
}

#[derive(Debug, Default)]
pub struct RegionEditManager;

impl RegionEditManager {
    pub fn on_pointer_move(&mut self, session: &mut EditorSession, x: f64, y: f64) {
        let container = session
            .layout
            .element_from_point(&session.doc, x, y)
            .filter(|el| !ui::is_overlay_ui(&session.doc, *el))
            .and_then(|el| container_at(&session.doc, el));

        let EditorSession {
            doc,
            layout,
            highlighter,
            hovered,
            ..
        } = session;
        highlighter.show(doc, layout.as_ref(), HighlightKind::Hover, container);
        *hovered = container;
    }

    /// Click on a bound container: toggle or move the selection
    pub fn on_select(&mut self, session: &mut EditorSession, node: NodeId) {
        if session.selected == Some(node) {
            debug!(node = ?node, "region deselected");
            self.deselect(session);
            return;
        }
        self.deselect(session);

        session.selected = Some(node);
        let mode = Mode::RegionEdit;
        session
            .ledger
            .set(&mut session.doc, node, mode, "border", SELECTED_BORDER);
        session
            .ledger
            .set(&mut session.doc, node, mode, "box-shadow", SELECTED_SHADOW);
        self.position_cluster(session, node);
        debug!(node = ?node, "region selected");
    }

    /// Put the action cluster under `node`'s bottom-right corner
    pub fn position_cluster(&self, session: &mut EditorSession, node: NodeId) {
        let Some(cluster) = ui::require(&session.doc, ACTION_CLUSTER_ID) else {
            return;
        };
        let Some(rect) = session.layout.bounding_rect(node) else {
            warn!(node = ?node, "selected region has no layout box");
            return;
        };
        let (scroll_x, scroll_y) = session.layout.scroll_offset();
        let doc = &mut session.doc;
        doc.set_style_property(cluster, "position", Some("absolute"));
        doc.set_style_property(cluster, "top", Some(&px(rect.bottom() + scroll_y + CLUSTER_GAP)));
        doc.set_style_property(cluster, "left", Some(&px(rect.right() + scroll_x - CLUSTER_INSET)));
        ui::show(doc, cluster, "flex");
    }

    /// Clear the selection and its styling, and hide the cluster
    pub fn deselect(&mut self, session: &mut EditorSession) {
        if let Some(previous) = session.selected.take() {
            clear_selection_style(session, previous);
        }
        hide_cluster(session);
    }

    /// Deep-clone `target` right after itself. The clone's id, if any,
    /// gets a `-copy` suffix; the selection stays on `target`.
    pub fn duplicate(&mut self, session: &mut EditorSession, target: NodeId) -> Option<NodeId> {
        session.doc.parent(target)?;

        let (clone, mapping) = session.doc.clone_subtree(target);
        if let Some(id) = session.doc.attr(clone, "id").filter(|id| !id.is_empty()) {
            let copy_id = format!("{}-copy", id);
            if let Err(err) = session.doc.set_attr(clone, "id", copy_id) {
                warn!(error = %err, "could not rename duplicated region");
            }
        }
        if let Err(err) = session.doc.insert_after(target, clone) {
            warn!(node = ?target, error = %err, "could not insert duplicate");
            return None;
        }

        session.ledger.mirror(&mapping);
        // The clone is not selected even if the original is
        let mode = Mode::RegionEdit;
        session.ledger.restore(&mut session.doc, clone, mode, "border");
        session.ledger.restore(&mut session.doc, clone, mode, "box-shadow");

        if session.listeners.pointer_move_owner() == Some(OWNER) {
            for (_, copy) in &mapping {
                if is_block_container(&session.doc, *copy) {
                    session.listeners.bind(*copy, Handler::SelectRegion, OWNER);
                }
            }
        }

        if session.selected == Some(target) {
            self.position_cluster(session, target);
        }
        session.touch();
        info!(original = ?target, clone = ?clone, nodes = mapping.len(), "region duplicated");
        Some(clone)
    }

    /// Detach `target`, dropping everything bound to its subtree
    pub fn remove(&mut self, session: &mut EditorSession, target: NodeId) -> bool {
        if session.doc.parent(target).is_none() {
            return false;
        }

        let mut subtree = vec![target];
        subtree.extend(session.doc.descendants(target));

        let selected = session.selected;
        match selected {
            Some(selected) if subtree.contains(&selected) => session.selected = None,
            Some(_) => self.deselect(session),
            None => {}
        }
        hide_cluster(session);
        if session.hovered.is_some_and(|h| subtree.contains(&h)) {
            session.highlighter.hide(&mut session.doc, HighlightKind::Hover);
            session.hovered = None;
        }

        session.listeners.unbind_nodes(&subtree);
        session.ledger.forget(&subtree);
        session.doc.detach(target);
        session.touch();
        info!(node = ?target, nodes = subtree.len(), "region removed");
        true
    }
}

fn clear_selection_style(session: &mut EditorSession, node: NodeId) {
    let mode = Mode::RegionEdit;
    session.ledger.restore(&mut session.doc, node, mode, "border");
    session.ledger.restore(&mut session.doc, node, mode, "box-shadow");
}

fn hide_cluster(session: &mut EditorSession) {
    if let Some(cluster) = ui::require(&session.doc, ACTION_CLUSTER_ID) {
        ui::hide(&mut session.doc, cluster);
    }
}

impl ModeBehavior for RegionEditManager {
    fn mode(&self) -> Mode {
        Mode::RegionEdit
    }

    fn pointer_handler(&self) -> Option<PointerHandler> {
        Some(PointerHandler::RegionHover)
    }

    fn activate(&mut self, session: &mut EditorSession) {
        let Some(body) = session.doc.body() else {
            return;
        };
        let containers: Vec<NodeId> = session
            .doc
            .descendant_elements(body)
            .into_iter()
            .filter(|n| is_block_container(&session.doc, *n) && !ui::is_overlay_ui(&session.doc, *n))
            .collect();

        for node in &containers {
            session.listeners.bind(*node, Handler::SelectRegion, OWNER);
            session
                .ledger
                .set(&mut session.doc, *node, Mode::RegionEdit, "cursor", "pointer");
        }
        debug!(containers = containers.len(), "region containers bound");
    }

    fn deactivate(&mut self, session: &mut EditorSession) {
        self.deselect(session);
        session.highlighter.hide(&mut session.doc, HighlightKind::Hover);
        session.hovered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_at_skips_overlay_and_stops_at_body() {
        let doc = Document::parse(concat!(
            "<body><section><p><em>x</em></p></section>",
            "<div id=\"divEditorButtons\"><button>+</button></div>",
            "<p id=\"loose\">y</p></body>"
        ));
        let em = doc.first_element_by_tag("em").unwrap();
        let section = doc.first_element_by_tag("section").unwrap();
        let button = doc.first_element_by_tag("button").unwrap();
        let loose = doc.get_element_by_id("loose").unwrap();

        assert_eq!(container_at(&doc, em), Some(section));
        assert_eq!(container_at(&doc, button), None);
        assert_eq!(container_at(&doc, loose), None);
    }

    #[test]
    fn test_block_container_tags() {
        let doc = Document::parse("<body><nav></nav><span></span><aside></aside></body>");
        let body = doc.body().unwrap();
        let kids = doc.element_children(body);
        assert!(is_block_container(&doc, kids[0]));
        assert!(!is_block_container(&doc, kids[1]));
        assert!(is_block_container(&doc, kids[2]));
    }
}

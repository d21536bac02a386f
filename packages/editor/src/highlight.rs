//! # Highlighter
//!
//! Two floating rectangles, `inspect` and `hover`, that cover a target's
//! bounding box. They are independent: showing or hiding one never
//! touches the other.

use crate::geometry::Layout;
use crate::ui::{self, HIGHLIGHT_CLASS};
use livepage_dom::{Document, NodeId};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    Inspect,
    Hover,
}

impl HighlightKind {
    pub fn type_attr(self) -> &'static str {
        match self {
            HighlightKind::Inspect => "inspect",
            HighlightKind::Hover => "hover",
        }
    }

    fn base_style(self) -> [(&'static str, &'static str); 3] {
        match self {
            HighlightKind::Inspect => [
                ("border", "2px solid #ea4335"),
                ("background-color", "rgba(234, 67, 53, 0.1)"),
                ("z-index", "9999"),
            ],
            HighlightKind::Hover => [
                ("border", "2px solid #4285f4"),
                ("background-color", "rgba(66, 133, 244, 0.2)"),
                ("z-index", "9998"),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Overlay {
    node: Option<NodeId>,
    target: Option<NodeId>,
}

#[derive(Debug, Default)]
pub struct Highlighter {
    inspect: Overlay,
    hover: Overlay,
}

impl Highlighter {
    /// Find the two highlight nodes, creating missing ones under `<body>`
    pub fn install(doc: &mut Document) -> Self {
        Self {
            inspect: Overlay {
                node: ensure_overlay(doc, HighlightKind::Inspect),
                target: None,
            },
            hover: Overlay {
                node: ensure_overlay(doc, HighlightKind::Hover),
                target: None,
            },
        }
    }

    fn overlay(&self, kind: HighlightKind) -> &Overlay {
        match kind {
            HighlightKind::Inspect => &self.inspect,
            HighlightKind::Hover => &self.hover,
        }
    }

    fn overlay_mut(&mut self, kind: HighlightKind) -> &mut Overlay {
        match kind {
            HighlightKind::Inspect => &mut self.inspect,
            HighlightKind::Hover => &mut self.hover,
        }
    }

    pub fn node(&self, kind: HighlightKind) -> Option<NodeId> {
        self.overlay(kind).node
    }

    /// Element currently covered by `kind`
    pub fn target(&self, kind: HighlightKind) -> Option<NodeId> {
        self.overlay(kind).target
    }

    /// Cover `target` with the `kind` rectangle, or hide it for `None`
    pub fn show(
        &mut self,
        doc: &mut Document,
        layout: &dyn Layout,
        kind: HighlightKind,
        target: Option<NodeId>,
    ) {
        let overlay = self.overlay_mut(kind);
        let Some(node) = overlay.node else {
            error!(kind = kind.type_attr(), "highlight node missing");
            return;
        };

        let placed = target.and_then(|t| layout.bounding_rect(t).map(|rect| (t, rect)));
        match placed {
            Some((target, rect)) => {
                let (scroll_x, scroll_y) = layout.scroll_offset();
                doc.set_style_property(node, "top", Some(&px(rect.y + scroll_y)));
                doc.set_style_property(node, "left", Some(&px(rect.x + scroll_x)));
                doc.set_style_property(node, "width", Some(&px(rect.width)));
                doc.set_style_property(node, "height", Some(&px(rect.height)));
                ui::show(doc, node, "block");
                overlay.target = Some(target);
            }
            None => {
                if let Some(target) = target {
                    debug!(node = ?target, "no layout box for highlight target");
                }
                ui::hide(doc, node);
                overlay.target = None;
            }
        }
    }

    pub fn hide(&mut self, doc: &mut Document, kind: HighlightKind) {
        let overlay = self.overlay_mut(kind);
        if let Some(node) = overlay.node {
            ui::hide(doc, node);
        }
        overlay.target = None;
    }

    pub fn is_visible(&self, doc: &Document, kind: HighlightKind) -> bool {
        self.overlay(kind)
            .node
            .map(|n| !ui::is_hidden(doc, n))
            .unwrap_or(false)
    }
}

pub(crate) fn px(value: f64) -> String {
    format!("{}px", value)
}

fn ensure_overlay(doc: &mut Document, kind: HighlightKind) -> Option<NodeId> {
    let selector = format!(
        ".{}[data-highlight-type=\"{}\"]",
        HIGHLIGHT_CLASS,
        kind.type_attr()
    );
    if let Ok(Some(existing)) = doc.query_selector(&selector) {
        return Some(existing);
    }

    let Some(body) = doc.body() else {
        error!("cannot create highlight without <body>");
        return None;
    };
    let node = doc.create_element("div");
    doc.add_class(node, HIGHLIGHT_CLASS).ok()?;
    doc.set_attr(node, "data-highlight-type", kind.type_attr()).ok()?;
    doc.set_style_property(node, "position", Some("absolute"));
    doc.set_style_property(node, "pointer-events", Some("none"));
    for (property, value) in kind.base_style() {
        doc.set_style_property(node, property, Some(value));
    }
    doc.set_style_property(node, "display", Some("none"));
    doc.append_child(body, node).ok()?;
    Some(node)
}

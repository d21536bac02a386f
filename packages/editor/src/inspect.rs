//! Inspect mode: a tooltip naming the nearest `div` under the pointer,
//! plus the inspect highlight over it.

use crate::highlight::{px, HighlightKind};
use crate::listeners::{Handler, Owner, PointerHandler};
use crate::mode::{Mode, ModeBehavior};
use crate::session::EditorSession;
use crate::ui::{self, INSPECTOR_ID};
use livepage_dom::{Document, NodeId};
use tracing::{debug, warn};

/// Horizontal gap between pointer and tooltip
pub const TOOLTIP_OFFSET: f64 = 15.0;
/// Margin kept from the viewport edge when the tooltip is pushed back
pub const TOOLTIP_MARGIN: f64 = 5.0;
/// Used when the host cannot measure the tooltip
const FALLBACK_TOOLTIP_SIZE: (f64, f64) = (200.0, 30.0);

#[derive(Debug, Default)]
pub struct InspectManager {
    target: Option<NodeId>,
}

impl InspectManager {
    /// Element last described by the tooltip
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn on_pointer_move(&mut self, session: &mut EditorSession, x: f64, y: f64) {
        let Some(element) = session.layout.element_from_point(&session.doc, x, y) else {
            return;
        };
        if ui::is_overlay_ui(&session.doc, element) {
            return;
        }
        let Some(tooltip) = ui::require(&session.doc, INSPECTOR_ID) else {
            return;
        };

        let described = nearest_div(&session.doc, element);
        let markup = format!(
            "<div><strong>{}</strong></div>",
            ui::escape(&describe(&session.doc, described))
        );
        if let Err(err) = session.doc.set_inner_html(tooltip, &markup) {
            warn!(error = %err, "could not fill inspector");
            return;
        }
        ui::show(&mut session.doc, tooltip, "block");

        let size = session
            .layout
            .bounding_rect(tooltip)
            .map(|r| (r.width, r.height))
            .unwrap_or(FALLBACK_TOOLTIP_SIZE);
        let (left, top) = place_tooltip(x, y, size, session.layout.viewport_size());
        session.doc.set_style_property(tooltip, "left", Some(&px(left)));
        session.doc.set_style_property(tooltip, "top", Some(&px(top)));

        let EditorSession {
            doc,
            layout,
            highlighter,
            ..
        } = session;
        highlighter.show(doc, layout.as_ref(), HighlightKind::Inspect, Some(described));
        self.target = Some(described);
        debug!(node = ?described, x, y, "inspected");
    }
}

impl ModeBehavior for InspectManager {
    fn mode(&self) -> Mode {
        Mode::Inspect
    }

    fn pointer_handler(&self) -> Option<PointerHandler> {
        Some(PointerHandler::Inspect)
    }

    fn activate(&mut self, session: &mut EditorSession) {
        let root = session.doc.root();
        session
            .listeners
            .bind(root, Handler::PreventDefault, Owner::Mode(Mode::Inspect));
    }

    fn deactivate(&mut self, session: &mut EditorSession) {
        if let Some(tooltip) = ui::require(&session.doc, INSPECTOR_ID) {
            ui::hide(&mut session.doc, tooltip);
        }
        session
            .highlighter
            .hide(&mut session.doc, HighlightKind::Inspect);
        self.target = None;
    }
}

/// Closest `div` at or above `node`, or `node` itself when the climb
/// reaches `<body>` first
pub fn nearest_div(doc: &Document, node: NodeId) -> NodeId {
    for current in doc.ancestors_inclusive(node) {
        if doc.is_tag(current, "body") {
            break;
        }
        if doc.is_tag(current, "div") {
            return current;
        }
    }
    node
}

/// `tag#id.class1.class2`
pub fn describe(doc: &Document, node: NodeId) -> String {
    let mut label = doc.tag_name(node).unwrap_or_default().to_string();
    if let Some(id) = doc.attr(node, "id").filter(|id| !id.is_empty()) {
        label.push('#');
        label.push_str(id);
    }
    for class in doc.classes(node) {
        label.push('.');
        label.push_str(class);
    }
    label
}

/// Tooltip position for a pointer at `(x, y)`.
///
/// Sits right of the pointer, flips left when it would overflow the
/// viewport width, and is pulled up when it would overflow the height.
pub fn place_tooltip(x: f64, y: f64, size: (f64, f64), viewport: (f64, f64)) -> (f64, f64) {
    let (width, height) = size;
    let (inner_width, inner_height) = viewport;
    let mut left = x + TOOLTIP_OFFSET;
    let mut top = y;
    if left + width > inner_width {
        left = x - width - TOOLTIP_MARGIN;
    }
    if top + height > inner_height {
        top = inner_height - height - TOOLTIP_MARGIN;
    }
    (left, top)
}

//! Layout seam between the runtime and whatever renders the page.
//!
//! In a browser the host answers these queries from the live rendering
//! tree. [`StaticLayout`] answers them from a table, for tests and for
//! headless runs.

use livepage_dom::{Document, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rectangle in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

pub trait Layout {
    /// Bounding box of `node` relative to the viewport
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;

    /// Topmost element painted at a viewport point
    fn element_from_point(&self, doc: &Document, x: f64, y: f64) -> Option<NodeId>;

    /// `(scroll_x, scroll_y)` of the page
    fn scroll_offset(&self) -> (f64, f64);

    /// `(inner_width, inner_height)` of the viewport
    fn viewport_size(&self) -> (f64, f64);
}

/// Table-driven [`Layout`]
#[derive(Debug, Clone)]
pub struct StaticLayout {
    rects: HashMap<NodeId, Rect>,
    scroll: (f64, f64),
    viewport: (f64, f64),
}

impl Default for StaticLayout {
    fn default() -> Self {
        Self {
            rects: HashMap::new(),
            scroll: (0.0, 0.0),
            viewport: (1280.0, 800.0),
        }
    }
}

impl StaticLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rect(mut self, node: NodeId, rect: Rect) -> Self {
        self.rects.insert(node, rect);
        self
    }

    pub fn with_scroll(mut self, x: f64, y: f64) -> Self {
        self.scroll = (x, y);
        self
    }

    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.rects.insert(node, rect);
    }
}

impl Layout for StaticLayout {
    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        self.rects.get(&node).copied()
    }

    /// Last attached element in document order whose box holds the point
    fn element_from_point(&self, doc: &Document, x: f64, y: f64) -> Option<NodeId> {
        doc.all_elements()
            .into_iter()
            .filter(|n| self.rects.get(n).map(|r| r.contains(x, y)).unwrap_or(false))
            .last()
    }

    fn scroll_offset(&self) -> (f64, f64) {
        self.scroll
    }

    fn viewport_size(&self) -> (f64, f64) {
        self.viewport
    }
}

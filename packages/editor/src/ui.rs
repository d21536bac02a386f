//! # Overlay UI
//!
//! Fixed identifiers of the overlay's own nodes, and the few pieces of
//! overlay chrome the runtime creates itself (mode buttons, highlight
//! rectangles). Everything else (tooltip, action cluster, upload dialog)
//! is static markup appended by the `livepage inject` wrapper and looked
//! up here by id.

use crate::mode::Mode;
use crate::errors::{EditorError, EditorResult};
use livepage_dom::{Document, DomResult, NodeId};
use tracing::{debug, error, warn};

pub const STYLE_BLOCK_ID: &str = "editor-styles";
pub const SCRIPT_ID: &str = "editor-script";
pub const BOOT_SCRIPT_ID: &str = "editor-boot";
pub const INSPECTOR_ID: &str = "elementInspector";
pub const ACTION_CLUSTER_ID: &str = "divEditorButtons";
pub const DUPLICATE_BUTTON_ID: &str = "editDuplicateBtn";
pub const REMOVE_BUTTON_ID: &str = "editRemoveBtn";
pub const UPLOAD_MODAL_ID: &str = "imageUploadModal";
pub const UPLOAD_DESCRIPTION_ID: &str = "imageUploadDescription";
pub const UPLOAD_KIND_TOGGLE_ID: &str = "uploadTypeToggle";
pub const UPLOAD_KIND_RADIO_NAME: &str = "uploadType";
pub const SINGLE_FILE_INPUT_ID: &str = "imageFileInput";
pub const MULTI_FILE_INPUT_ID: &str = "multipleImageFileInput";
pub const SINGLE_PREVIEW_ID: &str = "imagePreview";
pub const MULTI_PREVIEW_ID: &str = "multipleImagePreview";
pub const CANCEL_UPLOAD_ID: &str = "cancelImageUpload";
pub const APPLY_UPLOAD_ID: &str = "applyImageUpload";
pub const GALLERY_SELECTOR_ID: &str = "carousel-image-selector";

pub const MODE_BUTTON_CLASS: &str = "editor-button";
pub const HIGHLIGHT_CLASS: &str = "element-highlight";
pub const CAROUSEL_HINT_CLASS: &str = "carousel-edit-hint";

pub const NEUTRAL_BACKGROUND: &str = "#4285f4";
pub const NEUTRAL_FOREGROUND: &str = "#fff";

/// Ids whose subtrees belong to the overlay
const OVERLAY_ROOT_IDS: &[&str] = &[
    STYLE_BLOCK_ID,
    SCRIPT_ID,
    BOOT_SCRIPT_ID,
    INSPECTOR_ID,
    ACTION_CLUSTER_ID,
    UPLOAD_MODAL_ID,
];

/// Classes whose subtrees belong to the overlay
const OVERLAY_CLASSES: &[&str] = &[MODE_BUTTON_CLASS, HIGHLIGHT_CLASS, CAROUSEL_HINT_CLASS];

/// Whether `node` is, or sits inside, one of the overlay's own nodes
pub fn is_overlay_ui(doc: &Document, node: NodeId) -> bool {
    doc.ancestors_inclusive(node).any(|n| {
        doc.attr(n, "id")
            .map(|id| OVERLAY_ROOT_IDS.contains(&id))
            .unwrap_or(false)
            || OVERLAY_CLASSES.iter().any(|c| doc.has_class(n, c))
    })
}

/// Static markup the runtime looks up by id; the mode buttons and
/// highlights it creates itself are not listed
pub const REQUIRED_IDS: &[&str] = &[
    INSPECTOR_ID,
    ACTION_CLUSTER_ID,
    DUPLICATE_BUTTON_ID,
    REMOVE_BUTTON_ID,
    UPLOAD_MODAL_ID,
    UPLOAD_DESCRIPTION_ID,
    UPLOAD_KIND_TOGGLE_ID,
    SINGLE_FILE_INPUT_ID,
    MULTI_FILE_INPUT_ID,
    SINGLE_PREVIEW_ID,
    MULTI_PREVIEW_ID,
    CANCEL_UPLOAD_ID,
    APPLY_UPLOAD_ID,
];

/// First required overlay node absent from `doc`
pub fn check_overlay(doc: &Document) -> EditorResult<()> {
    match REQUIRED_IDS
        .iter()
        .find(|id| doc.get_element_by_id(id).is_none())
    {
        Some(id) => Err(EditorError::MissingNode(*id)),
        None => Ok(()),
    }
}

/// Look up a fixed overlay node, logging when it is absent
pub fn require(doc: &Document, id: &'static str) -> Option<NodeId> {
    let node = doc.get_element_by_id(id);
    if node.is_none() {
        error!(id = %id, "overlay node missing");
    }
    node
}

pub fn show(doc: &mut Document, node: NodeId, display: &str) {
    doc.set_style_property(node, "display", Some(display));
}

pub fn hide(doc: &mut Document, node: NodeId) {
    doc.set_style_property(node, "display", Some("none"));
}

pub fn is_hidden(doc: &Document, node: NodeId) -> bool {
    doc.style_property(node, "display").as_deref() == Some("none")
}

/// Label and colors of one mode's toggle button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeButton {
    pub id: &'static str,
    pub title: &'static str,
    pub active_background: &'static str,
    pub active_foreground: &'static str,
    pub right_offset: u32,
}

impl ModeButton {
    pub fn for_mode(mode: Mode) -> Option<Self> {
        let button = match mode {
            Mode::Normal => return None,
            Mode::Inspect => ModeButton {
                id: "inspectModeBtn",
                title: "Inspect",
                active_background: "#ea4335",
                active_foreground: "#fff",
                right_offset: 30,
            },
            Mode::RegionEdit => ModeButton {
                id: "regionModeBtn",
                title: "Region Edit",
                active_background: "#ea4335",
                active_foreground: "#fff",
                right_offset: 180,
            },
            Mode::TextEdit => ModeButton {
                id: "textModeBtn",
                title: "Text Edit",
                active_background: "#34a853",
                active_foreground: "#fff",
                right_offset: 350,
            },
            Mode::ImageEdit => ModeButton {
                id: "imageModeBtn",
                title: "Image Edit",
                active_background: "#fbbc05",
                active_foreground: "#000",
                right_offset: 520,
            },
        };
        Some(button)
    }

    pub fn label(&self, active: bool) -> String {
        if active {
            format!("Disable {}", self.title)
        } else {
            format!("Enable {}", self.title)
        }
    }
}

/// Create the four mode buttons under `body` unless they already exist.
///
/// Returns `(mode, button)` for every button present afterwards.
pub fn ensure_mode_buttons(doc: &mut Document, body: NodeId) -> Vec<(Mode, NodeId)> {
    let mut buttons = Vec::new();
    for mode in Mode::EDITING {
        let Some(look) = ModeButton::for_mode(mode) else {
            continue;
        };
        let node = match doc.get_element_by_id(look.id) {
            Some(existing) => existing,
            None => match create_mode_button(doc, body, &look) {
                Ok(node) => {
                    debug!(button = %look.id, "created mode button");
                    node
                }
                Err(err) => {
                    warn!(button = %look.id, error = %err, "could not create mode button");
                    continue;
                }
            },
        };
        paint_mode_button(doc, mode, false);
        buttons.push((mode, node));
    }
    buttons
}

fn create_mode_button(doc: &mut Document, body: NodeId, look: &ModeButton) -> DomResult<NodeId> {
    let node = doc.create_element("button");
    doc.set_attr(node, "id", look.id)?;
    doc.set_attr(node, "type", "button")?;
    doc.add_class(node, MODE_BUTTON_CLASS)?;
    doc.set_style_property(node, "position", Some("fixed"));
    doc.set_style_property(node, "top", Some("20px"));
    doc.set_style_property(node, "right", Some(&format!("{}px", look.right_offset)));
    doc.set_style_property(node, "z-index", Some("10000"));
    doc.append_child(body, node)?;
    Ok(node)
}

/// Set a mode button's label and colors for its active/neutral state
pub fn paint_mode_button(doc: &mut Document, mode: Mode, active: bool) {
    let Some(look) = ModeButton::for_mode(mode) else {
        return;
    };
    let Some(button) = require(doc, look.id) else {
        return;
    };
    let (background, foreground) = if active {
        (look.active_background, look.active_foreground)
    } else {
        (NEUTRAL_BACKGROUND, NEUTRAL_FOREGROUND)
    };
    doc.set_text_content(button, &look.label(active));
    doc.set_style_property(button, "background-color", Some(background));
    doc.set_style_property(button, "color", Some(foreground));
}

/// Markup escaping for text the runtime writes into overlay nodes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

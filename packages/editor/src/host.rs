//! # Host frame protocol
//!
//! When the page runs inside an embedding frame, the frame drives the
//! coarse mode and hears about every click:
//!
//! ```text
//! frame ──► page   {"msgType": "switchMode", "dstModeType": 0 | 1 | 2}
//! page  ──► frame  {"msgType": "requestEditMode"}              once, on attach
//! page  ──► frame  {"msgType": "edit", "prototype": ..., "outerHTML": ...,
//!                   "tagName": ..., "textContent": ..., "baseURI": ...}
//! ```
//!
//! Mode type `1` ("edit") is region editing, `2` ("inspecting") is
//! inspection. Messages with any other `msgType` are ignored.

use crate::mode::Mode;
use livepage_dom::{Document, NodeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MODE_TYPE_NORMAL: u8 = 0;
pub const MODE_TYPE_EDIT: u8 = 1;
pub const MODE_TYPE_INSPECTING: u8 = 2;

/// Wire form of a message received from the embedding frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msgType", rename_all = "camelCase")]
pub enum InboundMessage {
    SwitchMode {
        #[serde(rename = "dstModeType")]
        dst_mode_type: u8,
    },
}

/// What the frame asked the page to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    SwitchMode(Mode),
}

impl HostCommand {
    /// Decode a posted message. Unknown message kinds and mode numbers
    /// yield `None`.
    pub fn parse(json: &str) -> Option<Self> {
        match serde_json::from_str::<InboundMessage>(json) {
            Ok(message) => Self::from_message(&message),
            Err(err) => {
                debug!(error = %err, "ignoring host message");
                None
            }
        }
    }

    pub fn from_message(message: &InboundMessage) -> Option<Self> {
        match message {
            InboundMessage::SwitchMode { dst_mode_type } => {
                mode_for_type(*dst_mode_type).map(HostCommand::SwitchMode)
            }
        }
    }
}

pub fn mode_for_type(mode_type: u8) -> Option<Mode> {
    match mode_type {
        MODE_TYPE_NORMAL => Some(Mode::Normal),
        MODE_TYPE_EDIT => Some(Mode::RegionEdit),
        MODE_TYPE_INSPECTING => Some(Mode::Inspect),
        _ => None,
    }
}

/// Message the page posts to the embedding frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msgType", rename_all = "camelCase")]
pub enum HostMessage {
    RequestEditMode,
    Edit {
        prototype: String,
        #[serde(rename = "outerHTML")]
        outer_html: String,
        #[serde(rename = "tagName")]
        tag_name: String,
        #[serde(rename = "textContent")]
        text_content: String,
        #[serde(rename = "baseURI")]
        base_uri: String,
    },
}

impl HostMessage {
    /// Describe the clicked node the way the frame expects
    pub fn edit(doc: &Document, target: NodeId) -> Self {
        let tag = doc.tag_name(target).unwrap_or_default();
        HostMessage::Edit {
            prototype: format!("[object {}]", interface_name(tag)),
            outer_html: doc.outer_html(target),
            tag_name: tag.to_ascii_uppercase(),
            text_content: doc.text_content(target),
            base_uri: doc.base_url().map(|u| u.to_string()).unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> String {
        // Plain strings and unit variants only; encoding cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// DOM interface name a browser reports for an element with `tag`
pub fn interface_name(tag: &str) -> &'static str {
    match tag {
        "a" => "HTMLAnchorElement",
        "body" => "HTMLBodyElement",
        "br" => "HTMLBRElement",
        "button" => "HTMLButtonElement",
        "div" => "HTMLDivElement",
        "form" => "HTMLFormElement",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "HTMLHeadingElement",
        "hr" => "HTMLHRElement",
        "html" => "HTMLHtmlElement",
        "iframe" => "HTMLIFrameElement",
        "img" => "HTMLImageElement",
        "input" => "HTMLInputElement",
        "label" => "HTMLLabelElement",
        "li" => "HTMLLIElement",
        "ol" => "HTMLOListElement",
        "p" => "HTMLParagraphElement",
        "picture" => "HTMLPictureElement",
        "select" => "HTMLSelectElement",
        "source" => "HTMLSourceElement",
        "span" => "HTMLSpanElement",
        "table" => "HTMLTableElement",
        "td" | "th" => "HTMLTableCellElement",
        "textarea" => "HTMLTextAreaElement",
        "tr" => "HTMLTableRowElement",
        "ul" => "HTMLUListElement",
        "video" => "HTMLVideoElement",
        _ => "HTMLElement",
    }
}

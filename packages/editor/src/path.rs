//! # PathResolver
//!
//! Structural addresses for nodes.
//!
//! A [`PathKey`] lists one segment per element from just below `<html>`
//! down to the node, joined by `" > "`:
//!
//! ```text
//! body:nth-of-type(1) > div#content > section:nth-of-type(2) > p:nth-of-type(1)
//! ```
//!
//! Elements with an id use `tag#id`, with the id CSS-escaped so values like
//! `hero.v2` or `:r1:` stay one id. Everything else, `<body>` included,
//! uses its 1-based position among same-tag siblings. Because the key is
//! also a valid selector, resolving it is a plain `query_selector`.
//!
//! Keys are only stable while sibling order is unchanged, so they are
//! always recomputed from the live tree and never cached.

use livepage_dom::{Document, NodeId};
use tracing::debug;

pub type PathKey = String;

pub const SEGMENT_SEPARATOR: &str = " > ";

/// Address of `node`, stopping below the document element
pub fn compute_path(doc: &Document, node: NodeId) -> PathKey {
    let document_element = doc.document_element();
    let mut segments = Vec::new();

    for current in doc.ancestors_inclusive(node) {
        if Some(current) == document_element {
            break;
        }
        let Some(tag) = doc.tag_name(current) else {
            break;
        };
        let segment = match doc.attr(current, "id").filter(|id| !id.is_empty()) {
            Some(id) => format!("{}#{}", tag, escape_ident(id)),
            None => format!("{}:nth-of-type({})", tag, doc.nth_of_type(current)),
        };
        segments.push(segment);
    }

    segments.reverse();
    segments.join(SEGMENT_SEPARATOR)
}

/// Escape `value` for use as a CSS identifier.
///
/// Follows `CSS.escape`: control characters and a leading digit become hex
/// escapes, other ASCII punctuation gets a backslash.
pub fn escape_ident(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let starts_with_dash = value.starts_with('-');
    for (i, c) in value.chars().enumerate() {
        let leading_digit =
            c.is_ascii_digit() && (i == 0 || (i == 1 && starts_with_dash));
        if c.is_control() || leading_digit {
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if i == 0 && c == '-' && value.len() == 1 {
            out.push_str("\\-");
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

/// First node in document order matching `path`
pub fn resolve(doc: &Document, path: &str) -> Option<NodeId> {
    match doc.query_selector(path) {
        Ok(found) => found,
        Err(err) => {
            debug!(path = %path, error = %err, "path is not a usable selector");
            None
        }
    }
}

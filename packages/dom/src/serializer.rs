use crate::node::is_void;
use crate::{Document, ElementData, NodeData, NodeId};

/// Substitute element data to write in place of a node's own, if any
pub type Rewrite<'a> = &'a dyn Fn(NodeId, &ElementData) -> Option<ElementData>;

/// Markup of `id`'s children
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    write_children(doc, id, None)
}

/// Markup of `id`'s children with start tags passed through `rewrite`.
///
/// The tree itself is untouched; only the written attributes change.
pub fn inner_html_with(doc: &Document, id: NodeId, rewrite: Rewrite) -> String {
    write_children(doc, id, Some(rewrite))
}

fn write_children(doc: &Document, id: NodeId, rewrite: Option<Rewrite>) -> String {
    let mut out = String::new();
    let raw = doc.tag_name(id).map(is_verbatim).unwrap_or(false);
    for child in doc.children(id) {
        write_node(doc, *child, raw, rewrite, &mut out);
    }
    out
}

/// Markup of `id` itself, including its start and end tags
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let raw = doc
        .parent(id)
        .and_then(|p| doc.tag_name(p))
        .map(is_verbatim)
        .unwrap_or(false);
    write_node(doc, id, raw, None, &mut out);
    out
}

fn write_node(
    doc: &Document,
    id: NodeId,
    raw_parent: bool,
    rewrite: Option<Rewrite>,
    out: &mut String,
) {
    match doc.data(id) {
        NodeData::Document => {
            for child in doc.children(id) {
                write_node(doc, *child, false, rewrite, out);
            }
        }
        NodeData::Doctype(text) => {
            out.push_str("<!");
            out.push_str(text);
            out.push('>');
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Text(text) => {
            if raw_parent {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeData::Element(own) => {
            let replaced = rewrite.and_then(|f| f(id, own));
            let el = replaced.as_ref().unwrap_or(own);
            out.push('<');
            out.push_str(&el.tag);
            for attr in &el.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_attr(&attr.value, out);
                out.push('"');
            }
            out.push('>');

            if is_void(&el.tag) {
                return;
            }

            let raw = is_verbatim(&el.tag);
            for child in doc.children(id) {
                write_node(doc, *child, raw, rewrite, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

/// Elements whose text children are written without escaping
fn is_verbatim(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

//! # Tree Builder
//!
//! Lenient HTML tree construction on top of the logos [`Token`] stream.
//!
//! ## Design
//!
//! The builder keeps a stack of open elements. It does not implement the
//! full HTML5 insertion-mode machine. Instead it follows a small set of
//! implied-end-tag rules that cover real-world pages:
//!
//! - a block start tag closes an open `<p>`
//! - `<li>`, `<dt>`/`<dd>`, `<tr>`, `<td>`/`<th>` and `<option>` close an
//!   open sibling of the same family
//! - an end tag closes everything above its matching open element;
//!   unmatched end tags are ignored
//!
//! Raw-text elements (`script`, `style`, `textarea`, `title`) are sliced
//! out of the source verbatim up to their end tag.

use crate::node::{is_raw_text, is_void, Attribute};
use crate::tokenizer::{end_tag_name, split_start_tag, Token};
use crate::{Document, NodeId};
use logos::Logos;
use tracing::{trace, warn};

/// Start tags that implicitly close an open `<p>`
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "main", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Parse a complete document
pub fn parse(html: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    TreeBuilder::new(&mut doc, root).feed(html);
    doc.detect_base_url();
    doc
}

/// Parse `html` and append the resulting nodes to `parent`
pub fn parse_fragment(doc: &mut Document, parent: NodeId, html: &str) {
    TreeBuilder::new(doc, parent).feed(html);
}

struct TreeBuilder<'d> {
    doc: &'d mut Document,
    base: NodeId,
    open: Vec<NodeId>,
}

impl<'d> TreeBuilder<'d> {
    fn new(doc: &'d mut Document, base: NodeId) -> Self {
        Self {
            doc,
            base,
            open: Vec::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.base)
    }

    fn current_tag(&self) -> Option<&str> {
        self.open.last().and_then(|n| self.doc.tag_name(*n))
    }

    fn append(&mut self, node: NodeId) {
        let parent = self.current();
        // A freshly created node cannot be an ancestor of `parent`
        if let Err(err) = self.doc.append_child(parent, node) {
            warn!(?node, error = %err, "dropped node during tree building");
        }
    }

    fn feed(&mut self, html: &str) {
        let mut lex = Token::lexer(html);
        while let Some(token) = lex.next() {
            match token {
                Ok(Token::Text(text)) | Ok(Token::Lt(text)) => self.text(&decode_entities(text)),
                Ok(Token::Comment(body)) => {
                    let node = self.doc.create_comment(body);
                    self.append(node);
                }
                Ok(Token::Declaration(decl)) => {
                    let inner = decl.trim_start_matches("<!").trim_end_matches('>');
                    let node = if inner.to_ascii_lowercase().starts_with("doctype") {
                        self.doc.create_doctype(inner)
                    } else {
                        self.doc.create_comment(inner)
                    };
                    self.append(node);
                }
                Ok(Token::ProcessingInstruction(_)) => {}
                Ok(Token::StartTag(slice)) => {
                    let tag = split_start_tag(slice);
                    let raw = is_raw_text(&tag.name) && !tag.self_closing;
                    let name = tag.name.clone();
                    self.start_tag(tag.name, tag.attrs, tag.self_closing);

                    if raw {
                        let rest = lex.remainder();
                        let end = find_raw_end(rest, &name);
                        let content = &rest[..end];
                        if !content.is_empty() {
                            let text = if name == "textarea" || name == "title" {
                                decode_entities(content)
                            } else {
                                content.to_string()
                            };
                            let node = self.doc.create_text(text);
                            self.append(node);
                        }
                        lex.bump(end);
                    }
                }
                Ok(Token::EndTag(slice)) => self.end_tag(&end_tag_name(slice)),
                Err(()) => self.text(lex.slice()),
            }
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(last) = self.doc.children(parent).last().copied() {
            if let crate::NodeData::Text(existing) = self.doc.data_mut(last) {
                existing.push_str(text);
                return;
            }
        }
        let node = self.doc.create_text(text);
        self.append(node);
    }

    fn start_tag(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) {
        self.close_implied(&name);

        let attrs = attrs
            .into_iter()
            .map(|(n, v)| Attribute::new(n, decode_entities(&v)))
            .collect();
        let node = self.doc.create_element_with(&name, attrs);
        self.append(node);

        if !is_void(&name) && !self_closing {
            self.open.push(node);
        }
    }

    fn close_implied(&mut self, name: &str) {
        if CLOSES_P.contains(&name) && self.current_tag() == Some("p") {
            self.open.pop();
        }
        match name {
            "li" => self.close_within("li", &["ul", "ol"]),
            "dt" | "dd" => {
                self.close_within("dt", &["dl"]);
                self.close_within("dd", &["dl"]);
            }
            "tr" => {
                self.close_within("td", &["table"]);
                self.close_within("th", &["table"]);
                self.close_within("tr", &["table"]);
            }
            "td" | "th" => {
                self.close_within("td", &["tr", "table"]);
                self.close_within("th", &["tr", "table"]);
            }
            "option" => {
                if self.current_tag() == Some("option") {
                    self.open.pop();
                }
            }
            _ => {}
        }
    }

    /// Close an open `tag` unless one of `boundaries` is open above it
    fn close_within(&mut self, tag: &str, boundaries: &[&str]) {
        let mut close_at = None;
        for (index, node) in self.open.iter().enumerate().rev() {
            let Some(open_tag) = self.doc.tag_name(*node) else {
                continue;
            };
            if open_tag == tag {
                close_at = Some(index);
                break;
            }
            if boundaries.contains(&open_tag) {
                break;
            }
        }
        if let Some(index) = close_at {
            self.open.truncate(index);
        }
    }

    fn end_tag(&mut self, name: &str) {
        let position = self
            .open
            .iter()
            .rposition(|n| self.doc.tag_name(*n) == Some(name));
        match position {
            Some(index) => self.open.truncate(index),
            None => trace!(tag = %name, "ignoring unmatched end tag"),
        }
    }
}

/// Byte offset of the `</name` that ends a raw-text element
fn find_raw_end(rest: &str, name: &str) -> usize {
    let lower = rest.to_ascii_lowercase();
    let needle = format!("</{}", name);
    let mut from = 0;
    while let Some(found) = lower[from..].find(&needle) {
        let at = from + found;
        let after = lower.as_bytes().get(at + needle.len()).copied();
        if matches!(after, None | Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/')) {
            return at;
        }
        from = at + needle.len();
    }
    rest.len()
}

/// Decode the common named references and all numeric references.
///
/// Unknown references are left as written.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match candidate.find(';').filter(|semi| *semi <= 12) {
            Some(semi) => {
                let name = &candidate[1..semi];
                match decode_reference(name) {
                    Some(ch) => {
                        out.push(ch);
                        rest = &candidate[semi + 1..];
                    }
                    None => {
                        out.push('&');
                        rest = &candidate[1..];
                    }
                }
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "laquo" => '«',
        "raquo" => '»',
        "middot" => '·',
        "times" => '×',
        "rarr" => '→',
        "larr" => '←',
        _ => return None,
    };
    Some(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_find_raw_end_skips_lookalikes() {
        let rest = "var s = '</scripts>'; </SCRIPT>";
        let end = find_raw_end(rest, "script");
        assert_eq!(&rest[end..], "</SCRIPT>");
    }
}

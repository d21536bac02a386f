//! # Styles
//!
//! Inline declarations, `<style>` sheets and a small cascade.
//!
//! ## Design
//!
//! ```text
//! <style> text ──► Stylesheet { rules: [StyleRule { selectors, decls, order }] }
//!                                   │
//! style="..." ──► inline decls ─────┼──► StyleResolver::value(node, prop)
//!                                   ▼
//!                 winner = inline > (specificity, source order)
//! ```
//!
//! At-rules (`@media`, `@font-face`, ...) are skipped along with their
//! blocks, as are rules whose selectors the engine cannot parse.

use crate::selector::{SelectorList, Specificity};
use crate::{Document, NodeData, NodeId};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: property.trim().to_ascii_lowercase(),
            value: value.trim().to_string(),
        }
    }
}

/// Parse `color: red; background: url("a;b.png")` into declarations.
///
/// Semicolons inside quotes or parentheses do not split.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    let mut out = Vec::new();
    for chunk in split_outside(text, ';') {
        let Some((property, value)) = chunk.split_once(':') else {
            continue;
        };
        if property.trim().is_empty() || value.trim().is_empty() {
            continue;
        }
        let value = value.trim().trim_end_matches("!important").trim();
        out.push(Declaration::new(property, value));
    }
    out
}

pub fn serialize_declarations(decls: &[Declaration]) -> String {
    decls
        .iter()
        .map(|d| format!("{}: {};", d.property, d.value))
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_outside(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, c) if c == separator && depth <= 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selectors: SelectorList,
    pub declarations: Vec<Declaration>,
    pub order: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<StyleRule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let mut sheet = Stylesheet::default();
        sheet.extend(css);
        sheet
    }

    /// Collect the rules of every `<style>` element in the document
    pub fn from_document(doc: &Document) -> Self {
        let mut sheet = Stylesheet::default();
        for style in doc.elements_by_tag(doc.root(), "style") {
            sheet.extend(&doc.text_content(style));
        }
        sheet
    }

    fn extend(&mut self, css: &str) {
        let css = strip_comments(css);
        let mut rest = css.as_str();
        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            let Some(close) = matching_brace(rest, open) else {
                break;
            };
            let body = &rest[open + 1..close];
            rest = &rest[close + 1..];

            if prelude.starts_with('@') {
                continue;
            }
            match SelectorList::parse(prelude) {
                Ok(selectors) => self.rules.push(StyleRule {
                    selectors,
                    declarations: parse_declarations(body),
                    order: self.rules.len(),
                }),
                Err(err) => debug!(selector = %prelude, error = %err, "skipping style rule"),
            }
        }
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, ch) in text[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Cascaded property lookup over one document.
///
/// Build it once per pass; it snapshots the document's `<style>` blocks.
pub struct StyleResolver {
    sheet: Stylesheet,
}

impl StyleResolver {
    pub fn new(doc: &Document) -> Self {
        Self {
            sheet: Stylesheet::from_document(doc),
        }
    }

    pub fn with_sheet(sheet: Stylesheet) -> Self {
        Self { sheet }
    }

    /// Winning declaration for any of `properties`, inline first.
    fn winner(&self, doc: &Document, node: NodeId, properties: &[&str]) -> Option<Declaration> {
        if let Some(style) = doc.attr(node, "style") {
            let inline = parse_declarations(style)
                .into_iter()
                .rev()
                .find(|d| properties.contains(&d.property.as_str()));
            if inline.is_some() {
                return inline;
            }
        }

        let mut best: Option<(Specificity, usize, &Declaration)> = None;
        for rule in &self.sheet.rules {
            let Some(specificity) = rule.selectors.matching_specificity(doc, node) else {
                continue;
            };
            for decl in rule
                .declarations
                .iter()
                .filter(|d| properties.contains(&d.property.as_str()))
            {
                let candidate = (specificity, rule.order, decl);
                let replace = match &best {
                    None => true,
                    Some((s, o, _)) => (specificity, rule.order) >= (*s, *o),
                };
                if replace {
                    best = Some(candidate);
                }
            }
        }
        best.map(|(_, _, d)| d.clone())
    }

    /// Cascaded value of a single property
    pub fn value(&self, doc: &Document, node: NodeId, property: &str) -> Option<String> {
        if !matches!(doc.data(node), NodeData::Element(_)) {
            return None;
        }
        self.winner(doc, node, &[property]).map(|d| d.value)
    }

    /// Resolved `background-image`, reading the `background` shorthand too.
    ///
    /// Returns `None` for `none` or when nothing sets an image.
    pub fn background_image(&self, doc: &Document, node: NodeId) -> Option<String> {
        if !doc.is_element(node) {
            return None;
        }
        let decl = self.winner(doc, node, &["background-image", "background"])?;
        let value = if decl.property == "background" {
            background_layer(&decl.value)?
        } else {
            decl.value
        };
        if value.eq_ignore_ascii_case("none") || value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Image part of a `background` shorthand value
fn background_layer(shorthand: &str) -> Option<String> {
    if let Some(m) = url_regex().find(shorthand) {
        return Some(m.as_str().to_string());
    }
    let lower = shorthand.to_ascii_lowercase();
    lower
        .find("gradient(")
        .map(|_| shorthand.to_string())
}

fn url_regex() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r#"url\(\s*['"]?(.*?)['"]?\s*\)"#).expect("url pattern is valid")
    })
}

/// First `url(...)` target inside a CSS value
pub fn extract_url(value: &str) -> Option<String> {
    url_regex()
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

pub fn is_gradient(value: &str) -> bool {
    value.to_ascii_lowercase().contains("gradient")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declarations_respects_parens() {
        let decls = parse_declarations("background: url('a;b.png') no-repeat; color:red ; ;");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].value, "url('a;b.png') no-repeat");
        assert_eq!(decls[1], Declaration::new("color", "red"));
    }

    #[test]
    fn test_extract_url_variants() {
        assert_eq!(extract_url("url(a.png)").as_deref(), Some("a.png"));
        assert_eq!(extract_url("url( \"b c.png\" )").as_deref(), Some("b c.png"));
        assert_eq!(extract_url("url('data:image/png;base64,xx')").as_deref(), Some("data:image/png;base64,xx"));
        assert_eq!(extract_url("none"), None);
    }

    #[test]
    fn test_cascade_inline_then_specificity() {
        let doc = Document::parse(concat!(
            "<style>.hero { background-image: url(low.png) } ",
            "#top.hero { background: url(high.png) center } ",
            "@media (max-width: 10px) { .hero { background-image: url(media.png) } }</style>",
            "<div id=\"top\" class=\"hero\"></div><div class=\"hero\" style=\"background-image: none\"></div>"
        ));
        let resolver = StyleResolver::new(&doc);
        let divs = doc.elements_by_tag(doc.root(), "div");
        assert_eq!(
            resolver.background_image(&doc, divs[0]).as_deref(),
            Some("url(high.png)")
        );
        assert_eq!(resolver.background_image(&doc, divs[1]), None);
    }

    #[test]
    fn test_later_rule_wins_on_tie() {
        let doc = Document::parse("<style>p { color: red } p { color: blue }</style><p>x</p>");
        let resolver = StyleResolver::new(&doc);
        let p = doc.first_element_by_tag("p").unwrap();
        assert_eq!(resolver.value(&doc, p, "color").as_deref(), Some("blue"));
    }

    #[test]
    fn test_gradient_detection() {
        assert!(is_gradient("linear-gradient(red, blue)"));
        assert!(!is_gradient("url(a.png)"));
    }
}

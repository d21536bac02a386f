//! # Selectors
//!
//! The subset of CSS selectors the overlay needs: structural paths such as
//! `body > div:nth-of-type(2) > p#intro`, the matching used by `<style>`
//! rules, and attribute probes like `[class*="carousel"]`.
//!
//! ## Supported grammar
//!
//! ```text
//! list      := complex ("," complex)*
//! complex   := compound (combinator compound)*
//! combinator:= ">" | whitespace
//! compound  := (tag | "*")? ("#" id | "." class | "[" attr "]" | ":nth-of-type(" n ")")*
//! attr      := name | name "=" value | name "*=" value
//! ```
//!
//! Anything else (pseudo-elements, `+`, `~`, other pseudo-classes) is a
//! parse error. Callers that scan stylesheets skip rules that fail to parse.

use crate::error::{DomError, DomResult};
use crate::{Document, NodeId};

#[derive(Debug, Clone, PartialEq)]
pub enum AttrMatcher {
    Exists(String),
    Equals(String, String),
    Contains(String, String),
}

impl AttrMatcher {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            AttrMatcher::Exists(name) => doc.has_attr(node, name),
            AttrMatcher::Equals(name, value) => doc.attr(node, name) == Some(value.as_str()),
            AttrMatcher::Contains(name, value) => doc
                .attr(node, name)
                .map(|v| !value.is_empty() && v.contains(value.as_str()))
                .unwrap_or(false),
        }
    }
}

/// One compound selector, e.g. `div#main.card[data-x]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrMatcher>,
    pub nth_of_type: Option<usize>,
}

impl Compound {
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if expected != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attr(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        if !self.attrs.iter().all(|a| a.matches(doc, node)) {
            return false;
        }
        if let Some(n) = self.nth_of_type {
            if doc.nth_of_type(node) != n {
                return false;
            }
        }
        true
    }

    fn is_empty(&self) -> bool {
        self == &Compound::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// Compounds joined by combinators, stored left to right.
///
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub compounds: Vec<Compound>,
    pub combinators: Vec<Combinator>,
}

/// `(ids, classes + attributes + pseudo-classes, tags)`
pub type Specificity = (u32, u32, u32);

impl ComplexSelector {
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self.compounds.len() {
            0 => false,
            n => self.match_at(doc, node, n - 1),
        }
    }

    fn match_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent_element(node)
                .map(|parent| self.match_at(doc, parent, index - 1))
                .unwrap_or(false),
            Combinator::Descendant => doc
                .ancestors(node)
                .filter(|a| doc.is_element(*a))
                .any(|a| self.match_at(doc, a, index - 1)),
        }
    }

    pub fn specificity(&self) -> Specificity {
        self.compounds.iter().fold((0, 0, 0), |(a, b, c), compound| {
            (
                a + compound.id.is_some() as u32,
                b + compound.classes.len() as u32
                    + compound.attrs.len() as u32
                    + compound.nth_of_type.is_some() as u32,
                c + compound.tag.is_some() as u32,
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

impl SelectorList {
    pub fn parse(source: &str) -> DomResult<Self> {
        SelectorParser::new(source).parse_list()
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.0.iter().any(|s| s.matches(doc, node))
    }

    /// Highest specificity among the selectors that match `node`
    pub fn matching_specificity(&self, doc: &Document, node: NodeId) -> Option<Specificity> {
        self.0
            .iter()
            .filter(|s| s.matches(doc, node))
            .map(ComplexSelector::specificity)
            .max()
    }
}

struct SelectorParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> DomError {
        DomError::invalid_selector(self.source, self.pos, message)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().map(char::is_whitespace).unwrap_or(false) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, ch: char) -> DomResult<()> {
        if self.peek() == Some(ch) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected `{}`", ch)))
        }
    }

    fn parse_list(&mut self) -> DomResult<SelectorList> {
        let mut list = Vec::new();
        loop {
            self.skip_ws();
            list.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                None => break,
                Some(other) => return Err(self.error(format!("unexpected `{}`", other))),
            }
        }
        Ok(SelectorList(list))
    }

    fn parse_complex(&mut self) -> DomResult<ComplexSelector> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    combinators.push(Combinator::Child);
                }
                Some(',') | None => break,
                Some(_) if had_ws => combinators.push(Combinator::Descendant),
                Some(other) => return Err(self.error(format!("unexpected `{}`", other))),
            }
            compounds.push(self.parse_compound()?);
        }
        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> DomResult<Compound> {
        let mut compound = Compound::default();
        let mut universal = false;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                universal = true;
            }
            Some(c) if is_ident_char(c) || c == '\\' => {
                compound.tag = Some(self.ident().to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    let id = self.ident();
                    if id.is_empty() {
                        return Err(self.error("empty id"));
                    }
                    compound.id = Some(id);
                }
                Some('.') => {
                    self.pos += 1;
                    let class = self.ident();
                    if class.is_empty() {
                        return Err(self.error("empty class"));
                    }
                    compound.classes.push(class);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.nth_of_type = Some(self.pseudo()?);
                }
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    /// Identifier with CSS escapes decoded, so `\.` and `\2e ` both read as `.`
    fn ident(&mut self) -> String {
        let mut out = String::new();
        loop {
            match self.peek() {
                Some('\\') => {
                    self.pos += 1;
                    match self.escaped() {
                        Some(c) => out.push(c),
                        None => break,
                    }
                }
                Some(c) if is_ident_char(c) => {
                    out.push(c);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        out
    }

    /// Character after a backslash: up to six hex digits and one optional
    /// space, or any other character taken literally
    fn escaped(&mut self) -> Option<char> {
        let start = self.pos;
        while self.pos - start < 6
            && self.peek().map(|c| c.is_ascii_hexdigit()).unwrap_or(false)
        {
            self.pos += 1;
        }
        if self.pos == start {
            let c = self.peek()?;
            self.pos += 1;
            return Some(c);
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        if self.peek().map(char::is_whitespace).unwrap_or(false) {
            self.pos += 1;
        }
        let code = u32::from_str_radix(&digits, 16).unwrap_or(0xFFFD);
        Some(char::from_u32(code).filter(|c| *c != '\0').unwrap_or('\u{FFFD}'))
    }

    fn attribute(&mut self) -> DomResult<AttrMatcher> {
        self.skip_ws();
        let name = self.ident().to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.error("expected attribute name"));
        }
        self.skip_ws();
        let matcher = match self.peek() {
            Some(']') => AttrMatcher::Exists(name),
            Some('=') => {
                self.pos += 1;
                AttrMatcher::Equals(name, self.attr_value()?)
            }
            Some('*') => {
                self.pos += 1;
                self.expect('=')?;
                AttrMatcher::Contains(name, self.attr_value()?)
            }
            _ => return Err(self.error("unsupported attribute operator")),
        };
        self.skip_ws();
        self.expect(']')?;
        Ok(matcher)
    }

    fn attr_value(&mut self) -> DomResult<String> {
        self.skip_ws();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().map(|c| c != quote).unwrap_or(false) {
                    self.pos += 1;
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.expect(quote)?;
                Ok(value)
            }
            _ => Ok(self.ident()),
        }
    }

    fn pseudo(&mut self) -> DomResult<usize> {
        let name = self.ident();
        if name != "nth-of-type" {
            return Err(self.error(format!("unsupported pseudo-class `{}`", name)));
        }
        self.expect('(')?;
        self.skip_ws();
        let start = self.pos;
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        let n = digits
            .parse::<usize>()
            .map_err(|_| self.error("expected a position"))?;
        self.skip_ws();
        self.expect(')')?;
        Ok(n)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

impl Document {
    /// First element in document order matching `selector`
    pub fn query_selector(&self, selector: &str) -> DomResult<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .all_elements()
            .into_iter()
            .find(|n| list.matches(self, *n)))
    }

    /// Every element matching `selector`, in document order
    pub fn query_selector_all(&self, selector: &str) -> DomResult<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .all_elements()
            .into_iter()
            .filter(|n| list.matches(self, *n))
            .collect())
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> DomResult<bool> {
        Ok(SelectorList::parse(selector)?.matches(self, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse(concat!(
            "<html><body>",
            "<div id=\"main\" class=\"card wide\">",
            "<p>first</p><p class=\"lead\">second</p>",
            "<div class=\"my-carousel\"><img src=\"a.png\"></div>",
            "</div>",
            "</body></html>"
        ))
    }

    #[test]
    fn test_child_and_nth_of_type() {
        let doc = doc();
        let p = doc
            .query_selector("body > div#main > p:nth-of-type(2)")
            .unwrap()
            .unwrap();
        assert_eq!(doc.text_content(p), "second");
    }

    #[test]
    fn test_descendant_and_class() {
        let doc = doc();
        let imgs = doc.query_selector_all("div.card img").unwrap();
        assert_eq!(imgs.len(), 1);
        assert!(doc.query_selector("div.card.narrow").unwrap().is_none());
    }

    #[test]
    fn test_attribute_contains() {
        let doc = doc();
        let found = doc.query_selector_all("[class*=\"carousel\"]").unwrap();
        assert_eq!(found.len(), 1);
        let found = doc.query_selector_all("img[src=\"a.png\"], p.lead").unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_specificity_ordering() {
        let list = SelectorList::parse("div#main p.lead").unwrap();
        assert_eq!(list.0[0].specificity(), (1, 1, 2));
    }

    #[test]
    fn test_escaped_ids() {
        let doc = Document::parse(concat!(
            "<div id=\"hero.v2\">a</div>",
            "<div id=\":r1:\">b</div>",
            "<div id=\"1st\">c</div>"
        ));
        let text = |selector: &str| doc.text_content(doc.query_selector(selector).unwrap().unwrap());
        assert_eq!(text("div#hero\\.v2"), "a");
        assert_eq!(text("#\\:r1\\:"), "b");
        assert_eq!(text("div#\\3a r1\\3a "), "b");
        assert_eq!(text("#\\31 st"), "c");
        assert!(doc.query_selector("div#hero.v2").unwrap().is_none());
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(SelectorList::parse("a::before").is_err());
        assert!(SelectorList::parse("a + b").is_err());
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("p:hover").is_err());
    }
}

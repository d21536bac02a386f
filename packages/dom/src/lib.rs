//! # Livepage DOM
//!
//! Mutable HTML document model used by the editing overlay and the CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ tokenizer: logos tokens (tags, text, ...)    │
//! └──────────────────────────────────────────────┘
//!                     ↓
//! ┌──────────────────────────────────────────────┐
//! │ parser: lenient tree builder                 │
//! └──────────────────────────────────────────────┘
//!                     ↓
//! ┌──────────────────────────────────────────────┐
//! │ document: arena of nodes + tree mutations    │
//! │  - selectors (query_selector / matches)      │
//! │  - styles (inline decls + <style> cascade)   │
//! │  - serializer (inner/outer HTML)             │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use livepage_dom::Document;
//!
//! let mut doc = Document::parse("<body><p>Hello</p></body>");
//! let p = doc.query_selector("body > p:nth-of-type(1)").unwrap().unwrap();
//! doc.set_inner_html(p, "Hello <b>World</b>").unwrap();
//! assert_eq!(doc.to_html(), "<body><p>Hello <b>World</b></p></body>");
//! ```

pub mod document;
pub mod error;
pub mod node;
pub mod parser;
pub mod selector;
pub mod serializer;
pub mod style;
pub mod tokenizer;

pub use document::Document;
pub use error::{DomError, DomResult};
pub use node::{Attribute, ElementData, NodeData, NodeId};
pub use selector::SelectorList;
pub use style::{extract_url, is_gradient, Declaration, StyleResolver, Stylesheet};

/// Parse a complete document
pub fn parse(html: &str) -> Document {
    parser::parse(html)
}

#[cfg(test)]
mod tests_parser;

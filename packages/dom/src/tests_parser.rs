//! Tree-building behaviour on realistic page fragments
use crate::*;

#[test]
fn test_full_page_structure() {
    let doc = parse(concat!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>A &amp; B</title></head>\n",
        "<body><h1>Title</h1><!-- hero --><div class=\"hero\"><img src=\"hero.jpg\" alt=\"\"></div></body>\n</html>\n"
    ));

    let html = doc.document_element().unwrap();
    assert!(doc.is_tag(html, "html"));
    assert_eq!(doc.attr(html, "lang"), Some("en"));

    let head = doc.head().unwrap();
    let title = doc.elements_by_tag(head, "title")[0];
    assert_eq!(doc.text_content(title), "A & B");

    let body = doc.body().unwrap();
    let tags: Vec<&str> = doc
        .element_children(body)
        .into_iter()
        .filter_map(|n| doc.tag_name(n))
        .collect();
    assert_eq!(tags, vec!["h1", "div"]);
    assert!(matches!(doc.data(doc.children(doc.root())[0]), NodeData::Doctype(_)));
}

#[test]
fn test_implied_paragraph_and_list_ends() {
    let doc = parse("<body><p>one<p>two<div>block</div><ul><li>a<li>b</ul></body>");
    let body = doc.body().unwrap();
    let tags: Vec<&str> = doc
        .element_children(body)
        .into_iter()
        .filter_map(|n| doc.tag_name(n))
        .collect();
    assert_eq!(tags, vec!["p", "p", "div", "ul"]);

    let ul = doc.first_element_by_tag("ul").unwrap();
    assert_eq!(doc.element_children(ul).len(), 2);
}

#[test]
fn test_table_cells_close_each_other() {
    let doc = parse("<table><tr><td>1<td>2<tr><td>3</table>");
    let rows = doc.elements_by_tag(doc.root(), "tr");
    assert_eq!(rows.len(), 2);
    assert_eq!(doc.element_children(rows[0]).len(), 2);
    assert_eq!(doc.element_children(rows[1]).len(), 1);
}

#[test]
fn test_unmatched_end_tags_are_ignored() {
    let doc = parse("<div><span>x</b></span></div></section>");
    assert_eq!(doc.to_html(), "<div><span>x</span></div>");
}

#[test]
fn test_unclosed_elements_close_at_eof() {
    let doc = parse("<div><p>dangling");
    assert_eq!(doc.to_html(), "<div><p>dangling</p></div>");
}

#[test]
fn test_style_content_is_raw() {
    let doc = parse("<style>a > b { color: red }</style>");
    let style = doc.first_element_by_tag("style").unwrap();
    assert_eq!(doc.text_content(style), "a > b { color: red }");
    assert_eq!(doc.to_html(), "<style>a > b { color: red }</style>");
}

#[test]
fn test_fragment_serialization_is_stable() {
    let src = "<section id=\"s\"><h2>Heading</h2><p>Some <em>rich</em> text&nbsp;here.</p></section>";
    let doc = parse(src);
    let reparsed = parse(&doc.to_html());
    assert_eq!(doc.to_html(), reparsed.to_html());
    assert_eq!(doc.to_html(), src);
}

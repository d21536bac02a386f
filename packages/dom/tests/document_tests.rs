use livepage_dom::{parse, Document, NodeData};

#[test]
fn test_clone_and_reinsert_preserves_markup() {
    let mut doc = parse("<body><div id=\"box\" class=\"a\"><p>Hi <b>there</b></p></div></body>");
    let div = doc.get_element_by_id("box").unwrap();
    let (clone, mapping) = doc.clone_subtree(div);
    doc.set_attr(clone, "id", "box-copy").unwrap();
    doc.insert_after(div, clone).unwrap();

    assert_eq!(mapping[0], (div, clone));
    assert_eq!(
        doc.to_html(),
        "<body><div id=\"box\" class=\"a\"><p>Hi <b>there</b></p></div>\
         <div id=\"box-copy\" class=\"a\"><p>Hi <b>there</b></p></div></body>"
    );
}

#[test]
fn test_replace_swaps_node_in_place() {
    let mut doc = parse("<ul><li>a</li><li>b</li><li>c</li></ul>");
    let ul = doc.first_element_by_tag("ul").unwrap();
    let middle = doc.element_children(ul)[1];
    let replacement = doc.create_element("li");
    doc.set_text_content(replacement, "B");
    doc.replace(middle, replacement).unwrap();

    assert_eq!(doc.inner_html(ul), "<li>a</li><li>B</li><li>c</li>");
    assert!(!doc.is_attached(middle));
}

#[test]
fn test_selectors_on_parsed_page() {
    let doc = parse(
        "<html><body><div class=\"slider\"><img src=\"1.png\"><img src=\"2.png\"></div>\
         <div><img src=\"3.png\"></div></body></html>",
    );
    let sliders = doc.query_selector_all("[class*=\"slider\"]").unwrap();
    assert_eq!(sliders.len(), 1);
    assert_eq!(doc.elements_by_tag(sliders[0], "img").len(), 2);

    let third = doc
        .query_selector("body > div:nth-of-type(2) > img:nth-of-type(1)")
        .unwrap()
        .unwrap();
    assert_eq!(doc.attr(third, "src"), Some("3.png"));
}

#[test]
fn test_empty_document() {
    let doc = Document::new();
    assert!(doc.is_empty());
    assert!(doc.body().is_none());
    assert!(matches!(doc.data(doc.root()), NodeData::Document));
    assert_eq!(doc.to_html(), "");
}

//! Mode switching, region editing, text editing and detection, driven
//! through `Editor::dispatch` the way a host would.

use crate::geometry::{Rect, StaticLayout};
use crate::highlight::HighlightKind;
use crate::image::{CAROUSEL_HINT_ATTR, IMAGE_COUNT_ATTR, LINK_ATTR};
use crate::listeners::{Handler, Owner};
use crate::mode::Mode;
use crate::reads::MemoryFiles;
use crate::store::{MemoryStorage, LAST_MODIFIED_KEY};
use crate::ui::{self, ModeButton};
use crate::{Editor, Event};
use livepage_dom::Document;

/// Static overlay markup as `livepage inject` appends it
pub(crate) const OVERLAY_MARKUP: &str = concat!(
    "<div id=\"elementInspector\" style=\"display: none\"></div>",
    "<div id=\"divEditorButtons\" style=\"display: none\">",
    "<button id=\"editDuplicateBtn\">Duplicate</button>",
    "<button id=\"editRemoveBtn\">Remove</button></div>",
    "<div id=\"imageUploadModal\" style=\"display: none\"><div class=\"modal-content\">",
    "<h3>Replace image</h3><p id=\"imageUploadDescription\"></p>",
    "<div id=\"uploadTypeToggle\" style=\"display: none\">",
    "<label><input type=\"radio\" name=\"uploadType\" value=\"single\"> One image</label>",
    "<label><input type=\"radio\" name=\"uploadType\" value=\"multiple\" checked> Several images</label>",
    "</div>",
    "<input type=\"file\" id=\"imageFileInput\" accept=\"image/*\"><div id=\"imagePreview\"></div>",
    "<input type=\"file\" id=\"multipleImageFileInput\" accept=\"image/*\" multiple>",
    "<div id=\"multipleImagePreview\"></div>",
    "<button id=\"cancelImageUpload\">Cancel</button>",
    "<button id=\"applyImageUpload\">Apply</button>",
    "</div></div>",
);

pub(crate) fn overlay_page(body: &str) -> String {
    format!(
        "<html><head><base href=\"https://example.com/\"></head><body>{}{}</body></html>",
        body, OVERLAY_MARKUP
    )
}

pub(crate) fn editor_with(doc: Document, layout: StaticLayout, files: MemoryFiles) -> Editor {
    Editor::new(
        doc,
        Box::new(layout),
        Box::new(MemoryStorage::new()),
        Box::new(files),
    )
    .unwrap()
}

fn editor_for(body: &str) -> Editor {
    editor_with(
        Document::parse(&overlay_page(body)),
        StaticLayout::new(),
        MemoryFiles::new(),
    )
}

fn active_buttons(editor: &Editor) -> usize {
    Mode::EDITING
        .iter()
        .filter_map(|m| ModeButton::for_mode(*m))
        .filter(|b| {
            let node = editor.document().get_element_by_id(b.id).unwrap();
            editor.document().text_content(node).starts_with("Disable")
        })
        .count()
}

#[test]
fn test_toggle_sequences_keep_one_mode_and_leave_no_residue() {
    let mut editor = editor_for(concat!(
        "<section id=\"hero\" style=\"cursor: move\"><h1>Title</h1><p>Intro</p>",
        "<img src=\"a.png\"></section>",
        "<div class=\"slider\"><img src=\"s1.png\"><img src=\"s2.png\"></div>",
        "<a href=\"/x\"><img src=\"link.png\"></a>"
    ));

    let sequence = [
        Mode::Inspect,
        Mode::RegionEdit,
        Mode::RegionEdit,
        Mode::TextEdit,
        Mode::ImageEdit,
        Mode::Inspect,
        Mode::ImageEdit,
        Mode::ImageEdit,
        Mode::TextEdit,
        Mode::TextEdit,
    ];
    for requested in sequence {
        let active = editor.toggle(requested);
        for other in Mode::EDITING.into_iter().filter(|m| *m != active) {
            assert_eq!(
                editor.listeners().count_owned(Owner::Mode(other)),
                0,
                "{:?} left listeners while {:?} is active",
                other,
                active
            );
            assert_eq!(editor.session().ledger.count_owned(other), 0);
        }
        assert_eq!(active_buttons(&editor), usize::from(active.is_editing()));
    }
    assert_eq!(editor.active_mode(), Mode::Normal);
    assert_eq!(editor.listeners().pointer_move(), None);

    let html = editor.document().to_html();
    for residue in [
        "contenteditable",
        "text-editable",
        "image-editable",
        "carousel-container-editable",
        "data-carousel-hint",
        "div-image-container",
        "data-image-editable-container",
        "cursor: pointer",
        "position: relative",
    ] {
        assert!(!html.contains(residue), "found {} after teardown", residue);
    }
    let hero = editor.document().get_element_by_id("hero").unwrap();
    assert_eq!(
        editor.document().style_property(hero, "cursor").as_deref(),
        Some("move")
    );
}

#[test]
fn test_region_select_duplicate_remove() {
    let doc = Document::parse(&overlay_page(concat!(
        "<main id=\"page\"><section id=\"card\"><p>Body</p></section>",
        "<section id=\"other\"></section></main>"
    )));
    let main = doc.get_element_by_id("page").unwrap();
    let card = doc.get_element_by_id("card").unwrap();
    let layout = StaticLayout::new()
        .with_rect(main, Rect::new(0.0, 0.0, 800.0, 600.0))
        .with_rect(card, Rect::new(10.0, 20.0, 300.0, 100.0))
        .with_scroll(0.0, 50.0);
    let mut editor = editor_with(doc, layout, MemoryFiles::new());
    editor.toggle(Mode::RegionEdit);

    editor.dispatch(Event::PointerMove { x: 50.0, y: 50.0 });
    assert_eq!(
        editor.session().highlighter.target(HighlightKind::Hover),
        Some(card)
    );

    let p = editor.document().first_element_by_tag("p").unwrap();
    let outcome = editor.dispatch(Event::Click { target: p });
    assert!(outcome.default_prevented);
    assert!(outcome.propagation_stopped);
    assert_eq!(editor.selected_region(), Some(card));

    let doc = editor.document();
    assert_eq!(
        doc.style_property(card, "border").as_deref(),
        Some("2px solid #34a853")
    );
    let cluster = doc.get_element_by_id(ui::ACTION_CLUSTER_ID).unwrap();
    assert_eq!(doc.style_property(cluster, "display").as_deref(), Some("flex"));
    assert_eq!(doc.style_property(cluster, "top").as_deref(), Some("175px"));
    assert_eq!(doc.style_property(cluster, "left").as_deref(), Some("220px"));

    // Duplicate through the cluster; the click must not reach `main`
    let duplicate = doc.get_element_by_id(ui::DUPLICATE_BUTTON_ID).unwrap();
    editor.dispatch(Event::Click { target: duplicate });
    let doc = editor.document();
    assert_eq!(doc.element_children(main).len(), 3);
    let clone = doc.get_element_by_id("card-copy").unwrap();
    assert_eq!(doc.element_children(main)[1], clone);
    assert_eq!(editor.selected_region(), Some(card));
    assert_eq!(doc.style_property(clone, "border"), None);
    assert_eq!(doc.style_property(clone, "cursor").as_deref(), Some("pointer"));
    assert!(editor.listeners().is_bound(clone, Handler::SelectRegion));

    let remove = doc.get_element_by_id(ui::REMOVE_BUTTON_ID).unwrap();
    editor.dispatch(Event::Click { target: remove });
    let doc = editor.document();
    assert_eq!(doc.element_children(main).len(), 2);
    assert!(!doc.is_attached(card));
    assert_eq!(editor.selected_region(), None);
    assert!(ui::is_hidden(doc, cluster));
    assert!(editor.store().storage().get(LAST_MODIFIED_KEY).unwrap().is_some());

    // The duplicate picked up the mode's cursor; teardown takes it back
    editor.toggle(Mode::RegionEdit);
    assert_eq!(editor.document().style_property(clone, "cursor"), None);
}

#[test]
fn test_clicking_selected_region_toggles_it_off() {
    let mut editor = editor_for("<section id=\"a\"></section><article id=\"b\"></article>");
    editor.toggle(Mode::RegionEdit);
    let a = editor.document().get_element_by_id("a").unwrap();
    let b = editor.document().get_element_by_id("b").unwrap();

    editor.dispatch(Event::Click { target: a });
    editor.dispatch(Event::Click { target: b });
    assert_eq!(editor.selected_region(), Some(b));
    assert_eq!(editor.document().style_property(a, "border"), None);

    editor.dispatch(Event::Click { target: b });
    assert_eq!(editor.selected_region(), None);
    assert_eq!(editor.document().style_property(b, "box-shadow"), None);
}

#[test]
fn test_text_edit_persists_by_path() {
    let mut editor = editor_for(concat!(
        "<div id=\"intro\"><h2>Heading</h2><p>First</p></div>",
        "<ul><li id=\"menu\"><span><b>x</b></span><span><b></b></span><span><b></b></span>",
        "<span><b></b></span><span><b></b></span><span><b></b></span></li></ul>"
    ));
    editor.toggle(Mode::TextEdit);

    let doc = editor.document();
    let h2 = doc.first_element_by_tag("h2").unwrap();
    let menu = doc.get_element_by_id("menu").unwrap();
    assert_eq!(doc.attr(h2, "contenteditable"), Some("true"));
    assert!(!doc.has_attr(menu, "contenteditable"));
    for node in editor.listeners().nodes_with(Handler::PersistText) {
        assert!(!ui::is_overlay_ui(editor.document(), node));
    }

    editor
        .document_mut()
        .set_inner_html(h2, "Hello World")
        .unwrap();
    editor.dispatch(Event::Input { target: h2 });
    let texts = &editor.store().maps().texts;
    assert_eq!(
        texts.get("body:nth-of-type(1) > div#intro > h2:nth-of-type(1)").map(String::as_str),
        Some("Hello World")
    );

    editor.toggle(Mode::TextEdit);
    let doc = editor.document();
    assert!(!doc.is_attached(h2));
    let fresh = doc.first_element_by_tag("h2").unwrap();
    assert_eq!(doc.text_content(fresh), "Hello World");
    assert!(!doc.has_attr(fresh, "contenteditable"));
    assert!(editor.listeners().nodes_with(Handler::PersistText).is_empty());
}

#[test]
fn test_text_edit_on_nested_markup_stores_clean_html() {
    let mut editor = editor_for("<p>Hello <span>world</span></p>");
    editor.toggle(Mode::TextEdit);

    let doc = editor.document();
    let p = doc.first_element_by_tag("p").unwrap();
    let span = doc.first_element_by_tag("span").unwrap();
    assert_eq!(doc.attr(span, "contenteditable"), Some("true"));

    editor.dispatch(Event::Input { target: span });
    editor.dispatch(Event::Input { target: p });
    editor.toggle(Mode::TextEdit);

    let texts = &editor.store().maps().texts;
    assert_eq!(
        texts.get("body:nth-of-type(1) > p:nth-of-type(1)").map(String::as_str),
        Some("Hello <span>world</span>")
    );
    assert_eq!(
        texts
            .get("body:nth-of-type(1) > p:nth-of-type(1) > span:nth-of-type(1)")
            .map(String::as_str),
        Some("world")
    );
    for markup in texts.values() {
        assert!(!markup.contains("contenteditable"), "{}", markup);
        assert!(!markup.contains("text-editable"), "{}", markup);
    }
}

#[test]
fn test_inspect_tooltip_follows_pointer() {
    let doc = Document::parse(&overlay_page(
        "<div id=\"card\" class=\"box wide\"><p>text</p></div>",
    ));
    let card = doc.get_element_by_id("card").unwrap();
    let p = doc.first_element_by_tag("p").unwrap();
    let layout = StaticLayout::new()
        .with_rect(card, Rect::new(0.0, 0.0, 400.0, 200.0))
        .with_rect(p, Rect::new(10.0, 10.0, 100.0, 20.0))
        .with_viewport(1000.0, 600.0);
    let mut editor = editor_with(doc, layout, MemoryFiles::new());
    editor.toggle(Mode::Inspect);

    editor.dispatch(Event::PointerMove { x: 20.0, y: 15.0 });
    let doc = editor.document();
    let tooltip = doc.get_element_by_id(ui::INSPECTOR_ID).unwrap();
    assert_eq!(
        doc.inner_html(tooltip),
        "<div><strong>div#card.box.wide</strong></div>"
    );
    assert_eq!(doc.style_property(tooltip, "display").as_deref(), Some("block"));
    assert_eq!(doc.style_property(tooltip, "left").as_deref(), Some("35px"));
    assert_eq!(doc.style_property(tooltip, "top").as_deref(), Some("15px"));
    assert_eq!(
        editor.session().highlighter.target(HighlightKind::Inspect),
        Some(card)
    );
    assert!(editor.dispatch(Event::Click { target: p }).default_prevented);

    editor.toggle(Mode::RegionEdit);
    let doc = editor.document();
    assert!(ui::is_hidden(doc, tooltip));
    assert!(!editor
        .session()
        .highlighter
        .is_visible(doc, HighlightKind::Inspect));
}

#[test]
fn test_image_detection_marks_and_unmarks() {
    let mut editor = editor_for(concat!(
        "<img id=\"logo\" src=\"logo.png\">",
        "<div id=\"hero\" style=\"background-image: url(hero.jpg)\"></div>",
        "<div id=\"fade\" style=\"background: linear-gradient(red, blue)\"></div>",
        "<div id=\"photo-slider\"><img src=\"s1.png\"><img src=\"s2.png\"></div>",
        "<section id=\"team\"><a href=\"/t\"><img src=\"t.png\"></a></section>"
    ));
    editor.toggle(Mode::ImageEdit);

    let doc = editor.document();
    let id = |name: &str| doc.get_element_by_id(name).unwrap();
    assert!(doc.has_class(id("logo"), "image-editable"));
    assert!(doc.has_class(id("hero"), "bg-image-editable"));
    assert!(doc.classes(id("fade")).is_empty());
    assert!(doc.has_class(id("photo-slider"), "carousel-container-editable"));
    assert_eq!(
        doc.style_property(id("photo-slider"), "position").as_deref(),
        Some("relative")
    );
    let hints = doc.query_selector_all(&format!("[{}]", CAROUSEL_HINT_ATTR)).unwrap();
    assert_eq!(hints.len(), 1);
    assert_eq!(doc.parent(hints[0]), Some(id("photo-slider")));
    assert_eq!(doc.attr(id("team"), IMAGE_COUNT_ATTR), Some("1"));

    let link = doc.first_element_by_tag("a").unwrap();
    assert_eq!(doc.attr(link, LINK_ATTR), Some("true"));
    assert!(editor.dispatch(Event::Click { target: link }).default_prevented);
    // The click bubbled on to the team container and opened its dialog
    assert!(editor.upload_session().is_some());

    editor.toggle(Mode::ImageEdit);
    let doc = editor.document();
    assert!(editor.upload_session().is_none());
    assert!(doc
        .query_selector_all(&format!("[{}]", CAROUSEL_HINT_ATTR))
        .unwrap()
        .is_empty());
    let slider = doc.get_element_by_id("photo-slider").unwrap();
    assert_eq!(doc.style_property(slider, "position"), None);
    assert!(doc.classes(slider).is_empty());
    assert!(!doc.has_attr(link, LINK_ATTR));
}

//! Upload dialog: single, background and gallery replacement, read
//! failures, and the close/abort race.

use crate::events::Notice;
use crate::geometry::StaticLayout;
use crate::listeners::Handler;
use crate::mode::Mode;
use crate::reads::{MemoryFiles, SelectedFile};
use crate::tests_modes::{editor_with, overlay_page};
use crate::ui;
use crate::upload::{GallerySubMode, UploadTarget};
use crate::{Editor, Event};
use livepage_dom::{Document, NodeId};

const GALLERY_PAGE: &str = concat!(
    "<img id=\"logo\" src=\"img/logo.png\">",
    "<div id=\"hero\" style=\"background-image: url('img/hero.jpg')\"></div>",
    "<div id=\"gallery\"><img src=\"g1.png\"><img src=\"g2.png\"><img src=\"g3.png\"></div>"
);

fn files() -> MemoryFiles {
    MemoryFiles::new()
        .with_file("a.png", b"aaa".to_vec())
        .with_file("b.png", b"bbb".to_vec())
        .with_file("c.png", b"ccc".to_vec())
        .with_file("d.png", b"ddd".to_vec())
        .with_failure("broken.png", "disk on fire")
}

fn image_editor() -> Editor {
    let doc = Document::parse(&overlay_page(GALLERY_PAGE));
    let mut editor = editor_with(doc, StaticLayout::new(), files());
    editor.toggle(Mode::ImageEdit);
    editor
}

fn node(editor: &Editor, id: &str) -> NodeId {
    editor.document().get_element_by_id(id).unwrap()
}

fn gallery_images(editor: &Editor) -> Vec<NodeId> {
    let gallery = node(editor, "gallery");
    editor.document().elements_by_tag(gallery, "img")
}

fn src(editor: &Editor, img: NodeId) -> String {
    editor.document().attr(img, "src").unwrap_or_default().to_string()
}

fn choose(editor: &mut Editor, input: &str, names: &[&str]) {
    let target = node(editor, input);
    let files = names.iter().map(|n| SelectedFile::new(*n)).collect();
    editor.dispatch(Event::Change { target, files });
}

fn click(editor: &mut Editor, id: &str) {
    let target = node(editor, id);
    editor.dispatch(Event::Click { target });
}

fn modal_open(editor: &Editor) -> bool {
    !ui::is_hidden(editor.document(), node(editor, ui::UPLOAD_MODAL_ID))
}

#[test]
fn test_single_image_upload_keys_by_original_url() {
    let mut editor = image_editor();
    click(&mut editor, "logo");
    assert!(modal_open(&editor));
    assert_eq!(
        editor.upload_session().map(|u| &u.target),
        Some(&UploadTarget::Single {
            image: node(&editor, "logo")
        })
    );
    let toggle = node(&editor, ui::UPLOAD_KIND_TOGGLE_ID);
    assert!(ui::is_hidden(editor.document(), toggle));

    choose(&mut editor, ui::SINGLE_FILE_INPUT_ID, &["a.png"]);
    assert_eq!(editor.settle(), 1);
    let preview = node(&editor, ui::SINGLE_PREVIEW_ID);
    let markup = editor.document().inner_html(preview);
    assert!(markup.contains("data:image/png;base64,YWFh"));
    assert!(markup.contains("<strong>logo.png</strong> → <strong>a.png</strong>"));

    click(&mut editor, ui::APPLY_UPLOAD_ID);
    editor.settle();
    let logo = node(&editor, "logo");
    assert_eq!(src(&editor, logo), "data:image/png;base64,YWFh");
    assert!(!modal_open(&editor));
    assert!(editor.upload_session().is_none());

    // A second replacement still keys by the page's own URL
    click(&mut editor, "logo");
    choose(&mut editor, ui::SINGLE_FILE_INPUT_ID, &["b.png"]);
    click(&mut editor, ui::APPLY_UPLOAD_ID);
    editor.settle();
    let images = &editor.store().maps().images;
    assert_eq!(images.len(), 1);
    assert_eq!(
        images.get("https://example.com/img/logo.png").map(String::as_str),
        Some("data:image/png;base64,YmJi")
    );
}

#[test]
fn test_background_upload() {
    let mut editor = image_editor();
    click(&mut editor, "hero");
    choose(&mut editor, ui::SINGLE_FILE_INPUT_ID, &["c.png"]);
    click(&mut editor, ui::APPLY_UPLOAD_ID);
    editor.settle();

    let hero = node(&editor, "hero");
    assert_eq!(
        editor
            .document()
            .style_property(hero, "background-image")
            .as_deref(),
        Some("url('data:image/png;base64,Y2Nj')")
    );
    assert!(editor
        .store()
        .maps()
        .background_images
        .contains_key("https://example.com/img/hero.jpg"));
}

#[test]
fn test_apply_without_file_alerts_and_stays_open() {
    let mut editor = image_editor();
    click(&mut editor, "logo");
    click(&mut editor, ui::APPLY_UPLOAD_ID);

    assert!(matches!(editor.take_notices().as_slice(), [Notice::Alert(_)]));
    assert!(modal_open(&editor));
    assert_eq!(editor.settle(), 0);
}

#[test]
fn test_failed_single_read_alerts_and_keeps_dialog() {
    let mut editor = image_editor();
    click(&mut editor, "logo");
    choose(&mut editor, ui::SINGLE_FILE_INPUT_ID, &["broken.png"]);
    click(&mut editor, ui::APPLY_UPLOAD_ID);
    editor.settle();

    let notices = editor.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message().contains("broken.png"));
    assert!(modal_open(&editor));
    assert_eq!(src(&editor, node(&editor, "logo")), "img/logo.png");
    assert!(editor.store().maps().images.is_empty());
}

#[test]
fn test_gallery_with_fewer_files_than_images() {
    let mut editor = image_editor();
    click(&mut editor, "gallery");
    let upload = editor.upload_session().unwrap();
    assert_eq!(upload.sub_mode, GallerySubMode::Multiple);
    assert_eq!(upload.target.capacity(), 3);
    assert!(!ui::is_hidden(
        editor.document(),
        node(&editor, ui::UPLOAD_KIND_TOGGLE_ID)
    ));

    choose(&mut editor, ui::MULTI_FILE_INPUT_ID, &["a.png", "b.png"]);
    click(&mut editor, ui::APPLY_UPLOAD_ID);
    editor.settle();

    let images = gallery_images(&editor);
    assert_eq!(src(&editor, images[0]), "data:image/png;base64,YWFh");
    assert_eq!(src(&editor, images[1]), "data:image/png;base64,YmJi");
    assert_eq!(src(&editor, images[2]), "g3.png");
    assert!(editor.take_notices().is_empty());
    assert!(!modal_open(&editor));
    assert_eq!(editor.store().maps().gallery_images.len(), 2);
}

#[test]
fn test_gallery_with_more_files_than_images() {
    let mut editor = image_editor();
    click(&mut editor, "gallery");
    choose(
        &mut editor,
        ui::MULTI_FILE_INPUT_ID,
        &["a.png", "b.png", "c.png", "d.png"],
    );
    let preview = node(&editor, ui::MULTI_PREVIEW_ID);
    assert!(editor.document().text_content(preview).contains("Only the first 3"));

    click(&mut editor, ui::APPLY_UPLOAD_ID);
    let notices = editor.take_notices();
    assert!(matches!(notices.as_slice(), [Notice::Warning(_)]));
    editor.settle();

    let images = gallery_images(&editor);
    for (img, expected) in images.iter().zip(["YWFh", "YmJi", "Y2Nj"]) {
        assert_eq!(src(&editor, *img), format!("data:image/png;base64,{}", expected));
    }
    let gallery = &editor.store().maps().gallery_images;
    assert_eq!(gallery.len(), 3);
    assert!(gallery.values().all(|uri| !uri.ends_with("ZGRk")));
}

#[test]
fn test_gallery_read_failure_is_counted_silently() {
    let mut editor = image_editor();
    click(&mut editor, "gallery");
    choose(&mut editor, ui::MULTI_FILE_INPUT_ID, &["broken.png", "b.png"]);
    click(&mut editor, ui::APPLY_UPLOAD_ID);
    editor.settle();

    let images = gallery_images(&editor);
    assert_eq!(src(&editor, images[0]), "g1.png");
    assert_eq!(src(&editor, images[1]), "data:image/png;base64,YmJi");
    assert!(editor.take_notices().is_empty());
    assert!(!modal_open(&editor));
    assert!(editor.session().batches.is_empty());
}

#[test]
fn test_gallery_single_sub_mode_replaces_picked_index() {
    let mut editor = image_editor();
    click(&mut editor, "gallery");

    let radio = editor
        .document()
        .query_selector("input[name=\"uploadType\"][value=\"single\"]")
        .unwrap()
        .unwrap();
    editor.dispatch(Event::Change {
        target: radio,
        files: Vec::new(),
    });
    assert_eq!(
        editor.upload_session().unwrap().sub_mode,
        GallerySubMode::Single
    );
    assert!(editor.document().has_attr(radio, "checked"));
    let strip = node(&editor, ui::GALLERY_SELECTOR_ID);
    assert!(!ui::is_hidden(editor.document(), strip));
    assert_eq!(editor.upload_session().unwrap().selected_index, Some(0));

    let option = editor
        .document()
        .query_selector("#carousel-image-selector [data-index=\"2\"]")
        .unwrap()
        .unwrap();
    assert!(editor.listeners().is_bound(option, Handler::PickGalleryImage(2)));
    editor.dispatch(Event::Click { target: option });
    assert_eq!(editor.upload_session().unwrap().selected_index, Some(2));

    choose(&mut editor, ui::SINGLE_FILE_INPUT_ID, &["d.png"]);
    click(&mut editor, ui::APPLY_UPLOAD_ID);
    editor.settle();

    let images = gallery_images(&editor);
    assert_eq!(src(&editor, images[0]), "g1.png");
    assert_eq!(src(&editor, images[2]), "data:image/png;base64,ZGRk");
    assert!(editor
        .store()
        .maps()
        .gallery_images
        .contains_key("https://example.com/g3.png"));
    // Closing removed the strip and its handlers
    assert!(editor
        .document()
        .get_element_by_id(ui::GALLERY_SELECTOR_ID)
        .is_none());
    assert!(editor
        .listeners()
        .nodes_with(Handler::PickGalleryImage(2))
        .is_empty());
}

#[test]
fn test_stale_single_preview_is_dropped() {
    let mut editor = image_editor();
    click(&mut editor, "logo");
    choose(&mut editor, ui::SINGLE_FILE_INPUT_ID, &["a.png"]);
    click(&mut editor, ui::CANCEL_UPLOAD_ID);
    click(&mut editor, "logo");
    editor.settle();

    let preview = node(&editor, ui::SINGLE_PREVIEW_ID);
    assert_eq!(editor.document().inner_html(preview), "");
}

#[test]
fn test_closing_dialog_does_not_cancel_reads() {
    let mut editor = image_editor();
    click(&mut editor, "logo");
    choose(&mut editor, ui::SINGLE_FILE_INPUT_ID, &["a.png"]);
    click(&mut editor, ui::APPLY_UPLOAD_ID);
    click(&mut editor, ui::CANCEL_UPLOAD_ID);
    assert!(!modal_open(&editor));

    editor.settle();
    assert_eq!(
        src(&editor, node(&editor, "logo")),
        "data:image/png;base64,YWFh"
    );
    assert_eq!(editor.store().maps().images.len(), 1);
}

#[test]
fn test_abort_token_drops_pending_reads() {
    let mut editor = image_editor();
    click(&mut editor, "gallery");
    choose(&mut editor, ui::MULTI_FILE_INPUT_ID, &["a.png", "b.png"]);
    editor.settle();
    click(&mut editor, ui::APPLY_UPLOAD_ID);

    assert_eq!(editor.abort_in_flight_reads(), 2);
    assert_eq!(editor.settle(), 0);
    let images = gallery_images(&editor);
    assert_eq!(src(&editor, images[0]), "g1.png");
    assert!(editor.store().maps().gallery_images.is_empty());
    assert!(modal_open(&editor));
}

#[test]
fn test_backdrop_click_closes_only_on_the_backdrop() {
    let mut editor = image_editor();
    click(&mut editor, "logo");
    click(&mut editor, ui::UPLOAD_DESCRIPTION_ID);
    assert!(modal_open(&editor));

    click(&mut editor, ui::UPLOAD_MODAL_ID);
    assert!(!modal_open(&editor));
    assert!(editor.upload_session().is_none());
}

#[test]
fn test_empty_gallery_alerts_instead_of_opening() {
    let doc = Document::parse(&overlay_page(
        "<div id=\"gallery\"><img src=\"only.png\"></div>",
    ));
    let mut editor = editor_with(doc, StaticLayout::new(), files());
    editor.toggle(Mode::ImageEdit);

    let gallery = node(&editor, "gallery");
    let img = editor.document().first_element_by_tag("img").unwrap();
    editor.document_mut().detach(img);
    editor.dispatch(Event::Click { target: gallery });

    assert!(editor.upload_session().is_none());
    assert_eq!(
        editor.take_notices(),
        vec![Notice::Alert(
            "The selected area has no replaceable images".to_string()
        )]
    );
}

#[test]
fn test_gallery_strip_sits_after_toggle_with_one_thumbnail_per_image() {
    let mut editor = image_editor();
    click(&mut editor, "gallery");

    let doc = editor.document();
    let strip = node(&editor, ui::GALLERY_SELECTOR_ID);
    let toggle = node(&editor, ui::UPLOAD_KIND_TOGGLE_ID);
    assert_eq!(doc.parent(strip), doc.parent(toggle));
    let siblings = doc.element_children(doc.parent(strip).unwrap());
    let at = siblings.iter().position(|n| *n == toggle).unwrap();
    assert_eq!(siblings.get(at + 1), Some(&strip));

    let thumbnails: Vec<String> = doc
        .query_selector_all("#carousel-image-selector [data-index] img")
        .unwrap()
        .into_iter()
        .map(|img| doc.attr(img, "src").unwrap_or_default().to_string())
        .collect();
    assert_eq!(thumbnails, vec!["g1.png", "g2.png", "g3.png"]);
}

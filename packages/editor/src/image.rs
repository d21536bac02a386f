//! # ImageEdit mode
//!
//! One detection pass marks everything whose image can be replaced, then
//! a click on a marked node opens the upload dialog for it.
//!
//! ## Precedence
//!
//! ```text
//! <img>                                       → Single
//! non-gradient background-image               → Background
//! carousel/slider/swiper naming, >1 image     → Carousel
//! block container holding ≥1 image            → Container
//! anything else                               → NotImageEditable
//! ```
//!
//! Links wrapping images get their navigation suppressed while the mode
//! is active.

use crate::highlight::HighlightKind;
use crate::listeners::{Handler, Owner, PointerHandler};
use crate::mode::{Mode, ModeBehavior};
use crate::region::is_block_container;
use crate::session::EditorSession;
use crate::ui::{self, CAROUSEL_HINT_CLASS};
use crate::upload::{self, UploadTarget};
use livepage_dom::{extract_url, is_gradient, Document, NodeId, StyleResolver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

pub const SINGLE_CLASS: &str = "image-editable";
pub const BACKGROUND_CLASS: &str = "bg-image-editable";
pub const BACKGROUND_ATTR: &str = "data-bg-editable";
pub const CAROUSEL_CLASS: &str = "carousel-container-editable";
pub const CAROUSEL_ATTR: &str = "data-carousel-editable";
pub const CAROUSEL_HINT_ATTR: &str = "data-carousel-hint";
pub const CONTAINER_CLASS: &str = "div-image-container";
pub const IMAGE_COUNT_ATTR: &str = "data-images-count";
pub const LINK_ATTR: &str = "data-image-editable-container";

pub const CAROUSEL_KEYWORDS: &[&str] = &["carousel", "slider", "swiper"];

const OWNER: Owner = Owner::Mode(Mode::ImageEdit);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageClass {
    Single,
    Background,
    Carousel,
    Container,
    NotImageEditable,
}

/// What the classifier needs to know about one element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageFacts {
    pub tag: String,
    /// `id` and `class` attribute values, space separated
    pub naming: String,
    /// Resolved `background-image` value
    pub background_image: Option<String>,
    /// `<img>` descendants outside the overlay
    pub descendant_images: usize,
    pub is_block_container: bool,
    pub in_overlay: bool,
}

pub fn classify_image(facts: &ImageFacts) -> ImageClass {
    if facts.in_overlay {
        return ImageClass::NotImageEditable;
    }
    if facts.tag == "img" {
        return ImageClass::Single;
    }
    if facts
        .background_image
        .as_deref()
        .is_some_and(|bg| !is_gradient(bg) && extract_url(bg).is_some())
    {
        return ImageClass::Background;
    }
    let naming = facts.naming.to_ascii_lowercase();
    if facts.descendant_images > 1 && CAROUSEL_KEYWORDS.iter().any(|k| naming.contains(k)) {
        return ImageClass::Carousel;
    }
    if facts.is_block_container && facts.descendant_images >= 1 {
        return ImageClass::Container;
    }
    ImageClass::NotImageEditable
}

/// Replaceable `<img>` elements under `node`, in document order
pub fn gallery_images(doc: &Document, node: NodeId) -> Vec<NodeId> {
    doc.elements_by_tag(node, "img")
        .into_iter()
        .filter(|img| !ui::is_overlay_ui(doc, *img))
        .collect()
}

pub fn image_facts(doc: &Document, resolver: &StyleResolver, node: NodeId) -> ImageFacts {
    let naming = [doc.attr(node, "id"), doc.attr(node, "class")]
        .iter()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    ImageFacts {
        tag: doc.tag_name(node).unwrap_or_default().to_string(),
        naming,
        background_image: resolver.background_image(doc, node),
        descendant_images: gallery_images(doc, node).len(),
        is_block_container: is_block_container(doc, node),
        in_overlay: ui::is_overlay_ui(doc, node),
    }
}

#[derive(Debug, Default)]
pub struct ImageEditManager {
    marked: Vec<(NodeId, ImageClass)>,
    hints: Vec<NodeId>,
    links: Vec<NodeId>,
}

impl ImageEditManager {
    /// Nodes marked by the current activation, with their variant
    pub fn marked(&self) -> &[(NodeId, ImageClass)] {
        &self.marked
    }

    pub fn class_of(&self, node: NodeId) -> Option<ImageClass> {
        self.marked
            .iter()
            .find(|(n, _)| *n == node)
            .map(|(_, class)| *class)
    }

    #[instrument(skip_all)]
    fn detect(&mut self, session: &mut EditorSession) {
        let Some(body) = session.doc.body() else {
            return;
        };
        let resolver = StyleResolver::new(&session.doc);
        let mut scope = vec![body];
        scope.extend(session.doc.descendant_elements(body));

        let classified: Vec<(NodeId, ImageClass)> = scope
            .into_iter()
            .map(|n| (n, classify_image(&image_facts(&session.doc, &resolver, n))))
            .filter(|(_, class)| *class != ImageClass::NotImageEditable)
            .collect();

        for (node, class) in &classified {
            self.mark(session, &resolver, *node, *class);
            session
                .listeners
                .bind(*node, Handler::OpenUpload(*class), OWNER);
        }

        let links: Vec<NodeId> = session
            .doc
            .elements_by_tag(body, "a")
            .into_iter()
            .filter(|a| !ui::is_overlay_ui(&session.doc, *a))
            .filter(|a| !gallery_images(&session.doc, *a).is_empty())
            .collect();
        for link in &links {
            if let Err(err) = session.doc.set_attr(*link, LINK_ATTR, "true") {
                warn!(node = ?link, error = %err, "could not flag gallery link");
            }
            session
                .listeners
                .bind(*link, Handler::SuppressNavigation, OWNER);
        }

        info!(
            marked = classified.len(),
            links = links.len(),
            "image targets detected"
        );
        self.marked = classified;
        self.links = links;
    }

    fn mark(
        &mut self,
        session: &mut EditorSession,
        resolver: &StyleResolver,
        node: NodeId,
        class: ImageClass,
    ) {
        let doc = &mut session.doc;
        let flagged = match class {
            ImageClass::Single => doc.add_class(node, SINGLE_CLASS),
            ImageClass::Background => doc
                .add_class(node, BACKGROUND_CLASS)
                .and_then(|_| doc.set_attr(node, BACKGROUND_ATTR, "true")),
            ImageClass::Carousel => doc
                .add_class(node, CAROUSEL_CLASS)
                .and_then(|_| doc.set_attr(node, CAROUSEL_ATTR, "true")),
            ImageClass::Container => {
                let count = gallery_images(doc, node).len();
                doc.add_class(node, CONTAINER_CLASS)
                    .and_then(|_| doc.set_attr(node, IMAGE_COUNT_ATTR, count.to_string()))
            }
            ImageClass::NotImageEditable => Ok(()),
        };
        if let Err(err) = flagged {
            warn!(node = ?node, ?class, error = %err, "could not mark image target");
            return;
        }

        if class == ImageClass::Carousel {
            let doc = &session.doc;
            let has_hint = doc
                .descendant_elements(node)
                .into_iter()
                .any(|d| doc.has_attr(d, CAROUSEL_HINT_ATTR));
            if !has_hint {
                let positioned = resolver
                    .value(doc, node, "position")
                    .is_some_and(|p| p != "static");
                if !positioned {
                    session
                        .ledger
                        .set(&mut session.doc, node, Mode::ImageEdit, "position", "relative");
                }
                if let Some(hint) = append_hint(&mut session.doc, node) {
                    self.hints.push(hint);
                }
            }
        }
    }

    fn unmark(&mut self, session: &mut EditorSession) {
        let doc = &mut session.doc;
        for hint in self.hints.drain(..) {
            doc.detach(hint);
        }
        for node in doc.all_elements() {
            for class in [SINGLE_CLASS, BACKGROUND_CLASS, CAROUSEL_CLASS, CONTAINER_CLASS] {
                doc.remove_class(node, class);
            }
            for attr in [BACKGROUND_ATTR, CAROUSEL_ATTR, IMAGE_COUNT_ATTR, LINK_ATTR] {
                doc.remove_attr(node, attr);
            }
        }
        self.marked.clear();
        self.links.clear();
    }

    /// Highlight the nearest `div` under the pointer that holds images
    pub fn on_pointer_move(&mut self, session: &mut EditorSession, x: f64, y: f64) {
        let target = session
            .layout
            .element_from_point(&session.doc, x, y)
            .filter(|el| !ui::is_overlay_ui(&session.doc, *el))
            .and_then(|el| {
                session
                    .doc
                    .ancestors_inclusive(el)
                    .take_while(|n| !session.doc.is_tag(*n, "body"))
                    .find(|n| session.doc.is_tag(*n, "div"))
            })
            .filter(|div| !gallery_images(&session.doc, *div).is_empty());

        if let Some(div) = target {
            if !session.ledger.is_overridden(div, Mode::ImageEdit, "cursor") {
                session
                    .ledger
                    .set(&mut session.doc, div, Mode::ImageEdit, "cursor", "pointer");
            }
        }
        let EditorSession {
            doc,
            layout,
            highlighter,
            hovered,
            ..
        } = session;
        highlighter.show(doc, layout.as_ref(), HighlightKind::Hover, target);
        *hovered = target;
    }

    /// Click on a marked node: open the dialog for its variant
    pub fn open_upload(&mut self, session: &mut EditorSession, node: NodeId, class: ImageClass) {
        match UploadTarget::from_class(&session.doc, node, class) {
            Some(target) => upload::open(session, target),
            None if matches!(class, ImageClass::Container | ImageClass::Carousel) => {
                session.alert("The selected area has no replaceable images");
            }
            None => debug!(node = ?node, ?class, "nothing to upload into"),
        }
    }
}

fn append_hint(doc: &mut Document, container: NodeId) -> Option<NodeId> {
    let hint = doc.create_element("div");
    doc.set_attr(hint, CAROUSEL_HINT_ATTR, "true").ok()?;
    doc.add_class(hint, CAROUSEL_HINT_CLASS).ok()?;
    for (property, value) in [
        ("position", "absolute"),
        ("top", "5px"),
        ("right", "5px"),
        ("background-color", "rgba(66, 133, 244, 0.8)"),
        ("color", "white"),
        ("padding", "2px 5px"),
        ("border-radius", "3px"),
        ("font-size", "12px"),
        ("z-index", "1000"),
    ] {
        doc.set_style_property(hint, property, Some(value));
    }
    doc.set_text_content(hint, "Carousel - click to edit");
    doc.append_child(container, hint).ok()?;
    Some(hint)
}

impl ModeBehavior for ImageEditManager {
    fn mode(&self) -> Mode {
        Mode::ImageEdit
    }

    fn pointer_handler(&self) -> Option<PointerHandler> {
        Some(PointerHandler::ImageHover)
    }

    fn activate(&mut self, session: &mut EditorSession) {
        self.detect(session);
    }

    fn deactivate(&mut self, session: &mut EditorSession) {
        self.unmark(session);
        upload::close(session);
        session.highlighter.hide(&mut session.doc, HighlightKind::Hover);
        session.hovered = None;
    }
}

//! # Upload workflow
//!
//! An [`UploadSession`] lives while the upload dialog is open. It knows
//! what is being replaced ([`UploadTarget`]), which files are pending,
//! and, for galleries, which sub-mode and index the user picked.
//!
//! ## Apply
//!
//! ```text
//! apply ──► one Commit read per accepted file ──► BatchTally
//!                                                   │
//!            completion: UploadTarget::apply ◄──────┘
//!            (DOM + persistence, per file, in any order)
//!                                                   │
//!            all settled ──► close dialog (if still the same session)
//! ```
//!
//! A multiple-file gallery batch closes once every read settled, even if
//! some failed; failures are only logged. Single-file batches alert on
//! failure and leave the dialog open.

use crate::errors::ReadError;
use crate::image::{gallery_images, ImageClass};
use crate::listeners::{Handler, Owner};
use crate::mode::Mode;
use crate::reads::{PreviewSlot, ReadCompletion, ReadPurpose, SelectedFile};
use crate::session::EditorSession;
use crate::store::EditMap;
use crate::ui::{self, *};
use livepage_dom::{extract_url, Document, DomResult, NodeId, StyleResolver};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Multiple-file previews rendered at most
pub const MAX_MULTI_PREVIEWS: usize = 5;

const SELECTED_OPTION_BORDER: &str = "2px solid #4285f4";
const IDLE_OPTION_BORDER: &str = "2px solid transparent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GalleryKind {
    Carousel,
    Container,
}

impl GalleryKind {
    fn label(self) -> &'static str {
        match self {
            GalleryKind::Carousel => "carousel",
            GalleryKind::Container => "area",
        }
    }
}

/// How files map onto a gallery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GallerySubMode {
    /// One file replaces the image at the selected index
    Single,
    /// N files replace the first N images in document order
    #[default]
    Multiple,
}

impl GallerySubMode {
    pub fn radio_value(self) -> &'static str {
        match self {
            GallerySubMode::Single => "single",
            GallerySubMode::Multiple => "multiple",
        }
    }

    pub fn from_radio_value(value: &str) -> Option<Self> {
        match value {
            "single" => Some(GallerySubMode::Single),
            "multiple" => Some(GallerySubMode::Multiple),
            _ => None,
        }
    }
}

/// What an upload replaces. Each variant owns how a finished read is
/// applied and where it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadTarget {
    Single {
        image: NodeId,
    },
    Background {
        node: NodeId,
    },
    Gallery {
        kind: GalleryKind,
        container: NodeId,
        /// Replaceable images in document order
        images: Vec<NodeId>,
    },
}

impl UploadTarget {
    /// Build the target for a node the detection pass classified.
    ///
    /// Galleries without images yield `None`.
    pub fn from_class(doc: &Document, node: NodeId, class: ImageClass) -> Option<Self> {
        let gallery = |kind| {
            let images = gallery_images(doc, node);
            (!images.is_empty()).then_some(UploadTarget::Gallery {
                kind,
                container: node,
                images,
            })
        };
        match class {
            ImageClass::Single => Some(UploadTarget::Single { image: node }),
            ImageClass::Background => Some(UploadTarget::Background { node }),
            ImageClass::Carousel => gallery(GalleryKind::Carousel),
            ImageClass::Container => gallery(GalleryKind::Container),
            ImageClass::NotImageEditable => None,
        }
    }

    pub fn map(&self) -> EditMap {
        match self {
            UploadTarget::Single { .. } => EditMap::Images,
            UploadTarget::Background { .. } => EditMap::BackgroundImages,
            UploadTarget::Gallery { .. } => EditMap::GalleryImages,
        }
    }

    pub fn is_gallery(&self) -> bool {
        matches!(self, UploadTarget::Gallery { .. })
    }

    /// How many images one upload can replace
    pub fn capacity(&self) -> usize {
        match self {
            UploadTarget::Gallery { images, .. } => images.len(),
            _ => 1,
        }
    }

    pub fn description(&self) -> String {
        match self {
            UploadTarget::Single { .. } => "Choose an image file to replace this image.".to_string(),
            UploadTarget::Background { .. } => {
                "Choose an image file to replace this background image.".to_string()
            }
            UploadTarget::Gallery { kind, images, .. } => format!(
                "Choose images to replace the images in this {} ({} in total).",
                kind.label(),
                images.len()
            ),
        }
    }

    /// Raw URL currently shown at `position`
    pub fn current_url(&self, doc: &Document, position: usize) -> Option<String> {
        match self {
            UploadTarget::Single { image } => doc.attr(*image, "src").map(String::from),
            UploadTarget::Gallery { images, .. } => images
                .get(position)
                .and_then(|img| doc.attr(*img, "src"))
                .map(String::from),
            UploadTarget::Background { node } => StyleResolver::new(doc)
                .background_image(doc, *node)
                .and_then(|value| extract_url(&value)),
        }
    }

    /// Put `data_uri` in place at `position` and persist it under the
    /// element's original URL. Returns `false` when nothing was replaced.
    pub fn apply(&self, session: &mut EditorSession, position: usize, data_uri: &str) -> bool {
        match self {
            UploadTarget::Single { image } => {
                replace_source(session, *image, data_uri, EditMap::Images)
            }
            UploadTarget::Gallery { images, .. } => match images.get(position) {
                Some(image) => replace_source(session, *image, data_uri, EditMap::GalleryImages),
                None => false,
            },
            UploadTarget::Background { node } => {
                let current = self.current_url(&session.doc, 0).unwrap_or_default();
                let original = session.original_url(*node, &current);
                let value = format!("url('{}')", data_uri);
                session
                    .doc
                    .set_style_property(*node, "background-image", Some(&value));
                remember(session, *node, original, EditMap::BackgroundImages, data_uri);
                true
            }
        }
    }
}

fn replace_source(session: &mut EditorSession, image: NodeId, data_uri: &str, map: EditMap) -> bool {
    if !session.doc.is_attached(image) {
        debug!(node = ?image, "image left the document before its read finished");
        return false;
    }
    let current = session.doc.attr(image, "src").unwrap_or_default().to_string();
    let original = session.original_url(image, &current);
    if let Err(err) = session.doc.set_attr(image, "src", data_uri) {
        warn!(error = %err, "could not replace image source");
        return false;
    }
    remember(session, image, original, map, data_uri);
    true
}

fn remember(session: &mut EditorSession, node: NodeId, original: String, map: EditMap, data_uri: &str) {
    if original.is_empty() {
        warn!(node = ?node, "replaced image had no source; edit not persisted");
        return;
    }
    session.persist(map, &original, data_uri);
    session.originals.insert(node, original);
}

/// The open upload dialog's state
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSession {
    pub id: u64,
    pub target: UploadTarget,
    pub sub_mode: GallerySubMode,
    /// Gallery index the single-file sub-mode replaces
    pub selected_index: Option<usize>,
    pub pending_single: Option<SelectedFile>,
    pub pending_multiple: Vec<SelectedFile>,
}

impl UploadSession {
    fn uses_single_file(&self) -> bool {
        !self.target.is_gallery() || self.sub_mode == GallerySubMode::Single
    }
}

/// Completion counter for the reads started by one apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub session_id: u64,
    pub expected: usize,
    pub settled: usize,
    pub succeeded: usize,
    /// Close the dialog even when every read failed
    pub close_on_failure: bool,
    /// Surface a read failure to the user
    pub alert_on_failure: bool,
}

impl Batch {
    pub fn is_finished(&self) -> bool {
        self.settled >= self.expected
    }

    pub fn closes_dialog(&self) -> bool {
        self.is_finished() && (self.succeeded > 0 || self.close_on_failure)
    }
}

#[derive(Debug, Default)]
pub struct BatchTally {
    batches: BTreeMap<u64, Batch>,
    next_id: u64,
}

impl BatchTally {
    pub fn start(&mut self, batch: Batch) -> u64 {
        self.next_id += 1;
        self.batches.insert(self.next_id, batch);
        self.next_id
    }

    /// Count one settled read. Finished batches are removed and returned
    /// in their final state.
    pub fn settle(&mut self, id: u64, success: bool) -> Option<Batch> {
        let batch = self.batches.get_mut(&id)?;
        batch.settled += 1;
        if success {
            batch.succeeded += 1;
        }
        let snapshot = *batch;
        if snapshot.is_finished() {
            self.batches.remove(&id);
        }
        Some(snapshot)
    }

    pub fn get(&self, id: u64) -> Option<&Batch> {
        self.batches.get(&id)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

// ---------------------------------------------------------------
// Dialog lifecycle
// ---------------------------------------------------------------

/// Open the dialog for `target`, replacing any dialog already open
pub fn open(session: &mut EditorSession, target: UploadTarget) {
    if session.upload.is_some() {
        close(session);
    }
    let is_gallery = target.is_gallery();
    let id = session.next_upload_id();
    info!(id, map = ?target.map(), capacity = target.capacity(), "upload dialog opened");
    session.upload = Some(UploadSession {
        id,
        target,
        sub_mode: if is_gallery {
            GallerySubMode::Multiple
        } else {
            GallerySubMode::Single
        },
        selected_index: is_gallery.then_some(0),
        pending_single: None,
        pending_multiple: Vec::new(),
    });
    render_dialog(session);
}

/// Hide the dialog and forget its state. In-flight reads keep going.
pub fn close(session: &mut EditorSession) {
    let closed = session.upload.take();
    remove_gallery_strip(session);
    clear_previews(session);
    if let Some(modal) = session.doc.get_element_by_id(UPLOAD_MODAL_ID) {
        ui::hide(&mut session.doc, modal);
    }
    if let Some(upload) = closed {
        debug!(id = upload.id, "upload dialog closed");
    }
}

fn render_dialog(session: &mut EditorSession) {
    let Some(upload) = session.upload.clone() else {
        return;
    };
    let Some(modal) = ui::require(&session.doc, UPLOAD_MODAL_ID) else {
        return;
    };

    if let Some(description) = ui::require(&session.doc, UPLOAD_DESCRIPTION_ID) {
        session
            .doc
            .set_text_content(description, &upload.target.description());
    }
    clear_previews(session);
    remove_gallery_strip(session);

    if let Some(toggle) = ui::require(&session.doc, UPLOAD_KIND_TOGGLE_ID) {
        if upload.target.is_gallery() {
            ui::show(&mut session.doc, toggle, "block");
        } else {
            ui::hide(&mut session.doc, toggle);
        }
    }
    if let UploadTarget::Gallery { images, .. } = &upload.target {
        build_gallery_strip(session, images);
    }
    sync_sub_mode(session);
    ui::show(&mut session.doc, modal, "flex");
}

/// Thumbnail strip for picking the gallery index in single-file sub-mode
fn build_gallery_strip(session: &mut EditorSession, images: &[NodeId]) {
    let doc = &mut session.doc;
    let (strip, options) = match assemble_gallery_strip(doc, images) {
        Ok(built) => built,
        Err(err) => {
            warn!(error = %err, "could not build gallery selector");
            return;
        }
    };

    let placed = match doc.get_element_by_id(UPLOAD_KIND_TOGGLE_ID) {
        Some(toggle) if doc.parent(toggle).is_some() => doc.insert_after(toggle, strip),
        _ => match doc.get_element_by_id(UPLOAD_MODAL_ID) {
            Some(modal) => doc.append_child(modal, strip),
            None => return,
        },
    };
    if let Err(err) = placed {
        warn!(error = %err, "could not place gallery selector");
        return;
    }

    for (index, option) in options.into_iter().enumerate() {
        session.listeners.bind(
            option,
            Handler::PickGalleryImage(index),
            Owner::Mode(Mode::ImageEdit),
        );
    }
    paint_gallery_selection(session);
}

/// Detached strip plus one option per image, in gallery order
fn assemble_gallery_strip(
    doc: &mut Document,
    images: &[NodeId],
) -> DomResult<(NodeId, Vec<NodeId>)> {
    let strip = doc.create_element("div");
    doc.set_attr(strip, "id", GALLERY_SELECTOR_ID)?;
    doc.set_style_property(strip, "margin-bottom", Some("15px"));

    let title = doc.create_element("p");
    doc.set_text_content(title, "Select the image to replace:");
    let row = doc.create_element("div");
    for (property, value) in [("display", "flex"), ("flex-wrap", "wrap"), ("gap", "10px")] {
        doc.set_style_property(row, property, Some(value));
    }

    let mut options = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        let option = doc.create_element("div");
        doc.set_attr(option, "data-index", index.to_string())?;
        doc.set_style_property(option, "border", Some(IDLE_OPTION_BORDER));
        doc.set_style_property(option, "cursor", Some("pointer"));

        let thumbnail = doc.create_element("img");
        let src = doc.attr(*image, "src").unwrap_or_default().to_string();
        doc.set_attr(thumbnail, "src", src)?;
        doc.set_style_property(thumbnail, "height", Some("60px"));
        let label = doc.create_element("div");
        doc.set_text_content(label, &format!("Image {}", index + 1));

        doc.append_child(option, thumbnail)?;
        doc.append_child(option, label)?;
        doc.append_child(row, option)?;
        options.push(option);
    }
    doc.append_child(strip, title)?;
    doc.append_child(strip, row)?;
    Ok((strip, options))
}

fn remove_gallery_strip(session: &mut EditorSession) {
    if let Some(strip) = session.doc.get_element_by_id(GALLERY_SELECTOR_ID) {
        let mut subtree = vec![strip];
        subtree.extend(session.doc.descendants(strip));
        session.listeners.unbind_nodes(&subtree);
        session.doc.detach(strip);
    }
}

fn gallery_options(doc: &Document) -> Vec<NodeId> {
    doc.get_element_by_id(GALLERY_SELECTOR_ID)
        .map(|strip| {
            doc.descendant_elements(strip)
                .into_iter()
                .filter(|n| doc.has_attr(*n, "data-index"))
                .collect()
        })
        .unwrap_or_default()
}

fn paint_gallery_selection(session: &mut EditorSession) {
    let selected = session.upload.as_ref().and_then(|u| u.selected_index);
    for option in gallery_options(&session.doc) {
        let index = session
            .doc
            .attr(option, "data-index")
            .and_then(|i| i.parse::<usize>().ok());
        let (border, background) = if index.is_some() && index == selected {
            (SELECTED_OPTION_BORDER, Some("rgba(66, 133, 244, 0.1)"))
        } else {
            (IDLE_OPTION_BORDER, None)
        };
        session.doc.set_style_property(option, "border", Some(border));
        session
            .doc
            .set_style_property(option, "background-color", background);
    }
}

/// Show the inputs, previews and strip that match the sub-mode
fn sync_sub_mode(session: &mut EditorSession) {
    let Some(upload) = session.upload.as_ref() else {
        return;
    };
    let single = upload.uses_single_file();
    let value = upload.sub_mode.radio_value();
    let is_gallery = upload.target.is_gallery();
    let doc = &mut session.doc;

    let visibility = [
        (SINGLE_FILE_INPUT_ID, single),
        (SINGLE_PREVIEW_ID, single),
        (MULTI_FILE_INPUT_ID, !single),
        (MULTI_PREVIEW_ID, !single),
        (GALLERY_SELECTOR_ID, is_gallery && single),
    ];
    for (id, visible) in visibility {
        if let Some(node) = doc.get_element_by_id(id) {
            if visible {
                ui::show(doc, node, "block");
            } else {
                ui::hide(doc, node);
            }
        }
    }

    let selector = format!("input[name=\"{}\"]", UPLOAD_KIND_RADIO_NAME);
    for radio in doc.query_selector_all(&selector).unwrap_or_default() {
        if doc.attr(radio, "value") == Some(value) {
            if let Err(err) = doc.set_attr(radio, "checked", "") {
                warn!(error = %err, "could not check upload kind radio");
            }
        } else {
            doc.remove_attr(radio, "checked");
        }
    }
}

fn clear_previews(session: &mut EditorSession) {
    for id in [SINGLE_PREVIEW_ID, MULTI_PREVIEW_ID] {
        if let Some(node) = session.doc.get_element_by_id(id) {
            session.doc.remove_children(node);
        }
    }
}

fn clear_preview(session: &mut EditorSession, id: &str) {
    if let Some(node) = session.doc.get_element_by_id(id) {
        session.doc.remove_children(node);
    }
}

// ---------------------------------------------------------------
// User input
// ---------------------------------------------------------------

pub fn set_sub_mode(session: &mut EditorSession, sub_mode: GallerySubMode) {
    let Some(upload) = session.upload.as_mut() else {
        return;
    };
    if !upload.target.is_gallery() || upload.sub_mode == sub_mode {
        return;
    }
    upload.sub_mode = sub_mode;
    match sub_mode {
        GallerySubMode::Single => {
            upload.pending_multiple.clear();
            clear_preview(session, MULTI_PREVIEW_ID);
        }
        GallerySubMode::Multiple => {
            upload.pending_single = None;
            clear_preview(session, SINGLE_PREVIEW_ID);
        }
    }
    sync_sub_mode(session);
    debug!(sub_mode = ?sub_mode, "upload sub-mode changed");
}

/// Pick which gallery image the single-file sub-mode replaces
pub fn select_gallery_index(session: &mut EditorSession, index: usize) {
    let Some(upload) = session.upload.as_mut() else {
        return;
    };
    if index >= upload.target.capacity() || !upload.target.is_gallery() {
        return;
    }
    upload.selected_index = Some(index);
    upload.pending_single = None;
    clear_preview(session, SINGLE_PREVIEW_ID);
    paint_gallery_selection(session);
}

pub fn choose_single(session: &mut EditorSession, file: Option<SelectedFile>) {
    let Some(upload) = session.upload.as_mut() else {
        return;
    };
    upload.pending_single = file.clone();
    let purpose = ReadPurpose::Preview {
        session: upload.id,
        slot: PreviewSlot::Single {
            selection: upload.selected_index,
        },
    };
    clear_preview(session, SINGLE_PREVIEW_ID);
    if let Some(file) = file {
        session.reads.submit(session.files.as_ref(), file, purpose);
    }
}

pub fn choose_multiple(session: &mut EditorSession, files: Vec<SelectedFile>) {
    let Some(upload) = session.upload.as_mut() else {
        return;
    };
    upload.pending_multiple = files.clone();
    let id = upload.id;
    let target = upload.target.clone();
    let capacity = target.capacity();
    clear_preview(session, MULTI_PREVIEW_ID);
    let Some(preview) = session.doc.get_element_by_id(MULTI_PREVIEW_ID) else {
        return;
    };

    let mut markup = String::new();
    if files.len() > capacity {
        markup.push_str(&format!(
            "<p style=\"color: red\">Warning: you selected {} images but the {} has {}. Only the first {} will be used.</p>",
            files.len(),
            gallery_label(&target),
            capacity,
            capacity
        ));
    }
    let usable = files.len().min(capacity);
    let shown = usable.min(MAX_MULTI_PREVIEWS);
    if usable > 0 {
        markup.push_str("<h4>Replacement preview:</h4>");
    }
    for index in 0..shown {
        markup.push_str(&format!(
            "<div data-preview-index=\"{}\"><p>Replacing image {}: {} → {}</p></div>",
            index,
            index + 1,
            ui::escape(&basename(&target.current_url(&session.doc, index).unwrap_or_default())),
            ui::escape(&files[index].name)
        ));
    }
    if usable > shown {
        markup.push_str(&format!("<p>+{} more not previewed</p>", usable - shown));
    }
    if let Err(err) = session.doc.set_inner_html(preview, &markup) {
        warn!(error = %err, "could not render multiple preview");
        return;
    }

    for (index, file) in files.into_iter().take(shown).enumerate() {
        let purpose = ReadPurpose::Preview {
            session: id,
            slot: PreviewSlot::Multiple { index },
        };
        session.reads.submit(session.files.as_ref(), file, purpose);
    }
}

fn gallery_label(target: &UploadTarget) -> &'static str {
    match target {
        UploadTarget::Gallery { kind, .. } => kind.label(),
        _ => "page",
    }
}

fn basename(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// Start the commit reads for the pending selection
pub fn apply(session: &mut EditorSession) {
    let Some(upload) = session.upload.clone() else {
        return;
    };

    if upload.uses_single_file() {
        let Some(file) = upload.pending_single.clone() else {
            session.alert("Please choose an image file first.");
            return;
        };
        let position = upload.selected_index.unwrap_or(0);
        let batch = session.batches.start(Batch {
            session_id: upload.id,
            expected: 1,
            settled: 0,
            succeeded: 0,
            close_on_failure: false,
            alert_on_failure: true,
        });
        let purpose = ReadPurpose::Commit {
            target: upload.target.clone(),
            position,
            batch,
        };
        session.reads.submit(session.files.as_ref(), file, purpose);
        debug!(id = upload.id, position, "single upload started");
        return;
    }

    if upload.pending_multiple.is_empty() {
        session.alert("Please choose at least one image first.");
        return;
    }
    let capacity = upload.target.capacity();
    if capacity == 0 {
        session.alert("The selected area has no replaceable images");
        return;
    }
    let selected = upload.pending_multiple.len();
    if selected > capacity {
        session.warn_user(format!(
            "You selected {} images but the {} has {}; only the first {} will be used",
            selected,
            gallery_label(&upload.target),
            capacity,
            capacity
        ));
    }

    let accepted = selected.min(capacity);
    let batch = session.batches.start(Batch {
        session_id: upload.id,
        expected: accepted,
        settled: 0,
        succeeded: 0,
        close_on_failure: true,
        alert_on_failure: false,
    });
    for (position, file) in upload.pending_multiple.into_iter().take(accepted).enumerate() {
        let purpose = ReadPurpose::Commit {
            target: upload.target.clone(),
            position,
            batch,
        };
        session.reads.submit(session.files.as_ref(), file, purpose);
    }
    info!(id = upload.id, accepted, discarded = selected - accepted, "gallery upload started");
}

// ---------------------------------------------------------------
// Read completions
// ---------------------------------------------------------------

pub fn handle_completion(session: &mut EditorSession, completion: ReadCompletion) {
    let ReadCompletion {
        file,
        purpose,
        result,
    } = completion;
    match purpose {
        ReadPurpose::Preview { session: id, slot } => render_preview(session, id, slot, &file, result),
        ReadPurpose::Commit {
            target,
            position,
            batch,
        } => commit(session, &target, position, batch, &file, result),
    }
}

fn render_preview(
    session: &mut EditorSession,
    id: u64,
    slot: PreviewSlot,
    file: &SelectedFile,
    result: Result<String, ReadError>,
) {
    let Some(upload) = session.upload.as_ref().filter(|u| u.id == id) else {
        debug!(file = %file.name, "preview for a closed dialog dropped");
        return;
    };
    let data_uri = match result {
        Ok(uri) => uri,
        Err(err) => {
            warn!(file = %file.name, error = %err, "preview read failed");
            return;
        }
    };

    match slot {
        PreviewSlot::Single { selection } => {
            let current = selection == upload.selected_index
                && upload.pending_single.as_ref() == Some(file);
            if !current {
                return;
            }
            let original = upload
                .target
                .current_url(&session.doc, selection.unwrap_or(0))
                .map(|u| basename(&u))
                .unwrap_or_else(|| "image".to_string());
            let markup = format!(
                "<img src=\"{}\" style=\"max-height: 200px\"><p>Will replace <strong>{}</strong> → <strong>{}</strong></p>",
                data_uri,
                ui::escape(&original),
                ui::escape(&file.name)
            );
            if let Some(preview) = session.doc.get_element_by_id(SINGLE_PREVIEW_ID) {
                if let Err(err) = session.doc.set_inner_html(preview, &markup) {
                    warn!(error = %err, "could not render single preview");
                }
            }
        }
        PreviewSlot::Multiple { index } => {
            if upload.pending_multiple.get(index) != Some(file) {
                return;
            }
            let original = upload
                .target
                .current_url(&session.doc, index)
                .unwrap_or_default();
            let markup = format!(
                "<img src=\"{}\" style=\"max-height: 100px\"> → <img src=\"{}\" style=\"max-height: 100px\"><p>Replacing image {}</p>",
                ui::escape(&original),
                data_uri,
                index + 1
            );
            let selector = format!("#{} [data-preview-index=\"{}\"]", MULTI_PREVIEW_ID, index);
            if let Ok(Some(tile)) = session.doc.query_selector(&selector) {
                if let Err(err) = session.doc.set_inner_html(tile, &markup) {
                    warn!(index, error = %err, "could not render gallery preview");
                }
            }
        }
    }
}

fn commit(
    session: &mut EditorSession,
    target: &UploadTarget,
    position: usize,
    batch: u64,
    file: &SelectedFile,
    result: Result<String, ReadError>,
) {
    let alert_on_failure = session
        .batches
        .get(batch)
        .map(|b| b.alert_on_failure)
        .unwrap_or(false);

    let success = match result {
        Ok(data_uri) => target.apply(session, position, &data_uri),
        Err(err) => {
            warn!(file = %file.name, position, error = %err, "upload read failed");
            if alert_on_failure {
                session.alert(format!("Could not read {}: {}", file.name, err));
            }
            false
        }
    };

    let Some(state) = session.batches.settle(batch, success) else {
        debug!(batch, "completion for an unknown batch");
        return;
    };
    if !state.is_finished() {
        return;
    }
    info!(
        batch,
        succeeded = state.succeeded,
        failed = state.settled - state.succeeded,
        "upload batch settled"
    );
    let still_open = session.upload.as_ref().map(|u| u.id) == Some(state.session_id);
    if state.closes_dialog() && still_open {
        close(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(expected: usize, close_on_failure: bool) -> Batch {
        Batch {
            session_id: 1,
            expected,
            settled: 0,
            succeeded: 0,
            close_on_failure,
            alert_on_failure: !close_on_failure,
        }
    }

    #[test]
    fn test_tally_finishes_after_every_read() {
        let mut tally = BatchTally::default();
        let id = tally.start(batch(3, true));
        assert!(!tally.settle(id, true).unwrap().is_finished());
        assert!(!tally.settle(id, false).unwrap().is_finished());
        let last = tally.settle(id, false).unwrap();
        assert!(last.closes_dialog());
        assert_eq!(last.succeeded, 1);
        assert!(tally.is_empty());
        assert_eq!(tally.settle(id, true), None);
    }

    #[test]
    fn test_failed_single_batch_keeps_dialog() {
        let mut tally = BatchTally::default();
        let id = tally.start(batch(1, false));
        let state = tally.settle(id, false).unwrap();
        assert!(state.is_finished());
        assert!(!state.closes_dialog());

        let all_failed = tally.start(batch(2, true));
        tally.settle(all_failed, false);
        assert!(tally.settle(all_failed, false).unwrap().closes_dialog());
    }

    #[test]
    fn test_target_from_class() {
        let doc = Document::parse(concat!(
            "<body><div id=\"g\"><img src=\"a.png\"><p><img src=\"b.png\"></p></div>",
            "<div id=\"empty\"></div></body>"
        ));
        let gallery = doc.get_element_by_id("g").unwrap();
        let empty = doc.get_element_by_id("empty").unwrap();

        let target = UploadTarget::from_class(&doc, gallery, ImageClass::Container).unwrap();
        assert_eq!(target.capacity(), 2);
        assert_eq!(target.map(), EditMap::GalleryImages);
        assert_eq!(target.current_url(&doc, 1).as_deref(), Some("b.png"));
        assert!(target.description().contains("2 in total"));
        assert!(UploadTarget::from_class(&doc, empty, ImageClass::Container).is_none());
        assert_eq!(
            GallerySubMode::from_radio_value("single"),
            Some(GallerySubMode::Single)
        );
    }
}

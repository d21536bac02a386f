//! # Replay
//!
//! Applies the loaded edit maps to a freshly parsed page, once, right
//! after the store is hydrated. Best effort: a key with no live match is
//! counted as skipped and otherwise ignored.
//!
//! ```text
//! texts             path ──resolve──► node ── inner markup := fragment
//! images            url  ──every img whose resolved src == url──► src := data
//! backgroundImages  url  ──every element whose resolved bg url == url──► bg := data
//! galleryImages     (same rule as images)
//! ```

use crate::path::resolve;
use crate::session::EditorSession;
use crate::store::{EditMap, EditRecords};
use crate::ui;
use livepage_dom::{extract_url, is_gradient, NodeId, StyleResolver};
use serde::Serialize;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Keys that matched at least one live element
    pub applied: usize,
    /// Keys with no match
    pub skipped: usize,
}

impl ReplayReport {
    fn count(&mut self, matched: bool) {
        if matched {
            self.applied += 1;
        } else {
            self.skipped += 1;
        }
    }
}

#[instrument(skip_all)]
pub fn replay(session: &mut EditorSession) -> ReplayReport {
    let maps = session.store.maps().clone();
    let mut report = ReplayReport::default();

    for (path, fragment) in &maps.texts {
        let matched = match resolve(&session.doc, path) {
            Some(node) => session.doc.set_inner_html(node, fragment).is_ok(),
            None => false,
        };
        if !matched {
            debug!(path = %path, "stored text has no live element");
        }
        report.count(matched);
    }

    replay_sources(session, &maps.images, EditMap::Images, &mut report);
    replay_backgrounds(session, &maps.background_images, &mut report);
    replay_sources(session, &maps.gallery_images, EditMap::GalleryImages, &mut report);

    info!(applied = report.applied, skipped = report.skipped, "edits replayed");
    report
}

fn page_images(session: &EditorSession) -> Vec<NodeId> {
    let doc = &session.doc;
    doc.all_elements()
        .into_iter()
        .filter(|n| doc.is_tag(*n, "img") && !ui::is_overlay_ui(doc, *n))
        .collect()
}

fn replay_sources(
    session: &mut EditorSession,
    records: &EditRecords,
    map: EditMap,
    report: &mut ReplayReport,
) {
    let images = page_images(session);
    for (url, data_uri) in records {
        let matches: Vec<NodeId> = images
            .iter()
            .copied()
            .filter(|img| {
                let src = session.doc.attr(*img, "src").unwrap_or_default();
                !src.is_empty() && session.original_url(*img, src) == *url
            })
            .collect();
        for img in &matches {
            if session.doc.set_attr(*img, "src", data_uri.as_str()).is_ok() {
                session.originals.insert(*img, url.clone());
            }
        }
        debug!(map = ?map, url = %url, matched = matches.len(), "image edit replayed");
        report.count(!matches.is_empty());
    }
}

fn replay_backgrounds(session: &mut EditorSession, records: &EditRecords, report: &mut ReplayReport) {
    if records.is_empty() {
        return;
    }
    let resolver = StyleResolver::new(&session.doc);
    let backgrounds: Vec<(NodeId, String)> = session
        .doc
        .all_elements()
        .into_iter()
        .filter(|n| !ui::is_overlay_ui(&session.doc, *n))
        .filter_map(|n| {
            let value = resolver.background_image(&session.doc, n)?;
            if is_gradient(&value) {
                return None;
            }
            let url = extract_url(&value)?;
            Some((n, session.original_url(n, &url)))
        })
        .collect();

    for (url, data_uri) in records {
        let value = format!("url('{}')", data_uri);
        let mut matched = 0;
        for (node, _) in backgrounds.iter().filter(|(_, original)| original == url) {
            session
                .doc
                .set_style_property(*node, "background-image", Some(&value));
            session.originals.insert(*node, url.clone());
            matched += 1;
        }
        debug!(url = %url, matched, "background edit replayed");
        report.count(matched > 0);
    }
}

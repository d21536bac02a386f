//! # PersistenceStore
//!
//! Page-scoped key-value persistence of the four edit maps.
//!
//! ## Layout in storage
//!
//! ```text
//! editedTexts            {"body:nth-of-type(1) > p:nth-of-type(1)": "Hello <b>World</b>"}
//! editedImages           {"https://site/a.png": "data:image/png;base64,..."}
//! editedBackgroundImages {"https://site/bg.jpg": "data:image/jpeg;base64,..."}
//! editedCarouselImages   {"https://site/s1.png": "data:image/png;base64,..."}
//! pageLastModified       "1718000000000"
//! ```
//!
//! Every write re-encodes the whole map under its key. Entries are only
//! ever added or overwritten.

use crate::errors::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const TEXTS_KEY: &str = "editedTexts";
pub const IMAGES_KEY: &str = "editedImages";
pub const BACKGROUND_IMAGES_KEY: &str = "editedBackgroundImages";
pub const GALLERY_IMAGES_KEY: &str = "editedCarouselImages";
pub const LAST_MODIFIED_KEY: &str = "pageLastModified";

/// Durable string storage, one namespace per page
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk mapping storage keys to string values.
///
/// The file is rewritten through a sibling temp file on every `set`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            let content =
                std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| StoreError::malformed(&path, e))?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "opened file storage");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| StoreError::encode(self.path.display().to_string(), e))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, encoded).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// One of the four persisted edit namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditMap {
    Texts,
    Images,
    BackgroundImages,
    GalleryImages,
}

impl EditMap {
    pub const ALL: [EditMap; 4] = [
        EditMap::Texts,
        EditMap::Images,
        EditMap::BackgroundImages,
        EditMap::GalleryImages,
    ];

    pub fn storage_key(self) -> &'static str {
        match self {
            EditMap::Texts => TEXTS_KEY,
            EditMap::Images => IMAGES_KEY,
            EditMap::BackgroundImages => BACKGROUND_IMAGES_KEY,
            EditMap::GalleryImages => GALLERY_IMAGES_KEY,
        }
    }
}

/// Key → payload. Sorted, so text paths replay parents before children.
pub type EditRecords = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMaps {
    pub texts: EditRecords,
    pub images: EditRecords,
    pub background_images: EditRecords,
    pub gallery_images: EditRecords,
}

impl EditMaps {
    pub fn get(&self, map: EditMap) -> &EditRecords {
        match map {
            EditMap::Texts => &self.texts,
            EditMap::Images => &self.images,
            EditMap::BackgroundImages => &self.background_images,
            EditMap::GalleryImages => &self.gallery_images,
        }
    }

    pub fn get_mut(&mut self, map: EditMap) -> &mut EditRecords {
        match map {
            EditMap::Texts => &mut self.texts,
            EditMap::Images => &mut self.images,
            EditMap::BackgroundImages => &mut self.background_images,
            EditMap::GalleryImages => &mut self.gallery_images,
        }
    }

    pub fn total(&self) -> usize {
        EditMap::ALL.iter().map(|m| self.get(*m).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

pub struct PersistenceStore {
    storage: Box<dyn Storage>,
    maps: EditMaps,
}

impl PersistenceStore {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self {
            storage,
            maps: EditMaps::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    /// Hydrate all four maps. A missing or unparsable entry becomes empty.
    pub fn load(&mut self) -> &EditMaps {
        for map in EditMap::ALL {
            let key = map.storage_key();
            let records = match self.storage.get(key) {
                Ok(Some(raw)) => serde_json::from_str::<EditRecords>(&raw).unwrap_or_else(|err| {
                    warn!(key = %key, error = %err, "discarding unparsable edit map");
                    EditRecords::new()
                }),
                Ok(None) => EditRecords::new(),
                Err(err) => {
                    warn!(key = %key, error = %err, "could not read edit map");
                    EditRecords::new()
                }
            };
            *self.maps.get_mut(map) = records;
        }
        debug!(entries = self.maps.total(), "edit maps loaded");
        &self.maps
    }

    /// Encode the full map and write it back under its key
    pub fn save(&mut self, map: EditMap) -> Result<(), StoreError> {
        let key = map.storage_key();
        let encoded =
            serde_json::to_string(self.maps.get(map)).map_err(|e| StoreError::encode(key, e))?;
        self.storage.set(key, &encoded)
    }

    /// Last-write-wins insert, then persist the map and touch the timestamp
    pub fn record(&mut self, map: EditMap, key: &str, payload: &str) -> Result<(), StoreError> {
        self.maps
            .get_mut(map)
            .insert(key.to_string(), payload.to_string());
        self.save(map)?;
        self.touch()
    }

    pub fn touch(&mut self) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.storage.set(LAST_MODIFIED_KEY, &now.to_string())
    }

    pub fn last_modified(&self) -> Option<i64> {
        self.storage
            .get(LAST_MODIFIED_KEY)
            .ok()
            .flatten()
            .and_then(|v| v.parse().ok())
    }

    pub fn maps(&self) -> &EditMaps {
        &self.maps
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_missing_and_corrupt_entries() {
        let storage = MemoryStorage::new()
            .with_entry(TEXTS_KEY, r#"{"body > p:nth-of-type(1)":"Hi"}"#)
            .with_entry(IMAGES_KEY, "{not json");
        let mut store = PersistenceStore::new(Box::new(storage));
        let maps = store.load();

        assert_eq!(maps.texts.len(), 1);
        assert!(maps.images.is_empty());
        assert!(maps.background_images.is_empty());
        assert!(maps.gallery_images.is_empty());
    }

    #[test]
    fn test_record_rewrites_whole_map_and_touches() {
        let mut store = PersistenceStore::in_memory();
        store.record(EditMap::Images, "a.png", "data:1").unwrap();
        store.record(EditMap::Images, "b.png", "data:2").unwrap();
        store.record(EditMap::Images, "a.png", "data:3").unwrap();

        let raw = store.storage().get(IMAGES_KEY).unwrap().unwrap();
        let decoded: EditRecords = serde_json::from_str(&raw).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded["a.png"], "data:3");
        assert!(store.last_modified().is_some());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.json");

        let mut store = PersistenceStore::new(Box::new(FileStorage::open(&path).unwrap()));
        store
            .record(EditMap::GalleryImages, "s1.png", "data:image/png;base64,AA==")
            .unwrap();

        let mut reopened = PersistenceStore::new(Box::new(FileStorage::open(&path).unwrap()));
        let maps = reopened.load();
        assert_eq!(maps.gallery_images["s1.png"], "data:image/png;base64,AA==");
    }

    #[test]
    fn test_file_storage_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            FileStorage::open(&path),
            Err(StoreError::Malformed { .. })
        ));
    }
}

//! # Livepage Editor
//!
//! In-page editing overlay runtime: four mutually exclusive modes over a
//! live document, with every edit persisted and replayed on reload.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Editor: host facade, event dispatch         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ ModeController: one active mode at a time   │
//! │  - Inspect / RegionEdit / TextEdit /        │
//! │    ImageEdit managers                       │
//! │  - UploadSession for image replacement      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ EditorSession: document, listeners, style   │
//! │ ledger, highlighter, reads, store           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ PersistenceStore: four edit maps + replay   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Teardown before setup**: a mode leaves nothing behind before the
//!    next one starts
//! 2. **Paths are recomputed**: node addresses are never cached
//! 3. **Failures stay local**: lookups, highlights and reads log and move
//!    on; only missing user input becomes an alert
//!
//! ## Usage
//!
//! ```rust
//! use livepage_dom::Document;
//! use livepage_editor::{Editor, MemoryFiles, MemoryStorage, Mode, StaticLayout};
//!
//! let doc = Document::parse("<html><body><p>Hello</p></body></html>");
//! let mut editor = Editor::new(
//!     doc,
//!     Box::new(StaticLayout::new()),
//!     Box::new(MemoryStorage::new()),
//!     Box::new(MemoryFiles::new()),
//! )
//! .unwrap();
//!
//! editor.toggle(Mode::TextEdit);
//! let p = editor.document().first_element_by_tag("p").unwrap();
//! editor.edit_text(p, "Hello World").unwrap();
//! assert_eq!(editor.store().maps().texts.len(), 1);
//! ```

pub mod editor;
pub mod errors;
pub mod events;
pub mod geometry;
pub mod highlight;
pub mod host;
pub mod image;
pub mod inspect;
pub mod listeners;
pub mod mirror;
pub mod mode;
pub mod path;
pub mod reads;
pub mod region;
pub mod replay;
pub mod session;
pub mod store;
pub mod style_ledger;
pub mod text;
pub mod ui;
pub mod upload;

pub use editor::Editor;
pub use errors::{EditorError, EditorResult, ReadError, StoreError};
pub use events::{DispatchOutcome, Event, Notice};
pub use geometry::{Layout, Rect, StaticLayout};
pub use host::{HostCommand, HostMessage, InboundMessage};
pub use image::{classify_image, ImageClass, ImageFacts};
pub use mirror::{DomPatch, Snapshot};
pub use mode::{Mode, ModeBehavior, ModeController};
pub use path::{compute_path, resolve, PathKey};
pub use reads::{FileSource, FsFiles, MemoryFiles, SelectedFile};
pub use replay::ReplayReport;
pub use session::EditorSession;
pub use store::{EditMap, EditMaps, FileStorage, MemoryStorage, PersistenceStore, Storage};
pub use text::{classify_text, TextClass, TextFacts};
pub use upload::{GalleryKind, GallerySubMode, UploadSession, UploadTarget};

#[cfg(test)]
mod tests_modes;
#[cfg(test)]
mod tests_upload;

//! # File reads
//!
//! Every file the user picks is read by an independent future. The
//! futures run on a single-threaded [`LocalPool`]; each finished read
//! posts a [`ReadCompletion`] on an unbounded channel, and the editor
//! applies completions when the host calls `Editor::settle()`.
//!
//! ```text
//! submit(file, purpose) ──► LocalPool ──► FileSource::read(file)
//!                                              │
//!                                   data_uri(mime, bytes)
//!                                              ▼
//!               drain() ◄── mpsc::unbounded ◄── ReadCompletion
//! ```
//!
//! Reads are not cancelled when the upload dialog closes. Only
//! [`ReadPool::abort_all`] drops pending results.

use crate::errors::ReadError;
use crate::upload::UploadTarget;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

/// A file picked in one of the dialog's file inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    /// Location on disk, when the host has one
    pub path: Option<PathBuf>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mime = guess_mime(&name).to_string();
        Self {
            name,
            mime,
            path: None,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path: Some(path),
            ..Self::new(name)
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }
}

fn guess_mime(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Where the bytes of a [`SelectedFile`] come from
pub trait FileSource {
    fn read(&self, file: &SelectedFile) -> LocalBoxFuture<'static, Result<Vec<u8>, ReadError>>;
}

/// Files held in memory, keyed by name
#[derive(Debug, Clone, Default)]
pub struct MemoryFiles {
    files: HashMap<String, Result<Vec<u8>, ReadError>>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.to_string(), Ok(bytes.into()));
        self
    }

    /// Register a file whose read fails
    pub fn with_failure(mut self, name: &str, message: &str) -> Self {
        self.files.insert(
            name.to_string(),
            Err(ReadError::Io {
                name: name.to_string(),
                message: message.to_string(),
            }),
        );
        self
    }
}

impl FileSource for MemoryFiles {
    fn read(&self, file: &SelectedFile) -> LocalBoxFuture<'static, Result<Vec<u8>, ReadError>> {
        let result = self
            .files
            .get(&file.name)
            .cloned()
            .unwrap_or_else(|| Err(ReadError::NotFound(file.name.clone())));
        future::ready(result).boxed_local()
    }
}

/// Reads [`SelectedFile::path`] from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFiles;

impl FileSource for FsFiles {
    fn read(&self, file: &SelectedFile) -> LocalBoxFuture<'static, Result<Vec<u8>, ReadError>> {
        let name = file.name.clone();
        let path = file.path.clone();
        async move {
            let path = path.ok_or_else(|| ReadError::NotFound(name.clone()))?;
            std::fs::read(&path).map_err(|e| ReadError::io(name, &e))
        }
        .boxed_local()
    }
}

/// Shared flag checked by every read before it reports back
#[derive(Debug, Clone, Default)]
pub struct AbortToken(Rc<Cell<bool>>);

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.set(true);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.get()
    }
}

/// Which preview area a preview read fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewSlot {
    /// The single-file thumbnail, for the gallery index picked at the time
    Single { selection: Option<usize> },
    /// One tile of the multiple-file preview
    Multiple { index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadPurpose {
    Preview { session: u64, slot: PreviewSlot },
    Commit {
        target: UploadTarget,
        position: usize,
        batch: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadCompletion {
    pub file: SelectedFile,
    pub purpose: ReadPurpose,
    /// Data URI of the file, or why it could not be read
    pub result: Result<String, ReadError>,
}

pub struct ReadPool {
    pool: LocalPool,
    spawner: LocalSpawner,
    tx: UnboundedSender<ReadCompletion>,
    rx: UnboundedReceiver<ReadCompletion>,
    abort: AbortToken,
    in_flight: usize,
}

impl fmt::Debug for ReadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadPool")
            .field("in_flight", &self.in_flight)
            .field("aborted", &self.abort.is_aborted())
            .finish()
    }
}

impl Default for ReadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadPool {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        let (tx, rx) = mpsc::unbounded();
        Self {
            pool,
            spawner,
            tx,
            rx,
            abort: AbortToken::new(),
            in_flight: 0,
        }
    }

    /// Start reading `file`. The result arrives through [`ReadPool::drain`].
    pub fn submit(&mut self, source: &dyn FileSource, file: SelectedFile, purpose: ReadPurpose) {
        let read = source.read(&file);
        let tx = self.tx.clone();
        let token = self.abort.clone();
        let completion = ReadCompletion {
            file,
            purpose,
            result: Err(ReadError::Spawn(String::new())),
        };
        let fallback = completion.clone();

        let task = async move {
            let bytes = read.await;
            if token.is_aborted() {
                debug!(file = %completion.file.name, "read finished after abort");
                return;
            }
            let result = bytes.map(|b| data_uri(&completion.file.mime, &b));
            if let Err(err) = tx.unbounded_send(ReadCompletion {
                result,
                ..completion
            }) {
                debug!(file = %err.into_inner().file.name, "read pool gone before completion");
            }
        };

        self.in_flight += 1;
        if let Err(err) = self.spawner.spawn_local(task) {
            warn!(file = %fallback.file.name, error = %err, "could not schedule read");
            let name = fallback.file.name.clone();
            if self
                .tx
                .unbounded_send(ReadCompletion {
                    result: Err(ReadError::Spawn(name)),
                    ..fallback
                })
                .is_err()
            {
                debug!("read pool closed while scheduling");
            }
        }
    }

    /// Run reads until none can progress, then collect their completions
    pub fn drain(&mut self) -> Vec<ReadCompletion> {
        self.pool.run_until_stalled();
        let mut done = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            done.push(completion);
        }
        done
    }

    /// Drop the results of every read submitted so far
    pub fn abort_all(&mut self) -> usize {
        let dropped = self.in_flight;
        self.abort.abort();
        self.abort = AbortToken::new();
        self.in_flight = 0;
        // Anything already queued belongs to the aborted generation
        while self.rx.try_recv().is_ok() {}
        dropped
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

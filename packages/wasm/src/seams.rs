//! Browser implementations of the runtime's host seams: layout from the
//! rendering tree, storage in `localStorage`, file reads through
//! `FileReader`.

use crate::tree::BrowserTree;
use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};
use livepage_dom::{Document, NodeId};
use livepage_editor::{FileSource, Layout, ReadError, Rect, SelectedFile, Storage, StoreError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{File, FileReader, Window};

pub(crate) fn describe(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            err.dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", err))
}

pub struct WebLayout {
    window: Window,
    tree: Rc<RefCell<BrowserTree>>,
}

impl WebLayout {
    pub fn new(window: Window, tree: Rc<RefCell<BrowserTree>>) -> Self {
        Self { window, tree }
    }
}

impl Layout for WebLayout {
    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        let tree = self.tree.try_borrow().ok()?;
        let rect = tree.element(node)?.get_bounding_client_rect();
        Some(Rect::new(rect.x(), rect.y(), rect.width(), rect.height()))
    }

    fn element_from_point(&self, _doc: &Document, x: f64, y: f64) -> Option<NodeId> {
        let element = self
            .window
            .document()?
            .element_from_point(x as f32, y as f32)?;
        self.tree.try_borrow().ok()?.lookup(&element)
    }

    fn scroll_offset(&self) -> (f64, f64) {
        (
            self.window.scroll_x().unwrap_or_default(),
            self.window.scroll_y().unwrap_or_default(),
        )
    }

    fn viewport_size(&self) -> (f64, f64) {
        let size = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or_default();
        (
            size(self.window.inner_width()),
            size(self.window.inner_height()),
        )
    }
}

pub struct WebStorage {
    storage: web_sys::Storage,
}

impl WebStorage {
    pub fn local(window: &Window) -> Result<Self, JsValue> {
        let storage = window
            .local_storage()?
            .ok_or_else(|| JsValue::from_str("localStorage is not available"))?;
        Ok(Self { storage })
    }
}

impl Storage for WebStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage
            .get_item(key)
            .map_err(|err| StoreError::backend(key, describe(&err)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(key, value)
            .map_err(|err| StoreError::backend(key, describe(&err)))
    }
}

/// Called when a read finished in the browser and the read pool can
/// make progress again
pub type Wake = Rc<dyn Fn()>;

/// Files picked in the page's file inputs, read with `FileReader`.
///
/// Cloning shares the picked files and the wake hook.
#[derive(Clone, Default)]
pub struct BrowserFiles {
    picked: Rc<RefCell<HashMap<String, File>>>,
    wake: Rc<RefCell<Option<Wake>>>,
}

impl BrowserFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_wake(&self, wake: Wake) {
        *self.wake.borrow_mut() = Some(wake);
    }

    /// Keep `file` for a later read and describe it for the runtime
    pub fn remember(&self, file: File) -> SelectedFile {
        let selected = selected_file(&file.name(), &file.type_());
        self.picked.borrow_mut().insert(selected.name.clone(), file);
        selected
    }

    fn wake(&self) {
        let wake = self.wake.borrow().clone();
        if let Some(wake) = wake {
            wake();
        }
    }
}

/// Browsers report an empty type for files they do not recognise
pub fn selected_file(name: &str, mime: &str) -> SelectedFile {
    let selected = SelectedFile::new(name);
    if mime.is_empty() {
        selected
    } else {
        selected.with_mime(mime)
    }
}

type ReadResult = Result<Vec<u8>, String>;

impl FileSource for BrowserFiles {
    fn read(&self, file: &SelectedFile) -> LocalBoxFuture<'static, Result<Vec<u8>, ReadError>> {
        let name = file.name.clone();
        let Some(blob) = self.picked.borrow().get(&name).cloned() else {
            return future::ready(Err(ReadError::NotFound(name))).boxed_local();
        };
        let reader = match FileReader::new() {
            Ok(reader) => reader,
            Err(err) => {
                let message = describe(&err);
                return future::ready(Err(ReadError::Io { name, message })).boxed_local();
            }
        };

        let (tx, rx) = oneshot::channel::<ReadResult>();
        let tx = Rc::new(RefCell::new(Some(tx)));
        let finish = {
            let files = self.clone();
            let name = name.clone();
            move |result: ReadResult| {
                if let Some(tx) = tx.borrow_mut().take() {
                    if tx.send(result).is_err() {
                        debug!(file = %name, "read result dropped");
                    }
                }
                files.wake();
            }
        };

        let onload = {
            let reader = reader.clone();
            let finish = finish.clone();
            Closure::<dyn FnMut()>::new(move || {
                let bytes = reader
                    .result()
                    .map(|buffer| js_sys::Uint8Array::new(&buffer).to_vec())
                    .map_err(|err| describe(&err));
                finish(bytes);
            })
        };
        let onerror = Closure::<dyn FnMut()>::new(move || {
            finish(Err("the browser could not read the file".to_string()));
        });
        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        reader.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        if let Err(err) = reader.read_as_array_buffer(&blob) {
            let message = describe(&err);
            return future::ready(Err(ReadError::Io { name, message })).boxed_local();
        }

        async move {
            let result = rx.await;
            // The callbacks must outlive the read
            drop((onload, onerror, reader));
            match result {
                Ok(Ok(bytes)) => Ok(bytes),
                Ok(Err(message)) => Err(ReadError::Io { name, message }),
                Err(_) => Err(ReadError::Io {
                    name,
                    message: "reader went away".to_string(),
                }),
            }
        }
        .boxed_local()
    }
}

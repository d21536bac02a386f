//! # Livepage WASM
//!
//! Runs the editing overlay inside the page it was injected into.
//!
//! ```text
//! page DOM ──mirror──► Document ──► Editor
//!    ▲                                 │
//!    └──────── DomPatch ◄── Snapshot ◄─┘
//! ```
//!
//! The bundle attaches itself once the document has loaded. Pages that
//! load it some other way can call `attachOverlay()`.

mod listeners;
mod overlay;
pub mod seams;
pub mod tree;

use overlay::Overlay;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

thread_local! {
    static ATTACHED: RefCell<Option<Rc<RefCell<Overlay>>>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    if let Err(err) = attach_when_ready() {
        web_sys::console::error_1(&err);
    }
}

fn attach_when_ready() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;
    if document.ready_state() != "loading" {
        return attach_overlay();
    }

    let on_ready = Closure::once(move || {
        if let Err(err) = attach_overlay() {
            web_sys::console::error_1(&err);
        }
    });
    document.add_event_listener_with_callback(
        "DOMContentLoaded",
        on_ready.as_ref().unchecked_ref(),
    )?;
    on_ready.forget();
    Ok(())
}

/// Attach the overlay to the current page. A second call does nothing.
#[wasm_bindgen(js_name = attachOverlay)]
pub fn attach_overlay() -> Result<(), JsValue> {
    if ATTACHED.with(|slot| slot.borrow().is_some()) {
        return Ok(());
    }
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let overlay = Overlay::attach(window.clone())?;
    listeners::install(&window, &overlay)?;
    ATTACHED.with(|slot| *slot.borrow_mut() = Some(overlay));
    info!("overlay attached");
    Ok(())
}

/// Whether the overlay is running on this page
#[wasm_bindgen(js_name = isAttached)]
pub fn is_attached() -> bool {
    ATTACHED.with(|slot| slot.borrow().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_attached_before_start() {
        assert!(!is_attached());
    }
}

//! Page events translated into runtime [`Event`]s.
//!
//! One document-level listener per event kind, in the capture phase, so
//! the runtime decides before the page's own handlers whether an event
//! goes any further.

use crate::overlay::Overlay;
use livepage_editor::{DispatchOutcome, Event, HostCommand};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{EventTarget, HtmlInputElement, MessageEvent, MouseEvent, Node, Window};

type Handle = fn(&mut Overlay, web_sys::Event);

pub fn install(window: &Window, overlay: &Rc<RefCell<Overlay>>) -> Result<(), JsValue> {
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let handlers: [(&'static str, Handle); 4] = [
        ("mousemove", on_pointer_move),
        ("click", on_click),
        ("input", on_input),
        ("change", on_change),
    ];
    for (kind, handle) in handlers {
        listen(&document, kind, true, overlay, handle)?;
    }
    listen(window, "message", false, overlay, on_message)
}

fn listen(
    target: &EventTarget,
    kind: &'static str,
    capture: bool,
    overlay: &Rc<RefCell<Overlay>>,
    handle: Handle,
) -> Result<(), JsValue> {
    let overlay = Rc::clone(overlay);
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        // An alert raised while handling one event can let another through
        match overlay.try_borrow_mut() {
            Ok(mut overlay) => handle(&mut overlay, event),
            Err(_) => debug!(kind, "overlay busy; event skipped"),
        }
    });
    target.add_event_listener_with_callback_and_bool(
        kind,
        closure.as_ref().unchecked_ref(),
        capture,
    )?;
    closure.forget();
    Ok(())
}

fn target_of(overlay: &Overlay, event: &web_sys::Event) -> Option<livepage_dom::NodeId> {
    let node = event.target()?.dyn_into::<Node>().ok()?;
    overlay.lookup(&node)
}

fn honor(event: &web_sys::Event, outcome: DispatchOutcome) {
    if outcome.default_prevented {
        event.prevent_default();
    }
    if outcome.propagation_stopped {
        event.stop_propagation();
    }
}

fn on_pointer_move(overlay: &mut Overlay, event: web_sys::Event) {
    let Some(event) = event.dyn_ref::<MouseEvent>() else {
        return;
    };
    overlay.dispatch(Event::PointerMove {
        x: f64::from(event.client_x()),
        y: f64::from(event.client_y()),
    });
}

fn on_click(overlay: &mut Overlay, event: web_sys::Event) {
    let Some(target) = target_of(overlay, &event) else {
        return;
    };
    let outcome = overlay.dispatch(Event::Click { target });
    honor(&event, outcome);
}

fn on_input(overlay: &mut Overlay, event: web_sys::Event) {
    let Some(target) = target_of(overlay, &event) else {
        return;
    };
    overlay.pull(target);
    let outcome = overlay.dispatch(Event::Input { target });
    honor(&event, outcome);
}

fn on_change(overlay: &mut Overlay, event: web_sys::Event) {
    let Some(target) = target_of(overlay, &event) else {
        return;
    };
    let mut files = Vec::new();
    if let Some(list) = event
        .target()
        .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
        .and_then(|input| input.files())
    {
        for index in 0..list.length() {
            if let Some(file) = list.item(index) {
                files.push(overlay.remember(file));
            }
        }
    }
    let outcome = overlay.dispatch(Event::Change { target, files });
    honor(&event, outcome);
}

fn on_message(overlay: &mut Overlay, event: web_sys::Event) {
    let Some(event) = event.dyn_ref::<MessageEvent>() else {
        return;
    };
    let json = js_sys::JSON::stringify(&event.data())
        .ok()
        .and_then(|s| s.as_string());
    if let Some(command) = json.as_deref().and_then(HostCommand::parse) {
        overlay.dispatch(Event::Host(command));
    }
}

//! # Listener Registry
//!
//! Bookkeeping for every handler the overlay attaches to the page.
//!
//! ## Design
//!
//! Handlers are plain data ([`Handler`]) bound to a node and tagged with
//! an [`Owner`]. Tearing a mode down is then a single
//! `unbind_owner(Owner::Mode(m))`, and "no stale handlers after a mode
//! switch" is checkable by counting.
//!
//! ```text
//! bindings: [ (node 12, SelectRegion,  Mode(RegionEdit)),
//!             (node 40, ToggleMode(..), Overlay),
//!             ... ]
//! pointer_move: Some((RegionHover, Mode(RegionEdit)))
//! ```
//!
//! A handler is never bound twice to the same node for the same owner.

use crate::image::ImageClass;
use crate::mode::Mode;
use livepage_dom::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Permanent overlay chrome bound once at start-up
    Overlay,
    Mode(Mode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Input,
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    // Overlay controls
    ToggleMode(Mode),
    Duplicate,
    Remove,
    StopPropagation,
    CancelUpload,
    ApplyUpload,
    DismissUpload,
    PickGalleryImage(usize),
    ChooseSingleFile,
    ChooseMultipleFiles,
    ChooseUploadKind,

    // Mode handlers
    PreventDefault,
    SelectRegion,
    OpenUpload(ImageClass),
    SuppressNavigation,
    PersistText,
}

impl Handler {
    pub fn kind(&self) -> EventKind {
        match self {
            Handler::PersistText => EventKind::Input,
            Handler::ChooseSingleFile | Handler::ChooseMultipleFiles | Handler::ChooseUploadKind => {
                EventKind::Change
            }
            _ => EventKind::Click,
        }
    }
}

/// Document-level pointer-move handler of the active mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerHandler {
    Inspect,
    RegionHover,
    ImageHover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub node: NodeId,
    pub handler: Handler,
    pub owner: Owner,
}

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    bindings: Vec<Binding>,
    pointer_move: Option<(PointerHandler, Owner)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `node`. Returns `false` when it was already bound.
    pub fn bind(&mut self, node: NodeId, handler: Handler, owner: Owner) -> bool {
        let binding = Binding {
            node,
            handler,
            owner,
        };
        if self.bindings.contains(&binding) {
            return false;
        }
        self.bindings.push(binding);
        true
    }

    pub fn unbind(&mut self, node: NodeId, handler: Handler) {
        self.bindings
            .retain(|b| !(b.node == node && b.handler == handler));
    }

    /// Drop every binding of `owner`, returning how many were removed
    pub fn unbind_owner(&mut self, owner: Owner) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.owner != owner);
        before - self.bindings.len()
    }

    pub fn unbind_nodes(&mut self, nodes: &[NodeId]) {
        self.bindings.retain(|b| !nodes.contains(&b.node));
    }

    /// Handlers on `node` for `kind`, in binding order
    pub fn handlers(&self, node: NodeId, kind: EventKind) -> Vec<Handler> {
        self.bindings
            .iter()
            .filter(|b| b.node == node && b.handler.kind() == kind)
            .map(|b| b.handler)
            .collect()
    }

    pub fn is_bound(&self, node: NodeId, handler: Handler) -> bool {
        self.bindings
            .iter()
            .any(|b| b.node == node && b.handler == handler)
    }

    pub fn count_owned(&self, owner: Owner) -> usize {
        self.bindings.iter().filter(|b| b.owner == owner).count()
    }

    pub fn nodes_with(&self, handler: Handler) -> Vec<NodeId> {
        self.bindings
            .iter()
            .filter(|b| b.handler == handler)
            .map(|b| b.node)
            .collect()
    }

    pub fn bind_pointer_move(&mut self, handler: PointerHandler, owner: Owner) {
        self.pointer_move = Some((handler, owner));
    }

    pub fn unbind_pointer_move(&mut self) {
        self.pointer_move = None;
    }

    pub fn pointer_move(&self) -> Option<PointerHandler> {
        self.pointer_move.map(|(h, _)| h)
    }

    pub fn pointer_move_owner(&self) -> Option<Owner> {
        self.pointer_move.map(|(_, o)| o)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

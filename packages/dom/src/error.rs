use crate::NodeId;
use thiserror::Error;

pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("Invalid selector `{selector}` at {pos}: {message}")]
    InvalidSelector {
        selector: String,
        pos: usize,
        message: String,
    },

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0:?} has no parent")]
    Detached(NodeId),

    #[error("Cannot insert {child:?} into its own subtree")]
    HierarchyCycle { child: NodeId },
}

impl DomError {
    pub fn invalid_selector(selector: &str, pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            pos,
            message: message.into(),
        }
    }
}

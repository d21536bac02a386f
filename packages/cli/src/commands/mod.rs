pub mod inject;
pub mod replay;

pub use inject::{inject, InjectArgs};
pub use replay::{replay, ReplayArgs};

mod core;
mod engine;
pub mod format;
mod ops;
mod plugin;
mod serde_value;

pub use crate::core::*;
pub use crate::engine::*;
pub use crate::ops::*;
pub use crate::plugin::*;

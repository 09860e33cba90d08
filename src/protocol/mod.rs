//! Protocol-level records emitted by wrappers and the factory.

pub mod events;

pub use events::*;

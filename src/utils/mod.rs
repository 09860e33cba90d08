//! Utility modules for the synth wrapper.
//!
//! - Fixed-point arithmetic
//! - Addresses, asset keys and hashing
//! - Constants

pub mod address;
pub mod constants;
pub mod math;

pub use address::*;
pub use constants::*;
pub use math::*;

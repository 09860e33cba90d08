//! Core modules for the synth wrapper.
//!
//! This module contains the fundamental building blocks:
//! - Token, config and fee-sink capabilities with in-memory ledgers
//! - Wrapper accounting state
//! - The wrapper engine
//! - The per-asset wrapper registry

pub mod config;
pub mod factory;
pub mod fees;
pub mod state;
pub mod token;
pub mod wrapper;

pub use config::*;
pub use factory::*;
pub use fees::*;
pub use state::*;
pub use token::*;
pub use wrapper::*;

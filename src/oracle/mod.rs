//! Oracle module for exchange rates.
//!
//! The wrapper consumes the `PriceOracle` capability to value its synth
//! debt and to convert escrowed fees into the stable unit of account.

pub mod price_feed;

pub use price_feed::*;

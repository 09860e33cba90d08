//! # synthwrap
//!
//! A collateral-backed synth wrapper. Holders of a collateral token mint
//! the matching synth 1:1 against it, burn the synth back into collateral,
//! and the fees charged on both sides are periodically paid out as stable
//! debt to a fee sink.
//!
//! ## Architecture
//!
//! - **Utils**: Fixed-point math, addresses and asset keys
//! - **Core**: Collaborator capabilities, wrapper engine and factory
//! - **Oracle**: Exchange rates in the stable unit
//! - **Protocol**: Events emitted by wrappers and the factory
//! - **CLI**: Deployment configuration and scenario runner
//!
//! ## Example
//!
//! ```rust,ignore
//! use synthwrap::prelude::*;
//!
//! let receipt = wrapper.mint(&alice, "500".parse()?)?;
//! assert!(receipt.amount_processed <= receipt.requested);
//!
//! let receipt = wrapper.burn(&alice, "100.3".parse()?)?;
//! let paid = wrapper.distribute_fees()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod oracle;
pub mod protocol;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::{ConfigProvider, StaticConfig, WrapperParams},
        factory::{CollateralRef, SharedCollaborators, SharedWrapper, WrapperFactory},
        fees::{FeePool, FeeSink},
        state::WrapperState,
        token::{CollateralToken, SynthLedger, TokenLedger},
        wrapper::{BurnReceipt, Collaborators, ConversionReceipt, FeeDistribution, MintReceipt, WrapperCore},
    };
    pub use crate::error::{Error, Result};
    pub use crate::oracle::price_feed::{PriceOracle, StaticOracle};
    pub use crate::protocol::events::{EventLog, EventRecord, WrapperEvent};
    pub use crate::utils::{
        address::{Address, AssetKey, Hash},
        math::{div_round, mul_round, FixedPoint},
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "synthwrap";

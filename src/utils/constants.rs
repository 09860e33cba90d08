//! Protocol constants.
//!
//! All wrapper-wide constants are defined here for easy auditing.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Decimal places of every amount and rate
pub const DECIMALS: u32 = 18;

/// Basis points divisor (10000 = 100%)
pub const BPS_DIVISOR: u64 = 10_000;

// ═══════════════════════════════════════════════════════════════════════════════
// UNITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Unit-of-account key of the stable debt token
pub const STABLE_UNIT: &str = "sUSD";

/// Maximum length of an asset key (fits a 32-byte slot)
pub const MAX_ASSET_KEY_LENGTH: usize = 32;

/// Length of an account address in bytes
pub const ADDRESS_LENGTH: usize = 20;

// ═══════════════════════════════════════════════════════════════════════════════
// FEES
// ═══════════════════════════════════════════════════════════════════════════════

/// Default mint fee - 0.5% (50 basis points)
pub const DEFAULT_MINT_FEE_BPS: u64 = 50;

/// Default burn fee - 0.5% (50 basis points)
pub const DEFAULT_BURN_FEE_BPS: u64 = 50;

/// Maximum configurable fee rate - 100% (10000 basis points)
pub const MAX_FEE_BPS: u64 = BPS_DIVISOR;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum events kept in memory per wrapper
pub const MAX_EVENTS: usize = 1_000;

/// Domain tag for deterministic address derivation
pub const ADDRESS_DOMAIN: &str = "synthwrap/address";

/// Domain tag for wrapper instance addresses
pub const INSTANCE_DOMAIN: &str = "synthwrap/instance";

//! Wrapper configuration and parameters.
//!
//! Parameters are looked up per asset key on every call, so an operator
//! can move a ceiling or a fee rate without touching the wrapper:
//! - `ceiling`: maximum collateral the wrapper may hold
//! - `mint_fee_rate` / `burn_fee_rate`: fractions in `[0, 1]`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::utils::address::AssetKey;
use crate::utils::constants::*;
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG CAPABILITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-asset parameter source consumed by the wrapper
pub trait ConfigProvider: Send + Sync {
    /// Maximum collateral reserve for `key`
    fn ceiling(&self, key: &AssetKey) -> FixedPoint;

    /// Fraction of the processed collateral charged on mint
    fn mint_fee_rate(&self, key: &AssetKey) -> FixedPoint;

    /// Fraction of the principal charged on burn
    fn burn_fee_rate(&self, key: &AssetKey) -> FixedPoint;
}

// ═══════════════════════════════════════════════════════════════════════════════
// WRAPPER PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameters of a single asset pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperParams {
    /// Maximum collateral the wrapper may hold
    pub ceiling: FixedPoint,
    /// Mint fee as a fraction (0.01 = 1%)
    pub mint_fee_rate: FixedPoint,
    /// Burn fee as a fraction (0.01 = 1%)
    pub burn_fee_rate: FixedPoint,
}

impl Default for WrapperParams {
    fn default() -> Self {
        Self {
            ceiling: FixedPoint::ZERO,
            mint_fee_rate: FixedPoint::from_bps(DEFAULT_MINT_FEE_BPS),
            burn_fee_rate: FixedPoint::from_bps(DEFAULT_BURN_FEE_BPS),
        }
    }
}

impl WrapperParams {
    /// Parameters with the given ceiling and default fees
    pub fn with_ceiling(ceiling: FixedPoint) -> Self {
        Self {
            ceiling,
            ..Default::default()
        }
    }

    /// Override both fee rates
    pub fn with_fees(mut self, mint_fee_rate: FixedPoint, burn_fee_rate: FixedPoint) -> Self {
        self.mint_fee_rate = mint_fee_rate;
        self.burn_fee_rate = burn_fee_rate;
        self
    }

    /// Fee rates above 100% would make a principal negative
    pub fn validate(&self) -> Result<()> {
        let max = FixedPoint::from_bps(MAX_FEE_BPS);
        for (name, rate) in [
            ("mint_fee_rate", self.mint_fee_rate),
            ("burn_fee_rate", self.burn_fee_rate),
        ] {
            if rate > max {
                return Err(Error::InvalidParameter {
                    name: name.into(),
                    reason: format!("{} exceeds {}", rate, max),
                });
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATIC CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Operator-managed parameter table
///
/// Unknown keys read as a zero ceiling and zero fees, which leaves the
/// wrapper without capacity until it is configured.
#[derive(Debug, Default)]
pub struct StaticConfig {
    params: RwLock<HashMap<AssetKey, WrapperParams>>,
}

impl StaticConfig {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parameters of `key` after validating them
    pub fn set_params(&self, key: AssetKey, params: WrapperParams) -> Result<()> {
        params.validate()?;
        tracing::info!(
            key = %key,
            ceiling = %params.ceiling,
            mint_fee_rate = %params.mint_fee_rate,
            burn_fee_rate = %params.burn_fee_rate,
            "wrapper parameters set"
        );
        self.params.write()?.insert(key, params);
        Ok(())
    }

    /// Current parameters of `key`
    pub fn params(&self, key: &AssetKey) -> Option<WrapperParams> {
        self.params
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
    }

    fn get(&self, key: &AssetKey) -> WrapperParams {
        self.params(key).unwrap_or(WrapperParams {
            ceiling: FixedPoint::ZERO,
            mint_fee_rate: FixedPoint::ZERO,
            burn_fee_rate: FixedPoint::ZERO,
        })
    }
}

impl ConfigProvider for StaticConfig {
    fn ceiling(&self, key: &AssetKey) -> FixedPoint {
        self.get(key).ceiling
    }

    fn mint_fee_rate(&self, key: &AssetKey) -> FixedPoint {
        self.get(key).mint_fee_rate
    }

    fn burn_fee_rate(&self, key: &AssetKey) -> FixedPoint {
        self.get(key).burn_fee_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AssetKey {
        AssetKey::new("sETH").unwrap()
    }

    #[test]
    fn test_params_default() {
        let params = WrapperParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.mint_fee_rate, FixedPoint::from_bps(DEFAULT_MINT_FEE_BPS));
        assert!(params.ceiling.is_zero());
    }

    #[test]
    fn test_fee_above_one_rejected() {
        let params = WrapperParams::with_ceiling(FixedPoint::from_integer(1000))
            .with_fees(FixedPoint::from_integer(2), FixedPoint::ZERO);
        assert!(params.validate().is_err());

        let config = StaticConfig::new();
        assert!(config.set_params(key(), params).is_err());
        assert!(config.params(&key()).is_none());
    }

    #[test]
    fn test_unknown_key_has_no_capacity() {
        let config = StaticConfig::new();
        assert!(config.ceiling(&key()).is_zero());
        assert!(config.mint_fee_rate(&key()).is_zero());
    }

    #[test]
    fn test_live_updates() {
        let config = StaticConfig::new();
        config
            .set_params(key(), WrapperParams::with_ceiling(FixedPoint::from_integer(1000)))
            .unwrap();
        assert_eq!(config.ceiling(&key()), FixedPoint::from_integer(1000));

        config
            .set_params(key(), WrapperParams::with_ceiling(FixedPoint::from_integer(5)))
            .unwrap();
        assert_eq!(config.ceiling(&key()), FixedPoint::from_integer(5));
    }

    #[test]
    fn test_params_json() {
        let params = WrapperParams::with_ceiling(FixedPoint::from_integer(1000))
            .with_fees(FixedPoint::from_bps(100), FixedPoint::from_bps(30));
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"0.003\""));
        let back: WrapperParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}

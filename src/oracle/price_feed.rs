//! Exchange rates for converting between asset units.
//!
//! Every rate is quoted in the stable unit of account, so converting
//! `amount` of `from` into `to` is `amount * rate(from) / rate(to)`, each
//! step rounded half-up at 18 decimals.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::utils::address::AssetKey;
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE CAPABILITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Price oracle consumed by the wrapper
pub trait PriceOracle: Send + Sync {
    /// Convert `amount` of `from` into units of `to` at the current rates
    fn effective_value(&self, from: &AssetKey, amount: FixedPoint, to: &AssetKey) -> Result<FixedPoint>;

    /// Whether the rate for `key` must not be used
    fn rate_is_invalid(&self, key: &AssetKey) -> bool;
}

// ═══════════════════════════════════════════════════════════════════════════════
// RATE DATA
// ═══════════════════════════════════════════════════════════════════════════════

/// A single rate entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateData {
    /// Price of one unit in the stable unit of account
    pub rate: FixedPoint,
    /// Unix timestamp when the rate was recorded
    pub updated_at: i64,
    /// Explicitly flagged as unusable (e.g. circuit breaker tripped)
    pub flagged: bool,
}

impl RateData {
    /// A fresh, unflagged rate
    pub fn new(rate: FixedPoint) -> Self {
        Self {
            rate,
            updated_at: chrono::Utc::now().timestamp(),
            flagged: false,
        }
    }

    /// A zero or flagged rate is never usable
    pub fn is_valid(&self) -> bool {
        !self.flagged && !self.rate.is_zero()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATIC ORACLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Oracle backed by operator-set rates
///
/// The stable unit is pinned to 1.0 and cannot be flagged.
#[derive(Debug)]
pub struct StaticOracle {
    stable_unit: AssetKey,
    rates: RwLock<HashMap<AssetKey, RateData>>,
}

impl StaticOracle {
    /// Create an oracle quoting in `stable_unit`
    pub fn new(stable_unit: AssetKey) -> Self {
        Self {
            stable_unit,
            rates: RwLock::new(HashMap::new()),
        }
    }

    /// The unit every rate is quoted in
    pub fn stable_unit(&self) -> &AssetKey {
        &self.stable_unit
    }

    /// Set or replace the rate of `key`, clearing any invalid flag
    pub fn set_rate(&self, key: AssetKey, rate: FixedPoint) -> Result<()> {
        if key == self.stable_unit && rate != FixedPoint::ONE {
            return Err(Error::InvalidParameter {
                name: "rate".into(),
                reason: format!("{} is pinned to 1.0", self.stable_unit),
            });
        }
        tracing::debug!(key = %key, rate = %rate, "rate updated");
        self.rates.write()?.insert(key, RateData::new(rate));
        Ok(())
    }

    /// Mark the rate of `key` as invalid (or clear the mark)
    pub fn set_invalid(&self, key: &AssetKey, invalid: bool) -> Result<()> {
        let mut rates = self.rates.write()?;
        let entry = rates
            .get_mut(key)
            .ok_or_else(|| Error::InvalidRate(key.to_string()))?;
        entry.flagged = invalid;
        Ok(())
    }

    /// Current rate entry for `key`
    pub fn rate_for(&self, key: &AssetKey) -> Option<RateData> {
        if *key == self.stable_unit {
            return Some(RateData::new(FixedPoint::ONE));
        }
        self.rates
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
    }

    fn usable_rate(&self, key: &AssetKey) -> Result<FixedPoint> {
        match self.rate_for(key) {
            Some(data) if data.is_valid() => Ok(data.rate),
            _ => Err(Error::InvalidRate(key.to_string())),
        }
    }
}

impl PriceOracle for StaticOracle {
    fn effective_value(&self, from: &AssetKey, amount: FixedPoint, to: &AssetKey) -> Result<FixedPoint> {
        if from == to {
            return Ok(amount);
        }
        let source = self.usable_rate(from)?;
        let dest = self.usable_rate(to)?;
        amount.mul_round(source)?.div_round(dest)
    }

    fn rate_is_invalid(&self, key: &AssetKey) -> bool {
        !self.rate_for(key).map(|d| d.is_valid()).unwrap_or(false)
    }
}

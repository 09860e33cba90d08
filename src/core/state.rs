//! Wrapper accounting state.
//!
//! The three counters are the only persisted quantities of a wrapper. The
//! collateral reserve is never stored: it is always the live collateral
//! balance of the wrapper's own address.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::address::{AssetKey, Hash};
use crate::utils::math::FixedPoint;

/// Counters of one asset pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperState {
    /// Key used to look up configuration and rates
    pub asset_key: AssetKey,
    /// Synth units issued and not yet retired
    pub synth_debt: FixedPoint,
    /// Stable units issued to date via fee distribution
    pub stable_debt_issued: FixedPoint,
    /// Synth units held by the wrapper awaiting distribution
    pub fee_escrow: FixedPoint,
}

impl WrapperState {
    /// Fresh state with all counters zero
    pub fn new(asset_key: AssetKey) -> Self {
        Self {
            asset_key,
            synth_debt: FixedPoint::ZERO,
            stable_debt_issued: FixedPoint::ZERO,
            fee_escrow: FixedPoint::ZERO,
        }
    }

    /// Reduce `synth_debt` by `delta`, clamping at zero
    ///
    /// Returns the part of `delta` that exceeded the recorded debt.
    pub fn retire_synth_debt(&mut self, delta: FixedPoint) -> FixedPoint {
        let retired = self.synth_debt.min(delta);
        self.synth_debt = self.synth_debt.saturating_sub(retired);
        delta.saturating_sub(retired)
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Compute state hash over the key and raw counters
    pub fn state_hash(&self) -> Hash {
        let mut data = Vec::new();
        data.extend_from_slice(self.asset_key.as_str().as_bytes());
        data.extend_from_slice(&self.synth_debt.raw().to_be_bytes());
        data.extend_from_slice(&self.stable_debt_issued.raw().to_be_bytes());
        data.extend_from_slice(&self.fee_escrow.raw().to_be_bytes());
        Hash::sha256(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WrapperState {
        WrapperState::new(AssetKey::new("sETH").unwrap())
    }

    #[test]
    fn test_new_state_is_zero() {
        let state = state();
        assert!(state.synth_debt.is_zero());
        assert!(state.stable_debt_issued.is_zero());
        assert!(state.fee_escrow.is_zero());
    }

    #[test]
    fn test_retire_clamps_at_zero() {
        let mut state = state();
        state.synth_debt = FixedPoint::from_integer(10);

        assert!(state.retire_synth_debt(FixedPoint::from_integer(4)).is_zero());
        assert_eq!(state.synth_debt, FixedPoint::from_integer(6));

        let excess = state.retire_synth_debt(FixedPoint::from_integer(9));
        assert_eq!(excess, FixedPoint::from_integer(3));
        assert!(state.synth_debt.is_zero());
    }

    #[test]
    fn test_bytes_roundtrip_and_hash() {
        let mut state = state();
        state.fee_escrow = FixedPoint::from_integer(2);

        let restored = WrapperState::from_bytes(&state.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.state_hash(), state.state_hash());

        let mut other = state.clone();
        other.synth_debt = FixedPoint::ONE;
        assert_ne!(other.state_hash(), state.state_hash());
    }
}

//! Deployment configuration.
//!
//! Describes an in-memory deployment: the owner, the stable unit, the fee
//! sink and one entry per wrapped asset. Amounts and rates are decimal
//! strings in the JSON file.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::config::WrapperParams;
use crate::error::{Error, Result};
use crate::utils::address::{Address, AssetKey};
use crate::utils::constants::*;
use crate::utils::math::FixedPoint;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SYNTHWRAP_CONFIG";

/// Environment variable overriding the owner address
pub const OWNER_ENV: &str = "SYNTHWRAP_OWNER";

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET ENTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// One wrapped asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Synth key, e.g. `sETH`
    pub asset_key: AssetKey,
    /// Symbol of the collateral token, e.g. `WETH`
    pub collateral: String,
    /// Maximum collateral reserve
    pub ceiling: FixedPoint,
    /// Mint fee fraction
    pub mint_fee_rate: FixedPoint,
    /// Burn fee fraction
    pub burn_fee_rate: FixedPoint,
    /// Initial oracle rate in the stable unit
    pub rate: FixedPoint,
}

impl AssetConfig {
    /// Wrapper parameters of this entry
    pub fn params(&self) -> WrapperParams {
        WrapperParams::with_ceiling(self.ceiling).with_fees(self.mint_fee_rate, self.burn_fee_rate)
    }

    /// Identifier of the collateral token
    pub fn collateral_address(&self) -> Address {
        Address::derive(&self.collateral)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEPLOYMENT CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Deployment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Owner of every wrapper
    pub owner: Address,
    /// Unit fees are distributed in
    pub stable_unit: AssetKey,
    /// Fee sink receiving account
    pub fee_sink: Address,
    /// Wrapped assets
    pub assets: Vec<AssetConfig>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            owner: Address::derive("owner"),
            stable_unit: AssetKey::stable(),
            fee_sink: Address::derive("fee-pool"),
            assets: vec![AssetConfig {
                asset_key: AssetKey::from_static("sETH"),
                collateral: "WETH".to_string(),
                ceiling: FixedPoint::from_integer(1_000),
                mint_fee_rate: FixedPoint::from_bps(DEFAULT_MINT_FEE_BPS),
                burn_fee_rate: FixedPoint::from_bps(DEFAULT_BURN_FEE_BPS),
                rate: FixedPoint::from_integer(2_000),
            }],
        }
    }
}

impl DeploymentConfig {
    /// Load from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&content).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::Config(e.to_string()))?;
            }
        }

        std::fs::write(path, content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the file named by `SYNTHWRAP_CONFIG` (or the default) and
    /// apply the `SYNTHWRAP_OWNER` override
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(&PathBuf::from(path))?,
            Err(_) => Self::default(),
        };

        if let Ok(owner) = std::env::var(OWNER_ENV) {
            config.owner = owner
                .parse()
                .map_err(|e| Error::Config(format!("{}: {}", OWNER_ENV, e)))?;
        }

        Ok(config)
    }

    /// Entry for `key`
    pub fn asset(&self, key: &AssetKey) -> Option<&AssetConfig> {
        self.assets.iter().find(|a| &a.asset_key == key)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.owner.is_zero() {
            return Err(Error::Config("owner cannot be the zero address".into()));
        }

        if self.fee_sink.is_zero() {
            return Err(Error::Config("fee sink cannot be the zero address".into()));
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.asset_key == self.stable_unit {
                return Err(Error::Config(format!(
                    "{} is the stable unit and cannot be wrapped",
                    asset.asset_key
                )));
            }
            if !seen.insert(&asset.asset_key) {
                return Err(Error::Config(format!("duplicate asset {}", asset.asset_key)));
            }
            if asset.collateral.is_empty() {
                return Err(Error::Config(format!("{} has no collateral symbol", asset.asset_key)));
            }
            if asset.rate.is_zero() {
                return Err(Error::Config(format!("{} has a zero rate", asset.asset_key)));
            }
            asset.params().validate()?;
        }

        Ok(())
    }
}

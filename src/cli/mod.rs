//! synthwrap command line support.
//!
//! Builds an in-memory deployment from a [`DeploymentConfig`] and runs
//! scripted scenarios against it.

pub mod config;
pub mod scenario;

pub use config::*;
pub use scenario::*;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::config::StaticConfig;
use crate::core::factory::{CollateralRef, SharedCollaborators, SharedWrapper, WrapperFactory};
use crate::core::fees::FeePool;
use crate::core::token::TokenLedger;
use crate::core::wrapper::ConversionQuote;
use crate::error::{Error, Result};
use crate::oracle::StaticOracle;
use crate::utils::address::{Address, AssetKey};
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// DEPLOYMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Ledgers of one wrapped asset
#[derive(Debug, Clone)]
pub struct AssetLedgers {
    /// Collateral token ledger
    pub collateral: Arc<TokenLedger>,
    /// Synth ledger
    pub synth: Arc<TokenLedger>,
}

/// In-memory deployment: ledgers, oracle, config, fee pool and factory
#[derive(Debug)]
pub struct Deployment {
    owner: Address,
    stable: Arc<TokenLedger>,
    oracle: Arc<StaticOracle>,
    config: Arc<StaticConfig>,
    fee_pool: Arc<FeePool>,
    assets: HashMap<AssetKey, AssetLedgers>,
    factory: WrapperFactory,
}

impl Deployment {
    /// Build a deployment and create one wrapper per configured asset
    pub fn from_config(config: &DeploymentConfig) -> Result<Self> {
        config.validate()?;

        let stable = Arc::new(TokenLedger::new(config.stable_unit.as_str()));
        let oracle = Arc::new(StaticOracle::new(config.stable_unit.clone()));
        let params = Arc::new(StaticConfig::new());
        let fee_pool = Arc::new(FeePool::new(config.fee_sink));

        let factory = WrapperFactory::new(
            Address::derive("factory"),
            config.owner,
            config.stable_unit.clone(),
            SharedCollaborators {
                stable: stable.clone(),
                oracle: oracle.clone(),
                config: params.clone(),
                fee_sink: fee_pool.clone(),
            },
        );

        let mut assets = HashMap::new();
        for entry in &config.assets {
            oracle.set_rate(entry.asset_key.clone(), entry.rate)?;
            params.set_params(entry.asset_key.clone(), entry.params())?;

            let ledgers = AssetLedgers {
                collateral: Arc::new(TokenLedger::new(entry.collateral.as_str())),
                synth: Arc::new(TokenLedger::new(entry.asset_key.as_str())),
            };
            factory.register_synth(entry.asset_key.clone(), ledgers.synth.clone())?;
            factory.create_instance(
                CollateralRef {
                    address: entry.collateral_address(),
                    token: ledgers.collateral.clone(),
                },
                entry.asset_key.clone(),
            )?;
            assets.insert(entry.asset_key.clone(), ledgers);
        }

        info!(assets = assets.len(), owner = %config.owner, "deployment ready");
        Ok(Self {
            owner: config.owner,
            stable,
            oracle,
            config: params,
            fee_pool,
            assets,
            factory,
        })
    }

    /// Owner of every wrapper
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Stable debt ledger
    pub fn stable(&self) -> &Arc<TokenLedger> {
        &self.stable
    }

    /// Rate source
    pub fn oracle(&self) -> &Arc<StaticOracle> {
        &self.oracle
    }

    /// Parameter source
    pub fn config(&self) -> &Arc<StaticConfig> {
        &self.config
    }

    /// Fee sink
    pub fn fee_pool(&self) -> &Arc<FeePool> {
        &self.fee_pool
    }

    /// Wrapper registry
    pub fn factory(&self) -> &WrapperFactory {
        &self.factory
    }

    /// Ledgers of `key`
    pub fn ledgers(&self, key: &AssetKey) -> Result<&AssetLedgers> {
        self.assets
            .get(key)
            .ok_or_else(|| Error::InstanceNotFound(key.to_string()))
    }

    /// Wrapper of `key`
    pub fn wrapper(&self, key: &AssetKey) -> Result<SharedWrapper> {
        self.factory.instance(key)
    }

    /// Give `account` collateral and approve the wrapper for both tokens
    pub fn fund(&self, account: &Address, key: &AssetKey, amount: FixedPoint) -> Result<()> {
        let ledgers = self.ledgers(key)?;
        let spender = self.factory.instance_address(key);
        ledgers.collateral.mint(account, amount)?;
        ledgers.collateral.approve(account, &spender, FixedPoint::MAX)?;
        ledgers.synth.approve(account, &spender, FixedPoint::MAX)
    }

    /// Preview a mint or burn against the current state without executing it
    ///
    /// Fails with the same pause, capacity and reserve errors the
    /// operation itself would return.
    pub fn quote(&self, key: &AssetKey, side: Side, amount: FixedPoint) -> Result<Quote> {
        let wrapper = self.wrapper(key)?;
        let core = wrapper.lock()?;
        let conversion = match side {
            Side::Mint => core.preview_mint(amount)?,
            Side::Burn => core.preview_burn(amount)?,
        };
        Ok(Quote::new(side, conversion))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUOTES
// ═══════════════════════════════════════════════════════════════════════════════

/// Conversion direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Collateral into synth
    Mint,
    /// Synth into collateral
    Burn,
}

impl std::str::FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mint" => Ok(Side::Mint),
            "burn" => Ok(Side::Burn),
            _ => Err(Error::InvalidParameter {
                name: "side".into(),
                reason: format!("expected mint or burn, got {:?}", s),
            }),
        }
    }
}

/// Expected outcome of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Direction
    pub side: Side,
    /// Requested amount
    pub requested: FixedPoint,
    /// Amount that would be processed
    pub amount_processed: FixedPoint,
    /// Synth received (mint) or collateral returned (burn)
    pub principal: FixedPoint,
    /// Fee escrowed
    pub fee: FixedPoint,
}

impl Quote {
    fn new(side: Side, conversion: ConversionQuote) -> Self {
        Self {
            side,
            requested: conversion.requested,
            amount_processed: conversion.amount_processed,
            principal: conversion.principal,
            fee: conversion.fee,
        }
    }
}

//! Scripted scenarios.
//!
//! A scenario is a JSON list of steps executed in order against a fresh
//! [`Deployment`]. Accounts are named by label and mapped to addresses
//! with [`Address::derive`]. A failing step is recorded with its error
//! code and the run continues.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Deployment, DeploymentConfig};
use crate::core::config::WrapperParams;
use crate::core::state::WrapperState;
use crate::error::{Error, Result};
use crate::utils::address::{Address, AssetKey};
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// STEPS
// ═══════════════════════════════════════════════════════════════════════════════

/// One scripted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Give collateral to an account and approve the wrapper
    Fund {
        /// Account label
        account: String,
        /// Asset whose collateral is funded
        asset: AssetKey,
        /// Collateral amount
        amount: FixedPoint,
    },
    /// Wrap collateral into synth
    Mint {
        /// Account label
        account: String,
        /// Asset to mint
        asset: AssetKey,
        /// Requested collateral
        amount: FixedPoint,
    },
    /// Unwrap synth into collateral
    Burn {
        /// Account label
        account: String,
        /// Asset to burn
        asset: AssetKey,
        /// Requested synth including the fee
        amount: FixedPoint,
    },
    /// Distribute fees of one asset, or of every asset when omitted
    Distribute {
        /// Asset to distribute
        #[serde(default)]
        asset: Option<AssetKey>,
    },
    /// Set an oracle rate
    SetRate {
        /// Asset
        asset: AssetKey,
        /// Rate in the stable unit
        rate: FixedPoint,
    },
    /// Flag or clear an oracle rate
    InvalidateRate {
        /// Asset
        asset: AssetKey,
        /// New flag
        #[serde(default = "default_true")]
        invalid: bool,
    },
    /// Replace the wrapper parameters of an asset
    SetParams {
        /// Asset
        asset: AssetKey,
        /// New parameters
        params: WrapperParams,
    },
    /// Pause or resume a wrapper as the owner
    SetPaused {
        /// Asset
        asset: AssetKey,
        /// New pause state
        paused: bool,
    },
    /// Send value directly to a wrapper
    Send {
        /// Account label
        account: String,
        /// Asset whose wrapper receives the value
        asset: AssetKey,
        /// Amount
        amount: FixedPoint,
    },
}

fn default_true() -> bool {
    true
}

impl Step {
    /// Action name
    pub fn name(&self) -> &'static str {
        match self {
            Step::Fund { .. } => "fund",
            Step::Mint { .. } => "mint",
            Step::Burn { .. } => "burn",
            Step::Distribute { .. } => "distribute",
            Step::SetRate { .. } => "set_rate",
            Step::InvalidateRate { .. } => "invalidate_rate",
            Step::SetParams { .. } => "set_params",
            Step::SetPaused { .. } => "set_paused",
            Step::Send { .. } => "send",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCENARIO
// ═══════════════════════════════════════════════════════════════════════════════

/// Deployment plus the steps to run against it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Deployment to build; the default deployment when omitted
    #[serde(default)]
    pub deployment: Option<DeploymentConfig>,
    /// Steps in execution order
    pub steps: Vec<Step>,
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Position in the scenario
    pub index: usize,
    /// Action name
    pub action: String,
    /// Whether the step succeeded
    pub ok: bool,
    /// Step output on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Error code on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    /// Error message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final state of one wrapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperSummary {
    /// Wrapper address
    pub address: Address,
    /// Counters
    pub state: WrapperState,
    /// Collateral reserve
    pub reserves: FixedPoint,
    /// Remaining capacity
    pub capacity: FixedPoint,
    /// Hex of the state hash
    pub state_hash: String,
}

/// Result of a scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Per-step outcomes
    pub steps: Vec<StepOutcome>,
    /// Final wrapper summaries in asset key order
    pub wrappers: Vec<WrapperSummary>,
    /// Stable units paid to the fee sink
    pub fees_paid: FixedPoint,
}

impl ScenarioReport {
    /// Number of failed steps
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

impl Scenario {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Build the deployment and run every step
    pub fn run(&self) -> Result<ScenarioReport> {
        let config = self.deployment.clone().unwrap_or_default();
        let deployment = Deployment::from_config(&config)?;

        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let outcome = match execute(&deployment, step) {
                Ok(output) => StepOutcome {
                    index,
                    action: step.name().to_string(),
                    ok: true,
                    output: Some(output),
                    error_code: None,
                    error: None,
                },
                Err(e) => {
                    debug!(index, action = step.name(), error = %e, "step failed");
                    StepOutcome {
                        index,
                        action: step.name().to_string(),
                        ok: false,
                        output: None,
                        error_code: Some(e.code()),
                        error: Some(e.to_string()),
                    }
                }
            };
            steps.push(outcome);
        }

        let mut wrappers = Vec::new();
        for key in deployment.factory().asset_keys() {
            let wrapper = deployment.wrapper(&key)?;
            let core = wrapper.lock()?;
            core.verify_invariants()?;
            wrappers.push(WrapperSummary {
                address: core.address(),
                state: core.state().clone(),
                reserves: core.get_reserves(),
                capacity: core.capacity(),
                state_hash: core.state().state_hash().to_hex(),
            });
        }

        Ok(ScenarioReport {
            steps,
            wrappers,
            fees_paid: deployment.fee_pool().total_paid(),
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn execute(deployment: &Deployment, step: &Step) -> Result<serde_json::Value> {
    match step {
        Step::Fund { account, asset, amount } => {
            deployment.fund(&Address::derive(account), asset, *amount)?;
            Ok(serde_json::Value::Null)
        }
        Step::Mint { account, asset, amount } => {
            let wrapper = deployment.wrapper(asset)?;
            let receipt = wrapper.lock()?.mint(&Address::derive(account), *amount)?;
            to_json(&receipt)
        }
        Step::Burn { account, asset, amount } => {
            let wrapper = deployment.wrapper(asset)?;
            let receipt = wrapper.lock()?.burn(&Address::derive(account), *amount)?;
            to_json(&receipt)
        }
        Step::Distribute { asset: Some(asset) } => {
            let wrapper = deployment.wrapper(asset)?;
            let distribution = wrapper.lock()?.distribute_fees()?;
            to_json(&distribution)
        }
        Step::Distribute { asset: None } => {
            let distributions = deployment.factory().distribute_all_fees()?;
            to_json(&distributions)
        }
        Step::SetRate { asset, rate } => {
            deployment.oracle().set_rate(asset.clone(), *rate)?;
            Ok(serde_json::Value::Null)
        }
        Step::InvalidateRate { asset, invalid } => {
            deployment.oracle().set_invalid(asset, *invalid)?;
            Ok(serde_json::Value::Null)
        }
        Step::SetParams { asset, params } => {
            deployment.config().set_params(asset.clone(), *params)?;
            Ok(serde_json::Value::Null)
        }
        Step::SetPaused { asset, paused } => {
            let wrapper = deployment.wrapper(asset)?;
            wrapper.lock()?.set_paused(&deployment.owner(), *paused)?;
            Ok(serde_json::Value::Null)
        }
        Step::Send { account, asset, amount } => {
            let wrapper = deployment.wrapper(asset)?;
            wrapper.lock()?.receive(&Address::derive(account), *amount)?;
            Ok(serde_json::Value::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "steps": [
            { "action": "fund", "account": "alice", "asset": "sETH", "amount": "1200" },
            { "action": "mint", "account": "alice", "asset": "sETH", "amount": "1200" },
            { "action": "mint", "account": "alice", "asset": "sETH", "amount": "1" },
            { "action": "burn", "account": "alice", "asset": "sETH", "amount": "100.5" },
            { "action": "send", "account": "alice", "asset": "sETH", "amount": "1" },
            { "action": "distribute" }
        ]
    }"#;

    #[test]
    fn test_scenario_run() {
        let report = Scenario::from_json(SCENARIO).unwrap().run().unwrap();
        assert_eq!(report.steps.len(), 6);

        let mint = report.steps[1].output.as_ref().unwrap();
        assert_eq!(mint["amount_processed"], "1000");
        assert_eq!(mint["fee"], "5");

        // ceiling reached
        assert!(!report.steps[2].ok);
        assert_eq!(report.steps[2].error_code, Some(Error::NoCapacity.code()));

        // direct transfer rejected
        assert_eq!(
            report.steps[4].error_code,
            Some(Error::DirectTransferDisabled.code())
        );
        assert_eq!(report.failures(), 2);

        let summary = &report.wrappers[0];
        assert!(summary.state.fee_escrow.is_zero());
        assert_eq!(summary.reserves, "900".parse().unwrap());
        // escrow 5 + 0.5 at rate 2000
        assert_eq!(report.fees_paid, "11000".parse().unwrap());
    }

    #[test]
    fn test_scenario_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        std::fs::write(&path, SCENARIO).unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.steps.len(), 6);
        assert_eq!(scenario.steps[5], Step::Distribute { asset: None });
        assert!(scenario.deployment.is_none());
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = Scenario::from_json(r#"{ "steps": [ { "action": "liquidate" } ] }"#).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn test_paused_wrapper_in_scenario() {
        let json = r#"{
            "steps": [
                { "action": "fund", "account": "bob", "asset": "sETH", "amount": "10" },
                { "action": "set_paused", "asset": "sETH", "paused": true },
                { "action": "mint", "account": "bob", "asset": "sETH", "amount": "10" },
                { "action": "set_paused", "asset": "sETH", "paused": false },
                { "action": "mint", "account": "bob", "asset": "sETH", "amount": "10" }
            ]
        }"#;
        let report = Scenario::from_json(json).unwrap().run().unwrap();
        assert_eq!(report.steps[2].error_code, Some(Error::Paused.code()));
        assert!(report.steps[4].ok);
    }
}

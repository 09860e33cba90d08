//! Wrapper registry.
//!
//! The factory creates one [`WrapperCore`] per asset key, wires it to the
//! shared stable ledger, oracle, config and fee sink, and hands it out as
//! an `Arc<Mutex<_>>` so concurrent callers are serialized per instance.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{info, warn};

use crate::core::config::ConfigProvider;
use crate::core::fees::FeeSink;
use crate::core::token::{CollateralToken, SynthLedger};
use crate::core::wrapper::{Collaborators, FeeDistribution, WrapperCore};
use crate::error::{Error, Result};
use crate::oracle::PriceOracle;
use crate::protocol::events::{EventLog, EventRecord, WrapperEvent};
use crate::utils::address::{Address, AssetKey, Hash};
use crate::utils::constants::INSTANCE_DOMAIN;

/// A registered wrapper
pub type SharedWrapper = Arc<Mutex<WrapperCore>>;

/// Collateral token together with its identifier
#[derive(Clone)]
pub struct CollateralRef {
    /// Identifier reported as the wrapper's underlying asset
    pub address: Address,
    /// Ledger of the collateral token
    pub token: Arc<dyn CollateralToken>,
}

impl fmt::Debug for CollateralRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollateralRef")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Collaborators every instance of a factory shares
#[derive(Clone)]
pub struct SharedCollaborators {
    /// Stable debt token fees are paid out in
    pub stable: Arc<dyn SynthLedger>,
    /// Rate source
    pub oracle: Arc<dyn PriceOracle>,
    /// Per-asset parameters
    pub config: Arc<dyn ConfigProvider>,
    /// Fee recipient
    pub fee_sink: Arc<dyn FeeSink>,
}

impl fmt::Debug for SharedCollaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCollaborators").finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Registry {
    by_key: BTreeMap<AssetKey, SharedWrapper>,
    by_address: HashMap<Address, AssetKey>,
    synths: HashMap<AssetKey, Arc<dyn SynthLedger>>,
    events: EventLog,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("instances", &self.by_key.keys().collect::<Vec<_>>())
            .field("synths", &self.synths.len())
            .finish()
    }
}

/// Registry creating and tracking one wrapper per asset key
#[derive(Debug)]
pub struct WrapperFactory {
    address: Address,
    owner: Address,
    stable_unit: AssetKey,
    shared: SharedCollaborators,
    registry: RwLock<Registry>,
}

impl WrapperFactory {
    /// Create an empty factory; instances are owned by `owner`
    pub fn new(address: Address, owner: Address, stable_unit: AssetKey, shared: SharedCollaborators) -> Self {
        Self {
            address,
            owner,
            stable_unit,
            shared,
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Factory account
    pub fn address(&self) -> Address {
        self.address
    }

    /// Owner assigned to new instances
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Unit fees are distributed in
    pub fn stable_unit(&self) -> &AssetKey {
        &self.stable_unit
    }

    /// Address an instance for `key` is (or would be) created at
    pub fn instance_address(&self, key: &AssetKey) -> Address {
        let mut data = self.address.as_bytes().to_vec();
        data.extend_from_slice(key.as_str().as_bytes());
        Address::from_hash(&Hash::tagged(INSTANCE_DOMAIN, &data))
    }

    /// Register the synth ledger used by the instance for `key`
    pub fn register_synth(&self, key: AssetKey, ledger: Arc<dyn SynthLedger>) -> Result<()> {
        let mut registry = self.registry.write()?;
        if registry.by_key.contains_key(&key) {
            return Err(Error::InstanceExists(key.to_string()));
        }
        registry.synths.insert(key, ledger);
        Ok(())
    }

    /// Create the wrapper for `asset_key` backed by `collateral`
    pub fn create_instance(&self, collateral: CollateralRef, asset_key: AssetKey) -> Result<Address> {
        let mut registry = self.registry.write()?;
        if registry.by_key.contains_key(&asset_key) {
            return Err(Error::InstanceExists(asset_key.to_string()));
        }
        let synth = registry
            .synths
            .get(&asset_key)
            .cloned()
            .ok_or_else(|| Error::InvalidParameter {
                name: "asset_key".into(),
                reason: format!("no synth ledger registered for {}", asset_key),
            })?;

        let instance = self.instance_address(&asset_key);
        let collaborators = Collaborators {
            collateral: collateral.token,
            synth,
            stable: self.shared.stable.clone(),
            oracle: self.shared.oracle.clone(),
            config: self.shared.config.clone(),
            fee_sink: self.shared.fee_sink.clone(),
        };
        let core = WrapperCore::new(
            instance,
            self.owner,
            collateral.address,
            asset_key.clone(),
            self.stable_unit.clone(),
            collaborators,
        );

        registry.by_address.insert(instance, asset_key.clone());
        registry
            .by_key
            .insert(asset_key.clone(), Arc::new(Mutex::new(core)));
        registry.events.emit(WrapperEvent::InstanceCreated {
            asset_key: asset_key.clone(),
            instance,
        });

        info!(key = %asset_key, instance = %instance, underlying = %collateral.address, "wrapper created");
        Ok(instance)
    }

    /// Wrapper registered for `key`
    pub fn instance(&self, key: &AssetKey) -> Result<SharedWrapper> {
        self.registry
            .read()?
            .by_key
            .get(key)
            .cloned()
            .ok_or_else(|| Error::InstanceNotFound(key.to_string()))
    }

    /// Wrapper registered at `address`
    pub fn instance_at(&self, address: &Address) -> Result<SharedWrapper> {
        let registry = self.registry.read()?;
        registry
            .by_address
            .get(address)
            .and_then(|key| registry.by_key.get(key))
            .cloned()
            .ok_or_else(|| Error::InstanceNotFound(address.to_string()))
    }

    /// Whether `address` belongs to a wrapper created here
    pub fn is_instance(&self, address: &Address) -> bool {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_address
            .contains_key(address)
    }

    /// Registered asset keys in sorted order
    pub fn asset_keys(&self) -> Vec<AssetKey> {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_key
            .keys()
            .cloned()
            .collect()
    }

    /// Number of registered wrappers
    pub fn instance_count(&self) -> usize {
        self.registry.read().unwrap_or_else(|e| e.into_inner()).by_key.len()
    }

    /// Factory event history
    pub fn events(&self) -> Vec<EventRecord> {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .events
            .records()
            .to_vec()
    }

    /// Distribute the fees of every wrapper
    ///
    /// Wrappers whose rate is currently invalid or whose distribution fails
    /// are skipped and logged; the result lists exactly the wrappers that
    /// paid out.
    pub fn distribute_all_fees(&self) -> Result<Vec<(AssetKey, FeeDistribution)>> {
        let instances: Vec<(AssetKey, SharedWrapper)> = self
            .registry
            .read()?
            .by_key
            .iter()
            .map(|(k, w)| (k.clone(), w.clone()))
            .collect();

        let mut distributions = Vec::with_capacity(instances.len());
        for (key, wrapper) in instances {
            let Ok(mut core) = wrapper.lock() else {
                warn!(key = %key, "skipping fee distribution, wrapper lock poisoned");
                continue;
            };
            if core.collaborators().oracle.rate_is_invalid(&key) {
                warn!(key = %key, "skipping fee distribution, rate invalid");
                continue;
            }
            match core.distribute_fees() {
                Ok(distribution) => distributions.push((key, distribution)),
                Err(e) => warn!(key = %key, error = %e, "fee distribution failed"),
            }
        }
        Ok(distributions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{StaticConfig, WrapperParams};
    use crate::core::fees::FeePool;
    use crate::core::token::TokenLedger;
    use crate::oracle::StaticOracle;
    use crate::utils::math::FixedPoint;

    fn key(s: &str) -> AssetKey {
        AssetKey::new(s).unwrap()
    }

    fn fp(s: &str) -> FixedPoint {
        s.parse().unwrap()
    }

    fn setup() -> (WrapperFactory, Arc<StaticOracle>) {
        let oracle = Arc::new(StaticOracle::new(key("sUSD")));
        oracle.set_rate(key("sETH"), fp("2000")).unwrap();
        oracle.set_rate(key("sBTC"), fp("60000")).unwrap();
        let config = Arc::new(StaticConfig::new());
        config
            .set_params(key("sETH"), WrapperParams::with_ceiling(fp("1000")))
            .unwrap();
        config
            .set_params(key("sBTC"), WrapperParams::with_ceiling(fp("10")))
            .unwrap();

        let factory = WrapperFactory::new(
            Address::derive("factory"),
            Address::derive("owner"),
            key("sUSD"),
            SharedCollaborators {
                stable: Arc::new(TokenLedger::new("sUSD")),
                oracle: oracle.clone(),
                config,
                fee_sink: Arc::new(FeePool::new(Address::derive("fee-pool"))),
            },
        );
        factory
            .register_synth(key("sETH"), Arc::new(TokenLedger::new("sETH")))
            .unwrap();
        factory
            .register_synth(key("sBTC"), Arc::new(TokenLedger::new("sBTC")))
            .unwrap();
        (factory, oracle)
    }

    fn collateral(symbol: &str) -> CollateralRef {
        CollateralRef {
            address: Address::derive(symbol),
            token: Arc::new(TokenLedger::new(symbol)),
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let (factory, _) = setup();
        let addr = factory.create_instance(collateral("WETH"), key("sETH")).unwrap();

        assert_eq!(addr, factory.instance_address(&key("sETH")));
        assert!(factory.is_instance(&addr));
        assert!(!factory.is_instance(&Address::derive("stranger")));

        let by_key = factory.instance(&key("sETH")).unwrap();
        let by_addr = factory.instance_at(&addr).unwrap();
        assert!(Arc::ptr_eq(&by_key, &by_addr));

        let core = by_key.lock().unwrap();
        assert_eq!(core.address(), addr);
        assert_eq!(core.owner(), Address::derive("owner"));
        assert_eq!(core.underlying_asset(), Address::derive("WETH"));
        assert_eq!(core.ceiling(), fp("1000"));
    }

    #[test]
    fn test_duplicate_instance_rejected() {
        let (factory, _) = setup();
        factory.create_instance(collateral("WETH"), key("sETH")).unwrap();
        let err = factory
            .create_instance(collateral("WETH"), key("sETH"))
            .unwrap_err();
        assert_eq!(err, Error::InstanceExists("sETH".into()));
        assert_eq!(factory.instance_count(), 1);
    }

    #[test]
    fn test_missing_synth_ledger() {
        let (factory, _) = setup();
        let err = factory
            .create_instance(collateral("WLINK"), key("sLINK"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
        assert!(matches!(
            factory.instance(&key("sLINK")),
            Err(Error::InstanceNotFound(_))
        ));
    }

    #[test]
    fn test_instance_addresses_distinct() {
        let (factory, _) = setup();
        let eth = factory.create_instance(collateral("WETH"), key("sETH")).unwrap();
        let btc = factory.create_instance(collateral("WBTC"), key("sBTC")).unwrap();
        assert_ne!(eth, btc);
        assert_eq!(factory.asset_keys(), vec![key("sBTC"), key("sETH")]);
        assert_eq!(factory.events().len(), 2);
    }

    /// Synth ledger whose burns always fail
    struct FrozenLedger;

    impl SynthLedger for FrozenLedger {
        fn issue(&self, _to: &Address, _amount: FixedPoint) -> Result<()> {
            Ok(())
        }

        fn burn(&self, _from: &Address, _amount: FixedPoint) -> Result<()> {
            Err(Error::AccessDenied("ledger frozen".into()))
        }

        fn balance_of(&self, _owner: &Address) -> FixedPoint {
            FixedPoint::ZERO
        }

        fn allowance(&self, _owner: &Address, _spender: &Address) -> FixedPoint {
            FixedPoint::ZERO
        }

        fn total_supply(&self) -> FixedPoint {
            FixedPoint::ZERO
        }
    }

    #[test]
    fn test_distribute_all_continues_past_failure() {
        let (factory, _) = setup();
        factory
            .register_synth(key("sBTC"), Arc::new(FrozenLedger))
            .unwrap();
        factory.create_instance(collateral("WBTC"), key("sBTC")).unwrap();
        factory.create_instance(collateral("WETH"), key("sETH")).unwrap();

        let btc = factory.instance(&key("sBTC")).unwrap();
        assert!(btc.lock().unwrap().distribute_fees().is_err());

        let distributions = factory.distribute_all_fees().unwrap();
        assert_eq!(distributions.len(), 1);
        assert_eq!(distributions[0].0, key("sETH"));
    }

    #[test]
    fn test_distribute_all_skips_invalid_rate() {
        let (factory, oracle) = setup();
        factory.create_instance(collateral("WETH"), key("sETH")).unwrap();
        factory.create_instance(collateral("WBTC"), key("sBTC")).unwrap();
        oracle.set_invalid(&key("sBTC"), true).unwrap();

        let distributions = factory.distribute_all_fees().unwrap();
        assert_eq!(distributions.len(), 1);
        assert_eq!(distributions[0].0, key("sETH"));
        assert!(distributions[0].1.synth_burned.is_zero());
    }
}

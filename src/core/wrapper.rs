//! Wrapper engine for a single asset pair.
//!
//! A holder of the collateral token mints the pair's synth 1:1 against it
//! (minus a mint fee) and later burns the synth back into collateral
//! (minus a burn fee). Fees accumulate as synth held by the wrapper and
//! are periodically converted into the stable debt token and paid to the
//! fee sink.
//!
//! # Accounting
//!
//! - `synth_debt` grows by the full processed collateral on mint and
//!   shrinks by the principal on burn and by the escrow on distribution
//! - `fee_escrow` grows by every mint and burn fee and resets on distribution
//! - `stable_debt_issued` grows by the stable value of every distribution
//! - the collateral reserve is the live collateral balance of the wrapper
//!
//! # Atomicity
//!
//! Every mutating operation runs its checks first, then performs the
//! collaborator effects through an effect journal, then installs the new
//! counters. If an effect fails, the effects already applied are reversed
//! and the counters are left as they were.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::core::config::ConfigProvider;
use crate::core::fees::FeeSink;
use crate::core::state::WrapperState;
use crate::core::token::{CollateralToken, SynthLedger};
use crate::error::{Error, Result};
use crate::oracle::PriceOracle;
use crate::protocol::events::{ConversionEvent, EventLog, FeesDistributedEvent, WrapperEvent};
use crate::utils::address::{Address, AssetKey};
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Typed references to everything the wrapper talks to
#[derive(Clone)]
pub struct Collaborators {
    /// Collateral held as reserve
    pub collateral: Arc<dyn CollateralToken>,
    /// The pair's synth
    pub synth: Arc<dyn SynthLedger>,
    /// The stable debt token fees are paid out in
    pub stable: Arc<dyn SynthLedger>,
    /// Rate source for fee conversion and debt valuation
    pub oracle: Arc<dyn PriceOracle>,
    /// Per-asset ceiling and fee rates
    pub config: Arc<dyn ConfigProvider>,
    /// Recipient of distributed fees
    pub fee_sink: Arc<dyn FeeSink>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECEIPTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Amounts a mint or burn would move, before caller balance checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionQuote {
    /// Amount the caller asked for
    pub requested: FixedPoint,
    /// Synth received (mint) or collateral returned (burn)
    pub principal: FixedPoint,
    /// Fee moved into escrow
    pub fee: FixedPoint,
    /// Collateral consumed (mint) or synth burned from the caller (burn)
    pub amount_processed: FixedPoint,
}

impl ConversionQuote {
    /// Whether less than the requested amount would be processed
    pub fn is_partial(&self) -> bool {
        self.amount_processed < self.requested
    }

    fn into_receipt(self, account: Address) -> ConversionReceipt {
        ConversionReceipt {
            account,
            requested: self.requested,
            principal: self.principal,
            fee: self.fee,
            amount_processed: self.amount_processed,
        }
    }
}

/// Outcome of a mint or burn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReceipt {
    /// Caller whose balances moved
    pub account: Address,
    /// Amount the caller asked for
    pub requested: FixedPoint,
    /// Synth received (mint) or collateral returned (burn)
    pub principal: FixedPoint,
    /// Fee moved into escrow
    pub fee: FixedPoint,
    /// Collateral consumed (mint) or synth burned from the caller (burn)
    pub amount_processed: FixedPoint,
}

impl ConversionReceipt {
    /// Whether less than the requested amount was processed
    pub fn is_partial(&self) -> bool {
        self.amount_processed < self.requested
    }
}

/// Receipt returned by [`WrapperCore::mint`]
pub type MintReceipt = ConversionReceipt;

/// Receipt returned by [`WrapperCore::burn`]
pub type BurnReceipt = ConversionReceipt;

/// Outcome of a fee distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDistribution {
    /// Synth burned out of escrow
    pub synth_burned: FixedPoint,
    /// Stable units issued to the fee sink
    pub stable_issued: FixedPoint,
    /// Fee sink receiving account
    pub recipient: Address,
}

// ═══════════════════════════════════════════════════════════════════════════════
// WRAPPER CORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Accounting engine of one collateral/synth pair
#[derive(Debug)]
pub struct WrapperCore {
    address: Address,
    owner: Address,
    underlying: Address,
    stable_unit: AssetKey,
    paused: bool,
    collaborators: Collaborators,
    state: WrapperState,
    events: EventLog,
}

impl WrapperCore {
    /// Create a wrapper with all counters zero
    ///
    /// `address` is the wrapper's own account on every ledger, `underlying`
    /// identifies the collateral token.
    pub fn new(
        address: Address,
        owner: Address,
        underlying: Address,
        asset_key: AssetKey,
        stable_unit: AssetKey,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            address,
            owner,
            underlying,
            stable_unit,
            paused: false,
            collaborators,
            state: WrapperState::new(asset_key),
            events: EventLog::default(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The wrapper's own account
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current owner
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Identifier of the collateral token
    pub fn underlying_asset(&self) -> Address {
        self.underlying
    }

    /// Key of the synth this wrapper issues
    pub fn asset_key(&self) -> &AssetKey {
        &self.state.asset_key
    }

    /// Unit the fees are distributed in
    pub fn stable_unit(&self) -> &AssetKey {
        &self.stable_unit
    }

    /// Whether mint and burn are suspended
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Accounting counters
    pub fn state(&self) -> &WrapperState {
        &self.state
    }

    /// Synth units issued and not yet retired
    pub fn synth_debt(&self) -> FixedPoint {
        self.state.synth_debt
    }

    /// Stable units issued to date via fee distribution
    pub fn stable_debt_issued(&self) -> FixedPoint {
        self.state.stable_debt_issued
    }

    /// Synth units awaiting distribution
    pub fn fee_escrow(&self) -> FixedPoint {
        self.state.fee_escrow
    }

    /// Event history
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Current collaborator references
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEWS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configured collateral ceiling
    pub fn ceiling(&self) -> FixedPoint {
        self.collaborators.config.ceiling(&self.state.asset_key)
    }

    /// Configured mint fee rate
    pub fn mint_fee_rate(&self) -> FixedPoint {
        self.collaborators.config.mint_fee_rate(&self.state.asset_key)
    }

    /// Configured burn fee rate
    pub fn burn_fee_rate(&self) -> FixedPoint {
        self.collaborators.config.burn_fee_rate(&self.state.asset_key)
    }

    /// Live collateral balance held by the wrapper
    pub fn get_reserves(&self) -> FixedPoint {
        self.collaborators.collateral.balance_of(&self.address)
    }

    /// Collateral headroom before the ceiling: `max(ceiling - reserves, 0)`
    pub fn capacity(&self) -> FixedPoint {
        self.ceiling().saturating_sub(self.get_reserves())
    }

    /// Fee charged for minting against `amount` collateral
    pub fn calculate_mint_fee(&self, amount: FixedPoint) -> Result<FixedPoint> {
        amount.mul_round(self.mint_fee_rate())
    }

    /// Fee charged for releasing `amount` collateral
    pub fn calculate_burn_fee(&self, amount: FixedPoint) -> Result<FixedPoint> {
        amount.mul_round(self.burn_fee_rate())
    }

    /// Synth debt valued in the stable unit plus stable debt already issued
    pub fn total_issued_synths(&self) -> Result<FixedPoint> {
        let valued = self.collaborators.oracle.effective_value(
            &self.state.asset_key,
            self.state.synth_debt,
            &self.stable_unit,
        )?;
        valued.try_add(self.state.stable_debt_issued)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MINT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Working pair of a mint of `requested` collateral
    ///
    /// Fails like [`WrapperCore::mint`] when paused or at zero capacity; a
    /// request above the capacity is truncated to it.
    pub fn preview_mint(&self, requested: FixedPoint) -> Result<ConversionQuote> {
        self.ensure_not_paused()?;

        let capacity = self.capacity();
        if capacity.is_zero() {
            return Err(Error::NoCapacity);
        }

        let amount_processed = requested.min(capacity);
        let fee = self.calculate_mint_fee(amount_processed)?;
        Ok(ConversionQuote {
            requested,
            principal: amount_processed.try_sub(fee)?,
            fee,
            amount_processed,
        })
    }

    /// Wrap up to `requested` collateral from `caller` into synth
    ///
    /// A request above the remaining capacity is truncated to the capacity;
    /// the receipt and the `Minted` event carry the amount actually processed.
    pub fn mint(&mut self, caller: &Address, requested: FixedPoint) -> Result<MintReceipt> {
        self.ensure_not_paused()?;

        let collateral = &self.collaborators.collateral;
        let allowance = collateral.allowance(caller, &self.address);
        if allowance < requested {
            return Err(Error::InsufficientAllowance {
                required: requested,
                available: allowance,
            });
        }
        let balance = collateral.balance_of(caller);
        if balance < requested {
            return Err(Error::InsufficientBalance {
                required: requested,
                available: balance,
            });
        }

        let quote = self.preview_mint(requested)?;
        if quote.is_partial() {
            debug!(
                account = %caller,
                requested = %requested,
                processed = %quote.amount_processed,
                "mint truncated to remaining capacity"
            );
        }

        let mut next = self.state.clone();
        next.synth_debt = next.synth_debt.try_add(quote.amount_processed)?;
        next.fee_escrow = next.fee_escrow.try_add(quote.fee)?;

        let wrapper = self.address;
        let account = *caller;
        self.commit(next, |j| {
            j.pull_collateral(&account, quote.amount_processed)?;
            j.issue_synth(&account, quote.principal)?;
            j.issue_synth(&wrapper, quote.fee)
        })?;

        info!(
            key = %self.state.asset_key,
            account = %account,
            principal = %quote.principal,
            fee = %quote.fee,
            amount = %quote.amount_processed,
            "minted"
        );
        self.events.emit(WrapperEvent::Minted(ConversionEvent {
            account,
            principal: quote.principal,
            fee: quote.fee,
            amount_processed: quote.amount_processed,
        }));

        Ok(quote.into_receipt(account))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BURN
    // ═══════════════════════════════════════════════════════════════════════════

    /// Working pair of a burn of `requested` synth
    ///
    /// Fails like [`WrapperCore::burn`] when paused or without reserves.
    /// When the implied principal would drain the reserve, the principal is
    /// capped to the reserve and the synth taken is recomputed from it.
    pub fn preview_burn(&self, requested: FixedPoint) -> Result<ConversionQuote> {
        self.ensure_not_paused()?;

        let reserves = self.get_reserves();
        if reserves.is_zero() {
            return Err(Error::NoReserves);
        }

        let one_plus_rate = FixedPoint::ONE.try_add(self.burn_fee_rate())?;
        let uncapped = requested.div_round(one_plus_rate)?;

        let (principal, amount_in) = if uncapped < reserves {
            (uncapped, requested)
        } else {
            (reserves, reserves.try_add(self.calculate_burn_fee(reserves)?)?)
        };
        Ok(ConversionQuote {
            requested,
            principal,
            fee: amount_in.try_sub(principal)?,
            amount_processed: amount_in,
        })
    }

    /// Unwrap `requested` synth from `caller` back into collateral
    ///
    /// `requested` includes the burn fee. Allowance and balance are checked
    /// against the amount left after capping to the reserve.
    pub fn burn(&mut self, caller: &Address, requested: FixedPoint) -> Result<BurnReceipt> {
        let quote = self.preview_burn(requested)?;
        let amount_in = quote.amount_processed;
        if quote.is_partial() {
            debug!(
                account = %caller,
                requested = %requested,
                capped_to = %amount_in,
                "burn capped to available reserves"
            );
        }

        let synth = &self.collaborators.synth;
        let allowance = synth.allowance(caller, &self.address);
        if allowance < amount_in {
            return Err(Error::InsufficientAllowance {
                required: amount_in,
                available: allowance,
            });
        }
        let balance = synth.balance_of(caller);
        if balance < amount_in {
            return Err(Error::InsufficientBalance {
                required: amount_in,
                available: balance,
            });
        }

        let mut next = self.state.clone();
        let unbacked = next.retire_synth_debt(quote.principal);
        if !unbacked.is_zero() {
            warn!(
                key = %self.state.asset_key,
                excess = %unbacked,
                "burn principal exceeds recorded synth debt, clamped to zero"
            );
        }
        next.fee_escrow = next.fee_escrow.try_add(quote.fee)?;

        let wrapper = self.address;
        let account = *caller;
        self.commit(next, |j| {
            j.burn_synth(&account, amount_in)?;
            j.issue_synth(&wrapper, quote.fee)?;
            j.release_collateral(&account, quote.principal)
        })?;

        info!(
            key = %self.state.asset_key,
            account = %account,
            principal = %quote.principal,
            fee = %quote.fee,
            amount = %amount_in,
            "burned"
        );
        self.events.emit(WrapperEvent::Burned(ConversionEvent {
            account,
            principal: quote.principal,
            fee: quote.fee,
            amount_processed: amount_in,
        }));

        Ok(quote.into_receipt(account))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FEE DISTRIBUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Convert the fee escrow into stable units and pay it to the fee sink
    ///
    /// Permissionless and allowed while paused. With an empty escrow every
    /// delta is zero and the call succeeds without changing any counter.
    pub fn distribute_fees(&mut self) -> Result<FeeDistribution> {
        let oracle = &self.collaborators.oracle;
        let key = &self.state.asset_key;
        if oracle.rate_is_invalid(key) {
            return Err(Error::InvalidRate(key.to_string()));
        }

        let escrow = self.state.fee_escrow;
        let held = self.collaborators.synth.balance_of(&self.address);
        if held < escrow {
            return Err(Error::InsufficientBalance {
                required: escrow,
                available: held,
            });
        }

        let stable_amount = oracle.effective_value(key, escrow, &self.stable_unit)?;
        let recipient = self.collaborators.fee_sink.designated_address();

        let mut next = self.state.clone();
        let unbacked = next.retire_synth_debt(escrow);
        if !unbacked.is_zero() {
            warn!(
                key = %self.state.asset_key,
                excess = %unbacked,
                "escrow exceeds recorded synth debt, clamped to zero"
            );
        }
        next.stable_debt_issued = next.stable_debt_issued.try_add(stable_amount)?;
        next.fee_escrow = FixedPoint::ZERO;

        let wrapper = self.address;
        self.commit(next, |j| {
            j.burn_synth(&wrapper, escrow)?;
            j.issue_stable(&recipient, stable_amount)?;
            j.record_fee_paid(stable_amount)
        })?;

        if !escrow.is_zero() {
            info!(
                key = %self.state.asset_key,
                synth_burned = %escrow,
                stable_issued = %stable_amount,
                recipient = %recipient,
                "fees distributed"
            );
            self.events.emit(WrapperEvent::FeesDistributed(FeesDistributedEvent {
                synth_burned: escrow,
                stable_issued: stable_amount,
                recipient,
            }));
        }

        Ok(FeeDistribution {
            synth_burned: escrow,
            stable_issued: stable_amount,
            recipient,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BARE TRANSFERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Entry point for unsolicited value sent to the wrapper; always rejected
    pub fn receive(&self, sender: &Address, amount: FixedPoint) -> Result<()> {
        warn!(sender = %sender, amount = %amount, "direct transfer rejected");
        Err(Error::DirectTransferDisabled)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OWNER OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Suspend or resume mint and burn
    pub fn set_paused(&mut self, caller: &Address, paused: bool) -> Result<()> {
        self.ensure_owner(caller)?;
        if self.paused == paused {
            return Ok(());
        }
        self.paused = paused;
        info!(key = %self.state.asset_key, paused, "pause state changed");
        self.events.emit(WrapperEvent::PauseChanged { paused });
        Ok(())
    }

    /// Hand ownership to `new_owner`
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(Error::InvalidParameter {
                name: "new_owner".into(),
                reason: "cannot be the zero address".into(),
            });
        }
        let previous = std::mem::replace(&mut self.owner, new_owner);
        info!(previous = %previous, owner = %new_owner, "ownership transferred");
        self.events.emit(WrapperEvent::OwnerChanged {
            previous,
            owner: new_owner,
        });
        Ok(())
    }

    /// Replace the collaborator references; counters are kept
    pub fn rebind(&mut self, caller: &Address, collaborators: Collaborators) -> Result<()> {
        self.ensure_owner(caller)?;
        self.collaborators = collaborators;
        info!(key = %self.state.asset_key, "collaborators rebound");
        self.events.emit(WrapperEvent::CollaboratorsRebound);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INVARIANTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Check the accounting invariants against the live ledgers
    ///
    /// The reserve and the synth supply each cover the synth debt, and the
    /// wrapper holds at least the escrowed fee.
    pub fn verify_invariants(&self) -> Result<()> {
        let debt = self.state.synth_debt;
        let reserves = self.get_reserves();
        if reserves < debt {
            return Err(Error::InvariantViolation(format!(
                "reserves {} below synth debt {}",
                reserves, debt
            )));
        }

        let supply = self.collaborators.synth.total_supply();
        if supply < debt {
            return Err(Error::InvariantViolation(format!(
                "synth supply {} below synth debt {}",
                supply, debt
            )));
        }

        let held = self.collaborators.synth.balance_of(&self.address);
        if held < self.state.fee_escrow {
            return Err(Error::InvariantViolation(format!(
                "fee escrow {} exceeds synth held {}",
                self.state.fee_escrow, held
            )));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn ensure_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(Error::Paused);
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::AccessDenied(format!("{} is not the owner", caller)));
        }
        Ok(())
    }

    /// Run `effects` and install `next`; reverse applied effects on failure
    fn commit<F>(&mut self, next: WrapperState, effects: F) -> Result<()>
    where
        F: FnOnce(&mut Journal<'_>) -> Result<()>,
    {
        let mut journal = Journal::new(self.address, &self.collaborators);
        if let Err(e) = effects(&mut journal) {
            warn!(key = %self.state.asset_key, error = %e, "collaborator effect failed, reversing");
            return Err(journal.rollback(&self.state.asset_key, e));
        }
        self.state = next;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EFFECT JOURNAL
// ═══════════════════════════════════════════════════════════════════════════════

/// A ledger effect already applied by the current operation
#[derive(Debug, Clone, Copy)]
enum Effect {
    CollateralPulled { from: Address, amount: FixedPoint },
    CollateralReleased { to: Address, amount: FixedPoint },
    SynthIssued { to: Address, amount: FixedPoint },
    SynthBurned { from: Address, amount: FixedPoint },
    StableIssued { to: Address, amount: FixedPoint },
}

/// Applies collaborator effects for one operation and can reverse them
struct Journal<'a> {
    wrapper: Address,
    collaborators: &'a Collaborators,
    applied: Vec<Effect>,
}

impl<'a> Journal<'a> {
    fn new(wrapper: Address, collaborators: &'a Collaborators) -> Self {
        Self {
            wrapper,
            collaborators,
            applied: Vec::new(),
        }
    }

    fn pull_collateral(&mut self, from: &Address, amount: FixedPoint) -> Result<()> {
        self.collaborators
            .collateral
            .transfer_from(&self.wrapper, from, &self.wrapper, amount)?;
        self.applied.push(Effect::CollateralPulled { from: *from, amount });
        Ok(())
    }

    fn release_collateral(&mut self, to: &Address, amount: FixedPoint) -> Result<()> {
        self.collaborators.collateral.transfer(&self.wrapper, to, amount)?;
        self.applied.push(Effect::CollateralReleased { to: *to, amount });
        Ok(())
    }

    fn issue_synth(&mut self, to: &Address, amount: FixedPoint) -> Result<()> {
        self.collaborators.synth.issue(to, amount)?;
        self.applied.push(Effect::SynthIssued { to: *to, amount });
        Ok(())
    }

    fn burn_synth(&mut self, from: &Address, amount: FixedPoint) -> Result<()> {
        self.collaborators.synth.burn(from, amount)?;
        self.applied.push(Effect::SynthBurned { from: *from, amount });
        Ok(())
    }

    fn issue_stable(&mut self, to: &Address, amount: FixedPoint) -> Result<()> {
        self.collaborators.stable.issue(to, amount)?;
        self.applied.push(Effect::StableIssued { to: *to, amount });
        Ok(())
    }

    /// Notify the fee sink; always the last effect of a distribution
    fn record_fee_paid(&mut self, amount: FixedPoint) -> Result<()> {
        self.collaborators.fee_sink.record_fee_paid(amount)
    }

    /// Reverse every applied effect, newest first, and return the error to report
    fn rollback(self, key: &AssetKey, cause: Error) -> Error {
        let Journal {
            wrapper,
            collaborators: c,
            applied,
        } = self;

        let mut intact = true;
        for effect in applied.into_iter().rev() {
            let reversed = match effect {
                Effect::CollateralPulled { from, amount } => c.collateral.transfer(&wrapper, &from, amount),
                Effect::CollateralReleased { to, amount } => c.collateral.transfer(&to, &wrapper, amount),
                Effect::SynthIssued { to, amount } => c.synth.burn(&to, amount),
                Effect::SynthBurned { from, amount } => c.synth.issue(&from, amount),
                Effect::StableIssued { to, amount } => c.stable.burn(&to, amount),
            };
            if let Err(e) = reversed {
                error!(key = %key, effect = ?effect, error = %e, "failed to reverse ledger effect");
                intact = false;
            }
        }

        if intact {
            cause
        } else {
            Error::InvariantViolation(format!("{} after {}: ledgers left inconsistent", key, cause))
        }
    }
}

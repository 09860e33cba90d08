//! Wrapper events for state change notifications.
//!
//! Every successful mint, burn and fee distribution is recorded so that
//! callers can learn how much was actually processed (a mint above the
//! remaining capacity is silently truncated).

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::address::{Address, AssetKey, Hash};
use crate::utils::constants::MAX_EVENTS;
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All wrapper event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapperEvent {
    /// Collateral wrapped into synth
    Minted(ConversionEvent),
    /// Synth unwrapped back into collateral
    Burned(ConversionEvent),
    /// Escrowed fees converted and paid to the fee sink
    FeesDistributed(FeesDistributedEvent),
    /// Pause flag toggled by the owner
    PauseChanged {
        /// New pause state
        paused: bool,
    },
    /// Ownership moved to a new account
    OwnerChanged {
        /// Previous owner
        previous: Address,
        /// New owner
        owner: Address,
    },
    /// Collaborator references replaced by the owner
    CollaboratorsRebound,
    /// Wrapper registered by the factory
    InstanceCreated {
        /// Asset key of the new wrapper
        asset_key: AssetKey,
        /// Address of the new wrapper
        instance: Address,
    },
}

impl WrapperEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Minted(_) => "Minted",
            Self::Burned(_) => "Burned",
            Self::FeesDistributed(_) => "FeesDistributed",
            Self::PauseChanged { .. } => "PauseChanged",
            Self::OwnerChanged { .. } => "OwnerChanged",
            Self::CollaboratorsRebound => "CollaboratorsRebound",
            Self::InstanceCreated { .. } => "InstanceCreated",
        }
    }

    /// Compute event hash
    pub fn hash(&self) -> Result<Hash> {
        let data = bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Hash::sha256(&data))
    }
}

/// Payload of a mint or burn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionEvent {
    /// Caller whose balances moved
    pub account: Address,
    /// Amount that became synth (mint) or was returned as collateral (burn)
    pub principal: FixedPoint,
    /// Amount retained as escrowed fee
    pub fee: FixedPoint,
    /// Collateral consumed (mint) or synth burned from the caller (burn)
    pub amount_processed: FixedPoint,
}

/// Payload of a fee distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeesDistributedEvent {
    /// Synth units burned out of escrow
    pub synth_burned: FixedPoint,
    /// Stable units issued to the fee sink
    pub stable_issued: FixedPoint,
    /// Fee sink receiving account
    pub recipient: Address,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// An event with its position and wall-clock time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number within the emitting log
    pub sequence: u64,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
    /// The event
    pub event: WrapperEvent,
}

/// Bounded in-memory event history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_sequence: u64,
    max_events: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(MAX_EVENTS)
    }
}

impl EventLog {
    /// Create a log keeping at most `max_events` records
    pub fn new(max_events: usize) -> Self {
        Self {
            records: Vec::new(),
            next_sequence: 0,
            max_events: max_events.max(1),
        }
    }

    /// Append an event (with pruning)
    pub fn emit(&mut self, event: WrapperEvent) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.records.push(EventRecord {
            sequence,
            timestamp: Utc::now().timestamp(),
            event,
        });

        if self.records.len() > self.max_events {
            self.records.drain(0..self.records.len() - self.max_events);
        }
        sequence
    }

    /// Retained records, oldest first
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Most recent record
    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    /// Records whose mint or burn touched `account`
    pub fn for_account(&self, account: &Address) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|r| match &r.event {
                WrapperEvent::Minted(e) | WrapperEvent::Burned(e) => e.account == *account,
                _ => false,
            })
            .collect()
    }

    /// Total events ever emitted (including pruned ones)
    pub fn total_emitted(&self) -> u64 {
        self.next_sequence
    }
}

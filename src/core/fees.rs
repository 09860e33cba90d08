//! Fee sink receiving distributed wrapper fees.
//!
//! Escrowed synth fees are converted to the stable unit and issued to the
//! sink's designated address; the sink is then told how much it was paid
//! so it can attribute the amount to the current fee period.

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::error::Result;
use crate::utils::address::Address;
use crate::utils::math::FixedPoint;

/// Fee-distribution collaborator
pub trait FeeSink: Send + Sync {
    /// Account that receives issued stable units
    fn designated_address(&self) -> Address;

    /// Record that `amount` stable units were paid in
    fn record_fee_paid(&self, amount: FixedPoint) -> Result<()>;
}

/// Fees recorded during one accounting period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePeriod {
    /// Sequential period identifier
    pub id: u64,
    /// Stable units recorded in this period
    pub fees_to_distribute: FixedPoint,
    /// Number of payments recorded
    pub payments: u64,
}

#[derive(Debug, Default)]
struct Ledger {
    current: FeePeriod,
    closed: Vec<FeePeriod>,
    total_paid: FixedPoint,
}

/// In-memory fee pool with period accounting
#[derive(Debug)]
pub struct FeePool {
    address: Address,
    ledger: RwLock<Ledger>,
}

impl FeePool {
    /// Create a pool receiving at `address`
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ledger: RwLock::new(Ledger::default()),
        }
    }

    /// Cumulative stable units recorded since creation
    pub fn total_paid(&self) -> FixedPoint {
        self.ledger.read().unwrap_or_else(|e| e.into_inner()).total_paid
    }

    /// The open fee period
    pub fn current_period(&self) -> FeePeriod {
        self.ledger.read().unwrap_or_else(|e| e.into_inner()).current
    }

    /// Periods closed so far, oldest first
    pub fn closed_periods(&self) -> Vec<FeePeriod> {
        self.ledger.read().unwrap_or_else(|e| e.into_inner()).closed.clone()
    }

    /// Close the open period and start the next one
    pub fn close_period(&self) -> Result<FeePeriod> {
        let mut ledger = self.ledger.write()?;
        let closed = ledger.current;
        ledger.closed.push(closed);
        ledger.current = FeePeriod {
            id: closed.id + 1,
            ..Default::default()
        };
        tracing::info!(period = closed.id, fees = %closed.fees_to_distribute, "fee period closed");
        Ok(closed)
    }
}

impl FeeSink for FeePool {
    fn designated_address(&self) -> Address {
        self.address
    }

    fn record_fee_paid(&self, amount: FixedPoint) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut ledger = self.ledger.write()?;
        let period_total = ledger.current.fees_to_distribute.try_add(amount)?;
        let total_paid = ledger.total_paid.try_add(amount)?;
        ledger.current.fees_to_distribute = period_total;
        ledger.current.payments += 1;
        ledger.total_paid = total_paid;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fee_paid() {
        let pool = FeePool::new(Address::derive("fee-pool"));
        pool.record_fee_paid(FixedPoint::from_integer(10)).unwrap();
        pool.record_fee_paid(FixedPoint::from_integer(5)).unwrap();

        assert_eq!(pool.total_paid(), FixedPoint::from_integer(15));
        assert_eq!(pool.current_period().payments, 2);
        assert_eq!(pool.designated_address(), Address::derive("fee-pool"));
    }

    #[test]
    fn test_zero_payment_not_counted() {
        let pool = FeePool::new(Address::derive("fee-pool"));
        pool.record_fee_paid(FixedPoint::ZERO).unwrap();
        assert_eq!(pool.current_period().payments, 0);
    }

    #[test]
    fn test_close_period() {
        let pool = FeePool::new(Address::derive("fee-pool"));
        pool.record_fee_paid(FixedPoint::from_integer(3)).unwrap();

        let closed = pool.close_period().unwrap();
        assert_eq!(closed.id, 0);
        assert_eq!(closed.fees_to_distribute, FixedPoint::from_integer(3));

        let current = pool.current_period();
        assert_eq!(current.id, 1);
        assert!(current.fees_to_distribute.is_zero());
        assert_eq!(pool.closed_periods().len(), 1);
        assert_eq!(pool.total_paid(), FixedPoint::from_integer(3));
    }
}

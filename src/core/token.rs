//! Token capabilities consumed by the wrapper.
//!
//! - `CollateralToken`: the external fungible asset backing the reserve
//! - `SynthLedger`: a synth the wrapper has full issuing authority over
//!   (the asset-specific synth and the stable debt token)
//! - `TokenLedger`: in-memory implementation of both, used by the CLI
//!   deployment and the tests

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::math::FixedPoint;

// ═══════════════════════════════════════════════════════════════════════════════
// CAPABILITY TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fungible collateral token held as the wrapper's reserve
pub trait CollateralToken: Send + Sync {
    /// Balance held by `owner`
    fn balance_of(&self, owner: &Address) -> FixedPoint;

    /// Amount `spender` may move out of `owner`'s balance
    fn allowance(&self, owner: &Address, spender: &Address) -> FixedPoint;

    /// Move `amount` from `from` to `to` on behalf of `spender`
    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: FixedPoint,
    ) -> Result<()>;

    /// Move `amount` out of `from`'s own balance
    fn transfer(&self, from: &Address, to: &Address, amount: FixedPoint) -> Result<()>;
}

/// Synth ledger with issuing authority granted to the wrapper
pub trait SynthLedger: Send + Sync {
    /// Create `amount` new units at `to`
    fn issue(&self, to: &Address, amount: FixedPoint) -> Result<()>;

    /// Destroy `amount` units held by `from`
    fn burn(&self, from: &Address, amount: FixedPoint) -> Result<()>;

    /// Balance held by `owner`
    fn balance_of(&self, owner: &Address) -> FixedPoint;

    /// Amount `owner` has authorized `spender` to act on
    fn allowance(&self, owner: &Address, spender: &Address) -> FixedPoint;

    /// Total units in existence
    fn total_supply(&self) -> FixedPoint;
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct Book {
    total_supply: FixedPoint,
    balances: HashMap<Address, FixedPoint>,
    allowances: HashMap<(Address, Address), FixedPoint>,
}

impl Book {
    fn balance(&self, owner: &Address) -> FixedPoint {
        self.balances.get(owner).copied().unwrap_or(FixedPoint::ZERO)
    }

    fn set_balance(&mut self, owner: Address, amount: FixedPoint) {
        if amount.is_zero() {
            self.balances.remove(&owner);
        } else {
            self.balances.insert(owner, amount);
        }
    }

    fn debit(&mut self, from: &Address, amount: FixedPoint) -> Result<()> {
        let available = self.balance(from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(Error::InsufficientBalance {
                required: amount,
                available,
            })?;
        self.set_balance(*from, remaining);
        Ok(())
    }

    fn credit(&mut self, to: &Address, amount: FixedPoint) -> Result<()> {
        let updated = self.balance(to).try_add(amount)?;
        self.set_balance(*to, updated);
        Ok(())
    }
}

/// In-memory fungible token with balances, allowances and issuing
#[derive(Debug)]
pub struct TokenLedger {
    symbol: String,
    book: RwLock<Book>,
}

impl TokenLedger {
    /// Create an empty ledger
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            book: RwLock::new(Book::default()),
        }
    }

    /// Token symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Total units in existence
    pub fn total_supply(&self) -> FixedPoint {
        self.book.read().unwrap_or_else(|e| e.into_inner()).total_supply
    }

    /// Balance held by `owner`
    pub fn balance_of(&self, owner: &Address) -> FixedPoint {
        self.book.read().unwrap_or_else(|e| e.into_inner()).balance(owner)
    }

    /// Amount `spender` may move out of `owner`'s balance
    pub fn allowance(&self, owner: &Address, spender: &Address) -> FixedPoint {
        self.book
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(FixedPoint::ZERO)
    }

    /// Set the allowance of `spender` over `owner`'s balance
    pub fn approve(&self, owner: &Address, spender: &Address, amount: FixedPoint) -> Result<()> {
        let mut book = self.book.write()?;
        if amount.is_zero() {
            book.allowances.remove(&(*owner, *spender));
        } else {
            book.allowances.insert((*owner, *spender), amount);
        }
        Ok(())
    }

    /// Create `amount` new units at `to`
    pub fn mint(&self, to: &Address, amount: FixedPoint) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut book = self.book.write()?;
        let supply = book.total_supply.try_add(amount)?;
        book.credit(to, amount)?;
        book.total_supply = supply;
        Ok(())
    }

    /// Destroy `amount` units held by `from`
    pub fn burn_from(&self, from: &Address, amount: FixedPoint) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut book = self.book.write()?;
        book.debit(from, amount)?;
        book.total_supply = book.total_supply.saturating_sub(amount);
        Ok(())
    }

    /// Move units between accounts
    pub fn transfer(&self, from: &Address, to: &Address, amount: FixedPoint) -> Result<()> {
        if amount.is_zero() || from == to {
            return Ok(());
        }
        let mut book = self.book.write()?;
        book.debit(from, amount)?;
        book.credit(to, amount)
    }

    /// Move units on behalf of `from`, consuming `spender`'s allowance
    pub fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: FixedPoint,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut book = self.book.write()?;
        let key = (*from, *spender);
        let allowed = book.allowances.get(&key).copied().unwrap_or(FixedPoint::ZERO);
        let remaining = allowed
            .checked_sub(amount)
            .ok_or(Error::InsufficientAllowance {
                required: amount,
                available: allowed,
            })?;

        book.debit(from, amount)?;
        book.credit(to, amount)?;

        // An unlimited approval is never drawn down
        if allowed != FixedPoint::MAX {
            if remaining.is_zero() {
                book.allowances.remove(&key);
            } else {
                book.allowances.insert(key, remaining);
            }
        }
        Ok(())
    }

    /// Number of accounts with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.book.read().unwrap_or_else(|e| e.into_inner()).balances.len()
    }

    /// Verify supply invariant (total_supply == sum of all balances)
    pub fn verify_supply_invariant(&self) -> bool {
        let book = self.book.read().unwrap_or_else(|e| e.into_inner());
        let sum = book
            .balances
            .values()
            .try_fold(FixedPoint::ZERO, |acc, b| acc.checked_add(*b));
        sum == Some(book.total_supply)
    }
}

impl CollateralToken for TokenLedger {
    fn balance_of(&self, owner: &Address) -> FixedPoint {
        TokenLedger::balance_of(self, owner)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> FixedPoint {
        TokenLedger::allowance(self, owner, spender)
    }

    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: FixedPoint,
    ) -> Result<()> {
        TokenLedger::transfer_from(self, spender, from, to, amount)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: FixedPoint) -> Result<()> {
        TokenLedger::transfer(self, from, to, amount)
    }
}

impl SynthLedger for TokenLedger {
    fn issue(&self, to: &Address, amount: FixedPoint) -> Result<()> {
        self.mint(to, amount)
    }

    fn burn(&self, from: &Address, amount: FixedPoint) -> Result<()> {
        self.burn_from(from, amount)
    }

    fn balance_of(&self, owner: &Address) -> FixedPoint {
        TokenLedger::balance_of(self, owner)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> FixedPoint {
        TokenLedger::allowance(self, owner, spender)
    }

    fn total_supply(&self) -> FixedPoint {
        TokenLedger::total_supply(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bob() -> Address {
        Address::derive("bob")
    }

    #[test]
    fn test_mint_and_burn() {
        let token = TokenLedger::new("sETH");
        token.mint(&alice(), FixedPoint::from_integer(1000)).unwrap();
        token.burn_from(&alice(), FixedPoint::from_integer(400)).unwrap();

        assert_eq!(token.balance_of(&alice()), FixedPoint::from_integer(600));
        assert_eq!(token.total_supply(), FixedPoint::from_integer(600));
        assert!(token.verify_supply_invariant());
    }

    #[test]
    fn test_burn_insufficient_balance() {
        let token = TokenLedger::new("sETH");
        token.mint(&alice(), FixedPoint::from_integer(100)).unwrap();

        let err = token.burn_from(&alice(), FixedPoint::from_integer(200)).unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
        assert_eq!(token.balance_of(&alice()), FixedPoint::from_integer(100));
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let token = TokenLedger::new("WETH");
        let spender = Address::derive("wrapper");
        token.mint(&alice(), FixedPoint::from_integer(100)).unwrap();
        token.approve(&alice(), &spender, FixedPoint::from_integer(60)).unwrap();

        token
            .transfer_from(&spender, &alice(), &bob(), FixedPoint::from_integer(40))
            .unwrap();
        assert_eq!(token.allowance(&alice(), &spender), FixedPoint::from_integer(20));
        assert_eq!(token.balance_of(&bob()), FixedPoint::from_integer(40));

        let err = token
            .transfer_from(&spender, &alice(), &bob(), FixedPoint::from_integer(30))
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientAllowance { .. }));
    }

    #[test]
    fn test_unlimited_allowance_not_drawn_down() {
        let token = TokenLedger::new("WETH");
        let spender = Address::derive("wrapper");
        token.mint(&alice(), FixedPoint::from_integer(10)).unwrap();
        token.approve(&alice(), &spender, FixedPoint::MAX).unwrap();
        token
            .transfer_from(&spender, &alice(), &bob(), FixedPoint::from_integer(10))
            .unwrap();
        assert_eq!(token.allowance(&alice(), &spender), FixedPoint::MAX);
    }

    #[test]
    fn test_zero_amounts_are_noops() {
        let token = TokenLedger::new("sUSD");
        token.mint(&alice(), FixedPoint::ZERO).unwrap();
        token.burn_from(&alice(), FixedPoint::ZERO).unwrap();
        assert_eq!(token.holder_count(), 0);
        assert_eq!(token.total_supply(), FixedPoint::ZERO);
    }

    #[test]
    fn test_holder_count() {
        let token = TokenLedger::new("sETH");
        token.mint(&alice(), FixedPoint::ONE).unwrap();
        token.mint(&bob(), FixedPoint::ONE).unwrap();
        assert_eq!(token.holder_count(), 2);

        token.transfer(&alice(), &bob(), FixedPoint::ONE).unwrap();
        assert_eq!(token.holder_count(), 1);
        assert!(token.verify_supply_invariant());
    }
}

//! Account - Balance held by one ledger participant
//!
//! Used by the in-memory ledger for farmers and for the insurance pool.
//! - Amounts are fixed-point `Decimal`
//! - Version field for optimistic concurrency
//! - No wall-clock state, so replaying the same transfers yields equal accounts

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A single ledger balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Holder identity (DID)
    pub holder: String,

    /// Spendable balance
    pub balance: Decimal,

    /// Version for optimistic concurrency control
    pub version: u64,
}

impl Account {
    /// Create a new empty account
    pub fn new(holder: String) -> Self {
        Self {
            holder,
            balance: Decimal::ZERO,
            version: 0,
        }
    }

    /// Create an account with initial balance
    pub fn with_balance(holder: String, initial_balance: Decimal) -> Self {
        let mut account = Self::new(holder);
        account.balance = initial_balance;
        account
    }

    /// Add funds
    pub fn credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        self.balance += amount;
        self.touch();
        Ok(())
    }

    /// Remove funds
    pub fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        if self.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                holder: self.holder.clone(),
                required: amount,
                available: self.balance,
            });
        }

        self.balance -= amount;
        self.touch();
        Ok(())
    }

    /// Move funds to another account in one step
    pub fn transfer_to(&mut self, amount: Decimal, recipient: &mut Account) -> Result<(), LedgerError> {
        self.debit(amount)?;
        // debit already rejected non-positive amounts
        recipient.balance += amount;
        recipient.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Account({}, balance={})", self.holder, self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_credit_debit() {
        let mut account = Account::new("did:key:test".to_string());

        account.credit(dec!(100)).unwrap();
        assert_eq!(account.balance, dec!(100));

        account.debit(dec!(30)).unwrap();
        assert_eq!(account.balance, dec!(70));
    }

    #[test]
    fn test_insufficient_balance() {
        let mut account = Account::with_balance("did:key:test".to_string(), dec!(50));

        let result = account.debit(dec!(100));
        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                holder: "did:key:test".to_string(),
                required: dec!(100),
                available: dec!(50),
            })
        );
        assert_eq!(account.balance, dec!(50));
    }

    #[test]
    fn test_rejects_non_positive() {
        let mut account = Account::new("did:key:test".to_string());
        assert_eq!(account.credit(dec!(0)), Err(LedgerError::InvalidAmount));
        assert_eq!(account.debit(dec!(-1)), Err(LedgerError::InvalidAmount));
    }

    #[test]
    fn test_transfer() {
        let mut pool = Account::with_balance("did:key:pool".to_string(), dec!(100));
        let mut farmer = Account::new("did:key:farmer".to_string());

        pool.transfer_to(dec!(75), &mut farmer).unwrap();
        assert_eq!(pool.balance, dec!(25));
        assert_eq!(farmer.balance, dec!(75));
        assert_eq!(pool.version, 1);
        assert_eq!(farmer.version, 1);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let replay = || {
            let mut pool = Account::with_balance("did:key:pool".to_string(), dec!(500));
            let mut farmer = Account::new("did:key:farmer".to_string());
            farmer.credit(dec!(70)).unwrap();
            farmer.transfer_to(dec!(70), &mut pool).unwrap();
            pool.transfer_to(dec!(1000).min(pool.balance), &mut farmer).unwrap();
            (pool, farmer)
        };

        let (pool_a, farmer_a) = replay();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let (pool_b, farmer_b) = replay();
        assert_eq!(pool_a, pool_b);
        assert_eq!(farmer_a, farmer_b);
        assert_eq!(farmer_a.version, 3);
    }
}

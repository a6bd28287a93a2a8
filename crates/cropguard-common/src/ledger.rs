//! Ledger collaborator
//!
//! The settlement engine never moves funds itself. It issues debit and
//! credit instructions against a [`Ledger`] and sequences them around its
//! own state changes. Premiums flow from farmers into the insurance pool,
//! payouts flow from the pool back to farmers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::LedgerError;
use crate::types::account::Account;

/// Funds movement interface consumed by the engine
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Move `amount` from `holder` into the insurance pool
    async fn debit(&self, holder: &str, amount: Decimal) -> Result<(), LedgerError>;

    /// Move `amount` from the insurance pool to `recipient`
    async fn credit(&self, recipient: &str, amount: Decimal) -> Result<(), LedgerError>;

    /// Balance held by `holder`
    async fn balance_of(&self, holder: &str) -> Decimal;

    /// Funds available for payouts
    async fn pool_balance(&self) -> Decimal;
}

/// Ledger kept in process memory
///
/// Suitable for tests and single-node deployments. All transfers run under
/// one mutex, so every instruction is atomic.
pub struct InMemoryLedger {
    pool_holder: String,
    accounts: Mutex<HashMap<String, Account>>,
    halted: AtomicBool,
}

impl InMemoryLedger {
    /// Create an empty ledger whose pool is held by `pool_holder`
    pub fn new(pool_holder: impl Into<String>) -> Self {
        Self {
            pool_holder: pool_holder.into(),
            accounts: Mutex::new(HashMap::new()),
            halted: AtomicBool::new(false),
        }
    }

    /// Identity holding the pool
    pub fn pool_holder(&self) -> &str {
        &self.pool_holder
    }

    /// Mint funds into an account
    pub fn seed(&self, holder: &str, amount: Decimal) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.lock();
        accounts
            .entry(holder.to_string())
            .or_insert_with(|| Account::new(holder.to_string()))
            .credit(amount)
    }

    /// Mint funds into the pool
    pub fn fund_pool(&self, amount: Decimal) -> Result<(), LedgerError> {
        let pool = self.pool_holder.clone();
        self.seed(&pool, amount)
    }

    /// Reject every instruction with `Unavailable` until [`resume`](Self::resume)
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.halted.store(false, Ordering::SeqCst);
    }

    /// Snapshot of one account
    pub fn account(&self, holder: &str) -> Option<Account> {
        self.accounts.lock().get(holder).cloned()
    }

    fn ensure_running(&self) -> Result<(), LedgerError> {
        if self.halted.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("ledger halted".to_string()));
        }
        Ok(())
    }

    fn transfer(&self, from: &str, to: &str, amount: Decimal) -> Result<(), LedgerError> {
        self.ensure_running()?;

        let mut accounts = self.accounts.lock();
        let mut source = accounts
            .remove(from)
            .unwrap_or_else(|| Account::new(from.to_string()));

        if from == to {
            let result = source.debit(amount).and_then(|_| source.credit(amount));
            accounts.insert(from.to_string(), source);
            return result;
        }

        let mut target = accounts
            .remove(to)
            .unwrap_or_else(|| Account::new(to.to_string()));

        let result = source.transfer_to(amount, &mut target);

        accounts.insert(from.to_string(), source);
        accounts.insert(to.to_string(), target);

        if result.is_ok() {
            debug!(from = %from, to = %to, amount = %amount, "Ledger transfer applied");
        }
        result
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn debit(&self, holder: &str, amount: Decimal) -> Result<(), LedgerError> {
        self.transfer(holder, &self.pool_holder, amount)
    }

    async fn credit(&self, recipient: &str, amount: Decimal) -> Result<(), LedgerError> {
        self.transfer(&self.pool_holder, recipient, amount)
    }

    async fn balance_of(&self, holder: &str) -> Decimal {
        self.accounts
            .lock()
            .get(holder)
            .map(|a| a.balance)
            .unwrap_or(Decimal::ZERO)
    }

    async fn pool_balance(&self) -> Decimal {
        self.balance_of(&self.pool_holder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_premium_and_payout_flow() {
        let ledger = InMemoryLedger::new("did:key:pool");
        ledger.seed("did:key:farmer", dec!(100)).unwrap();
        ledger.fund_pool(dec!(5000)).unwrap();

        ledger.debit("did:key:farmer", dec!(70)).await.unwrap();
        assert_eq!(ledger.balance_of("did:key:farmer").await, dec!(30));
        assert_eq!(ledger.pool_balance().await, dec!(5070));

        ledger.credit("did:key:farmer", dec!(1000)).await.unwrap();
        assert_eq!(ledger.balance_of("did:key:farmer").await, dec!(1030));
        assert_eq!(ledger.pool_balance().await, dec!(4070));
    }

    #[tokio::test]
    async fn test_insufficient_pool() {
        let ledger = InMemoryLedger::new("did:key:pool");
        ledger.fund_pool(dec!(10)).unwrap();

        let err = ledger.credit("did:key:farmer", dec!(11)).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                holder: "did:key:pool".to_string(),
                required: dec!(11),
                available: dec!(10),
            }
        );
        assert_eq!(ledger.balance_of("did:key:farmer").await, dec!(0));
    }

    #[tokio::test]
    async fn test_halt_and_resume() {
        let ledger = InMemoryLedger::new("did:key:pool");
        ledger.fund_pool(dec!(10)).unwrap();

        ledger.halt();
        assert!(matches!(
            ledger.credit("did:key:farmer", dec!(1)).await,
            Err(LedgerError::Unavailable(_))
        ));

        ledger.resume();
        ledger.credit("did:key:farmer", dec!(1)).await.unwrap();
        assert_eq!(ledger.account("did:key:farmer").unwrap().version, 1);
    }
}

//! Credit ledger.
//!
//! Balances are created lazily by the first `add`. An `add` on a zero
//! balance sets the balance to the amount; on a positive balance it adds.
//! `deduct` removes exactly one credit and refuses to go below zero.

use std::sync::Arc;

use serde::Serialize;

use bridge_store::{CreditRecord, CreditStore};
use bridge_types::{Identity, Timestamp};

use crate::LedgerError;

/// Balance of one identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreditBalance {
    pub balance: u64,
    pub last_updated: Option<Timestamp>,
}

impl CreditBalance {
    fn zero() -> Self {
        Self {
            balance: 0,
            last_updated: None,
        }
    }
}

impl From<CreditRecord> for CreditBalance {
    fn from(r: CreditRecord) -> Self {
        Self {
            balance: r.credit,
            last_updated: r.timestamp,
        }
    }
}

#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn CreditStore>,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn CreditStore>) -> Self {
        Self { store }
    }

    /// Current balance; an identity that never received credit has zero.
    pub fn get_balance(&self, identity: &Identity) -> Result<CreditBalance, LedgerError> {
        Ok(self
            .store
            .get_credit(identity)?
            .map(CreditBalance::from)
            .unwrap_or_else(CreditBalance::zero))
    }

    /// Credit `amount` to `identity`, stamping the record with `at`.
    pub fn add(
        &self,
        identity: &Identity,
        amount: u64,
        at: Timestamp,
    ) -> Result<CreditBalance, LedgerError> {
        let mut overflow = None;
        let written = self.store.update_credit(identity, &mut |current| {
            let balance = current.map(|r| r.credit).unwrap_or(0);
            let credit = if balance == 0 {
                amount
            } else {
                match balance.checked_add(amount) {
                    Some(sum) => sum,
                    None => {
                        overflow = Some(balance);
                        return None;
                    }
                }
            };
            Some(CreditRecord {
                credit,
                timestamp: Some(at),
            })
        })?;

        match (written, overflow) {
            (Some(record), _) => {
                tracing::info!(identity = %identity, amount, balance = record.credit, "credit added");
                Ok(record.into())
            }
            (None, balance) => Err(LedgerError::Overflow {
                identity: identity.clone(),
                balance: balance.unwrap_or(0),
                amount,
            }),
        }
    }

    /// Remove one credit from `identity`.
    ///
    /// Fails with [`LedgerError::InsufficientCredit`] on a zero balance and
    /// leaves the record untouched.
    pub fn deduct(&self, identity: &Identity, at: Timestamp) -> Result<CreditBalance, LedgerError> {
        let written = self.store.update_credit(identity, &mut |current| {
            let balance = current.map(|r| r.credit).unwrap_or(0);
            let credit = balance.checked_sub(1)?;
            Some(CreditRecord {
                credit,
                timestamp: Some(at),
            })
        })?;

        match written {
            Some(record) => {
                tracing::info!(identity = %identity, balance = record.credit, "credit deducted");
                Ok(record.into())
            }
            None => {
                tracing::warn!(identity = %identity, "deduct refused on zero balance");
                Err(LedgerError::InsufficientCredit {
                    identity: identity.clone(),
                    balance: 0,
                })
            }
        }
    }

    /// Number of identities holding a credit record.
    pub fn account_count(&self) -> Result<u64, LedgerError> {
        Ok(self.store.credit_count()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_nullables::NullCreditStore;

    fn ledger() -> CreditLedger {
        CreditLedger::new(Arc::new(NullCreditStore::new()))
    }

    fn at(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    #[test]
    fn unknown_identity_has_zero_balance() {
        let balance = ledger().get_balance(&Identity::new("nobody")).unwrap();
        assert_eq!(balance.balance, 0);
        assert_eq!(balance.last_updated, None);
    }

    #[test]
    fn first_add_sets_then_adds() {
        let ledger = ledger();
        let x = Identity::new("X");

        assert_eq!(ledger.add(&x, 10, at(1)).unwrap().balance, 10);
        let after = ledger.add(&x, 5, at(2)).unwrap();
        assert_eq!(after.balance, 15);
        assert_eq!(after.last_updated, Some(at(2)));
        assert_eq!(ledger.get_balance(&x).unwrap(), after);
    }

    #[test]
    fn add_on_drained_balance_sets() {
        let ledger = ledger();
        let x = Identity::new("X");
        ledger.add(&x, 1, at(1)).unwrap();
        ledger.deduct(&x, at(2)).unwrap();
        assert_eq!(ledger.add(&x, 7, at(3)).unwrap().balance, 7);
    }

    #[test]
    fn deduct_on_zero_is_refused() {
        let ledger = ledger();
        let y = Identity::new("Y");

        match ledger.deduct(&y, at(1)) {
            Err(LedgerError::InsufficientCredit { identity, balance }) => {
                assert_eq!(identity, y);
                assert_eq!(balance, 0);
            }
            other => panic!("expected InsufficientCredit, got {other:?}"),
        }
        assert_eq!(ledger.get_balance(&y).unwrap().balance, 0);
        assert_eq!(ledger.account_count().unwrap(), 0);
    }

    #[test]
    fn deduct_removes_exactly_one() {
        let ledger = ledger();
        let y = Identity::new("Y");
        ledger.add(&y, 2, at(1)).unwrap();
        assert_eq!(ledger.deduct(&y, at(2)).unwrap().balance, 1);
        assert_eq!(ledger.deduct(&y, at(3)).unwrap().balance, 0);
        assert!(ledger.deduct(&y, at(4)).is_err());
        assert_eq!(ledger.get_balance(&y).unwrap().last_updated, Some(at(3)));
    }

    #[test]
    fn overflow_is_an_error() {
        let ledger = ledger();
        let z = Identity::new("Z");
        ledger.add(&z, u64::MAX, at(1)).unwrap();
        assert!(matches!(
            ledger.add(&z, 1, at(2)),
            Err(LedgerError::Overflow { balance: u64::MAX, amount: 1, .. })
        ));
        assert_eq!(ledger.get_balance(&z).unwrap().balance, u64::MAX);
    }

    #[test]
    fn store_failure_propagates() {
        let store = Arc::new(NullCreditStore::new());
        let ledger = CreditLedger::new(store.clone());
        store.set_failing(true);
        assert!(matches!(
            ledger.get_balance(&Identity::new("X")),
            Err(LedgerError::Store(_))
        ));
    }
}

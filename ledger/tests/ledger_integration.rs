//! Ledger behaviour against the LMDB backend and the rating aggregator
//! against a scripted node.

use std::sync::Arc;
use std::thread;

use bridge_chain::ContractState;
use bridge_ledger::{CreditLedger, LedgerError, RatingAggregator, RatingSummary};
use bridge_nullables::NullChain;
use bridge_store_lmdb::LmdbEnvironment;
use bridge_types::{Identity, Timestamp};

fn lmdb_ledger() -> (tempfile::TempDir, CreditLedger) {
    let dir = tempfile::tempdir().unwrap();
    let env = LmdbEnvironment::open(dir.path(), 8, 1 << 22).unwrap();
    let ledger = CreditLedger::new(Arc::new(env.credit_store()));
    (dir, ledger)
}

#[test]
fn lmdb_add_and_deduct() {
    let (_dir, ledger) = lmdb_ledger();
    let x = Identity::new("did-x");

    assert_eq!(ledger.add(&x, 10, Timestamp::new(1)).unwrap().balance, 10);
    assert_eq!(ledger.add(&x, 5, Timestamp::new(2)).unwrap().balance, 15);
    assert_eq!(ledger.deduct(&x, Timestamp::new(3)).unwrap().balance, 14);

    let y = Identity::new("did-y");
    assert!(matches!(
        ledger.deduct(&y, Timestamp::new(4)),
        Err(LedgerError::InsufficientCredit { .. })
    ));
    assert_eq!(ledger.account_count().unwrap(), 1);
}

#[test]
fn concurrent_deducts_never_underflow() {
    let (_dir, ledger) = lmdb_ledger();
    let id = Identity::new("did-shared");
    ledger.add(&id, 50, Timestamp::new(1)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = ledger.clone();
            let id = id.clone();
            thread::spawn(move || {
                let mut ok = 0u64;
                for _ in 0..10 {
                    if ledger.deduct(&id, Timestamp::new(2)).is_ok() {
                        ok += 1;
                    }
                }
                ok
            })
        })
        .collect();
    let succeeded: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(succeeded, 50);
    assert_eq!(ledger.get_balance(&id).unwrap().balance, 0);
}

#[tokio::test]
async fn aggregator_reads_full_history() {
    let chain = Arc::new(NullChain::new());
    let contract = "QmRating";
    for (user, value, epoch) in [("did1", 4, 1), ("did2", 5, 1), ("did1", 2, 2)] {
        chain.push_state(
            contract,
            ContractState {
                epoch,
                smart_contract_data: format!(
                    r#"{{"rate_asset":{{"user_did":"{user}","rating":{value},"asset_id":"asset-1"}}}}"#
                ),
                ..Default::default()
            },
        );
    }

    let aggregator = RatingAggregator::new(chain.clone(), contract);
    assert_eq!(
        aggregator.rating_for("asset-1").await.unwrap(),
        RatingSummary::Rated {
            average: 3.5,
            user_count: 2
        }
    );
    assert_eq!(
        aggregator.rating_for("asset-2").await.unwrap(),
        RatingSummary::NoData
    );

    chain.set_unreachable(true);
    assert!(matches!(
        aggregator.rating_for("asset-1").await,
        Err(LedgerError::Chain(_))
    ));
}

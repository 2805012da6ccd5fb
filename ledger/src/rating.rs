//! Asset rating aggregation over the rating contract's state log.
//!
//! Each snapshot payload may carry
//! `{"rate_asset": {"user_did": .., "rating": 1..=5, "asset_id": ..}}`.
//! Only the highest-epoch submission per submitter counts.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use bridge_chain::{ChainApi, ContractState};

use crate::LedgerError;

/// One valid rating extracted from a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RatingEntry {
    pub user_did: String,
    pub rating: i64,
    pub asset_id: String,
}

#[derive(Deserialize)]
struct RatingPayload {
    rate_asset: RatingEntry,
}

/// Result of aggregating ratings for one asset.
#[derive(Clone, Debug, PartialEq)]
pub enum RatingSummary {
    /// No valid rating exists for the asset.
    NoData,
    /// Average rounded to two decimals, over `user_count` distinct submitters.
    Rated { average: f64, user_count: usize },
}

/// Parse a snapshot payload into a rating entry. Anything that is not a JSON
/// object with a `rate_asset` member yields `None`.
fn parse_entry(payload: &str) -> Option<RatingEntry> {
    if !payload.starts_with('{') {
        return None;
    }
    serde_json::from_str::<RatingPayload>(payload)
        .ok()
        .map(|p| p.rate_asset)
}

/// `total / count` rounded half-up to two decimals. Computed on integers:
/// a tie like 41 / 40 = 1.025 has no exact binary form.
fn average2(total: i64, count: usize) -> f64 {
    let total = i128::from(total);
    let count = count as i128;
    let hundredths = (200 * total + count).div_euclid(2 * count);
    hundredths as f64 / 100.0
}

/// Aggregate ratings for `asset_id` from a full state log.
pub fn aggregate(asset_id: &str, states: &[ContractState]) -> RatingSummary {
    let mut entries = Vec::with_capacity(states.len());

    for state in states {
        match parse_entry(&state.smart_contract_data) {
            Some(entry) => entries.push((entry, state.epoch)),
            None => tracing::debug!(
                block = state.block_no,
                "skipping snapshot without a rating payload"
            ),
        }
    }

    // user_did -> (rating, epoch)
    let mut latest: HashMap<&str, (i64, i64)> = HashMap::new();
    for (entry, epoch) in &entries {
        if entry.asset_id != asset_id || !(1..=5).contains(&entry.rating) {
            continue;
        }
        match latest.get(entry.user_did.as_str()) {
            Some((_, prev_epoch)) if *prev_epoch >= *epoch => {}
            _ => {
                latest.insert(entry.user_did.as_str(), (entry.rating, *epoch));
            }
        }
    }

    if latest.is_empty() {
        return RatingSummary::NoData;
    }

    let total: i64 = latest.values().map(|(rating, _)| rating).sum();
    let user_count = latest.len();
    RatingSummary::Rated {
        average: average2(total, user_count),
        user_count,
    }
}

/// Fetches the rating contract's history and aggregates it.
#[derive(Clone)]
pub struct RatingAggregator {
    chain: Arc<dyn ChainApi>,
    contract: String,
}

impl RatingAggregator {
    pub fn new(chain: Arc<dyn ChainApi>, contract: impl Into<String>) -> Self {
        Self {
            chain,
            contract: contract.into(),
        }
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Ratings for `asset_id`. An unregistered contract means no data.
    pub async fn rating_for(&self, asset_id: &str) -> Result<RatingSummary, LedgerError> {
        let states = self.chain.contract_states(&self.contract, false).await?;
        let summary = aggregate(asset_id, &states);
        tracing::debug!(
            asset_id,
            snapshots = states.len(),
            summary = ?summary,
            "aggregated ratings"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user: &str, asset: &str, value: i64, epoch: i64) -> ContractState {
        ContractState {
            epoch,
            smart_contract_data: format!(
                r#"{{"rate_asset":{{"user_did":"{user}","rating":{value},"asset_id":"{asset}"}}}}"#
            ),
            ..Default::default()
        }
    }

    fn raw(payload: &str) -> ContractState {
        ContractState {
            smart_contract_data: payload.into(),
            ..Default::default()
        }
    }

    #[test]
    fn latest_epoch_per_submitter_wins() {
        let states = vec![rating("did1", "a1", 4, 1), rating("did1", "a1", 2, 2)];
        assert_eq!(
            aggregate("a1", &states),
            RatingSummary::Rated {
                average: 2.0,
                user_count: 1
            }
        );
    }

    #[test]
    fn order_of_log_does_not_matter() {
        let states = vec![rating("did1", "a1", 2, 2), rating("did1", "a1", 4, 1)];
        assert_eq!(
            aggregate("a1", &states),
            RatingSummary::Rated {
                average: 2.0,
                user_count: 1
            }
        );
    }

    #[test]
    fn no_matching_entries_is_no_data() {
        let states = vec![rating("did1", "other", 5, 1)];
        assert_eq!(aggregate("a1", &states), RatingSummary::NoData);
        assert_eq!(aggregate("a1", &[]), RatingSummary::NoData);
    }

    #[test]
    fn out_of_range_and_garbage_are_skipped() {
        let states = vec![
            rating("did1", "a1", 0, 1),
            rating("did2", "a1", 6, 1),
            raw(""),
            raw("not json"),
            raw("{broken"),
            raw(r#"{"other_action":{}}"#),
            rating("did3", "a1", 3, 1),
        ];
        assert_eq!(
            aggregate("a1", &states),
            RatingSummary::Rated {
                average: 3.0,
                user_count: 1
            }
        );
    }

    #[test]
    fn invalid_later_rating_does_not_hide_earlier_valid_one() {
        let states = vec![rating("did1", "a1", 4, 1), rating("did1", "a1", 9, 2)];
        assert_eq!(
            aggregate("a1", &states),
            RatingSummary::Rated {
                average: 4.0,
                user_count: 1
            }
        );
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        let states = vec![
            rating("did1", "a1", 5, 1),
            rating("did2", "a1", 4, 1),
            rating("did3", "a1", 4, 1),
        ];
        // 13 / 3 = 4.333..
        assert_eq!(
            aggregate("a1", &states),
            RatingSummary::Rated {
                average: 4.33,
                user_count: 3
            }
        );

        let states = vec![
            rating("did1", "a1", 1, 1),
            rating("did2", "a1", 2, 1),
            rating("did3", "a1", 2, 1),
        ];
        // 5 / 3 = 1.666..
        assert_eq!(
            aggregate("a1", &states),
            RatingSummary::Rated {
                average: 1.67,
                user_count: 3
            }
        );
    }

    #[test]
    fn exact_ties_round_up() {
        let mut states = vec![rating("did0", "a1", 2, 1)];
        states.extend((1..40).map(|i| rating(&format!("did{i}"), "a1", 1, 1)));
        // 41 / 40 = 1.025
        assert_eq!(
            aggregate("a1", &states),
            RatingSummary::Rated {
                average: 1.03,
                user_count: 40
            }
        );

        let states = vec![
            rating("did1", "a1", 1, 1),
            rating("did2", "a1", 2, 1),
            rating("did3", "a1", 2, 1),
            rating("did4", "a1", 2, 1),
            rating("did5", "a1", 2, 1),
            rating("did6", "a1", 2, 1),
            rating("did7", "a1", 2, 1),
            rating("did8", "a1", 2, 1),
        ];
        // 15 / 8 = 1.875
        assert_eq!(
            aggregate("a1", &states),
            RatingSummary::Rated {
                average: 1.88,
                user_count: 8
            }
        );
    }

    #[test]
    fn equal_epochs_keep_first_seen() {
        let states = vec![rating("did1", "a1", 5, 7), rating("did1", "a1", 1, 7)];
        assert_eq!(
            aggregate("a1", &states),
            RatingSummary::Rated {
                average: 5.0,
                user_count: 1
            }
        );
    }

    proptest::proptest! {
        #[test]
        fn average_stays_within_submitted_range(
            ratings in proptest::collection::vec((0u8..6, 1i64..=5, 0i64..20), 1..40)
        ) {
            let states: Vec<_> = ratings
                .iter()
                .map(|(user, value, epoch)| rating(&format!("did{user}"), "a1", *value, *epoch))
                .collect();
            match aggregate("a1", &states) {
                RatingSummary::Rated { average, user_count } => {
                    proptest::prop_assert!((1.0..=5.0).contains(&average));
                    proptest::prop_assert!(user_count >= 1 && user_count <= 6);
                }
                RatingSummary::NoData => proptest::prop_assert!(false, "valid ratings produced no data"),
            }
        }
    }
}

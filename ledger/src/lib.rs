//! Credit ledger and asset rating aggregation.
//!
//! - [`CreditLedger`]: per-identity balances with add/deduct semantics over a
//!   [`bridge_store::CreditStore`]
//! - [`rating`]: rebuilds the latest rating per submitter from a contract's
//!   state log and averages them

pub mod credit;
pub mod error;
pub mod rating;

pub use credit::{CreditBalance, CreditLedger};
pub use error::LedgerError;
pub use rating::{aggregate, RatingAggregator, RatingEntry, RatingSummary};

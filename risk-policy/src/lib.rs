//! Risk policy for the CBDC rail
//!
//! Pure configuration and evaluation: wallet tier limits, offline purse
//! caps, and device sync-staleness thresholds. Consumed by both the ledger
//! engine and the offline reconciliation engine; holds no state of its own.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod limits;
pub mod offline;

pub use limits::{Tier, TierLimits};
pub use offline::OfflinePolicy;

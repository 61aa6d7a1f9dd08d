//! Burnout-risk detection and deduplicated alerting for small teams.
//!
//! A [`monitor::Monitor`] pass pulls a team roster, fills missing metrics
//! through deterministic synthesis, evaluates each member with
//! [`risk::assess`], and dispatches the alerts that the dedup ledger lets
//! through.

pub mod compose;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod models;
pub mod monitor;
pub mod report;
pub mod risk;
pub mod store;
pub mod synth;

pub use error::{MonitorError, StoreError};
pub use monitor::{Monitor, PassSummary};
pub use risk::assess;

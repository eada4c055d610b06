//! Infrastructure layer: event store backends, the reason ledger, trust tier
//! registry, the assessment engine, read models and configuration.

pub mod config;
pub mod engine;
pub mod event_store;
pub mod ledger;
pub mod projections;
pub mod tiers;

pub use config::AppConfig;
pub use engine::{AssessmentEngine, AssessmentError, CommandMeta};
pub use ledger::{LedgerError, LedgerHistory, ReasonLedger};
pub use tiers::{TierError, TierPolicy, TierRegistry};

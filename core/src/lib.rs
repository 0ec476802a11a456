//! churnguard-core: churn-risk scoring and retention recommendations
//! for B2B customers, computed from a purchase ledger.
//!
//! Ledger → metrics → risk score → product attrition → retention strategy.

pub mod attrition;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod rng;
pub mod scoring;
pub mod store;
pub mod strategy;
pub mod synth;
pub mod types;
pub mod valuation;

pub use config::EngineConfig;
pub use engine::{ChurnEngine, RunOutput, RunSummary};
pub use error::{ChurnError, ChurnResult};
pub use ledger::{Ledger, RawTransaction, Transaction};

//! Cross-crate integration tests.

pub mod capability_scenarios;
pub mod concurrency;
pub mod wallet_flows;

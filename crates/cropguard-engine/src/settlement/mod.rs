//! Settlement
//!
//! - [`trigger`]: pure trigger evaluation
//! - [`coordinator`]: the settle-and-pay protocol
//! - [`admin`]: owner overrides
//! - [`oracle`]: asynchronous request/callback settlement

pub mod admin;
pub mod coordinator;
pub mod oracle;
pub mod trigger;

pub use admin::{AdminOverride, BatchPayoutReport};
pub use coordinator::{SettlementCoordinator, SettlementResult};
pub use oracle::{OracleGateway, PendingRequest};
pub use trigger::{SettlementOutcome, TriggerEvaluator};

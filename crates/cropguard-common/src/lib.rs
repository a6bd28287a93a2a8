//! # CropGuard Common
//!
//! Shared types, errors, and collaborator interfaces for the CropGuard
//! parametric crop-insurance settlement engine.
//!
//! ## Core Types
//!
//! - [`GeoKey`]: Exact fixed-point location key
//! - [`WeatherReading`]: Latest oracle observation for a location
//! - [`Policy`]: Purchased policy with derived expiry
//! - [`Account`]: Ledger balance
//!
//! ## Collaborators
//!
//! - [`Ledger`]: Debit/credit instructions, with [`InMemoryLedger`]
//! - [`Clock`]: Injected time source, with [`SystemClock`] and [`ManualClock`]
//!
//! ## Security
//!
//! - [`security::audit`]: Audit logging

pub mod clock;
pub mod error;
pub mod ledger;
pub mod security;
pub mod types;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    AccessError, CropGuardError, ErrorKind, LedgerError, PolicyError, Result, ValidationError,
    WeatherError,
};
pub use ledger::{InMemoryLedger, Ledger};
pub use types::{
    account::Account,
    geo_key::GeoKey,
    policy::{PayoutRecord, Policy, PolicyId, PolicyStatus, TriggerType},
    weather::WeatherReading,
};

/// CropGuard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Basis-point denominator (10000 = 100%)
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Seconds per day
pub const SECS_PER_DAY: u64 = 24 * 60 * 60;

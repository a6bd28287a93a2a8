//! Error types for the CropGuard settlement engine
//!
//! Provides a unified error type and one closed error enum per concern.
//! Every fallible entry point returns one of these; nothing is signalled by panics.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{geo_key::GeoKey, policy::PolicyId};

/// Result type alias using CropGuardError
pub type Result<T> = std::result::Result<T, CropGuardError>;

/// Unified error type for CropGuard operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CropGuardError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Weather data error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error classification used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller input failed a static range or shape check
    Validation,
    /// Referenced entity does not exist
    NotFound,
    /// Operation is valid but forbidden in the current state
    StateConflict,
    /// Caller lacks the required role
    Authorization,
    /// Ledger could not satisfy the transfer
    Resource,
    /// Data exists but is too old for the operation
    Consistency,
    /// Configuration or internal failure
    Internal,
}

impl CropGuardError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CropGuardError::Validation(_) => ErrorKind::Validation,
            CropGuardError::Policy(PolicyError::NotFound(_)) => ErrorKind::NotFound,
            CropGuardError::Policy(_) => ErrorKind::StateConflict,
            CropGuardError::Weather(WeatherError::DataNotFound(_)) => ErrorKind::NotFound,
            CropGuardError::Weather(WeatherError::StaleData { .. }) => ErrorKind::Consistency,
            CropGuardError::Access(AccessError::Paused) => ErrorKind::StateConflict,
            CropGuardError::Access(_) => ErrorKind::Authorization,
            CropGuardError::Ledger(LedgerError::InvalidAmount) => ErrorKind::Validation,
            CropGuardError::Ledger(_) => ErrorKind::Resource,
            CropGuardError::Config(_) | CropGuardError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Input validation errors, raised before any state mutation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Coverage {provided} outside allowed range [{min}, {max}]")]
    InvalidCoverage {
        provided: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Duration {provided}s outside allowed range [{min}s, {max}s]")]
    InvalidDuration { provided: u64, min: u64, max: u64 },

    #[error("Location out of bounds: lat={lat}, lon={lon}")]
    InvalidLocation { lat: f64, lon: f64 },

    #[error("Invalid weather data: {0}")]
    InvalidWeatherData(String),

    #[error("Crop type must be 1..={max} bytes, got {len}")]
    InvalidCropType { len: usize, max: usize },

    #[error("Amount must be greater than zero")]
    ZeroValue,

    #[error("Payout {requested} exceeds policy coverage {coverage}")]
    ExceedsCoverage { requested: Decimal, coverage: Decimal },
}

/// Policy lookup and state errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Policy not found: {0}")]
    NotFound(PolicyId),

    #[error("Policy {0} has already been claimed")]
    AlreadyClaimed(PolicyId),

    #[error("Policy {0} is not active")]
    NotActive(PolicyId),

    #[error("Policy {id} expired at {end_time}")]
    Expired { id: PolicyId, end_time: i64 },
}

/// Weather store errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WeatherError {
    #[error("No weather data available for {0}")]
    DataNotFound(GeoKey),

    #[error("Weather data for {key} is stale: age {age}s > max {max_age}s")]
    StaleData { key: GeoKey, age: u64, max_age: u64 },
}

/// Role and gate errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccessError {
    #[error("Caller {caller} is not authorized for this operation")]
    Unauthorized { caller: String },

    #[error("Caller {caller} is not an authorized weather oracle")]
    UnauthorizedOracle { caller: String },

    #[error("Engine is paused")]
    Paused,
}

/// Errors reported by a ledger collaborator
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient balance for {holder}: required {required}, available {available}")]
    InsufficientBalance {
        holder: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for CropGuardError {
    fn from(err: serde_json::Error) -> Self {
        CropGuardError::Config(err.to_string())
    }
}

impl From<std::io::Error> for CropGuardError {
    fn from(err: std::io::Error) -> Self {
        CropGuardError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for CropGuardError {
    fn from(err: anyhow::Error) -> Self {
        CropGuardError::Internal(err.to_string())
    }
}

//! Policy ownership and lifecycle

pub mod registry;

pub use registry::{PolicyRegistry, RegistryStats};

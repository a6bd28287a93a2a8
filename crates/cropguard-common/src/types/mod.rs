//! Core data types for the settlement engine

pub mod account;
pub mod geo_key;
pub mod policy;
pub mod weather;

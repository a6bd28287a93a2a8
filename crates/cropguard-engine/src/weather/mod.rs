//! Weather data held on behalf of oracles

pub mod store;

pub use store::{BatchUpdateReport, WeatherStore};

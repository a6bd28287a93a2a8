//! Weather readings reported by oracles
//!
//! One reading exists per location at a time. A write replaces the prior
//! reading, it never merges with it.

use serde::{Deserialize, Serialize};

/// A single weather observation for one location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Rainfall over the trailing 30 days (mm)
    pub rainfall_30d: u32,
    /// Rainfall over the trailing 24 hours (mm)
    pub rainfall_24h: u32,
    /// Temperature, fixed-point at the configured scale
    pub temperature: i32,
    /// When the store accepted this reading (Unix seconds)
    pub observed_at: i64,
    /// Set by the store once the reading passes validation
    pub valid: bool,
}

impl WeatherReading {
    /// Create an unstamped reading as delivered by a fetcher
    pub fn new(rainfall_30d: u32, rainfall_24h: u32, temperature: i32) -> Self {
        Self {
            rainfall_30d,
            rainfall_24h,
            temperature,
            observed_at: 0,
            valid: false,
        }
    }

    /// 24h rainfall can never exceed the 30-day total
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.rainfall_24h <= self.rainfall_30d
    }

    /// Return a copy stamped as accepted at `now`
    pub fn stamped(mut self, now: i64) -> Self {
        self.observed_at = now;
        self.valid = true;
        self
    }

    /// Seconds elapsed since `observed_at`, saturating at zero
    pub fn age(&self, now: i64) -> u64 {
        now.saturating_sub(self.observed_at).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency() {
        assert!(WeatherReading::new(30, 30, 2500).is_consistent());
        assert!(!WeatherReading::new(30, 50, 2500).is_consistent());
    }

    #[test]
    fn test_stamp_and_age() {
        let reading = WeatherReading::new(80, 5, 2100).stamped(1_000);
        assert!(reading.valid);
        assert_eq!(reading.observed_at, 1_000);
        assert_eq!(reading.age(1_060), 60);
        // Clock skew never yields a negative age
        assert_eq!(reading.age(900), 0);
    }
}

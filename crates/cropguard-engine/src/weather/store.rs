//! Weather reading store
//!
//! Latest reading per location. Writes are oracle-gated and validated;
//! the latest authorized write always wins, with no timestamp comparison.
//! DashMap shard locks serialize concurrent writes to one location while
//! unrelated locations proceed in parallel.

use std::sync::Arc;

use cropguard_common::{
    Clock, CropGuardError, GeoKey, Result, ValidationError, WeatherError, WeatherReading,
};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::access::AccessControl;
use crate::config::WeatherBounds;
use crate::events::{DomainEvent, EventBus};

/// Outcome of a batch write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchUpdateReport {
    /// Locations written, in input order
    pub applied: Vec<GeoKey>,
    /// Input index and reason for each skipped element
    pub rejected: Vec<(usize, ValidationError)>,
}

impl BatchUpdateReport {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Per-location weather store
pub struct WeatherStore {
    readings: DashMap<GeoKey, WeatherReading>,
    bounds: WeatherBounds,
    access: Arc<AccessControl>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
}

impl WeatherStore {
    pub fn new(
        bounds: WeatherBounds,
        access: Arc<AccessControl>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            readings: DashMap::new(),
            bounds,
            access,
            clock,
            events,
        }
    }

    pub fn bounds(&self) -> &WeatherBounds {
        &self.bounds
    }

    /// Store a reading for `key`, replacing any prior one
    ///
    /// Returns the stored reading, stamped with the current time.
    pub fn update(&self, key: GeoKey, reading: WeatherReading, updater: &str) -> Result<WeatherReading> {
        self.access.ensure_oracle(updater)?;
        Ok(self.write(key, reading)?)
    }

    /// Apply several readings from one oracle
    ///
    /// Authorization covers the whole batch and is checked first. After that
    /// each element stands alone: invalid readings are skipped and reported,
    /// valid ones are written even if a later element fails.
    pub fn batch_update(
        &self,
        entries: Vec<(GeoKey, WeatherReading)>,
        updater: &str,
    ) -> Result<BatchUpdateReport> {
        self.access.ensure_oracle(updater)?;

        let mut report = BatchUpdateReport::default();
        for (index, (key, reading)) in entries.into_iter().enumerate() {
            match self.write(key, reading) {
                Ok(_) => report.applied.push(key),
                Err(e) => {
                    warn!(index = index, location = %key, error = %e, "Skipping invalid batch reading");
                    report.rejected.push((index, e));
                }
            }
        }

        info!(
            applied = report.applied.len(),
            rejected = report.rejected.len(),
            "Batch weather update applied"
        );
        Ok(report)
    }

    fn write(&self, key: GeoKey, reading: WeatherReading) -> std::result::Result<WeatherReading, ValidationError> {
        self.bounds.validate(&reading)?;

        let stamped = reading.stamped(self.clock.now());
        self.readings.insert(key, stamped);

        debug!(
            location = %key,
            rainfall_30d = stamped.rainfall_30d,
            rainfall_24h = stamped.rainfall_24h,
            temperature = stamped.temperature,
            "Weather reading stored"
        );
        self.events.publish(DomainEvent::WeatherUpdated {
            location: key,
            reading: stamped,
        });
        Ok(stamped)
    }

    /// Latest reading for `key`
    pub fn get(&self, key: &GeoKey) -> Result<WeatherReading> {
        self.readings
            .get(key)
            .map(|r| *r)
            .ok_or_else(|| CropGuardError::from(WeatherError::DataNotFound(*key)))
    }

    /// Seconds since the reading for `key` was stored
    pub fn age(&self, key: &GeoKey) -> Option<u64> {
        let now = self.clock.now();
        self.readings.get(key).map(|r| r.age(now))
    }

    /// Whether a reading exists and is at most `max_age` seconds old
    ///
    /// `max_age == 0` selects the configured default. The boundary is inclusive.
    pub fn is_fresh(&self, key: &GeoKey, max_age: u64) -> bool {
        let limit = self.effective_max_age(max_age);
        self.age(key).map(|age| age <= limit).unwrap_or(false)
    }

    /// Latest reading, provided it passes the freshness check
    pub fn require_fresh(&self, key: &GeoKey, max_age: u64) -> Result<WeatherReading> {
        let limit = self.effective_max_age(max_age);
        let reading = self.get(key)?;
        let age = reading.age(self.clock.now());
        if age > limit {
            return Err(WeatherError::StaleData {
                key: *key,
                age,
                max_age: limit,
            }
            .into());
        }
        Ok(reading)
    }

    fn effective_max_age(&self, max_age: u64) -> u64 {
        if max_age == 0 {
            self.bounds.default_freshness_secs
        } else {
            max_age
        }
    }

    /// Add an oracle (owner only)
    pub fn authorize(&self, caller: &str, identity: &str) -> Result<bool> {
        Ok(self.access.authorize(caller, identity)?)
    }

    /// Remove an oracle (owner only)
    pub fn revoke(&self, caller: &str, identity: &str) -> Result<bool> {
        Ok(self.access.revoke(caller, identity)?)
    }

    /// Number of locations with a reading
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Locations with a reading, sorted
    pub fn locations(&self) -> Vec<GeoKey> {
        let mut keys: Vec<GeoKey> = self.readings.iter().map(|e| *e.key()).collect();
        keys.sort();
        keys
    }
}

//! Engine configuration
//!
//! Every threshold, bound and rate is configuration. Deployments have used
//! different trigger levels for the same crops, so none are baked in.

use std::str::FromStr;

use cropguard_common::{CropGuardError, Result, ValidationError, WeatherReading, SECS_PER_DAY};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Owner identity: administers oracles, pause, and overrides
    pub owner: String,
    /// Ledger identity holding the insurance pool
    pub pool_holder: String,
    pub policy: PolicyLimits,
    pub weather: WeatherBounds,
    pub triggers: TriggerThresholds,
    pub settlement: SettlementSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            owner: "did:key:cropguard-owner".to_string(),
            pool_holder: "did:key:cropguard-pool".to_string(),
            policy: PolicyLimits::default(),
            weather: WeatherBounds::default(),
            triggers: TriggerThresholds::default(),
            settlement: SettlementSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from defaults, an optional JSON file, and the environment
    ///
    /// `CROPGUARD_CONFIG_FILE` names a JSON file whose fields replace the
    /// defaults. `CROPGUARD_*` variables are applied last.
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut cfg = match std::env::var("CROPGUARD_CONFIG_FILE") {
            Ok(path) => Self::from_json_file(&path)?,
            Err(_) => Self::default(),
        };

        env_override("CROPGUARD_OWNER", &mut cfg.owner);
        env_override("CROPGUARD_POOL_HOLDER", &mut cfg.pool_holder);

        // Policy limits
        env_override("CROPGUARD_MIN_COVERAGE", &mut cfg.policy.min_coverage);
        env_override("CROPGUARD_MAX_COVERAGE", &mut cfg.policy.max_coverage);
        env_override("CROPGUARD_MIN_DURATION_SECS", &mut cfg.policy.min_duration_secs);
        env_override("CROPGUARD_MAX_DURATION_SECS", &mut cfg.policy.max_duration_secs);
        env_override("CROPGUARD_BASE_RATE_BPS", &mut cfg.policy.base_rate_bps);

        // Weather bounds
        env_override("CROPGUARD_FRESHNESS_SECS", &mut cfg.weather.default_freshness_secs);

        // Trigger thresholds
        env_override("CROPGUARD_DROUGHT_RAINFALL_30D", &mut cfg.triggers.drought_rainfall_30d);
        env_override("CROPGUARD_FLOOD_RAINFALL_24H", &mut cfg.triggers.flood_rainfall_24h);
        env_override("CROPGUARD_HEATWAVE_TEMPERATURE", &mut cfg.triggers.heatwave_temperature);

        if let Ok(val) = std::env::var("CROPGUARD_SETTLEMENT_MAX_AGE_SECS") {
            if let Ok(v) = val.parse() {
                cfg.settlement.max_data_age_secs = Some(v);
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a JSON configuration file
    pub fn from_json_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CropGuardError::Config(format!("Failed to read config file {}: {}", path, e)))?;
        Self::from_json_str(&content)
    }

    /// Reject internally inconsistent settings
    pub fn validate(&self) -> Result<()> {
        let p = &self.policy;
        if self.owner.is_empty() {
            return Err(config_err("owner must not be empty"));
        }
        if p.min_coverage <= Decimal::ZERO || p.min_coverage > p.max_coverage {
            return Err(config_err("coverage bounds must satisfy 0 < min <= max"));
        }
        if p.min_duration_secs == 0 || p.min_duration_secs > p.max_duration_secs {
            return Err(config_err("duration bounds must satisfy 0 < min <= max"));
        }
        if p.base_rate_bps > cropguard_common::BPS_DENOMINATOR {
            return Err(config_err("base_rate_bps must be at most 10000"));
        }
        if p.max_crop_type_len == 0 {
            return Err(config_err("max_crop_type_len must be positive"));
        }

        let w = &self.weather;
        if w.min_temperature > w.max_temperature {
            return Err(config_err("min_temperature must not exceed max_temperature"));
        }
        if w.temperature_scale <= 0 {
            return Err(config_err("temperature_scale must be positive"));
        }
        if w.default_freshness_secs == 0 {
            return Err(config_err("default_freshness_secs must be positive"));
        }

        let t = &self.triggers;
        for bps in [t.drought_payout_bps, t.flood_payout_bps, t.heatwave_payout_bps] {
            if bps > cropguard_common::BPS_DENOMINATOR {
                return Err(config_err("payout fractions must be at most 10000 bps"));
            }
        }

        Ok(())
    }
}

fn config_err(msg: &str) -> CropGuardError {
    CropGuardError::Config(msg.to_string())
}

fn env_override<T: FromStr>(name: &str, target: &mut T) {
    if let Ok(val) = std::env::var(name) {
        if let Ok(v) = val.parse() {
            *target = v;
        }
    }
}

/// Policy purchase limits and pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyLimits {
    pub min_coverage: Decimal,
    pub max_coverage: Decimal,
    pub min_duration_secs: u64,
    pub max_duration_secs: u64,
    /// Premium rate in basis points of coverage
    pub base_rate_bps: u32,
    pub max_crop_type_len: usize,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            min_coverage: Decimal::from(100),
            max_coverage: Decimal::from(1_000_000),
            min_duration_secs: 7 * SECS_PER_DAY,
            max_duration_secs: 365 * SECS_PER_DAY,
            base_rate_bps: 700,
            max_crop_type_len: 32,
        }
    }
}

/// Accepted ranges for oracle readings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherBounds {
    /// mm
    pub max_rainfall_30d: u32,
    /// mm
    pub max_rainfall_24h: u32,
    /// Scaled by `temperature_scale`
    pub min_temperature: i32,
    /// Scaled by `temperature_scale`
    pub max_temperature: i32,
    /// Fixed-point factor for temperatures (100 = hundredths of a degree)
    pub temperature_scale: i32,
    /// Age limit used by `is_fresh` when the caller passes 0
    pub default_freshness_secs: u64,
}

impl Default for WeatherBounds {
    fn default() -> Self {
        Self {
            max_rainfall_30d: 2_000,
            max_rainfall_24h: 1_000,
            min_temperature: -60 * 100,
            max_temperature: 70 * 100,
            temperature_scale: 100,
            default_freshness_secs: 3_600,
        }
    }
}

impl WeatherBounds {
    /// Check a reading against the range and consistency rules
    pub fn validate(&self, reading: &WeatherReading) -> std::result::Result<(), ValidationError> {
        if !reading.is_consistent() {
            return Err(ValidationError::InvalidWeatherData(format!(
                "rainfall_24h {} exceeds rainfall_30d {}",
                reading.rainfall_24h, reading.rainfall_30d
            )));
        }
        if reading.rainfall_30d > self.max_rainfall_30d {
            return Err(ValidationError::InvalidWeatherData(format!(
                "rainfall_30d {} exceeds max {}",
                reading.rainfall_30d, self.max_rainfall_30d
            )));
        }
        if reading.rainfall_24h > self.max_rainfall_24h {
            return Err(ValidationError::InvalidWeatherData(format!(
                "rainfall_24h {} exceeds max {}",
                reading.rainfall_24h, self.max_rainfall_24h
            )));
        }
        if reading.temperature < self.min_temperature || reading.temperature > self.max_temperature {
            return Err(ValidationError::InvalidWeatherData(format!(
                "temperature {} outside [{}, {}]",
                reading.temperature, self.min_temperature, self.max_temperature
            )));
        }
        Ok(())
    }

    /// Convert whole degrees to the configured fixed-point scale
    pub fn scale_degrees(&self, degrees: i32) -> i32 {
        degrees.saturating_mul(self.temperature_scale)
    }
}

/// Trigger levels and payout fractions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerThresholds {
    /// Drought when 30-day rainfall is strictly below this (mm)
    pub drought_rainfall_30d: u32,
    /// Flood when 24h rainfall is strictly above this (mm)
    pub flood_rainfall_24h: u32,
    /// Heatwave when temperature is strictly above this (scaled)
    pub heatwave_temperature: i32,
    pub drought_payout_bps: u32,
    pub flood_payout_bps: u32,
    pub heatwave_payout_bps: u32,
}

impl Default for TriggerThresholds {
    fn default() -> Self {
        Self {
            drought_rainfall_30d: 50,
            flood_rainfall_24h: 100,
            heatwave_temperature: 38 * 100,
            drought_payout_bps: 10_000,
            flood_payout_bps: 10_000,
            heatwave_payout_bps: 7_500,
        }
    }
}

/// Settlement protocol settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementSettings {
    /// When set, settlement refuses readings older than this
    pub max_data_age_secs: Option<u64>,
}

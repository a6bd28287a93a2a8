//! # CropGuard Engine
//!
//! Parametric crop-insurance settlement. Farmers buy policies tied to a
//! location; authorized oracles publish weather readings; when a reading
//! crosses a drought, flood, or heatwave threshold the policy pays out a
//! fixed fraction of its coverage, exactly once.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     SettlementEngine                       │
//! │                                                            │
//! │  OracleGateway ──► WeatherStore ──► SettlementCoordinator  │
//! │                                        │         │         │
//! │                        TriggerEvaluator┘         ▼         │
//! │  AdminOverride ─────────────────────► PolicyRegistry       │
//! │                                                  │         │
//! │  AccessControl · EventBus · AuditLogger          ▼         │
//! │                                            dyn Ledger      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every settlement path flips the policy to `Claimed` before the ledger
//! credit and rolls it back if the credit fails, all under a per-policy lock.

pub mod access;
pub mod config;
pub mod events;
pub mod policy;
pub mod pricing;
pub mod settlement;
pub mod weather;

use std::sync::Arc;

use cropguard_common::{security::AuditLogger, Clock, Ledger, PolicyId, Result};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::info;

pub use access::AccessControl;
pub use config::EngineConfig;
pub use events::{DomainEvent, EventBus};
pub use policy::{PolicyRegistry, RegistryStats};
pub use settlement::{
    AdminOverride, BatchPayoutReport, OracleGateway, PendingRequest, SettlementCoordinator,
    SettlementOutcome, SettlementResult, TriggerEvaluator,
};
pub use weather::{BatchUpdateReport, WeatherStore};

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// All engine components wired to one ledger, clock, and audit trail
pub struct SettlementEngine {
    config: EngineConfig,
    access: Arc<AccessControl>,
    events: Arc<EventBus>,
    registry: Arc<PolicyRegistry>,
    weather: Arc<WeatherStore>,
    coordinator: Arc<SettlementCoordinator>,
    admin: AdminOverride,
    oracle: OracleGateway,
}

impl SettlementEngine {
    /// Build an engine from a validated configuration
    pub fn new(
        config: EngineConfig,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        audit: Arc<AuditLogger>,
    ) -> Result<Self> {
        config.validate()?;

        let events = Arc::new(EventBus::new());
        let access = Arc::new(AccessControl::new(
            config.owner.clone(),
            audit.clone(),
            events.clone(),
        ));
        let registry = Arc::new(PolicyRegistry::new(
            config.policy.clone(),
            ledger.clone(),
            clock.clone(),
            access.clone(),
            events.clone(),
        ));
        let weather = Arc::new(WeatherStore::new(
            config.weather.clone(),
            access.clone(),
            clock.clone(),
            events.clone(),
        ));
        let coordinator = Arc::new(SettlementCoordinator::new(
            registry.clone(),
            weather.clone(),
            TriggerEvaluator::new(config.triggers.clone()),
            ledger,
            clock.clone(),
            access.clone(),
            events.clone(),
            config.settlement.clone(),
        ));
        let admin = AdminOverride::new(
            coordinator.clone(),
            registry.clone(),
            access.clone(),
            config.weather.clone(),
            clock.clone(),
            events.clone(),
            audit,
        );
        let oracle = OracleGateway::new(
            coordinator.clone(),
            weather.clone(),
            access.clone(),
            clock,
            events.clone(),
        );

        info!(owner = %config.owner, version = ENGINE_VERSION, "Settlement engine ready");

        Ok(Self {
            config,
            access,
            events,
            registry,
            weather,
            coordinator,
            admin,
            oracle,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Buy a policy; see [`PolicyRegistry::create`]
    pub async fn create_policy(
        &self,
        owner: &str,
        crop_type: &str,
        coverage: Decimal,
        duration_secs: u64,
        lat: f64,
        lon: f64,
    ) -> Result<PolicyId> {
        self.registry
            .create(owner, crop_type, coverage, duration_secs, lat, lon)
            .await
    }

    /// Settle a policy; see [`SettlementCoordinator::request_settlement`]
    pub async fn request_settlement(&self, policy_id: PolicyId) -> Result<SettlementResult> {
        self.coordinator.request_settlement(policy_id).await
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn weather(&self) -> &WeatherStore {
        &self.weather
    }

    pub fn coordinator(&self) -> &SettlementCoordinator {
        &self.coordinator
    }

    pub fn admin(&self) -> &AdminOverride {
        &self.admin
    }

    pub fn oracle(&self) -> &OracleGateway {
        &self.oracle
    }

    /// Receive every domain event published from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DomainEvent> {
        self.events.subscribe()
    }
}

//! Domain event stream
//!
//! Every state change the engine commits is published here, in commit
//! order. Observability and presentation layers subscribe instead of
//! polling the stores.

use cropguard_common::{GeoKey, PolicyId, TriggerType, WeatherReading};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Events emitted by the settlement engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    /// Premium collected and policy stored
    PolicyCreated {
        policy_id: PolicyId,
        owner: String,
        coverage: Decimal,
        premium: Decimal,
        location: GeoKey,
        end_time: i64,
    },
    /// Trigger fired and payout transferred
    PolicySettled {
        policy_id: PolicyId,
        trigger: TriggerType,
        payout: Decimal,
    },
    /// Settlement ran but no trigger matched
    SettlementSkipped { policy_id: PolicyId },
    /// Ledger refused the payout; the claim was rolled back
    PayoutFailed {
        policy_id: PolicyId,
        amount: Decimal,
        reason: String,
    },
    /// Owner paid out outside the trigger rules
    EmergencyPayout {
        policy_id: PolicyId,
        amount: Decimal,
        reason: String,
    },
    /// Owner supplied a reading for one policy
    ManualWeatherInjected {
        policy_id: PolicyId,
        reading: WeatherReading,
        reason: String,
    },
    /// Oracle reading accepted into the shared store
    WeatherUpdated {
        location: GeoKey,
        reading: WeatherReading,
    },
    /// Fresh data requested for a policy location
    WeatherRequested {
        request_id: Uuid,
        policy_id: PolicyId,
        location: GeoKey,
    },
    OracleAuthorized { oracle: String },
    OracleRevoked { oracle: String },
    Paused,
    Unpaused,
}

impl DomainEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::PolicyCreated { .. } => "policy_created",
            DomainEvent::PolicySettled { .. } => "policy_settled",
            DomainEvent::SettlementSkipped { .. } => "settlement_skipped",
            DomainEvent::PayoutFailed { .. } => "payout_failed",
            DomainEvent::EmergencyPayout { .. } => "emergency_payout",
            DomainEvent::ManualWeatherInjected { .. } => "manual_weather_injected",
            DomainEvent::WeatherUpdated { .. } => "weather_updated",
            DomainEvent::WeatherRequested { .. } => "weather_requested",
            DomainEvent::OracleAuthorized { .. } => "oracle_authorized",
            DomainEvent::OracleRevoked { .. } => "oracle_revoked",
            DomainEvent::Paused => "paused",
            DomainEvent::Unpaused => "unpaused",
        }
    }

    /// Policy this event concerns, if any
    pub fn policy_id(&self) -> Option<PolicyId> {
        match self {
            DomainEvent::PolicyCreated { policy_id, .. }
            | DomainEvent::PolicySettled { policy_id, .. }
            | DomainEvent::SettlementSkipped { policy_id }
            | DomainEvent::PayoutFailed { policy_id, .. }
            | DomainEvent::EmergencyPayout { policy_id, .. }
            | DomainEvent::ManualWeatherInjected { policy_id, .. }
            | DomainEvent::WeatherRequested { policy_id, .. } => Some(*policy_id),
            _ => None,
        }
    }
}

/// Fan-out of domain events to subscribers
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<mpsc::UnboundedSender<DomainEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber; it sees events published from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DomainEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Publish to all live subscribers, pruning closed ones
    pub fn publish(&self, event: DomainEvent) {
        info!(event = event.name(), policy = ?event.policy_id(), "Domain event");

        let mut subs = self.subscribers.write();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

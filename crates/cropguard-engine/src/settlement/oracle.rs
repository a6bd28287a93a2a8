//! Oracle request/callback flow
//!
//! A settlement can be driven asynchronously: the engine records a pending
//! request for fresh data at a policy's location, an external fetcher picks
//! it up, and its callback writes the reading and settles the policy in one
//! step.

use std::sync::Arc;

use cropguard_common::{Clock, GeoKey, PolicyId, Result, WeatherReading};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::access::AccessControl;
use crate::events::{DomainEvent, EventBus};
use crate::settlement::coordinator::{SettlementCoordinator, SettlementResult};
use crate::weather::WeatherStore;

/// Outstanding request for fresh data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_id: Uuid,
    pub policy_id: PolicyId,
    pub location: GeoKey,
    pub requested_at: i64,
}

pub struct OracleGateway {
    pending: DashMap<Uuid, PendingRequest>,
    coordinator: Arc<SettlementCoordinator>,
    weather: Arc<WeatherStore>,
    access: Arc<AccessControl>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
}

impl OracleGateway {
    pub fn new(
        coordinator: Arc<SettlementCoordinator>,
        weather: Arc<WeatherStore>,
        access: Arc<AccessControl>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            pending: DashMap::new(),
            coordinator,
            weather,
            access,
            clock,
            events,
        }
    }

    /// Ask the fetcher for data at a policy's location
    ///
    /// Fails while paused or if the policy could not be settled anyway.
    /// Requests are only dropped on fulfilment or by `expire_requests`, so
    /// the host must call the latter periodically.
    pub fn request_weather(&self, policy_id: PolicyId) -> Result<Uuid> {
        self.access.ensure_not_paused()?;
        let policy = self.coordinator.claimable(policy_id)?;

        let request = PendingRequest {
            request_id: Uuid::now_v7(),
            policy_id,
            location: policy.location,
            requested_at: self.clock.now(),
        };
        self.pending.insert(request.request_id, request);

        info!(request = %request.request_id, policy = %policy_id, location = %policy.location, "Weather requested");
        self.events.publish(DomainEvent::WeatherRequested {
            request_id: request.request_id,
            policy_id,
            location: policy.location,
        });

        Ok(request.request_id)
    }

    /// Fetcher callback: store the reading, then settle the policy
    ///
    /// Unknown or already fulfilled ids are ignored and yield `Ok(None)`.
    /// The request stays pending unless settlement succeeds, so a callback
    /// rejected while paused or by a failing ledger can be retried.
    #[instrument(skip(self, reading), fields(oracle = %oracle, request = %request_id))]
    pub async fn fulfill(
        &self,
        oracle: &str,
        request_id: Uuid,
        reading: WeatherReading,
    ) -> Result<Option<SettlementResult>> {
        self.access.ensure_not_paused()?;

        let Some((_, request)) = self.pending.remove(&request_id) else {
            debug!("Ignoring callback for unknown request");
            return Ok(None);
        };

        if let Err(e) = self.weather.update(request.location, reading, oracle) {
            self.pending.insert(request_id, request);
            return Err(e);
        }

        match self.coordinator.request_settlement(request.policy_id).await {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                warn!(policy = %request.policy_id, error = %e, "Settlement failed, request kept pending");
                self.pending.insert(request_id, request);
                Err(e)
            }
        }
    }

    /// Outstanding requests, oldest first
    pub fn pending(&self) -> Vec<PendingRequest> {
        let mut requests: Vec<PendingRequest> = self.pending.iter().map(|e| *e.value()).collect();
        requests.sort_by_key(|r| (r.requested_at, r.request_id));
        requests
    }

    /// Drop requests older than `max_age` seconds; returns how many went
    pub fn expire_requests(&self, max_age: u64) -> usize {
        let now = self.clock.now();
        let before = self.pending.len();
        self.pending
            .retain(|_, r| now.saturating_sub(r.requested_at) <= max_age as i64);
        let expired = before.saturating_sub(self.pending.len());
        if expired > 0 {
            info!(expired = expired, "Expired weather requests");
        }
        expired
    }
}

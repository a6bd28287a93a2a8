//! Owner overrides
//!
//! Emergency paths for when the oracle route cannot settle a policy:
//! a direct payout of a chosen amount, or a manual reading evaluated
//! against one policy. Both are owner-only, ignore the pause gate and the
//! freshness rules, and reuse the coordinator's lock/flip/credit/rollback
//! protocol. Every action lands in the audit log.

use std::sync::Arc;

use cropguard_common::{
    security::AuditLogger, Clock, CropGuardError, PolicyId, Result, TriggerType,
    ValidationError, WeatherReading,
};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::access::AccessControl;
use crate::config::WeatherBounds;
use crate::events::{DomainEvent, EventBus};
use crate::policy::PolicyRegistry;
use crate::settlement::coordinator::{SettlementCoordinator, SettlementResult};

/// Outcome of a batch emergency payout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchPayoutReport {
    /// Policies paid and the amount each received
    pub paid: Vec<(PolicyId, Decimal)>,
    /// Policies skipped and why
    pub skipped: Vec<(PolicyId, CropGuardError)>,
}

impl BatchPayoutReport {
    pub fn total_paid(&self) -> Decimal {
        self.paid.iter().map(|(_, amount)| *amount).sum()
    }
}

pub struct AdminOverride {
    coordinator: Arc<SettlementCoordinator>,
    registry: Arc<PolicyRegistry>,
    access: Arc<AccessControl>,
    bounds: WeatherBounds,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
    audit: Arc<AuditLogger>,
    /// Last manual reading per policy
    manual_readings: DashMap<PolicyId, WeatherReading>,
}

impl AdminOverride {
    pub fn new(
        coordinator: Arc<SettlementCoordinator>,
        registry: Arc<PolicyRegistry>,
        access: Arc<AccessControl>,
        bounds: WeatherBounds,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            coordinator,
            registry,
            access,
            bounds,
            clock,
            events,
            audit,
            manual_readings: DashMap::new(),
        }
    }

    /// Pay `amount` to a policy's owner without consulting weather data
    #[instrument(skip(self, reason), fields(caller = %caller, policy = %policy_id))]
    pub async fn emergency_payout(
        &self,
        caller: &str,
        policy_id: PolicyId,
        amount: Decimal,
        reason: &str,
    ) -> Result<SettlementResult> {
        self.access.ensure_owner(caller, "emergency_payout")?;

        let result = self.pay(policy_id, amount, reason).await;
        self.audit_payout(caller, policy_id, amount, reason, &result);
        result
    }

    /// Pay several policies; bad elements are skipped and reported
    ///
    /// A non-owner caller is refused before any element is touched.
    #[instrument(skip(self, entries, reason), fields(caller = %caller, count = entries.len()))]
    pub async fn batch_emergency_payout(
        &self,
        caller: &str,
        entries: Vec<(PolicyId, Decimal)>,
        reason: &str,
    ) -> Result<BatchPayoutReport> {
        self.access.ensure_owner(caller, "batch_emergency_payout")?;

        let mut report = BatchPayoutReport::default();
        for (policy_id, amount) in entries {
            let result = self.pay(policy_id, amount, reason).await;
            self.audit_payout(caller, policy_id, amount, reason, &result);
            match result {
                Ok(_) => report.paid.push((policy_id, amount)),
                Err(e) => {
                    warn!(policy = %policy_id, error = %e, "Skipping emergency payout");
                    report.skipped.push((policy_id, e));
                }
            }
        }

        info!(
            paid = report.paid.len(),
            skipped = report.skipped.len(),
            total = %report.total_paid(),
            "Batch emergency payout finished"
        );
        Ok(report)
    }

    async fn pay(&self, policy_id: PolicyId, amount: Decimal, reason: &str) -> Result<SettlementResult> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::ZeroValue.into());
        }

        let policy = self.registry.get(policy_id)?;
        if amount > policy.coverage {
            return Err(ValidationError::ExceedsCoverage {
                requested: amount,
                coverage: policy.coverage,
            }
            .into());
        }

        let _guard = self.registry.lock(policy_id).await;
        let policy = self.registry.get(policy_id)?;
        self.coordinator
            .commit_payout(&policy, TriggerType::Emergency, amount, Some(reason.to_string()))
            .await?;

        info!(policy = %policy_id, amount = %amount, reason = %reason, "Emergency payout made");
        self.events.publish(DomainEvent::EmergencyPayout {
            policy_id,
            amount,
            reason: reason.to_string(),
        });

        Ok(SettlementResult::Paid {
            trigger: TriggerType::Emergency,
            amount,
        })
    }

    fn audit_payout(
        &self,
        caller: &str,
        policy_id: PolicyId,
        amount: Decimal,
        reason: &str,
        result: &Result<SettlementResult>,
    ) {
        let mut details = vec![
            ("amount", amount.to_string()),
            ("reason", reason.to_string()),
        ];
        if let Err(e) = result {
            details.push(("error", e.to_string()));
        }
        self.audit.log_admin_action(
            caller,
            "emergency_payout",
            &policy_id.to_string(),
            result.is_ok(),
            &details,
        );
    }

    /// Evaluate one policy against an owner-supplied reading
    ///
    /// The reading must pass the range checks but is exempt from freshness.
    /// It is kept against the policy and never enters the shared store.
    #[instrument(skip(self, reading, reason), fields(caller = %caller, policy = %policy_id))]
    pub async fn manual_weather_injection(
        &self,
        caller: &str,
        policy_id: PolicyId,
        reading: WeatherReading,
        reason: &str,
    ) -> Result<SettlementResult> {
        self.access.ensure_owner(caller, "manual_weather_injection")?;

        let result = self.inject(policy_id, reading, reason).await;

        let mut details = vec![
            ("rainfall_30d", reading.rainfall_30d.to_string()),
            ("rainfall_24h", reading.rainfall_24h.to_string()),
            ("temperature", reading.temperature.to_string()),
            ("reason", reason.to_string()),
        ];
        match &result {
            Ok(outcome) => details.push(("payout", outcome.amount().to_string())),
            Err(e) => details.push(("error", e.to_string())),
        }
        self.audit.log_admin_action(
            caller,
            "manual_weather_injection",
            &policy_id.to_string(),
            result.is_ok(),
            &details,
        );

        result
    }

    async fn inject(
        &self,
        policy_id: PolicyId,
        reading: WeatherReading,
        reason: &str,
    ) -> Result<SettlementResult> {
        self.bounds.validate(&reading)?;
        self.registry.get(policy_id)?;

        let stamped = reading.stamped(self.clock.now());
        self.manual_readings.insert(policy_id, stamped);

        info!(policy = %policy_id, reason = %reason, "Manual weather reading injected");
        self.events.publish(DomainEvent::ManualWeatherInjected {
            policy_id,
            reading: stamped,
            reason: reason.to_string(),
        });

        self.coordinator.settle(policy_id, Some(stamped)).await
    }

    /// Last reading injected for a policy
    pub fn manual_reading(&self, policy_id: PolicyId) -> Option<WeatherReading> {
        self.manual_readings.get(&policy_id).map(|r| *r)
    }

    pub fn pause(&self, caller: &str) -> Result<()> {
        Ok(self.access.pause(caller)?)
    }

    pub fn unpause(&self, caller: &str) -> Result<()> {
        Ok(self.access.unpause(caller)?)
    }

    pub fn is_paused(&self) -> bool {
        self.access.is_paused()
    }
}

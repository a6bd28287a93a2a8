//! Settlement coordinator
//!
//! Orchestrates one settlement: data → evaluation → status flip → ledger
//! credit, with rollback when the credit fails. All work on a policy runs
//! under that policy's lock, which is held across the ledger call so two
//! settlements (or a settlement and an emergency payout) never interleave.

use std::sync::Arc;

use cropguard_common::{
    Clock, GeoKey, Ledger, PayoutRecord, Policy, PolicyError, PolicyId, Result, TriggerType,
    WeatherReading,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::access::AccessControl;
use crate::config::SettlementSettings;
use crate::events::{DomainEvent, EventBus};
use crate::policy::PolicyRegistry;
use crate::settlement::trigger::TriggerEvaluator;
use crate::weather::WeatherStore;

/// What a settlement attempt did
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SettlementResult {
    /// No trigger matched; the policy is unchanged
    NoTrigger,
    /// The policy is now claimed and `amount` was credited to its owner
    Paid { trigger: TriggerType, amount: Decimal },
}

impl SettlementResult {
    pub fn is_paid(&self) -> bool {
        matches!(self, SettlementResult::Paid { .. })
    }

    pub fn amount(&self) -> Decimal {
        match self {
            SettlementResult::Paid { amount, .. } => *amount,
            SettlementResult::NoTrigger => Decimal::ZERO,
        }
    }
}

pub struct SettlementCoordinator {
    registry: Arc<PolicyRegistry>,
    weather: Arc<WeatherStore>,
    evaluator: TriggerEvaluator,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    access: Arc<AccessControl>,
    events: Arc<EventBus>,
    settings: SettlementSettings,
}

impl SettlementCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<PolicyRegistry>,
        weather: Arc<WeatherStore>,
        evaluator: TriggerEvaluator,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        access: Arc<AccessControl>,
        events: Arc<EventBus>,
        settings: SettlementSettings,
    ) -> Self {
        Self {
            registry,
            weather,
            evaluator,
            ledger,
            clock,
            access,
            events,
            settings,
        }
    }

    pub fn evaluator(&self) -> &TriggerEvaluator {
        &self.evaluator
    }

    /// Settle a policy against the shared weather store
    #[instrument(skip(self), fields(policy = %policy_id))]
    pub async fn request_settlement(&self, policy_id: PolicyId) -> Result<SettlementResult> {
        self.access.ensure_not_paused()?;
        self.settle(policy_id, None).await
    }

    /// Settle a policy against a reading supplied by an authorized oracle
    ///
    /// The reading passes the same range checks as a store write and is
    /// stamped with the current time, but is not written to the shared store.
    #[instrument(skip(self, reading), fields(caller = %caller, policy = %policy_id))]
    pub async fn settle_with_reading(
        &self,
        caller: &str,
        policy_id: PolicyId,
        reading: WeatherReading,
    ) -> Result<SettlementResult> {
        self.access.ensure_not_paused()?;
        self.access.ensure_oracle(caller)?;
        self.weather.bounds().validate(&reading)?;

        let stamped = reading.stamped(self.clock.now());
        self.settle(policy_id, Some(stamped)).await
    }

    /// Settle several policies one after another
    ///
    /// Each policy is independent; a failure is reported and the sweep moves on.
    pub async fn settle_batch(
        &self,
        policy_ids: &[PolicyId],
    ) -> Vec<(PolicyId, Result<SettlementResult>)> {
        let mut results = Vec::with_capacity(policy_ids.len());
        for &id in policy_ids {
            let result = self.request_settlement(id).await;
            if let Err(e) = &result {
                debug!(policy = %id, error = %e, "Batch settlement skipped policy");
            }
            results.push((id, result));
        }
        results
    }

    /// Settlement without the pause gate
    pub(crate) async fn settle(
        &self,
        policy_id: PolicyId,
        reading: Option<WeatherReading>,
    ) -> Result<SettlementResult> {
        self.registry.get(policy_id)?;
        let _guard = self.registry.lock(policy_id).await;

        let policy = self.claimable(policy_id)?;
        let reading = match reading {
            Some(reading) => reading,
            None => self.reading_for(&policy.location)?,
        };

        let outcome = self.evaluator.evaluate(policy.coverage, &reading);
        if !outcome.is_triggered() || outcome.payout_amount.is_zero() {
            debug!(
                rainfall_30d = reading.rainfall_30d,
                rainfall_24h = reading.rainfall_24h,
                temperature = reading.temperature,
                "No trigger"
            );
            self.events
                .publish(DomainEvent::SettlementSkipped { policy_id });
            return Ok(SettlementResult::NoTrigger);
        }

        self.commit_payout(&policy, outcome.trigger, outcome.payout_amount, None)
            .await?;

        info!(trigger = %outcome.trigger, payout = %outcome.payout_amount, "Policy settled");
        self.events.publish(DomainEvent::PolicySettled {
            policy_id,
            trigger: outcome.trigger,
            payout: outcome.payout_amount,
        });

        Ok(SettlementResult::Paid {
            trigger: outcome.trigger,
            amount: outcome.payout_amount,
        })
    }

    /// Load a policy that may still be paid out
    pub(crate) fn claimable(&self, policy_id: PolicyId) -> Result<Policy> {
        let policy = self.registry.get(policy_id)?;
        if policy.is_claimed() {
            return Err(PolicyError::AlreadyClaimed(policy_id).into());
        }
        if policy.is_expired(self.clock.now()) {
            return Err(PolicyError::Expired {
                id: policy_id,
                end_time: policy.end_time,
            }
            .into());
        }
        Ok(policy)
    }

    fn reading_for(&self, location: &GeoKey) -> Result<WeatherReading> {
        match self.settings.max_data_age_secs {
            Some(max_age) => self.weather.require_fresh(location, max_age),
            None => self.weather.get(location),
        }
    }

    /// Flip to `Claimed`, credit the owner, roll back if the credit fails
    ///
    /// Caller must hold the policy lock.
    pub(crate) async fn commit_payout(
        &self,
        policy: &Policy,
        trigger: TriggerType,
        amount: Decimal,
        reason: Option<String>,
    ) -> Result<()> {
        self.registry.transition_to_claimed(policy.id)?;

        if let Err(e) = self.ledger.credit(&policy.owner, amount).await {
            self.registry.revert_claim(policy.id);
            warn!(policy = %policy.id, amount = %amount, error = %e, "Payout failed, claim rolled back");
            self.events.publish(DomainEvent::PayoutFailed {
                policy_id: policy.id,
                amount,
                reason: e.to_string(),
            });
            return Err(e.into());
        }

        self.registry.record_payout(
            policy.id,
            PayoutRecord {
                amount,
                trigger,
                paid_at: self.clock.now(),
                reason,
            },
        );
        Ok(())
    }
}

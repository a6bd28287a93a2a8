//! Policy registry
//!
//! Owns every policy ever sold. Policies are indexed by id and by owner,
//! never deleted, and leave `Active` only through [`PolicyRegistry::transition_to_claimed`].
//! Premium collection and policy creation form one unit: the premium is
//! debited first and the policy is only stored (and its id only allocated)
//! once the debit has succeeded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cropguard_common::{
    Clock, CropGuardError, GeoKey, Ledger, PayoutRecord, Policy, PolicyError, PolicyId,
    PolicyStatus, Result, ValidationError,
};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::access::AccessControl;
use crate::config::PolicyLimits;
use crate::events::{DomainEvent, EventBus};
use crate::pricing::calculate_premium;

/// Aggregate view over all policies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub claimed: usize,
    pub expired: usize,
    pub total_coverage: Decimal,
    pub total_premiums: Decimal,
    pub total_paid_out: Decimal,
}

/// Policy storage with per-policy serialization
pub struct PolicyRegistry {
    /// All policies by ID
    policies: DashMap<PolicyId, Policy>,

    /// Policy IDs by owner, in purchase order
    by_owner: DashMap<String, Vec<PolicyId>>,

    /// Per-policy settlement locks
    locks: DashMap<PolicyId, Arc<Mutex<()>>>,

    next_id: AtomicU64,
    limits: PolicyLimits,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    access: Arc<AccessControl>,
    events: Arc<EventBus>,
}

impl PolicyRegistry {
    pub fn new(
        limits: PolicyLimits,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        access: Arc<AccessControl>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            policies: DashMap::new(),
            by_owner: DashMap::new(),
            locks: DashMap::new(),
            next_id: AtomicU64::new(1),
            limits,
            ledger,
            clock,
            access,
            events,
        }
    }

    pub fn limits(&self) -> &PolicyLimits {
        &self.limits
    }

    /// Premium that `create` would charge for `coverage`
    pub fn premium_for(&self, coverage: Decimal) -> Decimal {
        calculate_premium(coverage, self.limits.base_rate_bps)
    }

    /// Sell a policy: validate, collect the premium, store as `Active`
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn create(
        &self,
        owner: &str,
        crop_type: &str,
        coverage: Decimal,
        duration_secs: u64,
        lat: f64,
        lon: f64,
    ) -> Result<PolicyId> {
        self.access.ensure_not_paused()?;

        let crop_len = crop_type.trim().len();
        if crop_len == 0 || crop_type.len() > self.limits.max_crop_type_len {
            return Err(ValidationError::InvalidCropType {
                len: crop_type.len(),
                max: self.limits.max_crop_type_len,
            }
            .into());
        }

        if coverage < self.limits.min_coverage || coverage > self.limits.max_coverage {
            return Err(ValidationError::InvalidCoverage {
                provided: coverage,
                min: self.limits.min_coverage,
                max: self.limits.max_coverage,
            }
            .into());
        }

        if duration_secs < self.limits.min_duration_secs
            || duration_secs > self.limits.max_duration_secs
        {
            return Err(ValidationError::InvalidDuration {
                provided: duration_secs,
                min: self.limits.min_duration_secs,
                max: self.limits.max_duration_secs,
            }
            .into());
        }

        let location = GeoKey::from_degrees(lat, lon)?;
        let premium = self.premium_for(coverage);

        if premium > Decimal::ZERO {
            if let Err(e) = self.ledger.debit(owner, premium).await {
                warn!(premium = %premium, error = %e, "Premium collection failed");
                return Err(e.into());
            }
        }

        let id = PolicyId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let start_time = self.clock.now();
        let policy = Policy {
            id,
            owner: owner.to_string(),
            crop_type: crop_type.to_string(),
            coverage,
            premium,
            location,
            start_time,
            end_time: start_time + duration_secs as i64,
            status: PolicyStatus::Active,
            payout: None,
        };

        let event = DomainEvent::PolicyCreated {
            policy_id: id,
            owner: policy.owner.clone(),
            coverage,
            premium,
            location,
            end_time: policy.end_time,
        };

        self.policies.insert(id, policy);
        self.by_owner.entry(owner.to_string()).or_default().push(id);

        info!(policy = %id, coverage = %coverage, premium = %premium, location = %location, "Policy created");
        self.events.publish(event);

        Ok(id)
    }

    /// Snapshot of one policy
    pub fn get(&self, id: PolicyId) -> Result<Policy> {
        self.policies
            .get(&id)
            .map(|p| p.clone())
            .ok_or_else(|| CropGuardError::from(PolicyError::NotFound(id)))
    }

    /// Policy IDs bought by `owner`, in purchase order
    pub fn by_owner(&self, owner: &str) -> Vec<PolicyId> {
        self.by_owner
            .get(owner)
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    /// Policies bought by `owner`, in purchase order
    pub fn policies_by_owner(&self, owner: &str) -> Vec<Policy> {
        self.by_owner(owner)
            .into_iter()
            .filter_map(|id| self.policies.get(&id).map(|p| p.clone()))
            .collect()
    }

    pub fn is_expired(&self, id: PolicyId) -> Result<bool> {
        Ok(self.get(id)?.is_expired(self.clock.now()))
    }

    pub fn is_active(&self, id: PolicyId) -> Result<bool> {
        Ok(self.get(id)?.is_active(self.clock.now()))
    }

    /// Flip `Active` to `Claimed`
    ///
    /// The only path out of `Active`. A second call on a claimed policy
    /// fails with `AlreadyClaimed`; an expired policy fails with `NotActive`.
    pub fn transition_to_claimed(&self, id: PolicyId) -> Result<Policy> {
        let now = self.clock.now();
        let mut policy = self
            .policies
            .get_mut(&id)
            .ok_or(PolicyError::NotFound(id))?;

        match policy.status_at(now) {
            PolicyStatus::Claimed => Err(PolicyError::AlreadyClaimed(id).into()),
            PolicyStatus::Expired => Err(PolicyError::NotActive(id).into()),
            PolicyStatus::Active => {
                policy.status = PolicyStatus::Claimed;
                debug!(policy = %id, "Policy marked claimed");
                Ok(policy.clone())
            }
        }
    }

    /// Undo a claim whose payout never reached the ledger
    pub(crate) fn revert_claim(&self, id: PolicyId) {
        if let Some(mut policy) = self.policies.get_mut(&id) {
            if policy.status == PolicyStatus::Claimed && policy.payout.is_none() {
                policy.status = PolicyStatus::Active;
                warn!(policy = %id, "Claim rolled back to active");
            }
        }
    }

    /// Attach the payout audit record to a claimed policy
    pub(crate) fn record_payout(&self, id: PolicyId, record: PayoutRecord) {
        if let Some(mut policy) = self.policies.get_mut(&id) {
            policy.payout = Some(record);
        }
    }

    /// Serialize all settlement work on one policy
    pub(crate) async fn lock(&self, id: PolicyId) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(id).or_default().clone();
        mutex.lock_owned().await
    }

    /// Number of policies ever created
    pub fn count(&self) -> usize {
        self.policies.len()
    }

    pub fn stats(&self) -> RegistryStats {
        let now = self.clock.now();
        let mut stats = RegistryStats::default();

        for entry in self.policies.iter() {
            let policy = entry.value();
            stats.total += 1;
            stats.total_coverage += policy.coverage;
            stats.total_premiums += policy.premium;
            match policy.status_at(now) {
                PolicyStatus::Active => stats.active += 1,
                PolicyStatus::Claimed => stats.claimed += 1,
                PolicyStatus::Expired => stats.expired += 1,
            }
            if let Some(payout) = &policy.payout {
                stats.total_paid_out += payout.amount;
            }
        }

        stats
    }
}

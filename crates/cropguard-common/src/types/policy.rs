//! Policy - Parametric crop-insurance contract
//!
//! A policy is created once on purchase and is never deleted. It leaves
//! `Active` exactly once, either by being claimed or by running past its
//! end time. Expiry is derived from `end_time`, it is never stored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::geo_key::GeoKey;

/// Monotonic policy identifier; 0 is reserved as the "not found" sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyId(pub u64);

impl PolicyId {
    /// Sentinel for "no policy"
    pub const NONE: PolicyId = PolicyId(0);

    /// Whether this is the sentinel value
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Policy lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Active,
    Claimed,
    /// Derived only; never stored
    Expired,
}

/// Which condition produced a payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Drought,
    Flood,
    Heatwave,
    None,
    /// Administrative payout outside the trigger rules
    Emergency,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Drought => "drought",
            TriggerType::Flood => "flood",
            TriggerType::Heatwave => "heatwave",
            TriggerType::None => "none",
            TriggerType::Emergency => "emergency",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record of a completed payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub amount: Decimal,
    pub trigger: TriggerType,
    pub paid_at: i64,
    /// Operator reason, present for administrative payouts
    pub reason: Option<String>,
}

/// A purchased policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    /// Farmer identity (DID)
    pub owner: String,
    pub crop_type: String,
    pub coverage: Decimal,
    /// floor(coverage × base_rate_bps / 10000), collected at creation
    pub premium: Decimal,
    pub location: GeoKey,
    pub start_time: i64,
    pub end_time: i64,
    /// Stored status: only `Active` or `Claimed`
    pub status: PolicyStatus,
    pub payout: Option<PayoutRecord>,
}

impl Policy {
    /// Past the end of the coverage window
    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.end_time
    }

    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.status == PolicyStatus::Claimed
    }

    /// Still open for settlement at `now`
    pub fn is_active(&self, now: i64) -> bool {
        self.status == PolicyStatus::Active && !self.is_expired(now)
    }

    /// Effective status including derived expiry
    pub fn status_at(&self, now: i64) -> PolicyStatus {
        match self.status {
            PolicyStatus::Active if self.is_expired(now) => PolicyStatus::Expired,
            status => status,
        }
    }

    /// Coverage window length in seconds
    pub fn duration(&self) -> u64 {
        (self.end_time - self.start_time).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Policy {
        Policy {
            id: PolicyId(1),
            owner: "did:key:farmer".to_string(),
            crop_type: "maize".to_string(),
            coverage: dec!(1000),
            premium: dec!(70),
            location: GeoKey::from_degrees(-1.0, 36.0).unwrap(),
            start_time: 1_000,
            end_time: 2_000,
            status: PolicyStatus::Active,
            payout: None,
        }
    }

    #[test]
    fn test_derived_expiry() {
        let policy = sample();
        assert_eq!(policy.status_at(2_000), PolicyStatus::Active);
        assert_eq!(policy.status_at(2_001), PolicyStatus::Expired);
        assert!(policy.is_active(2_000));
        assert!(!policy.is_active(2_001));
        assert_eq!(policy.duration(), 1_000);
    }

    #[test]
    fn test_claimed_never_reports_expired() {
        let mut policy = sample();
        policy.status = PolicyStatus::Claimed;
        assert_eq!(policy.status_at(5_000), PolicyStatus::Claimed);
        assert!(!policy.is_active(1_500));
    }

    #[test]
    fn test_sentinel() {
        assert!(PolicyId::NONE.is_none());
        assert!(!PolicyId(1).is_none());
        assert_eq!(TriggerType::Heatwave.to_string(), "heatwave");
    }
}

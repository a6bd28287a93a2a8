//! Access control
//!
//! Owner identity, the authorized oracle set, and the global pause gate.
//! Every entry point checks its capability here explicitly.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cropguard_common::{security::AuditLogger, AccessError};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::events::{DomainEvent, EventBus};

/// Roles and the pause flag shared by all engine components
pub struct AccessControl {
    owner: String,
    oracles: RwLock<HashSet<String>>,
    paused: AtomicBool,
    audit: Arc<AuditLogger>,
    events: Arc<EventBus>,
}

impl AccessControl {
    pub fn new(owner: impl Into<String>, audit: Arc<AuditLogger>, events: Arc<EventBus>) -> Self {
        Self {
            owner: owner.into(),
            oracles: RwLock::new(HashSet::new()),
            paused: AtomicBool::new(false),
            audit,
            events,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_owner(&self, caller: &str) -> bool {
        caller == self.owner
    }

    /// The owner is implicitly an oracle
    pub fn is_oracle(&self, caller: &str) -> bool {
        self.is_owner(caller) || self.oracles.read().contains(caller)
    }

    /// Require the owner role
    pub fn ensure_owner(&self, caller: &str, action: &str) -> Result<(), AccessError> {
        if self.is_owner(caller) {
            return Ok(());
        }
        warn!(caller = %caller, action = %action, "Owner-only action refused");
        self.audit.log_authorization(caller, "owner", action, false);
        Err(AccessError::Unauthorized {
            caller: caller.to_string(),
        })
    }

    /// Require an authorized oracle (or the owner)
    pub fn ensure_oracle(&self, caller: &str) -> Result<(), AccessError> {
        if self.is_oracle(caller) {
            return Ok(());
        }
        warn!(caller = %caller, "Weather write from unauthorized oracle refused");
        self.audit.log_authorization(caller, "weather_store", "update", false);
        Err(AccessError::UnauthorizedOracle {
            caller: caller.to_string(),
        })
    }

    /// Add an identity to the oracle set; returns false if already present
    pub fn authorize(&self, caller: &str, identity: &str) -> Result<bool, AccessError> {
        self.ensure_owner(caller, "authorize_oracle")?;

        let added = self.oracles.write().insert(identity.to_string());
        if added {
            info!(oracle = %identity, "Oracle authorized");
            self.audit
                .log_config_change(caller, "oracle_set", "member", "-", identity);
            self.events.publish(DomainEvent::OracleAuthorized {
                oracle: identity.to_string(),
            });
        }
        Ok(added)
    }

    /// Remove an identity from the oracle set; returns false if it was absent
    ///
    /// The owner's implicit authorization cannot be revoked.
    pub fn revoke(&self, caller: &str, identity: &str) -> Result<bool, AccessError> {
        self.ensure_owner(caller, "revoke_oracle")?;

        let removed = self.oracles.write().remove(identity);
        if removed {
            info!(oracle = %identity, "Oracle revoked");
            self.audit
                .log_config_change(caller, "oracle_set", "member", identity, "-");
            self.events.publish(DomainEvent::OracleRevoked {
                oracle: identity.to_string(),
            });
        }
        Ok(removed)
    }

    /// Explicitly authorized oracles (owner excluded)
    pub fn oracles(&self) -> Vec<String> {
        let mut list: Vec<String> = self.oracles.read().iter().cloned().collect();
        list.sort();
        list
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Fail with `Paused` while the gate is closed
    pub fn ensure_not_paused(&self) -> Result<(), AccessError> {
        if self.is_paused() {
            return Err(AccessError::Paused);
        }
        Ok(())
    }

    pub fn pause(&self, caller: &str) -> Result<(), AccessError> {
        self.set_paused(caller, true)
    }

    pub fn unpause(&self, caller: &str) -> Result<(), AccessError> {
        self.set_paused(caller, false)
    }

    fn set_paused(&self, caller: &str, paused: bool) -> Result<(), AccessError> {
        let action = if paused { "pause" } else { "unpause" };
        self.ensure_owner(caller, action)?;

        let previous = self.paused.swap(paused, Ordering::SeqCst);
        if previous != paused {
            info!(paused = paused, "Engine pause state changed");
            self.audit.log_admin_action(caller, action, "engine", true, &[]);
            self.events.publish(if paused {
                DomainEvent::Paused
            } else {
                DomainEvent::Unpaused
            });
        }
        Ok(())
    }
}

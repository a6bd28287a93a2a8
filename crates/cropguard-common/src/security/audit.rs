//! Audit Logging
//!
//! Records security-relevant decisions made by the engine:
//! - Authorization decisions (owner and oracle checks)
//! - Administrative overrides (emergency payouts, manual weather)
//! - Oracle set and pause changes

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Audit event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuditSeverity {
    /// Informational - normal operation
    Info,
    /// Warning - rejected or unusual operation
    Warning,
    /// Critical - funds moved outside the trigger rules
    Critical,
}

impl std::fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditSeverity::Info => write!(f, "INFO"),
            AuditSeverity::Warning => write!(f, "WARN"),
            AuditSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Audit event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditCategory {
    /// Role checks
    Authorization,
    /// Owner-only override paths
    AdminOverride,
    /// Oracle set membership and pause state
    Configuration,
}

impl std::fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditCategory::Authorization => write!(f, "AUTHZ"),
            AuditCategory::AdminOverride => write!(f, "ADMIN"),
            AuditCategory::Configuration => write!(f, "CONFIG"),
        }
    }
}

/// Audit outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    Failure,
}

/// Audit event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub event_id: String,

    /// Timestamp (Unix millis)
    pub timestamp: i64,

    pub severity: AuditSeverity,

    pub category: AuditCategory,

    /// Event action (e.g., "emergency_payout", "authorize_oracle")
    pub action: String,

    pub outcome: AuditOutcome,

    /// Who performed the action
    pub actor: Option<String>,

    /// Target resource (policy id, oracle identity, ...)
    pub resource: Option<String>,

    /// Additional details
    pub details: HashMap<String, String>,
}

impl AuditEvent {
    /// Create a new audit event
    pub fn new(category: AuditCategory, action: &str, outcome: AuditOutcome) -> Self {
        Self {
            event_id: uuid::Uuid::now_v7().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            severity: match outcome {
                AuditOutcome::Success => AuditSeverity::Info,
                AuditOutcome::Failure => AuditSeverity::Warning,
            },
            category,
            action: action.to_string(),
            outcome,
            actor: None,
            resource: None,
            details: HashMap::new(),
        }
    }

    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = Some(resource.to_string());
        self
    }

    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Audit log sink
pub trait AuditSink: Send + Sync {
    /// Write an audit event
    fn write(&self, event: &AuditEvent);
}

/// Writes audit events through `tracing`
pub struct ConsoleAuditSink;

impl AuditSink for ConsoleAuditSink {
    fn write(&self, event: &AuditEvent) {
        let log_line = format!(
            "[{}] {} {} {} - actor={} resource={} outcome={:?}",
            event.severity,
            event.category,
            event.action,
            event.event_id,
            event.actor.as_deref().unwrap_or("-"),
            event.resource.as_deref().unwrap_or("-"),
            event.outcome,
        );

        match event.severity {
            AuditSeverity::Info => info!(target: "cropguard::audit", "{}", log_line),
            AuditSeverity::Warning => warn!(target: "cropguard::audit", "{}", log_line),
            AuditSeverity::Critical => error!(target: "cropguard::audit", "CRITICAL: {}", log_line),
        }
    }
}

/// Keeps audit events in memory for inspection
///
/// Clones share the same buffer, so a handle can be kept after the sink is
/// handed to an [`AuditLogger`].
#[derive(Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn write(&self, event: &AuditEvent) {
        self.events.write().push(event.clone());
    }
}

/// Audit logger fanning events out to its sinks
pub struct AuditLogger {
    sinks: Vec<Box<dyn AuditSink>>,
    /// Minimum severity to log
    min_severity: AuditSeverity,
}

impl AuditLogger {
    /// Create a logger writing to the console
    pub fn new() -> Self {
        Self {
            sinks: vec![Box::new(ConsoleAuditSink)],
            min_severity: AuditSeverity::Info,
        }
    }

    /// Create a logger with no sinks
    pub fn silent() -> Self {
        Self {
            sinks: Vec::new(),
            min_severity: AuditSeverity::Info,
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    pub fn set_min_severity(&mut self, severity: AuditSeverity) {
        self.min_severity = severity;
    }

    /// Log an audit event
    pub fn log(&self, event: AuditEvent) {
        if event.severity < self.min_severity {
            return;
        }

        for sink in &self.sinks {
            sink.write(&event);
        }
    }

    /// Log a role check
    pub fn log_authorization(&self, actor: &str, resource: &str, action: &str, allowed: bool) {
        let outcome = if allowed {
            AuditOutcome::Success
        } else {
            AuditOutcome::Failure
        };

        let event = AuditEvent::new(AuditCategory::Authorization, action, outcome)
            .with_actor(actor)
            .with_resource(resource);

        self.log(event);
    }

    /// Log an owner override
    pub fn log_admin_action(
        &self,
        actor: &str,
        action: &str,
        resource: &str,
        success: bool,
        details: &[(&str, String)],
    ) {
        let outcome = if success {
            AuditOutcome::Success
        } else {
            AuditOutcome::Failure
        };

        let mut event = AuditEvent::new(AuditCategory::AdminOverride, action, outcome)
            .with_actor(actor)
            .with_resource(resource);

        if success {
            event = event.with_severity(AuditSeverity::Critical);
        }

        for (key, value) in details {
            event = event.with_detail(key, value);
        }

        self.log(event);
    }

    /// Log a configuration change
    pub fn log_config_change(
        &self,
        actor: &str,
        component: &str,
        setting: &str,
        old_value: &str,
        new_value: &str,
    ) {
        let event = AuditEvent::new(AuditCategory::Configuration, "change", AuditOutcome::Success)
            .with_actor(actor)
            .with_resource(component)
            .with_detail("setting", setting)
            .with_detail("old_value", old_value)
            .with_detail("new_value", new_value);

        self.log(event);
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_creation() {
        let event = AuditEvent::new(AuditCategory::AdminOverride, "emergency_payout", AuditOutcome::Success)
            .with_actor("did:key:owner")
            .with_resource("policy:#3")
            .with_detail("reason", "oracle outage");

        assert_eq!(event.category, AuditCategory::AdminOverride);
        assert_eq!(event.severity, AuditSeverity::Info);
        assert_eq!(event.actor, Some("did:key:owner".to_string()));
        assert_eq!(event.details.get("reason"), Some(&"oracle outage".to_string()));
        assert!(event.to_json().contains("emergency_payout"));
    }

    #[test]
    fn test_memory_sink_and_severity_filter() {
        let sink = MemoryAuditSink::new();
        let mut logger = AuditLogger::silent();
        logger.add_sink(Box::new(sink.clone()));

        logger.log_authorization("did:key:x", "oracle_set", "authorize_oracle", true);
        logger.log_admin_action("did:key:owner", "pause", "engine", true, &[]);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.events()[1].severity, AuditSeverity::Critical);

        logger.set_min_severity(AuditSeverity::Warning);
        logger.log_config_change("did:key:owner", "oracle_set", "member", "-", "did:key:o1");
        assert_eq!(sink.len(), 2);

        logger.log_authorization("did:key:x", "engine", "pause", false);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AuditSeverity::Info < AuditSeverity::Warning);
        assert!(AuditSeverity::Warning < AuditSeverity::Critical);
    }
}

//! Security module
//!
//! - [`audit`]: Audit trail for authorization decisions and admin overrides

pub mod audit;

pub use audit::{
    AuditCategory, AuditEvent, AuditLogger, AuditOutcome, AuditSeverity, AuditSink,
    ConsoleAuditSink, MemoryAuditSink,
};

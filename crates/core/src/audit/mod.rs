//! Operational audit trail for scan lifecycle events. Distinct from
//! `crate::types::AuditFinding`, the GDPR/CCPA compliance-finding domain
//! type produced by the audit engine's analysis of a scanned page.

pub mod event;
pub mod logger;
pub mod traits;

pub use event::{AuditEvent, AuditEventBuilder, EventOutcome, EventSeverity, EventType};
pub use logger::{AuditContext, AuditLogger};
pub use traits::{AuditBackend, Auditable, BackendHealth, TracingAuditBackend};

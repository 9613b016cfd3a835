use super::AuditEvent;
use crate::error::Result;
use async_trait::async_trait;

/// Storage backend for the audit event log. The only shipped implementation
/// is `TracingAuditBackend`, which treats `tracing` as the system of record;
/// a durable backend (e.g. writing to an external log sink) can be added
/// later behind the same trait without touching `AuditLogger`.
#[async_trait]
pub trait AuditBackend: Send + Sync {
    async fn store_event(&self, event: &AuditEvent) -> Result<()>;
    async fn health_check(&self) -> Result<BackendHealth>;
}

#[derive(Debug, Clone)]
pub struct BackendHealth {
    pub is_healthy: bool,
    pub message: Option<String>,
}

/// Emits every event as a structured `tracing` record at a level derived
/// from its severity. No events are retained in-process; retrieval is the
/// job of whatever aggregates the process's log output.
#[derive(Debug, Default)]
pub struct TracingAuditBackend;

#[async_trait]
impl AuditBackend for TracingAuditBackend {
    async fn store_event(&self, event: &AuditEvent) -> Result<()> {
        match event.severity {
            super::EventSeverity::Info => tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                scan_id = ?event.scan_id,
                "{}",
                event.to_log_format()
            ),
            super::EventSeverity::Warning => tracing::warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                scan_id = ?event.scan_id,
                "{}",
                event.to_log_format()
            ),
            super::EventSeverity::Critical => tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                scan_id = ?event.scan_id,
                "{}",
                event.to_log_format()
            ),
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        Ok(BackendHealth {
            is_healthy: true,
            message: None,
        })
    }
}

/// Types that can describe themselves for inclusion in an audit event.
pub trait Auditable {
    fn resource_type() -> &'static str;
    fn resource_id(&self) -> String;
    fn to_audit_json(&self) -> serde_json::Value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::EventType;

    #[tokio::test]
    async fn tracing_backend_reports_healthy() {
        let backend = TracingAuditBackend;
        let health = backend.health_check().await.unwrap();
        assert!(health.is_healthy);
    }

    #[tokio::test]
    async fn tracing_backend_stores_without_error() {
        let backend = TracingAuditBackend;
        let event = AuditEvent::builder(EventType::ScanStarted, "scan started").build();
        assert!(backend.store_event(&event).await.is_ok());
    }
}

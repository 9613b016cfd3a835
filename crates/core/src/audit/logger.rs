use super::{
    event::{AuditEvent, EventSeverity, EventType},
    traits::AuditBackend,
};
use crate::error::{Error, ErrorCode, ErrorMetrics, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;

/// High-level audit logger providing convenient methods for scan-lifecycle
/// events, layered over a pluggable `AuditBackend`.
#[derive(Clone)]
pub struct AuditLogger {
    backend: Arc<dyn AuditBackend>,
    error_metrics: Arc<ErrorMetrics>,
    context: Arc<RwLock<AuditContext>>,
}

/// Context that persists across audit operations for one scan.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub scan_id: Option<String>,
    pub request_id: Option<String>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditLogger {
    pub fn new(backend: Arc<dyn AuditBackend>, error_metrics: Arc<ErrorMetrics>) -> Self {
        Self {
            backend,
            error_metrics,
            context: Arc::new(RwLock::new(AuditContext::default())),
        }
    }

    pub async fn set_context(&self, context: AuditContext) {
        let mut ctx = self.context.write().await;
        *ctx = context;
    }

    pub async fn update_context<F>(&self, updater: F)
    where
        F: FnOnce(&mut AuditContext),
    {
        let mut ctx = self.context.write().await;
        updater(&mut *ctx);
    }

    /// Log a generic audit event, filling in any context fields the caller
    /// left unset, then persisting it through the configured backend.
    pub async fn log_event(&self, mut event: AuditEvent) -> Result<()> {
        {
            let ctx = self.context.read().await;

            if event.scan_id.is_none() {
                event.scan_id = ctx.scan_id.clone();
            }
            if event.request_id.is_none() {
                event.request_id = ctx.request_id.clone();
            }
            if event.source_ip.is_none() {
                event.source_ip = ctx.source_ip.clone();
            }
            if event.user_agent.is_none() {
                event.user_agent = ctx.user_agent.clone();
            }
        }

        match self.backend.store_event(&event).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let audit_error =
                    Error::new(ErrorCode::InternalError, format!("failed to store audit event: {}", e));
                self.error_metrics.record_error(&audit_error).await;

                error!(
                    event_id = %event.id,
                    error = %e,
                    "failed to store audit event"
                );

                Err(e)
            }
        }
    }

    pub async fn log_scan_accepted(&self, scan_id: &str, url: &str) -> Result<()> {
        let event = AuditEvent::builder(EventType::ScanAccepted, format!("scan accepted for {}", url))
            .scan_id(scan_id)
            .resource("url", url)
            .build();
        self.log_event(event).await
    }

    pub async fn log_phase_transition(&self, scan_id: &str, phase: &str) -> Result<()> {
        let event = AuditEvent::builder(EventType::PhaseTransition, format!("entered phase {}", phase))
            .scan_id(scan_id)
            .metadata("phase", serde_json::Value::String(phase.to_string()))
            .build();
        self.log_event(event).await
    }

    pub async fn log_browser_launch_failed(&self, scan_id: &str, reason: &str) -> Result<()> {
        let event = AuditEvent::builder(EventType::BrowserLaunchFailed, reason)
            .scan_id(scan_id)
            .severity(EventSeverity::Critical)
            .build();
        self.log_event(event).await
    }

    pub async fn log_violation_detected(
        &self,
        scan_id: &str,
        domain: &str,
        status: &str,
    ) -> Result<()> {
        let event = AuditEvent::builder(
            EventType::ViolationDetected,
            format!("{} flagged as {} on {}", domain, status, scan_id),
        )
        .scan_id(scan_id)
        .resource("domain", domain)
        .severity(EventSeverity::Warning)
        .metadata("status", serde_json::Value::String(status.to_string()))
        .build();
        self.log_event(event).await
    }

    pub async fn log_audit_finding(&self, scan_id: &str, finding_kind: &str, severity: EventSeverity) -> Result<()> {
        let event = AuditEvent::builder(
            EventType::AuditFindingRecorded,
            format!("{} finding recorded", finding_kind),
        )
        .scan_id(scan_id)
        .severity(severity)
        .metadata("finding_kind", serde_json::Value::String(finding_kind.to_string()))
        .build();
        self.log_event(event).await
    }

    pub async fn log_certificate_issued(&self, scan_id: &str, cert_id: &str) -> Result<()> {
        let event = AuditEvent::builder(EventType::CertificateIssued, format!("certificate {} issued", cert_id))
            .scan_id(scan_id)
            .resource("certificate", cert_id)
            .build();
        self.log_event(event).await
    }

    pub async fn log_scan_completed(&self, scan_id: &str, risk_score: u8) -> Result<()> {
        let event = AuditEvent::builder(
            EventType::ScanCompleted,
            format!("scan completed with risk score {}", risk_score),
        )
        .scan_id(scan_id)
        .metadata("risk_score", serde_json::Value::Number(risk_score.into()))
        .build();
        self.log_event(event).await
    }

    pub async fn log_scan_failed(&self, scan_id: &str, reason: &str) -> Result<()> {
        let event = AuditEvent::builder(EventType::ScanFailed, reason)
            .scan_id(scan_id)
            .severity(EventSeverity::Critical)
            .build();
        self.log_event(event).await
    }

    pub async fn log_scan_cancelled(&self, scan_id: &str) -> Result<()> {
        let event = AuditEvent::builder(EventType::ScanCancelled, "scan cancelled")
            .scan_id(scan_id)
            .severity(EventSeverity::Warning)
            .build();
        self.log_event(event).await
    }
}

impl AuditContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scan_id(mut self, scan_id: impl Into<String>) -> Self {
        self.scan_id = Some(scan_id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = Some(source_ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::traits::TracingAuditBackend;

    fn logger() -> AuditLogger {
        AuditLogger::new(Arc::new(TracingAuditBackend), Arc::new(ErrorMetrics::new()))
    }

    #[tokio::test]
    async fn context_is_applied_to_events_missing_fields() {
        let logger = logger();
        logger.set_context(AuditContext::new().with_scan_id("scan-1")).await;

        let event = AuditEvent::builder(EventType::ScanStarted, "started").build();
        assert!(event.scan_id.is_none());
        assert!(logger.log_event(event).await.is_ok());
    }

    #[tokio::test]
    async fn convenience_methods_log_without_error() {
        let logger = logger();
        assert!(logger.log_scan_accepted("scan-1", "https://example.com").await.is_ok());
        assert!(logger.log_phase_transition("scan-1", "capture").await.is_ok());
        assert!(logger.log_scan_completed("scan-1", 42).await.is_ok());
    }
}

//! The Scan Orchestrator: drives one scan through the fixed 16-phase
//! sequence (`spec.md` 4.1), wiring together the browser session, the four
//! capture layers, the consent interactor, detection, audits, and scoring.
//!
//! Fatal errors (`BrowserLaunchFailed`) propagate as `Err` for the API layer
//! to map to a 500. Every other failure degrades the scan to a partial
//! result carrying a `scan_note`, assembled through the same finalization
//! path a clean run takes. Cancellation is checked at each phase boundary
//! and, when tripped, short-circuits straight to that same finalization with
//! whatever artifacts were gathered so far and skips the cache write.

use crate::artifacts;
use crate::cancellation::CancellationToken;
use crate::classify;
use crate::idle;
use crate::phase::Phase;

use scan_audit::{GeoIpCache, GeoIpClient, VisionClient};
use scan_browser::{BrowserSession, ConsentInteractor};
use scan_capture::CaptureLayers;
use scan_core::{
    Adequacy, AuditFinding, Config, ConsentTimeline, DataResidencyInfo, DataType, DetectionResult,
    Error, PerformanceMetrics, RequestLog, ScanRequest, ScanResult, ScreenshotRecord,
};
use scan_detect::{AiFallbackCache, AiFallbackClient};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub struct ScanOutcome {
    pub result: ScanResult,
    pub cached: bool,
}

/// Long-lived orchestrator instance: one per process, shared across
/// concurrently running scans. Caches and external clients are process-wide
/// singletons per §5; only the per-scan browser/capture state is created
/// fresh inside `scan`.
pub struct ScanOrchestrator {
    headless: bool,
    no_sandbox: bool,
    result_cache: Arc<scan_core::TtlCache<String, ScanResult>>,
    ai_client: Option<AiFallbackClient>,
    vision_client: Option<VisionClient>,
    geo_client: GeoIpClient,
    audit_logger: scan_core::AuditLogger,
}

impl ScanOrchestrator {
    pub fn new(config: &Config, audit_logger: scan_core::AuditLogger) -> Self {
        let result_cache = Arc::new(scan_core::TtlCache::new(std::time::Duration::from_secs(
            config.cache.result_ttl_secs,
        )));

        let ai_cache: Arc<AiFallbackCache> = Arc::new(scan_core::TtlCache::new(
            std::time::Duration::from_secs(config.cache.ai_cache_ttl_secs),
        ));
        let vision_cache: Arc<scan_audit::GpcVisionCache> = Arc::new(scan_core::TtlCache::new(
            std::time::Duration::from_secs(config.cache.ai_cache_ttl_secs),
        ));
        let geo_cache: Arc<GeoIpCache> = Arc::new(scan_core::TtlCache::new(std::time::Duration::from_secs(
            config.cache.geo_ip_ttl_secs,
        )));

        let resolved_key = config.ai.resolve_api_key();
        let ai_client = match (config.ai.enabled, &resolved_key) {
            (true, Some(key)) => Some(AiFallbackClient::new(config.ai.endpoint.clone(), key.clone(), ai_cache)),
            _ => None,
        };
        let vision_client = match (config.ai.enabled, &resolved_key) {
            (true, Some(key)) => Some(VisionClient::new(config.ai.endpoint.clone(), key.clone(), vision_cache)),
            _ => None,
        };

        let geo_client = GeoIpClient::new(
            config.geo_ip.endpoint.clone(),
            config.geo_ip.timeout_ms,
            geo_cache,
        );

        Self {
            headless: config.browser.headless,
            no_sandbox: config.browser.no_sandbox,
            result_cache,
            ai_client,
            vision_client,
            geo_client,
            audit_logger,
        }
    }

    pub fn result_cache(&self) -> Arc<scan_core::TtlCache<String, ScanResult>> {
        self.result_cache.clone()
    }

    /// Readiness probe: launches and immediately tears down a throwaway
    /// browser context. There is no database in this system, so this is the
    /// dependency worth checking before advertising readiness.
    pub async fn check_browser(&self) -> Result<(), Error> {
        let session = tokio::time::timeout(
            Phase::LaunchBrowser.deadline(),
            BrowserSession::launch(Uuid::new_v4(), scan_core::ScanMode::Standard, self.headless, self.no_sandbox),
        )
        .await
        .map_err(|_| Error::new(scan_core::ErrorCode::Timeout, "browser readiness check timed out"))??;

        let _ = session.close().await;
        Ok(())
    }

    /// Runs one scan end to end. Returns `Err` only for fatal errors (the
    /// browser could not be launched at all); everything else comes back as
    /// `Ok` with a partial result and a populated `scan_note`.
    pub async fn scan(&self, request: ScanRequest, cancel: CancellationToken) -> Result<ScanOutcome, Error> {
        let scan_id = Uuid::new_v4();
        let started_at = chrono::Utc::now();
        let mut metrics = PerformanceMetrics::default();
        let mut scan_note: Option<String> = None;

        self.audit_logger
            .update_context(|ctx| ctx.scan_id = Some(scan_id.to_string()))
            .await;
        let _ = self.audit_logger.log_scan_accepted(&scan_id.to_string(), &request.url).await;

        // Init
        let phase_start = Instant::now();
        if request.url.trim().is_empty() {
            return Err(Error::new(
                scan_core::ErrorCode::MissingRequiredField,
                "url is required",
            ));
        }
        record_phase(&mut metrics, Phase::Init, phase_start);

        // CacheCheck
        let cache_key = scan_core::normalize_url(&request.url);
        let phase_start = Instant::now();
        if !request.force_refresh {
            if let Some(cached) = self.result_cache.get(&cache_key) {
                record_phase(&mut metrics, Phase::CacheCheck, phase_start);
                return Ok(ScanOutcome { result: cached, cached: true });
            }
        }
        record_phase(&mut metrics, Phase::CacheCheck, phase_start);

        // Per-scan mutable state, populated as phases progress; a
        // cancellation or recoverable error short-circuits the rest of the
        // pipeline and falls through to finalization with whatever is here.
        let mut timeline = ConsentTimeline::new(started_at, request.mode);
        let mut screenshot_before: Option<ScreenshotRecord> = None;
        let mut screenshot_after: Option<ScreenshotRecord> = None;
        let mut requests: Vec<RequestLog> = Vec::new();
        let mut reported_cmp = DetectionResult::empty();
        let mut tms = DetectionResult::empty();
        let mut data_layers: Vec<String> = Vec::new();
        let mut gdpr_audit: Vec<AuditFinding> = Vec::new();
        let mut data_residency: Vec<DataResidencyInfo> = Vec::new();
        let mut cancelled = false;
        let mut session: Option<Arc<BrowserSession>> = None;

        'pipeline: {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'pipeline;
            }

            // LaunchBrowser — fatal.
            let phase_start = Instant::now();
            let launch = tokio::time::timeout(
                Phase::LaunchBrowser.deadline(),
                BrowserSession::launch(scan_id, request.mode, self.headless, self.no_sandbox),
            )
            .await;
            let launched = match launch {
                Ok(Ok(session)) => session,
                Ok(Err(e)) => {
                    let _ = self.audit_logger.log_browser_launch_failed(&scan_id.to_string(), &e.message).await;
                    return Err(e);
                }
                Err(_) => {
                    let e = Error::browser_launch_failed("browser launch exceeded its phase deadline");
                    let _ = self.audit_logger.log_browser_launch_failed(&scan_id.to_string(), &e.message).await;
                    return Err(e);
                }
            };
            record_phase(&mut metrics, Phase::LaunchBrowser, phase_start);
            let launched = Arc::new(launched);
            session = Some(launched.clone());

            // InstallCapture
            let phase_start = Instant::now();
            let mut capture = CaptureLayers::new();
            let nav_start_instant = Instant::now();
            if let Err(e) = capture.attach(launched.clone(), nav_start_instant).await {
                scan_note = Some(merge_note(scan_note.take(), &format!("CAPTURE_DEGRADED: {e}")));
            }
            record_phase(&mut metrics, Phase::InstallCapture, phase_start);

            if cancel.is_cancelled() {
                cancelled = true;
                break 'pipeline;
            }

            // Navigate
            let nav_start_utc = chrono::Utc::now();
            timeline = ConsentTimeline::new(nav_start_utc, request.mode);
            let phase_start = Instant::now();
            match tokio::time::timeout(Phase::Navigate.deadline(), launched.navigate(&request.url)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => scan_note = Some(merge_note(scan_note.take(), &e.to_string())),
                Err(_) => {
                    scan_note = Some(merge_note(
                        scan_note.take(),
                        "NAV_TIMEOUT: navigation exceeded its phase deadline",
                    ))
                }
            }
            record_phase(&mut metrics, Phase::Navigate, phase_start);

            if cancel.is_cancelled() {
                cancelled = true;
                break 'pipeline;
            }

            // ClassifyPageAvailable
            let phase_start = Instant::now();
            let html = launched.html().await.unwrap_or_default();
            if html.is_empty() {
                scan_note = Some(merge_note(
                    scan_note.take(),
                    "HTML_UNAVAILABLE: page content could not be read, falling back to html_analysis",
                ));
            }
            record_phase(&mut metrics, Phase::ClassifyPageAvailable, phase_start);

            screenshot_before = artifacts::capture_screenshot(&launched).await.ok();

            if cancel.is_cancelled() {
                cancelled = true;
                break 'pipeline;
            }

            // LocateBanner + InteractConsent: the interactor performs both
            // steps in one pass (see scan-browser::consent), so they share a
            // single measured span.
            let phase_start = Instant::now();
            let consent_outcome =
                tokio::time::timeout(Phase::InteractConsent.deadline(), ConsentInteractor::interact(&launched, request.mode))
                    .await
                    .unwrap_or(scan_browser::ConsentOutcome {
                        consent_click_at: None,
                        banner_seen: false,
                        scan_note: Some("BANNER_NOT_CLICKABLE: consent interaction exceeded its phase deadline".to_string()),
                    });
            timeline.banner_seen = if consent_outcome.banner_seen { Some(chrono::Utc::now()) } else { None };
            timeline.consent_click_at = consent_outcome.consent_click_at;
            if let Some(note) = consent_outcome.scan_note {
                scan_note = Some(merge_note(scan_note.take(), &note));
            }
            record_phase(&mut metrics, Phase::LocateBanner, phase_start);
            record_phase(&mut metrics, Phase::InteractConsent, phase_start);

            if cancel.is_cancelled() {
                cancelled = true;
                break 'pipeline;
            }

            // PostConsentWait
            let phase_start = Instant::now();
            idle::wait_for_network_idle(&capture, &cancel).await;
            timeline.post_consent_idle_at = Some(chrono::Utc::now());
            record_phase(&mut metrics, Phase::PostConsentWait, phase_start);

            if cancel.is_cancelled() {
                cancelled = true;
                break 'pipeline;
            }

            // ExtractArtifacts
            let phase_start = Instant::now();
            let captured_requests = capture.finish();
            screenshot_after = artifacts::capture_screenshot(&launched).await.ok();
            record_phase(&mut metrics, Phase::ExtractArtifacts, phase_start);

            // RunDetection
            let phase_start = Instant::now();
            let detection = scan_detect::run(&launched, &html, &captured_requests).await;
            let primary_cmp = detection.cmp;
            tms = detection.tms;
            data_layers = detection.data_layers;
            reported_cmp = primary_cmp.clone();

            if let Some(ai) = &self.ai_client {
                if scan_detect::needs_ai_fallback(&primary_cmp) {
                    let inline = artifacts::collect_inline_scripts(&launched).await;
                    let urls = artifacts::script_urls(&captured_requests);
                    match ai.classify(&html, &urls, &inline).await {
                        Ok(Some(ai_result)) => reported_cmp = ai_result,
                        Ok(None) => {}
                        Err(e) => scan_note = Some(merge_note(scan_note.take(), &e.to_string())),
                    }
                }
            }
            record_phase(&mut metrics, Phase::RunDetection, phase_start);

            // Request classification uses the pre-AI primary detection so the
            // AI fallback never changes `violations_count`, only the
            // reported `cmp` (see DESIGN.md).
            requests = classify::classify_requests(&captured_requests, &timeline, &primary_cmp, request.mode);
            let request_domains = classify::unique_domains(&requests);

            if cancel.is_cancelled() {
                cancelled = true;
                break 'pipeline;
            }

            // RunAudits
            let phase_start = Instant::now();
            match tokio::time::timeout(
                Phase::RunAudits.deadline(),
                scan_audit::run(
                    &launched,
                    request.mode,
                    &request_domains,
                    self.vision_client.as_ref(),
                    &self.geo_client,
                ),
            )
            .await
            {
                Ok(Ok(outcome)) => {
                    gdpr_audit = outcome.findings;
                    data_residency = outcome.data_residency;
                }
                Ok(Err(e)) => scan_note = Some(merge_note(scan_note.take(), &e.to_string())),
                Err(_) => {
                    scan_note = Some(merge_note(
                        scan_note.take(),
                        "audit module exceeded its phase deadline",
                    ))
                }
            }
            record_phase(&mut metrics, Phase::RunAudits, phase_start);

            for request_log in requests.iter_mut() {
                if let Some(info) = data_residency.iter().find(|d| d.request_domain == request_log.domain) {
                    request_log.data_residency = Some(info.clone());
                }
            }
        }

        if let Some(session) = session {
            if let Ok(session) = Arc::try_unwrap(session) {
                let _ = session.close().await;
            }
        }

        if cancelled {
            let _ = self.audit_logger.log_scan_cancelled(&scan_id.to_string()).await;
        }

        // Score
        let phase_start = Instant::now();
        let has_pii_exposure = requests
            .iter()
            .any(|r| r.consent_state == scan_core::ConsentState::Pre && r.data_types.contains(&DataType::Pii));
        let scoring_input = scan_score::ScoringInput {
            cmp: &reported_cmp,
            requests: &requests,
            audit_findings: &gdpr_audit,
            data_residency: &data_residency,
        };
        let risk = scan_score::compute_risk_score(&scoring_input);
        let fine_estimate = scan_score::estimate_fine(risk.score, risk.violations_count, has_pii_exposure);
        record_phase(&mut metrics, Phase::Score, phase_start);

        let completed_at = chrono::Utc::now();
        metrics.total_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;

        let data_residency_violations: Vec<DataResidencyInfo> = data_residency
            .into_iter()
            .filter(|d| !matches!(d.adequacy, Adequacy::Eea | Adequacy::Adequate))
            .collect();

        let mut result = ScanResult {
            scan_id,
            url: request.url.clone(),
            started_at,
            completed_at,
            risk_score: risk.score,
            risk_grade: risk.grade,
            violations_count: risk.violations_count,
            fine_estimate,
            screenshot_before,
            screenshot_after,
            cmp: reported_cmp,
            tms,
            data_layers,
            performance_metrics: metrics,
            requests,
            gdpr_audit,
            site_violations: Vec::new(),
            data_residency_violations,
            certificate: None,
            scan_note,
            cancelled,
        };

        // BuildCertificate
        let phase_start = Instant::now();
        let certificate = scan_score::build_certificate(&result, None);
        let _ = self
            .audit_logger
            .log_certificate_issued(&scan_id.to_string(), &certificate.metadata.cert_id.to_string())
            .await;
        result.certificate = Some(certificate);
        record_phase(&mut result.performance_metrics, Phase::BuildCertificate, phase_start);

        if cancelled {
            return Ok(ScanOutcome { result, cached: false });
        }

        // Cache
        let phase_start = Instant::now();
        self.result_cache.set(cache_key, result.clone());
        record_phase(&mut result.performance_metrics, Phase::Cache, phase_start);

        let _ = self.audit_logger.log_scan_completed(&scan_id.to_string(), result.risk_score).await;

        Ok(ScanOutcome { result, cached: false })
    }
}

fn record_phase(metrics: &mut PerformanceMetrics, phase: Phase, start: Instant) {
    metrics.phases.insert(phase.as_str().to_string(), start.elapsed().as_millis() as u64);
}

fn merge_note(existing: Option<String>, addition: &str) -> String {
    match existing {
        Some(note) => format!("{note}; {addition}"),
        None => addition.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_note_joins_with_semicolon() {
        assert_eq!(merge_note(None, "a"), "a");
        assert_eq!(merge_note(Some("a".to_string()), "b"), "a; b");
    }

    #[test]
    fn record_phase_stores_elapsed_millis() {
        let mut metrics = PerformanceMetrics::default();
        let start = Instant::now();
        record_phase(&mut metrics, Phase::Init, start);
        assert!(metrics.phases.contains_key("init"));
    }
}

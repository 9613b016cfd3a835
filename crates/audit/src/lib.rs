//! GDPR/CCPA/accessibility Audit Module: the seven finding types run against
//! one browser session and a scan's captured request domains. Each
//! sub-module owns its own probe script and thresholds; this crate root
//! only sequences them and assembles the combined outcome the orchestrator
//! attaches to `ScanResult`.

pub mod accessibility;
pub mod gpc;
pub mod granularity;
pub mod parity;
pub mod residency;
pub mod symmetry;
pub mod transparency;

pub use gpc::{GpcVisionCache, VisionClient};
pub use residency::{GeoIpCache, GeoIpClient};

use scan_browser::BrowserSession;
use scan_core::{Adequacy, AuditFinding, DataResidencyInfo, Error, FindingSeverity, ScanMode};

pub struct AuditOutcome {
    pub findings: Vec<AuditFinding>,
    pub data_residency: Vec<DataResidencyInfo>,
}

/// Runs every applicable finding and returns them together with the
/// per-domain residency resolutions (reported separately as
/// `ScanResult::data_residency_violations` even though a non-adequate one
/// also becomes a `DataResidency` finding). `request_domains` should already
/// be deduplicated by the caller — this function resolves each exactly
/// once. `vision_client` is `None` when the AI client is unconfigured; GPC
/// Visual Confirmation is then skipped rather than failing the scan, since
/// it is the one finding that depends on an external model call.
pub async fn run(
    session: &BrowserSession,
    mode: ScanMode,
    request_domains: &[String],
    vision_client: Option<&VisionClient>,
    geo_client: &GeoIpClient,
) -> Result<AuditOutcome, Error> {
    let mut findings = Vec::new();

    if let Some(finding) = parity::audit(session).await? {
        findings.push(finding);
    }
    if let Some(finding) = granularity::audit(session).await? {
        findings.push(finding);
    }
    if let Some(finding) = transparency::audit(session).await? {
        findings.push(finding);
    }
    if let Some(finding) = accessibility::audit(session).await? {
        findings.push(finding);
    }
    if let Some(finding) = symmetry::audit(session).await? {
        findings.push(finding);
    }
    if let Some(client) = vision_client {
        if let Some(finding) = gpc::audit(session, mode, client).await? {
            findings.push(finding);
        }
    }

    let mut data_residency = Vec::with_capacity(request_domains.len());
    for domain in request_domains {
        let info = geo_client.resolve(domain).await;

        if !matches!(info.adequacy, Adequacy::Eea | Adequacy::Adequate) {
            let severity = if matches!(info.adequacy, Adequacy::NonAdequate) {
                FindingSeverity::Major
            } else {
                FindingSeverity::Minor
            };
            findings.push(AuditFinding::DataResidency {
                severity,
                info: info.clone(),
                regulatory_codes: vec!["GDPR-44".to_string()],
            });
        }

        data_residency.push(info);
    }

    Ok(AuditOutcome { findings, data_residency })
}

//! The fixed 16-state phase sequence the orchestrator drives one scan
//! through. Order matters for `performance_metrics` and for the "any phase
//! may route to ExtractArtifacts" recovery rule.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Init,
    CacheCheck,
    LaunchBrowser,
    InstallCapture,
    Navigate,
    ClassifyPageAvailable,
    LocateBanner,
    InteractConsent,
    PostConsentWait,
    ExtractArtifacts,
    RunDetection,
    RunAudits,
    Score,
    BuildCertificate,
    Cache,
    Done,
}

impl Phase {
    pub const ALL: [Phase; 16] = [
        Phase::Init,
        Phase::CacheCheck,
        Phase::LaunchBrowser,
        Phase::InstallCapture,
        Phase::Navigate,
        Phase::ClassifyPageAvailable,
        Phase::LocateBanner,
        Phase::InteractConsent,
        Phase::PostConsentWait,
        Phase::ExtractArtifacts,
        Phase::RunDetection,
        Phase::RunAudits,
        Phase::Score,
        Phase::BuildCertificate,
        Phase::Cache,
        Phase::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::CacheCheck => "cache_check",
            Phase::LaunchBrowser => "launch_browser",
            Phase::InstallCapture => "install_capture",
            Phase::Navigate => "navigate",
            Phase::ClassifyPageAvailable => "classify_page_available",
            Phase::LocateBanner => "locate_banner",
            Phase::InteractConsent => "interact_consent",
            Phase::PostConsentWait => "post_consent_wait",
            Phase::ExtractArtifacts => "extract_artifacts",
            Phase::RunDetection => "run_detection",
            Phase::RunAudits => "run_audits",
            Phase::Score => "score",
            Phase::BuildCertificate => "build_certificate",
            Phase::Cache => "cache",
            Phase::Done => "done",
        }
    }

    /// Soft per-phase deadline. `PostConsentWait` has its own idle-driven
    /// bound (see `idle::wait_for_network_idle`) and is not governed by this.
    pub fn deadline(&self) -> std::time::Duration {
        use std::time::Duration;
        match self {
            Phase::Init => Duration::from_millis(50),
            Phase::CacheCheck => Duration::from_millis(100),
            Phase::LaunchBrowser => Duration::from_secs(20),
            Phase::InstallCapture => Duration::from_secs(5),
            Phase::Navigate => Duration::from_secs(30),
            Phase::ClassifyPageAvailable => Duration::from_secs(2),
            Phase::LocateBanner => Duration::from_secs(6),
            Phase::InteractConsent => Duration::from_secs(10),
            Phase::PostConsentWait => Duration::from_secs(15),
            Phase::ExtractArtifacts => Duration::from_secs(5),
            Phase::RunDetection => Duration::from_secs(10),
            Phase::RunAudits => Duration::from_secs(20),
            Phase::Score => Duration::from_millis(500),
            Phase::BuildCertificate => Duration::from_secs(2),
            Phase::Cache => Duration::from_millis(100),
            Phase::Done => Duration::from_millis(10),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_covers_every_variant_in_spec_order() {
        assert_eq!(Phase::ALL.len(), 16);
        assert_eq!(Phase::ALL[0], Phase::Init);
        assert_eq!(Phase::ALL[15], Phase::Done);
    }

    #[test]
    fn as_str_is_snake_case_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for phase in Phase::ALL {
            assert!(seen.insert(phase.as_str()), "duplicate phase name {}", phase.as_str());
        }
    }
}

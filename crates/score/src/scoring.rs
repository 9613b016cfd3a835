//! Risk-score formula: a base determined by whether any violation exists and
//! whether a CMP is present at all, incremented by a fixed set of bumps for
//! each category of finding, then clamped and graded.

use scan_core::{AuditFinding, ConsentState, DataResidencyInfo, DataType, DetectionResult, FindingSeverity, RequestLog, RequestStatus};

const NO_CMP_BASE: u8 = 40;
const CMP_PRESENT_BASE: u8 = 20;
const ANY_VIOLATION_BASE: u8 = 50;

const MAX_TRACKING_RATIO_BUMP: f64 = 30.0;
const PII_PRE_CONSENT_BUMP: u8 = 20;
const NO_CMP_BUMP: u8 = 10;
const HIGH_VOLUME_BUMP: u8 = 10;
const MEDIUM_VOLUME_BUMP: u8 = 5;
const MISSING_REJECT_BUMP: u8 = 30;
const PRE_TICKED_MAJOR_BUMP: u8 = 20;
const PRE_TICKED_MINOR_BUMP: u8 = 10;
const NON_ADEQUATE_PER_DOMAIN_BUMP: u8 = 2;
const NON_ADEQUATE_BUMP_CAP: u8 = 10;
const WCAG_FAILURE_BUMP: u8 = 5;
const GPC_IGNORED_BUMP: u8 = 15;
const UI_BIAS_BUMP: u8 = 10;

/// Request counts above this many are "high volume"; above `MEDIUM_VOLUME_THRESHOLD`
/// but at or below this are "medium volume". Not specified numerically by the
/// source material; chosen so a handful of first-party requests never trips
/// either bump and a page loaded with dozens of third-party calls does.
const HIGH_VOLUME_THRESHOLD: usize = 50;
const MEDIUM_VOLUME_THRESHOLD: usize = 20;

pub struct ScoringInput<'a> {
    pub cmp: &'a DetectionResult,
    pub requests: &'a [RequestLog],
    pub audit_findings: &'a [AuditFinding],
    pub data_residency: &'a [DataResidencyInfo],
}

pub struct RiskScore {
    pub score: u8,
    pub grade: char,
    pub violations_count: u32,
}

pub fn compute(input: &ScoringInput) -> RiskScore {
    let violations_count = input
        .requests
        .iter()
        .filter(|r| r.status == RequestStatus::Violation)
        .count() as u32;

    let has_cmp = !input.cmp.detected.is_empty();

    let mut score = if violations_count > 0 {
        ANY_VIOLATION_BASE as f64
    } else if has_cmp {
        CMP_PRESENT_BASE as f64
    } else {
        NO_CMP_BASE as f64
    };

    if !input.requests.is_empty() {
        let pre_consent_tracking = input
            .requests
            .iter()
            .filter(|r| r.consent_state == ConsentState::Pre && r.status == RequestStatus::Violation)
            .count();
        let ratio = pre_consent_tracking as f64 / input.requests.len() as f64;
        score += ratio * MAX_TRACKING_RATIO_BUMP;
    }

    let pre_consent_pii = input.requests.iter().any(|r| {
        r.consent_state == ConsentState::Pre && r.data_types.contains(&DataType::Pii)
    });
    if pre_consent_pii {
        score += PII_PRE_CONSENT_BUMP as f64;
    }

    if !has_cmp {
        score += NO_CMP_BUMP as f64;
    }

    if input.requests.len() > HIGH_VOLUME_THRESHOLD {
        score += HIGH_VOLUME_BUMP as f64;
    } else if input.requests.len() > MEDIUM_VOLUME_THRESHOLD {
        score += MEDIUM_VOLUME_BUMP as f64;
    }

    for finding in input.audit_findings {
        match finding {
            AuditFinding::ParityOfEase { reject_reachable: false, .. } => {
                score += MISSING_REJECT_BUMP as f64;
            }
            AuditFinding::Granularity { severity, .. } => {
                score += match severity {
                    FindingSeverity::Major | FindingSeverity::Critical => PRE_TICKED_MAJOR_BUMP as f64,
                    FindingSeverity::Minor => PRE_TICKED_MINOR_BUMP as f64,
                };
            }
            AuditFinding::Accessibility { .. } => {
                score += WCAG_FAILURE_BUMP as f64;
            }
            AuditFinding::GpcVisual { acknowledged: false, .. } => {
                score += GPC_IGNORED_BUMP as f64;
            }
            AuditFinding::UiSymmetry { .. } => {
                score += UI_BIAS_BUMP as f64;
            }
            _ => {}
        }
    }

    let non_adequate_count = input
        .data_residency
        .iter()
        .filter(|d| d.adequacy == scan_core::Adequacy::NonAdequate)
        .count() as u8;
    let non_adequate_bump = (non_adequate_count.saturating_mul(NON_ADEQUATE_PER_DOMAIN_BUMP))
        .min(NON_ADEQUATE_BUMP_CAP);
    score += non_adequate_bump as f64;

    let clamped = score.round().clamp(0.0, 100.0) as u8;

    RiskScore {
        score: clamped,
        grade: grade_for(clamped),
        violations_count,
    }
}

fn grade_for(score: u8) -> char {
    if score >= 90 {
        'F'
    } else if score >= 70 {
        'D'
    } else if score >= 50 {
        'C'
    } else if score >= 30 {
        'B'
    } else {
        'A'
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scan_core::{Confidence, RequestKind};
    use uuid::Uuid;

    fn request(consent: ConsentState, status: RequestStatus, data_types: Vec<DataType>) -> RequestLog {
        RequestLog {
            id: Uuid::new_v4(),
            domain: "example.com".to_string(),
            url: "https://example.com".to_string(),
            t_seen: Utc::now(),
            kind: RequestKind::Xhr,
            consent_state: consent,
            status,
            data_types,
            parameters: None,
            decoded_payload: None,
            data_residency: None,
        }
    }

    #[test]
    fn clean_scan_with_cmp_scores_low() {
        let cmp = DetectionResult {
            detected: vec!["OneTrust".to_string()],
            primary: Some("OneTrust".to_string()),
            confidence: Confidence::High,
            evidence: vec![],
        };
        let input = ScoringInput {
            cmp: &cmp,
            requests: &[],
            audit_findings: &[],
            data_residency: &[],
        };
        let result = compute(&input);
        assert_eq!(result.score, CMP_PRESENT_BASE);
        assert_eq!(result.grade, 'A');
        assert_eq!(result.violations_count, 0);
    }

    #[test]
    fn no_cmp_scores_higher_than_cmp_present() {
        let cmp = DetectionResult::empty();
        let input = ScoringInput {
            cmp: &cmp,
            requests: &[],
            audit_findings: &[],
            data_residency: &[],
        };
        let result = compute(&input);
        assert_eq!(result.score, NO_CMP_BASE + NO_CMP_BUMP);
    }

    #[test]
    fn pre_consent_violation_raises_base_and_counts_violation() {
        let cmp = DetectionResult {
            detected: vec!["OneTrust".to_string()],
            primary: Some("OneTrust".to_string()),
            confidence: Confidence::High,
            evidence: vec![],
        };
        let requests = vec![request(ConsentState::Pre, RequestStatus::Violation, vec![])];
        let input = ScoringInput {
            cmp: &cmp,
            requests: &requests,
            audit_findings: &[],
            data_residency: &[],
        };
        let result = compute(&input);
        assert_eq!(result.violations_count, 1);
        assert!(result.score >= ANY_VIOLATION_BASE);
    }

    #[test]
    fn non_adequate_transfers_bump_is_capped() {
        let cmp = DetectionResult::empty();
        let residencies: Vec<DataResidencyInfo> = (0..20)
            .map(|i| DataResidencyInfo {
                request_domain: format!("tracker{i}.example"),
                resolved_ip: None,
                country: Some("United States".to_string()),
                country_code: Some("US".to_string()),
                adequacy: scan_core::Adequacy::NonAdequate,
            })
            .collect();
        let input = ScoringInput {
            cmp: &cmp,
            requests: &[],
            audit_findings: &[],
            data_residency: &residencies,
        };
        let result = compute(&input);
        // base(40) + no-cmp(10) + capped non-adequate bump(10) = 60
        assert_eq!(result.score, 60);
    }

    #[test]
    fn grade_thresholds_match_the_documented_bands() {
        assert_eq!(grade_for(95), 'F');
        assert_eq!(grade_for(70), 'D');
        assert_eq!(grade_for(55), 'C');
        assert_eq!(grade_for(30), 'B');
        assert_eq!(grade_for(10), 'A');
    }
}

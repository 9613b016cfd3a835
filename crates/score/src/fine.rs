//! Fine estimator: a deterministic €50k-€2M band derived from the risk score
//! and violation count. Flagged by the source material as a rough estimate,
//! not a legal opinion — but it must still be stable across renders, so this
//! is implemented as a real computation rather than a placeholder.

use scan_core::FineEstimate;

const FLOOR_EUR: u64 = 50_000;
const CAP_EUR: u64 = 2_000_000;
const PER_VIOLATION_EUR: u64 = 150_000;

const HIGH_RISK_THRESHOLD: u8 = 70;
const HIGH_RISK_MULTIPLIER: f64 = 1.5;
const PII_MULTIPLIER: f64 = 1.2;

/// Never non-zero when `violations_count == 0` — a clean scan carries no
/// fine exposure regardless of how its other findings scored.
pub fn estimate(risk_score: u8, violations_count: u32, has_pii_exposure: bool) -> FineEstimate {
    if violations_count == 0 {
        return FineEstimate { min: 0, max: 0 };
    }

    let base_max = FLOOR_EUR + (violations_count as u64) * PER_VIOLATION_EUR;

    let mut multiplier = 1.0;
    if risk_score >= HIGH_RISK_THRESHOLD {
        multiplier *= HIGH_RISK_MULTIPLIER;
    }
    if has_pii_exposure {
        multiplier *= PII_MULTIPLIER;
    }

    let max = ((base_max as f64) * multiplier).round() as u64;

    FineEstimate {
        min: FLOOR_EUR,
        max: max.min(CAP_EUR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_violations_yields_zero_fine() {
        let estimate = estimate(80, 0, true);
        assert_eq!(estimate.min, 0);
        assert_eq!(estimate.max, 0);
    }

    #[test]
    fn single_violation_floors_at_minimum() {
        let estimate = estimate(20, 1, false);
        assert_eq!(estimate.min, FLOOR_EUR);
        assert_eq!(estimate.max, FLOOR_EUR + PER_VIOLATION_EUR);
    }

    #[test]
    fn high_risk_and_pii_compound_but_respect_the_cap() {
        let estimate = estimate(95, 20, true);
        assert_eq!(estimate.max, CAP_EUR);
    }

    #[test]
    fn low_risk_without_pii_applies_no_multiplier() {
        let estimate = estimate(10, 2, false);
        assert_eq!(estimate.max, FLOOR_EUR + 2 * PER_VIOLATION_EUR);
    }
}

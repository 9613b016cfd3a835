//! Static reference tables shared by the detection engine, the audit module,
//! and the certificate builder: CMP/TMS fingerprints, tracking-domain
//! patterns, regulatory citations, and the country adequacy/vendor maps used
//! for data-residency classification.
//!
//! These tables are hand-curated and versioned with the crate; they are not
//! fetched at runtime. A signature miss degrades detection confidence rather
//! than failing the scan.

/// One fingerprint a CMP or TMS can be recognized by, across the content,
/// request, and DOM evidence kinds.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub vendor: &'static str,
    pub pattern: &'static str,
    pub weight: u32,
}

/// Known Consent Management Platforms, matched against page content and
/// inline scripts. Weight follows the distilled scoring rule: content match
/// counts double a bare request match.
pub const CMP_SIGNATURES: &[Signature] = &[
    Signature { vendor: "OneTrust", pattern: "optanon", weight: 2 },
    Signature { vendor: "OneTrust", pattern: "onetrust", weight: 2 },
    Signature { vendor: "Cookiebot", pattern: "cookiebot", weight: 2 },
    Signature { vendor: "Cookiebot", pattern: "CookieConsent", weight: 2 },
    Signature { vendor: "TrustArc", pattern: "trustarc", weight: 2 },
    Signature { vendor: "TrustArc", pattern: "truste", weight: 2 },
    Signature { vendor: "Quantcast Choice", pattern: "__tcfapi", weight: 2 },
    Signature { vendor: "Quantcast Choice", pattern: "quantcast", weight: 2 },
    Signature { vendor: "Didomi", pattern: "didomi", weight: 2 },
    Signature { vendor: "Usercentrics", pattern: "usercentrics", weight: 2 },
    Signature { vendor: "Sourcepoint", pattern: "sp_consent", weight: 2 },
    Signature { vendor: "Sourcepoint", pattern: "sourcepoint", weight: 2 },
    Signature { vendor: "Osano", pattern: "osano", weight: 2 },
    Signature { vendor: "Iubenda", pattern: "iubenda", weight: 2 },
    Signature { vendor: "Complianz", pattern: "complianz", weight: 2 },
    Signature { vendor: "CookieYes", pattern: "cookieyes", weight: 2 },
];

/// Known Tag Management Systems. TMS detection fires a priority rule when
/// `dataLayer` is present alongside a GTM container script, overriding
/// weaker partial matches.
pub const TMS_SIGNATURES: &[Signature] = &[
    Signature { vendor: "Google Tag Manager", pattern: "googletagmanager.com/gtm.js", weight: 3 },
    Signature { vendor: "Google Tag Manager", pattern: "dataLayer", weight: 2 },
    Signature { vendor: "Adobe Launch", pattern: "assets.adobedtm.com", weight: 3 },
    Signature { vendor: "Tealium", pattern: "tags.tiqcdn.com", weight: 3 },
    Signature { vendor: "Tealium", pattern: "utag.js", weight: 2 },
    Signature { vendor: "Segment", pattern: "cdn.segment.com", weight: 3 },
    Signature { vendor: "Matomo Tag Manager", pattern: "container_", weight: 2 },
];

/// Request-domain patterns strongly associated with cross-site tracking;
/// matched requests that land in a pre-consent window raise the violation
/// count even absent a recognized CMP/TMS.
pub const TRACKING_DOMAIN_PATTERNS: &[&str] = &[
    "doubleclick.net",
    "google-analytics.com",
    "googlesyndication.com",
    "facebook.com/tr",
    "connect.facebook.net",
    "analytics.tiktok.com",
    "ads-twitter.com",
    "scorecardresearch.com",
    "adsrvr.org",
    "criteo.com",
    "outbrain.com",
    "taboola.com",
    "hotjar.com",
    "clarity.ms",
];

/// Regulatory citation, keyed by the short code used throughout
/// `AuditFinding::regulatory_codes` and certificate violation entries.
#[derive(Debug, Clone, Copy)]
pub struct RegulatoryCitation {
    pub code: &'static str,
    pub article: &'static str,
    pub description: &'static str,
}

pub const REGULATORY_CITATIONS: &[RegulatoryCitation] = &[
    RegulatoryCitation {
        code: "GDPR-7.3",
        article: "Article 7(3)",
        description: "Withdrawing consent must be as easy as giving it",
    },
    RegulatoryCitation {
        code: "GDPR-4.11",
        article: "Article 4(11)",
        description: "Consent must be freely given, specific, informed, unambiguous",
    },
    RegulatoryCitation {
        code: "GDPR-13",
        article: "Article 13",
        description: "Information to be provided where personal data are collected",
    },
    RegulatoryCitation {
        code: "GDPR-44",
        article: "Article 44",
        description: "General principle for cross-border data transfers",
    },
    RegulatoryCitation {
        code: "CCPA-1798.135",
        article: "Cal. Civ. Code 1798.135",
        description: "Right to opt-out of sale/sharing, including Global Privacy Control",
    },
    RegulatoryCitation {
        code: "EDPB-GL03",
        article: "EDPB Guidelines 03/2022",
        description: "Dark patterns in social media platform interfaces",
    },
    RegulatoryCitation {
        code: "EAA-2019-882",
        article: "Directive (EU) 2019/882",
        description: "Accessibility requirements for products and services",
    },
];

pub fn citation(code: &str) -> Option<&'static RegulatoryCitation> {
    REGULATORY_CITATIONS.iter().find(|c| c.code == code)
}

/// ISO 3166-1 alpha-2 codes of EEA member states, for `Adequacy::Eea`.
pub const EEA_COUNTRY_CODES: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IS", "IE",
    "IT", "LV", "LI", "LT", "LU", "MT", "NL", "NO", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

/// Countries the European Commission has recognized as providing adequate
/// protection, for `Adequacy::Adequate`. Excludes EEA members, which are
/// classified `Eea` regardless of this list.
pub const ADEQUATE_COUNTRY_CODES: &[&str] = &[
    "AD", "AR", "CA", "FO", "GG", "IL", "IM", "JP", "JE", "NZ", "CH", "UY", "GB", "KR",
];

/// Known vendor -> primary processing country, used before falling back to a
/// geo-IP lookup. Reduces load on the geo-IP cache for the handful of
/// ad-tech vendors responsible for most third-party requests.
pub const VENDOR_COUNTRY_MAP: &[(&str, &str)] = &[
    ("doubleclick.net", "US"),
    ("google-analytics.com", "US"),
    ("googlesyndication.com", "US"),
    ("facebook.com", "US"),
    ("connect.facebook.net", "US"),
    ("analytics.tiktok.com", "SG"),
    ("criteo.com", "FR"),
    ("hotjar.com", "MT"),
    ("clarity.ms", "US"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_lookup_finds_known_code() {
        let found = citation("GDPR-7.3").expect("GDPR-7.3 should be a known citation");
        assert_eq!(found.article, "Article 7(3)");
    }

    #[test]
    fn citation_lookup_misses_unknown_code() {
        assert!(citation("NOT-A-CODE").is_none());
    }

    #[test]
    fn eea_and_adequate_lists_are_disjoint() {
        for code in EEA_COUNTRY_CODES {
            assert!(
                !ADEQUATE_COUNTRY_CODES.contains(code),
                "{code} listed in both EEA and adequate country tables"
            );
        }
    }
}

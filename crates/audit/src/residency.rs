//! Data Residency: for each unique third-party request domain, resolve its
//! processing country and classify adequacy. Resolution order is the static
//! vendor map, then a geo-IP lookup, then `Unknown` — in that priority, so
//! well-known ad-tech domains never pay for a network round trip.

use scan_core::{Adequacy, DataResidencyInfo, Error, ErrorCode, TtlCache};
use std::sync::Arc;
use std::time::Duration;

pub type GeoIpCache = TtlCache<String, DataResidencyInfo>;

#[derive(Debug, serde::Deserialize)]
struct GeoIpResponse {
    status: String,
    country: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
    query: Option<String>,
}

pub struct GeoIpClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    cache: Arc<GeoIpCache>,
}

impl GeoIpClient {
    pub fn new(endpoint: impl Into<String>, timeout_ms: u64, cache: Arc<GeoIpCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: Duration::from_millis(timeout_ms),
            cache,
        }
    }

    /// Resolves `domain`'s processing country. Vendor-map hits never touch
    /// the network or the cache; everything else is cached, including
    /// `Unknown` results from a failed or timed-out lookup, so a single
    /// unreachable domain doesn't retry every scan.
    pub async fn resolve(&self, domain: &str) -> DataResidencyInfo {
        if let Some((_, country_code)) = scan_core::signatures::VENDOR_COUNTRY_MAP
            .iter()
            .find(|(vendor, _)| domain.ends_with(*vendor))
        {
            return DataResidencyInfo {
                request_domain: domain.to_string(),
                resolved_ip: None,
                country: None,
                country_code: Some(country_code.to_string()),
                adequacy: classify(Some(country_code)),
            };
        }

        if let Some(cached) = self.cache.get(&domain.to_string()) {
            return cached;
        }

        let info = self.lookup(domain).await.unwrap_or_else(|_| DataResidencyInfo {
            request_domain: domain.to_string(),
            resolved_ip: None,
            country: None,
            country_code: None,
            adequacy: Adequacy::Unknown,
        });

        self.cache.set(domain.to_string(), info.clone());
        info
    }

    async fn lookup(&self, domain: &str) -> Result<DataResidencyInfo, Error> {
        let url = format!(
            "{}/{}?fields=status,message,country,countryCode,query",
            self.endpoint.trim_end_matches('/'),
            domain
        );

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::new(ErrorCode::GeoLookupFailed, e.to_string()))?;

        let parsed: GeoIpResponse = response
            .json()
            .await
            .map_err(|e| Error::new(ErrorCode::GeoLookupFailed, e.to_string()))?;

        if parsed.status != "success" {
            return Err(Error::new(ErrorCode::GeoLookupFailed, "geo-IP lookup returned failure status"));
        }

        Ok(DataResidencyInfo {
            request_domain: domain.to_string(),
            resolved_ip: parsed.query,
            country: parsed.country,
            country_code: parsed.country_code.clone(),
            adequacy: classify(parsed.country_code.as_deref()),
        })
    }
}

pub fn classify(country_code: Option<&str>) -> Adequacy {
    match country_code {
        Some(code) if scan_core::signatures::EEA_COUNTRY_CODES.contains(&code) => Adequacy::Eea,
        Some(code) if scan_core::signatures::ADEQUATE_COUNTRY_CODES.contains(&code) => Adequacy::Adequate,
        Some(_) => Adequacy::NonAdequate,
        None => Adequacy::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_marks_eea_members() {
        assert_eq!(classify(Some("DE")), Adequacy::Eea);
    }

    #[test]
    fn classify_marks_recognized_adequate_countries() {
        assert_eq!(classify(Some("JP")), Adequacy::Adequate);
    }

    #[test]
    fn classify_marks_unrecognized_countries_non_adequate() {
        assert_eq!(classify(Some("US")), Adequacy::NonAdequate);
    }

    #[test]
    fn classify_falls_back_to_unknown() {
        assert_eq!(classify(None), Adequacy::Unknown);
    }
}

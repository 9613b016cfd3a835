//! Screenshot capture and inline-script extraction used during
//! `ExtractArtifacts` and to feed the AI HTML fallback.

use scan_browser::BrowserSession;
use scan_core::{ScreenshotRecord, Error};

pub async fn capture_screenshot(session: &BrowserSession) -> Result<ScreenshotRecord, Error> {
    let png = session.screenshot_png().await?;
    use base64::{engine::general_purpose::STANDARD, Engine};

    Ok(ScreenshotRecord {
        png_base64: STANDARD.encode(&png),
        sha256_hex: scan_core::utils::sha256_hex(&png),
        captured_at: chrono::Utc::now(),
    })
}

const INLINE_SCRIPT_PROBE: &str = r#"
(() => Array.from(document.querySelectorAll('script:not([src])'))
    .map(s => s.textContent || '')
    .join('\n'))()
"#;

pub async fn collect_inline_scripts(session: &BrowserSession) -> String {
    session.evaluate::<String>(INLINE_SCRIPT_PROBE).await.unwrap_or_default()
}

pub fn script_urls(requests: &[scan_core::CapturedRequest]) -> Vec<String> {
    requests
        .iter()
        .filter(|r| r.resource_type.to_lowercase().contains("script"))
        .map(|r| r.url.clone())
        .collect()
}

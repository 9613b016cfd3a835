//! Anti-Detection Profile: the UA string, headers, and init-script payload
//! that make a headless session present as an ordinary desktop Chrome tab
//! to the page under test.

use chromiumoxide::browser::{BrowserConfig, BrowserConfigBuilder};
use chromiumoxide::handler::viewport::Viewport;
use scan_core::ScanMode;
use std::collections::HashMap;

const DESKTOP_CHROME_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36";

const DEFAULT_VIEWPORT_WIDTH: u32 = 1366;
const DEFAULT_VIEWPORT_HEIGHT: u32 = 768;

/// Patches the properties a naive bot-detection script checks first:
/// `navigator.webdriver`, an empty `navigator.plugins`/`languages`, and a
/// missing `window.chrome` object are the three most common tells.
pub const STEALTH_INIT_SCRIPT: &str = r#"
(() => {
  Object.defineProperty(navigator, 'webdriver', { get: () => undefined });

  Object.defineProperty(navigator, 'plugins', {
    get: () => [1, 2, 3, 4, 5].map(() => ({ name: 'Chrome PDF Plugin' })),
  });

  Object.defineProperty(navigator, 'languages', {
    get: () => ['en-US', 'en'],
  });

  if (!window.chrome) {
    window.chrome = { runtime: {} };
  }

  const originalQuery = window.navigator.permissions.query;
  window.navigator.permissions.query = (parameters) =>
    parameters.name === 'notifications'
      ? Promise.resolve({ state: Notification.permission })
      : originalQuery(parameters);
})();
"#;

/// Headers applied to every navigation. `gpc` mode adds the `Sec-GPC: 1`
/// signal the Consent Interactor expects the page to honor without a click.
pub fn session_headers(mode: ScanMode) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Accept-Language".to_string(), "en-US,en;q=0.9".to_string());
    headers.insert(
        "Sec-Ch-Ua".to_string(),
        "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\"".to_string(),
    );
    headers.insert("Sec-Ch-Ua-Mobile".to_string(), "?0".to_string());
    headers.insert("Sec-Ch-Ua-Platform".to_string(), "\"Windows\"".to_string());

    if mode == ScanMode::Gpc {
        headers.insert("Sec-GPC".to_string(), "1".to_string());
    }

    headers
}

/// Builds the chromiumoxide launch configuration for one scan. `headless`
/// and `no_sandbox` come from `scan-core::Config`; `user_data_dir` is unique
/// per scan so concurrent sessions never share cookies or local storage.
pub fn build_browser_config(
    headless: bool,
    no_sandbox: bool,
    user_data_dir: &str,
) -> Result<BrowserConfig, String> {
    let mut builder: BrowserConfigBuilder = BrowserConfig::builder()
        .user_data_dir(user_data_dir)
        .viewport(Viewport {
            width: DEFAULT_VIEWPORT_WIDTH,
            height: DEFAULT_VIEWPORT_HEIGHT,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .arg(format!("--user-agent={DESKTOP_CHROME_UA}"))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-gpu")
        .arg("--disable-software-rasterizer");

    if headless {
        builder = builder.new_headless_mode();
    }
    if no_sandbox {
        builder = builder.no_sandbox();
    }

    builder.build()
}

pub fn desktop_user_agent() -> &'static str {
    DESKTOP_CHROME_UA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpc_mode_sets_sec_gpc_header() {
        let headers = session_headers(ScanMode::Gpc);
        assert_eq!(headers.get("Sec-GPC").map(String::as_str), Some("1"));
    }

    #[test]
    fn standard_mode_omits_sec_gpc_header() {
        let headers = session_headers(ScanMode::Standard);
        assert!(!headers.contains_key("Sec-GPC"));
    }

    #[test]
    fn stealth_script_undefines_webdriver() {
        assert!(STEALTH_INIT_SCRIPT.contains("navigator.webdriver"));
        assert!(STEALTH_INIT_SCRIPT.contains("undefined"));
    }
}

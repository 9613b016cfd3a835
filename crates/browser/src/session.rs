//! Browser Session: a single headless Chrome tab shaped by the Anti-Detection
//! Profile, held alive for the duration of one scan. Launch failure here is
//! fatal to the scan and is never retried at this layer.

use crate::profile::{self, STEALTH_INIT_SCRIPT};
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::js_protocol::runtime::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use scan_core::error::{Error, ErrorCode};
use scan_core::ScanMode;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A single scan's browser context: the launched process, its CDP event
/// pump, and the one page the scan navigates.
pub struct BrowserSession {
    #[allow(dead_code)]
    browser: Browser,
    #[allow(dead_code)]
    handler_task: JoinHandle<()>,
    pub page: Page,
    pub mode: ScanMode,
}

impl BrowserSession {
    /// Launches a fresh, isolated browser process for `scan_id` and opens a
    /// blank page shaped by the stealth init script and mode-specific
    /// headers. Any failure maps to the fatal `BrowserLaunchFailed` error —
    /// per the orchestrator's error-handling design, this layer never
    /// retries.
    pub async fn launch(
        scan_id: Uuid,
        mode: ScanMode,
        headless: bool,
        no_sandbox: bool,
    ) -> Result<Self, Error> {
        let user_data_dir = format!("/tmp/scan-chrome-{scan_id}");

        let config = profile::build_browser_config(headless, no_sandbox, &user_data_dir)
            .map_err(|e| Error::browser_launch_failed(e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::browser_launch_failed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(scan_id = %scan_id, error = %e, "CDP handler error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::browser_launch_failed(e.to_string()))?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_INIT_SCRIPT.to_string()))
            .await
            .map_err(|e| Error::browser_launch_failed(e.to_string()))?;

        Ok(Self {
            browser,
            handler_task,
            page,
            mode,
        })
    }

    /// Installs an additional init script, run before any page script on
    /// every subsequent navigation. Capture layers use this to inject their
    /// monkey-patches and the service-worker bootstrap.
    pub async fn add_init_script(&self, source: impl Into<String>) -> Result<(), Error> {
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(source.into()))
            .await
            .map_err(|e| Error::browser_launch_failed(e.to_string()))?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<(), Error> {
        self.page
            .goto(url)
            .await
            .map_err(|e| Error::new(ErrorCode::NavTimeout, e.to_string()))?;
        Ok(())
    }

    /// Evaluates arbitrary JS in the page context and deserializes the
    /// result. Used by the detection engine's DOM probe, the consent
    /// text-scan fallback, and the audit module's contrast/focus checks.
    pub async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T, Error> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| Error::new(ErrorCode::InternalError, e.to_string()))?
            .into_value()
            .map_err(|e| Error::new(ErrorCode::InternalError, e.to_string()))
    }

    /// Full serialized document HTML, used by detection's content scoring
    /// and the AI HTML fallback.
    pub async fn html(&self) -> Result<String, Error> {
        self.page
            .content()
            .await
            .map_err(|e| Error::new(ErrorCode::InternalError, e.to_string()))
    }

    pub async fn screenshot_png(&self) -> Result<Vec<u8>, Error> {
        self.page
            .screenshot(chromiumoxide::page::ScreenshotParams::builder().build())
            .await
            .map_err(|e| Error::new(ErrorCode::InternalError, e.to_string()))
    }

    pub async fn close(self) -> Result<(), Error> {
        self.page
            .close()
            .await
            .map_err(|e| Error::new(ErrorCode::InternalError, e.to_string()))?;
        Ok(())
    }
}

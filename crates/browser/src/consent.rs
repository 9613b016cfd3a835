//! Consent Interactor: locates a banner's accept control, waits for it to
//! become visible, clicks it with human pacing, and verifies the click took
//! effect. In `gpc` mode it never clicks — it only watches for an
//! acknowledgment, on the premise that `Sec-GPC: 1` should already have been
//! honored.

use crate::pacing;
use crate::session::BrowserSession;
use chrono::{DateTime, Utc};
use scan_core::ScanMode;
use std::time::Duration;

/// Ranked by specificity: the first selector that matches wins.
const RANKED_SELECTORS: &[&str] = &[
    "button[id*=uc-accept]",
    "button[data-testid*=accept]",
    "#usercentrics button:has-text(\"Akzeptieren\")",
    "#usercentrics button:has-text(\"Accept\")",
    "button:has-text(\"Alles akzeptieren\")",
    "button:has-text(\"Accept all\")",
];

/// Text-scan fallback phrases, matched case-insensitively against role=button
/// elements when no ranked selector hits.
const FALLBACK_PHRASES: &[&str] = &["alles akzeptieren", "accept all", "akzeptieren"];
const FALLBACK_MAX_LEN: usize = 50;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const WAIT_ATTEMPT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ConsentOutcome {
    pub consent_click_at: Option<DateTime<Utc>>,
    pub banner_seen: bool,
    /// Set when no suitable control was found or clickable; surfaces as the
    /// orchestrator's `BANNER_NOT_ACCEPTED` scan note.
    pub scan_note: Option<String>,
}

pub struct ConsentInteractor;

impl ConsentInteractor {
    /// Runs the locate -> wait -> click -> verify sequence in standard mode,
    /// or the wait-only observation in `gpc` mode.
    pub async fn interact(session: &BrowserSession, mode: ScanMode) -> ConsentOutcome {
        match mode {
            ScanMode::Gpc => Self::observe_gpc_acknowledgment(session).await,
            ScanMode::Standard => Self::locate_wait_click_verify(session).await,
        }
    }

    async fn locate_wait_click_verify(session: &BrowserSession) -> ConsentOutcome {
        let Some(selector) = Self::locate(session).await else {
            return ConsentOutcome {
                consent_click_at: None,
                banner_seen: false,
                scan_note: Some("BANNER_NOT_FOUND: no accept control located".to_string()),
            };
        };

        let banner_seen = Self::wait_visible(session, &selector).await;
        if !banner_seen {
            return ConsentOutcome {
                consent_click_at: None,
                banner_seen: false,
                scan_note: Some("BANNER_NOT_CLICKABLE: control never became visible".to_string()),
            };
        }

        pacing::pace_action().await;
        match Self::click(session, &selector).await {
            true => ConsentOutcome {
                consent_click_at: Some(Utc::now()),
                banner_seen: true,
                scan_note: None,
            },
            false => ConsentOutcome {
                consent_click_at: None,
                banner_seen: true,
                scan_note: Some("BANNER_NOT_CLICKABLE: click did not register".to_string()),
            },
        }
    }

    /// Queries the ranked selector list first; falls back to a text-scan
    /// heuristic over every `role=button` element, picking the shortest
    /// match under `FALLBACK_MAX_LEN` characters.
    async fn locate(session: &BrowserSession) -> Option<String> {
        for selector in RANKED_SELECTORS {
            let script = format!(
                "document.querySelector({:?}) !== null",
                selector
            );
            if session.evaluate::<bool>(&script).await.unwrap_or(false) {
                return Some((*selector).to_string());
            }
        }

        let script = format!(
            r#"(() => {{
                const phrases = {phrases};
                const candidates = Array.from(document.querySelectorAll('[role="button"], button'))
                    .map(el => el.textContent.trim())
                    .filter(text => text.length > 0 && text.length < {max_len}
                        && phrases.some(p => text.toLowerCase().includes(p)));
                candidates.sort((a, b) => a.length - b.length);
                return candidates.length > 0 ? candidates[0] : null;
            }})()"#,
            phrases = serde_json::to_string(FALLBACK_PHRASES).unwrap_or_default(),
            max_len = FALLBACK_MAX_LEN,
        );

        session
            .evaluate::<Option<String>>(&script)
            .await
            .ok()
            .flatten()
            .map(|text| format!("text:{text}"))
    }

    /// Polls visibility for up to `WAIT_TIMEOUT`, checking once per
    /// `WAIT_ATTEMPT` interval.
    async fn wait_visible(session: &BrowserSession, selector: &str) -> bool {
        let mut elapsed = Duration::ZERO;
        loop {
            if Self::is_visible(session, selector).await {
                return true;
            }
            if elapsed >= WAIT_TIMEOUT {
                return false;
            }
            tokio::time::sleep(WAIT_ATTEMPT).await;
            elapsed += WAIT_ATTEMPT;
        }
    }

    async fn is_visible(session: &BrowserSession, selector: &str) -> bool {
        let script = Self::visibility_probe(selector);
        session.evaluate::<bool>(&script).await.unwrap_or(false)
    }

    fn visibility_probe(selector: &str) -> String {
        if let Some(text) = selector.strip_prefix("text:") {
            format!(
                r#"(() => {{
                    const el = Array.from(document.querySelectorAll('[role="button"], button'))
                        .find(e => e.textContent.trim() === {text:?});
                    if (!el) return false;
                    const rect = el.getBoundingClientRect();
                    return rect.width > 0 && rect.height > 0;
                }})()"#
            )
        } else {
            format!(
                r#"(() => {{
                    const el = document.querySelector({selector:?});
                    if (!el) return false;
                    const rect = el.getBoundingClientRect();
                    return rect.width > 0 && rect.height > 0;
                }})()"#
            )
        }
    }

    /// Clicks through the page's own event dispatch first (closer to a real
    /// pointer event than chromiumoxide's low-level `Input.dispatchMouseEvent`
    /// would be without hit-testing); falls back to a synthetic `.click()`
    /// call if dispatch doesn't land.
    async fn click(session: &BrowserSession, selector: &str) -> bool {
        let script = if let Some(text) = selector.strip_prefix("text:") {
            format!(
                r#"(() => {{
                    const el = Array.from(document.querySelectorAll('[role="button"], button'))
                        .find(e => e.textContent.trim() === {text:?});
                    if (!el) return false;
                    el.dispatchEvent(new MouseEvent('click', {{ bubbles: true }}));
                    return true;
                }})()"#
            )
        } else {
            format!(
                r#"(() => {{
                    const el = document.querySelector({selector:?});
                    if (!el) return false;
                    el.dispatchEvent(new MouseEvent('click', {{ bubbles: true }}));
                    return true;
                }})()"#
            )
        };

        if session.evaluate::<bool>(&script).await.unwrap_or(false) {
            return true;
        }

        // Last resort: a plain `.click()` call, bypassing event dispatch.
        let fallback = if let Some(text) = selector.strip_prefix("text:") {
            format!(
                r#"(() => {{
                    const el = Array.from(document.querySelectorAll('[role="button"], button'))
                        .find(e => e.textContent.trim() === {text:?});
                    if (!el) return false;
                    el.click();
                    return true;
                }})()"#
            )
        } else {
            format!(
                r#"(() => {{
                    const el = document.querySelector({selector:?});
                    if (!el) return false;
                    el.click();
                    return true;
                }})()"#
            )
        };

        session.evaluate::<bool>(&fallback).await.unwrap_or(false)
    }

    /// `gpc` mode never clicks. It waits out the same window a standard-mode
    /// click-to-verify sequence would, leaving the GPC Visual Confirmation
    /// audit (scan-audit) to judge whether the page acknowledged the signal.
    async fn observe_gpc_acknowledgment(session: &BrowserSession) -> ConsentOutcome {
        let banner_seen = Self::locate(session).await.is_some();
        tokio::time::sleep(WAIT_ATTEMPT).await;
        ConsentOutcome {
            consent_click_at: None,
            banner_seen,
            scan_note: None,
        }
    }
}

//! Chromium engine using chromiumoxide.
//!
//! Two ways in: launch our own Chromium (headful by default, so the
//! filename prompt is usable), or connect to an already-running
//! browser's DevTools websocket so the user keeps their session.

use super::{Engine, NavigationResult, Tab};
use crate::error::SnipError;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::{Handler, HandlerConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// CDP command reply timeout for both the launch and connect paths.
///
/// The filename prompt blocks its evaluate call until the user answers,
/// so a reply can take minutes; chromiumoxide's 30-second default would
/// time the command out under the open modal and drop the late answer.
const CDP_REPLY_TIMEOUT: Duration = Duration::from_secs(600);

/// Handler settings for the connect path, carrying the raised reply
/// timeout that `launch` sets through its `BrowserConfig`.
fn handler_config() -> HandlerConfig {
    HandlerConfig {
        request_timeout: CDP_REPLY_TIMEOUT,
        ..Default::default()
    }
}

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. SNIPSAVE_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("SNIPSAVE_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.snipsave/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".snipsave/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".snipsave/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".snipsave/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".snipsave/chromium/chrome-linux64/chrome"),
                home.join(".snipsave/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    if let Ok(path) = which::which("google-chrome") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium-browser") {
        return Some(path);
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-backed engine.
pub struct ChromiumEngine {
    browser: Browser,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumEngine {
    /// Launch a Chromium instance.
    ///
    /// Headful unless asked otherwise: the export flow runs blocking
    /// prompt and alert modals, which headless Chromium auto-dismisses.
    pub async fn launch(headless: bool) -> Result<Self> {
        let chrome_path = find_chromium().ok_or(SnipError::ChromiumNotFound)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(CDP_REPLY_TIMEOUT)
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        builder = if headless {
            builder
                .arg("--headless=new")
                .arg("--disable-gpu")
                .arg("--no-sandbox")
                .arg("--disable-dev-shm-usage")
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        Ok(Self::wrap(browser, handler))
    }

    /// Connect to a running browser over its DevTools websocket
    /// (started with `--remote-debugging-port`).
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config())
            .await
            .map_err(|e| SnipError::Connection(e.to_string()))?;

        Ok(Self::wrap(browser, handler))
    }

    fn wrap(browser: Browser, mut handler: Handler) -> Self {
        // Spawn the CDP message pump
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Self {
            browser,
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Engine for ChromiumEngine {
    async fn new_tab(&self) -> Result<Box<dyn Tab>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumTab {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        // Browser is dropped when ChromiumEngine is dropped
        Ok(())
    }

    fn active_tabs(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium tab.
pub struct ChromiumTab {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

#[async_trait]
impl Tab for ChromiumTab {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_response)) => {
                // Wait for page to be loaded
                let _ = self.page.wait_for_navigation().await;

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn outer_html(&self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        let html: String = result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))?;

        Ok(html)
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{augment, page, scan};

    /// Test: both connection paths raise the CDP reply timeout well past
    /// the chromiumoxide default, which an open prompt modal outlives.
    #[test]
    fn test_reply_timeout_outlasts_an_open_prompt() {
        let cfg = handler_config();
        assert!(cfg.request_timeout > HandlerConfig::default().request_timeout);
        assert!(cfg.request_timeout >= Duration::from_secs(300));
        assert_eq!(cfg.request_timeout, CDP_REPLY_TIMEOUT);
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_bootstrap_and_attach_in_real_tab() {
        let engine = ChromiumEngine::launch(true)
            .await
            .expect("failed to launch Chromium");
        let mut tab = engine.new_tab().await.expect("failed to open tab");

        let nav = tab
            .navigate(
                "data:text/html,<div><button aria-label=\"Copy code\">Copy</button><pre><code>x = 1</code></pre></div>",
                10000,
            )
            .await
            .expect("navigation failed");
        assert!(nav.load_time_ms < 10000);

        let installed = tab
            .evaluate(&page::bootstrap_script())
            .await
            .expect("bootstrap failed");
        assert_eq!(installed.as_str(), Some("installed"));

        let raw = tab
            .evaluate(&scan::collect_document_script(false))
            .await
            .expect("collect failed");
        let collected: scan::CollectResult = serde_json::from_value(raw).expect("bad shape");
        let targets = scan::attach_targets(&collected.candidates);
        assert_eq!(targets.len(), 1);

        let attached = tab
            .evaluate(&augment::attach_script(&targets))
            .await
            .expect("attach failed");
        assert_eq!(attached.as_u64(), Some(1));

        // Second pass is a no-op
        let raw = tab
            .evaluate(&scan::collect_document_script(false))
            .await
            .expect("re-collect failed");
        let collected: scan::CollectResult = serde_json::from_value(raw).expect("bad shape");
        assert!(scan::attach_targets(&collected.candidates).is_empty());

        tab.close().await.expect("close failed");
        assert_eq!(engine.active_tabs(), 0);
        engine.shutdown().await.expect("shutdown failed");
    }
}

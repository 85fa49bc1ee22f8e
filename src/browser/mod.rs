//! Browser abstraction for driving a live tab.
//!
//! Defines the `Engine` and `Tab` traits that abstract over the
//! browser (currently Chromium via chromiumoxide). The watch loop and
//! exporter only ever see `dyn Tab`, which keeps them testable with a
//! scripted fake.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of navigating a tab to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can open tabs.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Open a new blank tab.
    async fn new_tab(&self) -> Result<Box<dyn Tab>>;
    /// Shut down the engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently open tabs.
    fn active_tabs(&self) -> usize;
}

/// A single live tab.
#[async_trait]
pub trait Tab: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page and return its value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;
    /// Snapshot the full page HTML.
    async fn outer_html(&self) -> Result<String>;
    /// The tab's current URL.
    async fn current_url(&self) -> Result<String>;
    /// Close this tab.
    async fn close(self: Box<Self>) -> Result<()>;
}

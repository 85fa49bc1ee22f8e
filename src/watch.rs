// Copyright 2026 Snipsave Contributors
// SPDX-License-Identifier: Apache-2.0

//! Watch loop — continuous, idempotent augmentation of a live tab.
//!
//! One task owns all page traffic. Each tick: re-check the URL against
//! the host rules, heal the in-page runtime if a navigation wiped it,
//! handle queued Save clicks, then scan whatever subtrees the mutation
//! observer queued. A full-document sweep runs on its own slower
//! cadence as a safety net and is skipped in-page while the tab is
//! hidden.
//!
//! Serializing everything on one task is not just simplicity: the
//! export flow opens blocking modals (prompt, alert), and a CDP
//! evaluate against a tab with an open modal does not return until the
//! modal closes. A second task talking to the same tab would deadlock
//! behind it.

use crate::augment;
use crate::browser::Tab;
use crate::events::{now_timestamp, EventBus, ScanScope, SnipEvent};
use crate::export::{self, ExportOutcome};
use crate::hosts::HostRules;
use crate::page;
use crate::scan::{self, CollectResult};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

const DEFAULT_DRAIN_MS: u64 = 300;
const DEFAULT_SWEEP_MS: u64 = 1500;

/// Cadence settings for the watch loop.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// How often to drain clicks and scan queued subtrees.
    pub drain_every: Duration,
    /// How often to run the full-document sweep.
    pub sweep_every: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            drain_every: Duration::from_millis(DEFAULT_DRAIN_MS),
            sweep_every: Duration::from_millis(DEFAULT_SWEEP_MS),
        }
    }
}

impl WatchConfig {
    /// Read cadence overrides from `SNIPSAVE_DRAIN_MS` and
    /// `SNIPSAVE_SWEEP_MS`, with floors that keep the tab responsive.
    pub fn from_env() -> Self {
        Self {
            drain_every: Duration::from_millis(
                read_env_u64("SNIPSAVE_DRAIN_MS", DEFAULT_DRAIN_MS).max(50),
            ),
            sweep_every: Duration::from_millis(
                read_env_u64("SNIPSAVE_SWEEP_MS", DEFAULT_SWEEP_MS).max(250),
            ),
        }
    }
}

/// Session counters, reported on `WatchStopped`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchStats {
    pub clicks_handled: u64,
    pub buttons_attached: u64,
}

/// Drives one tab until shutdown.
pub struct Watcher<'a> {
    tab: &'a dyn Tab,
    hosts: &'a HostRules,
    bus: &'a EventBus,
    cfg: WatchConfig,
    last_url: String,
    last_sweep: Instant,
    stats: WatchStats,
}

impl<'a> Watcher<'a> {
    pub fn new(tab: &'a dyn Tab, hosts: &'a HostRules, bus: &'a EventBus, cfg: WatchConfig) -> Self {
        Self {
            tab,
            hosts,
            bus,
            cfg,
            last_url: String::new(),
            last_sweep: Instant::now(),
            stats: WatchStats::default(),
        }
    }

    /// Run until `shutdown` is notified. Tick failures are logged and
    /// the loop keeps going; a transient CDP hiccup must not end the
    /// session.
    pub async fn run(mut self, shutdown: Arc<Notify>) -> Result<WatchStats> {
        let url = self.tab.current_url().await.unwrap_or_default();
        self.bus.emit(SnipEvent::WatchStarted {
            url: url.clone(),
            timestamp: now_timestamp(),
        });
        self.last_url = url;

        let mut ticker = tokio::time::interval(self.cfg.drain_every);
        // A prompt can hold one tick open for minutes; don't replay
        // the missed backlog afterwards.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    tracing::info!("watch loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::warn!("watch tick failed: {e:#}");
                    }
                }
            }
        }

        self.bus.emit(SnipEvent::WatchStopped {
            clicks_handled: self.stats.clicks_handled,
            buttons_attached: self.stats.buttons_attached,
        });
        Ok(self.stats)
    }

    /// One full pass over the tab. Public so the pieces can be driven
    /// without timers.
    pub async fn tick(&mut self) -> Result<()> {
        let url = self.tab.current_url().await.context("tab URL unavailable")?;
        if url != self.last_url {
            self.bus.emit(SnipEvent::PageChanged { url: url.clone() });
            self.last_url = url.clone();
        }
        if !self.hosts.allows(&url) {
            tracing::debug!("tick skipped: {url} is not an allowed host");
            return Ok(());
        }

        self.ensure_runtime(&url).await?;
        self.drain_clicks().await?;
        self.scan_subtrees().await?;

        if self.last_sweep.elapsed() >= self.cfg.sweep_every {
            self.scan_pass(&scan::collect_document_script(true), ScanScope::Document)
                .await?;
            self.last_sweep = Instant::now();
        }
        Ok(())
    }

    /// Session counters so far.
    pub fn stats(&self) -> WatchStats {
        self.stats
    }

    /// Probe for the in-page runtime and reinstall it when missing.
    ///
    /// Probing every tick is deliberate: a reload to the same URL
    /// replaces the document without changing what `current_url`
    /// reports, so URL comparison alone cannot detect the loss.
    async fn ensure_runtime(&mut self, url: &str) -> Result<()> {
        let present = self
            .tab
            .evaluate(&page::probe_script())
            .await?
            .as_bool()
            .unwrap_or(false);
        if present {
            return Ok(());
        }

        self.tab
            .evaluate(&page::bootstrap_script())
            .await
            .context("bootstrap injection failed")?;
        tracing::info!("in-page runtime installed on {url}");
        self.bus.emit(SnipEvent::RuntimeInstalled {
            url: url.to_string(),
        });

        // Fresh document: run the initial unscoped scan, visible or not.
        self.scan_pass(&scan::collect_document_script(false), ScanScope::Document)
            .await?;
        Ok(())
    }

    /// Handle every Save click queued since the last tick.
    async fn drain_clicks(&mut self) -> Result<()> {
        let raw = self.tab.evaluate(&page::drain_clicks_script()).await?;
        let ids: Vec<u64> = serde_json::from_value(raw).unwrap_or_default();
        for id in ids {
            self.bus.emit(SnipEvent::SaveClicked { control: id });
            self.stats.clicks_handled += 1;
            match export::dispatch_click(self.tab, id).await {
                Ok(ExportOutcome::Saved { filename, bytes }) => {
                    tracing::info!("saved {filename} ({bytes} bytes) from control {id}");
                    self.bus.emit(SnipEvent::SnippetSaved {
                        control: id,
                        filename,
                        bytes,
                    });
                }
                Ok(ExportOutcome::NoCode) => self.emit_abort(id, "no-code"),
                Ok(ExportOutcome::Cancelled) => self.emit_abort(id, "cancelled"),
                Ok(ExportOutcome::Stale) => self.emit_abort(id, "stale"),
                Err(e) => {
                    // Every SaveClicked gets a terminal event, even when
                    // the page round-trip itself failed.
                    tracing::warn!("export for control {id} failed: {e:#}");
                    self.emit_abort(id, "error");
                }
            }
        }
        Ok(())
    }

    fn emit_abort(&self, control: u64, reason: &str) {
        tracing::debug!("save on control {control} aborted: {reason}");
        self.bus.emit(SnipEvent::SaveAborted {
            control,
            reason: reason.to_string(),
        });
    }

    /// Scan the subtrees the mutation observer queued since last tick.
    async fn scan_subtrees(&mut self) -> Result<()> {
        let collected = self
            .scan_pass(&scan::collect_subtrees_script(), ScanScope::Subtree)
            .await?;
        if collected.overflow {
            tracing::debug!("added-node queue overflowed; forcing a full sweep");
            self.last_sweep = Instant::now()
                .checked_sub(self.cfg.sweep_every)
                .unwrap_or_else(Instant::now);
        }
        Ok(())
    }

    /// Run one collect script, classify the results, attach where
    /// needed. Emits a `ScanCompleted` event only for passes that
    /// changed the page.
    async fn scan_pass(&mut self, script: &str, scope: ScanScope) -> Result<CollectResult> {
        let raw = self.tab.evaluate(script).await?;
        let collected: CollectResult =
            serde_json::from_value(raw).context("collect result had unexpected shape")?;
        if collected.skipped {
            tracing::debug!("{} scan skipped by page", scope.as_str());
            return Ok(collected);
        }

        let targets = scan::attach_targets(&collected.candidates);
        let mut attached = 0;
        if !targets.is_empty() {
            let res = self.tab.evaluate(&augment::attach_script(&targets)).await?;
            attached = res.as_u64().unwrap_or(0) as usize;
            self.stats.buttons_attached += attached as u64;
        }

        tracing::debug!(
            "{} scan: {} buttons, {} new copy controls, {} attached",
            scope.as_str(),
            collected.candidates.len(),
            targets.len(),
            attached
        );
        if attached > 0 {
            self.bus.emit(SnipEvent::ScanCompleted {
                scope,
                buttons: collected.candidates.len(),
                matched: targets.len(),
                attached,
            });
        }
        Ok(collected)
    }
}

fn read_env_u64(name: &str, default_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_value)
}

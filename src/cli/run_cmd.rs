//! `snipsave run` — attach to a chat tab and keep Save buttons alive.

use crate::browser::chromium::ChromiumEngine;
use crate::browser::Engine;
use crate::cli::output::{self, Styled};
use crate::error::SnipError;
use crate::events::{EventBus, SnipEvent};
use crate::hosts::HostRules;
use crate::watch::{WatchConfig, Watcher};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Default page when no URL is given.
pub const DEFAULT_URL: &str = "https://chatgpt.com/";

/// Run the watch session until Ctrl-C.
pub async fn run(
    url: Option<&str>,
    connect: Option<&str>,
    headless: bool,
    allow_hosts: &[String],
    any_host: bool,
    nav_timeout_ms: u64,
) -> Result<()> {
    let s = Styled::new();

    let target = url.unwrap_or(DEFAULT_URL).to_string();
    url::Url::parse(&target).map_err(|e| SnipError::InvalidUrl {
        url: target.clone(),
        reason: e.to_string(),
    })?;

    let hosts = HostRules::new(allow_hosts.to_vec(), any_host);
    if !hosts.allows(&target) {
        return Err(SnipError::HostNotAllowed { url: target }.into());
    }

    if headless && connect.is_none() && !output::is_quiet() {
        eprintln!(
            "  {} headless Chromium auto-dismisses prompts; saves will be cancelled",
            s.warn_sym()
        );
    }

    let engine = match connect {
        Some(ws) => {
            info!("connecting to browser at {ws}");
            ChromiumEngine::connect(ws).await?
        }
        None => ChromiumEngine::launch(headless).await?,
    };

    let mut tab = engine.new_tab().await?;
    let spinner = (!output::is_quiet() && !output::is_json()).then(|| {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_message(format!("Opening {target}..."));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    });
    let nav = tab.navigate(&target, nav_timeout_ms).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let nav = nav.context("could not open the chat page")?;
    info!("page loaded: {} in {}ms", nav.final_url, nav.load_time_ms);

    let bus = EventBus::new(256);
    let mut rx = bus.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("event printer lagged by {n}");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    if !output::is_quiet() && !output::is_json() {
        eprintln!("  Press Ctrl-C to stop.");
    }

    // Ctrl-C ends the session
    let shutdown = Arc::new(Notify::new());
    let shutdown_signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown_signal.notify_one();
    });

    let watcher = Watcher::new(&*tab, &hosts, &bus, WatchConfig::from_env());
    let stats = watcher.run(shutdown).await?;
    info!(
        "session ended: {} clicks handled, {} buttons attached",
        stats.clicks_handled, stats.buttons_attached
    );

    if let Err(e) = tab.close().await {
        warn!("tab close failed: {e:#}");
    }
    engine.shutdown().await?;

    drop(bus);
    let _ = printer.await;
    Ok(())
}

/// Print one event, honoring `--json` and `--quiet`.
fn print_event(event: &SnipEvent) {
    if output::is_json() {
        if let Ok(value) = serde_json::to_value(event) {
            output::print_json(&value);
        }
        return;
    }
    if output::is_quiet() {
        return;
    }
    let s = Styled::new();
    match event {
        SnipEvent::WatchStarted { url, .. } => {
            eprintln!("  {} Watching {url}", s.ok_sym());
        }
        SnipEvent::RuntimeInstalled { .. } => {
            eprintln!("  {} page runtime installed", s.ok_sym());
        }
        SnipEvent::PageChanged { url } => {
            eprintln!("  {}", s.dim(&format!("page changed: {url}")));
        }
        SnipEvent::ScanCompleted {
            scope, attached, ..
        } => {
            eprintln!(
                "  {} {attached} Save button(s) added ({})",
                s.ok_sym(),
                scope.as_str()
            );
        }
        SnipEvent::SnippetSaved {
            filename, bytes, ..
        } => {
            eprintln!("  {} saved {filename} ({bytes} bytes)", s.ok_sym());
        }
        SnipEvent::SaveAborted { control, reason } if reason == "no-code" => {
            eprintln!("  {} no code found (control {control})", s.warn_sym());
        }
        // Clicks, cancellations and stale drops stay quiet in human
        // output; they are visible with --json or --verbose.
        SnipEvent::SaveClicked { .. } | SnipEvent::SaveAborted { .. } => {}
        SnipEvent::WatchStopped {
            clicks_handled,
            buttons_attached,
        } => {
            eprintln!(
                "  {} stopped: {clicks_handled} click(s) handled, {buttons_attached} button(s) attached",
                s.ok_sym()
            );
        }
    }
}

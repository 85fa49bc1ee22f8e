//! `snipsave scan` — one-shot report of copy controls on a page.
//!
//! Read-only: collects and classifies, attaches nothing. Useful for
//! checking whether the heuristics still match after a host-page
//! redesign.

use crate::browser::chromium::ChromiumEngine;
use crate::browser::Engine;
use crate::cli::output::{self, Styled};
use crate::cli::run_cmd::DEFAULT_URL;
use crate::error::SnipError;
use crate::hosts::HostRules;
use crate::page;
use crate::scan::{self, CollectResult};
use anyhow::{Context, Result};

pub async fn run(
    url: Option<&str>,
    connect: Option<&str>,
    headful: bool,
    allow_hosts: &[String],
    any_host: bool,
    nav_timeout_ms: u64,
) -> Result<()> {
    let s = Styled::new();

    let url = url.unwrap_or(DEFAULT_URL);
    url::Url::parse(url).map_err(|e| SnipError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let hosts = HostRules::new(allow_hosts.to_vec(), any_host);
    if !hosts.allows(url) {
        return Err(SnipError::HostNotAllowed {
            url: url.to_string(),
        }
        .into());
    }

    let engine = match connect {
        Some(ws) => ChromiumEngine::connect(ws).await?,
        None => ChromiumEngine::launch(!headful).await?,
    };
    let mut tab = engine.new_tab().await?;
    tab.navigate(url, nav_timeout_ms)
        .await
        .context("could not open the page")?;

    tab.evaluate(&page::bootstrap_script())
        .await
        .context("bootstrap injection failed")?;
    let raw = tab
        .evaluate(&scan::collect_document_script(false))
        .await
        .context("collect failed")?;
    let collected: CollectResult =
        serde_json::from_value(raw).context("collect result had unexpected shape")?;

    let controls: Vec<_> = collected
        .candidates
        .iter()
        .filter(|c| scan::is_copy_control(&c.aria, &c.text))
        .collect();

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "url": url,
            "buttons": collected.candidates.len(),
            "copy_controls": controls
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.id,
                        "aria": c.aria,
                        "text": clean(&c.text),
                        "attached": c.attached,
                    })
                })
                .collect::<Vec<_>>(),
        }));
    } else if !output::is_quiet() {
        println!("Scanned {url}");
        println!(
            "  {} button(s) total, {} copy control(s)",
            collected.candidates.len(),
            controls.len()
        );
        for c in &controls {
            println!("  - #{} aria={:?} text={:?}", c.id, c.aria, clean(&c.text));
        }
        if controls.is_empty() {
            println!("  {} no copy controls found", s.warn_sym());
        }
    }

    tab.close().await?;
    engine.shutdown().await?;
    Ok(())
}

/// Collapse whitespace and bound button text for display.
fn clean(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > 40 {
        let short: String = collapsed.chars().take(40).collect();
        format!("{short}...")
    } else {
        collapsed
    }
}

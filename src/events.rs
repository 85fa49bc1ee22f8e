// Copyright 2026 Snipsave Contributors
// SPDX-License-Identifier: Apache-2.0

//! Snipsave event bus — typed events from the watch loop.
//!
//! A `tokio::sync::broadcast` channel carrying [`SnipEvent`] values.
//! The CLI printer subscribes for human or JSON-line output; any other
//! consumer can subscribe independently. With no subscribers, events
//! are silently dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which collection pass produced a scan event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanScope {
    /// Scoped to subtrees the mutation observer queued.
    Subtree,
    /// Unscoped full-document sweep.
    Document,
}

impl ScanScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subtree => "subtree",
            Self::Document => "document",
        }
    }
}

/// Every event snipsave emits. Serialized to JSON for `--json` output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SnipEvent {
    // ── Session Events ────────────────────
    /// Watching began on this tab.
    WatchStarted { url: String, timestamp: String },
    /// The in-page runtime was (re)installed, typically after a
    /// navigation wiped the previous document.
    RuntimeInstalled { url: String },
    /// The tab's URL changed since the last tick.
    PageChanged { url: String },
    /// Watching ended.
    WatchStopped {
        clicks_handled: u64,
        buttons_attached: u64,
    },

    // ── Scan Events ───────────────────────
    /// A collection pass ran. `matched` counts copy controls found,
    /// `attached` how many Save buttons this pass inserted.
    ScanCompleted {
        scope: ScanScope,
        buttons: usize,
        matched: usize,
        attached: usize,
    },

    // ── Save Events ───────────────────────
    /// A Save button was clicked.
    SaveClicked { control: u64 },
    /// A download was triggered.
    SnippetSaved {
        control: u64,
        filename: String,
        bytes: usize,
    },
    /// A click ended without a download. Reason is one of `no-code`,
    /// `cancelled`, `stale`, `error`.
    SaveAborted { control: u64, reason: String },
}

/// The central event bus.
///
/// The watch loop emits, consumers subscribe for a stream of all
/// events.
pub struct EventBus {
    sender: broadcast::Sender<SnipEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: SnipEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SnipEvent> {
        self.sender.subscribe()
    }
}

/// ISO-8601 timestamp for the current instant.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

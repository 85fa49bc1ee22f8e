//! Typed setup errors for the snipsave binary.
//!
//! Failures while a watch session is live are reported through
//! [`anyhow`] with context; this enum covers the conditions worth
//! matching on before a session starts.

use thiserror::Error;

/// Errors that prevent a session from starting.
#[derive(Debug, Error)]
pub enum SnipError {
    /// No usable Chromium binary was found on this machine.
    #[error("Chromium not found. Run `snipsave install` or set SNIPSAVE_CHROMIUM_PATH")]
    ChromiumNotFound,

    /// The target URL is not on a recognized chat host.
    #[error("refusing to attach to {url}: not an allowed chat host (use --allow-host or --any-host)")]
    HostNotAllowed { url: String },

    /// Connecting to an already-running browser failed.
    #[error("browser connection failed: {0}")]
    Connection(String),

    /// The target URL could not be parsed at all.
    #[error("invalid target URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

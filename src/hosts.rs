//! Host gate — which pages snipsave will attach to.
//!
//! The in-page runtime only belongs on the chat application it was
//! written for. The watch loop checks the tab's URL against these
//! rules every tick, so a navigation away from the chat host pauses
//! all injection until the user navigates back.

use url::Url;

/// Hosts snipsave recognizes out of the box.
pub const DEFAULT_HOSTS: &[&str] = &["chatgpt.com", "chat.openai.com"];

/// Allow-list policy for attachable pages.
#[derive(Debug, Clone, Default)]
pub struct HostRules {
    extra: Vec<String>,
    any: bool,
}

impl HostRules {
    /// Build rules from `--allow-host` values and the `--any-host` flag.
    pub fn new(extra: impl IntoIterator<Item = String>, any: bool) -> Self {
        Self {
            extra: extra.into_iter().map(|h| h.to_lowercase()).collect(),
            any,
        }
    }

    /// Whether a page at this URL may be augmented.
    ///
    /// Default hosts match exactly (plus any `openai.com` subdomain)
    /// and require https. User-supplied extra hosts also accept plain
    /// http, so local fixture pages work. Anything unparseable or
    /// hostless (about:blank, chrome pages) is denied.
    pub fn allows(&self, url_str: &str) -> bool {
        if self.any {
            return true;
        }
        let Ok(url) = Url::parse(url_str) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        match url.scheme() {
            "https" => {}
            "http" if self.extra.iter().any(|e| e == host) => return true,
            _ => return false,
        }
        if DEFAULT_HOSTS.contains(&host) || host.ends_with(".openai.com") {
            return true;
        }
        self.extra.iter().any(|e| e == host)
    }
}

// Copyright 2026 Snipsave Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-page runtime — the JavaScript side of snipsave.
//!
//! A single bootstrap script installs `window.__snipsave` into the
//! attached tab: a mutation observer that queues added DOM subtrees, a
//! click queue filled by the Save buttons, and the stylesheet the
//! buttons use. Everything else (classification, extraction, naming)
//! stays on the Rust side; the page only accumulates work for the
//! watch loop to drain.
//!
//! ## Security: JS string injection
//!
//! Every dynamic value placed inside a script goes through
//! [`sanitize_js_string`] and is injected only into string literal
//! positions, never into code positions.

/// Name of the page-global state object (`window.__snipsave`).
pub const STATE_GLOBAL: &str = "__snipsave";

/// Attribute carrying the stable per-button id assigned on first sight.
pub const ID_ATTR: &str = "data-snipsave-id";

/// Marker attribute set once a Save button has been inserted.
pub const ATTACHED_ATTR: &str = "data-snipsave-attached";

/// Element id of the injected stylesheet.
pub const STYLE_ID: &str = "snipsave-style";

/// Class shared by every injected Save button.
pub const BUTTON_CLASS: &str = "snipsave-btn";

/// Added-node queue cap. Past this the drain result reports overflow
/// and the watch loop falls back to a full-document sweep.
const DIRTY_QUEUE_CAP: usize = 4096;

/// Build the bootstrap script that installs the in-page runtime.
///
/// Idempotent: returns `"present"` without touching the page when the
/// state object already exists, `"installed"` on first run. Re-running
/// it after a navigation wiped the page is how the watch loop heals.
pub fn bootstrap_script() -> String {
    format!(
        r#"(() => {{
    if (window.{state}) {{ return 'present'; }}
    const st = {{ nextId: 1, dirty: [], dirtyOverflow: false, clicks: [] }};
    window.{state} = st;

    const style = document.createElement('style');
    style.id = '{style_id}';
    style.textContent = [
        '.{btn_class} {{ transition: background 120ms ease, border-color 120ms ease; }}',
        '@media (prefers-color-scheme: dark) {{',
        '  .{btn_class} {{',
        '    border-color: var(--border-medium, #4b5563);',
        '    background: var(--surface-elev-2, #1f2937);',
        '    color: var(--text-primary, #e5e7eb);',
        '  }}',
        '}}',
    ].join('\n');
    (document.head || document.documentElement).appendChild(style);

    const observer = new MutationObserver((mutations) => {{
        for (const m of mutations) {{
            if (m.type !== 'childList') {{ continue; }}
            for (const node of m.addedNodes) {{
                if (node.nodeType !== 1) {{ continue; }}
                if (st.dirty.length < {cap}) {{ st.dirty.push(node); }}
                else {{ st.dirtyOverflow = true; }}
            }}
        }}
    }});
    // Attribute churn on chat pages is constant; childList only.
    observer.observe(document.body || document.documentElement, {{
        childList: true,
        subtree: true,
        attributes: false,
    }});
    return 'installed';
}})()"#,
        state = STATE_GLOBAL,
        style_id = STYLE_ID,
        btn_class = BUTTON_CLASS,
        cap = DIRTY_QUEUE_CAP,
    )
}

/// Script that checks whether the in-page runtime is still installed.
///
/// Evaluates to a plain boolean. Navigations replace the document and
/// drop the state object, so the watch loop probes before every tick's
/// work.
pub fn probe_script() -> String {
    format!("typeof window.{STATE_GLOBAL} === 'object' && window.{STATE_GLOBAL} !== null")
}

/// Script that drains the queue of clicked Save-button ids.
///
/// Evaluates to an array of numeric ids, oldest first. Draining resets
/// the queue.
pub fn drain_clicks_script() -> String {
    format!(
        r#"(() => {{
    const st = window.{STATE_GLOBAL};
    if (!st) {{ return []; }}
    return st.clicks.splice(0, st.clicks.length);
}})()"#
    )
}

/// Sanitize a string for safe injection into a JavaScript string literal.
///
/// Escapes everything that could break out of a JS string context:
/// backslashes, all three quote styles, newlines, carriage returns and
/// tabs. Angle brackets become hex escapes so a reflected value can
/// never close a script tag, and null bytes are stripped.
pub fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}

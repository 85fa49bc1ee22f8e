//! Scanner — find the host page's "copy code" controls.
//!
//! Collection happens in the page: a script enumerates button elements
//! (across the whole document, or just the subtrees the mutation
//! observer queued), tags each with a stable numeric id on first sight,
//! and reports label/text/marker state back. Classification happens
//! here, in Rust, so the heuristic stays independently testable.

use crate::page::{ATTACHED_ATTR, ID_ATTR, STATE_GLOBAL};
use serde::{Deserialize, Serialize};

/// One button observed in the page, as reported by a collect script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable id assigned by the in-page runtime on first sight.
    pub id: u64,
    /// `aria-label` attribute, empty when absent.
    #[serde(default)]
    pub aria: String,
    /// Raw text content, untrimmed.
    #[serde(default)]
    pub text: String,
    /// Whether a Save button has already been attached.
    #[serde(default)]
    pub attached: bool,
}

/// Result of running a collect script in the page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectResult {
    /// True when collection did not run (runtime missing, or page hidden).
    #[serde(default)]
    pub skipped: bool,
    /// True when the added-node queue overflowed since the last drain.
    #[serde(default)]
    pub overflow: bool,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Classify a button as a copy-code affordance.
///
/// Best effort by design: the label check accepts any button whose
/// `aria-label` mentions copying (English or German UI), the text check
/// accepts the known "Copy code" phrasings plus a bare `copy`. The bare
/// comparison is against the raw lowercased text with no trimming, so
/// icon-decorated buttons fall through to the label check instead.
/// False negatives just mean no Save button; false positives degrade
/// downstream into a "no code found" notice.
pub fn is_copy_control(aria_label: &str, text: &str) -> bool {
    let aria = aria_label.to_lowercase();
    if aria.contains("kopieren") || aria.contains("copy") {
        return true;
    }
    let text = text.to_lowercase();
    text.contains("code kopieren") || text.contains("copy code") || text == "copy"
}

/// Ids of candidates that classify as copy controls and have no Save
/// button yet, in reported order.
pub fn attach_targets(candidates: &[Candidate]) -> Vec<u64> {
    candidates
        .iter()
        .filter(|c| !c.attached && is_copy_control(&c.aria, &c.text))
        .map(|c| c.id)
        .collect()
}

/// Build the full-document collect script.
///
/// With `skip_when_hidden` the script reports `skipped` while the tab
/// is not visible; the periodic sweep uses that, the post-navigation
/// initial scan does not.
pub fn collect_document_script(skip_when_hidden: bool) -> String {
    format!(
        r#"(() => {{
    const st = window.{state};
    if (!st) {{ return {{ skipped: true, overflow: false, candidates: [] }}; }}
    if ({skip_hidden} && document.hidden) {{ return {{ skipped: true, overflow: false, candidates: [] }}; }}
    const out = [];
    for (const b of document.querySelectorAll('button')) {{
        if (!b.getAttribute('{id_attr}')) {{ b.setAttribute('{id_attr}', String(st.nextId++)); }}
        out.push({{
            id: Number(b.getAttribute('{id_attr}')),
            aria: b.getAttribute('aria-label') || '',
            text: b.textContent || '',
            attached: b.getAttribute('{attached_attr}') === '1',
        }});
    }}
    return {{ skipped: false, overflow: false, candidates: out }};
}})()"#,
        state = STATE_GLOBAL,
        skip_hidden = skip_when_hidden,
        id_attr = ID_ATTR,
        attached_attr = ATTACHED_ATTR,
    )
}

/// Build the scoped collect script: drain the added-subtree queue and
/// enumerate buttons inside those subtrees only.
///
/// Detached roots are dropped (the host page removed them again before
/// the drain). Each button is reported once per drain even when several
/// queued roots contain it.
pub fn collect_subtrees_script() -> String {
    format!(
        r#"(() => {{
    const st = window.{state};
    if (!st) {{ return {{ skipped: true, overflow: false, candidates: [] }}; }}
    const roots = st.dirty.splice(0, st.dirty.length);
    const overflow = st.dirtyOverflow === true;
    st.dirtyOverflow = false;
    const seen = new Set();
    const out = [];
    const visit = (b) => {{
        if (!b.getAttribute('{id_attr}')) {{ b.setAttribute('{id_attr}', String(st.nextId++)); }}
        const id = Number(b.getAttribute('{id_attr}'));
        if (seen.has(id)) {{ return; }}
        seen.add(id);
        out.push({{
            id,
            aria: b.getAttribute('aria-label') || '',
            text: b.textContent || '',
            attached: b.getAttribute('{attached_attr}') === '1',
        }});
    }};
    for (const root of roots) {{
        if (!root.isConnected) {{ continue; }}
        if (root.tagName === 'BUTTON') {{ visit(root); }}
        if (typeof root.querySelectorAll === 'function') {{
            root.querySelectorAll('button').forEach(visit);
        }}
    }}
    return {{ skipped: false, overflow, candidates: out }};
}})()"#,
        state = STATE_GLOBAL,
        id_attr = ID_ATTR,
        attached_attr = ATTACHED_ATTR,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_aria_label() {
        assert!(is_copy_control("Copy code", ""));
        assert!(is_copy_control("copy", ""));
        assert!(is_copy_control("Code kopieren", ""));
        assert!(is_copy_control("In die Zwischenablage kopieren", ""));
    }

    #[test]
    fn test_classify_by_text() {
        assert!(is_copy_control("", "Copy code"));
        assert!(is_copy_control("", "Code kopieren"));
        assert!(is_copy_control("", "copy"));
        assert!(is_copy_control("", "Copy"));
    }

    #[test]
    fn test_bare_copy_text_is_not_trimmed() {
        // Icon buttons render whitespace around the word; those must
        // qualify via aria-label, not the bare-text equality.
        assert!(!is_copy_control("", "  Copy  "));
        assert!(is_copy_control("Copy code to clipboard", "  Copy  "));
    }

    #[test]
    fn test_classify_rejects_unrelated_buttons() {
        assert!(!is_copy_control("Send message", "Send"));
        assert!(!is_copy_control("", "Regenerate"));
        assert!(!is_copy_control("Edit", "Edit message"));
        assert!(!is_copy_control("", ""));
    }

    #[test]
    fn test_copy_inside_longer_text_needs_code_phrase() {
        // "copy" as a substring of button text is not enough on its own.
        assert!(!is_copy_control("", "Copy link"));
        assert!(is_copy_control("", "Copy code below"));
    }

    #[test]
    fn test_attach_targets_filters_attached_and_unmatched() {
        let candidates = vec![
            Candidate {
                id: 1,
                aria: "Copy code".into(),
                text: String::new(),
                attached: false,
            },
            Candidate {
                id: 2,
                aria: "Copy code".into(),
                text: String::new(),
                attached: true,
            },
            Candidate {
                id: 3,
                aria: "Send".into(),
                text: "Send".into(),
                attached: false,
            },
        ];
        assert_eq!(attach_targets(&candidates), vec![1]);
    }

    #[test]
    fn test_document_script_hidden_gate() {
        let sweep = collect_document_script(true);
        assert!(sweep.contains("if (true && document.hidden)"));
        let initial = collect_document_script(false);
        assert!(initial.contains("if (false && document.hidden)"));
    }

    #[test]
    fn test_subtree_script_drains_and_dedupes() {
        let js = collect_subtrees_script();
        assert!(js.contains("st.dirty.splice(0, st.dirty.length)"));
        assert!(js.contains("seen.has(id)"));
        assert!(js.contains("root.isConnected"));
    }

    #[test]
    fn test_collect_result_deserializes_from_page_shape() {
        let raw = r#"{"skipped":false,"overflow":false,"candidates":[{"id":7,"aria":"Copy code","text":"","attached":false}]}"#;
        let parsed: CollectResult = serde_json::from_str(raw).unwrap();
        assert!(!parsed.skipped);
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(parsed.candidates[0].id, 7);
    }
}

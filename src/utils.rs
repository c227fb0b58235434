use regex::{Captures, Regex};
use std::sync::LazyLock;

static INCOMPLETE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*$").unwrap());
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[^>]*>").unwrap());
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|(\d+));").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static TRUNCATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(…|\.\.\.)?\s*\[\+\d+ chars\]\s*$").unwrap());

/// Remove HTML tags and common entities from provider text.
///
/// Feed descriptions regularly arrive with inline markup (`<p>`, `<a>`,
/// `<img ... />`), named entities like `&nbsp;` and numeric ones like
/// `&#8217;`. Whitespace left behind by removed tags is collapsed.
///
/// # Example
///
/// ```ignore
/// let dirty = r#"<p>Markets&nbsp;rallied</p> on <strong>Friday</strong>."#;
/// assert_eq!(clean_html_tags(dirty), "Markets rallied on Friday.");
/// ```
pub fn clean_html_tags(text: &str) -> String {
    let cleaned = INCOMPLETE_TAG.replace_all(text, "");
    let cleaned = HTML_TAG.replace_all(&cleaned, "");

    let cleaned = cleaned.replace("&nbsp;", " ");
    let cleaned = cleaned.replace("&amp;", "&");
    let cleaned = cleaned.replace("&lt;", "<");
    let cleaned = cleaned.replace("&gt;", ">");
    let cleaned = cleaned.replace("&quot;", "\"");
    let cleaned = cleaned.replace("&#039;", "'");
    let cleaned = cleaned.replace("&apos;", "'");
    let cleaned = cleaned.replace("&rsquo;", "'");
    let cleaned = cleaned.replace("&lsquo;", "'");
    let cleaned = cleaned.replace("&mdash;", "—");
    let cleaned = cleaned.replace("&ndash;", "–");
    let cleaned = cleaned.replace("&hellip;", "…");

    let cleaned = NUMERIC_ENTITY.replace_all(&cleaned, decode_numeric_entity);
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");

    cleaned.trim().to_string()
}

/// Invalid code points are dropped.
fn decode_numeric_entity(caps: &Captures) -> String {
    let code = match (caps.get(1), caps.get(2)) {
        (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
        (None, Some(dec)) => dec.as_str().parse().ok(),
        (None, None) => None,
    };
    code.and_then(char::from_u32).map(String::from).unwrap_or_default()
}

/// Headline APIs cut `content` short and append `[+1234 chars]`; drop that tail.
pub fn strip_truncation_marker(text: &str) -> String {
    TRUNCATION_MARKER.replace(text, "").trim().to_string()
}

/// Shorten to at most `max` characters, ending with an ellipsis when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

use once_cell::sync::Lazy;
use regex::Regex;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid html pattern")
}

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| re(r"(?i)<\s*br\s*/?>|</\s*p\s*>|</\s*div\s*>"));
static LIST_ITEM_OPEN: Lazy<Regex> = Lazy::new(|| re(r"(?i)<\s*li\b[^>]*>"));
static LIST_ITEM_CLOSE: Lazy<Regex> = Lazy::new(|| re(r"(?i)</\s*li\s*>"));
static LIST_CONTAINER: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)<\s*(?:ul|ol)\b[^>]*>|</\s*(?:ul|ol)\s*>"));
// Elements, closing tags, comments and declarations. A `<` followed by a
// space or digit is text.
static TAG: Lazy<Regex> = Lazy::new(|| re(r"<(?:/?[A-Za-z]|[!?])[^>]*>"));
static HORIZONTAL_SPACE: Lazy<Regex> = Lazy::new(|| re(r"[ \t\u{a0}]+"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| re(r"\n\s*\n\s*\n+"));

/// Convert the rich text Azure DevOps stores in HTML fields (descriptions,
/// acceptance criteria) into readable plain text.
///
/// Breaks and block ends become newlines and list items become `- ` bullets
/// before the remaining markup is stripped. Entities are decoded last, so
/// escaped text like `a &lt; b` survives as `a < b`.
pub fn html_to_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let text = html.replace('\r', "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = LIST_ITEM_OPEN.replace_all(&text, "\n- ");
    let text = LIST_ITEM_CLOSE.replace_all(&text, "");
    let text = LIST_CONTAINER.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");

    // After stripping, so `&lt;Button&gt;` reads as `<Button>`.
    let text = html_escape::decode_html_entities(&text);

    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

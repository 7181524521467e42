//! Plain-text extraction for post bodies.

use std::sync::LazyLock;

use regex::Regex;

static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Reduce an HTML fragment to plain text.
///
/// Line breaks and paragraph ends become newlines, remaining tags are removed,
/// common entities are decoded, and the result is trimmed. `&amp;` is decoded
/// last so `&amp;lt;` yields the literal `&lt;`.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let with_breaks = BREAK_RE.replace_all(html, "\n");
    let text = TAG_RE.replace_all(&with_breaks, "");
    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    BLANK_LINES_RE
        .replace_all(decoded.trim(), "\n\n")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaks_and_entities() {
        assert_eq!(strip_html("a<br>b<br/>c"), "a\nb\nc");
        assert_eq!(
            strip_html("&lt;tag&gt; &quot;q&quot; it&#39;s"),
            "<tag> \"q\" it's"
        );
        assert_eq!(strip_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn empty_paragraphs_collapse_to_nothing() {
        assert_eq!(strip_html("  <p>  </p> "), "");
    }

    #[test]
    fn mastodon_status_markup() {
        let html = r#"<p>Ferry delays again <a href="https://aus.social/tags/sydney" class="mention hashtag">#<span>sydney</span></a></p><p>second para</p>"#;
        assert_eq!(strip_html(html), "Ferry delays again #sydney\nsecond para");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(strip_html("no markup here"), "no markup here");
    }
}

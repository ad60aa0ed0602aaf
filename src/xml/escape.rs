use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

// Static initialization: automata are built only once, thread-safe
static TEXT_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">"])
        .expect("Failed to build text escaper")
});

static ATTRIBUTE_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\""])
        .expect("Failed to build attribute escaper")
});

/// Escape character data for element text content.
///
/// Only `&`, `<` and `>` are replaced; quotes stay literal in text, which
/// keeps re-serialized bytes identical to what word processors emit.
///
/// # Examples
///
/// ```
/// use longan::xml::escape_text;
/// assert_eq!(escape_text("a & b"), "a &amp; b");
/// assert_eq!(escape_text("it's <b>"), "it's &lt;b&gt;");
/// ```
#[inline]
pub fn escape_text(s: &str) -> String {
    TEXT_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;"])
}

/// Escape character data for a double-quoted attribute value.
///
/// # Examples
///
/// ```
/// use longan::xml::escape_attribute;
/// assert_eq!(escape_attribute(r#"say "hi" & go"#), "say &quot;hi&quot; &amp; go");
/// ```
#[inline]
pub fn escape_attribute(s: &str) -> String {
    ATTRIBUTE_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&quot;"])
}

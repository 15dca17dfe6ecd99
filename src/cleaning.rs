//! Text clean-up rules for snapshot data.
//!
//! Historical cataloguing practice has left the snapshot with typographic
//! quotes, stray control characters, presentational markup and dangling
//! punctuation. The rules here remove those artefacts without touching the
//! words themselves. Cleaning never fails: when a rule would destroy a value
//! outright, the [`Cleaner`] keeps the original text and counts a warning.
//!
//! Hyphen runs are deliberately left alone so that `--` facet delimiters in
//! well-formed headings survive.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref QUOTES: Regex = Regex::new(
        r"[\x22\x{055A}\x{05F4}\x{2018}-\x{201F}\x{275B}-\x{275E}\x{FF07}\x60]"
    )
    .expect("valid regex");
    static ref CONTROLS: Regex =
        Regex::new(r"[\x00-\x1F\x{80}-\x{9F}\x{2028}\x{2029}]+").expect("valid regex");
    static ref SPACES: Regex =
        Regex::new(r"[\x{A0}\x{1680}\x{2000}-\x{200A}\x{202F}\x{205F}\x{3000}]+")
            .expect("valid regex");
    static ref DASHES: Regex =
        Regex::new(r"[\x{2010}-\x{2015}\x{2E3A}\x{2E3B}\x{FE58}\x{FE63}\x{FF0D}]")
            .expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref SELF_CLOSING: Regex = Regex::new(r"(?i)<[^/>]+/>").expect("valid regex");
    static ref ITEM_RUNS: Regex = Regex::new(r"[;\s.]+;").expect("valid regex");
    static ref PARAGRAPH_END: Regex = Regex::new(r"(?i)[.\s]*</p>\s*").expect("valid regex");
    static ref PRESENTATION_TAGS: Regex = Regex::new(
        r"(?i)[<\[]/*(b|br|emph|i|italic|italics|item|li|list|ol|p|sup|superscript|sub|subscript|ul)(\s+[^>\]]+)?\s*/*[>\]]"
    )
    .expect("valid regex");
    static ref SEMICOLON_PERIOD: Regex = Regex::new(r";\s+\.").expect("valid regex");
    static ref FAMILY: Regex = Regex::new(r", Family(,|$)").expect("valid regex");
    static ref FLOURISHED: Regex = Regex::new(r"(, |^)fl ([0-9])").expect("valid regex");
    static ref BORN: Regex = Regex::new(r"(, |^)b ([0-9]{4})").expect("valid regex");
    static ref DIED: Regex = Regex::new(r"(, |^)d ([0-9])").expect("valid regex");
    static ref CENTURY: Regex = Regex::new(r" cent$").expect("valid regex");
    static ref CIRCA: Regex = Regex::new(r"(, |- |^)c\s*([0-9]+)").expect("valid regex");
}

const LEADING_PUNCTUATION: &[char] = &['?', '$', '.', ',', ':', ';', '/', '\\', ']', ')', '}', ' '];
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ':', ';', '/', '\\', '[', '(', '{', ' '];

/// Clean a whole snapshot unit: normalise quotes, spaces and dashes, strip
/// control characters and presentational markup, collapse whitespace and
/// normalise to NFC.
#[must_use]
pub fn clean_unit(text: &str) -> String {
    let s = text.trim();
    if s.is_empty() || s == "None" {
        return String::new();
    }
    let s = QUOTES.replace_all(s, "'");
    let s = CONTROLS.replace_all(&s, "");
    let s = SPACES.replace_all(&s, " ");
    let s = DASHES.replace_all(&s, "-");
    let s = s
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&");
    let s = WHITESPACE.replace_all(s.trim(), " ");
    let s = SELF_CLOSING.replace_all(&s, "");
    let s = s.replace("</item>", "; ");
    let s = ITEM_RUNS.replace_all(&s, ";");
    let s = PARAGRAPH_END.replace_all(&s, ". ");
    let s = PRESENTATION_TAGS.replace_all(&s, " ");
    let s = SEMICOLON_PERIOD.replace_all(s.trim(), ".");
    let s = WHITESPACE.replace_all(s.trim(), " ");
    s.trim().nfc().collect()
}

/// Tidy a single value that has already been through [`clean_unit`]: trim
/// dangling punctuation from both ends and fix spacing around brackets and
/// commas.
///
/// With `keep_hyphens`, leading and trailing hyphens are preserved.
#[must_use]
pub fn quick_clean(text: &str, keep_hyphens: bool) -> String {
    if text.is_empty() || text == "None" {
        return String::new();
    }
    let s = SEMICOLON_PERIOD.replace_all(text, ".");
    let s = WHITESPACE.replace_all(s.trim(), " ");
    let s = s
        .trim()
        .trim_start_matches(|c| LEADING_PUNCTUATION.contains(&c) || (!keep_hyphens && c == '-'))
        .trim_end_matches(|c| TRAILING_PUNCTUATION.contains(&c) || (!keep_hyphens && c == '-'));
    let s = WHITESPACE.replace_all(s, " ");
    s.trim()
        .replace("( ", "(")
        .replace(" )", ")")
        .replace(" ,", ",")
        .replace(",,", ",")
        .replace(",.", ".")
        .replace(".,", ",")
        .replace(". [", " [")
        .replace(" : (", " (")
        .replace("= =", "=")
        .replace("= :", "=")
        .replace("+,", "+")
}

/// Tidy the string form of an authority heading: expand the cataloguing
/// abbreviations for flourished, born, died, century and circa.
#[must_use]
pub fn clean_authority(text: &str) -> String {
    let s = FAMILY.replace_all(text, " family");
    let s = FLOURISHED.replace_all(&s, "${1}active ${2}");
    let s = BORN.replace_all(&s, "${1}${2}-");
    let s = DIED.replace_all(&s, "${1}-${2}");
    let s = CENTURY.replace_all(&s, " century");
    let s = CIRCA.replace_all(&s, "${1}approximately ${2}");
    quick_clean(&s.replace(" - ", "-"), true)
}

/// Applies the value rules and counts the values it had to leave alone.
#[derive(Debug, Default)]
pub struct Cleaner {
    warnings: usize,
}

impl Cleaner {
    /// Create a cleaner with no warnings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean one value. If cleaning would reduce a non-empty value to
    /// nothing, the trimmed original is returned instead and a warning is
    /// counted.
    pub fn value(&mut self, raw: &str) -> String {
        let cleaned = quick_clean(raw, true);
        if cleaned.is_empty() && !raw.trim().is_empty() {
            self.warnings += 1;
            tracing::debug!(value = raw, "cleaning left value empty; keeping it as-is");
            return raw.trim().to_string();
        }
        cleaned
    }

    /// Clean an authority heading with the same fallback as [`Cleaner::value`].
    pub fn authority(&mut self, raw: &str) -> String {
        let cleaned = clean_authority(raw);
        if cleaned.is_empty() && !raw.trim().is_empty() {
            self.warnings += 1;
            return raw.trim().to_string();
        }
        cleaned
    }

    /// Clean a whole unit. If cleaning loses the unit's header brace, the
    /// original text is used and a warning is counted.
    pub fn unit(&mut self, raw: &str) -> String {
        let cleaned = clean_unit(raw);
        if raw.trim_start().starts_with('{') && !cleaned.starts_with('{') {
            self.warnings += 1;
            return raw.trim().to_string();
        }
        cleaned
    }

    /// Number of values left as-is so far.
    #[must_use]
    pub fn warnings(&self) -> usize {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_unit_quotes_and_spaces() {
        assert_eq!(
            clean_unit("  \u{201C}Hello\u{201D}\u{00A0}world\u{0007} "),
            "'Hello' world"
        );
    }

    #[test]
    fn test_clean_unit_keeps_facet_delimiter() {
        assert_eq!(clean_unit("Civil rights--History"), "Civil rights--History");
        assert_eq!(clean_unit("Civil rights\u{2014}\u{2014}History"), "Civil rights--History");
    }

    #[test]
    fn test_clean_unit_markup() {
        assert_eq!(
            clean_unit("<ScopeContent><p>First.</p><p>Second</p></ScopeContent>"),
            "<ScopeContent> First. Second. </ScopeContent>"
        );
        assert_eq!(clean_unit("a &amp; b<br/>"), "a & b");
        assert_eq!(clean_unit("<list><item>one</item><item>two</item></list>"), "one; two;");
    }

    #[test]
    fn test_clean_unit_nfc() {
        assert_eq!(clean_unit("Cafe\u{0301}"), "Caf\u{00E9}");
    }

    #[test]
    fn test_quick_clean_punctuation() {
        assert_eq!(quick_clean(" : Letters ; ", true), "Letters");
        assert_eq!(quick_clean("Title ( draft ) ,", true), "Title (draft)");
        assert_eq!(quick_clean("-1850-", true), "-1850-");
        assert_eq!(quick_clean("-1850-", false), "1850");
        assert_eq!(quick_clean("None", true), "");
    }

    #[test]
    fn test_clean_authority_abbreviations() {
        assert_eq!(clean_authority("Smith, John, fl 1850"), "Smith, John, active 1850");
        assert_eq!(clean_authority("Smith, John, b 1900"), "Smith, John, 1900-");
        assert_eq!(clean_authority("Smith, John, d 1950"), "Smith, John, -1950");
        assert_eq!(clean_authority("Smith, John, 18th cent"), "Smith, John, 18th century");
        assert_eq!(clean_authority("Smith, John, c 1850"), "Smith, John, approximately 1850");
        assert_eq!(clean_authority("Howard, Family"), "Howard family");
        assert_eq!(clean_authority("1800 - 1850"), "1800-1850");
    }

    #[test]
    fn test_cleaner_keeps_values_it_would_empty() {
        let mut cleaner = Cleaner::new();
        assert_eq!(cleaner.value("..."), "...");
        assert_eq!(cleaner.value("Title."), "Title");
        assert_eq!(cleaner.value(""), "");
        assert_eq!(cleaner.warnings(), 1);
    }
}

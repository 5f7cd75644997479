//! Text processing helpers for the lead bot
//!
//! Pure, deterministic functions with no side effects: normalization,
//! greeting detection, keyword extraction and the display-limit truncation
//! used when rendering interactive menus.

use unicode_normalization::UnicodeNormalization;

/// Greeting phrases matched against normalized input.
const GREETINGS: &[&str] = &["oi", "ola", "bom dia", "boa tarde", "boa noite", "salve"];

/// Stop words dropped during keyword extraction.
const STOPWORDS: &[&str] = &[
    "de", "do", "da", "e", "em", "com", "para", "por", "que", "o", "a", "os", "as",
];

/// Truncation marker appended when text is cut to fit a display limit.
const ELLIPSIS: char = '…';

/// Case-fold, strip diacritics and trim.
pub fn normalize(text: &str) -> String {
    strip_diacritics(text).trim().to_lowercase()
}

/// Remove combining marks after NFD decomposition ("olá" -> "ola").
pub fn strip_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect()
}

/// True if the normalized text contains any known greeting phrase.
pub fn is_greeting(text: &str) -> bool {
    let normalized = normalize(text);
    GREETINGS.iter().any(|g| normalized.contains(g))
}

/// Normalize, split on whitespace, drop short tokens and stop words.
pub fn extract_keywords(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .filter(|word| word.chars().count() > 2 && !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Truncate text to fit a platform display limit, accounting for a prefix.
///
/// Titles are capped at 20 units and descriptions at 72; the prefix (such as
/// the completion marker) counts against the limit. If `prefix + text` fits,
/// it is returned unchanged. Otherwise the text is cut so that
/// `prefix + cut + ELLIPSIS` lands exactly on the limit; when not even the
/// ellipsis fits, `prefix + ELLIPSIS` is hard-truncated to the limit.
pub fn truncate_for_menu(text: &str, max_length: usize, prefix: &str) -> String {
    let prefix_len = prefix.chars().count();
    let text_len = text.chars().count();

    if prefix_len + text_len <= max_length {
        return format!("{prefix}{text}");
    }

    let available = max_length.saturating_sub(prefix_len);
    if available <= 1 {
        // No room left for text; keep whatever fits of prefix + ellipsis.
        return format!("{prefix}{ELLIPSIS}")
            .chars()
            .take(max_length)
            .collect();
    }

    let cut: String = text.chars().take(available - 1).collect();
    format!("{prefix}{cut}{ELLIPSIS}")
}

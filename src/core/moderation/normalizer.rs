// Text normalization shared by content and banned words.
//
// Every comparison in the matcher happens on this canonical form, so the
// content and the banned terms must always go through the same function.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize free text for banned-word matching.
///
/// Lowercases, strips diacritics (NFD then drop combining marks), keeps only
/// `a-z`, `0-9` and whitespace, then collapses whitespace runs to a single
/// space and trims the ends.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for ch in lowered.nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !(ch.is_ascii_lowercase() || ch.is_ascii_digit()) {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }

    out
}

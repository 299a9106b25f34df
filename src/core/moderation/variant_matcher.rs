// Variant matcher - scores how likely a banned word hides in normalized text.
//
// Strategies, strongest first:
// - Exact substring
// - Letter-spaced substring ("s p a m")
// - Leetspeak literal variants ("sp4m", "s.p.a.m")
// - Flexible pattern (lookalike classes with optional separators)
// - Token-level Jaro similarity
//
// Pure functions only. Content is expected to be normalized already.

use super::normalizer::normalize;
use regex::{Regex, RegexBuilder};

// ============================================================================
// POLICY CONSTANTS
// ============================================================================

pub const EXACT_MATCH_SCORE: f64 = 100.0;
pub const SPACED_MATCH_SCORE: f64 = 95.0;
pub const LEET_VARIANT_SCORE: f64 = 85.0;
pub const FLEXIBLE_PATTERN_SCORE: f64 = 80.0;
/// Ceiling for fuzzy matches, scaled by the similarity itself.
pub const FUZZY_MAX_SCORE: f64 = 75.0;
/// Tokens must be strictly more similar than this to count.
pub const FUZZY_SIMILARITY_CUTOFF: f64 = 0.80;

/// Separators tolerated between letters by the flexible pattern.
const PATTERN_SEPARATOR: &str = r"[ .\-]*";

/// Separators used to build joined literal variants.
const JOIN_SEPARATORS: [char; 3] = [' ', '.', '-'];

/// Lookalike characters per letter. Shared by the literal variant generator
/// and the pattern builder so the two strategies never drift apart.
const LOOKALIKES: &[(char, &[char])] = &[
    ('a', &['@', '4']),
    ('e', &['3']),
    ('i', &['1', '!']),
    ('o', &['0']),
    ('s', &['5', '$']),
    ('t', &['7']),
    ('l', &['1']),
    ('g', &['9']),
];

/// Lookalikes for a single character (empty when it has none).
pub fn lookalikes(ch: char) -> &'static [char] {
    LOOKALIKES
        .iter()
        .find(|(letter, _)| *letter == ch)
        .map(|(_, subs)| *subs)
        .unwrap_or(&[])
}

// ============================================================================
// MATCH TYPES
// ============================================================================

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    Spaced,
    LeetVariant,
    FlexiblePattern,
    Fuzzy,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStrategy::Exact => write!(f, "Exact"),
            MatchStrategy::Spaced => write!(f, "Spaced"),
            MatchStrategy::LeetVariant => write!(f, "Leetspeak Variant"),
            MatchStrategy::FlexiblePattern => write!(f, "Flexible Pattern"),
            MatchStrategy::Fuzzy => write!(f, "Fuzzy"),
        }
    }
}

/// Best evidence found for one banned word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermMatch {
    pub strategy: MatchStrategy,
    pub score: f64,
}

// ============================================================================
// SCORING
// ============================================================================

/// Confidence (0-100) that `banned_word` appears in `normalized_content`.
pub fn score_term(normalized_content: &str, banned_word: &str) -> f64 {
    match match_term(normalized_content, banned_word) {
        Some(found) => {
            tracing::trace!(
                word = banned_word,
                strategy = %found.strategy,
                score = found.score,
                "Variant matched"
            );
            found.score
        }
        None => 0.0,
    }
}

/// Find the strongest strategy that matches, if any.
///
/// Strategies are tried in descending score order, so the first hit is also
/// the maximum across all of them.
fn match_term(normalized_content: &str, banned_word: &str) -> Option<TermMatch> {
    let word = normalize(banned_word);
    // Both sides are ASCII after normalization, so byte length is char length.
    //
    // This length guard covers every strategy, fuzzy included, and is
    // compared against the whole content rather than per token. So "palavr"
    // scores 0 against "palavra" while "palavr x" is long enough to reach
    // the fuzzy strategy and gets about 71. Changing it here changes all
    // five strategies at once.
    if word.is_empty() || word.len() > normalized_content.len() {
        return None;
    }

    let hit = |strategy, score| Some(TermMatch { strategy, score });

    if normalized_content.contains(&word) {
        return hit(MatchStrategy::Exact, EXACT_MATCH_SCORE);
    }

    if normalized_content.contains(&spaced_form(&word)) {
        return hit(MatchStrategy::Spaced, SPACED_MATCH_SCORE);
    }

    if leet_variants(&word)
        .iter()
        .any(|variant| normalized_content.contains(variant.as_str()))
    {
        return hit(MatchStrategy::LeetVariant, LEET_VARIANT_SCORE);
    }

    if flexible_pattern(&word).is_some_and(|re| re.is_match(normalized_content)) {
        return hit(MatchStrategy::FlexiblePattern, FLEXIBLE_PATTERN_SCORE);
    }

    let fuzzy = fuzzy_score(normalized_content, &word);
    if fuzzy > 0.0 {
        return hit(MatchStrategy::Fuzzy, fuzzy);
    }

    None
}

/// "spam" -> "s p a m"
pub fn spaced_form(word: &str) -> String {
    join_chars(word, ' ')
}

fn join_chars(word: &str, sep: char) -> String {
    let mut out = String::with_capacity(word.len() * 2);
    for (i, ch) in word.chars().enumerate() {
        if i > 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

/// Concrete alternate spellings of `word`.
///
/// Each (letter, lookalike) pair is applied to every occurrence of that letter
/// on its own; pairs are never combined. The plain word joined by each
/// separator is appended at the end.
pub fn leet_variants(word: &str) -> Vec<String> {
    let mut variants = Vec::new();

    for (letter, subs) in LOOKALIKES {
        if !word.contains(*letter) {
            continue;
        }
        for sub in subs.iter() {
            let variant: String = word
                .chars()
                .map(|ch| if ch == *letter { *sub } else { ch })
                .collect();
            variants.push(variant);
        }
    }

    for sep in JOIN_SEPARATORS {
        variants.push(join_chars(word, sep));
    }

    variants
}

/// Pattern where each letter accepts itself or a lookalike, with optional
/// separators between letters.
pub fn flexible_pattern(word: &str) -> Option<Regex> {
    let pattern = word
        .chars()
        .map(char_class)
        .collect::<Vec<_>>()
        .join(PATTERN_SEPARATOR);

    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(word, "Failed to build flexible pattern: {}", e);
            None
        }
    }
}

fn char_class(ch: char) -> String {
    let mut class = String::from("[");
    class.push_str(&regex::escape(&ch.to_string()));
    for sub in lookalikes(ch) {
        class.push_str(&regex::escape(&sub.to_string()));
    }
    class.push(']');
    class
}

/// Best fuzzy contribution over whitespace-delimited tokens, 0 when no token
/// clears the cutoff.
fn fuzzy_score(normalized_content: &str, word: &str) -> f64 {
    normalized_content
        .split_whitespace()
        .map(|token| jaro(token, word))
        .filter(|similarity| *similarity > FUZZY_SIMILARITY_CUTOFF)
        .map(|similarity| similarity * FUZZY_MAX_SCORE)
        .fold(0.0, f64::max)
}

/// Jaro similarity between two strings, in `[0, 1]`.
///
/// No common-prefix bonus (this is not Jaro-Winkler).
pub fn jaro(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if b_matched[j] || b[j] != *ca {
                continue;
            }
            a_matched[i] = true;
            b_matched[j] = true;
            matches += 1;
            break;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // Walk both sides' matched characters in order and count mismatches.
    let mut mismatched = 0usize;
    let mut k = 0usize;
    for (i, ca) in a.iter().enumerate() {
        if !a_matched[i] {
            continue;
        }
        while !b_matched[k] {
            k += 1;
        }
        if *ca != b[k] {
            mismatched += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let transpositions = mismatched as f64 / 2.0;
    (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions) / m) / 3.0
}

// ============================================================================
// TESTS
// ============================================================================

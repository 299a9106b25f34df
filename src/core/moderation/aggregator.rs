// Aggregator - turns per-term scores into a single moderation decision.

use super::moderation_models::{BannedTerm, ModerationResult};
use super::normalizer::normalize;
use super::variant_matcher::score_term;

/// A term is flagged only when its score is strictly above this.
pub const DETECTION_THRESHOLD: f64 = 70.0;

/// Score `content` against every banned term.
///
/// Deterministic and side-effect free: the same inputs always produce the
/// same result.
pub fn evaluate(content: &str, banned_terms: &[BannedTerm]) -> ModerationResult {
    if banned_terms.is_empty() {
        return ModerationResult::clean();
    }

    let normalized = normalize(content);
    let mut result = ModerationResult::clean();

    for term in banned_terms {
        let score = score_term(&normalized, &term.word);
        if score <= DETECTION_THRESHOLD {
            continue;
        }

        tracing::debug!(word = %term.word, score, "Banned term detected");

        result.flagged_words.push(term.word.clone());
        result.confidence = result.confidence.max(score);
        result.max_severity = result.max_severity.max(Some(term.severity));
    }

    result.is_restricted = !result.flagged_words.is_empty();
    result
}

//! Shared constants for the positional annotation format and transcription
//! cleanup.
//!
//! Every read/write path for the packed annotation strings goes through
//! [`crate::codec`]; this module only owns the separator characters and the
//! technical-notation cleanup applied to raw transcriptions before words are
//! counted. Word indices stored in annotation tokens refer to positions in
//! the *cleaned* transcription, so both sides must use the same cleanup.

use once_cell::sync::Lazy;
use regex::Regex;

/// Separates per-word tokens inside one packed annotation string.
pub const WORD_SEP: &str = "|";

/// Separates the word index from payload fields inside one token.
pub const PART_SEP: &str = ":";

/// Separates individual tags inside a tag string.
pub const TAG_SEP: &str = "-";

/// Separates alternate analyses packed into a single grammar token.
pub const OPTION_SEP: &str = "/";

/// Prefix marking lemmas the morphological analyzer could not find in its
/// dictionary.
pub const UNKNOWN_PREFIX: &str = "(unkn)_";

/// Display marker for word indices that carry no stored annotation.
pub const SKIPPED: &str = "<skipped>";

/// Technical notation used by transcribers: pauses, intonation marks,
/// bracketed notes and `unint.` (unintelligible) markers.
static TECH_NOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\.\.\.|\?|\[|\]|\.|!|un'?int\.?)+").expect("valid regex"));

/// Strip technical notation from a raw transcription.
///
/// The result is what word indices in annotation tokens refer to.
pub fn clean_transcription(transcription: &str) -> String {
    TECH_NOTATION
        .replace_all(transcription, "")
        .trim()
        .to_string()
}

/// Split a cleaned transcription into words.
///
/// Whitespace is the only word boundary: dialect transcriptions keep
/// word-internal apostrophes and hyphens as part of the word, and the
/// annotator-facing token count must match this split exactly.
pub fn words(cleaned: &str) -> impl Iterator<Item = &str> {
    cleaned.split_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_technical_notation() {
        assert_eq!(
            clean_transcription("nu... i stálo užó, da? [unint.]"),
            "nu i stálo užó, da"
        );
    }

    #[test]
    fn keeps_plain_words() {
        assert_eq!(clean_transcription("мама мыла раму"), "мама мыла раму");
    }

    #[test]
    fn word_split_matches_annotator_count() {
        let cleaned = clean_transcription("n'a óz'erъm! kto-to...");
        let words: Vec<&str> = words(&cleaned).collect();
        assert_eq!(words, vec!["n'a", "óz'erъm", "kto-to"]);
    }
}

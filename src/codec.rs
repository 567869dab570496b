//! Serialize/parse the positional annotation encoding.
//!
//! A time-aligned refinement tier stores one packed string per sentence.
//! The string is a `|`-separated list of tokens, each token addressing one
//! word of the cleaned transcription by zero-based index:
//!
//! - standardization token: `index:form`
//! - grammar token: `index:lemma_field:tag_field`
//!
//! A grammar token may carry several alternate analyses: both fields join
//! the per-analysis values with `/`, positionally, so analysis *k* is
//! `(lemma_k, tags_k)`. Index gaps are legal — a word with no token simply
//! has no annotation.
//!
//! Round-trip fidelity is a hard requirement: `decode(encode(m)) == m` for
//! every valid mapping, and any token that does not parse raises
//! [`CodecError::Malformed`] rather than being skipped.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::format::{OPTION_SEP, PART_SEP, SKIPPED, WORD_SEP};

static STANDARDIZATION_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(.+)$").expect("valid regex"));

static GRAMMAR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):([^:]+):(.+)$").expect("valid regex"));

/// The normalized (standard-orthography) form attached to one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardizationPayload {
    pub form: String,
}

impl StandardizationPayload {
    pub fn new(form: impl Into<String>) -> Self {
        Self { form: form.into() }
    }
}

/// One morphological reading of a word: a lemma and its packed tag string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarAnalysis {
    pub lemma: String,
    pub tags: String,
}

impl GrammarAnalysis {
    pub fn new(lemma: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            lemma: lemma.into(),
            tags: tags.into(),
        }
    }
}

/// The grammar annotation attached to one word.
///
/// Several analyses per word are permitted; an empty list is not a valid
/// payload (absence of annotation is expressed by absence of the index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarPayload {
    pub analyses: Vec<GrammarAnalysis>,
}

impl GrammarPayload {
    pub fn new(analyses: Vec<GrammarAnalysis>) -> Self {
        Self { analyses }
    }

    pub fn single(lemma: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            analyses: vec![GrammarAnalysis::new(lemma, tags)],
        }
    }
}

fn check_field(index: usize, field: &str, reserved: &[&'static str]) -> Result<(), CodecError> {
    for sep in reserved {
        if field.contains(sep) {
            return Err(CodecError::ReservedCharacter {
                index,
                field: field.to_string(),
                separator: sep,
            });
        }
    }
    Ok(())
}

/// Serialize a standardization mapping into one packed track string.
///
/// Tokens are emitted in index order, so equal mappings always serialize
/// to the same string.
pub fn encode_standardization(
    entries: &BTreeMap<usize, StandardizationPayload>,
) -> Result<String, CodecError> {
    let mut tokens = Vec::with_capacity(entries.len());
    for (index, payload) in entries {
        check_field(*index, &payload.form, &[WORD_SEP, PART_SEP])?;
        tokens.push(format!("{}{}{}", index, PART_SEP, payload.form));
    }
    Ok(tokens.join(WORD_SEP))
}

/// Parse a packed standardization track string.
pub fn decode_standardization(
    track_text: &str,
) -> Result<BTreeMap<usize, StandardizationPayload>, CodecError> {
    let mut entries = BTreeMap::new();
    for token in split_tokens(track_text) {
        let captures =
            STANDARDIZATION_TOKEN
                .captures(token)
                .ok_or_else(|| CodecError::Malformed {
                    token: token.to_string(),
                    reason: "expected 'index:form'".to_string(),
                })?;
        let index = parse_index(token, &captures[1])?;
        entries.insert(index, StandardizationPayload::new(&captures[2]));
    }
    Ok(entries)
}

/// Serialize a grammar mapping into one packed track string.
pub fn encode_grammar(entries: &BTreeMap<usize, GrammarPayload>) -> Result<String, CodecError> {
    let mut tokens = Vec::with_capacity(entries.len());
    for (index, payload) in entries {
        if payload.analyses.is_empty() {
            return Err(CodecError::EmptyPayload { index: *index });
        }
        let mut lemmas = Vec::with_capacity(payload.analyses.len());
        let mut tags = Vec::with_capacity(payload.analyses.len());
        for analysis in &payload.analyses {
            check_field(*index, &analysis.lemma, &[WORD_SEP, PART_SEP, OPTION_SEP])?;
            check_field(*index, &analysis.tags, &[WORD_SEP, PART_SEP, OPTION_SEP])?;
            lemmas.push(analysis.lemma.as_str());
            tags.push(analysis.tags.as_str());
        }
        tokens.push(format!(
            "{}{}{}{}{}",
            index,
            PART_SEP,
            lemmas.join(OPTION_SEP),
            PART_SEP,
            tags.join(OPTION_SEP)
        ));
    }
    Ok(tokens.join(WORD_SEP))
}

/// Parse a packed grammar track string.
pub fn decode_grammar(track_text: &str) -> Result<BTreeMap<usize, GrammarPayload>, CodecError> {
    let mut entries = BTreeMap::new();
    for token in split_tokens(track_text) {
        let captures = GRAMMAR_TOKEN
            .captures(token)
            .ok_or_else(|| CodecError::Malformed {
                token: token.to_string(),
                reason: "expected 'index:lemma:tags'".to_string(),
            })?;
        let index = parse_index(token, &captures[1])?;

        let lemmas: Vec<&str> = captures[2].split(OPTION_SEP).collect();
        let tags: Vec<&str> = captures[3].split(OPTION_SEP).collect();
        if lemmas.len() != tags.len() {
            return Err(CodecError::Malformed {
                token: token.to_string(),
                reason: format!(
                    "{} lemma alternative(s) against {} tag alternative(s)",
                    lemmas.len(),
                    tags.len()
                ),
            });
        }

        let analyses = lemmas
            .into_iter()
            .zip(tags)
            .map(|(lemma, tags)| GrammarAnalysis::new(lemma, tags))
            .collect();
        entries.insert(index, GrammarPayload::new(analyses));
    }
    Ok(entries)
}

/// Expand a standardization mapping to one form per expected word.
///
/// Words without an entry get the [`SKIPPED`] marker; callers iterating a
/// sentence by its word count use this to keep display columns aligned.
pub fn padded_forms(
    entries: &BTreeMap<usize, StandardizationPayload>,
    word_count: usize,
) -> Vec<String> {
    (0..word_count)
        .map(|i| {
            entries
                .get(&i)
                .map(|p| p.form.clone())
                .unwrap_or_else(|| SKIPPED.to_string())
        })
        .collect()
}

fn split_tokens(track_text: &str) -> impl Iterator<Item = &str> {
    track_text.split(WORD_SEP).filter(|t| !t.is_empty())
}

fn parse_index(token: &str, digits: &str) -> Result<usize, CodecError> {
    digits.parse().map_err(|_| CodecError::Malformed {
        token: token.to_string(),
        reason: format!("word index '{}' out of range", digits),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn std_map(entries: &[(usize, &str)]) -> BTreeMap<usize, StandardizationPayload> {
        entries
            .iter()
            .map(|(i, form)| (*i, StandardizationPayload::new(*form)))
            .collect()
    }

    #[test]
    fn standardization_round_trip() {
        let mapping = std_map(&[(0, "мама"), (1, "мыла"), (2, "раму")]);
        let encoded = encode_standardization(&mapping).unwrap();
        assert_eq!(encoded, "0:мама|1:мыла|2:раму");
        assert_eq!(decode_standardization(&encoded).unwrap(), mapping);
    }

    #[test]
    fn standardization_round_trip_with_gaps() {
        let mapping = std_map(&[(1, "стало"), (4, "озером")]);
        let encoded = encode_standardization(&mapping).unwrap();
        assert_eq!(encoded, "1:стало|4:озером");
        assert_eq!(decode_standardization(&encoded).unwrap(), mapping);
    }

    #[test]
    fn grammar_round_trip_single_analysis() {
        let mut mapping = BTreeMap::new();
        mapping.insert(0, GrammarPayload::single("мыть", "VERB-ipfv-pst-sg-f"));
        mapping.insert(2, GrammarPayload::single("рама", "NOUN-f-acc-sg"));

        let encoded = encode_grammar(&mapping).unwrap();
        assert_eq!(encoded, "0:мыть:VERB-ipfv-pst-sg-f|2:рама:NOUN-f-acc-sg");
        assert_eq!(decode_grammar(&encoded).unwrap(), mapping);
    }

    #[test]
    fn grammar_round_trip_multiple_analyses() {
        let mut mapping = BTreeMap::new();
        mapping.insert(
            1,
            GrammarPayload::new(vec![
                GrammarAnalysis::new("стать", "VERB-pfv-pst-sg-n"),
                GrammarAnalysis::new("стало", "NOUN-n-nom-sg"),
            ]),
        );

        let encoded = encode_grammar(&mapping).unwrap();
        assert_eq!(encoded, "1:стать/стало:VERB-pfv-pst-sg-n/NOUN-n-nom-sg");
        assert_eq!(decode_grammar(&encoded).unwrap(), mapping);
    }

    #[test]
    fn decode_rejects_malformed_token() {
        let err = decode_standardization("0:мама|мыла").unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
        insta::assert_snapshot!(
            err.to_string(),
            @"malformed annotation token 'мыла': expected 'index:form'"
        );
    }

    #[test]
    fn decode_rejects_mismatched_alternatives() {
        let err = decode_grammar("0:стать/стало:VERB-pfv").unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn decode_rejects_grammar_without_tags() {
        let err = decode_grammar("0:мыть").unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn encode_rejects_reserved_characters() {
        let mapping = std_map(&[(0, "ма|ма")]);
        let err = encode_standardization(&mapping).unwrap_err();
        assert!(matches!(err, CodecError::ReservedCharacter { .. }));
    }

    #[test]
    fn encode_rejects_empty_grammar_payload() {
        let mut mapping = BTreeMap::new();
        mapping.insert(3, GrammarPayload::new(Vec::new()));
        let err = encode_grammar(&mapping).unwrap_err();
        assert!(matches!(err, CodecError::EmptyPayload { index: 3 }));
    }

    #[test]
    fn padded_forms_mark_skipped_words() {
        let mapping = std_map(&[(0, "мама"), (2, "раму")]);
        assert_eq!(padded_forms(&mapping, 3), vec!["мама", "<skipped>", "раму"]);
    }
}

//! The morphological-analyzer boundary.
//!
//! The engine never invokes an analyzer process itself; callers plug one in
//! behind this trait (a pymorphy-style dictionary analyzer in production,
//! a fixed table in tests). Analyses come back in analyzer-native tag
//! vocabulary — the schema maps them onto surface tags.

use serde::{Deserialize, Serialize};

/// One scored analyzer reading of a word form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphAnalysis {
    /// Normal form proposed by the analyzer.
    pub lemma: String,
    /// Raw tag string in the analyzer's own vocabulary, with its own
    /// separators (commas, spaces, hyphens all occur in the wild).
    pub tags: String,
    /// Relative confidence in `[0, 1]`.
    pub score: f64,
    /// Whether the reading came from the analyzer's dictionary rather than
    /// a guessing fallback. Out-of-dictionary lemmas are marked with
    /// [`crate::format::UNKNOWN_PREFIX`] downstream.
    pub from_dictionary: bool,
}

impl MorphAnalysis {
    pub fn new(lemma: impl Into<String>, tags: impl Into<String>, score: f64) -> Self {
        Self {
            lemma: lemma.into(),
            tags: tags.into(),
            score,
            from_dictionary: true,
        }
    }

    pub fn out_of_dictionary(
        lemma: impl Into<String>,
        tags: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            from_dictionary: false,
            ..Self::new(lemma, tags, score)
        }
    }

    /// Split the raw tag string into individual analyzer grammemes.
    pub fn grammemes(&self) -> impl Iterator<Item = &str> {
        self.tags
            .split([',', ' ', '-'])
            .filter(|t| !t.is_empty())
    }
}

/// A source of morphological readings for single word forms.
pub trait MorphologicalAnalyzer {
    /// All readings for `word`, best first.
    fn analyses(&self, word: &str) -> Vec<MorphAnalysis>;
}

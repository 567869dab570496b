//! Compiling search form input into sentence predicates.
//!
//! Every filter field is independently optional. A predicate matches a
//! sentence when one of its words satisfies every present word-level
//! condition at once (element-match semantics: the conditions must hold on
//! the *same* word) and the sentence-level dialect restriction holds. An
//! entirely empty filter compiles to `None` — "no query" — so an
//! accidental empty form never dumps the whole corpus.

use serde::{Deserialize, Serialize};

use corpus_tiers::format::TAG_SEP;

use crate::document::{SentenceDocument, WordEntry};
use crate::store::{Boundary, Window};

/// Raw search form input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Restrict to these dialect identifiers (empty: all dialects).
    #[serde(default)]
    pub dialects: Vec<String>,
    pub transcription: Option<String>,
    pub standardization: Option<String>,
    pub lemma: Option<String>,
    /// A tag expression: tags joined by spaces or hyphens, all of which
    /// must occur in a single analysis, in any order.
    pub annotation: Option<String>,
}

impl SearchFilter {
    /// Compile into a predicate, or `None` when no field is set.
    ///
    /// Stored documents are lowercased, so filter terms are lowercased
    /// here too; surrounding whitespace never counts as a condition.
    pub fn compile(&self) -> Option<SentencePredicate> {
        let normalize = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_lowercase)
        };

        let dialects: Vec<String> = self
            .dialects
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();

        let tags: Vec<String> = self
            .annotation
            .as_deref()
            .unwrap_or("")
            .replace(TAG_SEP, " ")
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let word = WordConditions {
            transcription: normalize(&self.transcription),
            standardization: normalize(&self.standardization),
            lemma: normalize(&self.lemma),
            tags,
        };

        if dialects.is_empty() && word.is_empty() {
            return None;
        }

        Some(SentencePredicate {
            dialects,
            word,
            window: None,
        })
    }
}

/// Word-level conditions; all present fields must hold on one word.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordConditions {
    pub transcription: Option<String>,
    pub standardization: Option<String>,
    pub lemma: Option<String>,
    pub tags: Vec<String>,
}

impl WordConditions {
    pub fn is_empty(&self) -> bool {
        self.transcription.is_none()
            && self.standardization.is_none()
            && self.lemma.is_none()
            && self.tags.is_empty()
    }

    pub fn matches(&self, word: &WordEntry) -> bool {
        if let Some(transcription) = &self.transcription {
            if &word.transcription != transcription {
                return false;
            }
        }
        if let Some(standardization) = &self.standardization {
            if word.standardization.as_ref() != Some(standardization) {
                return false;
            }
        }
        if let Some(lemma) = &self.lemma {
            if !word.lemmata.contains(lemma) {
                return false;
            }
        }
        if !self.tags.is_empty() {
            let any_analysis_has_all = word
                .annotations
                .iter()
                .any(|set| self.tags.iter().all(|tag| set.tags.contains(tag)));
            if !any_analysis_has_all {
                return false;
            }
        }
        true
    }
}

/// A compiled sentence predicate, optionally windowed for keyset
/// continuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentencePredicate {
    pub dialects: Vec<String>,
    pub word: WordConditions,
    /// Keyset window added by the paginator; `None` for a plain query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<Window>,
}

impl SentencePredicate {
    /// Reference matching semantics; any conforming store must agree.
    pub fn matches(&self, document: &SentenceDocument) -> bool {
        if !self.dialects.is_empty() {
            match &document.dialect {
                Some(dialect) if self.dialects.contains(dialect) => {}
                _ => return false,
            }
        }

        if let Some(window) = &self.window {
            let boundary = Boundary::of(document);
            let inside = match window {
                Window::After(after) => boundary > *after,
                Window::Before(before) => boundary < *before,
            };
            if !inside {
                return false;
            }
        }

        if self.word.is_empty() {
            return true;
        }
        document.words.iter().any(|word| self.word.matches(word))
    }

    /// The same predicate constrained to a keyset window.
    pub fn windowed(&self, window: Window) -> Self {
        Self {
            window: Some(window),
            ..self.clone()
        }
    }
}

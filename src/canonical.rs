//! Canonical reordering of morphological tags.
//!
//! Stored annotations keep tags in one canonical surface order per part of
//! speech so that equal readings compare equal as strings. The order comes
//! from the [`TagSchema`]: the part of speech selects an ordering variant,
//! compulsory categories fill the declared slots, facultative flags go
//! last. Words without a part-of-speech tag (unknown words, foreign-script
//! tokens, punctuation) pass through unchanged — they are outside the
//! compulsory schema on purpose.
//!
//! Nothing here fails a batch: problems degrade to placeholder output and
//! are returned as reviewable issues on the outcome.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analyzer::MorphologicalAnalyzer;
use crate::format::TAG_SEP;
use crate::schema::{FacultativeLicense, OrderVariant, TagSchema, PART_OF_SPEECH};

/// The word forms behind a tag list, used for analyzer-backed inference of
/// missing categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordForms {
    pub standardization: String,
    pub lemma: String,
}

impl WordForms {
    pub fn new(standardization: impl Into<String>, lemma: impl Into<String>) -> Self {
        Self {
            standardization: standardization.into(),
            lemma: lemma.into(),
        }
    }
}

/// A reviewable problem found while canonicalizing one tag list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanonicalIssue {
    /// No tag mapped to the part-of-speech category; the input was passed
    /// through unchanged.
    NoPartOfSpeech { tags: Vec<String> },
    /// Tags that are neither surface grammemes nor facultative flags.
    UnknownTags { tags: Vec<String> },
    /// A compulsory category was absent; an empty placeholder was
    /// inserted. Signals incomplete upstream annotation.
    MissingCategory { category: String, pos: String },
    /// Categories present in the input but unused by the selected ordering
    /// variant.
    AbundantCategories { categories: Vec<String>, pos: String },
    /// A facultative flag present without its licensing tags. The flag is
    /// kept — storage is never blocked — but flagged for review.
    UnlicensedFacultative { tag: String },
}

/// The result of canonicalizing one tag list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalOutcome {
    pub tags: Vec<String>,
    pub issues: Vec<CanonicalIssue>,
}

impl CanonicalOutcome {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// The tags joined back into a stored tag string.
    pub fn tag_string(&self) -> String {
        self.tags.join(TAG_SEP)
    }
}

/// Reorders raw tag lists into canonical surface order.
///
/// Holds only shared read-only state; one instance serves any number of
/// calls. The analyzer is optional — without it, a missing compulsory
/// category goes straight to placeholder-and-report.
pub struct Canonicalizer<'a> {
    schema: &'a TagSchema,
    analyzer: Option<&'a dyn MorphologicalAnalyzer>,
}

impl<'a> Canonicalizer<'a> {
    pub fn new(schema: &'a TagSchema) -> Self {
        Self {
            schema,
            analyzer: None,
        }
    }

    pub fn with_analyzer(schema: &'a TagSchema, analyzer: &'a dyn MorphologicalAnalyzer) -> Self {
        Self {
            schema,
            analyzer: Some(analyzer),
        }
    }

    /// Canonicalize a tag list with no word context.
    pub fn canonicalize(&self, raw_tags: &[String]) -> CanonicalOutcome {
        self.canonicalize_word(raw_tags, None)
    }

    /// Canonicalize a tag list, using `word` for missing-tag inference.
    ///
    /// The output depends only on the tag multiset, never on input order:
    /// when two tags compete for one category, schema declaration order
    /// decides.
    pub fn canonicalize_word(
        &self,
        raw_tags: &[String],
        word: Option<&WordForms>,
    ) -> CanonicalOutcome {
        let input: HashSet<&str> = raw_tags.iter().map(String::as_str).collect();
        let mut issues = Vec::new();

        // Bucket by category, walking the schema so the outcome is
        // independent of input permutation.
        let mut present: HashMap<String, String> = HashMap::new();
        for grammeme in self.schema.grammemes() {
            if input.contains(grammeme.surface_tag.as_str())
                && !present.contains_key(&grammeme.category)
            {
                present.insert(grammeme.category.clone(), grammeme.surface_tag.clone());
            }
        }

        let unknown: Vec<String> = input
            .iter()
            .filter(|t| self.schema.by_surface_tag(t).is_none() && !self.schema.is_facultative(t))
            .map(|t| t.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !unknown.is_empty() {
            issues.push(CanonicalIssue::UnknownTags { tags: unknown });
        }

        let pos = match present.get(PART_OF_SPEECH) {
            Some(pos) => pos.clone(),
            None => {
                issues.push(CanonicalIssue::NoPartOfSpeech {
                    tags: raw_tags.to_vec(),
                });
                return CanonicalOutcome {
                    tags: raw_tags.to_vec(),
                    issues,
                };
            }
        };

        let mut tags = vec![pos.clone()];

        if let Some(variant) = self.schema.select_variant(&pos, &present) {
            for slot in &variant.categories {
                if let Some(tag) = present.get(&slot.name) {
                    tags.push(tag.clone());
                    continue;
                }
                if let Some(inferred) = self.infer_missing(&slot.name, &present, variant, word) {
                    tags.push(inferred);
                    continue;
                }
                if slot.always_required {
                    warn!(
                        category = slot.name.as_str(),
                        pos = pos.as_str(),
                        "compulsory category missing; inserting placeholder"
                    );
                    issues.push(CanonicalIssue::MissingCategory {
                        category: slot.name.clone(),
                        pos: pos.clone(),
                    });
                    tags.push(String::new());
                }
            }

            let used: HashSet<&str> = variant
                .categories
                .iter()
                .map(|slot| slot.name.as_str())
                .collect();
            let abundant: Vec<String> = present
                .keys()
                .filter(|category| {
                    category.as_str() != PART_OF_SPEECH && !used.contains(category.as_str())
                })
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if !abundant.is_empty() {
                issues.push(CanonicalIssue::AbundantCategories {
                    categories: abundant,
                    pos: pos.clone(),
                });
            }
        }

        // Facultative flags go last, in schema declaration order.
        for entry in self.schema.facultative() {
            if !input.contains(entry.tag.as_str()) {
                continue;
            }
            let licensed = match &entry.license {
                FacultativeLicense::AllForms => true,
                FacultativeLicense::AnyOf(references) => {
                    references.iter().any(|r| tags.contains(r))
                }
            };
            if !licensed {
                warn!(
                    tag = entry.tag.as_str(),
                    pos = pos.as_str(),
                    "facultative tag present without its licensing tags; kept"
                );
                issues.push(CanonicalIssue::UnlicensedFacultative {
                    tag: entry.tag.clone(),
                });
            }
            tags.push(entry.tag.clone());
        }

        CanonicalOutcome { tags, issues }
    }

    /// Rewrite a raw analyzer tag string into canonical surface order.
    ///
    /// Analyzer grammemes map onto surface tags; tokens the schema does not
    /// know (analyzer-internal markers) are dropped. The mapped tags then
    /// take the regular canonical path, so every spelling of a reading
    /// normalizes to one stored string.
    pub fn rewrite_analyzer_tags(&self, raw: &str) -> String {
        let mut surface = Vec::new();
        for token in raw.split([',', ' ', '-']).filter(|t| !t.is_empty()) {
            if let Some(grammeme) = self.schema.grammeme(token) {
                surface.push(grammeme.surface_tag.clone());
            } else if self.schema.is_facultative(token) {
                surface.push(token.to_string());
            }
        }
        self.canonicalize(&surface).tag_string()
    }

    /// Ask the analyzer for the missing category's value.
    ///
    /// A reading counts only if it agrees with the word: same lemma, and
    /// it carries the analyzer tags of everything already placed. The
    /// first agreeing reading that knows the missing category wins.
    fn infer_missing(
        &self,
        missing_category: &str,
        present: &HashMap<String, String>,
        variant: &OrderVariant,
        word: Option<&WordForms>,
    ) -> Option<String> {
        let analyzer = self.analyzer?;
        let word = word?;

        let mut needed = Vec::new();
        for category in
            std::iter::once(PART_OF_SPEECH).chain(variant.categories.iter().map(|s| s.name.as_str()))
        {
            if let Some(surface) = present.get(category) {
                if let Some(grammeme) = self.schema.by_surface_tag(surface) {
                    needed.push(grammeme.analyzer_tag.clone());
                }
            }
        }

        for analysis in analyzer.analyses(&word.standardization) {
            if analysis.lemma != word.lemma {
                continue;
            }
            let grammemes: HashSet<&str> = analysis.grammemes().collect();
            if !needed.iter().all(|tag| grammemes.contains(tag.as_str())) {
                continue;
            }
            for token in analysis.grammemes() {
                if let Some(grammeme) = self.schema.grammeme(token) {
                    if grammeme.category == missing_category {
                        return Some(grammeme.surface_tag.clone());
                    }
                }
            }
        }
        None
    }
}

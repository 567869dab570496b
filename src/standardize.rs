//! The standardization candidate pipeline.
//!
//! Proposals for a word's normalized form and grammar annotation come from
//! three places, in strict precedence:
//!
//! 1. manual corrections entered by annotators — authoritative, weight 1.0,
//!    and they bypass unification entirely;
//! 2. the prior-annotation index — frequency statistics over everything
//!    already annotated for this dialect model;
//! 3. the live morphological analyzer, filtered by score and corrected by
//!    dialect-specific post-rules.
//!
//! The analyzer and the index are external collaborators and sit behind
//! traits; the engine itself performs no I/O.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::analyzer::MorphologicalAnalyzer;
use crate::canonical::Canonicalizer;
use crate::codec::{decode_grammar, decode_standardization};
use crate::error::CodecError;
use crate::format::{clean_transcription, words, TAG_SEP, UNKNOWN_PREFIX};
use crate::schema::TagSchema;
use crate::track::AlignedSentence;
use crate::unify::{count_first_seen, ranked_by_frequency, unify, AnnotationCandidate, UnifiedAnnotation};

/// Analyzer readings at or below this score are noise and never become
/// candidates.
pub const ANALYZER_SCORE_FLOOR: f64 = 0.001;

const CYRILLIC_VOWELS: &str = "аеёиоуыэюя";
const REFLEXIVE_SUFFIX: &str = "ся";

/// One manual correction for a transcription form.
///
/// `annotations` holds one or more tag strings separated by `;` — an
/// annotator may record several acceptable readings at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualCorrection {
    pub standardization: String,
    pub lemma: String,
    pub annotations: String,
}

impl ManualCorrection {
    pub fn new(
        standardization: impl Into<String>,
        lemma: impl Into<String>,
        annotations: impl Into<String>,
    ) -> Self {
        Self {
            standardization: standardization.into(),
            lemma: lemma.into(),
            annotations: annotations.into(),
        }
    }
}

/// Manual corrections keyed by lowercased transcription.
#[derive(Debug, Clone, Default)]
pub struct ManualOverrides {
    by_transcription: HashMap<String, Vec<ManualCorrection>>,
}

impl ManualOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, transcription: &str, correction: ManualCorrection) {
        self.by_transcription
            .entry(transcription.to_lowercase())
            .or_default()
            .push(correction);
    }

    pub fn corrections(&self, transcription: &str) -> Option<&[ManualCorrection]> {
        self.by_transcription
            .get(&transcription.to_lowercase())
            .map(Vec::as_slice)
    }
}

/// Frequency lookups over previously annotated material.
///
/// `None` means the word has never been seen; `Some` carries every recorded
/// occurrence, repetitions included, so callers can rank by frequency.
pub trait AnnotationIndex {
    /// Recorded standardizations of a transcription form.
    fn standardizations_for(&self, transcription: &str) -> Option<Vec<String>>;

    /// Recorded `lemma-tags` annotations of a standardized form.
    fn annotations_for(&self, standardization: &str) -> Option<Vec<String>>;
}

/// In-memory [`AnnotationIndex`], filled by replaying aligned sentences.
///
/// The external document store keeps the persistent copy; this is the
/// in-process shape used while indexing a recording batch (and as the test
/// double).
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    words: HashMap<String, Vec<String>>,
    standardizations: HashMap<String, Vec<String>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_word(&mut self, transcription: &str, standardization: &str) {
        self.words
            .entry(transcription.to_lowercase())
            .or_default()
            .push(standardization.to_lowercase());
    }

    pub fn record_annotation(&mut self, standardization: &str, lemma: &str, tags: &str) {
        self.standardizations
            .entry(standardization.to_lowercase())
            .or_default()
            .push(format!("{}{}{}", lemma.to_lowercase(), TAG_SEP, tags));
    }

    /// Record one manual annotation, as entered from the editing UI.
    pub fn record_manual(
        &mut self,
        transcription: &str,
        standardization: &str,
        lemma: &str,
        tags: &str,
    ) {
        self.record_word(transcription, standardization);
        self.record_annotation(standardization, lemma, tags);
    }

    /// Replay one aligned sentence into the index.
    ///
    /// Words without a standardization (or annotation) are skipped with a
    /// warning — the sentence is simply not fully annotated yet.
    pub fn record_sentence(&mut self, sentence: &AlignedSentence) -> Result<(), CodecError> {
        let standardizations = match &sentence.standardization {
            Some(text) => decode_standardization(text)?,
            None => BTreeMap::new(),
        };
        let annotations = match &sentence.annotation {
            Some(text) => decode_grammar(text)?,
            None => BTreeMap::new(),
        };

        let cleaned = clean_transcription(&sentence.original);
        for (at, word) in words(&cleaned).enumerate() {
            let standardization = match standardizations.get(&at) {
                Some(payload) => payload,
                None => {
                    warn!(word_index = at, word, "no standardization for word; skipped");
                    continue;
                }
            };
            self.record_word(word, &standardization.form);

            let payload = match annotations.get(&at) {
                Some(payload) => payload,
                None => {
                    warn!(word_index = at, word, "no annotation for word; skipped");
                    continue;
                }
            };
            for analysis in &payload.analyses {
                self.record_annotation(&standardization.form, &analysis.lemma, &analysis.tags);
            }
        }
        Ok(())
    }
}

impl AnnotationIndex for MemoryIndex {
    fn standardizations_for(&self, transcription: &str) -> Option<Vec<String>> {
        self.words.get(&transcription.to_lowercase()).cloned()
    }

    fn annotations_for(&self, standardization: &str) -> Option<Vec<String>> {
        self.standardizations
            .get(&standardization.to_lowercase())
            .cloned()
    }
}

/// Dialect-specific corrections applied to analyzer output.
#[derive(Debug, Clone, Default)]
pub struct DialectRules {
    /// Rewrite gerund readings of `-ṷšy`/`-ṷši` forms to anterior
    /// participles (the analyzer has no such category).
    pub gerund_to_anterior: bool,
    /// Standardized forms that can also act as predicates; their readings
    /// get the `orPRED` flag.
    pub predicate_words: BTreeSet<String>,
    /// Full tag-string overrides keyed by standardized form.
    pub tag_overrides: HashMap<String, String>,
}

/// Produces standardization and annotation candidates for single words.
///
/// Stateless per call; all held state is read-only.
pub struct Standardizer<'a> {
    schema: &'a TagSchema,
    analyzer: &'a dyn MorphologicalAnalyzer,
    index: &'a dyn AnnotationIndex,
    manual: &'a ManualOverrides,
    rules: DialectRules,
}

impl<'a> Standardizer<'a> {
    pub fn new(
        schema: &'a TagSchema,
        analyzer: &'a dyn MorphologicalAnalyzer,
        index: &'a dyn AnnotationIndex,
        manual: &'a ManualOverrides,
    ) -> Self {
        Self {
            schema,
            analyzer,
            index,
            manual,
            rules: DialectRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: DialectRules) -> Self {
        self.rules = rules;
        self
    }

    /// Standardization candidates for a transcription form, best first.
    ///
    /// A manual correction wins outright; otherwise recorded
    /// standardizations ranked by frequency. Empty when the word is new —
    /// the caller falls back to its external normalizer's proposal.
    pub fn standardization_candidates(&self, orig: &str) -> Vec<String> {
        if let Some(corrections) = self.manual.corrections(orig) {
            if let Some(first) = corrections.first() {
                return vec![first.standardization.clone()];
            }
        }

        match self.index.standardizations_for(&orig.to_lowercase()) {
            Some(occurrences) => count_first_seen(occurrences.iter().map(String::as_str))
                .into_iter()
                .map(|(form, _)| form.to_string())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Settle the standardization for a word given the external
    /// normalizer's proposal.
    pub fn apply_standardization(&self, orig: &str, proposed: &str) -> String {
        let candidates = self.standardization_candidates(orig);
        if let Some(first) = candidates.first() {
            return first.to_lowercase();
        }

        let proposed = proposed.to_lowercase();
        if proposed.ends_with(REFLEXIVE_SUFFIX) {
            self.correct_reflexive(&proposed)
        } else {
            proposed
        }
    }

    /// Dialect reflexive forms in `-ся` after a vowel often standardize to
    /// `-сь`. Trim the final vowel and keep the result when the analyzer
    /// reads it as a verb (or does not know it at all — dialect verbs are
    /// routinely out of dictionary).
    fn correct_reflexive(&self, norm: &str) -> String {
        if !norm.ends_with(REFLEXIVE_SUFFIX) {
            return norm.to_string();
        }

        let graphemes: Vec<&str> = norm.graphemes(true).collect();
        let is_vowel = |g: &str| g.chars().next().map_or(false, |c| CYRILLIC_VOWELS.contains(c));

        if graphemes.len() > 2 && is_vowel(graphemes[graphemes.len() - 3]) {
            if graphemes.len() > 3 && !is_vowel(graphemes[graphemes.len() - 4]) {
                let candidate = format!("{}ь", graphemes[..graphemes.len() - 1].concat());
                if let Some(analysis) = self.analyzer.analyses(&candidate).into_iter().next() {
                    let is_verb = analysis.grammemes().any(|g| g == "VERB");
                    if is_verb || !analysis.from_dictionary {
                        return candidate;
                    }
                }
            }
        }
        norm.to_string()
    }

    /// Ranked annotation options for a word.
    ///
    /// Manual corrections short-circuit and bypass the unifier (weight
    /// 1.0); otherwise index statistics and filtered analyzer output pool
    /// into one unification pass.
    pub fn annotation_options(&self, orig: &str, standardization: &str) -> Vec<UnifiedAnnotation> {
        if let Some(corrections) = self.manual.corrections(orig) {
            let mut options = Vec::new();
            for correction in corrections {
                if correction.standardization != standardization {
                    continue;
                }
                for tags in correction.annotations.split(';') {
                    let tags = tags.trim();
                    if tags.is_empty() {
                        continue;
                    }
                    options.push(UnifiedAnnotation {
                        lemma: correction.lemma.clone(),
                        tags: tags.to_string(),
                        count: 1,
                        weight: 1.0,
                    });
                }
            }
            return options;
        }

        let mut candidates = Vec::new();
        if let Some(occurrences) = self.index.annotations_for(standardization) {
            candidates.extend(ranked_by_frequency(&occurrences));
        }
        candidates.extend(self.analyzer_candidates(orig, standardization));
        unify(candidates)
    }

    /// Annotate one clause of `(transcription, proposed standardization)`
    /// pairs.
    pub fn annotate_clause(
        &self,
        pairs: &[(String, String)],
    ) -> Vec<(String, Vec<UnifiedAnnotation>)> {
        pairs
            .iter()
            .map(|(orig, proposed)| {
                let standardization = self.apply_standardization(orig, proposed);
                let options = self.annotation_options(orig, &standardization);
                (standardization, options)
            })
            .collect()
    }

    fn analyzer_candidates(&self, orig: &str, standardization: &str) -> Vec<AnnotationCandidate> {
        let canonicalizer = Canonicalizer::new(self.schema);
        let gerund_prefix = format!("GER{}", TAG_SEP);
        let mut candidates = Vec::new();

        for analysis in self.analyzer.analyses(standardization) {
            if analysis.score <= ANALYZER_SCORE_FLOOR {
                continue;
            }

            let mut tags = canonicalizer.rewrite_analyzer_tags(&analysis.tags);

            if self.rules.gerund_to_anterior
                && (orig.ends_with("ṷšy") || orig.ends_with("ṷši"))
                && tags.starts_with(&gerund_prefix)
            {
                tags = format!("ANTP{}{}", TAG_SEP, &tags[gerund_prefix.len()..]);
            }

            if self
                .rules
                .predicate_words
                .contains(&standardization.to_lowercase())
            {
                tags = format!("{}{}orPRED", tags, TAG_SEP);
            }

            if let Some(replacement) = self.rules.tag_overrides.get(standardization) {
                tags = replacement.clone();
            }

            let lemma = if analysis.from_dictionary {
                analysis.lemma.clone()
            } else {
                format!("{}{}", UNKNOWN_PREFIX, analysis.lemma)
            };

            candidates.push(AnnotationCandidate::new(lemma, tags, analysis.score));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::testing::TableAnalyzer;
    use crate::analyzer::MorphAnalysis;
    use crate::schema::test_schema;
    use crate::track::{AnnotationTrack, align_tiers};

    fn empty_index() -> MemoryIndex {
        MemoryIndex::new()
    }

    #[test]
    fn manual_standardization_wins() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new();
        let index = empty_index();
        let mut manual = ManualOverrides::new();
        manual.insert(
            "užó",
            ManualCorrection::new("ужо", "ужо", "ADV"),
        );
        let standardizer = Standardizer::new(&schema, &analyzer, &index, &manual);

        assert_eq!(standardizer.standardization_candidates("Užó"), vec!["ужо"]);
        assert_eq!(standardizer.apply_standardization("užó", "уже"), "ужо");
    }

    #[test]
    fn index_standardizations_rank_by_frequency() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new();
        let mut index = empty_index();
        index.record_word("akno", "окно");
        index.record_word("akno", "акно");
        index.record_word("akno", "окно");
        let manual = ManualOverrides::new();
        let standardizer = Standardizer::new(&schema, &analyzer, &index, &manual);

        assert_eq!(
            standardizer.standardization_candidates("akno"),
            vec!["окно", "акно"]
        );
    }

    #[test]
    fn new_word_has_no_candidates() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new();
        let index = empty_index();
        let manual = ManualOverrides::new();
        let standardizer = Standardizer::new(&schema, &analyzer, &index, &manual);

        assert!(standardizer.standardization_candidates("novoje").is_empty());
    }

    #[test]
    fn reflexive_form_is_corrected_when_analyzer_agrees() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new().with(
            "мылась",
            MorphAnalysis::new("мыться", "VERB,impf past,sing femn", 0.9),
        );
        let index = empty_index();
        let manual = ManualOverrides::new();
        let standardizer = Standardizer::new(&schema, &analyzer, &index, &manual);

        assert_eq!(
            standardizer.apply_standardization("mylasa", "мылася"),
            "мылась"
        );
    }

    #[test]
    fn reflexive_form_is_kept_when_analyzer_disagrees() {
        let schema = test_schema();
        // The trimmed candidate is unknown to the analyzer: no readings at
        // all, so the original form stays.
        let analyzer = TableAnalyzer::new();
        let index = empty_index();
        let manual = ManualOverrides::new();
        let standardizer = Standardizer::new(&schema, &analyzer, &index, &manual);

        assert_eq!(
            standardizer.apply_standardization("prosa", "прося"),
            "прося"
        );
    }

    #[test]
    fn manual_annotations_bypass_unification() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new().with(
            "стало",
            MorphAnalysis::new("стать", "VERB,perf past,sing neut", 0.9),
        );
        let index = empty_index();
        let mut manual = ManualOverrides::new();
        manual.insert(
            "stálo",
            ManualCorrection::new("стало", "стать", "VERB-pfv-pst-sg-n; VERB-pfv-pst-sg"),
        );
        let standardizer = Standardizer::new(&schema, &analyzer, &index, &manual);

        let options = standardizer.annotation_options("stálo", "стало");
        assert_eq!(options.len(), 2);
        assert!(options.iter().all(|o| (o.weight - 1.0).abs() < f64::EPSILON));
        assert_eq!(options[0].tags, "VERB-pfv-pst-sg-n");
        assert_eq!(options[1].tags, "VERB-pfv-pst-sg");
    }

    #[test]
    fn manual_correction_for_other_standardization_still_short_circuits() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new().with(
            "стало",
            MorphAnalysis::new("стать", "VERB,perf past,sing neut", 0.9),
        );
        let index = empty_index();
        let mut manual = ManualOverrides::new();
        manual.insert(
            "stálo",
            ManualCorrection::new("встало", "встать", "VERB-pfv-pst-sg-n"),
        );
        let standardizer = Standardizer::new(&schema, &analyzer, &index, &manual);

        assert!(standardizer.annotation_options("stálo", "стало").is_empty());
    }

    #[test]
    fn index_and_analyzer_candidates_pool_into_one_ranking() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new().with(
            "мыла",
            MorphAnalysis::new("мыть", "VERB,impf past,sing femn", 0.6),
        );
        let mut index = empty_index();
        index.record_annotation("мыла", "мыть", "VERB-ipfv-pst-sg-f");
        index.record_annotation("мыла", "мыть", "VERB-ipfv-pst-sg-f");
        index.record_annotation("мыла", "мыло", "NOUN-n-gen-sg");
        let manual = ManualOverrides::new();
        let standardizer = Standardizer::new(&schema, &analyzer, &index, &manual);

        let options = standardizer.annotation_options("myla", "мыла");
        // The analyzer reading collapses onto the index's top reading.
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].lemma, "мыть");
        assert_eq!(options[0].tags, "VERB-ipfv-pst-sg-f");
        assert_eq!(options[0].count, 2);
        assert_eq!(options[1].lemma, "мыло");
    }

    #[test]
    fn analyzer_scores_below_floor_are_dropped() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new()
            .with(
                "мыла",
                MorphAnalysis::new("мыть", "VERB,impf past,sing femn", 0.9),
            )
            .with(
                "мыла",
                MorphAnalysis::new("мыло", "NOUN,neut,gent,sing", 0.0005),
            );
        let index = empty_index();
        let manual = ManualOverrides::new();
        let standardizer = Standardizer::new(&schema, &analyzer, &index, &manual);

        let options = standardizer.annotation_options("myla", "мыла");
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].lemma, "мыть");
    }

    #[test]
    fn out_of_dictionary_lemmas_are_prefixed() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new().with(
            "узёрым",
            MorphAnalysis::out_of_dictionary("узёрым", "NOUN,inan,masc,ablt,sing", 0.4),
        );
        let index = empty_index();
        let manual = ManualOverrides::new();
        let standardizer = Standardizer::new(&schema, &analyzer, &index, &manual);

        let options = standardizer.annotation_options("uzorym", "узёрым");
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].lemma, "(unkn)_узёрым");
    }

    #[test]
    fn gerund_reading_becomes_anterior_participle() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new().with(
            "пришедши",
            MorphAnalysis::new("прийти", "GRND,perf", 0.9),
        );
        let index = empty_index();
        let manual = ManualOverrides::new();
        let rules = DialectRules {
            gerund_to_anterior: true,
            ..DialectRules::default()
        };
        let standardizer =
            Standardizer::new(&schema, &analyzer, &index, &manual).with_rules(rules);

        let options = standardizer.annotation_options("prišoṷšy", "пришедши");
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].tags, "ANTP-pfv");
    }

    #[test]
    fn gerund_rule_needs_the_dialect_suffix() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new().with(
            "пришедши",
            MorphAnalysis::new("прийти", "GRND,perf", 0.9),
        );
        let index = empty_index();
        let manual = ManualOverrides::new();
        let rules = DialectRules {
            gerund_to_anterior: true,
            ..DialectRules::default()
        };
        let standardizer =
            Standardizer::new(&schema, &analyzer, &index, &manual).with_rules(rules);

        let options = standardizer.annotation_options("prišedši", "пришедши");
        assert_eq!(options[0].tags, "GER-pfv");
    }

    #[test]
    fn predicate_words_get_the_flag() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new().with(
            "надо",
            MorphAnalysis::new("надо", "ADVB", 0.9),
        );
        let index = empty_index();
        let manual = ManualOverrides::new();
        let rules = DialectRules {
            predicate_words: ["надо".to_string()].into_iter().collect(),
            ..DialectRules::default()
        };
        let standardizer =
            Standardizer::new(&schema, &analyzer, &index, &manual).with_rules(rules);

        let options = standardizer.annotation_options("nada", "надо");
        assert_eq!(options[0].tags, "ADV-orPRED");
    }

    #[test]
    fn tag_override_replaces_the_whole_reading() {
        let schema = test_schema();
        let analyzer = TableAnalyzer::new().with(
            "это",
            MorphAnalysis::new("это", "NPRO,neut,nomn,sing", 0.9),
        );
        let index = empty_index();
        let manual = ManualOverrides::new();
        let rules = DialectRules {
            tag_overrides: [("это".to_string(), "NPRO-n-nom-sg".to_string())]
                .into_iter()
                .collect(),
            ..DialectRules::default()
        };
        let standardizer =
            Standardizer::new(&schema, &analyzer, &index, &manual).with_rules(rules);

        let options = standardizer.annotation_options("eto", "это");
        assert_eq!(options[0].tags, "NPRO-n-nom-sg");
    }

    #[test]
    fn memory_index_replays_aligned_sentences() {
        let original = AnnotationTrack::from_entries(vec![crate::track::TrackEntry::new(
            0,
            100,
            "мама мыла раму...",
        )]);
        let standardization = AnnotationTrack::from_entries(vec![crate::track::TrackEntry::new(
            0,
            100,
            "0:мама|1:мыла|2:раму",
        )]);
        let annotation = AnnotationTrack::from_entries(vec![crate::track::TrackEntry::new(
            0,
            100,
            "0:мама:NOUN-f-nom-sg|1:мыть:VERB-ipfv-pst-sg-f",
        )]);

        let aligned = align_tiers(&original, &standardization, &annotation);
        let mut index = MemoryIndex::new();
        index.record_sentence(&aligned[0]).unwrap();

        assert_eq!(
            index.standardizations_for("мама"),
            Some(vec!["мама".to_string()])
        );
        assert_eq!(
            index.annotations_for("мыла"),
            Some(vec!["мыть-VERB-ipfv-pst-sg-f".to_string()])
        );
        // Word 2 has a standardization but no annotation: recorded for
        // standardization lookups only.
        assert_eq!(
            index.standardizations_for("раму"),
            Some(vec!["раму".to_string()])
        );
        assert_eq!(index.annotations_for("раму"), None);
    }
}

//! Unification and ranking of grammar annotation candidates.
//!
//! Candidates for one word arrive from several sources (manual corrections,
//! prior-annotation statistics, live analyzer output) and frequently repeat
//! the same reading with cosmetic differences: tag order, duplicated tags.
//! Unification collapses them onto `(lemma, sorted unique tag set)` identity
//! while keeping the first-seen spelling as the display form.

use std::collections::BTreeSet;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::format::TAG_SEP;

/// One hypothesis for a word's grammar annotation.
///
/// `weight` is relative confidence: 1.0 for manual corrections, a
/// frequency ratio for index-derived candidates, an analyzer score
/// otherwise. Candidates are transient — they exist only between a source
/// and the unifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationCandidate {
    pub lemma: String,
    pub tags: String,
    pub weight: f64,
}

impl AnnotationCandidate {
    pub fn new(lemma: impl Into<String>, tags: impl Into<String>, weight: f64) -> Self {
        Self {
            lemma: lemma.into(),
            tags: tags.into(),
            weight,
        }
    }
}

/// A deduplicated candidate with its accumulated evidence.
///
/// `lemma` and `tags` keep the first-seen spelling; `count` is the number
/// of candidates that collapsed onto this reading and `weight` their
/// summed confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedAnnotation {
    pub lemma: String,
    pub tags: String,
    pub count: usize,
    pub weight: f64,
}

impl UnifiedAnnotation {
    /// Turn this back into a candidate, carrying the accumulated weight.
    pub fn to_candidate(&self) -> AnnotationCandidate {
        AnnotationCandidate::new(self.lemma.clone(), self.tags.clone(), self.weight)
    }
}

/// The normalized identity of a tag string: sorted, deduplicated tags.
///
/// `VERB-pfv` and `pfv-VERB-pfv` share one identity; `VERB-pfv` and
/// `VERB-ipfv` do not.
fn tag_identity(tags: &str) -> Vec<String> {
    tags.split(TAG_SEP)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Deduplicate candidates and rank them by accumulated evidence.
///
/// Deterministic for identical input order: occurrence counts accumulate
/// per identity, then a stable sort by descending count ranks the result —
/// ties keep first-seen order. Feeding the output's candidates back in
/// reproduces the same ranking (unification is a fixed point).
pub fn unify(candidates: impl IntoIterator<Item = AnnotationCandidate>) -> Vec<UnifiedAnnotation> {
    let mut unified: Vec<UnifiedAnnotation> = Vec::new();
    let mut by_identity: HashMap<(String, Vec<String>), usize> = HashMap::new();

    for candidate in candidates {
        let identity = (candidate.lemma.clone(), tag_identity(&candidate.tags));
        match by_identity.get(&identity) {
            Some(&at) => {
                unified[at].count += 1;
                unified[at].weight += candidate.weight;
            }
            None => {
                by_identity.insert(identity, unified.len());
                unified.push(UnifiedAnnotation {
                    lemma: candidate.lemma,
                    tags: candidate.tags,
                    count: 1,
                    weight: candidate.weight,
                });
            }
        }
    }

    unified.sort_by(|a, b| b.count.cmp(&a.count));
    unified
}

/// Count occurrences of each distinct item, most frequent first; ties keep
/// first-seen order.
pub(crate) fn count_first_seen<'a>(
    items: impl IntoIterator<Item = &'a str>,
) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    let mut by_text: HashMap<&'a str, usize> = HashMap::new();
    for item in items {
        match by_text.get(item) {
            Some(&at) => counts[at].1 += 1,
            None => {
                by_text.insert(item, counts.len());
                counts.push((item, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Rank recorded `lemma-tags` occurrences by relative frequency.
///
/// Each distinct occurrence string becomes one candidate weighted
/// `count / total`, most frequent first; ties keep first-seen order. This
/// is how prior-annotation statistics from the word index turn into
/// candidates.
pub fn ranked_by_frequency(occurrences: &[String]) -> Vec<AnnotationCandidate> {
    let total = occurrences.len();
    if total == 0 {
        return Vec::new();
    }

    count_first_seen(occurrences.iter().map(String::as_str))
        .into_iter()
        .map(|(text, count)| {
            let (lemma, tags) = match text.split_once(TAG_SEP) {
                Some((lemma, tags)) => (lemma, tags),
                None => (text, ""),
            };
            AnnotationCandidate::new(lemma, tags, count as f64 / total as f64)
        })
        .collect()
}

//! Time-stamped annotation tracks and the tier aligner.
//!
//! A recording carries three tracks per speaker: the original
//! transcription, its standardization and its grammar annotation. The
//! refinement tracks are written later by other tooling, so the aligner
//! joins them back onto the original purely by `(start, end)` interval.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A `(start, end)` interval in milliseconds. The interval is the join key
/// between tiers of one recording.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Interval {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Interval {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }
}

/// One time-stamped annotation value within a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub interval: Interval,
    pub text: String,
}

impl TrackEntry {
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            interval: Interval::new(start_ms, end_ms),
            text: text.into(),
        }
    }
}

/// An ordered sequence of entries for one tier, sorted by start time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationTrack {
    entries: Vec<TrackEntry>,
}

impl AnnotationTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a track from entries in any order; entries are sorted by start
    /// time, matching how tier data is read out of a recording.
    pub fn from_entries(mut entries: Vec<TrackEntry>) -> Self {
        entries.sort_by_key(|e| e.interval.start_ms);
        Self { entries }
    }

    /// Append an entry, keeping the start-time order.
    pub fn push(&mut self, start_ms: u64, end_ms: u64, text: impl Into<String>) {
        let entry = TrackEntry::new(start_ms, end_ms, text);
        let at = self
            .entries
            .partition_point(|e| e.interval.start_ms <= entry.interval.start_ms);
        self.entries.insert(at, entry);
    }

    pub fn entries(&self) -> &[TrackEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One sentence joined across the three tiers, still holding the raw packed
/// strings (decode through [`crate::codec`]).
///
/// A sentence with no standardization or annotation is valid: the
/// refinement tracks lag behind the transcription while annotators work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedSentence {
    pub interval: Interval,
    pub original: String,
    pub standardization: Option<String>,
    pub annotation: Option<String>,
}

/// Join the three tiers of one speaker by interval.
///
/// The original track is authoritative: the result has exactly one entry
/// per original-track interval, in original-track order. Standardization
/// and annotation entries attach to the matching interval; entries whose
/// interval does not occur in the original track are dropped with a
/// warning. That drop tolerates annotator tooling lag, but it also means a
/// refinement saved against shifted interval bounds disappears here — the
/// warning is the only trace, so it is emitted by the engine itself rather
/// than left to callers.
///
/// Reprocessing the same tracks produces the same result, so whole-recording
/// batches can safely be rerun.
pub fn align_tiers(
    original: &AnnotationTrack,
    standardization: &AnnotationTrack,
    annotation: &AnnotationTrack,
) -> Vec<AlignedSentence> {
    let mut sentences: Vec<AlignedSentence> = original
        .iter()
        .map(|entry| AlignedSentence {
            interval: entry.interval,
            original: entry.text.clone(),
            standardization: None,
            annotation: None,
        })
        .collect();

    let by_interval: HashMap<Interval, usize> = sentences
        .iter()
        .enumerate()
        .map(|(at, sentence)| (sentence.interval, at))
        .collect();

    for entry in standardization.iter() {
        match by_interval.get(&entry.interval) {
            Some(&at) => sentences[at].standardization = Some(entry.text.clone()),
            None => warn!(
                start_ms = entry.interval.start_ms,
                end_ms = entry.interval.end_ms,
                "standardization entry has no matching original interval; dropped"
            ),
        }
    }

    for entry in annotation.iter() {
        match by_interval.get(&entry.interval) {
            Some(&at) => sentences[at].annotation = Some(entry.text.clone()),
            None => warn!(
                start_ms = entry.interval.start_ms,
                end_ms = entry.interval.end_ms,
                "annotation entry has no matching original interval; dropped"
            ),
        }
    }

    sentences
}

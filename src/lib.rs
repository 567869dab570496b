//! Alignment and annotation core for multi-tier dialect speech corpora.
//!
//! A recording carries independently time-stamped tiers per speaker: the
//! raw transcription, its standardization (modern-orthography forms) and
//! its grammar annotation. This crate joins the tiers, packs and unpacks
//! the positional per-word annotation strings, ranks annotation candidates
//! from heterogeneous sources and normalizes morphological tag order.
//!
//! ## Core Types
//!
//! - [`AnnotationTrack`] / [`AlignedSentence`] - one tier, and the
//!   per-interval join of all three
//! - [`StandardizationPayload`] / [`GrammarPayload`] - decoded per-word
//!   annotations
//! - [`AnnotationCandidate`] / [`UnifiedAnnotation`] - annotation
//!   hypotheses before and after unification
//! - [`TagSchema`] / [`Canonicalizer`] - the declarative tag-order schema
//!   and the reordering built on it
//! - [`Standardizer`] - candidate sourcing across manual corrections, the
//!   annotation index and the morphological analyzer
//!
//! ## Example
//!
//! ```
//! use corpus_tiers::{align_tiers, decode_standardization, AnnotationTrack, TrackEntry};
//!
//! let original = AnnotationTrack::from_entries(vec![
//!     TrackEntry::new(0, 100, "мама мыла раму"),
//! ]);
//! let standardization = AnnotationTrack::from_entries(vec![
//!     TrackEntry::new(0, 100, "0:мама|1:мыла|2:раму"),
//! ]);
//!
//! let aligned = align_tiers(&original, &standardization, &AnnotationTrack::new());
//! let forms = decode_standardization(aligned[0].standardization.as_deref().unwrap()).unwrap();
//! assert_eq!(forms[&0].form, "мама");
//! ```
//!
//! The engine is pure computation over already-fetched data: document-store
//! queries and analyzer invocations live behind the [`AnnotationIndex`] and
//! [`MorphologicalAnalyzer`] traits on the calling side.

mod analyzer;
mod canonical;
mod codec;
mod error;
pub mod format;
mod schema;
mod standardize;
mod track;
mod unify;

// Tier alignment
pub use track::{align_tiers, AlignedSentence, AnnotationTrack, Interval, TrackEntry};

// Positional annotation codec
pub use codec::{
    decode_grammar, decode_standardization, encode_grammar, encode_standardization, padded_forms,
    GrammarAnalysis, GrammarPayload, StandardizationPayload,
};

// Candidate unification and ranking
pub use unify::{ranked_by_frequency, unify, AnnotationCandidate, UnifiedAnnotation};

// Tag-order schema
pub use schema::{
    FacultativeEntry, FacultativeLicense, GrammemeEntry, OrderVariant, OrderedCategory, TagSchema,
    ALLFORMS, PART_OF_SPEECH,
};

// Canonical tag ordering
pub use canonical::{CanonicalIssue, CanonicalOutcome, Canonicalizer, WordForms};

// Standardization candidate pipeline
pub use standardize::{
    AnnotationIndex, DialectRules, ManualCorrection, ManualOverrides, MemoryIndex, Standardizer,
    ANALYZER_SCORE_FLOOR,
};

// Analyzer boundary
pub use analyzer::{MorphAnalysis, MorphologicalAnalyzer};

// Errors
pub use error::{CodecError, SchemaError};

#[cfg(test)]
mod tests {
    mod integration;
}

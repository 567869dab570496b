//! The document-store contract.
//!
//! The engine does not depend on a particular store; it needs exactly five
//! operations with their usual semantics: `find` a cursor for a predicate,
//! then `sort`, `skip`, `limit` and `count` on it. Sorting is always over
//! the fixed two-key order `(recording ascending, interval start
//! ascending)` — only the direction varies — and `count` reports the full
//! match count regardless of `skip`/`limit`.
//!
//! [`MemoryStore`] is the reference implementation and the test double.

use serde::{Deserialize, Serialize};

use crate::document::SentenceDocument;
use crate::filter::SentencePredicate;

/// The keyset continuation key: the sort key pair of one result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Boundary {
    pub recording: String,
    pub start_ms: u64,
}

impl Boundary {
    pub fn new(recording: impl Into<String>, start_ms: u64) -> Self {
        Self {
            recording: recording.into(),
            start_ms,
        }
    }

    pub fn of(document: &SentenceDocument) -> Self {
        Self {
            recording: document.recording.clone(),
            start_ms: document.audio.start_ms,
        }
    }
}

/// A strict keyset constraint relative to a boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Window {
    /// Strictly after the boundary in sort order.
    After(Boundary),
    /// Strictly before the boundary in sort order.
    Before(Boundary),
}

/// Direction over the fixed `(recording, start)` sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A store of sentence documents queryable by predicate.
pub trait SentenceStore {
    type Cursor: SentenceCursor;

    fn find(&self, predicate: &SentencePredicate) -> Self::Cursor;
}

/// A lazy result set over one `find`.
pub trait SentenceCursor: Sized {
    fn sort(self, direction: SortDirection) -> Self;
    fn skip(self, n: usize) -> Self;
    fn limit(self, n: usize) -> Self;
    /// Number of matching documents, ignoring `skip`/`limit`.
    fn count(&self) -> usize;
    fn collect(self) -> Vec<SentenceDocument>;
}

/// In-memory sentence store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sentences: Vec<SentenceDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, document: SentenceDocument) {
        self.sentences.push(document);
    }

    pub fn insert_many(&mut self, documents: impl IntoIterator<Item = SentenceDocument>) {
        self.sentences.extend(documents);
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

impl SentenceStore for MemoryStore {
    type Cursor = MemoryCursor;

    fn find(&self, predicate: &SentencePredicate) -> MemoryCursor {
        MemoryCursor {
            matched: self
                .sentences
                .iter()
                .filter(|document| predicate.matches(document))
                .cloned()
                .collect(),
            direction: SortDirection::Ascending,
            skip: 0,
            limit: None,
        }
    }
}

/// Cursor over a [`MemoryStore`] result set.
#[derive(Debug)]
pub struct MemoryCursor {
    matched: Vec<SentenceDocument>,
    direction: SortDirection,
    skip: usize,
    limit: Option<usize>,
}

impl SentenceCursor for MemoryCursor {
    fn sort(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    fn count(&self) -> usize {
        self.matched.len()
    }

    fn collect(self) -> Vec<SentenceDocument> {
        let mut documents = self.matched;
        match self.direction {
            SortDirection::Ascending => documents.sort_by(|a, b| {
                (a.recording.as_str(), a.audio.start_ms)
                    .cmp(&(b.recording.as_str(), b.audio.start_ms))
            }),
            SortDirection::Descending => documents.sort_by(|a, b| {
                (b.recording.as_str(), b.audio.start_ms)
                    .cmp(&(a.recording.as_str(), a.audio.start_ms))
            }),
        }

        let documents = documents.into_iter().skip(self.skip);
        match self.limit {
            Some(n) => documents.take(n).collect(),
            None => documents.collect(),
        }
    }
}

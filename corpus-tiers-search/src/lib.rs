//! Search over stored corpus-tiers sentences.
//!
//! This crate owns the persisted sentence shape and everything between a
//! search form and a page of results:
//!
//! - [`SentenceDocument`] - the per-sentence document built from an
//!   aligned sentence ([`build_sentence_document`])
//! - [`SearchFilter`] / [`SentencePredicate`] - form input compiled into
//!   element-match predicates
//! - [`SentenceStore`] / [`SentenceCursor`] - the five-operation document
//!   store contract, with [`MemoryStore`] as the reference implementation
//! - [`Paginator`] - keyset pagination with forward/backward/last-page
//!   navigation over the fixed `(recording, start)` order
//!
//! The actual persistent store is an external collaborator; anything that
//! can filter, sort, skip, limit and count satisfies the contract.

mod document;
mod filter;
mod page;
mod store;

// Stored documents
pub use document::{build_sentence_document, AudioRef, SentenceDocument, TagSet, WordEntry};

// Filter compilation
pub use filter::{SearchFilter, SentencePredicate, WordConditions};

// Store contract
pub use store::{
    Boundary, MemoryCursor, MemoryStore, SentenceCursor, SentenceStore, SortDirection, Window,
};

// Pagination
pub use page::{PageInfo, PageRequest, Paginator, SearchPage, DEFAULT_PAGE_SIZE};

#[cfg(test)]
mod tests {
    mod integration;
}

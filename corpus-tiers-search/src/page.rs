//! Keyset pagination over stored sentences.
//!
//! Results are always presented ascending over `(recording, start)`.
//! Stepping to an adjacent page continues from the previous page's
//! boundary instead of re-skipping from the top:
//!
//! - forward: strictly after the previous maximum, ascending;
//! - backward: strictly before the previous minimum, descending to pick
//!   the right window, then reversed back to ascending presentation;
//! - jump to the last page: the remainder-sized tail, fetched descending
//!   and reversed;
//! - anything else (first visit, arbitrary jump): plain skip/limit.
//!
//! The total page count is recomputed from a full count only when the
//! caller does not already know it — page turns reuse the number they got
//! on the first page.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::SentenceDocument;
use crate::filter::SentencePredicate;
use crate::store::{Boundary, SentenceCursor, SentenceStore, SortDirection, Window};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Where one delivered page sat in the sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Boundary of the first (smallest) result on the page.
    pub min: Boundary,
    /// Boundary of the last (largest) result on the page.
    pub max: Boundary,
    /// 1-based page number the boundaries belong to.
    pub page: usize,
}

/// One page request from the form layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page to fetch.
    pub page: usize,
    /// The previous page's reported info, when the client has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageInfo>,
    /// Total page count from an earlier response, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
}

impl PageRequest {
    pub fn first() -> Self {
        Self {
            page: 1,
            previous: None,
            total_pages: None,
        }
    }

    /// Continue from a delivered page to an adjacent or arbitrary page.
    pub fn from_page(page: usize, previous: PageInfo, total_pages: usize) -> Self {
        Self {
            page,
            previous: Some(previous),
            total_pages: Some(total_pages),
        }
    }
}

/// One delivered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Results in ascending presentation order.
    pub results: Vec<SentenceDocument>,
    /// Boundaries for continuation; `None` when the page came back empty.
    pub page_info: Option<PageInfo>,
    pub total_pages: usize,
}

/// Fetches pages of a fixed size from any [`SentenceStore`].
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch one page.
    pub fn fetch<S: SentenceStore>(
        &self,
        store: &S,
        predicate: &SentencePredicate,
        request: &PageRequest,
    ) -> SearchPage {
        let page = request.page.max(1);

        let mut matching = None;
        let total_pages = match request.total_pages {
            Some(total) => total,
            None => {
                let count = store.find(predicate).count();
                matching = Some(count);
                div_ceil(count, self.page_size)
            }
        };

        let results = if let Some(previous) = matching_previous(request, page) {
            if page == previous.page + 1 {
                debug!(page, "forward keyset navigation");
                store
                    .find(&predicate.windowed(Window::After(previous.max.clone())))
                    .sort(SortDirection::Ascending)
                    .limit(self.page_size)
                    .collect()
            } else {
                debug!(page, "backward keyset navigation");
                let mut descending = store
                    .find(&predicate.windowed(Window::Before(previous.min.clone())))
                    .sort(SortDirection::Descending)
                    .limit(self.page_size)
                    .collect();
                descending.reverse();
                descending
            }
        } else if page > 1 && page == total_pages {
            debug!(page, "jump to last page");
            let count = matching.unwrap_or_else(|| store.find(predicate).count());
            let remainder = count % self.page_size;
            let tail = if remainder == 0 {
                self.page_size
            } else {
                remainder
            };
            let mut descending = store
                .find(predicate)
                .sort(SortDirection::Descending)
                .limit(tail)
                .collect();
            descending.reverse();
            descending
        } else {
            debug!(page, "offset navigation");
            store
                .find(predicate)
                .sort(SortDirection::Ascending)
                .skip((page - 1) * self.page_size)
                .limit(self.page_size)
                .collect()
        };

        let page_info = match (results.first(), results.last()) {
            (Some(first), Some(last)) => Some(PageInfo {
                min: Boundary::of(first),
                max: Boundary::of(last),
                page,
            }),
            _ => None,
        };

        SearchPage {
            results,
            page_info,
            total_pages,
        }
    }
}

/// The previous page's info, but only when it is adjacent to the request —
/// keyset continuation is meaningless for arbitrary jumps.
fn matching_previous(request: &PageRequest, page: usize) -> Option<&PageInfo> {
    let previous = request.previous.as_ref()?;
    if page == previous.page + 1 || page + 1 == previous.page {
        Some(previous)
    } else {
        None
    }
}

fn div_ceil(count: usize, page_size: usize) -> usize {
    (count + page_size - 1) / page_size
}

//! Generic cursor-driven page collection.
//!
//! Remote collection endpoints hand back one page of items at a time plus
//! some continuation signal: either a ready-to-use next-page URL, or an
//! opaque cursor that gets merged back into the original request. Both
//! reduce to the same loop: fetch, append, follow the continuation until
//! the server stops handing one out.
//!
//! The continuation token is deliberately opaque here. A [`PageSource`]
//! implementation decides what it stores in a [`Cursor`] and how to turn it
//! back into the next request; this crate only drives the loop.
//!
//! # Example
//!
//! ```rust,ignore
//! let entries = collect_all(&source, PageLimit::default()).await?;
//! ```

use async_trait::async_trait;
use thiserror::Error;

/// Opaque continuation token for the next page.
///
/// Cursor-mode sources store a complete next-page URL in here; flag-mode
/// sources store the server's cursor value. Only the source that produced
/// the token interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a remote collection.
#[derive(Debug)]
pub struct Page<T> {
    /// Items in server arrival order.
    pub items: Vec<T>,
    /// Continuation for the next page, if the server indicated one.
    pub next: Option<Cursor>,
}

impl<T> Page<T> {
    /// A terminal page carrying the given items and no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Upper bound on how many pages a single collection may fetch.
///
/// The upstream APIs give no such guarantee themselves; this guards
/// against a server that keeps returning a continuation forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimit(pub usize);

impl Default for PageLimit {
    fn default() -> Self {
        Self(100)
    }
}

/// The server was still signalling a next page when [`PageLimit`] ran out.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("pagination did not terminate after {max_pages} pages")]
pub struct PageLimitExceeded {
    pub max_pages: usize,
}

/// One paginated remote collection.
///
/// `fetch(None)` issues the initial request; `fetch(Some(cursor))` issues
/// the follow-up request for the page the cursor points at.
#[async_trait]
pub trait PageSource {
    type Item: Send;
    type Error: Send;

    async fn fetch(&self, after: Option<&Cursor>) -> Result<Page<Self::Item>, Self::Error>;
}

/// Drain a paginated collection into one sequence.
///
/// Pages are fetched sequentially and their items concatenated in arrival
/// order; callers rely on that order (some consume only a prefix). The
/// first fetch error aborts the whole collection with no partial result.
pub async fn collect_all<S>(source: &S, limit: PageLimit) -> Result<Vec<S::Item>, S::Error>
where
    S: PageSource + Sync,
    S::Error: From<PageLimitExceeded>,
{
    let mut items = Vec::new();
    let mut cursor: Option<Cursor> = None;

    for page_no in 0.. {
        if page_no == limit.0 {
            return Err(PageLimitExceeded {
                max_pages: limit.0,
            }
            .into());
        }

        let page = source.fetch(cursor.as_ref()).await?;
        tracing::debug!(page = page_no, count = page.items.len(), "fetched page");
        items.extend(page.items);

        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(items)
}

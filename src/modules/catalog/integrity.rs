//! Referential integrity guard for deletions.
//!
//! The store has no foreign keys, so whether an Author or Genre may be deleted
//! is decided here from the live set of Books referencing it. Callers must run
//! the check on the mutating request itself; a result computed for an earlier
//! confirmation page is never reused.

use atlas_db::{Filter, Query, StoreResult};
use serde::Serialize;

use super::gateway::Catalog;
use super::models::{url_for, Book, BookSummary, Stored};

/// Record kinds whose deletion is guarded by dependent Books.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guarded {
    Author,
    Genre,
}

impl Guarded {
    /// Book field holding the reference
    fn book_field(self) -> &'static str {
        match self {
            Guarded::Author => "author",
            Guarded::Genre => "genre",
        }
    }
}

/// A Book referencing an Author or Genre; listed as a blocker on delete pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookRef {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub url: String,
}

impl From<Stored<BookSummary>> for BookRef {
    fn from(stored: Stored<BookSummary>) -> Self {
        Self {
            url: url_for::<Book>(&stored.id),
            id: stored.id,
            title: stored.record.title,
            summary: stored.record.summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteCheck {
    pub blockers: Vec<BookRef>,
}

impl DeleteCheck {
    pub fn allowed(&self) -> bool {
        self.blockers.is_empty()
    }
}

/// Books referencing `id` through the reference field of `kind`.
pub fn dependents_query(kind: Guarded, id: &str) -> Query {
    Query::new()
        .filter(Filter::eq(kind.book_field(), id))
        .project(["title", "summary"])
}

pub async fn can_delete(catalog: &Catalog, kind: Guarded, id: &str) -> StoreResult<DeleteCheck> {
    let blockers = catalog
        .project::<Book, BookSummary>(&dependents_query(kind, id))
        .await?
        .into_iter()
        .map(BookRef::from)
        .collect();

    Ok(DeleteCheck { blockers })
}

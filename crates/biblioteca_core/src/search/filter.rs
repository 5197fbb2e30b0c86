//! Text and status filtering over the registry.
//!
//! # Responsibility
//! - Derive the visible subset of books for a search term and status.
//!
//! # Invariants
//! - Results keep registry insertion order.
//! - Filtering never mutates or clones books.

use crate::model::book::Book;
use chrono::NaiveDateTime;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Loan-status constraint applied by [`filter_books`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Available,
    /// Loaned, regardless of overdue state.
    Loaned,
    Overdue,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Available => "available",
            Self::Loaned => "loaned",
            Self::Overdue => "overdue",
        }
    }

    fn matches(self, book: &Book, now: NaiveDateTime) -> bool {
        match self {
            Self::All => true,
            Self::Available => !book.is_loaned,
            Self::Loaned => book.is_loaned,
            Self::Overdue => book.is_overdue_at(now),
        }
    }
}

/// Unknown status filter name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatusFilter(pub String);

impl Display for UnknownStatusFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown status filter `{}`; expected all|available|loaned|overdue",
            self.0
        )
    }
}

impl Error for UnknownStatusFilter {}

impl FromStr for StatusFilter {
    type Err = UnknownStatusFilter;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "available" => Ok(Self::Available),
            "loaned" => Ok(Self::Loaned),
            "overdue" => Ok(Self::Overdue),
            other => Err(UnknownStatusFilter(other.to_string())),
        }
    }
}

impl Display for StatusFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search options for the book list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    /// Free text matched against title, author and category.
    pub term: String,
    pub status: StatusFilter,
}

impl BookQuery {
    pub fn new(term: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            term: term.into(),
            status,
        }
    }
}

/// Returns the books matching `query` at local instant `now`.
///
/// The term matches case-insensitively as a substring of title, author or
/// category; an empty term matches everything.
pub fn filter_books<'a>(
    books: &'a [Book],
    query: &BookQuery,
    now: NaiveDateTime,
) -> Vec<&'a Book> {
    let term = query.term.trim().to_lowercase();
    books
        .iter()
        .filter(|book| matches_term(book, &term) && query.status.matches(book, now))
        .collect()
}

fn matches_term(book: &Book, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    [&book.title, &book.author, &book.category]
        .iter()
        .any(|field| field.to_lowercase().contains(term))
}

#[cfg(test)]
mod tests {
    use super::StatusFilter;

    #[test]
    fn status_filter_parses_case_insensitively() {
        assert_eq!("Overdue".parse::<StatusFilter>(), Ok(StatusFilter::Overdue));
        assert_eq!(" loaned ".parse::<StatusFilter>(), Ok(StatusFilter::Loaned));
        assert_eq!("".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert!("lost".parse::<StatusFilter>().is_err());
    }
}

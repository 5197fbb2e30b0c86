//! Book domain model.
//!
//! # Responsibility
//! - Define the canonical book record persisted, exported and imported.
//! - Define append-only loan history entries.
//! - Provide the overdue predicate and derived display status.
//!
//! # Invariants
//! - `id` is stable and never reused for another book.
//! - `is_loaned == false` implies empty `borrower`, `due_date` and `notes`
//!   after a return. Loaded records are not repaired retroactively.
//! - `history` only grows; entries are never mutated or removed.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid iso date regex"));

/// Opaque book identifier.
///
/// Generated ids are UUIDv4 strings; imported ids are kept verbatim, so the
/// identifier is modelled as text rather than `Uuid`.
pub type BookId = String;

/// Generates a fresh unique book identifier.
pub fn new_book_id() -> BookId {
    Uuid::new_v4().to_string()
}

/// Kind of loan event recorded in book history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanEventKind {
    Loan,
    Return,
}

/// One immutable loan/return event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HistoryEntry {
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: LoanEventKind,
    pub timestamp: DateTime<Utc>,
    /// Borrower the event refers to.
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl HistoryEntry {
    /// Builds a `loan` entry; empty due date/notes are omitted.
    pub fn loan(
        timestamp: DateTime<Utc>,
        actor: impl Into<String>,
        due_date: &str,
        notes: &str,
    ) -> Self {
        Self {
            kind: LoanEventKind::Loan,
            timestamp,
            actor: actor.into(),
            due_date: non_empty(due_date),
            notes: non_empty(notes),
        }
    }

    /// Builds a `return` entry for the borrower giving the book back.
    pub fn returned(timestamp: DateTime<Utc>, actor: impl Into<String>) -> Self {
        Self {
            kind: LoanEventKind::Return,
            timestamp,
            actor: actor.into(),
            due_date: None,
            notes: None,
        }
    }
}

/// History element as stored.
///
/// Loaded or imported history is not repaired: elements that do not match
/// the [`HistoryEntry`] shape exactly are kept as `Unrecognized`. Typed
/// entries that came from storage or import keep their source JSON in `raw`
/// and serialize it unchanged.
#[derive(Debug, Clone)]
pub enum HistoryItem {
    Entry {
        entry: HistoryEntry,
        raw: Option<Value>,
    },
    Unrecognized(Value),
}

impl HistoryItem {
    /// Classifies one raw history element without altering it.
    pub fn from_value(value: &Value) -> Self {
        match serde_json::from_value::<HistoryEntry>(value.clone()) {
            Ok(entry) => Self::Entry {
                entry,
                raw: Some(value.clone()),
            },
            Err(_) => Self::Unrecognized(value.clone()),
        }
    }

    /// Returns the typed entry, if this element has the canonical shape.
    pub fn entry(&self) -> Option<&HistoryEntry> {
        match self {
            Self::Entry { entry, .. } => Some(entry),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<HistoryEntry> for HistoryItem {
    fn from(value: HistoryEntry) -> Self {
        Self::Entry {
            entry: value,
            raw: None,
        }
    }
}

/// Typed entries compare by content, so an entry equals its own re-import.
impl PartialEq for HistoryItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Entry { entry: left, .. }, Self::Entry { entry: right, .. }) => left == right,
            (Self::Unrecognized(left), Self::Unrecognized(right)) => left == right,
            _ => false,
        }
    }
}

impl Serialize for HistoryItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Entry { raw: Some(raw), .. } => raw.serialize(serializer),
            Self::Entry { entry, raw: None } => entry.serialize(serializer),
            Self::Unrecognized(value) => value.serialize(serializer),
        }
    }
}

/// Derived display status of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookStatus {
    Available,
    Loaned,
    Overdue,
}

impl BookStatus {
    /// Human-readable label used by CSV export and list output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Loaned => "Loaned",
            Self::Overdue => "Overdue",
        }
    }
}

impl Display for BookStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// Canonical book record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub category: String,
    pub is_loaned: bool,
    /// Empty when not loaned.
    pub borrower: String,
    /// `YYYY-MM-DD` or empty.
    pub due_date: String,
    /// Notes of the current or most recent loan.
    pub notes: String,
    pub history: Vec<HistoryItem>,
}

impl Book {
    /// Creates an available book with a generated id and empty history.
    ///
    /// Fields are stored as given; use [`BookDraft::validate`] first to
    /// enforce the non-empty catalog rule.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self::with_id(new_book_id(), title, author, category)
    }

    /// Creates an available book with a caller-provided id.
    pub fn with_id(
        id: impl Into<BookId>,
        title: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            category: category.into(),
            is_loaned: false,
            borrower: String::new(),
            due_date: String::new(),
            notes: String::new(),
            history: Vec::new(),
        }
    }

    /// Returns whether the book is overdue at the given local instant.
    ///
    /// A loaned book is overdue once `now` is past the end of its due day.
    /// Books without a due date, or with an unparsable one, never are.
    pub fn is_overdue_at(&self, now: NaiveDateTime) -> bool {
        if !self.is_loaned {
            return false;
        }
        parse_due_date(&self.due_date)
            .and_then(|date| date.and_hms_opt(23, 59, 59))
            .is_some_and(|end_of_day| now > end_of_day)
    }

    /// Derived status at the given local instant.
    pub fn status_at(&self, now: NaiveDateTime) -> BookStatus {
        if !self.is_loaned {
            BookStatus::Available
        } else if self.is_overdue_at(now) {
            BookStatus::Overdue
        } else {
            BookStatus::Loaned
        }
    }

    /// Derived status at the current local time.
    pub fn status(&self) -> BookStatus {
        self.status_at(Local::now().naive_local())
    }

    /// Typed history entries, skipping unrecognized elements.
    pub fn history_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter().filter_map(HistoryItem::entry)
    }
}

/// Catalog fields supplied by callers of add/edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub category: String,
}

impl BookDraft {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            category: category.into(),
        }
    }

    /// Returns a trimmed copy, rejecting empty required fields.
    pub fn validate(&self) -> Result<Self, BookValidationError> {
        Ok(Self {
            title: required("title", &self.title)?,
            author: required("author", &self.author)?,
            category: required("category", &self.category)?,
        })
    }
}

/// Loan details supplied by callers of loan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanRequest {
    pub borrower: String,
    /// `YYYY-MM-DD` or empty.
    pub due_date: String,
    pub notes: String,
}

impl LoanRequest {
    pub fn new(borrower: impl Into<String>) -> Self {
        Self {
            borrower: borrower.into(),
            ..Self::default()
        }
    }

    pub fn due(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = due_date.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Returns a trimmed copy, rejecting an empty borrower or a malformed date.
    pub fn validate(&self) -> Result<Self, BookValidationError> {
        let borrower = required("borrower", &self.borrower)?;
        let due_date = self.due_date.trim().to_string();
        if !due_date.is_empty() && parse_due_date(&due_date).is_none() {
            return Err(BookValidationError::InvalidDueDate(due_date));
        }
        Ok(Self {
            borrower,
            due_date,
            notes: self.notes.trim().to_string(),
        })
    }
}

/// Validation failure for caller-supplied book fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookValidationError {
    EmptyField(&'static str),
    InvalidDueDate(String),
}

impl Display for BookValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} cannot be empty"),
            Self::InvalidDueDate(value) => {
                write!(f, "due date `{value}` is not a valid YYYY-MM-DD date")
            }
        }
    }
}

impl Error for BookValidationError {}

/// Parses a strict `YYYY-MM-DD` calendar date.
pub fn parse_due_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if !ISO_DATE_RE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn required(field: &'static str, value: &str) -> Result<String, BookValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BookValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_due_date, Book, BookDraft, BookValidationError, LoanRequest};
    use chrono::NaiveDate;

    fn at(date: &str, time: &str) -> chrono::NaiveDateTime {
        chrono::NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S")
            .unwrap()
    }

    #[test]
    fn parse_due_date_requires_zero_padded_iso_dates() {
        assert_eq!(
            parse_due_date("2030-01-05"),
            NaiveDate::from_ymd_opt(2030, 1, 5)
        );
        assert!(parse_due_date("2030-1-5").is_none());
        assert!(parse_due_date("2030-02-30").is_none());
        assert!(parse_due_date("").is_none());
    }

    #[test]
    fn overdue_starts_after_end_of_due_day() {
        let mut book = Book::new("Dune", "Herbert", "SciFi");
        book.is_loaned = true;
        book.due_date = "2000-01-01".to_string();

        assert!(!book.is_overdue_at(at("2000-01-01", "23:59:59")));
        assert!(book.is_overdue_at(at("2000-01-02", "00:00:00")));
    }

    #[test]
    fn loaned_book_without_due_date_is_never_overdue() {
        let mut book = Book::new("Dune", "Herbert", "SciFi");
        book.is_loaned = true;

        assert!(!book.is_overdue_at(at("2999-12-31", "23:59:59")));
    }

    #[test]
    fn draft_validation_trims_and_rejects_blank_fields() {
        let draft = BookDraft::new("  Dune ", "Herbert", " SciFi");
        let valid = draft.validate().unwrap();
        assert_eq!(valid.title, "Dune");
        assert_eq!(valid.category, "SciFi");

        let err = BookDraft::new("Dune", "   ", "SciFi").validate().unwrap_err();
        assert_eq!(err, BookValidationError::EmptyField("author"));
    }

    #[test]
    fn loan_request_rejects_malformed_due_date() {
        let err = LoanRequest::new("Ana").due("tomorrow").validate().unwrap_err();
        assert!(matches!(err, BookValidationError::InvalidDueDate(_)));
    }
}

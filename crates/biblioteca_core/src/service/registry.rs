//! Book registry use-case service.
//!
//! # Responsibility
//! - Own the in-memory, ordered collection of books for one session.
//! - Enforce add/loan/return/edit/delete/reset transition rules.
//! - Persist after every successful mutation and notify subscribers.
//!
//! # Invariants
//! - A rejected operation leaves books, storage and subscribers untouched.
//! - A failed save rolls the in-memory registry back to its prior state.
//! - Book ids stay unique for the registry lifetime.
//! - History entries are appended, never rewritten.

use crate::model::book::{Book, BookDraft, BookId, BookValidationError, HistoryEntry, LoanRequest};
use crate::model::sanitize::{ensure_unique_ids, sanitize_books};
use crate::repo::book_store::{BookStore, StoreError};
use crate::search::filter::{filter_books, BookQuery};
use crate::transfer::{self, TransferError, TransferResult};
use chrono::{Local, NaiveDateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Rejection or failure of a registry operation.
#[derive(Debug)]
pub enum RegistryError {
    Validation(BookValidationError),
    NotFound(BookId),
    AlreadyLoaned(BookId),
    NotLoaned(BookId),
    Store(StoreError),
    Transfer(TransferError),
}

impl RegistryError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::AlreadyLoaned(_) => "already_loaned",
            Self::NotLoaned(_) => "not_loaned",
            Self::Store(_) => "store",
            Self::Transfer(_) => "transfer",
        }
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "book not found: {id}"),
            Self::AlreadyLoaned(id) => write!(f, "book is already loaned: {id}"),
            Self::NotLoaned(id) => write!(f, "book is not loaned: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Transfer(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Transfer(err) => Some(err),
            Self::NotFound(_) | Self::AlreadyLoaned(_) | Self::NotLoaned(_) => None,
        }
    }
}

impl From<BookValidationError> for RegistryError {
    fn from(value: BookValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RegistryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<TransferError> for RegistryError {
    fn from(value: TransferError) -> Self {
        Self::Transfer(value)
    }
}

/// Change notification emitted after a mutation has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryChange {
    Added(BookId),
    Loaned(BookId),
    Returned(BookId),
    Edited(BookId),
    Deleted(BookId),
    Replaced { count: usize },
    Cleared { removed: usize },
}

type Listener = Box<dyn FnMut(&RegistryChange)>;

/// Session registry over a [`BookStore`].
pub struct BookRegistry<S: BookStore> {
    store: S,
    books: Vec<Book>,
    listeners: Vec<Listener>,
}

impl<S: BookStore> BookRegistry<S> {
    /// Loads and sanitizes persisted books.
    ///
    /// Malformed persisted data yields an empty registry; only storage
    /// transport failures are returned as errors.
    pub fn open(store: S) -> RegistryResult<Self> {
        let raw = store.load()?;
        let books = sanitize_books(&raw);
        info!(
            "event=registry_open module=service status=ok books={}",
            books.len()
        );
        Ok(Self {
            store,
            books,
            listeners: Vec::new(),
        })
    }

    /// Registers a listener called after every persisted mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&RegistryChange) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// All books in insertion order.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    /// Adds an available book and returns its generated id.
    pub fn add(&mut self, draft: &BookDraft) -> RegistryResult<BookId> {
        let draft = logged("add", draft.validate())?;
        self.apply("add", move |books| {
            let book = Book::new(draft.title, draft.author, draft.category);
            let id = book.id.clone();
            books.push(book);
            Ok((id.clone(), RegistryChange::Added(id)))
        })
    }

    /// Loans an available book to `request.borrower`.
    pub fn loan(&mut self, id: &str, request: &LoanRequest) -> RegistryResult<()> {
        let request = logged("loan", request.validate())?;
        let id = id.to_string();
        self.apply("loan", move |books| {
            let book = find_mut(books, &id)?;
            if book.is_loaned {
                return Err(RegistryError::AlreadyLoaned(id));
            }
            book.history.push(
                HistoryEntry::loan(
                    Utc::now(),
                    request.borrower.as_str(),
                    &request.due_date,
                    &request.notes,
                )
                .into(),
            );
            book.is_loaned = true;
            book.borrower = request.borrower;
            book.due_date = request.due_date;
            book.notes = request.notes;
            Ok(((), RegistryChange::Loaned(id)))
        })
    }

    /// Returns a loaned book and clears its loan fields.
    pub fn return_book(&mut self, id: &str) -> RegistryResult<()> {
        let id = id.to_string();
        self.apply("return", move |books| {
            let book = find_mut(books, &id)?;
            if !book.is_loaned {
                return Err(RegistryError::NotLoaned(id));
            }
            book.history
                .push(HistoryEntry::returned(Utc::now(), book.borrower.as_str()).into());
            book.is_loaned = false;
            book.borrower.clear();
            book.due_date.clear();
            book.notes.clear();
            Ok(((), RegistryChange::Returned(id)))
        })
    }

    /// Replaces title, author and category. Loan state and history are kept.
    pub fn edit(&mut self, id: &str, draft: &BookDraft) -> RegistryResult<()> {
        let draft = logged("edit", draft.validate())?;
        let id = id.to_string();
        self.apply("edit", move |books| {
            let book = find_mut(books, &id)?;
            book.title = draft.title;
            book.author = draft.author;
            book.category = draft.category;
            Ok(((), RegistryChange::Edited(id)))
        })
    }

    /// Removes a book if present and returns it.
    ///
    /// Absent ids are a no-op and nothing is persisted. Confirmation is the
    /// caller's responsibility.
    pub fn delete(&mut self, id: &str) -> RegistryResult<Option<Book>> {
        let Some(index) = self.books.iter().position(|book| book.id == id) else {
            return Ok(None);
        };
        self.apply("delete", move |books| {
            let removed = books.remove(index);
            let change = RegistryChange::Deleted(removed.id.clone());
            Ok((Some(removed), change))
        })
    }

    /// Removes every book. Returns the number removed.
    pub fn clear(&mut self) -> RegistryResult<usize> {
        self.apply("clear", |books| {
            let removed = books.len();
            books.clear();
            Ok((removed, RegistryChange::Cleared { removed }))
        })
    }

    /// Replaces the whole registry (full overwrite, not a merge).
    pub fn replace_all(&mut self, mut incoming: Vec<Book>) -> RegistryResult<usize> {
        ensure_unique_ids(&mut incoming);
        self.apply("replace", move |books| {
            let count = incoming.len();
            *books = incoming;
            Ok((count, RegistryChange::Replaced { count }))
        })
    }

    /// Imports a JSON array, replacing the registry.
    ///
    /// Malformed or non-array input is rejected before any mutation.
    pub fn import_json(&mut self, text: &str) -> RegistryResult<usize> {
        let incoming = logged("import", transfer::parse_import(text))?;
        self.replace_all(incoming)
    }

    /// Pretty JSON snapshot of the full registry.
    pub fn export_json(&self) -> TransferResult<String> {
        transfer::export_json(&self.books)
    }

    /// CSV snapshot of the full registry with statuses at the local clock.
    pub fn export_csv(&self) -> TransferResult<String> {
        transfer::export_csv(&self.books, local_now())
    }

    /// Filtered view evaluated at the local clock.
    pub fn filter(&self, query: &BookQuery) -> Vec<&Book> {
        self.filter_at(query, local_now())
    }

    /// Filtered view evaluated at a given local instant.
    pub fn filter_at(&self, query: &BookQuery, now: NaiveDateTime) -> Vec<&Book> {
        filter_books(&self.books, query, now)
    }

    fn apply<T>(
        &mut self,
        operation: &'static str,
        mutation: impl FnOnce(&mut Vec<Book>) -> RegistryResult<(T, RegistryChange)>,
    ) -> RegistryResult<T> {
        let snapshot = self.books.clone();
        let outcome = mutation(&mut self.books).and_then(|applied| {
            self.store.save(&self.books)?;
            Ok(applied)
        });

        match outcome {
            Ok((value, change)) => {
                info!(
                    "event=registry_{operation} module=service status=ok books={}",
                    self.books.len()
                );
                for listener in &mut self.listeners {
                    listener(&change);
                }
                Ok(value)
            }
            Err(err) => {
                self.books = snapshot;
                log_rejection(operation, &err);
                Err(err)
            }
        }
    }
}

fn logged<T, E>(operation: &str, result: Result<T, E>) -> RegistryResult<T>
where
    E: Into<RegistryError>,
{
    result.map_err(|err| {
        let err = err.into();
        log_rejection(operation, &err);
        err
    })
}

fn find_mut<'a>(books: &'a mut [Book], id: &str) -> RegistryResult<&'a mut Book> {
    books
        .iter_mut()
        .find(|book| book.id == id)
        .ok_or_else(|| RegistryError::NotFound(id.to_string()))
}

fn log_rejection(operation: &str, err: &RegistryError) {
    match err {
        RegistryError::Store(_) => warn!(
            "event=registry_{operation} module=service status=error error_code={} error={}",
            err.code(),
            err
        ),
        _ => info!(
            "event=registry_{operation} module=service status=rejected error_code={}",
            err.code()
        ),
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

//! Normalization of externally sourced book records.
//!
//! # Responsibility
//! - Turn any JSON value (loaded blob element, imported element) into a
//!   well-formed [`Book`].
//! - Keep ids unique across one loaded/imported collection.
//!
//! # Invariants
//! - `sanitize_book` is total: it never fails and never panics.
//! - History elements are classified, never repaired or dropped.
//! - The "unloaned implies empty borrower" rule is not enforced here.

use crate::model::book::{new_book_id, Book, HistoryItem};
use log::warn;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Normalizes one raw record into the canonical book shape.
///
/// Non-object input is treated as an object with no fields.
pub fn sanitize_book(raw: &Value) -> Book {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    let id = fields
        .get("id")
        .map(coerce_text)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(new_book_id);

    Book {
        id,
        title: text_field(fields, "title"),
        author: text_field(fields, "author"),
        category: text_field(fields, "category"),
        is_loaned: fields.get("isLoaned").is_some_and(is_truthy),
        borrower: text_field(fields, "borrower"),
        due_date: text_field(fields, "dueDate"),
        notes: text_field(fields, "notes"),
        history: match fields.get("history") {
            Some(Value::Array(items)) => items.iter().map(HistoryItem::from_value).collect(),
            _ => Vec::new(),
        },
    }
}

/// Sanitizes every element of a raw array and de-duplicates ids.
pub fn sanitize_books(raw: &[Value]) -> Vec<Book> {
    let mut books = raw.iter().map(sanitize_book).collect::<Vec<_>>();
    let reassigned = ensure_unique_ids(&mut books);
    if reassigned > 0 {
        warn!(
            "event=sanitize_ids module=model status=repaired reassigned={} total={}",
            reassigned,
            books.len()
        );
    }
    books
}

/// Gives a fresh id to every book whose id repeats an earlier one.
///
/// Returns the number of reassigned ids. The first occurrence keeps its id.
pub fn ensure_unique_ids(books: &mut [Book]) -> usize {
    let mut seen = HashSet::with_capacity(books.len());
    let mut reassigned = 0;
    for book in books.iter_mut() {
        if !seen.insert(book.id.clone()) {
            let mut fresh = new_book_id();
            while seen.contains(&fresh) {
                fresh = new_book_id();
            }
            seen.insert(fresh.clone());
            book.id = fresh;
            reassigned += 1;
        }
    }
    reassigned
}

fn text_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .map(coerce_text)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// Loose text coercion: falsy values become empty text.
fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) if is_truthy(value) => number.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => String::new(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

use super::{TransferError, TransferResult};
use crate::model::book::Book;
use crate::model::sanitize::sanitize_books;
use serde_json::Value;

/// Pretty-prints the full registry as a JSON array.
pub fn export_json(books: &[Book]) -> TransferResult<String> {
    serde_json::to_string_pretty(books).map_err(TransferError::Serialize)
}

/// Parses import text into sanitized books.
///
/// The root must be a JSON array; each element is sanitized and duplicate
/// ids are reassigned.
pub fn parse_import(text: &str) -> TransferResult<Vec<Book>> {
    match serde_json::from_str::<Value>(text).map_err(TransferError::Parse)? {
        Value::Array(records) => Ok(sanitize_books(&records)),
        _ => Err(TransferError::NotAnArray),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_import;
    use crate::transfer::TransferError;

    #[test]
    fn parse_import_rejects_non_array_roots() {
        assert!(matches!(
            parse_import(r#"{"title": "Dune"}"#),
            Err(TransferError::NotAnArray)
        ));
        assert!(matches!(parse_import("[1, 2"), Err(TransferError::Parse(_))));
    }

    #[test]
    fn parse_import_accepts_empty_array() {
        assert!(parse_import("[]").unwrap().is_empty());
    }
}

use super::{TransferError, TransferResult};
use crate::model::book::Book;
use chrono::NaiveDateTime;
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Fixed column order of the CSV export.
pub const CSV_HEADER: [&str; 7] = [
    "Title", "Author", "Category", "Status", "Borrower", "DueDate", "Notes",
];

/// Renders every book as one CSV row, in registry order.
///
/// `Status` is the display label at local instant `now`. Fields containing
/// a comma, double quote or line break are quoted with quotes doubled.
pub fn export_csv(books: &[Book], now: NaiveDateTime) -> TransferResult<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for book in books {
        writer.write_record([
            book.title.as_str(),
            book.author.as_str(),
            book.category.as_str(),
            book.status_at(now).label(),
            book.borrower.as_str(),
            book.due_date.as_str(),
            book.notes.as_str(),
        ])?;
    }

    let data = writer
        .into_inner()
        .map_err(|err| TransferError::Csv(err.into_error().into()))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

//! Terminal rendering and confirmation prompts.

use std::io::{self, BufRead, Write};

use biblioteca_core::{Book, HistoryItem, LoanEventKind};

/// Renders one list row per book.
pub fn write_book_rows(out: &mut impl Write, books: &[&Book]) -> io::Result<()> {
    if books.is_empty() {
        return writeln!(out, "No books match.");
    }
    for book in books {
        write!(
            out,
            "{}  {:<9}  {} / {} [{}]",
            book.id,
            book.status(),
            book.title,
            book.author,
            book.category
        )?;
        if book.is_loaned {
            write!(out, "  -> {}", book.borrower)?;
            if !book.due_date.is_empty() {
                write!(out, " (due {})", book.due_date)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Renders one book with its loan history.
pub fn write_book_detail(out: &mut impl Write, book: &Book) -> io::Result<()> {
    writeln!(out, "id:       {}", book.id)?;
    writeln!(out, "title:    {}", book.title)?;
    writeln!(out, "author:   {}", book.author)?;
    writeln!(out, "category: {}", book.category)?;
    writeln!(out, "status:   {}", book.status())?;
    if book.is_loaned {
        writeln!(out, "borrower: {}", book.borrower)?;
        if !book.due_date.is_empty() {
            writeln!(out, "due:      {}", book.due_date)?;
        }
        if !book.notes.is_empty() {
            writeln!(out, "notes:    {}", book.notes)?;
        }
    }
    writeln!(out, "history:  {} event(s)", book.history.len())?;
    for item in &book.history {
        match item {
            HistoryItem::Entry { entry, .. } => {
                let kind = match entry.kind {
                    LoanEventKind::Loan => "loan",
                    LoanEventKind::Return => "return",
                };
                write!(
                    out,
                    "  {} {:<6} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    kind,
                    entry.actor
                )?;
                if let Some(due) = &entry.due_date {
                    write!(out, " (due {due})")?;
                }
                writeln!(out)?;
            }
            HistoryItem::Unrecognized(value) => writeln!(out, "  ? {value}")?,
        }
    }
    Ok(())
}

/// Asks a yes/no question; only an explicit yes confirms.
pub fn confirm(prompt: &str, input: &mut impl BufRead, out: &mut impl Write) -> io::Result<bool> {
    write!(out, "{prompt} [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "s" | "si" | "sí"
    ))
}

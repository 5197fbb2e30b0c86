//! Biblioteca command line interface.
//!
//! A terminal front end over `biblioteca_core`: every subcommand maps to one
//! registry operation against the local library database.

mod error;
mod output;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use biblioteca_core::db::open_db;
use biblioteca_core::{
    core_version, default_log_level, init_logging, BookDraft, BookQuery, BookRegistry,
    LoanRequest, SqliteBookStore, StatusFilter, CSV_EXPORT_FILE_NAME, JSON_EXPORT_FILE_NAME,
    STORAGE_KEY,
};
use clap::{Parser, Subcommand};
use log::{debug, error};

use crate::error::{CliError, Result};
use crate::output::{confirm, write_book_detail, write_book_rows};

/// Small-library inventory: books, loans and loan history.
#[derive(Parser, Debug)]
#[command(name = "biblioteca")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the library database file
    #[arg(
        short,
        long,
        env = "BIBLIOTECA_DB",
        default_value = "biblioteca.sqlite3",
        global = true
    )]
    pub database: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "BIBLIOTECA_LOG_LEVEL", default_value = default_log_level(), global = true)]
    pub log_level: String,

    /// Directory for rolling log files; logging is off when unset
    #[arg(long, env = "BIBLIOTECA_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a book to the catalog
    Add {
        title: String,
        author: String,
        category: String,
    },

    /// List books, optionally filtered
    List {
        /// Case-insensitive text matched against title, author and category
        #[arg(short, long, default_value = "")]
        query: String,

        /// all | available | loaned | overdue
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,
    },

    /// Show one book with its loan history
    Show { id: String },

    /// Loan a book to a borrower
    Loan {
        id: String,

        #[arg(short, long)]
        borrower: String,

        /// Due date as YYYY-MM-DD
        #[arg(long, default_value = "")]
        due: String,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Mark a loaned book as returned
    Return { id: String },

    /// Change title, author or category; omitted fields keep their value
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        author: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Delete a book
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete every book
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Export the full catalog as JSON
    ExportJson {
        #[arg(short, long, default_value = JSON_EXPORT_FILE_NAME)]
        output: PathBuf,
    },

    /// Export the full catalog as CSV
    ExportCsv {
        #[arg(short, long, default_value = CSV_EXPORT_FILE_NAME)]
        output: PathBuf,
    },

    /// Replace the catalog with the books of a JSON export
    Import { file: PathBuf },

    /// Show database and catalog information
    Info,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(log_dir) = &cli.log_dir {
        let log_dir = absolute(log_dir)?;
        init_logging(&cli.log_level, &log_dir.to_string_lossy())?;
    }

    let conn = open_db(&cli.database)?;
    let mut registry = BookRegistry::open(SqliteBookStore::new(&conn))?;
    registry.subscribe(|change| debug!("event=registry_change module=cli change={change:?}"));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Add {
            title,
            author,
            category,
        } => {
            let id = registry.add(&BookDraft::new(title, author, category))?;
            writeln!(out, "added {id}")?;
        }
        Commands::List { query, status } => {
            let books = registry.filter(&BookQuery::new(query, status));
            write_book_rows(&mut out, &books)?;
        }
        Commands::Show { id } => {
            let book = registry
                .find_by_id(&id)
                .ok_or_else(|| CliError::BookNotFound(id.clone()))?;
            write_book_detail(&mut out, book)?;
        }
        Commands::Loan {
            id,
            borrower,
            due,
            notes,
        } => {
            registry.loan(&id, &LoanRequest::new(borrower).due(due).notes(notes))?;
            writeln!(out, "loaned {id}")?;
        }
        Commands::Return { id } => {
            registry.return_book(&id)?;
            writeln!(out, "returned {id}")?;
        }
        Commands::Edit {
            id,
            title,
            author,
            category,
        } => {
            let current = registry
                .find_by_id(&id)
                .ok_or_else(|| CliError::BookNotFound(id.clone()))?;
            let draft = BookDraft::new(
                title.unwrap_or_else(|| current.title.clone()),
                author.unwrap_or_else(|| current.author.clone()),
                category.unwrap_or_else(|| current.category.clone()),
            );
            registry.edit(&id, &draft)?;
            writeln!(out, "edited {id}")?;
        }
        Commands::Delete { id, yes } => {
            let title = registry
                .find_by_id(&id)
                .map(|book| book.title.clone())
                .ok_or_else(|| CliError::BookNotFound(id.clone()))?;
            let prompt = format!("Delete \"{title}\"?");
            if !yes && !confirm(&prompt, &mut io::stdin().lock(), &mut out)? {
                writeln!(out, "cancelled")?;
                return Ok(());
            }
            registry.delete(&id)?;
            writeln!(out, "deleted {id}")?;
        }
        Commands::Reset { yes } => {
            let prompt = format!("Delete all {} book(s)?", registry.len());
            if !yes && !confirm(&prompt, &mut io::stdin().lock(), &mut out)? {
                writeln!(out, "cancelled")?;
                return Ok(());
            }
            let removed = registry.clear()?;
            writeln!(out, "removed {removed} book(s)")?;
        }
        Commands::ExportJson { output } => {
            fs::write(&output, registry.export_json()?)?;
            writeln!(out, "exported {} book(s) to {}", registry.len(), output.display())?;
        }
        Commands::ExportCsv { output } => {
            fs::write(&output, registry.export_csv()?)?;
            writeln!(out, "exported {} book(s) to {}", registry.len(), output.display())?;
        }
        Commands::Import { file } => {
            if !file.exists() {
                return Err(CliError::FileNotFound(file));
            }
            let text = fs::read_to_string(&file)?;
            let count = registry.import_json(&text)?;
            writeln!(out, "imported {count} book(s) from {}", file.display())?;
        }
        Commands::Info => {
            writeln!(out, "version:  {}", core_version())?;
            writeln!(out, "database: {}", cli.database.display())?;
            writeln!(out, "key:      {STORAGE_KEY}")?;
            writeln!(out, "books:    {}", registry.len())?;
            let loaned = registry.books().iter().filter(|b| b.is_loaned).count();
            writeln!(out, "loaned:   {loaned}")?;
        }
    }

    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use biblioteca_core::StatusFilter;
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_parses_status_filter() {
        let cli = Cli::try_parse_from(["biblioteca", "list", "-s", "overdue", "-q", "tolkien"])
            .unwrap();
        match cli.command {
            Commands::List { query, status } => {
                assert_eq!(query, "tolkien");
                assert_eq!(status, StatusFilter::Overdue);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_status_filter_is_rejected() {
        assert!(Cli::try_parse_from(["biblioteca", "list", "--status", "lost"]).is_err());
    }
}

use biblioteca_core::db::open_db_in_memory;
use biblioteca_core::{
    Book, BookDraft, BookQuery, BookRegistry, BookStore, BookValidationError, LoanEventKind,
    LoanRequest, RegistryChange, RegistryError, SqliteBookStore, StatusFilter, StoreError,
    StoreResult,
};
use rusqlite::Connection;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

fn open_registry(conn: &Connection) -> BookRegistry<SqliteBookStore<'_>> {
    BookRegistry::open(SqliteBookStore::new(conn)).unwrap()
}

fn dune() -> BookDraft {
    BookDraft::new("Dune", "Herbert", "SciFi")
}

#[test]
fn add_creates_available_book_and_persists_it() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);

    let id = registry.add(&BookDraft::new("  Dune ", "Herbert", "SciFi")).unwrap();

    assert_eq!(registry.len(), 1);
    let book = registry.find_by_id(&id).unwrap();
    assert_eq!(book.title, "Dune");
    assert!(!book.is_loaned);
    assert!(book.history.is_empty());

    let reopened = open_registry(&conn);
    assert_eq!(reopened.books(), registry.books());
}

#[test]
fn add_with_blank_field_is_rejected_without_mutation() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);

    for draft in [
        BookDraft::new("", "Herbert", "SciFi"),
        BookDraft::new("Dune", "   ", "SciFi"),
        BookDraft::new("Dune", "Herbert", "\t"),
    ] {
        let err = registry.add(&draft).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(BookValidationError::EmptyField(_))));
    }
    assert!(registry.is_empty());
}

#[test]
fn generated_ids_are_unique() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);

    let first = registry.add(&dune()).unwrap();
    let second = registry.add(&dune()).unwrap();

    assert_ne!(first, second);
}

#[test]
fn loan_marks_book_and_appends_one_history_entry() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    let id = registry.add(&dune()).unwrap();

    registry
        .loan(&id, &LoanRequest::new(" Ana ").due("2030-01-01").notes("cover torn"))
        .unwrap();

    let book = registry.find_by_id(&id).unwrap();
    assert!(book.is_loaned);
    assert_eq!(book.borrower, "Ana");
    assert_eq!(book.due_date, "2030-01-01");
    assert_eq!(book.notes, "cover torn");
    assert_eq!(book.history.len(), 1);
    let entry = book.history[0].entry().unwrap();
    assert_eq!(entry.kind, LoanEventKind::Loan);
    assert_eq!(entry.actor, "Ana");
    assert_eq!(entry.due_date.as_deref(), Some("2030-01-01"));
}

#[test]
fn loan_twice_is_rejected_and_leaves_state_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    let id = registry.add(&dune()).unwrap();
    registry.loan(&id, &LoanRequest::new("Ana")).unwrap();

    let err = registry.loan(&id, &LoanRequest::new("Luis")).unwrap_err();

    assert!(matches!(err, RegistryError::AlreadyLoaned(ref rejected) if *rejected == id));
    let book = registry.find_by_id(&id).unwrap();
    assert_eq!(book.borrower, "Ana");
    assert_eq!(book.history.len(), 1);
}

#[test]
fn loan_requires_borrower_and_existing_book() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    let id = registry.add(&dune()).unwrap();

    let blank = registry.loan(&id, &LoanRequest::new("  ")).unwrap_err();
    assert!(matches!(
        blank,
        RegistryError::Validation(BookValidationError::EmptyField("borrower"))
    ));

    let missing = registry.loan("nope", &LoanRequest::new("Ana")).unwrap_err();
    assert!(matches!(missing, RegistryError::NotFound(_)));

    let bad_date = registry
        .loan(&id, &LoanRequest::new("Ana").due("31/12/2030"))
        .unwrap_err();
    assert!(matches!(
        bad_date,
        RegistryError::Validation(BookValidationError::InvalidDueDate(_))
    ));
    assert!(!registry.find_by_id(&id).unwrap().is_loaned);
}

#[test]
fn return_clears_loan_fields_and_appends_return_entry() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    let id = registry.add(&dune()).unwrap();
    registry
        .loan(&id, &LoanRequest::new("Ana").due("2030-01-01").notes("gift"))
        .unwrap();

    registry.return_book(&id).unwrap();

    let book = registry.find_by_id(&id).unwrap();
    assert!(!book.is_loaned);
    assert_eq!(book.borrower, "");
    assert_eq!(book.due_date, "");
    assert_eq!(book.notes, "");
    assert_eq!(book.history_entries().count(), 2);
    let entry = book.history[1].entry().unwrap();
    assert_eq!(entry.kind, LoanEventKind::Return);
    assert_eq!(entry.actor, "Ana");
}

#[test]
fn return_on_available_or_missing_book_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    let id = registry.add(&dune()).unwrap();

    assert!(matches!(
        registry.return_book(&id).unwrap_err(),
        RegistryError::NotLoaned(_)
    ));
    assert!(matches!(
        registry.return_book("nope").unwrap_err(),
        RegistryError::NotFound(_)
    ));
    assert!(registry.find_by_id(&id).unwrap().history.is_empty());
}

#[test]
fn loan_filter_return_scenario() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    let id = registry.add(&dune()).unwrap();

    registry
        .loan(&id, &LoanRequest::new("Ana").due("2030-01-01"))
        .unwrap();
    assert_eq!(registry.find_by_id(&id).unwrap().borrower, "Ana");
    assert_eq!(registry.find_by_id(&id).unwrap().history.len(), 1);

    let overdue = BookQuery::new("", StatusFilter::Overdue);
    let now = chrono::NaiveDate::from_ymd_opt(2026, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    assert!(registry.filter_at(&overdue, now).is_empty());

    registry.return_book(&id).unwrap();
    let book = registry.find_by_id(&id).unwrap();
    assert!(!book.is_loaned);
    assert_eq!(book.history.len(), 2);
    assert_eq!(book.borrower, "");
}

#[test]
fn edit_updates_catalog_fields_only() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    let id = registry.add(&dune()).unwrap();
    registry.loan(&id, &LoanRequest::new("Ana")).unwrap();

    registry
        .edit(&id, &BookDraft::new("Dune Messiah", " Frank Herbert ", "SciFi"))
        .unwrap();

    let book = registry.find_by_id(&id).unwrap();
    assert_eq!(book.title, "Dune Messiah");
    assert_eq!(book.author, "Frank Herbert");
    assert!(book.is_loaned);
    assert_eq!(book.borrower, "Ana");
    assert_eq!(book.history.len(), 1);
}

#[test]
fn edit_rejects_blank_fields_and_missing_book() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    let id = registry.add(&dune()).unwrap();

    assert!(matches!(
        registry.edit(&id, &BookDraft::new("", "x", "y")).unwrap_err(),
        RegistryError::Validation(_)
    ));
    assert!(matches!(
        registry.edit("nope", &dune()).unwrap_err(),
        RegistryError::NotFound(_)
    ));
    assert_eq!(registry.find_by_id(&id).unwrap().title, "Dune");
}

#[test]
fn delete_removes_present_book_and_ignores_absent_id() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    let id = registry.add(&dune()).unwrap();
    registry.add(&BookDraft::new("Emma", "Austen", "Novel")).unwrap();

    let removed = registry.delete(&id).unwrap().unwrap();
    assert_eq!(removed.id, id);
    assert_eq!(registry.len(), 1);
    assert!(registry.find_by_id(&id).is_none());

    assert!(registry.delete(&id).unwrap().is_none());
    assert_eq!(open_registry(&conn).len(), 1);
}

#[test]
fn clear_removes_everything() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    registry.add(&dune()).unwrap();
    registry.add(&BookDraft::new("Emma", "Austen", "Novel")).unwrap();

    assert_eq!(registry.clear().unwrap(), 2);
    assert!(registry.is_empty());
    assert!(open_registry(&conn).is_empty());
}

#[test]
fn subscribers_see_only_persisted_changes() {
    let conn = open_db_in_memory().unwrap();
    let mut registry = open_registry(&conn);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    registry.subscribe(move |change| sink.borrow_mut().push(change.clone()));

    let id = registry.add(&dune()).unwrap();
    registry.return_book(&id).unwrap_err();
    registry.loan(&id, &LoanRequest::new("Ana")).unwrap();
    registry.return_book(&id).unwrap();
    registry.delete(&id).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            RegistryChange::Added(id.clone()),
            RegistryChange::Loaned(id.clone()),
            RegistryChange::Returned(id.clone()),
            RegistryChange::Deleted(id),
        ]
    );
}

struct FailingStore {
    fail: Rc<RefCell<bool>>,
}

impl BookStore for FailingStore {
    fn load(&self) -> StoreResult<Vec<Value>> {
        Ok(Vec::new())
    }

    fn save(&self, _books: &[Book]) -> StoreResult<()> {
        if *self.fail.borrow() {
            let err = serde_json::from_str::<Value>("{").unwrap_err();
            return Err(StoreError::Serialize(err));
        }
        Ok(())
    }
}

#[test]
fn failed_save_rolls_back_in_memory_state() {
    let fail = Rc::new(RefCell::new(false));
    let mut registry = BookRegistry::open(FailingStore {
        fail: Rc::clone(&fail),
    })
    .unwrap();
    let id = registry.add(&dune()).unwrap();

    *fail.borrow_mut() = true;
    let err = registry.loan(&id, &LoanRequest::new("Ana")).unwrap_err();

    assert!(matches!(err, RegistryError::Store(_)));
    let book = registry.find_by_id(&id).unwrap();
    assert!(!book.is_loaned);
    assert!(book.history.is_empty());

    assert!(registry.add(&BookDraft::new("Emma", "Austen", "Novel")).is_err());
    assert_eq!(registry.len(), 1);
}

#[test]
fn open_recovers_from_corrupt_storage() {
    let conn = open_db_in_memory().unwrap();
    SqliteBookStore::new(&conn).write_blob("not json at all").unwrap();

    let mut registry = open_registry(&conn);
    assert!(registry.is_empty());

    registry.add(&dune()).unwrap();
    assert_eq!(open_registry(&conn).len(), 1);
}

#[test]
fn open_recovers_from_undecodable_storage_and_can_reset() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, CAST(x'5bff5d' AS TEXT));",
        [biblioteca_core::STORAGE_KEY],
    )
    .unwrap();

    let mut registry = open_registry(&conn);
    assert!(registry.is_empty());
    assert_eq!(registry.clear().unwrap(), 0);
    assert!(open_registry(&conn).is_empty());
}

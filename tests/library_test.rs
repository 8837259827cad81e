use std::cell::RefCell;
use std::rc::Rc;

use library_manager::manager::{AUTHOR_COL, CATEGORY_COL};
use library_manager::{
    ActionError, EntityKind, EntityManager, Library, LibraryEvent, StoreError,
};
use rusqlite::Connection;

fn library() -> Library {
    Library::open(Connection::open_in_memory().unwrap()).unwrap()
}

fn values(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

fn add_category(lib: &mut Library, name: &str) -> String {
    let index = lib
        .add(EntityKind::Category, &values(&["", name, ""]))
        .unwrap();
    let id = lib.categories().table().get_cell(index, 0).unwrap().to_string();
    format!("{name} {id}")
}

fn add_author(lib: &mut Library, first: &str, last: &str) -> String {
    let index = lib
        .add(EntityKind::Author, &values(&["", first, last, "", ""]))
        .unwrap();
    let id = lib.authors().table().get_cell(index, 0).unwrap().to_string();
    format!("{first} {last} {id}")
}

fn book_values(title: &str, author: &str, category: &str, isbn: &str) -> Vec<String> {
    values(&["", title, author, category, isbn, "01.08.1965", ""])
}

fn add_book(lib: &mut Library, title: &str, author: &str, category: &str, isbn: &str) -> usize {
    lib.add(EntityKind::Book, &book_values(title, author, category, isbn))
        .unwrap()
}

fn record_events(lib: &mut Library) -> Rc<RefCell<Vec<LibraryEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    lib.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    log
}

#[test]
fn referenced_category_cannot_be_deleted() {
    let mut lib = library();
    let fantasy = add_category(&mut lib, "Fantasy");
    let author = add_author(&mut lib, "Ursula", "Le Guin");
    add_book(&mut lib, "Earthsea", &author, &fantasy, "AAA");
    assert_eq!(lib.categories().book_count(1), Some(1));

    let report = lib.delete_rows(EntityKind::Category, &[0]);
    assert!(report.deleted.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].error.is_conflict());
    assert_eq!(lib.categories().table().row_count(), 1);
    assert_eq!(lib.books().choices(CATEGORY_COL), [fantasy.clone()]);

    let report = lib.delete_rows(EntityKind::Book, &[0]);
    assert!(report.is_clean());
    assert_eq!(lib.categories().book_count(1), Some(0));
    assert_eq!(lib.authors().book_count(1), Some(0));

    let report = lib.delete_rows(EntityKind::Category, &[0]);
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(lib.categories().table().row_count(), 0);
    assert!(lib.books().choices(CATEGORY_COL).is_empty());
}

#[test]
fn referenced_author_cannot_be_deleted() {
    let mut lib = library();
    let category = add_category(&mut lib, "Classics");
    let author = add_author(&mut lib, "Jane", "Austen");
    add_author(&mut lib, "Unused", "Writer");
    add_book(&mut lib, "Emma", &author, &category, "BBB");

    let report = lib.delete_rows(EntityKind::Author, &[0, 1]);
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(report.deleted[0].label, "Unused Writer");
    assert_eq!(report.failed[0].row, 0);
    assert!(matches!(
        report.failed[0].error,
        ActionError::Store {
            source: StoreError::InUse { .. },
            ..
        }
    ));
    assert_eq!(lib.authors().table().row_count(), 1);
    assert_eq!(lib.books().choices(AUTHOR_COL), [author]);
}

#[test]
fn incremental_counts_match_a_fresh_reload() {
    let mut lib = library();
    let fantasy = add_category(&mut lib, "Fantasy");
    let poetry = add_category(&mut lib, "Poetry");
    let tolkien = add_author(&mut lib, "John", "Tolkien");
    let lewis = add_author(&mut lib, "Clive", "Lewis");

    add_book(&mut lib, "The Hobbit", &tolkien, &fantasy, "H1");
    add_book(&mut lib, "Narnia", &lewis, &fantasy, "N1");
    add_book(&mut lib, "Poems", &tolkien, &poetry, "P1");

    lib.manager_mut(EntityKind::Book).select(&[1]);
    lib.edit(EntityKind::Book, &book_values("Narnia", &lewis, &poetry, "N1"))
        .unwrap();
    lib.delete_rows(EntityKind::Book, &[0]);

    let snapshot = |lib: &Library| {
        (
            lib.categories().book_count(1),
            lib.categories().book_count(2),
            lib.authors().book_count(1),
            lib.authors().book_count(2),
        )
    };
    let incremental = snapshot(&lib);
    assert_eq!(incremental, (Some(0), Some(2), Some(1), Some(1)));

    lib.reload().unwrap();
    assert_eq!(snapshot(&lib), incremental);
}

#[test]
fn category_rename_reaches_book_rows_and_selector() {
    let mut lib = library();
    let scifi = add_category(&mut lib, "Scifi");
    let other = add_category(&mut lib, "Other");
    let author = add_author(&mut lib, "Frank", "Herbert");
    add_book(&mut lib, "Dune", &author, &scifi, "D1");
    add_book(&mut lib, "Misc", &author, &other, "M1");

    lib.manager_mut(EntityKind::Category).select(&[0]);
    lib.edit(EntityKind::Category, &values(&["1", "Science Fiction", ""]))
        .unwrap();

    let books = lib.books().table();
    assert_eq!(books.get_cell(0, CATEGORY_COL), Some("Science Fiction 1"));
    assert_eq!(books.get_cell(1, CATEGORY_COL), Some("Other 2"));
    assert_eq!(
        lib.books().choices(CATEGORY_COL),
        ["Science Fiction 1".to_string(), other]
    );
    assert_eq!(lib.categories().book_count(1), Some(1));
}

#[test]
fn author_rename_reaches_book_rows() {
    let mut lib = library();
    let category = add_category(&mut lib, "Essays");
    let author = add_author(&mut lib, "Mary", "Shelly");
    add_book(&mut lib, "Notes", &author, &category, "E1");

    lib.manager_mut(EntityKind::Author).select(&[0]);
    lib.edit(
        EntityKind::Author,
        &values(&["1", "Mary", "Shelley", "Wrote Frankenstein", "1"]),
    )
    .unwrap();

    assert_eq!(
        lib.books().table().get_cell(0, AUTHOR_COL),
        Some("Mary Shelley 1")
    );
    assert_eq!(lib.authors().book_count(1), Some(1));
}

#[test]
fn batch_delete_continues_past_a_blocked_row() {
    let mut lib = library();
    let keys: Vec<String> = ["A", "B", "C", "D", "E", "F"]
        .iter()
        .map(|name| add_category(&mut lib, name))
        .collect();
    let author = add_author(&mut lib, "Some", "Author");
    add_book(&mut lib, "Pinned", &author, &keys[4], "X1");

    let events = record_events(&mut lib);
    let report = lib.delete_rows(EntityKind::Category, &[2, 4, 5]);

    assert_eq!(report.deleted.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].row, 4);
    assert_eq!(report.failed[0].key.label, "E");

    let remaining: Vec<&str> = (0..lib.categories().table().row_count())
        .filter_map(|row| lib.categories().table().get_cell(row, 1))
        .collect();
    assert_eq!(remaining, ["A", "B", "D", "E"]);

    let deleted = events
        .borrow()
        .iter()
        .filter(|event| matches!(event, LibraryEvent::CategoryDeleted(_)))
        .count();
    assert_eq!(deleted, 2);
    assert!(lib.categories().selection().is_empty());
}

#[test]
fn release_date_is_stored_iso_and_shown_dotted() {
    let mut lib = library();
    let category = add_category(&mut lib, "History");
    let author = add_author(&mut lib, "Mary", "Beard");
    lib.add(
        EntityKind::Book,
        &values(&["", "SPQR", author.as_str(), category.as_str(), "S1", "21.03.2024", ""]),
    )
    .unwrap();

    let stored: String = lib
        .connection()
        .query_row("SELECT release_date FROM books", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, "2024-03-21");
    assert_eq!(lib.books().table().get_cell(0, 5), Some("21.03.2024"));

    lib.reload().unwrap();
    assert_eq!(lib.books().table().get_cell(0, 5), Some("21.03.2024"));
}

#[test]
fn new_category_is_immediately_selectable_for_books() {
    let mut lib = library();
    let author = add_author(&mut lib, "Ann", "Leckie");
    add_category(&mut lib, "Space Opera");

    let option = lib.books().choices(CATEGORY_COL)[0].clone();
    let index = lib
        .add(EntityKind::Book, &book_values("Ancillary Justice", &author, &option, "AJ1"))
        .unwrap();

    assert_eq!(
        lib.books().table().get_cell(index, CATEGORY_COL),
        Some(option.as_str())
    );
    assert_eq!(lib.categories().book_count(1), Some(1));
}

#[test]
fn missing_required_fields_change_nothing() {
    let mut lib = library();
    let category = add_category(&mut lib, "Drama");
    let author = add_author(&mut lib, "Anton", "Chekhov");
    let events = record_events(&mut lib);

    let err = lib
        .add(EntityKind::Book, &book_values("   ", &author, &category, "C1"))
        .unwrap_err();
    assert!(matches!(err, ActionError::MissingFields(ref fields) if fields == &["Title"]));
    assert_eq!(lib.books().table().row_count(), 0);
    assert_eq!(lib.categories().book_count(1), Some(0));
    assert!(events.borrow().is_empty());
}

#[test]
fn duplicate_isbn_is_rejected_without_touching_counts() {
    let mut lib = library();
    let category = add_category(&mut lib, "Sagas");
    let author = add_author(&mut lib, "Snorri", "Sturluson");
    add_book(&mut lib, "Edda", &author, &category, "SAME");

    let err = lib
        .add(EntityKind::Book, &book_values("Heimskringla", &author, &category, "SAME"))
        .unwrap_err();
    assert!(matches!(
        err,
        ActionError::Store {
            source: StoreError::Duplicate { .. },
            ..
        }
    ));
    assert_eq!(lib.books().table().row_count(), 1);
    assert_eq!(lib.categories().book_count(1), Some(1));
    assert_eq!(lib.authors().book_count(1), Some(1));
}

#[test]
fn edit_requires_exactly_one_selected_row() {
    let mut lib = library();
    add_category(&mut lib, "One");
    add_category(&mut lib, "Two");

    let err = lib
        .edit(EntityKind::Category, &values(&["1", "Uno", ""]))
        .unwrap_err();
    assert!(matches!(err, ActionError::NoSelection));

    lib.manager_mut(EntityKind::Category).select(&[0, 1]);
    let err = lib
        .edit(EntityKind::Category, &values(&["1", "Uno", ""]))
        .unwrap_err();
    assert!(matches!(err, ActionError::NoSelection));
    assert_eq!(lib.categories().table().get_cell(0, 1), Some("One"));
}

#[test]
fn listeners_run_in_subscription_order_after_sync() {
    let mut lib = library();
    let order = Rc::new(RefCell::new(Vec::new()));

    let first = Rc::clone(&order);
    lib.subscribe(move |event| first.borrow_mut().push(("first", event.source())));
    let second = Rc::clone(&order);
    lib.subscribe(move |event| second.borrow_mut().push(("second", event.source())));

    add_category(&mut lib, "Mystery");
    assert_eq!(
        *order.borrow(),
        [("first", EntityKind::Category), ("second", EntityKind::Category)]
    );
    assert_eq!(lib.books().choices(CATEGORY_COL), ["Mystery 1".to_string()]);
}

#[test]
fn moving_a_book_to_another_author_moves_both_counts() {
    let mut lib = library();
    let category = add_category(&mut lib, "Mystery");
    let christie = add_author(&mut lib, "Agatha", "Christie");
    let sayers = add_author(&mut lib, "Dorothy", "Sayers");
    add_book(&mut lib, "Gaudy Night", &christie, &category, "G1");
    assert_eq!(lib.authors().book_count(1), Some(1));
    assert_eq!(lib.authors().book_count(2), Some(0));

    let events = record_events(&mut lib);
    lib.manager_mut(EntityKind::Book).select(&[0]);
    lib.edit(EntityKind::Book, &book_values("Gaudy Night", &sayers, &category, "G1"))
        .unwrap();

    assert_eq!(lib.authors().book_count(1), Some(0));
    assert_eq!(lib.authors().book_count(2), Some(1));
    assert_eq!(lib.categories().book_count(1), Some(1));
    assert_eq!(lib.books().table().get_cell(0, AUTHOR_COL), Some(sayers.as_str()));
    assert!(matches!(
        events.borrow().as_slice(),
        [LibraryEvent::BookEdited { old_refs, new_refs, .. }]
            if old_refs.author_id == 1 && new_refs.author_id == 2
    ));

    lib.reload().unwrap();
    assert_eq!(lib.authors().book_count(1), Some(0));
    assert_eq!(lib.authors().book_count(2), Some(1));
    assert_eq!(lib.categories().book_count(1), Some(1));
}

#[test]
fn rejected_rename_leaves_every_tab_untouched() {
    let mut lib = library();
    let first = add_category(&mut lib, "A");
    let second = add_category(&mut lib, "B");
    let author = add_author(&mut lib, "Some", "Author");
    add_book(&mut lib, "Pinned", &author, &second, "R1");

    let events = record_events(&mut lib);
    let categories = lib.manager_mut(EntityKind::Category);
    categories.select(&[1]);
    categories.begin_edit().unwrap();
    let revision = lib.categories().table().revision();
    let book_revision = lib.books().table().revision();

    let err = lib
        .edit(EntityKind::Category, &values(&["2", "A", ""]))
        .unwrap_err();

    assert!(matches!(
        err,
        ActionError::Store {
            source: StoreError::Duplicate { .. },
            ..
        }
    ));
    assert_eq!(lib.categories().mode(), library_manager::Mode::EditForm);
    assert_eq!(lib.categories().table().revision(), revision);
    assert_eq!(
        lib.categories().table().row(1).unwrap(),
        ["2", "B", "", "1"]
    );
    assert_eq!(lib.categories().book_count(2), Some(1));
    assert_eq!(lib.books().choices(CATEGORY_COL), [first, second.clone()]);
    assert_eq!(lib.books().table().revision(), book_revision);
    assert_eq!(
        lib.books().table().get_cell(0, CATEGORY_COL),
        Some(second.as_str())
    );
    assert!(events.borrow().is_empty());
}

#[test]
fn blank_description_on_edit_keeps_stored_text() {
    let mut lib = library();
    lib.add(EntityKind::Category, &values(&["", "Poetry", "Verse"]))
        .unwrap();

    lib.manager_mut(EntityKind::Category).select(&[0]);
    lib.edit(EntityKind::Category, &values(&["1", "Poems", "  "]))
        .unwrap();
    assert_eq!(lib.categories().table().get_cell(0, 1), Some("Poems"));
    assert_eq!(lib.categories().table().get_cell(0, 2), Some("Verse"));

    lib.reload().unwrap();
    assert_eq!(lib.categories().table().get_cell(0, 2), Some("Verse"));
}

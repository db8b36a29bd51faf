//! Persistence of the catalog, membership and loan records.
//!
//! Each collection is a pretty-printed JSON array in its own file. Loading
//! is forgiving (a missing file is an empty collection, an unreadable one is
//! logged and treated as empty) so that a damaged data directory never stops
//! the library from operating in memory.

use std::{
    fs::File,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;

use crate::{
    book::Book, clock::Clock, error::StoreError, ledger::Ledger, loan::Loan, member::Member,
};

/// Catalog file name inside the data directory
pub const BOOKS_FILE: &str = "books.json";
/// Membership file name inside the data directory
pub const MEMBERS_FILE: &str = "members.json";
/// Loan record file name inside the data directory
pub const LOANS_FILE: &str = "loans.json";

/// Load-all / save-all access to the three persisted collections
pub trait LibraryStore {
    /// Catalog entries, empty if none were saved
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if stored data exists but cannot be read
    fn load_books(&self) -> Result<Vec<Book>, StoreError>;

    /// Members, empty if none were saved
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if stored data exists but cannot be read
    fn load_members(&self) -> Result<Vec<Member>, StoreError>;

    /// Loan records, empty if none were saved
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if stored data exists but cannot be read
    fn load_loans(&self) -> Result<Vec<Loan>, StoreError>;

    /// Replace the stored catalog
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the data cannot be written
    fn save_books(&self, books: &[Book]) -> Result<(), StoreError>;

    /// Replace the stored membership
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the data cannot be written
    fn save_members(&self, members: &[Member]) -> Result<(), StoreError>;

    /// Replace the stored loan records
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the data cannot be written
    fn save_loans(&self, loans: &[Loan]) -> Result<(), StoreError>;

    /// Replace all three collections together
    ///
    /// # Errors
    ///
    /// Returns the first `StoreError` encountered
    fn save_all(
        &self,
        books: &[Book],
        members: &[Member],
        loans: &[Loan],
    ) -> Result<(), StoreError> {
        self.save_books(books)?;
        self.save_members(members)?;
        self.save_loans(loans)
    }
}

/// JSON files in a directory
#[derive(Debug, Clone)]
pub struct JsonStore {
    /// Directory holding the collection files
    dir: PathBuf,
}

impl JsonStore {
    /// Store rooted at `dir`; the directory is created on first save
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the collection files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a JSON array from `name`, or nothing if the file does not exist
    fn read_collection<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(name);
        tracing::debug!(path = %path.display(), "loading collection");

        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let mut contents = String::new();
        if let Err(source) = file.read_to_string(&mut contents) {
            return Err(StoreError::Io { path, source });
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Json { path, source })
    }

    /// Write `items` as a pretty-printed JSON array into a temporary file
    /// next to `name`, ready to be renamed over it
    fn stage_collection<T: Serialize>(
        &self,
        name: &str,
        items: &[T],
    ) -> Result<Staged, StoreError> {
        let path = self.dir.join(name);
        tracing::debug!(path = %path.display(), count = items.len(), "staging collection");

        let serialized = match serde_json::to_string_pretty(items) {
            Ok(serialized) => serialized,
            Err(source) => return Err(StoreError::Json { path, source }),
        };

        let staged = std::fs::create_dir_all(&self.dir)
            .and_then(|()| NamedTempFile::new_in(&self.dir))
            .and_then(|mut file| {
                file.write_all(serialized.as_bytes())?;
                file.as_file().sync_all()?;
                Ok(file)
            });
        match staged {
            Ok(file) => Ok(Staged { file, path }),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Write `items` to `name`, replacing the previous file in one rename
    fn write_collection<T: Serialize>(&self, name: &str, items: &[T]) -> Result<(), StoreError> {
        self.stage_collection(name, items)?.commit()
    }
}

/// A fully written temporary file waiting to replace its target
#[derive(Debug)]
struct Staged {
    /// Temporary file in the data directory
    file: NamedTempFile,
    /// File it will replace
    path: PathBuf,
}

impl Staged {
    /// Rename the temporary file over its target
    fn commit(self) -> Result<(), StoreError> {
        let Self { file, path } = self;
        match file.persist(&path) {
            Ok(_) => Ok(()),
            Err(err) => Err(StoreError::Io { path, source: err.error }),
        }
    }
}

impl LibraryStore for JsonStore {
    fn load_books(&self) -> Result<Vec<Book>, StoreError> {
        self.read_collection(BOOKS_FILE)
    }

    fn load_members(&self) -> Result<Vec<Member>, StoreError> {
        self.read_collection(MEMBERS_FILE)
    }

    fn load_loans(&self) -> Result<Vec<Loan>, StoreError> {
        self.read_collection(LOANS_FILE)
    }

    fn save_books(&self, books: &[Book]) -> Result<(), StoreError> {
        self.write_collection(BOOKS_FILE, books)
    }

    fn save_members(&self, members: &[Member]) -> Result<(), StoreError> {
        self.write_collection(MEMBERS_FILE, members)
    }

    fn save_loans(&self, loans: &[Loan]) -> Result<(), StoreError> {
        self.write_collection(LOANS_FILE, loans)
    }

    /// Stages every collection before renaming any of them, so a failed
    /// write leaves the previous files in place
    fn save_all(
        &self,
        books: &[Book],
        members: &[Member],
        loans: &[Loan],
    ) -> Result<(), StoreError> {
        let staged = [
            self.stage_collection(BOOKS_FILE, books)?,
            self.stage_collection(MEMBERS_FILE, members)?,
            self.stage_collection(LOANS_FILE, loans)?,
        ];
        staged.into_iter().try_for_each(Staged::commit)
    }
}

/// Unwrap a loaded collection, logging and substituting nothing on failure
fn or_empty<T>(loaded: Result<Vec<T>, StoreError>, what: &str) -> Vec<T> {
    loaded.unwrap_or_else(|err| {
        tracing::warn!(
            error = %err,
            collection = what,
            "failed to load, starting with an empty collection"
        );
        Vec::new()
    })
}

/// Build a ledger from whatever `store` holds.
///
/// Never fails: each collection that cannot be read is replaced by an empty
/// one after a warning.
pub fn load_ledger<S: LibraryStore + ?Sized, C: Clock>(store: &S, clock: C) -> Ledger<C> {
    let books = or_empty(store.load_books(), "books");
    let members = or_empty(store.load_members(), "members");
    let loans = or_empty(store.load_loans(), "loans");
    tracing::info!(
        books = books.len(),
        members = members.len(),
        loans = loans.len(),
        "library loaded"
    );
    Ledger::from_parts(books, members, loans, clock)
}

/// Write every collection of `ledger` to `store`.
///
/// The ledger is only read, so a failure leaves in-memory state as it was.
///
/// # Errors
///
/// Returns the first `StoreError` encountered
pub fn save_ledger<S: LibraryStore + ?Sized, C: Clock>(
    store: &S,
    ledger: &Ledger<C>,
) -> Result<(), StoreError> {
    store.save_all(ledger.books(), ledger.members(), ledger.loans())?;
    tracing::info!("library saved");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        book::BookCategory,
        clock::FixedClock,
        id::{Isbn, MemberId},
        member::{Identity, MemberClass},
    };

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap())
    }

    fn populated() -> Ledger<FixedClock> {
        let clock = clock();
        let now = clock.now();
        let mut ledger = Ledger::new(clock);
        ledger
            .add_book(
                Book::new(
                    Isbn::new("ISBN-A"),
                    "Dune",
                    "Frank Herbert",
                    BookCategory::Fiction,
                    3,
                    dec!(9.99),
                    NaiveDate::from_ymd_opt(1965, 8, 1).unwrap(),
                )
                .unwrap(),
            )
            .unwrap();
        ledger
            .register_member(Member::new(
                Identity::new("S001", "Ada", "ada@example.com", "555"),
                MemberClass::Student,
                now,
            ))
            .unwrap();
        let s001 = MemberId::new("S001");
        ledger.issue(&s001, &Isbn::new("ISBN-A")).unwrap();
        ledger.issue(&s001, &Isbn::new("ISBN-A")).unwrap();
        ledger.clock().advance(Duration::days(17));
        ledger.return_book(&s001, &Isbn::new("ISBN-A")).unwrap();
        ledger
    }

    #[test]
    fn missing_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("not-yet-created"));
        assert!(store.load_books().unwrap().is_empty());
        assert!(store.load_members().unwrap().is_empty());
        assert!(store.load_loans().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips_every_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let original = populated();

        save_ledger(&store, &original).unwrap();
        let loaded = load_ledger(&store, clock());

        assert_eq!(loaded.books(), original.books());
        assert_eq!(loaded.members(), original.members());
        assert_eq!(loaded.loans(), original.loans());
        let member = loaded.find_member(&MemberId::new("S001")).unwrap();
        assert_eq!(member.fine_balance, dec!(1.50));
        assert_eq!(member.open_loan_count(loaded.loans()), 1);
    }

    #[test]
    fn files_are_human_readable_json_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        save_ledger(&store, &populated()).unwrap();

        let books = std::fs::read_to_string(dir.path().join(BOOKS_FILE)).unwrap();
        assert!(books.trim_start().starts_with('['));
        assert!(books.contains("\"isbn\": \"ISBN-A\""));
        assert!(books.contains("\"price\": \"9.99\""));
    }

    #[test]
    fn saving_replaces_files_and_leaves_no_temporaries() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        save_ledger(&store, &populated()).unwrap();
        save_ledger(&store, &Ledger::new(clock())).unwrap();

        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec![BOOKS_FILE, LOANS_FILE, MEMBERS_FILE]);
        assert!(store.load_loans().unwrap().is_empty());
    }

    #[test]
    fn failed_rename_keeps_the_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        save_ledger(&store, &populated()).unwrap();
        let books_before = std::fs::read_to_string(dir.path().join(BOOKS_FILE)).unwrap();
        std::fs::remove_file(dir.path().join(LOANS_FILE)).unwrap();
        std::fs::create_dir(dir.path().join(LOANS_FILE)).unwrap();

        let err = store.save_loans(&[]).unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(err.path(), dir.path().join(LOANS_FILE));
        assert_eq!(std::fs::read_to_string(dir.path().join(BOOKS_FILE)).unwrap(), books_before);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn corrupt_collection_is_reported_and_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        save_ledger(&store, &populated()).unwrap();
        std::fs::write(dir.path().join(MEMBERS_FILE), "{ not json").unwrap();

        let err = store.load_members().unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
        assert_eq!(err.path(), dir.path().join(MEMBERS_FILE));

        let loaded = load_ledger(&store, clock());
        assert!(loaded.members().is_empty());
        assert_eq!(loaded.books().len(), 1);
        assert_eq!(loaded.loans().len(), 3);
    }

    #[test]
    fn failed_save_leaves_ledger_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let store = JsonStore::new(&blocker);
        let ledger = populated();
        let loans_before = ledger.loans().to_vec();

        let result = save_ledger(&store, &ledger);

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(ledger.loans(), loans_before.as_slice());
    }
}

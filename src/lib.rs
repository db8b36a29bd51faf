//! Lending ledger for a small library.
//!
//! This crate tracks a book catalog and a membership, issues and takes back
//! copies under per-class borrowing limits, charges fines for late returns
//! and persists everything to JSON between runs.

pub mod book;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod id;
pub mod ledger;
pub mod loan;
pub mod member;
pub mod observers;
pub mod render;
pub mod store;

pub use book::{Book, BookCategory};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::LibraryConfig;
pub use error::{BorrowRefusal, LendingError, StoreError};
pub use events::LendingEvent;
pub use id::{Isbn, LoanId, MemberId};
pub use ledger::{Ledger, OverdueEntry};
pub use loan::{DAILY_FINE, LOAN_PERIOD_DAYS, Loan, LoanKind, LoanStatus};
pub use member::{Identity, Member, MemberClass};
pub use observers::{FineNotifier, LendingObserver, LoanLogger};
pub use render::Render;
pub use store::{JsonStore, LibraryStore, load_ledger, save_ledger};

//! Property-based tests for the lending invariants.
//!
//! Random interleavings of issue, return and clock movement are replayed
//! against a small library and the copy, quota and fine rules are checked
//! after every step.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::{
    book::{Book, BookCategory},
    clock::FixedClock,
    error::LendingError,
    id::{Isbn, MemberId},
    ledger::Ledger,
    member::{Identity, Member, MemberClass},
};

/// One step of a generated scenario
#[derive(Debug, Clone)]
enum Op {
    Issue { member: usize, book: usize },
    Return { member: usize, book: usize },
    Advance { hours: i64 },
}

const MEMBERS: [(&str, MemberClass); 3] = [
    ("S1", MemberClass::Student),
    ("F1", MemberClass::Faculty),
    ("G1", MemberClass::GeneralPublic),
];
const BOOKS: [(&str, u32); 3] = [("B1", 1), ("B2", 2), ("B3", 4)];

/// Strategy for a (member, book) index pair
fn slot() -> impl Strategy<Value = (usize, usize)> {
    (0..MEMBERS.len(), 0..BOOKS.len())
}

/// Strategy to generate a single operation.
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => slot().prop_map(|(member, book)| Op::Issue { member, book }),
        3 => slot().prop_map(|(member, book)| Op::Return { member, book }),
        1 => (1i64..24 * 20).prop_map(|hours| Op::Advance { hours }),
    ]
}

fn library() -> Ledger<FixedClock> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut ledger = Ledger::new(FixedClock::new(start));
    for (id, class) in MEMBERS {
        ledger.register_member(Member::new(Identity::new(id, id, "", ""), class, start)).unwrap();
    }
    for (isbn, copies) in BOOKS {
        let book = Book::new(
            Isbn::new(isbn),
            isbn,
            "Author",
            BookCategory::History,
            copies,
            Decimal::ONE,
            NaiveDate::from_ymd_opt(1999, 1, 1).unwrap(),
        )
        .unwrap();
        ledger.add_book(book).unwrap();
    }
    ledger
}

fn assert_invariants(ledger: &Ledger<FixedClock>) -> Result<(), TestCaseError> {
    for book in ledger.books() {
        prop_assert!(book.available_copies <= book.total_copies);
        let out = ledger.loans().iter().filter(|l| l.is_open() && l.isbn == book.isbn).count();
        prop_assert_eq!(book.available_copies as usize + out, book.total_copies as usize);
    }
    for member in ledger.members() {
        prop_assert!(member.open_loan_count(ledger.loans()) <= member.max_books_allowed as usize);
        prop_assert!(member.fine_balance >= Decimal::ZERO);
        for book in ledger.books() {
            let held = ledger
                .loans()
                .iter()
                .filter(|l| l.is_open() && l.concerns(member.id(), &book.isbn))
                .count();
            prop_assert!(held <= 1);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Copy counts, quotas and balances stay consistent under any interleaving.
    #[test]
    fn prop_lending_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = library();
        for op in ops {
            match op {
                Op::Issue { member, book } => {
                    let member_id = MemberId::new(MEMBERS[member].0);
                    let isbn = Isbn::new(BOOKS[book].0);
                    let owed = ledger.find_member(&member_id).unwrap().fine_balance;
                    let before = ledger.find_book(&isbn).unwrap().available_copies;
                    let result = ledger.issue(&member_id, &isbn);
                    let after = ledger.find_book(&isbn).unwrap().available_copies;
                    match result {
                        Ok(_) => {
                            prop_assert_eq!(owed, Decimal::ZERO);
                            prop_assert_eq!(after + 1, before);
                        }
                        Err(err) => {
                            let refused = matches!(err, LendingError::NotBorrowable { .. });
                            prop_assert!(refused);
                            prop_assert_eq!(after, before);
                        }
                    }
                }
                Op::Return { member, book } => {
                    let member_id = MemberId::new(MEMBERS[member].0);
                    let isbn = Isbn::new(BOOKS[book].0);
                    let before = ledger.find_book(&isbn).unwrap().available_copies;
                    let owed = ledger.find_member(&member_id).unwrap().fine_balance;
                    let records = ledger.loans().len();
                    let result = ledger.return_book(&member_id, &isbn);
                    let after = ledger.find_book(&isbn).unwrap().available_copies;
                    let balance = ledger.find_member(&member_id).unwrap().fine_balance;
                    match result {
                        Ok(fine) => {
                            prop_assert_eq!(after, before + 1);
                            prop_assert_eq!(balance, owed + fine);
                            prop_assert_eq!(ledger.loans().len(), records + 1);
                        }
                        Err(err) => {
                            let no_loan = matches!(err, LendingError::NoActiveLoan { .. });
                            prop_assert!(no_loan);
                            prop_assert_eq!(ledger.loans().len(), records);
                            prop_assert_eq!(balance, owed);
                        }
                    }
                }
                Op::Advance { hours } => ledger.clock().advance(Duration::hours(hours)),
            }
            assert_invariants(&ledger)?;
        }
    }

    /// A return `k` whole days late is fined exactly `k * 0.50`.
    #[test]
    fn prop_fine_is_half_unit_per_whole_late_day(days_late in 0i64..400, extra_hours in 0i64..24) {
        let mut ledger = library();
        let member_id = MemberId::new("F1");
        let isbn = Isbn::new("B3");
        ledger.issue(&member_id, &isbn).unwrap();
        ledger.clock().advance(Duration::days(14 + days_late) + Duration::hours(extra_hours));

        let fine = ledger.return_book(&member_id, &isbn).unwrap();

        prop_assert_eq!(fine, Decimal::new(50, 2) * Decimal::from(days_late));
    }
}

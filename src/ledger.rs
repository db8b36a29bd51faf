use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    book::Book,
    clock::{Clock, SystemClock},
    error::LendingError,
    events::LendingEvent,
    id::{Isbn, MemberId},
    loan::{Loan, LoanKind},
    member::Member,
    observers::LendingObserver,
};

/// An open loan past its due date, with the fine it has accrued so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueEntry<'a> {
    /// The overdue Issue loan
    pub loan: &'a Loan,
    /// Borrower's name, if the member is still registered
    pub member_name: Option<&'a str>,
    /// Title, if the book is still catalogued
    pub book_title: Option<&'a str>,
    /// Whole days past due
    pub days_overdue: i64,
    /// Fine the loan would be charged if returned now; not stored
    pub accrued_fine: Decimal,
}

/// Authoritative owner of the catalog, the membership and every loan record.
///
/// Issue and return go through here so that copy counts, member balances
/// and loan records change together.
pub struct Ledger<C = SystemClock> {
    /// Catalog entries in registration order
    books: Vec<Book>,
    /// Members in registration order
    members: Vec<Member>,
    /// Every loan record ever created, in creation order
    loans: Vec<Loan>,
    /// Source of "now"
    clock: C,
    /// Registered lending observers
    observers: Vec<Box<dyn LendingObserver>>,
}

impl<C: fmt::Debug> fmt::Debug for Ledger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("books", &self.books)
            .field("members", &self.members)
            .field("loans", &self.loans)
            .field("clock", &self.clock)
            .field("observers_count", &self.observers.len())
            .finish()
    }
}

impl<C: Clock> Ledger<C> {
    /// Create an empty ledger
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self::from_parts(Vec::new(), Vec::new(), Vec::new(), clock)
    }

    /// Assemble a ledger from previously stored collections.
    ///
    /// Each member's loan history is rebuilt from `loans` so that the two
    /// views of a loan cannot disagree.
    #[must_use]
    pub fn from_parts(
        books: Vec<Book>,
        mut members: Vec<Member>,
        loans: Vec<Loan>,
        clock: C,
    ) -> Self {
        for member in &mut members {
            member.clear_history();
            let member_id = member.id().clone();
            loans
                .iter()
                .filter(|loan| loan.kind == LoanKind::Issue && loan.member_id == member_id)
                .for_each(|loan| member.record_loan(loan.id));
        }
        Self { books, members, loans, clock, observers: Vec::new() }
    }

    /// Register an observer to be notified of lending events
    pub fn register_observer(&mut self, observer: Box<dyn LendingObserver>) {
        self.observers.push(observer);
    }

    /// The ledger's clock
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Current instant according to the ledger's clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Add a title to the catalog
    ///
    /// # Errors
    ///
    /// Returns `LendingError::DuplicateBook` if the ISBN is already catalogued
    pub fn add_book(&mut self, book: Book) -> Result<(), LendingError> {
        if self.find_book(&book.isbn).is_some() {
            return Err(LendingError::DuplicateBook(book.isbn));
        }
        tracing::info!(
            isbn = %book.isbn,
            title = %book.title,
            copies = book.total_copies,
            "book added"
        );
        self.books.push(book);
        Ok(())
    }

    /// Register a new member
    ///
    /// # Errors
    ///
    /// Returns `LendingError::DuplicateMember` if the id is taken
    pub fn register_member(&mut self, member: Member) -> Result<(), LendingError> {
        if self.find_member(member.id()).is_some() {
            return Err(LendingError::DuplicateMember(member.id().clone()));
        }
        tracing::info!(member_id = %member.id(), class = %member.class, "member registered");
        self.members.push(member);
        Ok(())
    }

    /// Look up a catalog entry
    #[must_use]
    pub fn find_book(&self, isbn: &Isbn) -> Option<&Book> {
        self.books.iter().find(|book| book.isbn == *isbn)
    }

    /// Look up a member
    #[must_use]
    pub fn find_member(&self, member_id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|member| member.id() == member_id)
    }

    /// Catalog entries matching `term`, in catalog order
    #[must_use]
    pub fn search_books(&self, term: &str) -> Vec<&Book> {
        self.books.iter().filter(|book| book.matches_search(term)).collect()
    }

    /// All catalog entries
    #[must_use]
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// All members
    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// All loan records, Issue and Return alike
    #[must_use]
    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    /// A member's Issue loans, oldest first
    ///
    /// # Errors
    ///
    /// Returns `LendingError::MemberNotFound` for an unknown member
    pub fn member_loans(&self, member_id: &MemberId) -> Result<Vec<&Loan>, LendingError> {
        let member = self
            .find_member(member_id)
            .ok_or_else(|| LendingError::MemberNotFound(member_id.clone()))?;
        Ok(member
            .history()
            .iter()
            .filter_map(|loan_id| self.loans.iter().find(|loan| loan.id == *loan_id))
            .collect())
    }

    /// Lend a copy of `isbn` to `member_id`, due fourteen days from now.
    ///
    /// # Errors
    ///
    /// - `LendingError::MemberNotFound` / `LendingError::BookNotFound` if either id is unknown
    /// - `LendingError::NotBorrowable` if the member already holds a copy of the title, no
    ///   copy is on the shelf, the member owes fines, or the member is at quota
    pub fn issue(&mut self, member_id: &MemberId, isbn: &Isbn) -> Result<Loan, LendingError> {
        let now = self.clock.now();
        let member = self
            .members
            .iter_mut()
            .find(|member| member.id() == member_id)
            .ok_or_else(|| LendingError::MemberNotFound(member_id.clone()))?;
        let book = self
            .books
            .iter_mut()
            .find(|book| book.isbn == *isbn)
            .ok_or_else(|| LendingError::BookNotFound(isbn.clone()))?;

        if let Some(reason) = book.refusal_for(member, &self.loans) {
            self.notify(&LendingEvent::Refused {
                member_id: member_id.clone(),
                isbn: isbn.clone(),
                reason,
            });
            return Err(LendingError::NotBorrowable {
                member_id: member_id.clone(),
                isbn: isbn.clone(),
                reason,
            });
        }

        book.borrow(member, &self.loans);
        let loan = Loan::issue(member_id.clone(), isbn.clone(), now);
        member.record_loan(loan.id);
        self.loans.push(loan.clone());

        self.notify(&LendingEvent::Issued {
            loan_id: loan.id,
            member_id: member_id.clone(),
            isbn: isbn.clone(),
            due_date: loan.due_date.unwrap_or(now),
        });
        Ok(loan)
    }

    /// Take back the copy `member_id` borrowed, charging any overdue fine.
    ///
    /// Returns the fine frozen into the loan, zero for an on-time return.
    ///
    /// # Errors
    ///
    /// - `LendingError::MemberNotFound` / `LendingError::BookNotFound` if either id is unknown
    /// - `LendingError::NoActiveLoan` if the member holds no open loan of the book; nothing
    ///   is changed in that case
    pub fn return_book(
        &mut self,
        member_id: &MemberId,
        isbn: &Isbn,
    ) -> Result<Decimal, LendingError> {
        let now = self.clock.now();
        let member = self
            .members
            .iter_mut()
            .find(|member| member.id() == member_id)
            .ok_or_else(|| LendingError::MemberNotFound(member_id.clone()))?;
        let book = self
            .books
            .iter_mut()
            .find(|book| book.isbn == *isbn)
            .ok_or_else(|| LendingError::BookNotFound(isbn.clone()))?;

        // Earliest issue wins should more than one open loan exist
        let loan = self
            .loans
            .iter_mut()
            .filter(|loan| loan.is_open() && loan.concerns(member_id, isbn))
            .min_by_key(|loan| loan.issued_at)
            .ok_or_else(|| LendingError::NoActiveLoan {
                member_id: member_id.clone(),
                isbn: isbn.clone(),
            })?;

        let fine = loan.close(now);
        let loan_id = loan.id;
        member.charge_fine(fine);
        book.give_back(member_id);
        self.loans.push(Loan::return_record(member_id.clone(), isbn.clone(), now));

        self.notify(&LendingEvent::Returned {
            loan_id,
            member_id: member_id.clone(),
            isbn: isbn.clone(),
            fine,
        });
        Ok(fine)
    }

    /// Open loans past their due date at `now`.
    ///
    /// Re-scans the loan records on every call.
    pub fn overdue_loans(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Loan> + '_ {
        self.loans.iter().filter(move |loan| loan.is_open() && loan.is_overdue(now))
    }

    /// Overdue loans joined with member and book details and the fine accrued so far
    pub fn overdue_report(
        &self,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = OverdueEntry<'_>> + '_ {
        self.overdue_loans(now).map(move |loan| OverdueEntry {
            loan,
            member_name: self.find_member(&loan.member_id).map(Member::name),
            book_title: self.find_book(&loan.isbn).map(|book| book.title.as_str()),
            days_overdue: loan.overdue_days(now),
            accrued_fine: loan.compute_fine(now),
        })
    }

    /// Number of open loans across all members
    #[must_use]
    pub fn open_loan_count(&self) -> usize {
        self.loans.iter().filter(|loan| loan.is_open()).count()
    }

    /// Notify observers of an event
    fn notify(&self, event: &LendingEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

impl<C: Clock> fmt::Display for Ledger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} books, {} members, {} open loans",
            self.books.len(),
            self.members.len(),
            self.open_loan_count()
        )
    }
}

#[cfg(test)]
mod props;

//! Loan records and overdue fine computation.
//!
//! An Issue-kind loan is created open with a due date fourteen days out. On
//! return its fine is computed once against the return instant and frozen
//! into the record. A separate Return-kind record is appended for the audit
//! trail; it never participates in capacity or overdue accounting.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::id::{Isbn, LoanId, MemberId};

/// Length of a loan, counted from the issue instant
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Fine charged per whole day past the due date
pub const DAILY_FINE: Decimal = Decimal::from_parts(50, 0, 0, false, 2);

/// What a loan record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum LoanKind {
    /// A copy left the library
    Issue,
    /// A copy came back (audit only)
    Return,
}

/// Where a loan record stands at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    /// Issued, not yet due
    Open,
    /// Issued and past its due date
    Overdue,
    /// Issued and since returned
    Returned,
    /// Return-kind audit record
    Recorded,
}

impl LoanStatus {
    /// Get a human-readable label for the status
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Overdue => "overdue",
            Self::Returned => "returned",
            Self::Recorded => "return recorded",
        }
    }
}

/// One issue or return event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Loan {
    /// Unique id of this record
    pub id: LoanId,
    /// Borrowing member
    pub member_id: MemberId,
    /// Borrowed title
    pub isbn: Isbn,
    /// Issue or Return
    pub kind: LoanKind,
    /// When the record was created
    pub issued_at: DateTime<Utc>,
    /// Set only for Issue records
    pub due_date: Option<DateTime<Utc>>,
    /// Set when an Issue record is closed by a return
    pub returned_at: Option<DateTime<Utc>>,
    /// Fine frozen at return time
    pub fine_amount: Decimal,
}

impl Loan {
    /// Open an Issue loan at `now`, due [`LOAN_PERIOD_DAYS`] later
    #[must_use]
    pub fn issue(member_id: MemberId, isbn: Isbn, now: DateTime<Utc>) -> Self {
        Self {
            id: LoanId::new(),
            member_id,
            isbn,
            kind: LoanKind::Issue,
            issued_at: now,
            due_date: now.checked_add_signed(Duration::days(LOAN_PERIOD_DAYS)),
            returned_at: None,
            fine_amount: Decimal::ZERO,
        }
    }

    /// Audit record for a return happening at `now`
    #[must_use]
    pub fn return_record(member_id: MemberId, isbn: Isbn, now: DateTime<Utc>) -> Self {
        Self {
            id: LoanId::new(),
            member_id,
            isbn,
            kind: LoanKind::Return,
            issued_at: now,
            due_date: None,
            returned_at: None,
            fine_amount: Decimal::ZERO,
        }
    }

    /// An Issue loan without a recorded return
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.kind == LoanKind::Issue && self.returned_at.is_none()
    }

    /// Whether this loan is for `member_id` borrowing `isbn`
    #[must_use]
    pub fn concerns(&self, member_id: &MemberId, isbn: &Isbn) -> bool {
        self.member_id == *member_id && self.isbn == *isbn
    }

    /// Due date has passed and the book is still out
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => now > due && self.returned_at.is_none(),
            None => false,
        }
    }

    /// Whole days past the due date, truncated; zero unless overdue
    #[must_use]
    pub fn overdue_days(&self, now: DateTime<Utc>) -> i64 {
        match self.due_date {
            Some(due) if self.is_overdue(now) => now.signed_duration_since(due).num_days(),
            _ => 0,
        }
    }

    /// Fine the loan would carry if it were returned at `now`
    #[must_use]
    pub fn compute_fine(&self, now: DateTime<Utc>) -> Decimal {
        DAILY_FINE.checked_mul(Decimal::from(self.overdue_days(now))).unwrap_or(Decimal::MAX)
    }

    /// Close an open Issue loan at `now` and freeze its fine.
    ///
    /// Returns the fine charged. Closing a loan that is not open changes
    /// nothing and returns the already-frozen amount.
    pub fn close(&mut self, now: DateTime<Utc>) -> Decimal {
        if !self.is_open() {
            return self.fine_amount;
        }
        self.fine_amount = self.compute_fine(now);
        self.returned_at = Some(now);
        self.fine_amount
    }

    /// Status of the record at `now`
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> LoanStatus {
        match (self.kind, self.returned_at) {
            (LoanKind::Return, _) => LoanStatus::Recorded,
            (LoanKind::Issue, Some(_)) => LoanStatus::Returned,
            (LoanKind::Issue, None) if self.is_overdue(now) => LoanStatus::Overdue,
            (LoanKind::Issue, None) => LoanStatus::Open,
        }
    }
}

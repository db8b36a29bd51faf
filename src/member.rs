use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::BorrowRefusal,
    id::{LoanId, MemberId},
    loan::Loan,
};

/// Who a person is, independent of any lending role
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    /// Library card number
    pub id: MemberId,
    /// Full name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
}

impl Identity {
    /// Build an identity from raw fields
    #[must_use]
    pub fn new(
        id: impl Into<MemberId>,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self { id: id.into(), name: name.into(), email: email.into(), phone: phone.into() }
    }
}

/// Membership class, which fixes the open-loan quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MemberClass {
    /// Enrolled student
    Student,
    /// Teaching staff
    Faculty,
    /// Anyone else holding a card
    GeneralPublic,
    /// A class name this build does not know; gets the default quota
    #[serde(other)]
    Unrecognized,
}

impl MemberClass {
    /// Quota applied to classes without a specific rule
    pub const DEFAULT_MAX_BOOKS: u32 = 2;

    /// Maximum number of simultaneously open loans
    #[must_use]
    pub fn max_books_allowed(self) -> u32 {
        match self {
            Self::Student => 3,
            Self::Faculty => 10,
            Self::GeneralPublic | Self::Unrecognized => Self::DEFAULT_MAX_BOOKS,
        }
    }
}

impl fmt::Display for MemberClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => write!(f, "Student"),
            Self::Faculty => write!(f, "Faculty"),
            Self::GeneralPublic => write!(f, "General Public"),
            Self::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}

impl FromStr for MemberClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "student" => Ok(Self::Student),
            "faculty" => Ok(Self::Faculty),
            "generalpublic" | "public" => Ok(Self::GeneralPublic),
            _ => Err(format!("Unknown member class: {s}")),
        }
    }
}

/// A registered borrower and their lending policy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Member {
    /// Identity fields
    #[serde(flatten)]
    pub identity: Identity,
    /// Membership class
    pub class: MemberClass,
    /// When the member registered
    pub membership_date: DateTime<Utc>,
    /// Quota derived from `class` at registration
    pub max_books_allowed: u32,
    /// Unpaid fines; any positive balance blocks borrowing
    pub fine_balance: Decimal,
    /// Issue loans taken by this member, oldest first. References into the
    /// ledger's loan list; rebuilt from it on load.
    #[serde(skip)]
    history: Vec<LoanId>,
}

impl Member {
    /// Register a member at `now` with a clean balance
    #[must_use]
    pub fn new(identity: Identity, class: MemberClass, now: DateTime<Utc>) -> Self {
        Self {
            identity,
            class,
            membership_date: now,
            max_books_allowed: class.max_books_allowed(),
            fine_balance: Decimal::ZERO,
            history: Vec::new(),
        }
    }

    /// Library card number
    #[must_use]
    pub fn id(&self) -> &MemberId {
        &self.identity.id
    }

    /// Full name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Ids of the member's Issue loans, oldest first
    #[must_use]
    pub fn history(&self) -> &[LoanId] {
        &self.history
    }

    /// Append an Issue loan to the member's history
    pub(crate) fn record_loan(&mut self, loan_id: LoanId) {
        self.history.push(loan_id);
    }

    /// Drop the history so it can be rebuilt from the ledger's loans
    pub(crate) fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Add a frozen fine to the running balance
    pub(crate) fn charge_fine(&mut self, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.fine_balance = self.fine_balance.saturating_add(amount);
        }
    }

    /// Number of open loans in this member's history
    #[must_use]
    pub fn open_loan_count(&self, loans: &[Loan]) -> usize {
        loans.iter().filter(|loan| loan.is_open() && self.history.contains(&loan.id)).count()
    }

    /// Why this member may not take out another loan, if anything stops them
    #[must_use]
    pub fn borrow_refusal(&self, loans: &[Loan]) -> Option<BorrowRefusal> {
        if self.fine_balance > Decimal::ZERO {
            return Some(BorrowRefusal::OutstandingFine(self.fine_balance));
        }
        let limit = self.max_books_allowed;
        let under_quota = u32::try_from(self.open_loan_count(loans)).is_ok_and(|open| open < limit);
        if under_quota { None } else { Some(BorrowRefusal::QuotaReached { limit }) }
    }

    /// Below quota and owing nothing
    #[must_use]
    pub fn has_capacity_to_borrow(&self, loans: &[Loan]) -> bool {
        self.borrow_refusal(loans).is_none()
    }
}

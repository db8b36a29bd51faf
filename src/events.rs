use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::BorrowRefusal,
    id::{Isbn, LoanId, MemberId},
};

/// Events the ledger publishes after each lending decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LendingEvent {
    /// A copy was issued
    Issued {
        /// The new Issue loan
        loan_id: LoanId,
        /// Borrower
        member_id: MemberId,
        /// Title lent
        isbn: Isbn,
        /// When the copy is due back
        due_date: DateTime<Utc>,
    },
    /// An open loan was closed
    Returned {
        /// The Issue loan that was closed
        loan_id: LoanId,
        /// Borrower
        member_id: MemberId,
        /// Title returned
        isbn: Isbn,
        /// Fine frozen into the loan; zero when on time
        fine: Decimal,
    },
    /// An issue request was turned down by the borrowing gates
    Refused {
        /// Member who asked
        member_id: MemberId,
        /// Title asked for
        isbn: Isbn,
        /// Gate that failed
        reason: BorrowRefusal,
    },
}

impl LendingEvent {
    /// Member the event concerns
    #[must_use]
    pub fn member_id(&self) -> &MemberId {
        match self {
            Self::Issued { member_id, .. }
            | Self::Returned { member_id, .. }
            | Self::Refused { member_id, .. } => member_id,
        }
    }

    /// Book the event concerns
    #[must_use]
    pub fn isbn(&self) -> &Isbn {
        match self {
            Self::Issued { isbn, .. }
            | Self::Returned { isbn, .. }
            | Self::Refused { isbn, .. } => isbn,
        }
    }
}

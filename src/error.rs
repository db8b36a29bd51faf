//! Error types for lending operations and for the persistence collaborator.
//!
//! Lending failures are ordinary, recoverable outcomes: the caller reports
//! them and carries on. Persistence failures are a separate category that the
//! caller surfaces as a warning while continuing in memory.

use std::{io, path::PathBuf};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::id::{Isbn, MemberId};

/// Why a borrowable book could not be issued to a member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowRefusal {
    /// The member already holds an open loan of this title
    AlreadyOnLoan,
    /// Every copy is already on loan
    NoCopiesAvailable,
    /// The member already holds as many open loans as their class allows
    QuotaReached {
        /// Open-loan quota of the member's class
        limit: u32,
    },
    /// The member owes fines; borrowing stays blocked until they are cleared
    OutstandingFine(Decimal),
}

impl std::fmt::Display for BorrowRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyOnLoan => write!(f, "a copy is already on loan to this member"),
            Self::NoCopiesAvailable => write!(f, "no copies available"),
            Self::QuotaReached { limit } => write!(f, "borrowing limit of {limit} reached"),
            Self::OutstandingFine(amount) => write!(f, "outstanding fine of ${amount:.2}"),
        }
    }
}

/// Errors that can occur while issuing, returning or registering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LendingError {
    /// No member is registered under this id
    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    /// No catalog entry carries this ISBN
    #[error("Book not found: {0}")]
    BookNotFound(Isbn),

    /// Availability, quota or fine balance forbids the loan
    #[error("Book {isbn} cannot be borrowed by {member_id}: {reason}")]
    NotBorrowable {
        /// Member who asked for the loan
        member_id: MemberId,
        /// Book that was asked for
        isbn: Isbn,
        /// First gate that failed
        reason: BorrowRefusal,
    },

    /// Return requested but the member holds no open loan for the book
    #[error("No active loan of {isbn} for member {member_id}")]
    NoActiveLoan {
        /// Member who attempted the return
        member_id: MemberId,
        /// Book being returned
        isbn: Isbn,
    },

    /// A catalog entry with this ISBN already exists
    #[error("Book with ISBN {0} already exists")]
    DuplicateBook(Isbn),

    /// A member with this id is already registered
    #[error("Member with ID {0} already exists")]
    DuplicateMember(MemberId),

    /// A catalog entry must own at least one copy
    #[error("Invalid number of copies: {0}")]
    InvalidCopies(u32),
}

impl LendingError {
    /// Stable machine-readable code for this error
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MemberNotFound(_) => "MEMBER_NOT_FOUND",
            Self::BookNotFound(_) => "BOOK_NOT_FOUND",
            Self::NotBorrowable { .. } => "NOT_BORROWABLE",
            Self::NoActiveLoan { .. } => "NO_ACTIVE_LOAN",
            Self::DuplicateBook(_) => "DUPLICATE_BOOK",
            Self::DuplicateMember(_) => "DUPLICATE_MEMBER",
            Self::InvalidCopies(_) => "INVALID_COPIES",
        }
    }

    /// True for the two unresolved-identifier failures
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MemberNotFound(_) | Self::BookNotFound(_))
    }
}

/// Errors raised by a [`LibraryStore`](crate::store::LibraryStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a collection file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A collection file could not be encoded or decoded
    #[error("Malformed JSON in {path}: {source}")]
    Json {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Path of the file the failure happened on
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. } | Self::Json { path, .. } => path,
        }
    }
}

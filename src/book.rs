use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::{BorrowRefusal, LendingError},
    id::{Isbn, MemberId},
    loan::Loan,
    member::Member,
};

/// Shelf section a title is catalogued under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum BookCategory {
    /// Novels and short stories
    Fiction,
    /// Science and technology
    ScienceAndTechnology,
    /// History
    History,
    /// Biography
    Biography,
}

impl BookCategory {
    /// Every category, in menu order
    pub const ALL: [Self; 4] =
        [Self::Fiction, Self::ScienceAndTechnology, Self::History, Self::Biography];

    /// Name used for display and search
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Fiction => "Fiction",
            Self::ScienceAndTechnology => "Science and Technology",
            Self::History => "History",
            Self::Biography => "Biography",
        }
    }
}

impl fmt::Display for BookCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BookCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase().replace(['-', '_', ' '], "");
        let shorthand = wanted == "science" || wanted == "scienceandtech";
        Self::ALL
            .into_iter()
            .find(|category| category.name().to_lowercase().replace(' ', "") == wanted)
            .or_else(|| shorthand.then_some(Self::ScienceAndTechnology))
            .ok_or_else(|| format!("Unknown category: {s}"))
    }
}

/// A catalog entry and its copy bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Book {
    /// Identity of the title
    pub isbn: Isbn,
    /// Title
    pub title: String,
    /// Author
    pub author: String,
    /// Shelf section
    pub category: BookCategory,
    /// Copies owned by the library
    pub total_copies: u32,
    /// Copies on the shelf; never above `total_copies`
    pub available_copies: u32,
    /// Replacement price
    pub price: Decimal,
    /// Publication date
    pub published_date: NaiveDate,
    /// Members currently holding a copy. Informational only: capacity is
    /// tracked by `available_copies`.
    #[serde(default)]
    pub borrowed_by: Vec<MemberId>,
}

impl Book {
    /// Create a catalog entry with every copy on the shelf
    ///
    /// # Errors
    ///
    /// Returns `LendingError::InvalidCopies` when `total_copies` is zero
    pub fn new(
        isbn: Isbn,
        title: impl Into<String>,
        author: impl Into<String>,
        category: BookCategory,
        total_copies: u32,
        price: Decimal,
        published_date: NaiveDate,
    ) -> Result<Self, LendingError> {
        if total_copies == 0 {
            return Err(LendingError::InvalidCopies(total_copies));
        }
        Ok(Self {
            isbn,
            title: title.into(),
            author: author.into(),
            category,
            total_copies,
            available_copies: total_copies,
            price,
            published_date,
            borrowed_by: Vec::new(),
        })
    }

    /// First gate that stops `member` from borrowing this book, if any.
    ///
    /// A member holds at most one open loan of a title at a time.
    #[must_use]
    pub fn refusal_for(&self, member: &Member, loans: &[Loan]) -> Option<BorrowRefusal> {
        if loans.iter().any(|loan| loan.is_open() && loan.concerns(member.id(), &self.isbn)) {
            return Some(BorrowRefusal::AlreadyOnLoan);
        }
        if self.available_copies == 0 {
            return Some(BorrowRefusal::NoCopiesAvailable);
        }
        member.borrow_refusal(loans)
    }

    /// A copy is on the shelf and the member may take out another loan
    #[must_use]
    pub fn can_be_borrowed(&self, member: &Member, loans: &[Loan]) -> bool {
        self.refusal_for(member, loans).is_none()
    }

    /// Hand a copy to `member`.
    ///
    /// Does nothing unless [`Book::can_be_borrowed`] holds; callers check first.
    pub fn borrow(&mut self, member: &Member, loans: &[Loan]) {
        if !self.can_be_borrowed(member, loans) {
            return;
        }
        self.available_copies = self.available_copies.saturating_sub(1);
        self.borrowed_by.push(member.id().clone());
    }

    /// Put a copy back on the shelf, ignoring over-returns
    pub fn give_back(&mut self, member_id: &MemberId) {
        if self.available_copies < self.total_copies {
            self.available_copies = self.available_copies.saturating_add(1);
        }
        if let Some(pos) = self.borrowed_by.iter().position(|holder| holder == member_id) {
            self.borrowed_by.remove(pos);
        }
    }

    /// Case-insensitive match on title, author and category; exact-case on ISBN
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.author.to_lowercase().contains(&needle)
            || self.isbn.as_str().contains(term)
            || self.category.name().to_lowercase().contains(&needle)
    }
}

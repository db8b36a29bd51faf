use chrono::{DateTime, Utc};
use colored::Colorize;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    book::Book,
    ledger::OverdueEntry,
    loan::{Loan, LoanKind, LoanStatus},
    member::Member,
};

/// Width of the rule printed between records
const RULE_WIDTH: usize = 40;

/// Text rendering of catalog, membership and loan data
#[derive(Debug)]
pub struct Render;

impl Render {
    /// Section header, e.g. `=== ALL BOOKS ===`
    #[must_use]
    pub fn header(title: &str) -> String {
        format!("=== {title} ===").as_str().bold().to_string()
    }

    /// Separator between records
    #[must_use]
    pub fn rule() -> String {
        "-".repeat(RULE_WIDTH)
    }

    /// Money with two decimals and a currency sign
    #[must_use]
    pub fn money(amount: Decimal) -> String {
        format!("${:.2}", amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Multi-line description of a catalog entry
    #[must_use]
    pub fn book(book: &Book) -> String {
        let availability = format!("{}/{}", book.available_copies, book.total_copies);
        let availability = if book.available_copies == 0 {
            availability.as_str().red()
        } else {
            availability.as_str().green()
        };

        let mut out = String::new();
        out.push_str(&format!("ISBN: {}\n", book.isbn));
        out.push_str(&format!("Title: {}\n", book.title));
        out.push_str(&format!("Author: {}\n", book.author));
        out.push_str(&format!("Category: {}\n", book.category));
        out.push_str(&format!("Available/Total: {availability}\n"));
        out.push_str(&format!("Price: {}\n", Self::money(book.price)));
        out.push_str(&format!("Published: {}", book.published_date.format("%Y-%m-%d")));
        out
    }

    /// Multi-line description of a member, including open loans
    #[must_use]
    pub fn member(member: &Member, open_loans: usize) -> String {
        let fine = Self::money(member.fine_balance);
        let fine = if member.fine_balance > Decimal::ZERO {
            fine.as_str().red()
        } else {
            fine.as_str().normal()
        };

        let mut out = String::new();
        out.push_str(&format!("Member ID: {}\n", member.id()));
        out.push_str(&format!("Name: {}\n", member.name()));
        out.push_str(&format!("Type: {}\n", member.class));
        out.push_str(&format!("Email: {}\n", member.identity.email));
        out.push_str(&format!("Phone: {}\n", member.identity.phone));
        out.push_str(&format!("Membership Date: {}\n", member.membership_date.format("%Y-%m-%d")));
        out.push_str(&format!("Books Borrowed: {open_loans}/{}\n", member.max_books_allowed));
        out.push_str(&format!("Fine Amount: {fine}"));
        out
    }

    /// One-line summary of a loan record as of `now`
    #[must_use]
    pub fn loan(loan: &Loan, now: DateTime<Utc>) -> String {
        let status = loan.status(now);
        let label = match status {
            LoanStatus::Overdue => status.label().red(),
            LoanStatus::Open => status.label().yellow(),
            LoanStatus::Returned | LoanStatus::Recorded => status.label().normal(),
        };
        let date = |d: Option<DateTime<Utc>>| {
            d.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string())
        };

        match loan.kind {
            LoanKind::Issue => format!(
                "{} | issued {} | due {} | returned {} | fine {} | {label}",
                loan.isbn,
                loan.issued_at.format("%Y-%m-%d"),
                date(loan.due_date),
                date(loan.returned_at),
                Self::money(loan.fine_amount),
            ),
            LoanKind::Return => {
                format!("{} | returned {} | {label}", loan.isbn, loan.issued_at.format("%Y-%m-%d"))
            }
        }
    }

    /// Generate a markdown table of a member's loans
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)]
    pub fn history_table(loans: &[&Loan], now: DateTime<Utc>) -> String {
        if loans.is_empty() {
            return "No loans recorded yet.".to_string();
        }

        let mut table = String::from("| # | ISBN | Issued | Due | Status | Fine |\n");
        table.push_str("|---|------|--------|-----|--------|------|\n");

        for (i, loan) in loans.iter().enumerate() {
            let fine = match loan.status(now) {
                LoanStatus::Overdue => loan.compute_fine(now),
                _ => loan.fine_amount,
            };
            table.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                i + 1,
                loan.isbn,
                loan.issued_at.format("%Y-%m-%d"),
                loan.due_date.map_or_else(String::new, |d| d.format("%Y-%m-%d").to_string()),
                loan.status(now).label(),
                Self::money(fine),
            ));
        }

        table
    }

    /// One line per overdue loan with the fine accrued so far
    #[must_use]
    pub fn overdue_line(entry: &OverdueEntry<'_>) -> String {
        format!(
            "Member: {} | Book: {} | Due: {} | Days late: {} | Fine: {}",
            entry.member_name.unwrap_or("?"),
            entry.book_title.unwrap_or("?"),
            entry.loan.due_date.map_or_else(String::new, |d| d.format("%Y-%m-%d").to_string()),
            entry.days_overdue,
            Self::money(entry.accrued_fine).as_str().red(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        book::BookCategory,
        id::{Isbn, MemberId},
        member::{Identity, MemberClass},
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn money_always_has_two_decimals() {
        assert_eq!(Render::money(dec!(3)), "$3.00");
        assert_eq!(Render::money(dec!(0.5)), "$0.50");
        assert_eq!(Render::money(dec!(12.345)), "$12.35");
    }

    #[test]
    fn book_lists_every_field() {
        let book = Book::new(
            Isbn::new("ISBN-A"),
            "Dune",
            "Frank Herbert",
            BookCategory::Fiction,
            5,
            dec!(9.9),
            NaiveDate::from_ymd_opt(1965, 8, 1).unwrap(),
        )
        .unwrap();
        let text = Render::book(&book);
        assert!(text.contains("Title: Dune"));
        assert!(text.contains("Category: Fiction"));
        assert!(text.contains("Price: $9.90"));
        assert!(text.contains("Published: 1965-08-01"));
        assert!(text.contains("5/5"));
    }

    #[test]
    fn member_shows_quota_usage() {
        let member = Member::new(
            Identity::new("S001", "Ada", "ada@example.com", "555"),
            MemberClass::Student,
            now(),
        );
        let text = Render::member(&member, 2);
        assert!(text.contains("Books Borrowed: 2/3"));
        assert!(text.contains("Type: Student"));
        assert!(text.contains("$0.00"));
    }

    #[test]
    fn history_table_shows_live_fine_for_overdue_loans() {
        let loan = Loan::issue(MemberId::new("S001"), Isbn::new("ISBN-A"), now());
        let later = now() + Duration::days(16);
        let table = Render::history_table(&[&loan], later);
        assert!(table.starts_with("| # | ISBN |"));
        assert!(table.contains("| 1 | ISBN-A | 2024-06-01 | 2024-06-15 | overdue | $1.00 |"));
    }

    #[test]
    fn empty_history_says_so() {
        assert_eq!(Render::history_table(&[], now()), "No loans recorded yet.");
    }

    #[test]
    fn loan_line_marks_return_records() {
        let record = Loan::return_record(MemberId::new("S001"), Isbn::new("ISBN-A"), now());
        let line = Render::loan(&record, now());
        assert!(line.starts_with("ISBN-A | returned 2024-06-01"));
        assert!(line.contains("return recorded"));
    }
}

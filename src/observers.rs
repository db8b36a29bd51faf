use rust_decimal::Decimal;

use crate::events::LendingEvent;

/// Trait for lending event observation
pub trait LendingObserver {
    /// Called after the ledger has applied (or refused) a lending operation
    fn on_event(&self, event: &LendingEvent);
}

/// Logs every lending event
#[derive(Debug)]
pub struct LoanLogger;

impl LendingObserver for LoanLogger {
    fn on_event(&self, event: &LendingEvent) {
        match event {
            LendingEvent::Issued { loan_id, member_id, isbn, due_date } => {
                let due = due_date.format("%Y-%m-%d");
                tracing::info!(%loan_id, %member_id, %isbn, %due, "book issued");
            }
            LendingEvent::Returned { loan_id, member_id, isbn, fine } => {
                tracing::info!(%loan_id, %member_id, %isbn, %fine, "book returned");
            }
            LendingEvent::Refused { member_id, isbn, reason } => {
                tracing::debug!(%member_id, %isbn, %reason, "issue refused");
            }
        }
    }
}

/// Raises a warning whenever a return charges a fine
#[derive(Debug)]
pub struct FineNotifier;

impl LendingObserver for FineNotifier {
    fn on_event(&self, event: &LendingEvent) {
        if let LendingEvent::Returned { member_id, fine, .. } = event {
            if *fine > Decimal::ZERO {
                tracing::warn!(%member_id, %fine, "fine applied for late return");
            }
        }
    }
}

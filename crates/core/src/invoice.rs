//! Invoice lifecycle.
//!
//! Status transitions driven by payments are validated centrally in the
//! reconciliation path; this module owns the enum, the payability rule, and
//! the derived "overdue" display state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Published but not yet sent to the customer.
    Draft,
    /// Sent to the customer, not yet opened.
    Sent,
    /// Opened through the portal at least once.
    Viewed,
    /// Partially paid; a positive balance remains.
    Partial,
    /// Fully paid.
    Paid,
    /// Past its due date and still carrying a balance.
    ///
    /// Normally derived at read time; persisted only when the client app
    /// explicitly publishes it.
    Overdue,
    /// Cancelled by the company; no further payments accepted.
    Cancelled,
}

/// Error returned when parsing an unknown status value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown invoice status: {0}")]
pub struct UnknownStatus(pub String);

impl InvoiceStatus {
    /// Returns the canonical lowercase name used in storage and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Viewed => "viewed",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether checkout may be created against an invoice in this status.
    ///
    /// Settled and cancelled invoices accept no further payments.
    #[must_use]
    pub const fn accepts_payment(self) -> bool {
        !matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Resolves the status shown to customers, deriving `Overdue` when the
    /// due date has passed and the invoice still accepts payment.
    #[must_use]
    pub fn display_status(self, due_date: Option<NaiveDate>, today: NaiveDate) -> Self {
        match due_date {
            Some(due) if due < today && self.accepts_payment() => Self::Overdue,
            _ => self,
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "viewed" => Ok(Self::Viewed),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::Viewed,
            InvoiceStatus::Partial,
            InvoiceStatus::Paid,
            InvoiceStatus::Overdue,
            InvoiceStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<InvoiceStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_accepts_payment() {
        assert!(InvoiceStatus::Sent.accepts_payment());
        assert!(InvoiceStatus::Viewed.accepts_payment());
        assert!(InvoiceStatus::Partial.accepts_payment());
        assert!(InvoiceStatus::Overdue.accepts_payment());
        assert!(!InvoiceStatus::Paid.accepts_payment());
        assert!(!InvoiceStatus::Cancelled.accepts_payment());
    }

    #[test]
    fn test_overdue_is_derived_for_unpaid_past_due() {
        let today = date(2026, 8, 7);
        let past = Some(date(2026, 8, 1));
        assert_eq!(
            InvoiceStatus::Sent.display_status(past, today),
            InvoiceStatus::Overdue
        );
        assert_eq!(
            InvoiceStatus::Partial.display_status(past, today),
            InvoiceStatus::Overdue
        );
    }

    #[test]
    fn test_overdue_not_derived_when_settled_or_future() {
        let today = date(2026, 8, 7);
        let past = Some(date(2026, 8, 1));
        let future = Some(date(2026, 9, 1));
        assert_eq!(
            InvoiceStatus::Paid.display_status(past, today),
            InvoiceStatus::Paid
        );
        assert_eq!(
            InvoiceStatus::Cancelled.display_status(past, today),
            InvoiceStatus::Cancelled
        );
        assert_eq!(
            InvoiceStatus::Sent.display_status(future, today),
            InvoiceStatus::Sent
        );
        assert_eq!(
            InvoiceStatus::Sent.display_status(None, today),
            InvoiceStatus::Sent
        );
        // Due today is not overdue yet
        assert_eq!(
            InvoiceStatus::Sent.display_status(Some(today), today),
            InvoiceStatus::Sent
        );
    }
}

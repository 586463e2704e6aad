//! Checkout preconditions.
//!
//! Validation runs in a fixed order so the caller can map each failure to the
//! documented error: invoice payable, then amount positive and within the
//! remaining balance. Amounts carry a single one-cent tolerance, shared with
//! the reconciliation boundary checks.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::invoice::InvoiceStatus;

/// The tolerance applied to amount comparisons: one cent.
///
/// Used both when validating a requested checkout amount against the balance
/// and when deciding the partial/paid boundary after a payment.
#[must_use]
pub fn amount_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Checkout validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// The invoice no longer accepts payments.
    #[error("Invoice is {0} and no longer accepts payments")]
    InvoiceClosed(InvoiceStatus),

    /// The requested amount is non-positive or exceeds the balance due.
    #[error("Invalid payment amount {requested}; balance due is {balance_due}")]
    InvalidAmount {
        /// Amount the caller asked to pay.
        requested: Decimal,
        /// Balance currently due on the invoice.
        balance_due: Decimal,
    },
}

/// Validates a checkout request against the invoice's current state.
///
/// # Errors
///
/// Returns `InvoiceClosed` for settled/cancelled invoices and
/// `InvalidAmount` when `requested` is not in `(0, balance_due + 0.01]`.
pub fn validate(
    status: InvoiceStatus,
    balance_due: Decimal,
    requested: Decimal,
) -> Result<(), CheckoutError> {
    if !status.accepts_payment() {
        return Err(CheckoutError::InvoiceClosed(status));
    }

    if requested <= Decimal::ZERO || requested > balance_due + amount_tolerance() {
        return Err(CheckoutError::InvalidAmount {
            requested,
            balance_due,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_valid_amounts_pass() {
        assert!(validate(InvoiceStatus::Sent, dec!(100.00), dec!(40.00)).is_ok());
        assert!(validate(InvoiceStatus::Partial, dec!(60.00), dec!(60.00)).is_ok());
        // Exactly one cent over the balance is tolerated (client rounding)
        assert!(validate(InvoiceStatus::Viewed, dec!(50.00), dec!(50.01)).is_ok());
    }

    #[rstest]
    #[case(dec!(0.00))]
    #[case(dec!(-5.00))]
    #[case(dec!(50.02))]
    #[case(dec!(100.00))]
    fn test_out_of_range_amounts_rejected(#[case] requested: Decimal) {
        let result = validate(InvoiceStatus::Sent, dec!(50.00), requested);
        assert_eq!(
            result,
            Err(CheckoutError::InvalidAmount {
                requested,
                balance_due: dec!(50.00)
            })
        );
    }

    #[test]
    fn test_closed_invoices_rejected_before_amount_check() {
        // Status is checked first, so even a valid amount reports the status
        assert_eq!(
            validate(InvoiceStatus::Paid, dec!(100.00), dec!(10.00)),
            Err(CheckoutError::InvoiceClosed(InvoiceStatus::Paid))
        );
        assert_eq!(
            validate(InvoiceStatus::Cancelled, dec!(100.00), dec!(500.00)),
            Err(CheckoutError::InvoiceClosed(InvoiceStatus::Cancelled))
        );
    }
}

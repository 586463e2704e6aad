//! Property-based tests for reconciliation math.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::checkout::amount_tolerance;
use crate::invoice::InvoiceStatus;
use crate::reconcile::apply_payment;

/// Builds a two-decimal-place amount from integer cents.
fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

proptest! {
    /// The clamped balance is never negative and never increases.
    #[test]
    fn prop_balance_clamped_and_non_increasing(
        balance in 0i64..100_000_000,
        amount in 1i64..100_000_000,
    ) {
        let balance = cents(balance);
        let amount = cents(amount);

        let result = apply_payment(InvoiceStatus::Sent, balance, balance, amount);

        prop_assert!(result.new_balance >= Decimal::ZERO);
        prop_assert!(result.new_balance <= balance);
    }

    /// Status always agrees with the remaining balance.
    #[test]
    fn prop_status_matches_balance(
        total in 1i64..100_000_000,
        paid_so_far in 0i64..100_000_000,
        amount in 1i64..100_000_000,
    ) {
        let total = cents(total);
        let balance = (total - cents(paid_so_far)).max(Decimal::ZERO);
        let amount = cents(amount);

        let result = apply_payment(InvoiceStatus::Sent, total, balance, amount);

        if balance - amount <= amount_tolerance() {
            prop_assert_eq!(result.new_status, InvoiceStatus::Paid);
        } else if result.new_balance < total {
            prop_assert_eq!(result.new_status, InvoiceStatus::Partial);
        } else {
            prop_assert_eq!(result.new_status, InvoiceStatus::Sent);
        }
    }

    /// Paying the exact balance always settles the invoice at zero.
    #[test]
    fn prop_exact_payment_settles(balance in 1i64..100_000_000) {
        let balance = cents(balance);

        let result = apply_payment(InvoiceStatus::Partial, balance, balance, balance);

        prop_assert_eq!(result.new_balance, Decimal::ZERO);
        prop_assert_eq!(result.new_status, InvoiceStatus::Paid);
    }
}

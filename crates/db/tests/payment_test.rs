//! Integration tests for the payment repository (reconciliation ledger).

mod common;

use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{connect, create_test_company, create_test_invoice};
use paylink_core::PaymentProvider;
use paylink_db::entities::{invoices, payments};
use paylink_db::{PaymentRepository, RecordPaymentInput};

fn record_input(
    company_id: Uuid,
    invoice: &invoices::Model,
    amount: rust_decimal::Decimal,
    provider_payment_id: Option<&str>,
) -> RecordPaymentInput {
    RecordPaymentInput {
        company_id,
        invoice_id: invoice.id,
        invoice_number: invoice.invoice_number.clone(),
        customer_name: invoice.customer_name.clone(),
        amount,
        processing_fee: dec!(0.00),
        currency: invoice.currency.clone(),
        method: PaymentProvider::Stripe,
        provider_payment_id: provider_payment_id.map(String::from),
        provider_transaction_id: None,
    }
}

#[tokio::test]
async fn test_partial_then_paid() {
    let db = connect().await;
    let company = create_test_company(&db).await;
    let invoice = create_test_invoice(&db, company.id, dec!(100.00)).await;
    let repo = PaymentRepository::new(db.clone());

    let first = repo
        .record(record_input(company.id, &invoice, dec!(40.00), None))
        .await
        .expect("Failed to record first payment");
    assert!(!first.duplicate);
    assert!(first.payment.reference_number.starts_with("PAY-"));

    let after_first = invoices::Entity::find_by_id(invoice.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_first.balance_due, dec!(60.00));
    assert_eq!(after_first.status, "partial");

    let second = repo
        .record(record_input(company.id, &invoice, dec!(60.00), None))
        .await
        .expect("Failed to record second payment");
    assert!(!second.duplicate);

    let after_second = invoices::Entity::find_by_id(invoice.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_second.balance_due, dec!(0.00));
    assert_eq!(after_second.status, "paid");
}

#[tokio::test]
async fn test_duplicate_provider_payment_id_records_once() {
    let db = connect().await;
    let company = create_test_company(&db).await;
    let invoice = create_test_invoice(&db, company.id, dec!(100.00)).await;
    let repo = PaymentRepository::new(db.clone());

    let provider_id = format!("pi_{}", Uuid::new_v4().simple());

    let first = repo
        .record(record_input(
            company.id,
            &invoice,
            dec!(100.00),
            Some(&provider_id),
        ))
        .await
        .expect("Failed to record payment");
    assert!(!first.duplicate);

    // Simulated duplicate confirmation: same provider payment id
    let second = repo
        .record(record_input(
            company.id,
            &invoice,
            dec!(100.00),
            Some(&provider_id),
        ))
        .await
        .expect("Duplicate record should succeed");
    assert!(second.duplicate);
    assert_eq!(
        second.payment.reference_number,
        first.payment.reference_number
    );

    // Exactly one row exists for the confirmation
    let count = payments::Entity::find()
        .filter(payments::Column::ProviderPaymentId.eq(provider_id.clone()))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 1);

    // The duplicate did not touch the balance a second time
    let after = invoices::Entity::find_by_id(invoice.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.balance_due, dec!(0.00));
}

#[tokio::test]
async fn test_overpayment_clamps_balance_at_zero() {
    let db = connect().await;
    let company = create_test_company(&db).await;
    let invoice = create_test_invoice(&db, company.id, dec!(50.00)).await;
    let repo = PaymentRepository::new(db.clone());

    repo.record(record_input(company.id, &invoice, dec!(50.01), None))
        .await
        .expect("Failed to record payment");

    let after = invoices::Entity::find_by_id(invoice.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.balance_due, dec!(0.00));
    assert_eq!(after.status, "paid");
}

#[tokio::test]
async fn test_pull_unsynced_and_acknowledge() {
    let db = connect().await;
    let company = create_test_company(&db).await;
    let invoice = create_test_invoice(&db, company.id, dec!(100.00)).await;
    let repo = PaymentRepository::new(db.clone());

    let first = repo
        .record(record_input(company.id, &invoice, dec!(10.00), None))
        .await
        .unwrap();
    let second = repo
        .record(record_input(company.id, &invoice, dec!(20.00), None))
        .await
        .unwrap();

    let unsynced = repo.pull_unsynced(company.id, None).await.unwrap();
    assert_eq!(unsynced.len(), 2);
    // Oldest first for deterministic replay
    assert_eq!(unsynced[0].id, first.payment.id);
    assert_eq!(unsynced[1].id, second.payment.id);

    let acknowledged = repo
        .acknowledge_synced(company.id, &[first.payment.id, second.payment.id])
        .await
        .unwrap();
    assert_eq!(acknowledged, 2);

    let remaining = repo.pull_unsynced(company.id, None).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_acknowledge_is_scoped_to_company() {
    let db = connect().await;
    let company = create_test_company(&db).await;
    let other = create_test_company(&db).await;
    let invoice = create_test_invoice(&db, company.id, dec!(100.00)).await;
    let repo = PaymentRepository::new(db.clone());

    let payment = repo
        .record(record_input(company.id, &invoice, dec!(25.00), None))
        .await
        .unwrap();

    // A different tenant guessing ids must not flip this row
    let acknowledged = repo
        .acknowledge_synced(other.id, &[payment.payment.id])
        .await
        .unwrap();
    assert_eq!(acknowledged, 0);

    let unsynced = repo.pull_unsynced(company.id, None).await.unwrap();
    assert_eq!(unsynced.len(), 1);
}

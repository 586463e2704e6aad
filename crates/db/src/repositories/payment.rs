//! Payment repository: the reconciliation ledger.
//!
//! Recording a payment is idempotent on `provider_payment_id`. The partial
//! unique index is the authority: the pre-insert lookup is only a fast path,
//! and a concurrent duplicate that slips past it surfaces as a unique
//! violation which is converted back into the existing row. The balance
//! decrement runs as one SQL statement (clamp + status CASE) so concurrent
//! partial payments never lose updates; its arithmetic mirrors
//! `paylink_core::reconcile::apply_payment`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, Statement,
    TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use paylink_core::PaymentProvider;
use paylink_core::checkout::amount_tolerance;
use paylink_core::reconcile::generate_reference_number;

use crate::entities::payments;

/// Input for recording a completed payment.
#[derive(Debug, Clone)]
pub struct RecordPaymentInput {
    /// Owning company.
    pub company_id: Uuid,
    /// Invoice the payment settles against.
    pub invoice_id: Uuid,
    /// Denormalized external invoice id for client-app sync.
    pub invoice_number: String,
    /// Customer display name.
    pub customer_name: String,
    /// Paid amount.
    pub amount: Decimal,
    /// Provider processing fee, when reported.
    pub processing_fee: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Which provider settled the payment.
    pub method: PaymentProvider,
    /// Provider-assigned payment id (idempotency key), when present.
    pub provider_payment_id: Option<String>,
    /// Provider-assigned transaction/capture id, when present.
    pub provider_transaction_id: Option<String>,
}

/// Result of recording a payment.
#[derive(Debug, Clone)]
pub struct RecordedPayment {
    /// The payment row (existing when `duplicate` is true).
    pub payment: payments::Model,
    /// Whether this confirmation had already been recorded.
    pub duplicate: bool,
}

/// Payment repository for the reconciliation ledger.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a completed payment and applies it to the invoice balance.
    ///
    /// Duplicate provider confirmations return the already-recorded payment
    /// with `duplicate = true` and leave the balance untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn record(&self, input: RecordPaymentInput) -> Result<RecordedPayment, DbErr> {
        let provider_payment_id = input
            .provider_payment_id
            .as_deref()
            .filter(|id| !id.is_empty());

        if let Some(provider_id) = provider_payment_id {
            if let Some(existing) = self.find_by_provider_payment_id(provider_id).await? {
                debug!(
                    reference = %existing.reference_number,
                    "Duplicate payment confirmation, returning existing record"
                );
                return Ok(RecordedPayment {
                    payment: existing,
                    duplicate: true,
                });
            }
        }

        let payment = payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(input.company_id),
            invoice_id: Set(input.invoice_id),
            invoice_number: Set(input.invoice_number.clone()),
            customer_name: Set(input.customer_name.clone()),
            amount: Set(input.amount),
            processing_fee: Set(input.processing_fee),
            currency: Set(input.currency.clone()),
            method: Set(input.method.as_str().to_string()),
            provider_payment_id: Set(provider_payment_id.map(String::from)),
            provider_transaction_id: Set(input.provider_transaction_id.clone()),
            reference_number: Set(generate_reference_number(Utc::now())),
            status: Set("completed".to_string()),
            synced: Set(false),
            created_at: Set(Utc::now().into()),
        };

        // Insert and balance update commit together; a failure between the
        // two must not leave a recorded payment with an unadjusted invoice.
        let txn = self.db.begin().await?;

        let inserted = match payment.insert(&txn).await {
            Ok(model) => model,
            Err(err) => {
                // Two concurrent confirmations raced past the lookup; the
                // unique index decided the winner, return its row.
                txn.rollback().await.ok();
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    if let Some(provider_id) = provider_payment_id {
                        if let Some(existing) =
                            self.find_by_provider_payment_id(provider_id).await?
                        {
                            return Ok(RecordedPayment {
                                payment: existing,
                                duplicate: true,
                            });
                        }
                    }
                }
                return Err(err);
            }
        };

        Self::apply_to_invoice(&txn, input.invoice_id, input.amount).await?;
        txn.commit().await?;

        Ok(RecordedPayment {
            payment: inserted,
            duplicate: false,
        })
    }

    /// Decrements the invoice balance and recomputes its status atomically.
    ///
    /// One statement, not read-modify-write: the clamp and the status CASE
    /// must see the same balance even under concurrent partial payments.
    async fn apply_to_invoice<C: ConnectionTrait>(
        conn: &C,
        invoice_id: Uuid,
        amount: Decimal,
    ) -> Result<(), DbErr> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r"UPDATE invoices
              SET balance_due = GREATEST(balance_due - $1, 0),
                  status = CASE
                      WHEN balance_due - $1 <= $2 THEN 'paid'
                      WHEN GREATEST(balance_due - $1, 0) < total_amount THEN 'partial'
                      ELSE status
                  END
              WHERE id = $3",
            [amount.into(), amount_tolerance().into(), invoice_id.into()],
        );

        conn.execute(statement).await?;
        Ok(())
    }

    /// Finds a payment by its provider-assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_provider_payment_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<Option<payments::Model>, DbErr> {
        payments::Entity::find()
            .filter(payments::Column::ProviderPaymentId.eq(provider_payment_id))
            .one(&self.db)
            .await
    }

    /// Returns a company's unsynced payments, oldest first, optionally
    /// after a watermark, for deterministic client-side replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn pull_unsynced(
        &self,
        company_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<payments::Model>, DbErr> {
        let mut query = payments::Entity::find()
            .filter(payments::Column::CompanyId.eq(company_id))
            .filter(payments::Column::Synced.eq(false));

        if let Some(watermark) = since {
            query = query.filter(payments::Column::CreatedAt.gt(watermark));
        }

        query
            .order_by_asc(payments::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// Marks payments as synced, scoped to the requesting company.
    ///
    /// Ids belonging to other companies are simply not matched, so
    /// cross-tenant id guessing cannot touch other rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn acknowledge_synced(
        &self,
        company_id: Uuid,
        payment_ids: &[Uuid],
    ) -> Result<u64, DbErr> {
        if payment_ids.is_empty() {
            return Ok(0);
        }

        let result = payments::Entity::update_many()
            .col_expr(payments::Column::Synced, sea_orm::sea_query::Expr::value(true))
            .filter(payments::Column::CompanyId.eq(company_id))
            .filter(payments::Column::Id.is_in(payment_ids.iter().copied()))
            .filter(payments::Column::Synced.eq(false))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Returns payments against any of the given invoices, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn for_invoices(&self, invoice_ids: &[Uuid]) -> Result<Vec<payments::Model>, DbErr> {
        if invoice_ids.is_empty() {
            return Ok(Vec::new());
        }

        payments::Entity::find()
            .filter(payments::Column::InvoiceId.is_in(invoice_ids.iter().copied()))
            .order_by_desc(payments::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// Counts all payments for a company.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_for_company(&self, company_id: Uuid) -> Result<u64, DbErr> {
        payments::Entity::find()
            .filter(payments::Column::CompanyId.eq(company_id))
            .count(&self.db)
            .await
    }

    /// Counts a company's payments still awaiting client-app sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_unsynced(&self, company_id: Uuid) -> Result<u64, DbErr> {
        payments::Entity::find()
            .filter(payments::Column::CompanyId.eq(company_id))
            .filter(payments::Column::Synced.eq(false))
            .count(&self.db)
            .await
    }
}

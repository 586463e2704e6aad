//! Invoice repository: publish/upsert and token-keyed reads.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use paylink_core::InvoiceStatus;
use paylink_shared::token::generate_token;

use crate::entities::invoices;

/// Input for publishing or updating an invoice.
#[derive(Debug, Clone)]
pub struct UpsertInvoiceInput {
    /// Owning company.
    pub company_id: Uuid,
    /// Company-scoped external invoice id (the upsert key).
    pub invoice_number: String,
    /// Customer display name.
    pub customer_name: String,
    /// Customer email, used for notification and token grouping.
    pub customer_email: Option<String>,
    /// Explicit customer token to group under, if the client app tracks it.
    pub customer_token: Option<String>,
    /// Opaque invoice payload owned by the client app.
    pub payload: serde_json::Value,
    /// Initial/updated lifecycle status.
    pub status: InvoiceStatus,
    /// Invoice total.
    pub total_amount: Decimal,
    /// Remaining balance.
    pub balance_due: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
}

/// Invoice repository for publish and token lookups.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Publishes an invoice, updating in place when the company has already
    /// published this invoice number.
    ///
    /// Tokens are stable across updates. For new invoices the customer token
    /// is taken from the input, else reused from the customer's most recent
    /// invoice (matched by email), else freshly generated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn upsert(
        &self,
        input: UpsertInvoiceInput,
    ) -> Result<(invoices::Model, bool), DbErr> {
        let existing = invoices::Entity::find()
            .filter(invoices::Column::CompanyId.eq(input.company_id))
            .filter(invoices::Column::InvoiceNumber.eq(input.invoice_number.clone()))
            .one(&self.db)
            .await?;

        if let Some(current) = existing {
            let updated = invoices::ActiveModel {
                id: Set(current.id),
                customer_name: Set(input.customer_name),
                customer_email: Set(input.customer_email),
                payload: Set(input.payload),
                status: Set(input.status.as_str().to_string()),
                total_amount: Set(input.total_amount),
                balance_due: Set(input.balance_due),
                currency: Set(input.currency),
                due_date: Set(input.due_date),
                ..Default::default()
            }
            .update(&self.db)
            .await?;

            return Ok((updated, false));
        }

        let customer_token = match input.customer_token {
            Some(token) => token,
            None => self
                .existing_customer_token(input.company_id, input.customer_email.as_deref())
                .await?
                .unwrap_or_else(generate_token),
        };

        let now = chrono::Utc::now().into();
        let created = invoices::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(input.company_id),
            invoice_number: Set(input.invoice_number),
            invoice_token: Set(generate_token()),
            customer_token: Set(customer_token),
            customer_name: Set(input.customer_name),
            customer_email: Set(input.customer_email),
            payload: Set(input.payload),
            status: Set(input.status.as_str().to_string()),
            total_amount: Set(input.total_amount),
            balance_due: Set(input.balance_due),
            currency: Set(input.currency),
            due_date: Set(input.due_date),
            viewed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok((created, true))
    }

    /// Finds the customer token already in use for this customer, if any.
    async fn existing_customer_token(
        &self,
        company_id: Uuid,
        customer_email: Option<&str>,
    ) -> Result<Option<String>, DbErr> {
        let Some(email) = customer_email else {
            return Ok(None);
        };

        let found = invoices::Entity::find()
            .filter(invoices::Column::CompanyId.eq(company_id))
            .filter(invoices::Column::CustomerEmail.eq(email))
            .order_by_desc(invoices::Column::CreatedAt)
            .one(&self.db)
            .await?;

        Ok(found.map(|invoice| invoice.customer_token))
    }

    /// Finds an invoice by its customer-facing token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<invoices::Model>, DbErr> {
        invoices::Entity::find()
            .filter(invoices::Column::InvoiceToken.eq(token))
            .one(&self.db)
            .await
    }

    /// Finds an invoice by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<invoices::Model>, DbErr> {
        invoices::Entity::find_by_id(id).one(&self.db).await
    }

    /// Returns every invoice sharing a customer token, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_customer_token(
        &self,
        customer_token: &str,
    ) -> Result<Vec<invoices::Model>, DbErr> {
        invoices::Entity::find()
            .filter(invoices::Column::CustomerToken.eq(customer_token))
            .order_by_desc(invoices::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// Records the first customer view: `sent` becomes `viewed` once.
    ///
    /// A no-op for any other status, so payment-driven statuses are never
    /// overwritten by a page refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn mark_viewed(&self, id: Uuid) -> Result<(), DbErr> {
        invoices::Entity::update_many()
            .col_expr(
                invoices::Column::Status,
                Expr::value(InvoiceStatus::Viewed.as_str()),
            )
            .col_expr(
                invoices::Column::ViewedAt,
                Expr::value(chrono::Utc::now()),
            )
            .filter(invoices::Column::Id.eq(id))
            .filter(invoices::Column::Status.eq(InvoiceStatus::Sent.as_str()))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    /// Counts all invoices for a company.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_for_company(&self, company_id: Uuid) -> Result<u64, DbErr> {
        invoices::Entity::find()
            .filter(invoices::Column::CompanyId.eq(company_id))
            .count(&self.db)
            .await
    }

    /// Counts a company's invoices in a given status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_with_status(
        &self,
        company_id: Uuid,
        status: InvoiceStatus,
    ) -> Result<u64, DbErr> {
        invoices::Entity::find()
            .filter(invoices::Column::CompanyId.eq(company_id))
            .filter(invoices::Column::Status.eq(status.as_str()))
            .count(&self.db)
            .await
    }
}

//! Initial database migration.
//!
//! Creates the companies, invoices, payments, oauth_states, and rate_limits
//! tables with their constraints, indexes, and the updated_at trigger.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(COMPANIES_SQL).await?;
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(OAUTH_STATES_SQL).await?;
        db.execute_unprepared(RATE_LIMITS_SQL).await?;
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const COMPANIES_SQL: &str = r"
-- Companies: one row per client-app tenant
CREATE TABLE companies (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    logo_url TEXT,
    api_key VARCHAR(64) NOT NULL,
    contact_email VARCHAR(255),
    stripe_account_id VARCHAR(255),
    stripe_charges_enabled BOOLEAN NOT NULL DEFAULT false,
    paypal_merchant_id VARCHAR(255),
    paypal_email VARCHAR(255),
    square_merchant_id VARCHAR(255),
    square_access_token TEXT,
    square_location_id VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- API key lookup happens on every server-to-server request
CREATE UNIQUE INDEX idx_companies_api_key ON companies(api_key);
";

const INVOICES_SQL: &str = r"
-- Invoices: one row per published invoice
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    invoice_number VARCHAR(100) NOT NULL,
    invoice_token VARCHAR(48) NOT NULL,
    customer_token VARCHAR(48) NOT NULL,
    customer_name VARCHAR(255) NOT NULL,
    customer_email VARCHAR(255),
    payload JSONB NOT NULL DEFAULT '{}',
    status VARCHAR(20) NOT NULL DEFAULT 'draft',
    total_amount NUMERIC(12,2) NOT NULL,
    balance_due NUMERIC(12,2) NOT NULL,
    currency CHAR(3) NOT NULL,
    due_date DATE,
    viewed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_invoice_status CHECK (status IN
        ('draft', 'sent', 'viewed', 'partial', 'paid', 'overdue', 'cancelled')),
    CONSTRAINT chk_balance_non_negative CHECK (balance_due >= 0),
    CONSTRAINT chk_balance_within_total CHECK (balance_due <= total_amount)
);

-- The upsert key: external ids are company-scoped, not global
CREATE UNIQUE INDEX idx_invoices_company_number ON invoices(company_id, invoice_number);

-- Token lookups are the hot customer-facing path
CREATE UNIQUE INDEX idx_invoices_token ON invoices(invoice_token);
CREATE INDEX idx_invoices_customer_token ON invoices(customer_token);
CREATE INDEX idx_invoices_company ON invoices(company_id, created_at DESC);
";

const PAYMENTS_SQL: &str = r"
-- Payments: one row per recorded payment outcome
CREATE TABLE payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    invoice_number VARCHAR(100) NOT NULL,
    customer_name VARCHAR(255) NOT NULL,
    amount NUMERIC(12,2) NOT NULL,
    processing_fee NUMERIC(12,2) NOT NULL DEFAULT 0,
    currency CHAR(3) NOT NULL,
    method VARCHAR(20) NOT NULL,
    provider_payment_id VARCHAR(255),
    provider_transaction_id VARCHAR(255),
    reference_number VARCHAR(30) NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'completed',
    synced BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payment_method CHECK (method IN ('stripe', 'paypal', 'square')),
    CONSTRAINT chk_payment_status CHECK (status IN ('completed', 'refunded', 'failed'))
);

-- The idempotency authority: duplicate provider confirmations collide here
CREATE UNIQUE INDEX idx_payments_provider_id ON payments(provider_payment_id)
    WHERE provider_payment_id IS NOT NULL;

-- Client-app sync pulls unsynced rows oldest-first
CREATE INDEX idx_payments_unsynced ON payments(company_id, created_at)
    WHERE NOT synced;

CREATE INDEX idx_payments_invoice ON payments(invoice_id, created_at DESC);
";

const OAUTH_STATES_SQL: &str = r"
-- In-flight provider-connect attempts (CSRF state)
CREATE TABLE oauth_states (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    provider VARCHAR(20) NOT NULL,
    state_token VARCHAR(64) NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_state_provider CHECK (provider IN ('stripe', 'paypal', 'square')),
    CONSTRAINT chk_state_expires_future CHECK (expires_at > created_at)
);

CREATE UNIQUE INDEX idx_oauth_states_token ON oauth_states(state_token);

-- Opportunistic sweep of expired rows
CREATE INDEX idx_oauth_states_expires ON oauth_states(expires_at);
";

const RATE_LIMITS_SQL: &str = r"
-- Failed-lookup counters per hashed client IP (fixed 15-minute window)
CREATE TABLE rate_limits (
    ip_hash VARCHAR(64) PRIMARY KEY,
    failed_count INTEGER NOT NULL DEFAULT 0,
    window_start TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_rate_limits_window ON rate_limits(window_start);
";

const TRIGGERS_SQL: &str = r"
-- Keep updated_at current on row updates
CREATE OR REPLACE FUNCTION set_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_companies_updated_at
    BEFORE UPDATE ON companies
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

CREATE TRIGGER trg_invoices_updated_at
    BEFORE UPDATE ON invoices
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS rate_limits CASCADE;
DROP TABLE IF EXISTS oauth_states CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS companies CASCADE;
DROP FUNCTION IF EXISTS set_updated_at();
";

//! Initial database migration.
//!
//! Creates the owner directory, documents with their line items, the
//! per-owner number counters, the audit log and the settlement ledger.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: OWNERS AND CLIENTS
        // ============================================================
        db.execute_unprepared(OWNER_PROFILES_SQL).await?;
        db.execute_unprepared(CLIENTS_SQL).await?;

        // ============================================================
        // PART 2: DOCUMENTS
        // ============================================================
        db.execute_unprepared(DOCUMENTS_SQL).await?;
        db.execute_unprepared(LINE_ITEMS_SQL).await?;
        db.execute_unprepared(DOCUMENT_COUNTERS_SQL).await?;

        // ============================================================
        // PART 3: AUDIT AND SETTLEMENT
        // ============================================================
        db.execute_unprepared(ACTIVITY_LOG_SQL).await?;
        db.execute_unprepared(SETTLEMENT_EVENTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const OWNER_PROFILES_SQL: &str = r"
CREATE TABLE owner_profiles (
    owner_id UUID PRIMARY KEY,
    business_name VARCHAR(255) NOT NULL,
    default_currency CHAR(3) NOT NULL DEFAULT 'GBP',
    vat_included_default BOOLEAN NOT NULL DEFAULT false,
    plan VARCHAR(16) NOT NULL DEFAULT 'free' CHECK (plan IN ('free', 'pro')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const CLIENTS_SQL: &str = r"
CREATE TABLE clients (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    owner_id UUID NOT NULL REFERENCES owner_profiles(owner_id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(320),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_clients_owner ON clients(owner_id);
";

const DOCUMENTS_SQL: &str = r"
CREATE TABLE documents (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL REFERENCES owner_profiles(owner_id) ON DELETE CASCADE,
    kind VARCHAR(16) NOT NULL CHECK (kind IN ('invoice', 'offer')),
    number VARCHAR(32) NOT NULL,
    public_id VARCHAR(64) NOT NULL UNIQUE,
    status VARCHAR(16) NOT NULL,
    currency CHAR(3) NOT NULL,
    client_id UUID REFERENCES clients(id) ON DELETE SET NULL,
    client_name VARCHAR(255) NOT NULL,
    client_email VARCHAR(320),
    discount_type VARCHAR(16) NOT NULL DEFAULT 'none'
        CHECK (discount_type IN ('none', 'percent', 'fixed')),
    discount_value NUMERIC(19, 4) NOT NULL DEFAULT 0,
    vat_included BOOLEAN NOT NULL DEFAULT false,
    processing_fee_included BOOLEAN NOT NULL DEFAULT false,
    processing_fee BIGINT,
    tax_amount BIGINT NOT NULL,
    amount BIGINT NOT NULL CHECK (amount >= 0),
    due_date DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    sent_at TIMESTAMPTZ,
    viewed_at TIMESTAMPTZ,
    closed_at TIMESTAMPTZ,
    decline_reason TEXT,
    invoice_id UUID REFERENCES documents(id),
    recurring_unit VARCHAR(16) CHECK (recurring_unit IN ('minutes', 'days')),
    recurring_every INTEGER CHECK (recurring_every >= 1),
    last_recurred_at TIMESTAMPTZ,
    recurring_parent_id UUID REFERENCES documents(id),
    reminders_enabled BOOLEAN NOT NULL DEFAULT false,
    reminder_offsets JSONB NOT NULL DEFAULT '[]'::jsonb,
    day1_sent_at TIMESTAMPTZ,
    day3_sent_at TIMESTAMPTZ,
    day7_sent_at TIMESTAMPTZ,
    last_reminder_at TIMESTAMPTZ,
    UNIQUE (owner_id, kind, number),
    CHECK (kind = 'invoice' OR status IN ('draft', 'sent', 'viewed', 'accepted', 'declined')),
    CHECK (kind = 'offer' OR status IN ('draft', 'sent', 'viewed', 'paid', 'void'))
);

CREATE INDEX idx_documents_owner_kind ON documents(owner_id, kind, created_at);
CREATE INDEX idx_documents_recurring ON documents(status)
    WHERE recurring_unit IS NOT NULL AND recurring_parent_id IS NULL;
CREATE INDEX idx_documents_reminders ON documents(status)
    WHERE reminders_enabled;
CREATE UNIQUE INDEX idx_documents_offer_invoice ON documents(invoice_id)
    WHERE invoice_id IS NOT NULL;
";

const LINE_ITEMS_SQL: &str = r"
CREATE TABLE line_items (
    id UUID PRIMARY KEY,
    document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    description TEXT NOT NULL,
    unit_amount BIGINT NOT NULL CHECK (unit_amount >= 0),
    discount_percent NUMERIC(7, 4) NOT NULL DEFAULT 0
        CHECK (discount_percent >= 0 AND discount_percent <= 100),
    position INTEGER NOT NULL
);

CREATE INDEX idx_line_items_document ON line_items(document_id, position);
";

const DOCUMENT_COUNTERS_SQL: &str = r"
CREATE TABLE document_counters (
    owner_id UUID NOT NULL REFERENCES owner_profiles(owner_id) ON DELETE CASCADE,
    kind VARCHAR(16) NOT NULL,
    last_value BIGINT NOT NULL DEFAULT 0,
    PRIMARY KEY (owner_id, kind)
);
";

const ACTIVITY_LOG_SQL: &str = r"
CREATE TABLE activity_log (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    document_kind VARCHAR(16) NOT NULL,
    document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    kind VARCHAR(32) NOT NULL,
    related_document_id UUID,
    prior_status VARCHAR(16),
    amount BIGINT,
    detail TEXT,
    occurred_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_activity_owner_time ON activity_log(owner_id, occurred_at DESC, id DESC);
";

const SETTLEMENT_EVENTS_SQL: &str = r"
CREATE TABLE settlement_events (
    event_id VARCHAR(255) PRIMARY KEY,
    invoice_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    processed_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS settlement_events CASCADE;
DROP TABLE IF EXISTS activity_log CASCADE;
DROP TABLE IF EXISTS document_counters CASCADE;
DROP TABLE IF EXISTS line_items CASCADE;
DROP TABLE IF EXISTS documents CASCADE;
DROP TABLE IF EXISTS clients CASCADE;
DROP TABLE IF EXISTS owner_profiles CASCADE;
";

//! Compensation schema.
//!
//! Invoices (ordinary invoices and credit/debit notes on both sides of the
//! ledger), direct payment documents and their items, and the append-only
//! credit-note application table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TABLES
        // ============================================================
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(PAYMENT_DOCUMENTS_SQL).await?;
        db.execute_unprepared(PAYMENT_ITEMS_SQL).await?;
        db.execute_unprepared(CREDIT_NOTE_APPLICATIONS_SQL).await?;

        // ============================================================
        // PART 3: TRIGGERS
        // ============================================================
        db.execute_unprepared(UPDATED_AT_SQL).await?;
        db.execute_unprepared(IMMUTABLE_APPLICATIONS_SQL).await?;

        // ============================================================
        // PART 4: ROW LEVEL SECURITY
        // ============================================================
        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE document_class AS ENUM ('sales', 'purchase');

CREATE TYPE voucher_type_class AS ENUM ('ORDINARY', 'CREDIT_NOTE', 'DEBIT_NOTE');

CREATE TYPE invoice_status AS ENUM (
    'DRAFT',
    'CONFIRMED',
    'PARTIAL_PAID',
    'PAID',
    'CANCELLED'
);

CREATE TYPE payment_document_status AS ENUM ('DRAFT', 'CONFIRMED', 'CANCELLED');
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL,
    debtor_id UUID NOT NULL,
    document_class document_class NOT NULL,
    voucher_type voucher_type_class NOT NULL DEFAULT 'ORDINARY',
    issue_date DATE NOT NULL,
    total NUMERIC(19, 4) NOT NULL,
    status invoice_status NOT NULL DEFAULT 'DRAFT',
    original_invoice_id UUID REFERENCES invoices(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_original_only_on_notes CHECK (
        original_invoice_id IS NULL OR voucher_type <> 'ORDINARY'
    )
);

CREATE INDEX idx_invoices_open ON invoices(company_id, document_class, debtor_id, issue_date)
    WHERE status IN ('CONFIRMED', 'PARTIAL_PAID') AND voucher_type = 'ORDINARY';
CREATE INDEX idx_invoices_original ON invoices(original_invoice_id)
    WHERE original_invoice_id IS NOT NULL;
";

const PAYMENT_DOCUMENTS_SQL: &str = r"
CREATE TABLE payment_documents (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL,
    document_class document_class NOT NULL,
    status payment_document_status NOT NULL DEFAULT 'DRAFT',
    payment_date DATE NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const PAYMENT_ITEMS_SQL: &str = r"
CREATE TABLE payment_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL,
    payment_document_id UUID NOT NULL REFERENCES payment_documents(id) ON DELETE CASCADE,
    invoice_id UUID NOT NULL REFERENCES invoices(id),
    amount NUMERIC(19, 4) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payment_item_positive CHECK (amount > 0)
);

CREATE INDEX idx_payment_items_invoice ON payment_items(invoice_id);
";

const CREDIT_NOTE_APPLICATIONS_SQL: &str = r"
CREATE TABLE credit_note_applications (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL,
    credit_note_id UUID NOT NULL REFERENCES invoices(id),
    invoice_id UUID NOT NULL REFERENCES invoices(id),
    amount NUMERIC(19, 4) NOT NULL,
    sequence INTEGER NOT NULL,
    reverses_application_id UUID UNIQUE REFERENCES credit_note_applications(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (credit_note_id, sequence),
    CONSTRAINT chk_application_sign CHECK (
        (reverses_application_id IS NULL AND amount > 0)
        OR (reverses_application_id IS NOT NULL AND amount < 0)
    ),
    CONSTRAINT chk_not_self_applied CHECK (credit_note_id <> invoice_id)
);

CREATE INDEX idx_cna_invoice ON credit_note_applications(invoice_id);
CREATE INDEX idx_cna_credit_note ON credit_note_applications(credit_note_id, sequence);
";

const UPDATED_AT_SQL: &str = r"
CREATE OR REPLACE FUNCTION touch_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_invoices_updated_at
BEFORE UPDATE ON invoices
FOR EACH ROW
EXECUTE FUNCTION touch_updated_at();

CREATE TRIGGER trg_payment_documents_updated_at
BEFORE UPDATE ON payment_documents
FOR EACH ROW
EXECUTE FUNCTION touch_updated_at();
";

const IMMUTABLE_APPLICATIONS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_application_modification
-- Application rows are append-only. Undo with a reversing row.
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_application_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'credit_note_applications rows are immutable. Insert a reversing row instead.';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_application_mod
BEFORE UPDATE OR DELETE ON credit_note_applications
FOR EACH ROW
EXECUTE FUNCTION prevent_application_modification();
";

const RLS_SQL: &str = r"
ALTER TABLE invoices ENABLE ROW LEVEL SECURITY;
ALTER TABLE payment_documents ENABLE ROW LEVEL SECURITY;
ALTER TABLE payment_items ENABLE ROW LEVEL SECURITY;
ALTER TABLE credit_note_applications ENABLE ROW LEVEL SECURITY;

CREATE POLICY tenant_isolation ON invoices
    USING (company_id = current_setting('app.current_company_id', true)::UUID);

CREATE POLICY tenant_isolation ON payment_documents
    USING (company_id = current_setting('app.current_company_id', true)::UUID);

CREATE POLICY tenant_isolation ON payment_items
    USING (company_id = current_setting('app.current_company_id', true)::UUID);

CREATE POLICY tenant_isolation ON credit_note_applications
    USING (company_id = current_setting('app.current_company_id', true)::UUID);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS credit_note_applications;
DROP TABLE IF EXISTS payment_items;
DROP TABLE IF EXISTS payment_documents;
DROP TABLE IF EXISTS invoices;
DROP FUNCTION IF EXISTS prevent_application_modification();
DROP FUNCTION IF EXISTS touch_updated_at();
DROP TYPE IF EXISTS payment_document_status;
DROP TYPE IF EXISTS invoice_status;
DROP TYPE IF EXISTS voucher_type_class;
DROP TYPE IF EXISTS document_class;
";

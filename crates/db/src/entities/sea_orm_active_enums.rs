//! Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use offset_core::compensation::types as domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "document_class")]
pub enum DocumentClass {
    #[sea_orm(string_value = "sales")]
    Sales,
    #[sea_orm(string_value = "purchase")]
    Purchase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "voucher_type_class")]
pub enum VoucherTypeClass {
    #[sea_orm(string_value = "ORDINARY")]
    Ordinary,
    #[sea_orm(string_value = "CREDIT_NOTE")]
    CreditNote,
    #[sea_orm(string_value = "DEBIT_NOTE")]
    DebitNote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_status")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "PARTIAL_PAID")]
    PartialPaid,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "payment_document_status"
)]
pub enum PaymentDocumentStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

// ============================================================================
// Domain conversions
// ============================================================================

impl From<DocumentClass> for domain::DocumentClass {
    fn from(value: DocumentClass) -> Self {
        match value {
            DocumentClass::Sales => Self::Sales,
            DocumentClass::Purchase => Self::Purchase,
        }
    }
}

impl From<domain::DocumentClass> for DocumentClass {
    fn from(value: domain::DocumentClass) -> Self {
        match value {
            domain::DocumentClass::Sales => Self::Sales,
            domain::DocumentClass::Purchase => Self::Purchase,
        }
    }
}

impl From<VoucherTypeClass> for domain::VoucherTypeClass {
    fn from(value: VoucherTypeClass) -> Self {
        match value {
            VoucherTypeClass::Ordinary => Self::Ordinary,
            VoucherTypeClass::CreditNote => Self::CreditNote,
            VoucherTypeClass::DebitNote => Self::DebitNote,
        }
    }
}

impl From<domain::VoucherTypeClass> for VoucherTypeClass {
    fn from(value: domain::VoucherTypeClass) -> Self {
        match value {
            domain::VoucherTypeClass::Ordinary => Self::Ordinary,
            domain::VoucherTypeClass::CreditNote => Self::CreditNote,
            domain::VoucherTypeClass::DebitNote => Self::DebitNote,
        }
    }
}

impl From<InvoiceStatus> for domain::InvoiceStatus {
    fn from(value: InvoiceStatus) -> Self {
        match value {
            InvoiceStatus::Draft => Self::Draft,
            InvoiceStatus::Confirmed => Self::Confirmed,
            InvoiceStatus::PartialPaid => Self::PartialPaid,
            InvoiceStatus::Paid => Self::Paid,
            InvoiceStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<domain::InvoiceStatus> for InvoiceStatus {
    fn from(value: domain::InvoiceStatus) -> Self {
        match value {
            domain::InvoiceStatus::Draft => Self::Draft,
            domain::InvoiceStatus::Confirmed => Self::Confirmed,
            domain::InvoiceStatus::PartialPaid => Self::PartialPaid,
            domain::InvoiceStatus::Paid => Self::Paid,
            domain::InvoiceStatus::Cancelled => Self::Cancelled,
        }
    }
}

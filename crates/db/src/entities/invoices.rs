//! `SeaORM` Entity for invoices table.
//!
//! Holds ordinary invoices and credit/debit notes of both ledger sides.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{DocumentClass, InvoiceStatus, VoucherTypeClass};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub debtor_id: Uuid,
    pub document_class: DocumentClass,
    pub voucher_type: VoucherTypeClass,
    pub issue_date: Date,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub original_invoice_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::OriginalInvoiceId",
        to = "Column::Id"
    )]
    OriginalInvoice,
    #[sea_orm(has_many = "super::payment_items::Entity")]
    PaymentItems,
}

impl Related<super::payment_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

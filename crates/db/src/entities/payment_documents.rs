//! `SeaORM` Entity for payment_documents table (receipts and payment orders).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{DocumentClass, PaymentDocumentStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub document_class: DocumentClass,
    pub status: PaymentDocumentStatus,
    pub payment_date: Date,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payment_items::Entity")]
    PaymentItems,
}

impl Related<super::payment_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

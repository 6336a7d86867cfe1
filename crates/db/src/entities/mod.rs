//! `SeaORM` entities for the compensation schema.

pub mod prelude;

pub mod credit_note_applications;
pub mod invoices;
pub mod payment_documents;
pub mod payment_items;
pub mod sea_orm_active_enums;

//! Entity re-exports.

pub use super::credit_note_applications::Entity as CreditNoteApplications;
pub use super::invoices::Entity as Invoices;
pub use super::payment_documents::Entity as PaymentDocuments;
pub use super::payment_items::Entity as PaymentItems;

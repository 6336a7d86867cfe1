//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod compensation;
pub mod ledger;

pub use compensation::{CompensationRepository, RetryPolicy};
pub use ledger::{SeaOrmLedger, map_db_err};

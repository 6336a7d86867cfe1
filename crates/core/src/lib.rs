//! Core compensation logic for Offset.
//!
//! Pure business rules: no web or database dependencies. Persistence is
//! reached only through the [`compensation::LedgerAdapter`] trait.

pub mod compensation;

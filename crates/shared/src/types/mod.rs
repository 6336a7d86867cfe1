//! Common types used across the application.

pub mod id;
pub mod money;

pub use id::*;
pub use money::{CURRENCY_SCALE, HALF_CENT, is_settled, round_to_cents, truncate_to_cents};

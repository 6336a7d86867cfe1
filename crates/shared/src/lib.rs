//! Shared types and configuration for Offset.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Currency amount helpers (cent rounding, half-cent tolerance)
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;

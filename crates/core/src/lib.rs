//! Core domain models and business logic for Arenarr
//!
//! This crate contains the fundamental domain models, value objects,
//! and business rules that define the Arenarr application.

pub mod config;
pub mod domain;
pub mod error;
pub mod models;
pub mod retry;

// Re-export core types
pub use domain::*;
pub use error::*;
pub use models::*;
pub use retry::{retry_with_backoff, RetryConfig, RetryPolicy};

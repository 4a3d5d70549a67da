//! # quickform-core
//!
//! Foundation types for the quickform form library: the [`Value`] model with
//! its "absent vs. empty" sentinels, the error types, and logging helpers.
//! This crate has no intra-workspace dependencies.
//!
//! ## Modules
//!
//! - [`value`] - The `Value` enum and its sentinel variants
//! - [`error`] - Error types and result alias
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use error::{FormError, FormResult, ValueError};
pub use value::Value;

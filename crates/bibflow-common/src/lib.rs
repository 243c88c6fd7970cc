//! Bibflow Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the bibflow workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all bibflow
//! workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Tracing setup shared by every binary
//! - **Types**: Closed domain enums (job statuses, entity/action types)

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{BibflowError, Result};

//! Bibflow Server Library
//!
//! HTTP service for importing bibliographic source records.
//!
//! # Overview
//!
//! The server drives file imports end to end:
//!
//! - **Job executions**: the lifecycle state machine for import jobs,
//!   including composite jobs with a parent and per-file children
//! - **Chunk ingestion**: raw MARC/EDIFACT record batches submitted per
//!   job and pushed through the change engine
//! - **Journal**: an append-only action log, reduced on demand into
//!   per-record processing reports
//!
//! # Architecture
//!
//! The server follows a **CQRS (Command Query Responsibility
//! Segregation)** layout: each feature is a vertical slice with
//! per-operation command and query files and its own `routes.rs`.
//! Storage sits behind trait objects in [`storage::AppContext`], with a
//! PostgreSQL backend under [`db`] and an in-memory backend used by
//! tests and the `BIBFLOW_STORAGE=memory` mode.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing and extraction
//! - **SQLx**: PostgreSQL pool and migrations
//! - **Tower**: Middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use bibflow_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod features;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use error::{AppError, AppResult};

//! Journal feature
//!
//! Append-only journal writes plus the aggregation queries that turn the
//! journal back into per-record processing reports.

pub mod commands;
pub mod queries;
pub mod reducer;
pub mod routes;

pub use routes::journal_routes;

//! Job execution lifecycle feature
//!
//! Vertical slice for creating jobs, driving their status machine,
//! assigning profiles, and deleting them.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::job_executions_routes;

//! Read operations on job executions

pub mod get_job_execution;
pub mod list_children;

pub use get_job_execution::GetJobExecutionQuery;
pub use list_children::ListChildrenQuery;

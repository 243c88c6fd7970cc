//! Write operations on job executions

pub mod delete_records;
pub mod init_job_executions;
pub mod set_job_profile;
pub mod soft_delete_job_executions;
pub mod update_job_execution;
pub mod update_status;

pub use delete_records::DeleteRecordsCommand;
pub use init_job_executions::InitJobExecutionsCommand;
pub use set_job_profile::SetJobProfileCommand;
pub use soft_delete_job_executions::SoftDeleteJobExecutionsCommand;
pub use update_job_execution::UpdateJobExecutionCommand;
pub use update_status::UpdateStatusCommand;

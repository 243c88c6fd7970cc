//! Read operations on the journal

pub mod get_log_entries;
pub mod get_record_entry;

pub use get_log_entries::GetLogEntriesQuery;
pub use get_record_entry::GetRecordEntryQuery;

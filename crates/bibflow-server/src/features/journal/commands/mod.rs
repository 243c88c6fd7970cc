//! Write operations on the journal

pub mod write_journal_records;

pub use write_journal_records::WriteJournalRecordsCommand;

//! Shared helpers for integration tests
#![allow(dead_code)]

use serde_json::json;
use uuid::Uuid;

use bibflow_server::engine::flow_control::FlowControlSettings;
use bibflow_server::models::{
    FileDto, InitJobExecutionsRqDto, InitSourceType, InitialRecord, RawRecordsDto,
    RecordsContentType, RecordsMetadata, RunBy,
};
use bibflow_server::storage::memory::InMemoryState;
use bibflow_server::storage::AppContext;

/// Fresh in-memory backends plus the context the handlers run against
pub fn setup() -> (InMemoryState, AppContext) {
    let state = InMemoryState::new();
    let ctx = state.context(FlowControlSettings::default());
    (state, ctx)
}

/// A MARC-in-JSON bibliographic record with the given title
pub fn marc_bib(title: &str) -> String {
    json!({
        "leader": "01234cam a2200337 a 4500",
        "fields": [
            { "001": "in00001" },
            { "245": { "ind1": "1", "ind2": "0", "subfields": [ { "a": title } ] } }
        ]
    })
    .to_string()
}

/// A MARC-in-JSON holdings record, optionally missing its 004 link
pub fn marc_holdings(with_linking_field: bool) -> String {
    let mut fields = vec![json!({ "001": "ho00001" })];
    if with_linking_field {
        fields.push(json!({ "004": "in00001" }));
    }
    json!({ "leader": "01234cx  a2200337 a 4500", "fields": fields }).to_string()
}

/// A payload the parser cannot read at all
pub fn broken_record() -> String {
    "not a marc record".to_string()
}

/// An init request for the given file names
pub fn init_files(names: &[&str]) -> InitJobExecutionsRqDto {
    InitJobExecutionsRqDto {
        files: names.iter().map(|name| FileDto { name: (*name).to_string() }).collect(),
        source_type: InitSourceType::Files,
        job_profile_info: None,
        user_id: Uuid::new_v4(),
        run_by: RunBy {
            first_name: "Import".to_string(),
            last_name: "Operator".to_string(),
        },
        tenant_id: "diku".to_string(),
    }
}

/// One chunk of raw records with explicit orders starting at `counter - len`
pub fn chunk(records: Vec<String>, counter: i32, total: i32, last: bool) -> RawRecordsDto {
    let base = counter - records.len() as i32;
    RawRecordsDto {
        id: Uuid::new_v4(),
        initial_records: records
            .into_iter()
            .enumerate()
            .map(|(index, record)| InitialRecord {
                record,
                order: Some(base + index as i32),
            })
            .collect(),
        records_metadata: RecordsMetadata {
            counter,
            total,
            last,
            content_type: RecordsContentType::MarcJson,
        },
    }
}

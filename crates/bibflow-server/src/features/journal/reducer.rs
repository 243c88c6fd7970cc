//! Journal reduction
//!
//! Rebuilds per-record processing outcomes from the append-only journal.
//! The reduction is pure and order-independent: rows of one group are
//! internally ordered by (action_date, id) before any rule runs, so
//! permuting insertion order never changes a derived summary.

use bibflow_common::types::{ActionStatus, ActionType, EntityType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::JournalRecord;

/// Derived outcome of one entity type within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Created,
    Updated,
    Multiple,
    Discarded,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Multiple => "MULTIPLE",
            Self::Discarded => "DISCARDED",
        }
    }
}

/// Outcome of one entity type within a group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityOutcome {
    pub entity_type: EntityType,
    pub action_status: ProcessingStatus,
    /// Distinct entity ids, for the detailed view
    pub entity_ids: Vec<String>,
    /// Distinct human-readable ids, aligned with `entity_ids` ordering
    pub hrids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One reconstructed processing-log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobLogEntry {
    pub job_execution_id: Uuid,
    pub source_record_id: Uuid,
    pub source_record_order: i32,
    /// Line number for invoice-line groups, absent for plain groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_line_number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_record_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_record_action_status: Option<ProcessingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub related_entities: Vec<EntityOutcome>,
    /// Source record types seen in the group (MARC_*, EDIFACT)
    #[serde(skip)]
    pub source_types: Vec<EntityType>,
    pub completed_date: DateTime<Utc>,
}

impl JobLogEntry {
    /// Whether this group carries at least one discarded/errored outcome
    pub fn has_error(&self) -> bool {
        self.source_record_action_status == Some(ProcessingStatus::Discarded)
            || self
                .related_entities
                .iter()
                .any(|e| e.action_status == ProcessingStatus::Discarded)
    }

    /// Whether the group involves the given entity type at all
    pub fn involves(&self, entity_type: EntityType) -> bool {
        self.source_types.contains(&entity_type)
            || self.related_entities.iter().any(|e| e.entity_type == entity_type)
    }
}

/// Reduce a job's journal rows into ordered log entries
///
/// Groups by source id, with invoice lines split into per-line groups
/// keyed by the line number in their entity hrid (`invoiceNo-lineNo`).
/// Output ordering is (source_record_order, line number).
pub fn reduce(rows: &[JournalRecord]) -> Vec<JobLogEntry> {
    let mut groups: HashMap<(Uuid, Option<i32>), Vec<&JournalRecord>> = HashMap::new();
    for row in rows {
        let line = invoice_line_number(row);
        groups.entry((row.source_id, line)).or_default().push(row);
    }

    let mut entries: Vec<JobLogEntry> = groups
        .into_iter()
        .map(|((source_id, line), group)| reduce_group(source_id, line, group))
        .collect();
    entries.sort_by_key(|e| (e.source_record_order, e.invoice_line_number));
    entries
}

/// Line number of an invoice-line row (`invoiceNo-lineNo`), else None
fn invoice_line_number(row: &JournalRecord) -> Option<i32> {
    if row.entity_type != EntityType::Invoice {
        return None;
    }
    let hrid = row.entity_hrid.as_deref()?;
    let (_, line) = hrid.rsplit_once('-')?;
    line.parse().ok()
}

fn reduce_group(source_id: Uuid, line: Option<i32>, mut group: Vec<&JournalRecord>) -> JobLogEntry {
    // Deterministic internal order regardless of insertion order
    group.sort_by(|a, b| (a.action_date, a.id).cmp(&(b.action_date, b.id)));

    let mut by_type: HashMap<EntityType, Vec<&JournalRecord>> = HashMap::new();
    for row in &group {
        by_type.entry(row.entity_type).or_default().push(row);
    }
    // Fixed iteration order, so the derived entry never depends on map
    // ordering
    let mut typed: Vec<(EntityType, Vec<&JournalRecord>)> = by_type.into_iter().collect();
    typed.sort_by_key(|(entity_type, _)| entity_type.as_str());

    let mut source_status: Option<ProcessingStatus> = None;
    let mut source_types = Vec::new();
    let mut related = Vec::new();
    for (entity_type, rows) in typed {
        let outcome = derive_outcome(entity_type, &rows);
        if entity_type.is_source_record() {
            source_types.push(entity_type);
            // A group normally has one source record type; should a second
            // appear, a discarded outcome dominates and the first type in
            // the fixed order settles the rest
            source_status = match (source_status, outcome.action_status) {
                (Some(ProcessingStatus::Discarded), _) | (_, ProcessingStatus::Discarded) => {
                    Some(ProcessingStatus::Discarded)
                },
                (Some(settled), _) => Some(settled),
                (None, status) => Some(status),
            };
            if outcome.error.is_some() {
                related.push(outcome);
            }
        } else {
            related.push(outcome);
        }
    }
    related.sort_by_key(|e| e.entity_type.as_str());

    let title = resolve_title(&group);
    let error = group
        .iter()
        .rev()
        .find_map(|row| row.error.clone().filter(|e| !e.is_empty()));
    let completed_date = group
        .iter()
        .map(|row| row.action_date)
        .max()
        .unwrap_or_else(Utc::now);
    let source_record_order = group.first().map(|row| row.source_record_order).unwrap_or(0);
    let job_execution_id = group.first().map(|row| row.job_execution_id).unwrap_or_default();

    JobLogEntry {
        job_execution_id,
        source_record_id: source_id,
        source_record_order,
        invoice_line_number: line,
        source_record_title: title,
        source_record_action_status: source_status,
        error,
        related_entities: related,
        source_types,
        completed_date,
    }
}

/// Derive one entity type's status from its rows (already ordered)
fn derive_outcome(entity_type: EntityType, rows: &[&JournalRecord]) -> EntityOutcome {
    let mut entity_ids = Vec::new();
    let mut hrids = Vec::new();
    for row in rows {
        if let Some(id) = row.entity_id.as_deref() {
            if !entity_ids.iter().any(|known| known == id) {
                entity_ids.push(id.to_string());
                hrids.push(row.entity_hrid.clone().unwrap_or_default());
            }
        }
    }

    // Any errored row discards the whole type, latest error text wins
    if let Some(error_row) = rows.iter().rev().find(|r| r.action_status == ActionStatus::Error) {
        return EntityOutcome {
            entity_type,
            action_status: ProcessingStatus::Discarded,
            entity_ids,
            hrids,
            error: error_row.error.clone().or_else(|| Some(String::new())),
        };
    }

    let mut saw_create = false;
    let mut saw_update = false;
    for row in rows {
        match row.action_type {
            // A completed parse is the creation of the stored source record
            ActionType::Create | ActionType::Parse => saw_create = true,
            ActionType::Update | ActionType::Modify => saw_update = true,
            ActionType::Match | ActionType::NonMatch => {},
        }
    }

    let action_status = if !saw_create && !saw_update {
        // Matched (or non-matched) but never acted upon
        ProcessingStatus::Discarded
    } else if entity_type.allows_multiple() && entity_ids.len() > 1 {
        ProcessingStatus::Multiple
    } else if saw_update {
        ProcessingStatus::Updated
    } else {
        ProcessingStatus::Created
    };

    EntityOutcome {
        entity_type,
        action_status,
        entity_ids,
        hrids,
        error: None,
    }
}

/// Group title: the source row's title when present, else a synthesized
/// one from a child entity's human-readable id
fn resolve_title(group: &[&JournalRecord]) -> Option<String> {
    if let Some(title) = group
        .iter()
        .filter(|row| row.entity_type.is_source_record())
        .find_map(|row| row.title.clone())
    {
        return Some(title);
    }
    if let Some(title) = group.iter().find_map(|row| row.title.clone()) {
        return Some(title);
    }
    group
        .iter()
        .find(|row| row.entity_type == EntityType::Holdings)
        .and_then(|row| row.entity_hrid.as_deref())
        .map(|hrid| format!("Holdings {hrid}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(
        source_id: Uuid,
        order: i32,
        entity_type: EntityType,
        action_type: ActionType,
        action_status: ActionStatus,
    ) -> JournalRecord {
        JournalRecord {
            id: Uuid::new_v4(),
            job_execution_id: Uuid::new_v4(),
            source_id,
            source_record_order: order,
            title: None,
            entity_type,
            action_type,
            action_status,
            error: None,
            action_date: Utc::now(),
            entity_id: Some(Uuid::new_v4().to_string()),
            entity_hrid: None,
            instance_id: None,
            holdings_id: None,
            permanent_location_id: None,
            order_id: None,
            tenant_id: "diku".to_string(),
        }
    }

    #[test]
    fn create_then_error_discards_instance() {
        let source = Uuid::new_v4();
        let bib = row(
            source,
            0,
            EntityType::MarcBibliographic,
            ActionType::Create,
            ActionStatus::Completed,
        );
        let mut instance =
            row(source, 0, EntityType::Instance, ActionType::Create, ActionStatus::Error);
        instance.error = Some("instance mapping failed".to_string());

        let entries = reduce(&[bib, instance]);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.source_record_action_status, Some(ProcessingStatus::Created));
        assert_eq!(entry.related_entities.len(), 1);
        assert_eq!(entry.related_entities[0].action_status, ProcessingStatus::Discarded);
        assert_eq!(
            entry.related_entities[0].error.as_deref(),
            Some("instance mapping failed")
        );
    }

    #[test]
    fn reduction_is_order_independent() {
        let source = Uuid::new_v4();
        let mut rows = vec![
            row(source, 3, EntityType::MarcBibliographic, ActionType::Parse, ActionStatus::Completed),
            row(source, 3, EntityType::Instance, ActionType::Create, ActionStatus::Completed),
            row(source, 3, EntityType::Holdings, ActionType::Create, ActionStatus::Completed),
            row(source, 3, EntityType::Item, ActionType::Create, ActionStatus::Error),
        ];
        // Distinct timestamps so internal ordering has something to do
        for (i, r) in rows.iter_mut().enumerate() {
            r.action_date += Duration::seconds(i as i64);
        }

        let baseline = reduce(&rows);
        rows.reverse();
        assert_eq!(reduce(&rows), baseline);
        rows.swap(0, 2);
        assert_eq!(reduce(&rows), baseline);
    }

    #[test]
    fn mixed_source_types_derive_the_same_status_in_any_order() {
        let source = Uuid::new_v4();
        // Two source record types in one group with differing outcomes:
        // EDIFACT precedes MARC_BIBLIOGRAPHIC in the fixed order, so its
        // CREATED settles the summary whichever way the rows arrive
        let mut rows = vec![
            row(source, 0, EntityType::Edifact, ActionType::Parse, ActionStatus::Completed),
            row(
                source,
                0,
                EntityType::MarcBibliographic,
                ActionType::Update,
                ActionStatus::Completed,
            ),
        ];

        let baseline = reduce(&rows);
        assert_eq!(baseline[0].source_record_action_status, Some(ProcessingStatus::Created));
        rows.reverse();
        assert_eq!(reduce(&rows), baseline);

        // A discarded source type dominates regardless of position
        let mut with_error =
            row(source, 0, EntityType::MarcBibliographic, ActionType::Parse, ActionStatus::Error);
        with_error.error = Some("parse failed".to_string());
        let mut rows = vec![
            row(source, 0, EntityType::Edifact, ActionType::Parse, ActionStatus::Completed),
            with_error,
        ];
        let discarded = reduce(&rows);
        assert_eq!(discarded[0].source_record_action_status, Some(ProcessingStatus::Discarded));
        rows.reverse();
        assert_eq!(reduce(&rows), discarded);
    }

    #[test]
    fn match_only_group_is_discarded() {
        let source = Uuid::new_v4();
        let rows = vec![
            row(source, 0, EntityType::Instance, ActionType::Match, ActionStatus::Completed),
            row(source, 0, EntityType::Instance, ActionType::NonMatch, ActionStatus::Completed),
        ];
        let entries = reduce(&rows);
        assert_eq!(entries[0].related_entities[0].action_status, ProcessingStatus::Discarded);
    }

    #[test]
    fn several_holdings_collapse_to_multiple() {
        let source = Uuid::new_v4();
        let rows = vec![
            row(source, 0, EntityType::Holdings, ActionType::Create, ActionStatus::Completed),
            row(source, 0, EntityType::Holdings, ActionType::Create, ActionStatus::Completed),
            row(source, 0, EntityType::Holdings, ActionType::Create, ActionStatus::Completed),
        ];
        let entries = reduce(&rows);
        let holdings = &entries[0].related_entities[0];
        assert_eq!(holdings.action_status, ProcessingStatus::Multiple);
        assert_eq!(holdings.entity_ids.len(), 3);
    }

    #[test]
    fn update_after_create_is_updated() {
        let source = Uuid::new_v4();
        let shared_id = Uuid::new_v4().to_string();
        let mut create =
            row(source, 0, EntityType::Instance, ActionType::Create, ActionStatus::Completed);
        create.entity_id = Some(shared_id.clone());
        let mut update =
            row(source, 0, EntityType::Instance, ActionType::Update, ActionStatus::Completed);
        update.entity_id = Some(shared_id);

        let entries = reduce(&[create, update]);
        assert_eq!(entries[0].related_entities[0].action_status, ProcessingStatus::Updated);
    }

    #[test]
    fn invoice_lines_become_separate_groups() {
        let source = Uuid::new_v4();
        let mut header =
            row(source, 0, EntityType::Invoice, ActionType::Create, ActionStatus::Completed);
        header.entity_hrid = Some("10001".to_string());
        let mut line1 =
            row(source, 0, EntityType::Invoice, ActionType::Create, ActionStatus::Completed);
        line1.entity_hrid = Some("10001-1".to_string());
        let mut line2 =
            row(source, 0, EntityType::Invoice, ActionType::Create, ActionStatus::Completed);
        line2.entity_hrid = Some("10001-2".to_string());

        let entries = reduce(&[line2, header, line1]);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].invoice_line_number, None);
        assert_eq!(entries[1].invoice_line_number, Some(1));
        assert_eq!(entries[2].invoice_line_number, Some(2));
    }

    #[test]
    fn child_only_group_synthesizes_holdings_title() {
        let source = Uuid::new_v4();
        let mut holdings =
            row(source, 0, EntityType::Holdings, ActionType::Create, ActionStatus::Completed);
        holdings.entity_hrid = Some("ho00000001".to_string());

        let entries = reduce(&[holdings]);
        assert_eq!(entries[0].source_record_title.as_deref(), Some("Holdings ho00000001"));
    }

    #[test]
    fn parse_error_discards_source_record() {
        let source = Uuid::new_v4();
        let mut parse =
            row(source, 7, EntityType::MarcBibliographic, ActionType::Parse, ActionStatus::Error);
        parse.error = Some("missing leader".to_string());

        let entries = reduce(&[parse]);
        let entry = &entries[0];
        assert_eq!(entry.source_record_action_status, Some(ProcessingStatus::Discarded));
        assert!(entry.has_error());
        assert_eq!(entry.error.as_deref(), Some("missing leader"));
    }
}

//! Resolved job profile snapshots
//!
//! A snapshot is the frozen tree of matching/action steps a job runs its
//! records through. Resolution from a profile id happens in an external
//! profile service reached through the [`ProfileSnapshotClient`] contract;
//! this module only models the resolved shape the change engine inspects.
//!
//! [`ProfileSnapshotClient`]: crate::storage::ProfileSnapshotClient

use bibflow_common::types::{ActionType, EntityType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of node in a resolved profile tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileNodeType {
    JobProfile,
    MatchProfile,
    ActionProfile,
}

/// Action carried by an ACTION_PROFILE node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAction {
    pub action: ActionType,
    pub target: EntityType,
}

/// One node of the resolved profile tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshotNode {
    pub profile_id: Uuid,
    pub content_type: ProfileNodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ProfileAction>,
    #[serde(default)]
    pub children: Vec<ProfileSnapshotNode>,
}

impl ProfileSnapshotNode {
    /// Whether any node in this subtree performs `action` on `target`
    pub fn performs(&self, action: ActionType, target: EntityType) -> bool {
        if self.action == Some(ProfileAction { action, target }) {
            return true;
        }
        self.children.iter().any(|child| child.performs(action, target))
    }
}

/// A resolved profile snapshot, frozen for the lifetime of one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub id: Uuid,
    pub job_profile_id: Uuid,
    pub root: ProfileSnapshotNode,
}

impl ProfileSnapshot {
    /// Whether this profile would create a brand-new instance for each
    /// incoming bibliographic record
    pub fn creates_instance(&self) -> bool {
        self.root.performs(ActionType::Create, EntityType::Instance)
    }
}

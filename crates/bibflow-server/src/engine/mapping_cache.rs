//! Per-job cache of mapping metadata
//!
//! Downstream conversion needs the mapping rules and mapping parameters
//! that were current when the job started. They are fetched once per job
//! execution from the [`MappingMetadataProvider`] collaborator and reused
//! by every subsequent chunk of the same job.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::storage::{MappingMetadataProvider, StoreResult};

/// Snapshot of mapping metadata frozen for one job execution
#[derive(Debug, Clone)]
pub struct MappingMetadataSnapshot {
    pub job_execution_id: Uuid,
    pub mapping_rules: serde_json::Value,
    pub mapping_parameters: serde_json::Value,
}

/// Memoizing wrapper around a [`MappingMetadataProvider`]
pub struct MappingMetadataCache {
    provider: Arc<dyn MappingMetadataProvider>,
    snapshots: Mutex<HashMap<Uuid, Arc<MappingMetadataSnapshot>>>,
}

impl MappingMetadataCache {
    pub fn new(provider: Arc<dyn MappingMetadataProvider>) -> Self {
        Self {
            provider,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot for a job, fetching from the provider on first use
    pub async fn get_or_fetch(
        &self,
        job_execution_id: Uuid,
        record_type: &str,
        tenant_id: &str,
    ) -> StoreResult<Arc<MappingMetadataSnapshot>> {
        {
            let snapshots = self.snapshots.lock().await;
            if let Some(snapshot) = snapshots.get(&job_execution_id) {
                return Ok(snapshot.clone());
            }
        }

        let mapping_rules = self.provider.mapping_rules(record_type).await?;
        let mapping_parameters = self.provider.mapping_parameters(tenant_id).await?;
        let snapshot = Arc::new(MappingMetadataSnapshot {
            job_execution_id,
            mapping_rules,
            mapping_parameters,
        });

        let mut snapshots = self.snapshots.lock().await;
        // A concurrent chunk of the same job may have fetched in between;
        // the first stored snapshot wins so all chunks see the same one.
        Ok(snapshots
            .entry(job_execution_id)
            .or_insert(snapshot)
            .clone())
    }

    /// Drop the snapshot once a job reaches a terminal state
    pub async fn evict(&self, job_execution_id: Uuid) {
        self.snapshots.lock().await.remove(&job_execution_id);
    }
}

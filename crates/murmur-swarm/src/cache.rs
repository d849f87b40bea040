use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use murmur_core::types::WorkflowId;

use crate::artifact::GraphArtifact;

struct CacheEntry {
    fingerprint: u64,
    artifact: Arc<GraphArtifact>,
}

/// Cache of compiled graph artifacts, at most one live artifact per
/// workflow, guarded by a content fingerprint.
///
/// The cache is the sole owner of every artifact it holds: replacing or
/// evicting an entry releases the outgoing artifact here, never in a
/// consumer. Consumers treat the returned `Arc` as a borrow.
#[derive(Default)]
pub struct ArtifactCache {
    entries: Mutex<HashMap<WorkflowId, CacheEntry>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the live artifact for a workflow. Misses when the workflow
    /// is absent or its stored fingerprint differs — a stale entry stays
    /// in place until `insert` replaces it.
    pub async fn get(
        &self,
        workflow_id: &WorkflowId,
        fingerprint: u64,
    ) -> Option<Arc<GraphArtifact>> {
        let entries = self.entries.lock().await;
        entries.get(workflow_id).and_then(|entry| {
            if entry.fingerprint == fingerprint {
                Some(Arc::clone(&entry.artifact))
            } else {
                debug!(workflow = %workflow_id, "Cached artifact fingerprint is stale");
                None
            }
        })
    }

    /// Store a freshly compiled artifact, taking ownership. Any replaced
    /// entry is released before the new one becomes visible.
    pub async fn insert(&self, fingerprint: u64, artifact: GraphArtifact) -> Arc<GraphArtifact> {
        let workflow_id = artifact.workflow_id().clone();
        let artifact = Arc::new(artifact);

        let replaced = {
            let mut entries = self.entries.lock().await;
            entries.insert(
                workflow_id.clone(),
                CacheEntry {
                    fingerprint,
                    artifact: Arc::clone(&artifact),
                },
            )
        };

        if let Some(old) = replaced {
            info!(workflow = %workflow_id, "Releasing replaced artifact");
            old.artifact.release().await;
        }

        artifact
    }

    /// Drop and release the artifact for a workflow, if cached.
    pub async fn evict(&self, workflow_id: &WorkflowId) -> bool {
        let removed = self.entries.lock().await.remove(workflow_id);
        match removed {
            Some(entry) => {
                info!(workflow = %workflow_id, "Evicting cached artifact");
                entry.artifact.release().await;
                true
            }
            None => false,
        }
    }

    /// Release every cached artifact (process shutdown).
    pub async fn clear(&self) {
        let entries: Vec<CacheEntry> = {
            let mut map = self.entries.lock().await;
            map.drain().map(|(_, entry)| entry).collect()
        };
        for entry in entries {
            entry.artifact.release().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

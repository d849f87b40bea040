use std::collections::HashMap;
use std::sync::RwLock;

use futures::future::BoxFuture;

use crate::error::{MurmurError, Result};
use crate::traits::WorkflowStore;
use crate::types::WorkflowId;
use crate::workflow::{AssistantSpec, WorkflowSpec};

/// In-memory workflow store for tests and standalone tooling.
///
/// The production store lives in the persistence collaborator; this one
/// implements the same `WorkflowStore` contract over a map.
#[derive(Default)]
pub struct MemoryWorkflowStore {
    workflows: RwLock<HashMap<WorkflowId, WorkflowSpec>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, workflow: WorkflowSpec) -> Result<()> {
        self.workflows
            .write()
            .map_err(|e| MurmurError::Build(e.to_string()))?
            .insert(workflow.id.clone(), workflow);
        Ok(())
    }

    pub fn remove(&self, id: &WorkflowId) -> Result<Option<WorkflowSpec>> {
        Ok(self
            .workflows
            .write()
            .map_err(|e| MurmurError::Build(e.to_string()))?
            .remove(id))
    }
}

impl WorkflowStore for MemoryWorkflowStore {
    fn get_workflow(&self, id: &WorkflowId) -> BoxFuture<'_, Result<WorkflowSpec>> {
        let id = id.clone();
        Box::pin(async move {
            self.workflows
                .read()
                .map_err(|e| MurmurError::Build(e.to_string()))?
                .get(&id)
                .cloned()
                .ok_or_else(|| MurmurError::NotFound(format!("Workflow '{}'", id)))
        })
    }

    fn list_enabled_assistants(&self) -> BoxFuture<'_, Result<Vec<AssistantSpec>>> {
        Box::pin(async move {
            let workflows = self
                .workflows
                .read()
                .map_err(|e| MurmurError::Build(e.to_string()))?;
            let mut assistants: Vec<AssistantSpec> = workflows
                .values()
                .flat_map(|wf| wf.nodes.iter())
                .filter(|n| n.assistant.enabled)
                .map(|n| n.assistant.clone())
                .collect();
            assistants.sort_by(|a, b| a.name.cmp(&b.name));
            assistants.dedup_by(|a, b| a.name == b.name);
            Ok(assistants)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::NodeSpec;

    #[tokio::test]
    async fn test_get_workflow_not_found() {
        let store = MemoryWorkflowStore::new();
        let err = store
            .get_workflow(&WorkflowId::from_str("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryWorkflowStore::new();
        let wf = WorkflowSpec::new("support")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start());
        let id = wf.id.clone();
        store.insert(wf).unwrap();

        let loaded = store.get_workflow(&id).await.unwrap();
        assert_eq!(loaded.name, "support");
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryWorkflowStore::new();
        let wf = WorkflowSpec::new("support")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start());
        let id = wf.id.clone();
        store.insert(wf).unwrap();

        assert!(store.remove(&id).unwrap().is_some());
        assert!(store.remove(&id).unwrap().is_none());
        assert!(store.get_workflow(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_list_enabled_assistants_skips_disabled() {
        let store = MemoryWorkflowStore::new();
        let wf = WorkflowSpec::new("support")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_node(NodeSpec::new("b", AssistantSpec::new("B").disabled()));
        store.insert(wf).unwrap();

        let assistants = store.list_enabled_assistants().await.unwrap();
        assert_eq!(assistants.len(), 1);
        assert_eq!(assistants[0].name, "A");
    }
}

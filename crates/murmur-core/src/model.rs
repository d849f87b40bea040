use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A resolved language-model binding: which model an agent's turns run on.
/// Opaque to the compiler beyond identity; the injected `LanguageModel`
/// implementation interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBinding {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ModelBinding {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            params: serde_json::Value::Null,
        }
    }
}

/// Cascading model resolution: assistant > workflow > workspace > default.
///
/// Bindings are registered per scope id by the configuration collaborator;
/// `resolve` walks the cascade and falls back to the environment default.
#[derive(Debug, Clone, Default)]
pub struct ModelResolver {
    assistants: HashMap<String, ModelBinding>,
    workflows: HashMap<String, ModelBinding>,
    workspaces: HashMap<String, ModelBinding>,
    default: Option<ModelBinding>,
}

impl ModelResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, binding: ModelBinding) -> Self {
        self.default = Some(binding);
        self
    }

    pub fn set_assistant(&mut self, assistant_id: impl Into<String>, binding: ModelBinding) {
        self.assistants.insert(assistant_id.into(), binding);
    }

    pub fn set_workflow(&mut self, workflow_id: impl Into<String>, binding: ModelBinding) {
        self.workflows.insert(workflow_id.into(), binding);
    }

    pub fn set_workspace(&mut self, workspace_id: impl Into<String>, binding: ModelBinding) {
        self.workspaces.insert(workspace_id.into(), binding);
    }

    /// Resolve the binding for an assistant in a workflow/workspace context.
    /// Any scope id may be absent; the cascade skips it.
    pub fn resolve(
        &self,
        assistant_id: Option<&str>,
        workflow_id: Option<&str>,
        workspace_id: Option<&str>,
    ) -> Option<ModelBinding> {
        assistant_id
            .and_then(|id| self.assistants.get(id))
            .or_else(|| workflow_id.and_then(|id| self.workflows.get(id)))
            .or_else(|| workspace_id.and_then(|id| self.workspaces.get(id)))
            .or(self.default.as_ref())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(model: &str) -> ModelBinding {
        ModelBinding::new("test", model)
    }

    #[test]
    fn test_cascade_priority() {
        let mut resolver = ModelResolver::new().with_default(binding("default"));
        resolver.set_workspace("ws", binding("workspace"));
        resolver.set_workflow("wf", binding("workflow"));
        resolver.set_assistant("as", binding("assistant"));

        let resolved = resolver.resolve(Some("as"), Some("wf"), Some("ws")).unwrap();
        assert_eq!(resolved.model, "assistant");

        let resolved = resolver.resolve(None, Some("wf"), Some("ws")).unwrap();
        assert_eq!(resolved.model, "workflow");

        let resolved = resolver.resolve(None, None, Some("ws")).unwrap();
        assert_eq!(resolved.model, "workspace");

        let resolved = resolver.resolve(None, None, None).unwrap();
        assert_eq!(resolved.model, "default");
    }

    #[test]
    fn test_unknown_ids_fall_through() {
        let resolver = ModelResolver::new().with_default(binding("default"));
        let resolved = resolver
            .resolve(Some("nope"), Some("nope"), Some("nope"))
            .unwrap();
        assert_eq!(resolved.model, "default");
    }

    #[test]
    fn test_no_default_no_binding() {
        let resolver = ModelResolver::new();
        assert!(resolver.resolve(None, None, None).is_none());
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use murmur_core::error::{MurmurError, Result};
use murmur_core::traits::Tool;
use murmur_core::types::{ToolDefinition, ToolResult};
use murmur_core::workflow::ToolBinding;

/// Registry of available tools.
///
/// The plugin runtime populates it; the compiler resolves each assistant's
/// declared bindings through it at build time.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool.
    pub fn register(&mut self, tool: impl Tool) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Register an already-shared tool.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Unregister a tool by name.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names.
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Resolve an assistant's declared bindings into callable tools.
    /// A binding naming an unregistered tool fails the resolution.
    pub fn resolve_bindings(&self, bindings: &[ToolBinding]) -> Result<Vec<Arc<dyn Tool>>> {
        bindings
            .iter()
            .map(|b| {
                self.get(&b.name)
                    .ok_or_else(|| MurmurError::ToolNotFound(b.name.clone()))
            })
            .collect()
    }

    /// Get tool definitions for sending to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name, enforcing its timeout.
    pub async fn execute(&self, name: &str, input: serde_json::Value) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| MurmurError::ToolNotFound(name.to_string()))?;

        execute_tool(&tool, input).await
    }
}

/// Execute a resolved tool, enforcing its timeout.
pub async fn execute_tool(tool: &Arc<dyn Tool>, input: serde_json::Value) -> Result<ToolResult> {
    let timeout = std::time::Duration::from_secs(tool.timeout_secs());

    match tokio::time::timeout(timeout, tool.execute(input)).await {
        Ok(result) => result,
        Err(_) => Err(MurmurError::ToolTimeout {
            tool: tool.name().to_string(),
            timeout_secs: tool.timeout_secs(),
        }),
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;

    struct EchoTool;

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input text back."
        }

        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }

        fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
            Box::pin(async move {
                let text = input
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                Ok(ToolResult::success(text.to_string()))
            })
        }
    }

    struct SlowTool;

    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Never finishes in time."
        }

        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object" })
        }

        fn execute(&self, _input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
            Box::pin(async move {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok(ToolResult::success("done"))
            })
        }

        fn timeout_secs(&self) -> u64 {
            0
        }
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let result = registry
            .execute("echo", serde_json::json!({ "text": "hi" }))
            .await
            .unwrap();
        assert_eq!(result.content, "hi");
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("nope", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_timeout_enforced() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowTool);

        let err = registry
            .execute("slow", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::ToolTimeout { .. }));
    }

    #[test]
    fn test_resolve_bindings() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let resolved = registry
            .resolve_bindings(&[ToolBinding::new("echo")])
            .unwrap();
        assert_eq!(resolved.len(), 1);

        let err = registry
            .resolve_bindings(&[ToolBinding::new("echo"), ToolBinding::new("ghost")])
            .unwrap_err();
        assert!(matches!(err, MurmurError::ToolNotFound(_)));
    }

    #[test]
    fn test_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }
}

use futures::future::BoxFuture;

use crate::error::Result;
use crate::model::ModelBinding;
use crate::types::*;
use crate::workflow::{AssistantSpec, WorkflowSpec};

/// Language model — one complete reply per call. Vendor integration is
/// injected behind this trait and out of scope here.
pub trait LanguageModel: Send + Sync + 'static {
    fn chat(
        &self,
        binding: &ModelBinding,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> BoxFuture<'_, Result<AgentReply>>;
}

/// Tool — extensible tool execution.
pub trait Tool: Send + Sync + 'static {
    /// Tool name (used in model tool calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for tool input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with given input.
    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>>;

    /// Timeout in seconds for this tool.
    fn timeout_secs(&self) -> u64 {
        30
    }

    /// Release any connection or session this tool holds. Called by the
    /// owning resource scope when the compiled graph is released.
    fn release(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("name", &self.name()).finish()
    }
}

/// Workflow persistence collaborator. Records are read-only to the compiler.
pub trait WorkflowStore: Send + Sync + 'static {
    fn get_workflow(&self, id: &WorkflowId) -> BoxFuture<'_, Result<WorkflowSpec>>;

    fn list_enabled_assistants(&self) -> BoxFuture<'_, Result<Vec<AssistantSpec>>>;
}

/// Checkpoint store — durable swarm state keyed by thread id.
///
/// The store is the durability and isolation boundary between threads:
/// a save is all-or-nothing for the invocation being committed.
pub trait Checkpointer: Send + Sync + 'static {
    fn save(&self, thread: &ThreadId, state: &SwarmState) -> BoxFuture<'_, Result<()>>;

    fn load(&self, thread: &ThreadId) -> BoxFuture<'_, Result<Option<SwarmState>>>;

    fn delete(&self, thread: &ThreadId) -> BoxFuture<'_, Result<()>>;
}

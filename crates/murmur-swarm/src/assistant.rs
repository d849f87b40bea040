use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use murmur_core::error::{MurmurError, Result};
use murmur_core::model::ModelBinding;
use murmur_core::traits::{LanguageModel, Tool};
use murmur_core::types::{ChatMessage, ToolDefinition, ToolResult};
use murmur_core::workflow::AssistantSpec;
use murmur_tools::{execute_tool, ToolRegistry};

use crate::handoff::HandoffTool;
use crate::scope::ResourceScope;

/// How a single agent turn ended.
///
/// Ordinary tool calls loop *inside* the turn and return control to the
/// same agent; only a handoff tool call moves routing authority. A turn
/// emits at most one handoff — the first transfer call in a reply wins and
/// ends the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The turn produced a final answer without transferring control.
    Final,
    /// The turn emitted a control-transfer directive.
    Handoff { target_ix: usize, target: String },
}

/// A compiled, tool-bound agent instance: one per workflow node.
///
/// Created by a compile, destroyed when the owning graph artifact is
/// released.
pub struct RuntimeAssistant {
    pub name: String,
    pub description: String,
    instructions: String,
    binding: ModelBinding,
    model: Arc<dyn LanguageModel>,
    tools: Vec<Arc<dyn Tool>>,
    handoffs: Vec<HandoffTool>,
    /// Reachable agent names, mirroring this agent's adjacency entry.
    pub destinations: Vec<String>,
    tool_defs: Vec<ToolDefinition>,
    max_tool_rounds: usize,
}

impl RuntimeAssistant {
    /// Exposed tool definitions: ordinary tools first, then handoffs in
    /// adjacency order.
    pub fn tool_definitions(&self) -> &[ToolDefinition] {
        &self.tool_defs
    }

    pub fn handoff_tools(&self) -> &[HandoffTool] {
        &self.handoffs
    }

    fn handoff(&self, tool_name: &str) -> Option<&HandoffTool> {
        self.handoffs.iter().find(|h| h.name == tool_name)
    }

    fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    fn system_message(&self) -> ChatMessage {
        let mut text = if self.instructions.is_empty() {
            format!("You are the '{}' agent.", self.name)
        } else {
            self.instructions.clone()
        };
        if !self.destinations.is_empty() {
            text.push_str(
                "\n\nWhen a request belongs to another agent, call the matching transfer tool \
                 instead of answering yourself.",
            );
        }
        ChatMessage::system(text)
    }

    /// Run one agent turn over the shared conversation.
    ///
    /// Returns the messages this turn produced (assistant replies and tool
    /// results, in order) together with the turn's outcome. Ordinary tool
    /// failures are reported back to the model as error results; model
    /// failures propagate and are handled by the containment boundary.
    pub async fn take_turn(
        &self,
        history: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<(Vec<ChatMessage>, TurnOutcome)> {
        let mut produced: Vec<ChatMessage> = Vec::new();

        for round in 0..self.max_tool_rounds {
            if cancel.is_cancelled() {
                return Err(MurmurError::Cancelled);
            }

            let mut messages = Vec::with_capacity(1 + history.len() + produced.len());
            messages.push(self.system_message());
            messages.extend_from_slice(history);
            messages.extend_from_slice(&produced);

            debug!(agent = %self.name, round, "Requesting model reply");

            let reply = tokio::select! {
                reply = self.model.chat(&self.binding, messages, &self.tool_defs) => reply?,
                _ = cancel.cancelled() => return Err(MurmurError::Cancelled),
            };

            let assistant_msg = ChatMessage {
                role: murmur_core::types::Role::Assistant,
                content: reply.content.clone(),
                agent: Some(self.name.clone()),
                timestamp: Some(chrono::Utc::now()),
            };
            produced.push(assistant_msg);

            let tool_uses: Vec<(String, String, serde_json::Value)> = reply
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            if tool_uses.is_empty() {
                return Ok((produced, TurnOutcome::Final));
            }

            // The first handoff call wins; remaining tool calls in the
            // reply are not executed and the turn ends with the transfer.
            if let Some((id, handoff)) = tool_uses
                .iter()
                .find_map(|(id, name, _)| self.handoff(name).map(|h| (id, h)))
            {
                info!(
                    agent = %self.name,
                    target = %handoff.target,
                    "Agent emitted handoff directive"
                );
                produced.push(ChatMessage::tool_result(
                    id.clone(),
                    format!("Control transferred to '{}'.", handoff.target),
                    false,
                ));
                return Ok((
                    produced,
                    TurnOutcome::Handoff {
                        target_ix: handoff.target_ix,
                        target: handoff.target.clone(),
                    },
                ));
            }

            for (id, name, input) in tool_uses {
                if cancel.is_cancelled() {
                    return Err(MurmurError::Cancelled);
                }

                let result = match self.tool(&name) {
                    Some(tool) => match execute_tool(tool, input).await {
                        Ok(r) => r,
                        Err(e) => {
                            error!(agent = %self.name, tool = %name, error = %e, "Tool execution failed");
                            ToolResult::error(e.to_string())
                        }
                    },
                    None => ToolResult::error(format!("Tool not found: {}", name)),
                };
                produced.push(ChatMessage::tool_result(id, result.content, result.is_error));
            }
        }

        Err(MurmurError::Execution(format!(
            "Agent '{}' exceeded {} tool rounds in one turn",
            self.name, self.max_tool_rounds
        )))
    }
}

/// Builds one runtime assistant per workflow node at compile time.
pub(crate) struct AssistantFactory<'a> {
    pub registry: &'a ToolRegistry,
    pub model: Arc<dyn LanguageModel>,
    pub max_tool_rounds: usize,
}

impl AssistantFactory<'_> {
    /// Construct the runtime assistant for one node.
    ///
    /// Tool loading is resource-acquiring: each resolved tool registers its
    /// release with `scope` so the whole build unwinds together. A
    /// destination that does not resolve to a routable assistant fails
    /// loudly here.
    pub fn build(
        &self,
        spec: &AssistantSpec,
        binding: ModelBinding,
        destinations: &[String],
        index: &HashMap<String, usize>,
        descriptions: &HashMap<String, String>,
        scope: &ResourceScope,
    ) -> Result<RuntimeAssistant> {
        let tools = self.registry.resolve_bindings(&spec.tools).map_err(|e| {
            MurmurError::Build(format!(
                "Tool acquisition failed for assistant '{}': {}",
                spec.name, e
            ))
        })?;

        for tool in &tools {
            let tool = Arc::clone(tool);
            let label = format!("{}/{}", spec.name, tool.name());
            scope.register(label.clone(), move || {
                Box::pin(async move {
                    if let Err(e) = tool.release().await {
                        error!(resource = %label, error = %e, "Tool release failed");
                    }
                })
            });
        }

        let mut handoffs = Vec::with_capacity(destinations.len());
        for target in destinations {
            let target_ix = *index.get(target).ok_or_else(|| {
                MurmurError::Configuration(format!(
                    "Handoff destination '{}' is not a routable assistant",
                    target
                ))
            })?;
            let description = descriptions.get(target).map(String::as_str).unwrap_or("");
            handoffs.push(HandoffTool::new(target.clone(), target_ix, description));
        }

        let mut tool_defs: Vec<ToolDefinition> = tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        tool_defs.extend(handoffs.iter().map(HandoffTool::definition));

        debug!(
            agent = %spec.name,
            tools = tools.len(),
            handoffs = handoffs.len(),
            "Built runtime assistant"
        );

        Ok(RuntimeAssistant {
            name: spec.name.clone(),
            description: spec.description.clone(),
            instructions: spec.instructions.clone(),
            binding,
            model: Arc::clone(&self.model),
            tools,
            handoffs,
            destinations: destinations.to_vec(),
            tool_defs,
            max_tool_rounds: self.max_tool_rounds,
        })
    }
}

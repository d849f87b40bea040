use murmur_core::types::ToolDefinition;
use murmur_core::workflow::normalize_name;

/// Fixed prefix for handoff tool names, so the model can select a transfer
/// unambiguously among ordinary tools.
pub const HANDOFF_PREFIX: &str = "transfer_to_";

/// A control-transfer action exposed to exactly one source agent.
///
/// Invoking it never runs application code: the swarm executor intercepts
/// the call, appends the turn's produced message, and moves routing
/// authority to the target. The target is resolved to an agent index at
/// compile time, so an unknown name is rejected at build rather than at
/// call time.
#[derive(Debug, Clone)]
pub struct HandoffTool {
    /// Deterministic tool name: prefix plus the normalized target name.
    pub name: String,
    /// Target agent name as it appears in the adjacency map.
    pub target: String,
    /// Index of the target's runtime assistant within the compiled swarm.
    pub target_ix: usize,
    description: String,
}

impl HandoffTool {
    pub fn new(target: impl Into<String>, target_ix: usize, target_description: &str) -> Self {
        let target = target.into();
        let name = format!("{}{}", HANDOFF_PREFIX, normalize_name(&target));
        let description = if target_description.is_empty() {
            format!("Transfer the conversation to the '{}' agent.", target)
        } else {
            format!(
                "Transfer the conversation to the '{}' agent. {}",
                target, target_description
            )
        };
        Self {
            name,
            target,
            target_ix,
            description,
        }
    }

    /// Tool definition for sending to the model. Takes no arguments.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_name() {
        let tool = HandoffTool::new("Billing Support", 2, "");
        assert_eq!(tool.name, "transfer_to_billing_support");
        assert_eq!(tool.target, "Billing Support");
        assert_eq!(tool.target_ix, 2);
    }

    #[test]
    fn test_description_includes_target() {
        let tool = HandoffTool::new("Refunds", 0, "Handles refund requests.");
        let def = tool.definition();
        assert!(def.description.contains("Refunds"));
        assert!(def.description.contains("Handles refund requests."));
    }

    #[test]
    fn test_definition_takes_no_arguments() {
        let def = HandoffTool::new("Billing", 1, "").definition();
        assert_eq!(def.input_schema["properties"], serde_json::json!({}));
    }
}

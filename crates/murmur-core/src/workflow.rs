use serde::{Deserialize, Serialize};

use crate::error::{MurmurError, Result};
use crate::types::WorkflowId;

/// A declared tool capability on an assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolBinding {
    /// Tool name as registered with the tool runtime.
    pub name: String,
    /// Per-binding configuration, opaque to the compiler.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl ToolBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: serde_json::Value::Null,
        }
    }
}

/// An assistant definition referenced by workflow nodes.
///
/// Owned by the assistant-configuration collaborator; the compiler reads it
/// and never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSpec {
    /// Name, unique within a workflow after normalization.
    pub name: String,
    /// Shown to peer agents in handoff tool descriptions.
    #[serde(default)]
    pub description: String,
    /// System instructions for this assistant's turns.
    #[serde(default)]
    pub instructions: String,
    /// Declared tool bindings resolved by the tool runtime at compile time.
    #[serde(default)]
    pub tools: Vec<ToolBinding>,
    /// Disabled assistants are not routable.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AssistantSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions: String::new(),
            tools: vec![],
            enabled: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolBinding>) -> Self {
        self.tools = tools;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A node in a workflow: a unique name bound to an assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique node name within the workflow.
    pub name: String,
    /// The assistant this node executes as.
    pub assistant: AssistantSpec,
    /// At most one node carries the start flag.
    #[serde(default)]
    pub is_start: bool,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, assistant: AssistantSpec) -> Self {
        Self {
            name: name.into(),
            assistant,
            is_start: false,
        }
    }

    pub fn start(mut self) -> Self {
        self.is_start = true;
        self
    }
}

/// A directed edge permitting a handoff between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Source node name.
    pub source: String,
    /// Target node name.
    pub target: String,
    /// Whether the permission also applies target -> source.
    #[serde(default)]
    pub bidirectional: bool,
}

impl EdgeSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            bidirectional: false,
        }
    }

    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }
}

/// A persisted workflow: a directed graph of named agent nodes and
/// permitted handoff edges. Read-only to the compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub id: WorkflowId,
    pub name: String,
    /// Explicit start node name; overrides node start flags when set.
    #[serde(default)]
    pub start_node_name: Option<String>,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

impl WorkflowSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::new(),
            name: name.into(),
            start_node_name: None,
            nodes: vec![],
            edges: vec![],
        }
    }

    pub fn with_start(mut self, node_name: impl Into<String>) -> Self {
        self.start_node_name = Some(node_name.into());
        self
    }

    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: EdgeSpec) -> Self {
        self.edges.push(edge);
        self
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Resolve the start node: the explicit `start_node_name` when set
    /// (it must name exactly one node), otherwise the unique node carrying
    /// the start flag.
    pub fn resolve_start(&self) -> Result<&NodeSpec> {
        if let Some(ref name) = self.start_node_name {
            return self.node(name).ok_or_else(|| {
                MurmurError::Validation(format!(
                    "Start node '{}' not present in workflow '{}'",
                    name, self.name
                ))
            });
        }

        let mut flagged = self.nodes.iter().filter(|n| n.is_start);
        match (flagged.next(), flagged.next()) {
            (Some(node), None) => Ok(node),
            (Some(a), Some(b)) => Err(MurmurError::Validation(format!(
                "Workflow '{}' has multiple start nodes ('{}', '{}')",
                self.name, a.name, b.name
            ))),
            (None, _) => Err(MurmurError::Validation(format!(
                "Workflow '{}' has no start node",
                self.name
            ))),
        }
    }
}

/// Normalize an assistant name for use in tool names and uniqueness checks:
/// lowercase, runs of non-alphanumeric characters collapsed to `_`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_sep = true;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

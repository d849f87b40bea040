use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use murmur_core::config::SwarmConfig;
use murmur_core::error::{MurmurError, Result};
use murmur_core::model::{ModelBinding, ModelResolver};
use murmur_core::traits::{Checkpointer, LanguageModel};
use murmur_core::workflow::{normalize_name, WorkflowSpec};
use murmur_tools::ToolRegistry;

use crate::adjacency::{routing_destinations, AdjacencyOptions};
use crate::artifact::GraphArtifact;
use crate::assistant::AssistantFactory;
use crate::executor::Swarm;
use crate::scope::ResourceScope;

/// Compiles a workflow spec into an executable graph artifact.
///
/// The model client and tool registry are shared across compiles; each
/// compile owns its own resource scope, so multiple workflows may be
/// compiled concurrently.
pub struct SwarmCompiler {
    model: Arc<dyn LanguageModel>,
    registry: Arc<ToolRegistry>,
    resolver: ModelResolver,
    config: SwarmConfig,
}

impl SwarmCompiler {
    pub fn new(model: Arc<dyn LanguageModel>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            registry,
            resolver: ModelResolver::new(),
            config: SwarmConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SwarmConfig) -> Self {
        self.config = config;
        self
    }

    /// Per-assistant/workflow model overrides; the binding passed to
    /// `compile` remains the fallback.
    pub fn with_resolver(mut self, resolver: ModelResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Compile a workflow into a graph artifact, or fail with the whole
    /// build rolled back.
    pub async fn compile(
        &self,
        workflow: &WorkflowSpec,
        binding: &ModelBinding,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Result<GraphArtifact> {
        self.compile_with_cancel(workflow, binding, checkpointer, CancellationToken::new())
            .await
    }

    /// `compile` with caller-controlled abort. An aborted build releases
    /// its partially-acquired resources through the same path as a failed
    /// one.
    pub async fn compile_with_cancel(
        &self,
        workflow: &WorkflowSpec,
        binding: &ModelBinding,
        checkpointer: Arc<dyn Checkpointer>,
        cancel: CancellationToken,
    ) -> Result<GraphArtifact> {
        // Step 1: the workflow must have a resolvable, routable start node.
        let start_node = workflow.resolve_start()?;
        if !start_node.assistant.enabled {
            return Err(MurmurError::Validation(format!(
                "Start node '{}' binds disabled assistant '{}'",
                start_node.name, start_node.assistant.name
            )));
        }
        validate_unique_names(workflow)?;

        // Step 2: strict routing map — dangling handoffs fail the build.
        let adjacency = routing_destinations(
            workflow,
            AdjacencyOptions {
                include_self_loops: false,
                honor_bidirectional: true,
            },
        )?;

        // Compile-time lookup table: agent name -> index in compile order.
        let routable: Vec<_> = workflow
            .nodes
            .iter()
            .filter(|n| n.assistant.enabled)
            .collect();
        let index: HashMap<String, usize> = routable
            .iter()
            .enumerate()
            .map(|(ix, node)| (node.assistant.name.clone(), ix))
            .collect();
        let descriptions: HashMap<String, String> = routable
            .iter()
            .map(|node| {
                (
                    node.assistant.name.clone(),
                    node.assistant.description.clone(),
                )
            })
            .collect();
        let start_ix = index[start_node.assistant.name.as_str()];

        // Step 3: construct every runtime assistant inside one scope.
        let scope = ResourceScope::new();
        let factory = AssistantFactory {
            registry: &self.registry,
            model: Arc::clone(&self.model),
            max_tool_rounds: self.config.max_tool_rounds,
        };

        let mut assistants = Vec::with_capacity(routable.len());
        for node in &routable {
            if cancel.is_cancelled() {
                scope.release().await;
                return Err(MurmurError::Cancelled);
            }

            let spec = &node.assistant;
            let resolved = self
                .resolver
                .resolve(Some(&spec.name), Some(&workflow.id.0), None)
                .unwrap_or_else(|| binding.clone());
            let destinations = adjacency
                .get(&spec.name)
                .map(Vec::as_slice)
                .unwrap_or_default();

            match factory.build(spec, resolved, destinations, &index, &descriptions, &scope) {
                Ok(assistant) => assistants.push(assistant),
                Err(e) => {
                    debug!(agent = %spec.name, error = %e, "Assistant construction failed, rolling back");
                    scope.release().await;
                    return Err(e);
                }
            }
        }

        // Steps 4-6: assemble the swarm and attach the checkpoint store.
        let swarm = Swarm::new(assistants, index, start_ix, self.config.clone());

        info!(
            workflow = %workflow.id,
            agents = routable.len(),
            start = %start_node.assistant.name,
            "Compiled workflow into swarm"
        );

        Ok(GraphArtifact::new(
            workflow.id.clone(),
            swarm,
            checkpointer,
            scope,
        ))
    }
}

/// Assistant names must stay unique after normalization, or handoff tool
/// names would collide.
fn validate_unique_names(workflow: &WorkflowSpec) -> Result<()> {
    let mut seen: HashSet<String> = HashSet::new();
    for node in workflow.nodes.iter().filter(|n| n.assistant.enabled) {
        let normalized = normalize_name(&node.assistant.name);
        if !seen.insert(normalized.clone()) {
            return Err(MurmurError::Validation(format!(
                "Assistant name '{}' collides after normalization ('{}')",
                node.assistant.name, normalized
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use murmur_core::types::{AgentReply, ChatMessage, ToolDefinition};
    use murmur_core::workflow::{AssistantSpec, EdgeSpec, NodeSpec};

    use crate::checkpoint::MemoryCheckpointer;

    struct SilentModel;

    impl LanguageModel for SilentModel {
        fn chat(
            &self,
            _binding: &ModelBinding,
            _messages: Vec<ChatMessage>,
            _tools: &[ToolDefinition],
        ) -> BoxFuture<'_, murmur_core::error::Result<AgentReply>> {
            Box::pin(async { Ok(AgentReply::text("ok")) })
        }
    }

    fn compiler() -> SwarmCompiler {
        SwarmCompiler::new(Arc::new(SilentModel), Arc::new(ToolRegistry::new()))
    }

    fn binding() -> ModelBinding {
        ModelBinding::new("test", "model")
    }

    #[tokio::test]
    async fn test_compile_simple_graph() {
        let wf = WorkflowSpec::new("support")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_node(NodeSpec::new("b", AssistantSpec::new("B")))
            .with_edge(EdgeSpec::new("a", "b"));

        let artifact = compiler()
            .compile(&wf, &binding(), Arc::new(MemoryCheckpointer::new()))
            .await
            .unwrap();

        assert_eq!(artifact.start_agent(), "A");
        assert_eq!(artifact.agent_names(), vec!["A", "B"]);
        assert_eq!(artifact.destinations("A").unwrap(), ["B"]);
        assert!(artifact.destinations("B").unwrap().is_empty());
        artifact.release().await;
    }

    #[tokio::test]
    async fn test_compile_no_start_node() {
        let wf = WorkflowSpec::new("nostart")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")));

        let err = compiler()
            .compile(&wf, &binding(), Arc::new(MemoryCheckpointer::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::Validation(_)));
    }

    #[tokio::test]
    async fn test_compile_disabled_start() {
        let wf = WorkflowSpec::new("disabled")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A").disabled()).start());

        let err = compiler()
            .compile(&wf, &binding(), Arc::new(MemoryCheckpointer::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::Validation(_)));
    }

    #[tokio::test]
    async fn test_compile_disabled_destination_named() {
        let wf = WorkflowSpec::new("support")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_node(NodeSpec::new("b", AssistantSpec::new("B").disabled()))
            .with_edge(EdgeSpec::new("a", "b"));

        let err = compiler()
            .compile(&wf, &binding(), Arc::new(MemoryCheckpointer::new()))
            .await
            .unwrap_err();
        match err {
            MurmurError::Configuration(msg) => assert!(msg.contains("B")),
            other => panic!("expected Configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_compile_name_collision() {
        let wf = WorkflowSpec::new("collide")
            .with_node(NodeSpec::new("a", AssistantSpec::new("Billing Support")).start())
            .with_node(NodeSpec::new("b", AssistantSpec::new("billing support")));

        let err = compiler()
            .compile(&wf, &binding(), Arc::new(MemoryCheckpointer::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::Validation(_)));
    }

    #[tokio::test]
    async fn test_compile_cancelled_before_build() {
        let wf = WorkflowSpec::new("support")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = compiler()
            .compile_with_cancel(&wf, &binding(), Arc::new(MemoryCheckpointer::new()), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::Cancelled));
    }

    #[tokio::test]
    async fn test_compile_deterministic() {
        let wf = WorkflowSpec::new("support")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_node(NodeSpec::new("b", AssistantSpec::new("B")))
            .with_node(NodeSpec::new("c", AssistantSpec::new("C")))
            .with_edge(EdgeSpec::new("a", "c"))
            .with_edge(EdgeSpec::new("a", "b"));

        let first = compiler()
            .compile(&wf, &binding(), Arc::new(MemoryCheckpointer::new()))
            .await
            .unwrap();
        let second = compiler()
            .compile(&wf, &binding(), Arc::new(MemoryCheckpointer::new()))
            .await
            .unwrap();

        assert_eq!(first.start_agent(), second.start_agent());
        assert_eq!(first.destinations("A"), second.destinations("A"));
        // Destinations come out sorted regardless of edge order.
        assert_eq!(first.destinations("A").unwrap(), ["B", "C"]);

        first.release().await;
        second.release().await;
    }
}

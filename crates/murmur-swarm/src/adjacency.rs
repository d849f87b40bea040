use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use murmur_core::error::{MurmurError, Result};
use murmur_core::traits::WorkflowStore;
use murmur_core::types::WorkflowId;
use murmur_core::workflow::WorkflowSpec;

/// Routing map: agent name to the sorted, deduplicated set of agent names
/// it may hand control to. Derived from a workflow, never persisted.
pub type AdjacencyMap = BTreeMap<String, Vec<String>>;

/// Flags controlling adjacency derivation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AdjacencyOptions {
    /// Keep edges whose source and target resolve to the same agent.
    pub include_self_loops: bool,
    /// Mirror edges marked bidirectional.
    pub honor_bidirectional: bool,
}

/// Node name -> assistant name, for nodes whose assistant is enabled.
fn routable_lookup(workflow: &WorkflowSpec) -> HashMap<&str, &str> {
    workflow
        .nodes
        .iter()
        .filter(|n| n.assistant.enabled)
        .map(|n| (n.name.as_str(), n.assistant.name.as_str()))
        .collect()
}

/// Derive the adjacency map for a loaded workflow.
///
/// Edges with an endpoint that does not resolve to an enabled assistant are
/// skipped rather than failing the build — the destination is simply not a
/// routable agent. Output order is deterministic: keys and value lists are
/// sorted, so tool ordering is reproducible across builds of the same graph.
pub fn build_adjacency_from(workflow: &WorkflowSpec, options: AdjacencyOptions) -> AdjacencyMap {
    let lookup = routable_lookup(workflow);

    let mut reachable: BTreeMap<&str, BTreeSet<&str>> = lookup
        .values()
        .map(|agent| (*agent, BTreeSet::new()))
        .collect();

    for edge in &workflow.edges {
        let (source, target) = match (
            lookup.get(edge.source.as_str()),
            lookup.get(edge.target.as_str()),
        ) {
            (Some(s), Some(t)) => (*s, *t),
            _ => {
                debug!(
                    source = %edge.source,
                    target = %edge.target,
                    "Skipping edge with unroutable endpoint"
                );
                continue;
            }
        };

        if source != target || options.include_self_loops {
            if let Some(set) = reachable.get_mut(source) {
                set.insert(target);
            }
        }

        if options.honor_bidirectional
            && edge.bidirectional
            && (source != target || options.include_self_loops)
        {
            if let Some(set) = reachable.get_mut(target) {
                set.insert(source);
            }
        }
    }

    reachable
        .into_iter()
        .map(|(agent, set)| {
            (
                agent.to_string(),
                set.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

/// Load a workflow from the store and derive its adjacency map.
///
/// The only failure mode is `NotFound` for an unknown workflow id;
/// malformed edges degrade by omission. Usable independently of the
/// compiler for visualization and validation tooling.
pub async fn build_adjacency(
    store: &dyn WorkflowStore,
    workflow_id: &WorkflowId,
    options: AdjacencyOptions,
) -> Result<AdjacencyMap> {
    let workflow = store.get_workflow(workflow_id).await?;
    Ok(build_adjacency_from(&workflow, options))
}

/// Strict routing map for compilation.
///
/// Unlike `build_adjacency_from`, an edge endpoint that does not resolve to
/// a routable agent fails loudly here: a dangling handoff would be silently
/// unusable at run time. Edges from non-routable sources are ignored (no
/// agent is built for them); edges *to* non-routable targets are errors.
pub fn routing_destinations(
    workflow: &WorkflowSpec,
    options: AdjacencyOptions,
) -> Result<AdjacencyMap> {
    let lookup = routable_lookup(workflow);

    let mut reachable: BTreeMap<&str, BTreeSet<&str>> = lookup
        .values()
        .map(|agent| (*agent, BTreeSet::new()))
        .collect();

    for edge in &workflow.edges {
        let source_node = workflow.node(&edge.source).ok_or_else(|| {
            MurmurError::Validation(format!(
                "Edge references unknown node '{}' in workflow '{}'",
                edge.source, workflow.name
            ))
        })?;
        let target_node = workflow.node(&edge.target).ok_or_else(|| {
            MurmurError::Validation(format!(
                "Edge references unknown node '{}' in workflow '{}'",
                edge.target, workflow.name
            ))
        })?;

        let mut directions = vec![(source_node, target_node)];
        if options.honor_bidirectional && edge.bidirectional {
            directions.push((target_node, source_node));
        }

        for (from, to) in directions {
            if !from.assistant.enabled {
                continue;
            }
            if !to.assistant.enabled {
                return Err(MurmurError::Configuration(format!(
                    "Handoff destination '{}' is not a routable assistant (disabled)",
                    to.assistant.name
                )));
            }
            if from.assistant.name == to.assistant.name && !options.include_self_loops {
                continue;
            }
            if let Some(set) = reachable.get_mut(from.assistant.name.as_str()) {
                set.insert(to.assistant.name.as_str());
            }
        }
    }

    Ok(reachable
        .into_iter()
        .map(|(agent, set)| {
            (
                agent.to_string(),
                set.into_iter().map(str::to_string).collect(),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::workflow::{AssistantSpec, EdgeSpec, NodeSpec};

    fn workflow() -> WorkflowSpec {
        WorkflowSpec::new("support")
            .with_node(NodeSpec::new("triage", AssistantSpec::new("Triage")).start())
            .with_node(NodeSpec::new("billing", AssistantSpec::new("Billing")))
            .with_node(NodeSpec::new("refunds", AssistantSpec::new("Refunds")))
            .with_edge(EdgeSpec::new("triage", "billing"))
            .with_edge(EdgeSpec::new("triage", "refunds").bidirectional())
    }

    #[test]
    fn test_basic_adjacency() {
        let map = build_adjacency_from(&workflow(), AdjacencyOptions::default());
        assert_eq!(map["Triage"], vec!["Billing", "Refunds"]);
        assert!(map["Billing"].is_empty());
        assert!(map["Refunds"].is_empty());
    }

    #[test]
    fn test_bidirectional_honored() {
        let map = build_adjacency_from(
            &workflow(),
            AdjacencyOptions {
                honor_bidirectional: true,
                ..Default::default()
            },
        );
        assert_eq!(map["Refunds"], vec!["Triage"]);
        // Non-bidirectional edge stays one-way
        assert!(map["Billing"].is_empty());
    }

    #[test]
    fn test_self_loop_policy() {
        let wf = WorkflowSpec::new("loop")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_edge(EdgeSpec::new("a", "a"));

        let without = build_adjacency_from(&wf, AdjacencyOptions::default());
        assert!(without["A"].is_empty());

        let with = build_adjacency_from(
            &wf,
            AdjacencyOptions {
                include_self_loops: true,
                ..Default::default()
            },
        );
        assert_eq!(with["A"], vec!["A"]);
    }

    #[test]
    fn test_disabled_assistant_edge_skipped() {
        let wf = WorkflowSpec::new("partial")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_node(NodeSpec::new("b", AssistantSpec::new("B").disabled()))
            .with_edge(EdgeSpec::new("a", "b"));

        let map = build_adjacency_from(&wf, AdjacencyOptions::default());
        assert!(map["A"].is_empty());
        assert!(!map.contains_key("B"));
    }

    #[test]
    fn test_dangling_edge_skipped() {
        let wf = WorkflowSpec::new("dangling")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_edge(EdgeSpec::new("a", "ghost"));

        let map = build_adjacency_from(&wf, AdjacencyOptions::default());
        assert!(map["A"].is_empty());
    }

    #[test]
    fn test_duplicate_edges_deduplicated() {
        let wf = WorkflowSpec::new("dup")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_node(NodeSpec::new("b", AssistantSpec::new("B")))
            .with_edge(EdgeSpec::new("a", "b"))
            .with_edge(EdgeSpec::new("a", "b"));

        let map = build_adjacency_from(&wf, AdjacencyOptions::default());
        assert_eq!(map["A"], vec!["B"]);
    }

    #[test]
    fn test_idempotent() {
        let wf = workflow();
        let opts = AdjacencyOptions {
            honor_bidirectional: true,
            include_self_loops: false,
        };
        assert_eq!(
            build_adjacency_from(&wf, opts),
            build_adjacency_from(&wf, opts)
        );
    }

    #[test]
    fn test_domain_closure() {
        // No key or value outside the workflow's enabled assistants.
        let wf = workflow();
        let map = build_adjacency_from(
            &wf,
            AdjacencyOptions {
                honor_bidirectional: true,
                include_self_loops: true,
            },
        );
        let enabled: Vec<&str> = wf
            .nodes
            .iter()
            .filter(|n| n.assistant.enabled)
            .map(|n| n.assistant.name.as_str())
            .collect();

        for (key, values) in &map {
            assert!(enabled.contains(&key.as_str()));
            for v in values {
                assert!(enabled.contains(&v.as_str()));
            }
        }
    }

    #[test]
    fn test_routing_destinations_disabled_target_fails() {
        let wf = WorkflowSpec::new("strict")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_node(NodeSpec::new("b", AssistantSpec::new("B").disabled()))
            .with_edge(EdgeSpec::new("a", "b"));

        let err = routing_destinations(&wf, AdjacencyOptions::default()).unwrap_err();
        match err {
            MurmurError::Configuration(msg) => assert!(msg.contains("B")),
            other => panic!("expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_routing_destinations_unknown_node_fails() {
        let wf = WorkflowSpec::new("strict")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_edge(EdgeSpec::new("a", "ghost"));

        let err = routing_destinations(&wf, AdjacencyOptions::default()).unwrap_err();
        assert!(matches!(err, MurmurError::Validation(_)));
    }

    #[test]
    fn test_routing_destinations_disabled_source_ignored() {
        let wf = WorkflowSpec::new("strict")
            .with_node(NodeSpec::new("a", AssistantSpec::new("A")).start())
            .with_node(NodeSpec::new("b", AssistantSpec::new("B").disabled()))
            .with_edge(EdgeSpec::new("b", "a"));

        let map = routing_destinations(&wf, AdjacencyOptions::default()).unwrap();
        assert!(map["A"].is_empty());
        assert!(!map.contains_key("B"));
    }
}

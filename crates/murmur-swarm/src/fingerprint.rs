use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use murmur_core::workflow::WorkflowSpec;

/// Content fingerprint of a workflow for cache invalidation.
///
/// Participating fields: workflow name and start node, per-node name /
/// start flag / bound assistant name, per-edge (source, target,
/// bidirectional), and for each bound assistant its name, description,
/// instructions, enabled flag, and tool bindings. The workflow *id* is the
/// cache key and deliberately not part of the fingerprint.
///
/// serde_json serializes map keys in sorted order (BTreeMap-backed), so the
/// canonical form is stable for equal content. The hash is only compared
/// in-process; cross-process stability is not required.
pub fn fingerprint(workflow: &WorkflowSpec) -> u64 {
    let canonical = serde_json::json!({
        "name": workflow.name,
        "start_node_name": workflow.start_node_name,
        "nodes": workflow.nodes.iter().map(|n| {
            serde_json::json!({
                "name": n.name,
                "is_start": n.is_start,
                "assistant": {
                    "name": n.assistant.name,
                    "description": n.assistant.description,
                    "instructions": n.assistant.instructions,
                    "enabled": n.assistant.enabled,
                    "tools": n.assistant.tools.iter().map(|t| {
                        serde_json::json!({ "name": t.name, "config": t.config })
                    }).collect::<Vec<_>>(),
                },
            })
        }).collect::<Vec<_>>(),
        "edges": workflow.edges.iter().map(|e| {
            serde_json::json!({
                "source": e.source,
                "target": e.target,
                "bidirectional": e.bidirectional,
            })
        }).collect::<Vec<_>>(),
    });

    let mut hasher = DefaultHasher::new();
    canonical.to_string().hash(&mut hasher);
    hasher.finish()
}

//! Workflow-to-swarm compiler and runtime.
//!
//! A workflow is a persisted directed graph of named agent nodes and
//! permitted handoff edges. [`SwarmCompiler`] turns one into a
//! [`GraphArtifact`]: a compiled state machine of [`RuntimeAssistant`]s
//! that transfer control to one another through handoff tools, wrapped in
//! a failure-containment boundary and backed by a checkpoint store for
//! durable per-thread conversation state.
//!
//! The artifact owns every resource its build acquired through a
//! [`ResourceScope`]; `release()` unwinds them in reverse acquisition
//! order. [`ArtifactCache`] keeps at most one live artifact per workflow,
//! keyed by content [`fingerprint`], and releases what it replaces or
//! evicts.

pub mod adjacency;
pub mod artifact;
pub mod assistant;
pub mod cache;
pub mod checkpoint;
pub mod compiler;
pub mod executor;
pub mod fingerprint;
pub mod handoff;
pub mod scope;

pub use adjacency::{build_adjacency, build_adjacency_from, AdjacencyMap, AdjacencyOptions};
pub use artifact::GraphArtifact;
pub use assistant::{RuntimeAssistant, TurnOutcome};
pub use cache::ArtifactCache;
pub use checkpoint::{MemoryCheckpointer, SqliteCheckpointer};
pub use compiler::SwarmCompiler;
pub use executor::{Swarm, DEGRADED_MARKER};
pub use fingerprint::fingerprint;
pub use handoff::{HandoffTool, HANDOFF_PREFIX};
pub use scope::ResourceScope;

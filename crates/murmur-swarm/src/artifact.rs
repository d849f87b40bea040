use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use murmur_core::error::{MurmurError, Result};
use murmur_core::traits::Checkpointer;
use murmur_core::types::{ChatMessage, SwarmState, ThreadId, WorkflowId};

use crate::executor::Swarm;
use crate::scope::ResourceScope;

/// The single handle a caller owns for one successful compile: the compiled
/// swarm, its checkpoint store, and the scoped resource group that owns
/// everything the build acquired.
///
/// Ownership is never shared. The owner (typically the artifact cache)
/// calls `release` exactly once when done; release is idempotent and
/// unconditional.
pub struct GraphArtifact {
    workflow_id: WorkflowId,
    swarm: Swarm,
    checkpointer: Arc<dyn Checkpointer>,
    scope: ResourceScope,
    active_threads: Mutex<HashSet<ThreadId>>,
    released: AtomicBool,
}

/// Removes the thread from the active set when an invocation ends,
/// including on early return.
struct ThreadGuard<'a> {
    threads: &'a Mutex<HashSet<ThreadId>>,
    thread: ThreadId,
}

impl Drop for ThreadGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut threads) = self.threads.lock() {
            threads.remove(&self.thread);
        }
    }
}

impl std::fmt::Debug for GraphArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphArtifact")
            .field("workflow_id", &self.workflow_id)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl GraphArtifact {
    pub(crate) fn new(
        workflow_id: WorkflowId,
        swarm: Swarm,
        checkpointer: Arc<dyn Checkpointer>,
        scope: ResourceScope,
    ) -> Self {
        Self {
            workflow_id,
            swarm,
            checkpointer,
            scope,
            active_threads: Mutex::new(HashSet::new()),
            released: AtomicBool::new(false),
        }
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// Name of the designated start agent.
    pub fn start_agent(&self) -> &str {
        self.swarm.start_agent()
    }

    /// Agent names in compile order.
    pub fn agent_names(&self) -> Vec<&str> {
        self.swarm.agent_names()
    }

    /// Reachable agent names for one agent, for introspection/debugging.
    pub fn destinations(&self, agent: &str) -> Option<&[String]> {
        self.swarm.agent(agent).map(|a| a.destinations.as_slice())
    }

    /// Drive the swarm for one conversation turn sequence.
    pub async fn invoke(&self, thread: &ThreadId, input: Vec<ChatMessage>) -> Result<SwarmState> {
        self.invoke_with_cancel(thread, input, CancellationToken::new())
            .await
    }

    /// `invoke` with caller-controlled cancellation. On cancellation the
    /// thread's checkpoint is untouched — the turn's effects are fully
    /// committed or fully absent.
    pub async fn invoke_with_cancel(
        &self,
        thread: &ThreadId,
        input: Vec<ChatMessage>,
        cancel: CancellationToken,
    ) -> Result<SwarmState> {
        if self.released.load(Ordering::SeqCst) {
            return Err(MurmurError::Execution(
                "Invoked a released graph artifact".into(),
            ));
        }

        // Concurrent turns on the same thread id are rejected, not queued.
        let _guard = {
            let mut threads = self
                .active_threads
                .lock()
                .map_err(|e| MurmurError::Execution(e.to_string()))?;
            if !threads.insert(thread.clone()) {
                return Err(MurmurError::ThreadBusy(thread.to_string()));
            }
            ThreadGuard {
                threads: &self.active_threads,
                thread: thread.clone(),
            }
        };

        let mut state = self
            .checkpointer
            .load(thread)
            .await?
            .unwrap_or_else(|| SwarmState::new(self.swarm.start_agent()));

        let history_limit = self.swarm.config().history_limit;
        if state.messages.len() > history_limit {
            let excess = state.messages.len() - history_limit;
            state.messages.drain(..excess);
        }

        state.messages.extend(input);

        self.swarm.run(&mut state, &cancel).await?;

        self.checkpointer.save(thread, &state).await?;
        Ok(state)
    }

    /// Unwind the scoped resource group in reverse acquisition order.
    /// Safe to call multiple times; must run even if the artifact was never
    /// invoked.
    pub async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(workflow = %self.workflow_id, "Releasing graph artifact");
        if let Ok(threads) = self.active_threads.lock() {
            if !threads.is_empty() {
                warn!(
                    workflow = %self.workflow_id,
                    active = threads.len(),
                    "Releasing artifact with invocations still in flight"
                );
            }
        }
        self.scope.release().await;
    }
}

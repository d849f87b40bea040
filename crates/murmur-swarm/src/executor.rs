use std::collections::HashMap;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use murmur_core::config::SwarmConfig;
use murmur_core::error::{MurmurError, Result};
use murmur_core::types::{ChatMessage, SwarmState};

use crate::assistant::{RuntimeAssistant, TurnOutcome};

/// Marker prepended to the synthetic message the containment boundary
/// appends when an invocation degrades.
pub const DEGRADED_MARKER: &str = "[swarm degraded]";

/// The compiled state machine: states are runtime assistants, transitions
/// are the handoff directives emitted during execution. There is no
/// enumerated terminal state — a turn that answers without invoking a
/// handoff tool ends the swarm's portion of that invocation.
pub struct Swarm {
    assistants: Vec<RuntimeAssistant>,
    index: HashMap<String, usize>,
    start_ix: usize,
    config: SwarmConfig,
}

impl Swarm {
    pub(crate) fn new(
        assistants: Vec<RuntimeAssistant>,
        index: HashMap<String, usize>,
        start_ix: usize,
        config: SwarmConfig,
    ) -> Self {
        Self {
            assistants,
            index,
            start_ix,
            config,
        }
    }

    /// Name of the designated start agent.
    pub fn start_agent(&self) -> &str {
        &self.assistants[self.start_ix].name
    }

    /// Agent names in compile order.
    pub fn agent_names(&self) -> Vec<&str> {
        self.assistants.iter().map(|a| a.name.as_str()).collect()
    }

    /// Look up an agent for introspection.
    pub fn agent(&self, name: &str) -> Option<&RuntimeAssistant> {
        self.index.get(name).map(|ix| &self.assistants[*ix])
    }

    pub(crate) fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Drive the swarm for one invocation, inside the containment boundary.
    ///
    /// Any uncaught failure from an agent turn (including a panic)
    /// transitions the invocation to degraded: one synthetic final message
    /// is appended and the invocation returns normally. There is no way
    /// back to running within the same invocation. Cancellation is the
    /// exception — it propagates so the caller's checkpoint stays untouched.
    pub(crate) async fn run(
        &self,
        state: &mut SwarmState,
        cancel: &CancellationToken,
    ) -> Result<()> {
        state.degraded = false;
        state.handoffs = 0;

        let mut active_ix = match self.index.get(&state.active_agent) {
            Some(ix) => *ix,
            None => {
                // Checkpoint from an older graph revision; restart routing
                // at the start agent but keep the conversation.
                warn!(
                    agent = %state.active_agent,
                    start = %self.start_agent(),
                    "Checkpointed agent no longer in graph, resuming at start agent"
                );
                state.active_agent = self.start_agent().to_string();
                self.start_ix
            }
        };

        loop {
            if state.handoffs >= self.config.max_handoffs {
                self.degrade(
                    state,
                    &MurmurError::Execution(format!(
                        "Handoff limit of {} exceeded",
                        self.config.max_handoffs
                    )),
                );
                return Ok(());
            }

            let assistant = &self.assistants[active_ix];
            debug!(agent = %assistant.name, handoffs = state.handoffs, "Starting agent turn");

            let turn = std::panic::AssertUnwindSafe(assistant.take_turn(&state.messages, cancel))
                .catch_unwind()
                .await;

            match turn {
                Err(_) => {
                    let err =
                        MurmurError::Execution(format!("Agent '{}' turn panicked", assistant.name));
                    self.degrade(state, &err);
                    return Ok(());
                }
                Ok(Err(MurmurError::Cancelled)) => return Err(MurmurError::Cancelled),
                Ok(Err(e)) => {
                    self.degrade(state, &e);
                    return Ok(());
                }
                Ok(Ok((produced, outcome))) => {
                    state.messages.extend(produced);
                    match outcome {
                        TurnOutcome::Final => {
                            debug!(agent = %assistant.name, "Turn produced final answer");
                            return Ok(());
                        }
                        TurnOutcome::Handoff { target_ix, target } => {
                            info!(
                                from = %assistant.name,
                                to = %target,
                                "Applying handoff directive"
                            );
                            state.handoffs += 1;
                            state.active_agent = target;
                            active_ix = target_ix;
                        }
                    }
                }
            }
        }
    }

    /// Boundary transition running -> degraded: append one synthetic final
    /// message with a category label, never raw internal detail.
    fn degrade(&self, state: &mut SwarmState, err: &MurmurError) {
        error!(
            agent = %state.active_agent,
            category = err.category(),
            error = %err,
            "Swarm execution degraded"
        );
        state.degraded = true;
        state.messages.push(ChatMessage::assistant_text(
            state.active_agent.clone(),
            format!("{} {}: {}", DEGRADED_MARKER, err.category(), err),
        ));
    }
}

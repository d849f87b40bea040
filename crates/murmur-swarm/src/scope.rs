use std::sync::Mutex;

use futures::future::BoxFuture;
use tracing::{debug, warn};

type ReleaseFn = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Scoped resource group: everything a compile acquires registers its
/// release here, and the group unwinds in reverse acquisition order.
///
/// `release` is idempotent — releasers are taken out of the scope before
/// running, so a second call finds nothing to do. The owning
/// `GraphArtifact` (or a failed build) calls it exactly once per resource.
#[derive(Default)]
pub struct ResourceScope {
    releasers: Mutex<Vec<(String, ReleaseFn)>>,
}

impl ResourceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource's release action under a diagnostic label.
    pub fn register<F>(&self, label: impl Into<String>, release: F)
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        let label = label.into();
        match self.releasers.lock() {
            Ok(mut releasers) => releasers.push((label, Box::new(release))),
            Err(_) => warn!(resource = %label, "Resource scope poisoned, release not registered"),
        }
    }

    /// Number of resources still held.
    pub fn len(&self) -> usize {
        self.releasers.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release all held resources in reverse acquisition order.
    pub async fn release(&self) {
        let taken: Vec<(String, ReleaseFn)> = match self.releasers.lock() {
            Ok(mut releasers) => releasers.drain(..).collect(),
            Err(_) => {
                warn!("Resource scope poisoned, skipping release");
                return;
            }
        };

        for (label, release) in taken.into_iter().rev() {
            debug!(resource = %label, "Releasing scoped resource");
            release().await;
        }
    }
}

//! Registry for fire-and-forget tasks spawned while answering messages.
//!
//! Delivery log appends run here so a slow disk never delays a reply, and
//! shutdown can still wait for them to land.

// std::sync::Mutex is correct here, the lock is never held across .await points.
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Tracks spawned background tasks so they can be awaited on shutdown.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task and register its handle before returning.
    pub fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);

        let mut guard = self.handles.lock().expect("mutex poisoned");
        guard.retain(|h| !h.is_finished());
        guard.push(handle);
    }

    /// Wait for every registered task to complete.
    pub async fn shutdown(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock().expect("mutex poisoned"));
        if handles.is_empty() {
            return;
        }

        info!(count = handles.len(), "Waiting for background tasks to complete");
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background task panicked");
            }
        }
    }

    /// Number of tasks that have not finished yet.
    pub fn pending_count(&self) -> usize {
        let mut guard = self.handles.lock().expect("mutex poisoned");
        guard.retain(|h| !h.is_finished());
        guard.len()
    }
}

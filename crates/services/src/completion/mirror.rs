use std::sync::Arc;

use prepare_core::model::UserId;
use serde_json::Value;
use storage::repository::RemoteDocumentStore;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::CompletionConfig;

/// A reachable remote store plus the document path of the signed-in user.
#[derive(Clone)]
pub struct RemoteTarget {
    store: Arc<dyn RemoteDocumentStore>,
    path: String,
}

impl RemoteTarget {
    /// Resolve the remote capability once at startup.
    ///
    /// Returns `None` when there is no signed-in session or the store reports
    /// itself unavailable; callers then run local-only.
    #[must_use]
    pub fn resolve(
        store: Arc<dyn RemoteDocumentStore>,
        session: Option<&UserId>,
        config: &CompletionConfig,
    ) -> Option<Self> {
        let user = session?;
        if !store.is_available() {
            return None;
        }
        Some(Self {
            store,
            path: config.remote_path(user),
        })
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn store(&self) -> &dyn RemoteDocumentStore {
        self.store.as_ref()
    }
}

/// Latest snapshot waiting for the mirror task, tagged with its sequence number.
type Pending = Option<(u64, Value)>;

/// Fire-and-forget writer that copies snapshots to the remote document.
///
/// Every snapshot is a full-document overwrite, so only the newest one
/// matters: a snapshot enqueued while a write is in flight replaces any
/// snapshot still waiting, and the task always finishes on the latest state.
/// Each snapshot gets one attempt.
#[derive(Clone)]
pub struct RemoteMirror {
    pending: Arc<watch::Sender<Pending>>,
    attempted: watch::Receiver<u64>,
}

impl RemoteMirror {
    /// Start the mirror task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(target: RemoteTarget) -> Self {
        let (pending, rx) = watch::channel(None);
        let (attempted_tx, attempted) = watch::channel(0);
        tokio::spawn(run(target, rx, attempted_tx));
        Self {
            pending: Arc::new(pending),
            attempted,
        }
    }

    /// Replace the pending snapshot. Returns `false` if the mirror task has stopped.
    pub fn enqueue(&self, snapshot: Value) -> bool {
        if self.pending.is_closed() {
            warn!("remote mirror stopped; dropping snapshot");
            return false;
        }
        self.pending.send_modify(|slot| {
            let seq = slot.as_ref().map_or(0, |(seq, _)| *seq) + 1;
            *slot = Some((seq, snapshot));
        });
        true
    }

    /// Wait until the latest snapshot enqueued before this call has been attempted.
    pub async fn flush(&self) {
        let target = self.pending.borrow().as_ref().map_or(0, |(seq, _)| *seq);
        let mut attempted = self.attempted.clone();
        let _ = attempted.wait_for(|done| *done >= target).await;
    }
}

async fn run(
    target: RemoteTarget,
    mut pending: watch::Receiver<Pending>,
    attempted: watch::Sender<u64>,
) {
    while pending.changed().await.is_ok() {
        let latest = pending.borrow_and_update().clone();
        let Some((seq, snapshot)) = latest else {
            continue;
        };
        match target.store().write(target.path(), &snapshot).await {
            Ok(()) => debug!(path = target.path(), seq, "mirrored completion state"),
            Err(err) => {
                warn!(path = target.path(), seq, error = %err, "remote mirror write failed");
            }
        }
        attempted.send_replace(seq);
    }
}

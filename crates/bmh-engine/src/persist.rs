//! Best-effort persistence: a background task that writes snapshots to a
//! [`SnapshotStore`] without ever blocking or failing the caller.
//!
//! Only the newest unsaved snapshot is held. A slow store delays writes but
//! never lets queued state pile up.

use std::sync::Arc;

use bmh_core::{snapshot::Snapshot, store::SnapshotStore};
use tokio::sync::watch;
use tracing::{debug, warn};

/// The latest snapshot handed over, tagged with its position in mutation order.
#[derive(Clone, Default)]
struct Pending {
  seq:      u64,
  snapshot: Option<Arc<Snapshot>>,
}

/// Handle to the writer task. The task exits once every handle is dropped.
#[derive(Clone)]
pub(crate) struct Persister {
  pending: Arc<watch::Sender<Pending>>,
  /// Sequence number of the last snapshot the writer finished with.
  saved:   watch::Receiver<u64>,
}

impl Persister {
  pub fn spawn<S>(store: Arc<S>) -> Self
  where
    S: SnapshotStore + 'static,
  {
    let (pending, pending_rx) = watch::channel(Pending::default());
    let (saved_tx, saved) = watch::channel(0);
    tokio::spawn(run(store, pending_rx, saved_tx));
    Self { pending: Arc::new(pending), saved }
  }

  /// Replace any unsaved snapshot with `snapshot`. Never blocks.
  pub fn enqueue(&self, snapshot: Snapshot) {
    self.pending.send_modify(|p| {
      p.seq += 1;
      p.snapshot = Some(Arc::new(snapshot));
    });
  }

  /// Wait until every snapshot handed over so far has been written (or failed).
  pub async fn flush(&self) {
    let target = self.pending.borrow().seq;
    let mut saved = self.saved.clone();
    if saved.wait_for(|done| *done >= target).await.is_err() {
      warn!("snapshot writer has stopped; flush abandoned");
    }
  }
}

async fn run<S>(
  store: Arc<S>,
  mut pending: watch::Receiver<Pending>,
  saved: watch::Sender<u64>,
) where
  S: SnapshotStore + 'static,
{
  while pending.changed().await.is_ok() {
    let Pending { seq, snapshot } = pending.borrow_and_update().clone();

    if let Some(snapshot) = snapshot {
      match store.save(&snapshot).await {
        Ok(()) => debug!(
          seq,
          bookings = snapshot.bookings.len(),
          events = snapshot.global_history.len(),
          "snapshot saved"
        ),
        Err(e) => warn!(seq, error = %e, "failed to save snapshot"),
      }
    }

    saved.send_replace(seq);
  }
}

/// Read the stored snapshot, falling back to an empty one on any failure.
pub(crate) async fn load_or_empty<S: SnapshotStore>(store: &S) -> Snapshot {
  match store.load().await {
    Ok(snapshot) => snapshot,
    Err(e) => {
      warn!(error = %e, "failed to load stored state; starting empty");
      Snapshot::default()
    }
  }
}

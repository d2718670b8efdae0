//! [`Engine`], the single synchronisation boundary around the ledger.

use std::sync::Arc;

use bmh_core::{
  Result,
  booking::{Booking, BookingStatus, LifecycleEvent, NewBooking},
  dispatch::Assignment,
  ledger::{BookingFilter, Ledger, Stats},
  lifecycle::Actor,
  provider::ProviderDirectory,
  snapshot::Snapshot,
  store::SnapshotStore,
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::persist::{Persister, load_or_empty};

/// Shared handle to the booking ledger.
///
/// Cloning is cheap; all clones see the same ledger. Every mutating method
/// takes the ledger lock for its whole duration and queues a snapshot before
/// releasing it, so the writer always holds the newest state.
#[derive(Clone)]
pub struct Engine {
  ledger:    Arc<Mutex<Ledger>>,
  directory: Arc<ProviderDirectory>,
  persister: Persister,
}

impl Engine {
  /// Restore the ledger from `store` and start the snapshot writer.
  ///
  /// A store that cannot be read yields an empty ledger.
  pub async fn open<S>(store: Arc<S>, directory: ProviderDirectory) -> Self
  where
    S: SnapshotStore + 'static,
  {
    let snapshot = load_or_empty(store.as_ref()).await;
    info!(
      bookings = snapshot.bookings.len(),
      events = snapshot.global_history.len(),
      "ledger restored"
    );

    Self {
      ledger:    Arc::new(Mutex::new(Ledger::from_snapshot(snapshot))),
      directory: Arc::new(directory),
      persister: Persister::spawn(store),
    }
  }

  pub fn directory(&self) -> &ProviderDirectory { &self.directory }

  // ── Commands ──────────────────────────────────────────────────────────────

  pub async fn create_booking(&self, input: NewBooking) -> Booking {
    let mut ledger = self.ledger.lock().await;
    let booking = ledger.create_booking(input, Utc::now());
    self.persister.enqueue(ledger.snapshot());

    info!(booking_id = %booking.id, service = %booking.service_type, "booking created");
    booking
  }

  /// Record a status change requested by `actor`. Fails only when `id` is
  /// unknown.
  pub async fn transition(
    &self,
    id: Uuid,
    to: BookingStatus,
    actor: Actor,
  ) -> Result<Booking> {
    let mut ledger = self.ledger.lock().await;
    let booking = ledger.transition(id, to, &actor, Utc::now())?;
    self.persister.enqueue(ledger.snapshot());

    info!(booking_id = %id, status = %to, actor = actor.label(), "status changed");
    Ok(booking)
  }

  /// Drop every booking and the whole audit log.
  pub async fn clear_all(&self) {
    let mut ledger = self.ledger.lock().await;
    let dropped = ledger.bookings().len();
    ledger.clear();
    self.persister.enqueue(ledger.snapshot());

    info!(dropped, "ledger cleared");
  }

  /// One auto-dispatch pass at `now`.
  pub async fn dispatch_tick(&self, now: DateTime<Utc>) -> Vec<Assignment> {
    let mut ledger = self.ledger.lock().await;
    let assignments = ledger.dispatch(&self.directory, now);
    if assignments.is_empty() {
      return assignments;
    }
    self.persister.enqueue(ledger.snapshot());
    drop(ledger);

    for a in &assignments {
      info!(
        booking_id = %a.booking_id,
        provider_id = %a.provider_id,
        attempt = a.attempt,
        tier = ?a.tier,
        "auto-assigned"
      );
    }
    assignments
  }

  /// Wait for queued snapshots to be written.
  pub async fn flush(&self) { self.persister.flush().await; }

  // ── Queries ───────────────────────────────────────────────────────────────

  pub async fn bookings(&self, filter: &BookingFilter) -> Vec<Booking> {
    self.ledger.lock().await.view(filter)
  }

  pub async fn booking(&self, id: Uuid) -> Option<Booking> {
    self.ledger.lock().await.get(id).cloned()
  }

  /// The global audit log, newest first.
  pub async fn audit_log(&self) -> Vec<LifecycleEvent> {
    self.ledger.lock().await.audit().to_vec()
  }

  pub async fn stats(&self) -> Stats { self.ledger.lock().await.stats() }

  pub async fn snapshot(&self) -> Snapshot { self.ledger.lock().await.snapshot() }
}

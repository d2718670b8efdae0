//! The `SnapshotStore` trait: a single durable slot holding the ledger.
//!
//! Implemented by storage backends (e.g. `bmh-store-sqlite`). The engine
//! depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::snapshot::Snapshot;

/// A durable home for one [`Snapshot`].
///
/// `load` should already tolerate malformed stored content (see
/// [`Snapshot::decode`]); errors are reserved for the backend itself failing.
/// Callers treat both methods as best-effort.
pub trait SnapshotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the slot. An absent slot yields an empty snapshot.
  fn load(&self) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + '_;

  /// Overwrite the slot with `snapshot`.
  fn save<'a>(
    &'a self,
    snapshot: &'a Snapshot,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

//! [`Ledger`]: the in-memory booking store together with the audit log.
//!
//! The ledger is the only place bookings are mutated. Every mutation goes
//! through [`crate::lifecycle`] and appends its event to both the booking's
//! history and the audit log. Callers that share a ledger between tasks must
//! serialise access to it themselves (see `bmh-engine`).

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  audit::AuditLog,
  booking::{Booking, BookingStatus, LifecycleEvent, NewBooking},
  dispatch::{self, Assignment},
  lifecycle::{self, Actor},
  provider::ProviderDirectory,
  snapshot::Snapshot,
};

// ─── Views ───────────────────────────────────────────────────────────────────

/// Which bookings a reader wants to see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BookingFilter {
  #[default]
  All,
  /// Open `PENDING` bookings plus those assigned to this provider.
  ForProvider(String),
}

impl BookingFilter {
  pub fn matches(&self, booking: &Booking) -> bool {
    match self {
      Self::All => true,
      Self::ForProvider(id) => {
        booking.status == BookingStatus::Pending
          || booking.provider_id.as_deref() == Some(id.as_str())
      }
    }
  }
}

/// Aggregate counts for the operations dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
  pub total:    usize,
  /// Bookings not yet `COMPLETED` or `CANCELLED`.
  pub active:   usize,
  pub rejected: usize,
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Ledger {
  /// Newest first.
  bookings:   Vec<Booking>,
  audit:      AuditLog,
  /// Timestamp of the most recent event, used to keep event times strictly
  /// increasing.
  last_stamp: Option<DateTime<Utc>>,
}

impl Ledger {
  pub fn new() -> Self { Self::default() }

  pub fn from_snapshot(snapshot: Snapshot) -> Self {
    let audit = AuditLog::from_newest_first(snapshot.global_history);
    let last_stamp = audit
      .iter()
      .chain(snapshot.bookings.iter().flat_map(|b| b.history.iter()))
      .map(|e| e.timestamp)
      .max();
    Self { bookings: snapshot.bookings, audit, last_stamp }
  }

  pub fn snapshot(&self) -> Snapshot {
    Snapshot {
      bookings:       self.bookings.clone(),
      global_history: self.audit.to_vec(),
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn bookings(&self) -> &[Booking] { &self.bookings }

  pub fn get(&self, id: Uuid) -> Option<&Booking> {
    self.bookings.iter().find(|b| b.id == id)
  }

  pub fn view(&self, filter: &BookingFilter) -> Vec<Booking> {
    self
      .bookings
      .iter()
      .filter(|b| filter.matches(b))
      .cloned()
      .collect()
  }

  pub fn audit(&self) -> &AuditLog { &self.audit }

  pub fn stats(&self) -> Stats {
    Stats {
      total:    self.bookings.len(),
      active:   self.bookings.iter().filter(|b| !b.status.is_terminal()).count(),
      rejected: self
        .bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Rejected)
        .count(),
    }
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  /// Create a booking and place it at the front of the list.
  pub fn create_booking(&mut self, input: NewBooking, now: DateTime<Utc>) -> Booking {
    let at = self.stamp(now);
    let booking = lifecycle::create(Uuid::new_v4(), input, at);
    self.audit.record(booking.history[0].clone());
    self.bookings.insert(0, booking.clone());
    booking
  }

  /// Apply a manual status change to the booking with `id`.
  pub fn transition(
    &mut self,
    id: Uuid,
    to: BookingStatus,
    actor: &Actor,
    now: DateTime<Utc>,
  ) -> Result<Booking> {
    let index = self.position(id)?;
    let at = self.stamp(now);
    let (next, event) = lifecycle::transition(&self.bookings[index], to, actor, at);
    Ok(self.commit(index, next, event))
  }

  /// Run one dispatch pass over every booking, in list order.
  ///
  /// Each assignment gets its own stamp, so within one pass the k-th assigned
  /// booking's `last_retry_at` is `now` plus k milliseconds (k from zero).
  /// This keeps event timestamps strictly increasing.
  pub fn dispatch(
    &mut self,
    directory: &ProviderDirectory,
    now: DateTime<Utc>,
  ) -> Vec<Assignment> {
    let mut assignments = Vec::new();
    for index in 0..self.bookings.len() {
      if !self.bookings[index].awaiting_dispatch() {
        continue;
      }
      let at = self.stamp(now);
      if let Some((next, event, assignment)) =
        dispatch::attempt(&self.bookings[index], directory, at)
      {
        self.commit(index, next, event);
        assignments.push(assignment);
      }
    }
    assignments
  }

  /// Drop every booking and every audit entry.
  pub fn clear(&mut self) {
    self.bookings.clear();
    self.audit.clear();
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  fn position(&self, id: Uuid) -> Result<usize> {
    self
      .bookings
      .iter()
      .position(|b| b.id == id)
      .ok_or(Error::BookingNotFound(id))
  }

  fn commit(&mut self, index: usize, next: Booking, event: LifecycleEvent) -> Booking {
    self.audit.record(event);
    self.bookings[index] = next.clone();
    next
  }

  /// Millisecond-precision timestamp strictly after every earlier event.
  fn stamp(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(3);
    let at = match self.last_stamp {
      Some(last) if now <= last => last + Duration::milliseconds(1),
      _ => now,
    };
    self.last_stamp = Some(at);
    at
  }
}

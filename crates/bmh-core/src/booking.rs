//! Booking records and the lifecycle events that describe them.
//!
//! A booking's `status` only ever changes through [`crate::lifecycle`]; every
//! change leaves a [`LifecycleEvent`] in the booking's own `history` and in the
//! global [`crate::audit::AuditLog`].

use std::{fmt, str::FromStr};

use chrono::{
  DateTime, Utc,
  serde::{ts_milliseconds, ts_milliseconds_option},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::dispatch::RETRY_CAP;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a booking currently sits in its lifecycle.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
  Pending,
  Assigned,
  InProgress,
  Completed,
  Cancelled,
  Rejected,
}

impl BookingStatus {
  /// `COMPLETED` and `CANCELLED` end ordinary use of a booking. Administrative
  /// overrides can still move a booking out of them.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Cancelled)
  }

  /// Statuses the auto-dispatcher scans for.
  pub fn awaits_dispatch(self) -> bool {
    matches!(self, Self::Pending | Self::Rejected)
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// One recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
  pub id:          Uuid,
  #[serde(with = "ts_milliseconds")]
  pub timestamp:   DateTime<Utc>,
  pub booking_id:  Uuid,
  /// `None` only for the synthetic creation event; serialised as `"START"`.
  #[serde(with = "start_or_status")]
  pub from_status: Option<BookingStatus>,
  pub to_status:   BookingStatus,
  /// Customer name, provider name, `"Admin"` or `"System"`.
  pub actor:       String,
  pub notes:       String,
}

impl fmt::Display for LifecycleEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.from_status {
      Some(from) => write!(f, "{}: {from} -> {}", self.actor, self.to_status),
      None => write!(f, "{}: START -> {}", self.actor, self.to_status),
    }
  }
}

mod start_or_status {
  use super::*;

  const START: &str = "START";

  pub fn serialize<S: Serializer>(
    value: &Option<BookingStatus>,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    match value {
      Some(status) => status.serialize(serializer),
      None => serializer.serialize_str(START),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Option<BookingStatus>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if raw == START {
      return Ok(None);
    }
    BookingStatus::from_str(&raw)
      .map(Some)
      .map_err(|_| serde::de::Error::custom(format!("unknown status {raw:?}")))
  }
}

// ─── Booking ─────────────────────────────────────────────────────────────────

/// A single service request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
  pub id:            Uuid,
  pub customer_name: String,
  /// Free-text service description, e.g. "Leaky faucet".
  pub service_type:  String,
  pub address:       String,
  pub status:        BookingStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub provider_id:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub provider_name: Option<String>,
  #[serde(with = "ts_milliseconds")]
  pub created_at:    DateTime<Utc>,
  /// Automatic assignment attempts so far. Only the dispatcher increments it
  /// and nothing resets it.
  #[serde(default)]
  pub retry_count:   u32,
  #[serde(default, with = "ts_milliseconds_option")]
  pub last_retry_at: Option<DateTime<Utc>>,
  pub history:       Vec<LifecycleEvent>,
}

impl Booking {
  /// Attempts the dispatcher may still make for this booking.
  pub fn retries_remaining(&self) -> u32 {
    RETRY_CAP.saturating_sub(self.retry_count)
  }

  /// Whether the dispatcher would pick this booking up on its next tick.
  pub fn awaiting_dispatch(&self) -> bool {
    self.status.awaits_dispatch() && self.retries_remaining() > 0
  }

  /// `true` if the history is non-empty, strictly ordered in time, belongs to
  /// this booking and ends in the current status.
  pub fn is_well_formed(&self) -> bool {
    let Some(last) = self.history.last() else {
      return false;
    };
    last.to_status == self.status
      && self.history.iter().all(|e| e.booking_id == self.id)
      && self
        .history
        .windows(2)
        .all(|pair| pair[0].timestamp < pair[1].timestamp)
  }
}

/// Input to [`crate::lifecycle::create`]. Identity and timestamps are assigned
/// by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
  pub customer_name: String,
  pub service_type:  String,
  pub address:       String,
}

impl NewBooking {
  pub fn new(
    customer_name: impl Into<String>,
    service_type: impl Into<String>,
    address: impl Into<String>,
  ) -> Self {
    Self {
      customer_name: customer_name.into(),
      service_type:  service_type.into(),
      address:       address.into(),
    }
  }
}

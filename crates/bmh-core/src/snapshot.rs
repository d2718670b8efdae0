//! The durable snapshot format and its tolerant decoder.
//!
//! A snapshot is a single JSON document:
//!
//! ```json
//! { "bookings": [ ... ], "globalHistory": [ ... ] }
//! ```
//!
//! Decoding never fails. Unparseable documents, non-array fields and entries
//! that don't match the schema are dropped and reported as [`Defect`]s so the
//! caller can log them. The two lists are then reconciled: a booking survives
//! only if its whole history is in `globalHistory`, and audit events left
//! without a booking are dropped.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Result,
  booking::{Booking, LifecycleEvent},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
  /// Newest first.
  pub bookings:       Vec<Booking>,
  /// Newest first.
  pub global_history: Vec<LifecycleEvent>,
}

/// Something [`Snapshot::decode`] had to throw away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Defect {
  /// The document is not a JSON object.
  Malformed(String),
  /// A top-level field is present but not an array.
  NotAnArray(&'static str),
  /// One entry of a top-level array could not be used.
  Entry { field: &'static str, index: usize, reason: String },
}

impl std::fmt::Display for Defect {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Malformed(reason) => write!(f, "malformed snapshot: {reason}"),
      Self::NotAnArray(field) => write!(f, "`{field}` is not an array"),
      Self::Entry { field, index, reason } => {
        write!(f, "`{field}[{index}]` dropped: {reason}")
      }
    }
  }
}

/// Output of [`Snapshot::decode`].
#[derive(Debug, Clone, Default)]
pub struct Decoded {
  pub snapshot: Snapshot,
  pub defects:  Vec<Defect>,
}

impl Snapshot {
  pub fn is_empty(&self) -> bool {
    self.bookings.is_empty() && self.global_history.is_empty()
  }

  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  /// Decode a stored document, salvaging whatever is usable.
  pub fn decode(raw: &str) -> Decoded {
    let mut defects = Vec::new();

    let root = match serde_json::from_str::<Value>(raw) {
      Ok(Value::Object(map)) => map,
      Ok(other) => {
        defects.push(Defect::Malformed(format!("expected an object, found {other}")));
        return Decoded { snapshot: Snapshot::default(), defects };
      }
      Err(e) => {
        defects.push(Defect::Malformed(e.to_string()));
        return Decoded { snapshot: Snapshot::default(), defects };
      }
    };

    let mut bookings: Vec<Booking> = salvage(&root, "bookings", &mut defects);
    let mut index = 0;
    bookings.retain(|b| {
      let keep = b.is_well_formed();
      if !keep {
        defects.push(Defect::Entry {
          field: "bookings",
          index,
          reason: "history is empty, unordered or disagrees with status".into(),
        });
      }
      index += 1;
      keep
    });

    let global_history = salvage(&root, "globalHistory", &mut defects);
    let (bookings, global_history) = reconcile(bookings, global_history, &mut defects);

    Decoded { snapshot: Snapshot { bookings, global_history }, defects }
  }
}

/// Enforce that every history event appears exactly once in the audit log.
///
/// A booking is kept only if each of its history events is present, unchanged,
/// in the audit log. Audit events that belong to no kept booking (or repeat
/// one already matched) are then dropped.
fn reconcile(
  mut bookings: Vec<Booking>,
  mut audit: Vec<LifecycleEvent>,
  defects: &mut Vec<Defect>,
) -> (Vec<Booking>, Vec<LifecycleEvent>) {
  {
    let audited: HashMap<Uuid, &LifecycleEvent> = audit.iter().map(|e| (e.id, e)).collect();
    let mut index = 0;
    bookings.retain(|b| {
      let keep = b.history.iter().all(|e| audited.get(&e.id) == Some(&e));
      if !keep {
        defects.push(Defect::Entry {
          field: "bookings",
          index,
          reason: "history disagrees with globalHistory".into(),
        });
      }
      index += 1;
      keep
    });
  }

  let mut owned: HashSet<Uuid> = bookings
    .iter()
    .flat_map(|b| b.history.iter().map(|e| e.id))
    .collect();
  let mut index = 0;
  audit.retain(|e| {
    let keep = owned.remove(&e.id);
    if !keep {
      defects.push(Defect::Entry {
        field: "globalHistory",
        index,
        reason: "event belongs to no restored booking".into(),
      });
    }
    index += 1;
    keep
  });

  (bookings, audit)
}

fn salvage<T: DeserializeOwned>(
  root: &serde_json::Map<String, Value>,
  field: &'static str,
  defects: &mut Vec<Defect>,
) -> Vec<T> {
  let items = match root.get(field) {
    None | Some(Value::Null) => return Vec::new(),
    Some(Value::Array(items)) => items,
    Some(_) => {
      defects.push(Defect::NotAnArray(field));
      return Vec::new();
    }
  };

  items
    .iter()
    .enumerate()
    .filter_map(|(index, item)| match T::deserialize(item) {
      Ok(value) => Some(value),
      Err(e) => {
        defects.push(Defect::Entry { field, index, reason: e.to_string() });
        None
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use chrono::{DateTime, Utc};
  use serde_json::json;

  use super::*;
  use crate::{
    booking::{BookingStatus, NewBooking},
    ledger::Ledger,
    lifecycle::Actor,
  };

  fn now() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
  }

  fn populated() -> Snapshot {
    let mut l = Ledger::new();
    let b = l.create_booking(NewBooking::new("Ada", "Leaky faucet", "1 Main St"), now());
    l.create_booking(NewBooking::new("Bo", "Gardening", "2 Side St"), now());
    l.transition(b.id, BookingStatus::Cancelled, &Actor::Customer("Ada".into()), now())
      .unwrap();
    l.snapshot()
  }

  #[test]
  fn encoded_snapshot_decodes_to_itself() {
    let snapshot = populated();
    let decoded = Snapshot::decode(&snapshot.to_json().unwrap());
    assert!(decoded.defects.is_empty(), "{:?}", decoded.defects);
    assert_eq!(decoded.snapshot, snapshot);
  }

  #[test]
  fn wire_format_uses_camel_case_and_start_marker() {
    let value = serde_json::to_value(populated()).unwrap();
    let history = value["globalHistory"].as_array().unwrap();
    assert_eq!(history.last().unwrap()["fromStatus"], "START");
    assert!(value["bookings"][0]["customerName"].is_string());
    assert!(value["bookings"][0]["createdAt"].is_i64());
    assert_eq!(value["bookings"][1]["status"], "CANCELLED");
  }

  #[test]
  fn garbage_decodes_to_empty() {
    for raw in ["", "not json", "[]", "42", "null"] {
      let decoded = Snapshot::decode(raw);
      assert!(decoded.snapshot.is_empty());
      assert_eq!(decoded.defects.len(), 1, "{raw:?}");
    }
  }

  #[test]
  fn missing_fields_are_empty_without_defects() {
    let decoded = Snapshot::decode("{}");
    assert!(decoded.snapshot.is_empty());
    assert!(decoded.defects.is_empty());
  }

  #[test]
  fn unusable_bookings_field_orphans_the_whole_audit_log() {
    let good = populated();
    let raw = json!({
      "bookings": "oops",
      "globalHistory": good.global_history,
    })
    .to_string();

    let decoded = Snapshot::decode(&raw);
    assert!(decoded.snapshot.is_empty());
    assert_eq!(decoded.defects[0], Defect::NotAnArray("bookings"));
    assert_eq!(decoded.defects.len(), 1 + good.global_history.len());
  }

  #[test]
  fn bad_entries_are_dropped_with_their_events() {
    let good = populated();
    // bookings[0] is Bo (one event), bookings[1] is Ada (two events).
    let mut broken = serde_json::to_value(&good.bookings[0]).unwrap();
    broken["history"] = json!([]);
    let raw = json!({
      "bookings": [good.bookings[1], broken, { "id": 7 }],
      "globalHistory": good.global_history,
    })
    .to_string();

    let decoded = Snapshot::decode(&raw);
    assert_eq!(decoded.snapshot.bookings, vec![good.bookings[1].clone()]);
    assert_eq!(
      decoded.snapshot.global_history,
      good
        .global_history
        .iter()
        .filter(|e| e.booking_id == good.bookings[1].id)
        .cloned()
        .collect::<Vec<_>>()
    );
    // Ill-formed booking, unparseable booking, Bo's orphaned creation event.
    assert_eq!(decoded.defects.len(), 3);
  }

  #[test]
  fn corrupt_audit_entry_drops_the_booking_that_owns_it() {
    let good = populated();
    let mut value = serde_json::to_value(&good).unwrap();
    // Newest event: Ada's cancellation.
    value["globalHistory"][0]["toStatus"] = json!("BOGUS");

    let decoded = Snapshot::decode(&value.to_string());
    let bo = &good.bookings[0];
    assert_eq!(decoded.snapshot.bookings, vec![bo.clone()]);
    assert_eq!(decoded.snapshot.global_history, bo.history);

    let ledger = Ledger::from_snapshot(decoded.snapshot);
    let history: Vec<_> = ledger
      .bookings()
      .iter()
      .flat_map(|b| b.history.iter().map(|e| e.id))
      .collect();
    let audit: HashSet<_> = ledger.audit().iter().map(|e| e.id).collect();
    assert_eq!(history.len(), audit.len());
    assert!(history.iter().all(|id| audit.contains(id)));
  }

  #[test]
  fn edited_history_event_must_match_the_audit_copy() {
    let good = populated();
    let mut value = serde_json::to_value(&good).unwrap();
    value["bookings"][0]["history"][0]["notes"] = json!("rewritten");

    let decoded = Snapshot::decode(&value.to_string());
    assert_eq!(decoded.snapshot.bookings, vec![good.bookings[1].clone()]);
    assert_eq!(decoded.snapshot.global_history.len(), 2);
  }

  #[test]
  fn duplicate_audit_events_are_dropped() {
    let good = populated();
    let mut history = good.global_history.clone();
    history.push(history[0].clone());
    let raw = json!({ "bookings": good.bookings, "globalHistory": history }).to_string();

    let decoded = Snapshot::decode(&raw);
    assert_eq!(decoded.snapshot, good);
    assert_eq!(decoded.defects.len(), 1);
  }

  #[test]
  fn missing_retry_fields_default() {
    let good = populated();
    let mut booking = serde_json::to_value(&good.bookings[0]).unwrap();
    let map = booking.as_object_mut().unwrap();
    map.remove("retryCount");
    map.remove("lastRetryAt");

    let raw = json!({ "bookings": [booking], "globalHistory": good.global_history }).to_string();
    let decoded = Snapshot::decode(&raw);
    assert_eq!(decoded.snapshot.bookings.len(), 1);
    assert_eq!(decoded.snapshot.bookings[0].retry_count, 0);
    assert_eq!(decoded.snapshot.bookings[0].last_retry_at, None);
  }
}

//! Automatic assignment planning.
//!
//! The timer that drives dispatch lives in `bmh-engine`; this module only
//! decides, for one booking at one instant, whether and to whom it should be
//! assigned.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  booking::{Booking, LifecycleEvent},
  lifecycle,
  provider::{MatchTier, ProviderDirectory},
  specialty::resolve_specialty,
};

/// Maximum number of automatic assignment attempts per booking.
pub const RETRY_CAP: u32 = 3;

/// Summary of one automatic assignment, for logging and callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
  pub booking_id:    Uuid,
  pub provider_id:   String,
  pub provider_name: String,
  pub tier:          MatchTier,
  pub attempt:       u32,
}

/// Attempt to auto-assign `booking`. Returns `None` when the booking is not in
/// a dispatchable status or has used up its attempts.
pub fn attempt(
  booking: &Booking,
  directory: &ProviderDirectory,
  at: DateTime<Utc>,
) -> Option<(Booking, LifecycleEvent, Assignment)> {
  if !booking.awaiting_dispatch() {
    return None;
  }

  let specialty = resolve_specialty(&booking.service_type);
  let selection = directory.select(specialty.label());
  let (next, event) = lifecycle::auto_assign(booking, selection.provider, at);

  let assignment = Assignment {
    booking_id:    next.id,
    provider_id:   selection.provider.id.clone(),
    provider_name: selection.provider.name.clone(),
    tier:          selection.tier,
    attempt:       next.retry_count,
  };

  Some((next, event, assignment))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    booking::{BookingStatus, NewBooking},
    lifecycle::{Actor, transition},
    provider::Provider,
    specialty::Specialty,
  };

  fn t(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
  }

  fn booking(service: &str) -> Booking {
    lifecycle::create(Uuid::new_v4(), NewBooking::new("Ada", service, "1 Main St"), t(0))
  }

  #[test]
  fn leaky_faucet_goes_to_the_plumber() {
    let dir = ProviderDirectory::default();
    let (b, _, a) = attempt(&booking("Leaky faucet"), &dir, t(5)).unwrap();
    assert_eq!(b.provider_id.as_deref(), Some("p1"));
    assert_eq!(b.retry_count, 1);
    assert_eq!(a.tier, MatchTier::Specialty);
    assert_eq!(a.attempt, 1);
  }

  #[test]
  fn only_pending_and_rejected_are_dispatched() {
    let dir = ProviderDirectory::default();
    let (assigned, _, _) = attempt(&booking("Leak"), &dir, t(1)).unwrap();
    assert!(attempt(&assigned, &dir, t(2)).is_none());

    let (rejected, _) =
      transition(&assigned, BookingStatus::Rejected, &Actor::Admin, t(3));
    assert!(attempt(&rejected, &dir, t(4)).is_some());

    let (cancelled, _) =
      transition(&rejected, BookingStatus::Cancelled, &Actor::Admin, t(5));
    assert!(attempt(&cancelled, &dir, t(6)).is_none());
  }

  #[test]
  fn retry_cap_is_respected() {
    let dir = ProviderDirectory::default();
    let mut b = booking("Wood Works");
    for i in 0..RETRY_CAP {
      let (next, _, a) = attempt(&b, &dir, t(10 * i as i64 + 1)).unwrap();
      assert_eq!(a.attempt, i + 1);
      let (next, _) = transition(&next, BookingStatus::Rejected, &Actor::Admin, t(10 * i as i64 + 2));
      b = next;
    }
    assert_eq!(b.retry_count, RETRY_CAP);
    assert!(attempt(&b, &dir, t(100)).is_none());
  }

  #[test]
  fn nobody_available_still_assigns_first_listed() {
    let dir = ProviderDirectory::new(vec![
      Provider::new("x", "Busy Bee", Specialty::Security, false),
      Provider::new("y", "Also Busy", Specialty::Cleaning, false),
    ])
    .unwrap();
    let (b, _, a) = attempt(&booking("Pro Cleaning"), &dir, t(1)).unwrap();
    assert_eq!(b.provider_id.as_deref(), Some("x"));
    assert_eq!(a.tier, MatchTier::FirstListed);
  }
}

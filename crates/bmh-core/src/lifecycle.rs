//! The booking state machine.
//!
//! Every function here is pure: it takes the current booking and a timestamp
//! and returns the next booking together with the event describing the change.
//! No transition is ever refused. The table in [`suggested_actions`] describes
//! what a well-behaved client offers, but [`transition`] records whatever it is
//! asked to record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  booking::{Booking, BookingStatus, LifecycleEvent, NewBooking},
  provider::Provider,
};

// ─── Actors ──────────────────────────────────────────────────────────────────

/// Who is asking for a status change. Roles are advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
  Customer(String),
  Provider { id: String, name: String },
  Admin,
  /// The auto-dispatcher.
  System,
}

impl Actor {
  /// The label recorded in [`LifecycleEvent::actor`].
  pub fn label(&self) -> &str {
    match self {
      Self::Customer(name) => name,
      Self::Provider { name, .. } => name,
      Self::Admin => "Admin",
      Self::System => "System",
    }
  }
}

impl From<&Provider> for Actor {
  fn from(p: &Provider) -> Self {
    Self::Provider { id: p.id.clone(), name: p.name.clone() }
  }
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Build a new `PENDING` booking seeded with its `START -> PENDING` event.
pub fn create(id: Uuid, input: NewBooking, at: DateTime<Utc>) -> Booking {
  let event = LifecycleEvent {
    id:          Uuid::new_v4(),
    timestamp:   at,
    booking_id:  id,
    from_status: None,
    to_status:   BookingStatus::Pending,
    actor:       input.customer_name.clone(),
    notes:       "Booking created by customer.".to_owned(),
  };

  Booking {
    id,
    customer_name: input.customer_name,
    service_type: input.service_type,
    address: input.address,
    status: BookingStatus::Pending,
    provider_id: None,
    provider_name: None,
    created_at: at,
    retry_count: 0,
    last_retry_at: None,
    history: vec![event],
  }
}

/// Apply a manual status change.
///
/// Moving to `ASSIGNED` records the acting provider, if the actor is one;
/// moving to `PENDING` clears the provider. Everything else keeps the
/// provider fields as they were.
pub fn transition(
  booking: &Booking,
  to: BookingStatus,
  actor: &Actor,
  at: DateTime<Utc>,
) -> (Booking, LifecycleEvent) {
  let assignee = match actor {
    Actor::Provider { id, name } => Some((id.as_str(), name.as_str())),
    _ => None,
  };
  apply(
    booking,
    to,
    actor.label(),
    assignee,
    format!("Status changed to {to}"),
    at,
  )
}

/// Apply an automatic assignment to `provider`, counting the attempt.
pub fn auto_assign(
  booking: &Booking,
  provider: &Provider,
  at: DateTime<Utc>,
) -> (Booking, LifecycleEvent) {
  let attempt = booking.retry_count + 1;
  let (mut next, event) = apply(
    booking,
    BookingStatus::Assigned,
    Actor::System.label(),
    Some((provider.id.as_str(), provider.name.as_str())),
    format!("Auto-assigned to {} (Attempt {attempt})", provider.name),
    at,
  );
  next.retry_count = attempt;
  next.last_retry_at = Some(at);
  (next, event)
}

fn apply(
  booking: &Booking,
  to: BookingStatus,
  actor: &str,
  assignee: Option<(&str, &str)>,
  notes: String,
  at: DateTime<Utc>,
) -> (Booking, LifecycleEvent) {
  let event = LifecycleEvent {
    id: Uuid::new_v4(),
    timestamp: at,
    booking_id: booking.id,
    from_status: Some(booking.status),
    to_status: to,
    actor: actor.to_owned(),
    notes,
  };

  let mut next = booking.clone();
  next.status = to;
  match to {
    BookingStatus::Assigned => {
      if let Some((id, name)) = assignee {
        next.provider_id = Some(id.to_owned());
        next.provider_name = Some(name.to_owned());
      }
    }
    BookingStatus::Pending => {
      next.provider_id = None;
      next.provider_name = None;
    }
    _ => {}
  }
  next.history.push(event.clone());

  (next, event)
}

// ─── Affordances ─────────────────────────────────────────────────────────────

/// The kind of client issuing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Customer,
  Provider,
  Admin,
}

/// A status change a client may offer as a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Action {
  pub label: &'static str,
  pub to:    BookingStatus,
}

const fn action(label: &'static str, to: BookingStatus) -> Action {
  Action { label, to }
}

/// The status changes a client for `role` conventionally offers on a booking
/// in `status`. Purely advisory: [`transition`] accepts anything.
pub fn suggested_actions(status: BookingStatus, role: Role) -> Vec<Action> {
  use BookingStatus::*;

  match role {
    Role::Provider => match status {
      Pending => vec![action("Accept", Assigned)],
      Assigned => vec![action("Start Work", InProgress), action("Reject", Rejected)],
      InProgress => vec![action("Complete", Completed)],
      _ => Vec::new(),
    },
    Role::Customer if !status.is_terminal() => vec![action("Cancel Booking", Cancelled)],
    Role::Customer => Vec::new(),
    Role::Admin => vec![
      action("Reset to Pending", Pending),
      action("Force Complete", Completed),
    ],
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::specialty::Specialty;

  fn t(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
  }

  fn fresh() -> Booking {
    create(
      Uuid::new_v4(),
      NewBooking::new("Ada", "Leaky faucet", "1 Main St"),
      t(0),
    )
  }

  fn mario() -> Provider {
    Provider::new("p1", "Mario Rossi", Specialty::Plumbing, true)
  }

  #[test]
  fn create_seeds_start_event() {
    let b = fresh();
    assert_eq!(b.status, BookingStatus::Pending);
    assert_eq!(b.retry_count, 0);
    assert!(b.last_retry_at.is_none());
    assert_eq!(b.history.len(), 1);

    let e = &b.history[0];
    assert_eq!(e.from_status, None);
    assert_eq!(e.to_status, BookingStatus::Pending);
    assert_eq!(e.actor, "Ada");
    assert_eq!(e.booking_id, b.id);
    assert!(b.is_well_formed());
  }

  #[test]
  fn provider_accept_records_the_provider() {
    let (b, e) = transition(
      &fresh(),
      BookingStatus::Assigned,
      &Actor::from(&mario()),
      t(1),
    );
    assert_eq!(b.provider_id.as_deref(), Some("p1"));
    assert_eq!(b.provider_name.as_deref(), Some("Mario Rossi"));
    assert_eq!(e.from_status, Some(BookingStatus::Pending));
    assert_eq!(e.notes, "Status changed to ASSIGNED");
    assert_eq!(b.history.last(), Some(&e));
  }

  #[test]
  fn provider_is_kept_through_work_and_cleared_on_reset() {
    let (b, _) = transition(&fresh(), BookingStatus::Assigned, &Actor::from(&mario()), t(1));
    let (b, _) = transition(&b, BookingStatus::InProgress, &Actor::from(&mario()), t(2));
    let (b, _) = transition(&b, BookingStatus::Completed, &Actor::from(&mario()), t(3));
    assert_eq!(b.provider_id.as_deref(), Some("p1"));

    let (b, e) = transition(&b, BookingStatus::Pending, &Actor::Admin, t(4));
    assert_eq!(b.provider_id, None);
    assert_eq!(b.provider_name, None);
    assert_eq!(e.actor, "Admin");
    assert!(b.is_well_formed());
  }

  #[test]
  fn non_provider_assign_leaves_provider_untouched() {
    let (b, _) = transition(&fresh(), BookingStatus::Assigned, &Actor::Admin, t(1));
    assert_eq!(b.status, BookingStatus::Assigned);
    assert_eq!(b.provider_id, None);
  }

  #[test]
  fn no_transition_is_refused() {
    let customer = Actor::Customer("Ada".into());
    let (b, _) = transition(&fresh(), BookingStatus::Cancelled, &customer, t(1));
    let (b, e) = transition(&b, BookingStatus::Completed, &customer, t(2));
    assert_eq!(b.status, BookingStatus::Completed);
    assert_eq!(e.from_status, Some(BookingStatus::Cancelled));
  }

  #[test]
  fn auto_assign_counts_attempts() {
    let at = t(0) + Duration::seconds(5);
    let (b, e) = auto_assign(&fresh(), &mario(), at);
    assert_eq!(b.status, BookingStatus::Assigned);
    assert_eq!(b.retry_count, 1);
    assert_eq!(b.last_retry_at, Some(at));
    assert_eq!(b.provider_id.as_deref(), Some("p1"));
    assert_eq!(e.actor, "System");
    assert_eq!(e.notes, "Auto-assigned to Mario Rossi (Attempt 1)");
  }

  #[test]
  fn reset_to_pending_keeps_retry_count() {
    let (b, _) = auto_assign(&fresh(), &mario(), t(1));
    let (b, _) = transition(&b, BookingStatus::Pending, &Actor::Admin, t(2));
    assert_eq!(b.retry_count, 1);
  }

  #[test]
  fn suggested_actions_follow_the_role() {
    let provider = suggested_actions(BookingStatus::Assigned, Role::Provider);
    assert_eq!(
      provider.iter().map(|a| a.to).collect::<Vec<_>>(),
      vec![BookingStatus::InProgress, BookingStatus::Rejected]
    );
    assert!(suggested_actions(BookingStatus::Completed, Role::Customer).is_empty());
    assert_eq!(
      suggested_actions(BookingStatus::Rejected, Role::Customer)[0].to,
      BookingStatus::Cancelled
    );
    assert_eq!(suggested_actions(BookingStatus::Cancelled, Role::Admin).len(), 2);
  }
}

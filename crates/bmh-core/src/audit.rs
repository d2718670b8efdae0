//! The global audit log: every lifecycle event across all bookings, newest
//! first.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::booking::LifecycleEvent;

/// Append-only, most-recent-first event feed. Only [`AuditLog::clear`] removes
/// entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
  events: VecDeque<LifecycleEvent>,
}

impl AuditLog {
  /// Restore from a most-recent-first sequence.
  pub fn from_newest_first(events: Vec<LifecycleEvent>) -> Self {
    Self { events: events.into() }
  }

  pub(crate) fn record(&mut self, event: LifecycleEvent) {
    self.events.push_front(event);
  }

  pub(crate) fn clear(&mut self) { self.events.clear(); }

  /// Events, newest first.
  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LifecycleEvent> {
    self.events.iter()
  }

  pub fn latest(&self) -> Option<&LifecycleEvent> { self.events.front() }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  pub fn to_vec(&self) -> Vec<LifecycleEvent> {
    self.events.iter().cloned().collect()
  }
}

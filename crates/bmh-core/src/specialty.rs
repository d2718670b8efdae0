//! Maps free-text service descriptions onto provider specialties.

use serde::{Deserialize, Serialize};

/// The fixed set of trades a provider can practise.
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
  strum::IntoStaticStr,
)]
pub enum Specialty {
  Plumbing,
  Electrical,
  Cleaning,
  Carpentry,
  Security,
}

impl Specialty {
  pub fn as_str(self) -> &'static str { self.into() }
}

/// Ordered keyword rules; the first rule with a matching keyword wins.
const RULES: &[(&[&str], Specialty)] = &[
  (&["clean"], Specialty::Cleaning),
  (&["leak", "plumb"], Specialty::Plumbing),
  (&["volt", "electric"], Specialty::Electrical),
  (&["wood"], Specialty::Carpentry),
  (&["safe", "guard", "security"], Specialty::Security),
];

/// Result of [`resolve_specialty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedSpecialty<'a> {
  Known(Specialty),
  /// No rule matched; the service text itself is used as the label.
  Unresolved(&'a str),
}

impl ResolvedSpecialty<'_> {
  /// The label compared against provider specialties.
  pub fn label(&self) -> &str {
    match self {
      Self::Known(s) => s.as_str(),
      Self::Unresolved(text) => text,
    }
  }
}

/// Case-insensitive keyword lookup. Total over all inputs.
pub fn resolve_specialty(service: &str) -> ResolvedSpecialty<'_> {
  let lowered = service.to_lowercase();
  RULES
    .iter()
    .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
    .map_or(ResolvedSpecialty::Unresolved(service), |(_, specialty)| {
      ResolvedSpecialty::Known(*specialty)
    })
}

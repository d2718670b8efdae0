//! The provider directory: a fixed, ordered registry of service providers.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, specialty::Specialty};

/// A service professional eligible for assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
  pub id:           String,
  pub name:         String,
  pub specialty:    Specialty,
  pub is_available: bool,
}

impl Provider {
  pub fn new(
    id: impl Into<String>,
    name: impl Into<String>,
    specialty: Specialty,
    is_available: bool,
  ) -> Self {
    Self { id: id.into(), name: name.into(), specialty, is_available }
  }

  fn practises(&self, label: &str) -> bool {
    self.specialty.as_str().eq_ignore_ascii_case(label)
  }
}

/// Which fallback tier produced a [`Selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
  /// Available and the specialty matched.
  Specialty,
  /// Available, specialty ignored.
  AnyAvailable,
  /// Nobody was available; the first directory entry is used regardless.
  FirstListed,
}

/// A provider chosen for an automatic assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
  pub provider: &'a Provider,
  pub tier:     MatchTier,
}

/// Read-only, ordered provider registry. Lookups return the first match in
/// directory order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDirectory {
  // Never empty; checked in `new`.
  providers: Vec<Provider>,
}

impl ProviderDirectory {
  pub fn new(providers: Vec<Provider>) -> Result<Self> {
    if providers.is_empty() {
      return Err(Error::EmptyDirectory);
    }
    Ok(Self { providers })
  }

  pub fn providers(&self) -> &[Provider] { &self.providers }

  pub fn get(&self, provider_id: &str) -> Option<&Provider> {
    self.providers.iter().find(|p| p.id == provider_id)
  }

  /// First available provider whose specialty equals `label`, ignoring case.
  pub fn find_by_specialty(&self, label: &str) -> Option<&Provider> {
    self
      .providers
      .iter()
      .find(|p| p.is_available && p.practises(label))
  }

  pub fn find_any_available(&self) -> Option<&Provider> {
    self.providers.iter().find(|p| p.is_available)
  }

  pub fn first(&self) -> &Provider { &self.providers[0] }

  /// Three-tier lookup used by the dispatcher. Always yields a provider.
  pub fn select(&self, label: &str) -> Selection<'_> {
    if let Some(provider) = self.find_by_specialty(label) {
      return Selection { provider, tier: MatchTier::Specialty };
    }
    if let Some(provider) = self.find_any_available() {
      return Selection { provider, tier: MatchTier::AnyAvailable };
    }
    Selection { provider: self.first(), tier: MatchTier::FirstListed }
  }
}

impl Default for ProviderDirectory {
  fn default() -> Self {
    Self {
      providers: vec![
        Provider::new("p1", "Mario Rossi", Specialty::Plumbing, true),
        Provider::new("p2", "Sasha Volt", Specialty::Electrical, true),
        Provider::new("p3", "Clean Team 5", Specialty::Cleaning, true),
      ],
    }
  }
}

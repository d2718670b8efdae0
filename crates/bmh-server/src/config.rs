//! Runtime server configuration.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, ensure};
use bmh_core::provider::{Provider, ProviderDirectory};
use bmh_engine::DEFAULT_PERIOD;
use bmh_store_sqlite::DEFAULT_SLOT;
use serde::Deserialize;

/// Deserialised from `config.toml` layered under `BMH_*` environment
/// variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  pub store_path:             PathBuf,
  /// Key of the snapshot slot inside the store.
  pub slot:                   String,
  pub dispatch_interval_secs: u64,
  /// Replaces the built-in provider directory when set.
  pub providers:              Option<Vec<Provider>>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                   "127.0.0.1".to_owned(),
      port:                   8080,
      store_path:             PathBuf::from("bmh.sqlite3"),
      slot:                   DEFAULT_SLOT.to_owned(),
      dispatch_interval_secs: DEFAULT_PERIOD.as_secs(),
      providers:              None,
    }
  }
}

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("BMH"))
      .build()
      .context("failed to read config file")?;

    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    ensure!(cfg.dispatch_interval_secs > 0, "dispatch_interval_secs must be positive");
    Ok(cfg)
  }

  pub fn dispatch_period(&self) -> Duration {
    Duration::from_secs(self.dispatch_interval_secs)
  }

  pub fn directory(&self) -> anyhow::Result<ProviderDirectory> {
    match &self.providers {
      Some(providers) => ProviderDirectory::new(providers.clone())
        .context("invalid `providers` in configuration"),
      None => Ok(ProviderDirectory::default()),
    }
  }

  /// `store_path` with a leading `~` expanded to the user's home directory.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/bmh-config.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.slot, "bmh_state");
    assert_eq!(cfg.dispatch_period(), Duration::from_secs(5));
    assert_eq!(cfg.directory().unwrap(), ProviderDirectory::default());
  }

  #[test]
  fn empty_provider_list_is_an_error() {
    let cfg = ServerConfig { providers: Some(Vec::new()), ..ServerConfig::default() };
    assert!(cfg.directory().is_err());
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else { return };
    let cfg = ServerConfig {
      store_path: PathBuf::from("~/bmh/state.sqlite3"),
      ..ServerConfig::default()
    };
    assert_eq!(cfg.resolved_store_path(), PathBuf::from(home).join("bmh/state.sqlite3"));
  }
}

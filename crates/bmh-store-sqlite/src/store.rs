//! [`SqliteStore`]: the SQLite implementation of [`SnapshotStore`].

use std::path::Path;

use bmh_core::{snapshot::Snapshot, store::SnapshotStore};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{Result, schema::SCHEMA};

/// Slot name used when the caller does not pick one.
pub const DEFAULT_SLOT: &str = "bmh_state";

/// A snapshot slot backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  slot: String,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, slot: impl Into<String>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, slot: slot.into() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store using [`DEFAULT_SLOT`], mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, slot: DEFAULT_SLOT.to_owned() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub fn slot(&self) -> &str { &self.slot }

  /// The raw slot contents, if the slot has ever been written.
  pub async fn read_raw(&self) -> Result<Option<String>> {
    let key = self.slot.clone();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM slots WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw)
  }

  /// Overwrite the slot with an arbitrary document.
  pub async fn write_raw(&self, value: String) -> Result<()> {
    let key = self.slot.clone();
    let at_str = Utc::now().to_rfc3339();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
          rusqlite::params![key, value, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}

// ─── SnapshotStore impl ──────────────────────────────────────────────────────

impl SnapshotStore for SqliteStore {
  type Error = crate::Error;

  async fn load(&self) -> Result<Snapshot> {
    let Some(raw) = self.read_raw().await? else {
      return Ok(Snapshot::default());
    };

    let decoded = Snapshot::decode(&raw);
    for defect in &decoded.defects {
      tracing::warn!(slot = %self.slot, "discarding stored state: {defect}");
    }
    Ok(decoded.snapshot)
  }

  async fn save(&self, snapshot: &Snapshot) -> Result<()> {
    let json = snapshot.to_json()?;
    self.write_raw(json).await
  }
}

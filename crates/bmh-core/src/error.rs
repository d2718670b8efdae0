//! Error types for `bmh-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("booking not found: {0}")]
  BookingNotFound(Uuid),

  #[error("provider directory must contain at least one provider")]
  EmptyDirectory,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

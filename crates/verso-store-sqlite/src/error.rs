//! Error type for `verso-store-sqlite`.

use thiserror::Error;
use verso_core::AsCoreError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] verso_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value its declared kind cannot represent.
  #[error("cannot decode column {column:?}: {reason}")]
  Decode { column: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl AsCoreError for Error {
  fn as_core(&self) -> Option<&verso_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

/// Wrap a storage rejection of a version close or append.
pub(crate) fn write_failure(e: rusqlite::Error) -> Error {
  Error::Core(verso_core::Error::WriteFailure(e.to_string()))
}

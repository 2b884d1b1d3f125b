//! Error types for `verso-core`.

use thiserror::Error;

use crate::schema::FieldKind;

#[derive(Debug, Error)]
pub enum Error {
  // ── Chain state ───────────────────────────────────────────────────────

  /// More than one open version was found for a record before a write.
  #[error("version chain of record {record_id} is corrupt: {open_heads} open versions")]
  ChainCorruption { record_id: i64, open_heads: usize },

  /// The backing store rejected closing or appending a version.
  #[error("version store rejected the write: {0}")]
  WriteFailure(String),

  /// A terminal (deleted) chain received another mutation.
  #[error("record {0} is deleted; its version chain is closed")]
  ChainTerminated(i64),

  // ── Revert ────────────────────────────────────────────────────────────

  #[error(
    "cannot revert record {record_id} by {steps} versions: only {available} earlier versions exist"
  )]
  RevertOutOfRange {
    record_id: i64,
    steps:     u64,
    available: usize,
  },

  #[error("record {0} is deleted; nothing to revert")]
  RevertAfterDelete(i64),

  #[error("version {version_id} does not belong to record {record_id}")]
  UnknownVersion { record_id: i64, version_id: i64 },

  #[error("revert target must be a positive version id or a negative offset")]
  NotAVersionTarget,

  // ── Records and schemas ───────────────────────────────────────────────

  #[error("record not found: {0}")]
  RecordNotFound(i64),

  #[error("invalid schema: {0}")]
  InvalidSchema(String),

  #[error("field name {0:?} is reserved for version metadata")]
  ReservedField(String),

  #[error("unknown field: {0:?}")]
  UnknownField(String),

  #[error("missing value for field {0:?}")]
  MissingField(String),

  #[error("field {field:?} expects {expected}, got {found}")]
  TypeMismatch {
    field:    String,
    expected: FieldKind,
    found:    String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Backend error types that may carry an engine [`Error`].
///
/// Lets outer layers (e.g. the HTTP API) tell chain-state failures apart from
/// plain storage failures without knowing the concrete backend.
pub trait AsCoreError {
  fn as_core(&self) -> Option<&Error>;
}

impl AsCoreError for Error {
  fn as_core(&self) -> Option<&Error> { Some(self) }
}

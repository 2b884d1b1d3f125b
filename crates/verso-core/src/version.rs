//! Primary records, version records, and the mutations that link them.
//!
//! A version record is two composed parts: the engine-owned [`VersionMeta`]
//! and the entity's field [`Snapshot`]. They never share a namespace.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::value::Snapshot;

// ─── Primary record ──────────────────────────────────────────────────────────

/// The current state of a live entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
  /// Store-assigned identity; never reused, even after deletion.
  pub id:     i64,
  pub fields: Snapshot,
}

// ─── Mutation ────────────────────────────────────────────────────────────────

/// The kind of change applied to a primary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutation {
  Create,
  Update,
  Delete,
}

impl Mutation {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Update => "update",
      Self::Delete => "delete",
    }
  }
}

// ─── Version records ─────────────────────────────────────────────────────────

/// Engine-owned metadata of one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionMeta {
  /// Unique across the whole companion table, assigned in creation order.
  pub version_id:      i64,
  /// Identity of the primary record this version belongs to.
  pub original_record: i64,
  pub valid_from:      DateTime<Utc>,
  /// `None` while this version is the chain's head.
  pub valid_until:     Option<DateTime<Utc>>,
  /// Set only on the terminal version written by a delete.
  pub deleted:         bool,
}

impl VersionMeta {
  pub fn is_open(&self) -> bool { self.valid_until.is_none() }

  /// Whether `at` falls inside `[valid_from, valid_until)`.
  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.valid_from <= at && self.valid_until.is_none_or(|until| at < until)
  }
}

/// One immutable historical state of a primary record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionRecord {
  #[serde(flatten)]
  pub meta:   VersionMeta,
  pub fields: Snapshot,
}

impl VersionRecord {
  pub fn version_id(&self) -> i64 { self.meta.version_id }

  pub fn is_head(&self) -> bool { self.meta.is_open() }
}

/// A version about to be appended; the store assigns `version_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
  pub original_record: i64,
  pub valid_from:      DateTime<Utc>,
  pub deleted:         bool,
  pub fields:          Snapshot,
}

impl NewVersion {
  /// Attach the store-assigned id, producing the open head record.
  pub fn into_record(self, version_id: i64) -> VersionRecord {
    VersionRecord {
      meta:   VersionMeta {
        version_id,
        original_record: self.original_record,
        valid_from: self.valid_from,
        valid_until: None,
        deleted: self.deleted,
      },
      fields: self.fields,
    }
  }
}

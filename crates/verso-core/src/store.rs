//! The `VersionedCollection` trait and supporting query types.
//!
//! A collection is one tracked entity type bound to a storage backend (e.g.
//! `verso-store-sqlite`). Higher layers (`verso-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  AsCoreError,
  revert::RevertTarget,
  schema::EntitySchema,
  value::Snapshot,
  version::{Record, VersionRecord},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`VersionedCollection::versions`]. Results are ordered by
/// `version_id`.
#[derive(Debug, Clone, Default)]
pub struct VersionQuery {
  /// Restrict to the chain of one primary record.
  pub original_record: Option<i64>,
  /// Restrict to delete markers (`Some(true)`) or live versions
  /// (`Some(false)`).
  pub deleted:         Option<bool>,
  /// Only versions with a `version_id` strictly greater than this.
  pub after_version:   Option<i64>,
  pub limit:           Option<usize>,
  pub offset:          Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A tracked entity type with a versioned companion store.
///
/// Every mutation appends exactly one version inside the same transaction as
/// the primary-record change; if versioning fails, the mutation is rolled
/// back. There is no method that writes either table without versioning.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait VersionedCollection: Send + Sync {
  type Error: std::error::Error + AsCoreError + Send + Sync + 'static;

  fn schema(&self) -> &EntitySchema;

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Insert a record and open its chain. Nullable fields may be omitted.
  fn create(
    &self,
    fields: Snapshot,
  ) -> impl Future<Output = Result<(Record, VersionRecord), Self::Error>> + Send + '_;

  /// Apply a partial update. An empty patch writes nothing and returns the
  /// current head.
  fn update(
    &self,
    id: i64,
    patch: Snapshot,
  ) -> impl Future<Output = Result<(Record, VersionRecord), Self::Error>> + Send + '_;

  /// Delete a record. Returns the terminal delete-marker version.
  fn delete(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<VersionRecord, Self::Error>> + Send + '_;

  /// Copy an earlier version's fields into a new head.
  fn revert(
    &self,
    id: i64,
    target: RevertTarget,
  ) -> impl Future<Output = Result<(Record, VersionRecord), Self::Error>> + Send + '_;

  // ── Primary reads ─────────────────────────────────────────────────────

  /// Retrieve a live record. Returns `None` if missing or deleted.
  fn get(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// All live records, ordered by id.
  fn list(&self) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;

  // ── History reads ─────────────────────────────────────────────────────

  /// The full chain of a record, oldest first. Survives deletion.
  fn history(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Vec<VersionRecord>, Self::Error>> + Send + '_;

  /// The open head version of a record.
  fn head(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<VersionRecord>, Self::Error>> + Send + '_;

  /// `version_id` of the record's head.
  fn current_version_id(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  /// Look up a single version anywhere in the companion store.
  fn version(
    &self,
    version_id: i64,
  ) -> impl Future<Output = Result<Option<VersionRecord>, Self::Error>> + Send + '_;

  /// The version of a record that was current at `at`. A delete marker is
  /// returned for instants after the record's deletion.
  fn as_of(
    &self,
    id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<VersionRecord>, Self::Error>> + Send + '_;

  /// Type-level scan of the companion store.
  fn versions<'a>(
    &'a self,
    query: &'a VersionQuery,
  ) -> impl Future<Output = Result<Vec<VersionRecord>, Self::Error>> + Send + 'a;
}

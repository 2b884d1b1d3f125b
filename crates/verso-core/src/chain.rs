//! The version writer: turns one mutation into one appended version.
//!
//! A chain is the ordered list of versions sharing an `original_record`. Its
//! head is the single version whose `valid_until` is open. Every write closes
//! the head at `t` and appends a new head whose `valid_from` is the same `t`,
//! so intervals never overlap or leave gaps.
//!
//! The writer is storage-agnostic; backends implement [`ChainStorage`] for a
//! handle that is already inside a transaction.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  clock::{Clock, tick},
  value::Snapshot,
  version::{Mutation, NewVersion, VersionMeta, VersionRecord},
};

// ─── Storage seam ────────────────────────────────────────────────────────────

/// Companion-table operations, executed within a single transaction.
///
/// Implementations map a rejected close or append to
/// [`Error::WriteFailure`].
pub trait ChainStorage {
  type Error: From<Error>;

  /// All versions of `record_id` with an open `valid_until`, by `version_id`.
  fn open_versions(&mut self, record_id: i64) -> Result<Vec<VersionMeta>, Self::Error>;

  /// Close the open version `version_id` at `at`.
  fn close_version(
    &mut self,
    version_id: i64,
    at: DateTime<Utc>,
  ) -> Result<(), Self::Error>;

  /// Append `version`, assigning the next `version_id`.
  fn append_version(&mut self, version: NewVersion) -> Result<VersionRecord, Self::Error>;

  /// The full chain of `record_id`, ordered by `version_id`.
  fn chain(&mut self, record_id: i64) -> Result<Vec<VersionRecord>, Self::Error>;
}

// ─── Planning ────────────────────────────────────────────────────────────────

/// The close/append pair a mutation resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePlan {
  /// The head to close at `append.valid_from`, if the chain has one.
  pub close:  Option<i64>,
  pub append: NewVersion,
}

/// Pick the single head out of the open versions of a chain.
pub fn head_of(record_id: i64, mut open: Vec<VersionMeta>) -> Result<Option<VersionMeta>> {
  match open.len() {
    0 | 1 => Ok(open.pop()),
    n => Err(Error::ChainCorruption { record_id, open_heads: n }),
  }
}

/// Decide how `mutation` extends the chain whose current head is `head`.
///
/// An update with no head starts the chain, exactly like a create. The new
/// `valid_from` is pushed one tick past the head's own `valid_from` if the
/// clock has not moved on, so closed intervals are never empty.
pub fn plan_write(
  record_id: i64,
  head: Option<&VersionMeta>,
  fields: Snapshot,
  mutation: Mutation,
  now: DateTime<Utc>,
) -> Result<WritePlan> {
  if let Some(head) = head {
    if head.deleted {
      return Err(Error::ChainTerminated(record_id));
    }
    if mutation == Mutation::Create {
      // A fresh record cannot already own a head.
      return Err(Error::ChainCorruption { record_id, open_heads: 1 });
    }
  }

  let at = match head {
    Some(head) if now <= head.valid_from => head.valid_from + tick(),
    _ => now,
  };

  Ok(WritePlan {
    close:  head.map(|h| h.version_id),
    append: NewVersion {
      original_record: record_id,
      valid_from: at,
      deleted: mutation == Mutation::Delete,
      fields,
    },
  })
}

// ─── Writer ──────────────────────────────────────────────────────────────────

/// Appends versions on behalf of every create, update, and delete.
pub struct VersionWriter<'c> {
  clock: &'c dyn Clock,
}

impl<'c> VersionWriter<'c> {
  pub fn new(clock: &'c dyn Clock) -> Self { Self { clock } }

  /// The current head of `record_id`'s chain, if any.
  pub fn head<S: ChainStorage + ?Sized>(
    storage: &mut S,
    record_id: i64,
  ) -> Result<Option<VersionMeta>, S::Error> {
    let open = storage.open_versions(record_id)?;
    Ok(head_of(record_id, open)?)
  }

  /// Close the head (if any) and append the version for `mutation`.
  ///
  /// `fields` is the post-mutation snapshot; for a delete it is the last
  /// known state of the record. Returns the appended version.
  pub fn write<S: ChainStorage + ?Sized>(
    &self,
    storage: &mut S,
    record_id: i64,
    fields: Snapshot,
    mutation: Mutation,
  ) -> Result<VersionRecord, S::Error> {
    let head = Self::head(storage, record_id)?;
    let plan = plan_write(record_id, head.as_ref(), fields, mutation, self.clock.now())?;

    if let Some(version_id) = plan.close {
      storage.close_version(version_id, plan.append.valid_from)?;
    }
    storage.append_version(plan.append)
  }
}

//! The mutation path a storage backend calls through.
//!
//! [`VersionedMapper`] pairs every change to a primary record with the
//! matching version write. Backends expose their transaction as a
//! [`RecordStorage`] and call the mapper from inside it; nothing else in the
//! crate writes to either table, so there is no unversioned mutation path.

use crate::{
  Error,
  chain::{ChainStorage, VersionWriter},
  clock::Clock,
  revert::{RevertTarget, Reverter},
  schema::EntitySchema,
  value::Snapshot,
  version::{Mutation, Record, VersionRecord},
};

/// Primary-table operations, executed within the same transaction as the
/// companion-table operations of [`ChainStorage`].
pub trait RecordStorage: ChainStorage {
  /// Insert a new row and return its store-assigned id.
  fn insert_record(&mut self, fields: &Snapshot) -> Result<i64, Self::Error>;

  fn load_record(&mut self, id: i64) -> Result<Option<Snapshot>, Self::Error>;

  fn update_record(&mut self, id: i64, fields: &Snapshot) -> Result<(), Self::Error>;

  fn delete_record(&mut self, id: i64) -> Result<(), Self::Error>;
}

/// Drives create, update, delete, and revert for one entity type.
pub struct VersionedMapper<'a> {
  schema: &'a EntitySchema,
  writer: VersionWriter<'a>,
}

impl<'a> VersionedMapper<'a> {
  pub fn new(schema: &'a EntitySchema, clock: &'a dyn Clock) -> Self {
    Self { schema, writer: VersionWriter::new(clock) }
  }

  pub fn schema(&self) -> &EntitySchema { self.schema }

  /// Insert a record and open its chain.
  pub fn create<S: RecordStorage + ?Sized>(
    &self,
    storage: &mut S,
    fields: Snapshot,
  ) -> Result<(Record, VersionRecord), S::Error> {
    let fields = self.schema.complete(fields)?;
    let id = storage.insert_record(&fields)?;
    let version = self.writer.write(storage, id, fields.clone(), Mutation::Create)?;
    Ok((Record { id, fields }, version))
  }

  /// Apply `patch` to a live record and version the result.
  ///
  /// An empty patch changes nothing and returns the current head, unless
  /// the record has no chain yet, in which case one is started.
  pub fn update<S: RecordStorage + ?Sized>(
    &self,
    storage: &mut S,
    id: i64,
    patch: Snapshot,
  ) -> Result<(Record, VersionRecord), S::Error> {
    let current = storage.load_record(id)?.ok_or(Error::RecordNotFound(id))?;

    if patch.is_empty()
      && let Some(head) = self.current(storage, id)?
    {
      return Ok((Record { id, fields: current }, head));
    }

    let fields = self.schema.apply_patch(&current, patch)?;
    self.replace(storage, id, fields)
  }

  /// Remove a live record, terminating its chain with a delete marker that
  /// carries the last known snapshot.
  pub fn delete<S: RecordStorage + ?Sized>(
    &self,
    storage: &mut S,
    id: i64,
  ) -> Result<VersionRecord, S::Error> {
    let last = storage.load_record(id)?.ok_or(Error::RecordNotFound(id))?;
    let marker = self.writer.write(storage, id, last, Mutation::Delete)?;
    storage.delete_record(id)?;
    Ok(marker)
  }

  /// Make `target`'s snapshot the current state of record `id`.
  ///
  /// The copy lands as a new head with the next `version_id`; the target
  /// version keeps its original interval.
  pub fn revert<S: RecordStorage + ?Sized>(
    &self,
    storage: &mut S,
    id: i64,
    target: RevertTarget,
  ) -> Result<(Record, VersionRecord), S::Error> {
    let chain = storage.chain(id)?;
    if chain.last().is_some_and(|head| head.meta.deleted) {
      return Err(Error::RevertAfterDelete(id).into());
    }
    if storage.load_record(id)?.is_none() {
      return Err(Error::RecordNotFound(id).into());
    }

    let fields = Reverter::resolve(id, &chain, target)?.fields.clone();
    self.replace(storage, id, fields)
  }

  fn current<S: RecordStorage + ?Sized>(
    &self,
    storage: &mut S,
    id: i64,
  ) -> Result<Option<VersionRecord>, S::Error> {
    let Some(head) = VersionWriter::head(storage, id)? else {
      return Ok(None);
    };
    Ok(
      storage
        .chain(id)?
        .into_iter()
        .find(|v| v.meta.version_id == head.version_id),
    )
  }

  fn replace<S: RecordStorage + ?Sized>(
    &self,
    storage: &mut S,
    id: i64,
    fields: Snapshot,
  ) -> Result<(Record, VersionRecord), S::Error> {
    storage.update_record(id, &fields)?;
    let version = self.writer.write(storage, id, fields.clone(), Mutation::Update)?;
    Ok((Record { id, fields }, version))
  }
}

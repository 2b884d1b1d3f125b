//! In-memory storage used by the engine's unit tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  chain::ChainStorage,
  mapper::RecordStorage,
  value::Snapshot,
  version::{NewVersion, VersionMeta, VersionRecord},
};

#[derive(Debug, Default)]
pub struct MemoryStorage {
  records:      BTreeMap<i64, Snapshot>,
  next_record:  i64,
  versions:     Vec<VersionRecord>,
  next_version: i64,
}

impl ChainStorage for MemoryStorage {
  type Error = Error;

  fn open_versions(&mut self, record_id: i64) -> Result<Vec<VersionMeta>> {
    Ok(
      self
        .versions
        .iter()
        .filter(|v| v.meta.original_record == record_id && v.meta.is_open())
        .map(|v| v.meta.clone())
        .collect(),
    )
  }

  fn close_version(&mut self, version_id: i64, at: DateTime<Utc>) -> Result<()> {
    let version = self
      .versions
      .iter_mut()
      .find(|v| v.meta.version_id == version_id && v.meta.is_open())
      .ok_or_else(|| Error::WriteFailure(format!("version {version_id} is not open")))?;
    version.meta.valid_until = Some(at);
    Ok(())
  }

  fn append_version(&mut self, version: NewVersion) -> Result<VersionRecord> {
    self.next_version += 1;
    let record = version.into_record(self.next_version);
    self.versions.push(record.clone());
    Ok(record)
  }

  fn chain(&mut self, record_id: i64) -> Result<Vec<VersionRecord>> {
    Ok(
      self
        .versions
        .iter()
        .filter(|v| v.meta.original_record == record_id)
        .cloned()
        .collect(),
    )
  }
}

impl RecordStorage for MemoryStorage {
  fn insert_record(&mut self, fields: &Snapshot) -> Result<i64> {
    self.next_record += 1;
    self.records.insert(self.next_record, fields.clone());
    Ok(self.next_record)
  }

  fn load_record(&mut self, id: i64) -> Result<Option<Snapshot>> {
    Ok(self.records.get(&id).cloned())
  }

  fn update_record(&mut self, id: i64, fields: &Snapshot) -> Result<()> {
    match self.records.get_mut(&id) {
      Some(row) => {
        *row = fields.clone();
        Ok(())
      }
      None => Err(Error::RecordNotFound(id)),
    }
  }

  fn delete_record(&mut self, id: i64) -> Result<()> {
    self
      .records
      .remove(&id)
      .map(drop)
      .ok_or(Error::RecordNotFound(id))
  }
}

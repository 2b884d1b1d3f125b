//! [`SqliteCollection`] — the SQLite implementation of [`VersionedCollection`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use verso_core::{
  Error as CoreError,
  clock::Clock,
  mapper::VersionedMapper,
  revert::RevertTarget,
  schema::EntitySchema,
  store::{VersionQuery, VersionedCollection},
  value::Snapshot,
  version::{Record, VersionRecord},
};

use crate::{
  Error, Result, schema,
  storage::{SqliteChain, in_transaction},
};

/// One entity type bound to a [`crate::SqliteStore`].
///
/// Cloning is cheap; clones share the connection, schema, and clock.
#[derive(Clone)]
pub struct SqliteCollection {
  conn:   tokio_rusqlite::Connection,
  schema: Arc<EntitySchema>,
  clock:  Arc<dyn Clock>,
}

impl SqliteCollection {
  pub(crate) fn new(
    conn: tokio_rusqlite::Connection,
    schema: EntitySchema,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self { conn, schema: Arc::new(schema), clock }
  }

  /// Drop both of this entity's tables, discarding all records and history.
  pub async fn drop_tables(self) -> Result<()> {
    let ddl = schema::drop_tables(&self.schema);
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    tracing::info!(entity = %self.schema.name, "dropped versioned entity");
    Ok(())
  }

  /// Run one engine mutation in its own transaction.
  async fn mutate<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&VersionedMapper<'_>, &mut SqliteChain<'_>) -> Result<T> + Send + 'static,
  {
    let schema = self.schema.clone();
    let clock = self.clock.clone();
    self
      .conn
      .call(move |conn| {
        let mapper = VersionedMapper::new(&schema, clock.as_ref());
        Ok(in_transaction(conn, &schema, |chain| op(&mapper, chain)))
      })
      .await?
  }

  async fn read<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&SqliteChain<'_>) -> Result<T> + Send + 'static,
  {
    let schema = self.schema.clone();
    self
      .conn
      .call(move |conn| Ok(op(&SqliteChain::new(conn, &schema))))
      .await?
  }

  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &str) -> Result<()> {
    let sql = sql.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl VersionedCollection for SqliteCollection {
  type Error = Error;

  fn schema(&self) -> &EntitySchema { &self.schema }

  // ── Mutations ─────────────────────────────────────────────────────────────

  async fn create(&self, fields: Snapshot) -> Result<(Record, VersionRecord)> {
    let (record, version) = self.mutate(move |m, s| m.create(s, fields)).await?;
    tracing::debug!(
      entity = %self.schema.name,
      record_id = record.id,
      version_id = version.version_id(),
      "created record"
    );
    Ok((record, version))
  }

  async fn update(&self, id: i64, patch: Snapshot) -> Result<(Record, VersionRecord)> {
    self.mutate(move |m, s| m.update(s, id, patch)).await
  }

  async fn delete(&self, id: i64) -> Result<VersionRecord> {
    let marker = self.mutate(move |m, s| m.delete(s, id)).await?;
    tracing::debug!(
      entity = %self.schema.name,
      record_id = id,
      version_id = marker.version_id(),
      "deleted record"
    );
    Ok(marker)
  }

  async fn revert(&self, id: i64, target: RevertTarget) -> Result<(Record, VersionRecord)> {
    let (record, version) = self.mutate(move |m, s| m.revert(s, id, target)).await?;
    tracing::debug!(
      entity = %self.schema.name,
      record_id = id,
      target = i64::from(target),
      version_id = version.version_id(),
      "reverted record"
    );
    Ok((record, version))
  }

  // ── Primary reads ─────────────────────────────────────────────────────────

  async fn get(&self, id: i64) -> Result<Option<Record>> {
    self.read(move |s| s.get_record(id)).await
  }

  async fn list(&self) -> Result<Vec<Record>> { self.read(|s| s.list_records()).await }

  // ── History reads ─────────────────────────────────────────────────────────

  async fn history(&self, id: i64) -> Result<Vec<VersionRecord>> {
    self.read(move |s| s.history(id)).await
  }

  async fn head(&self, id: i64) -> Result<Option<VersionRecord>> {
    let mut heads = self.read(move |s| s.heads(id)).await?;
    if heads.len() > 1 {
      return Err(
        CoreError::ChainCorruption { record_id: id, open_heads: heads.len() }.into(),
      );
    }
    Ok(heads.pop())
  }

  async fn current_version_id(&self, id: i64) -> Result<Option<i64>> {
    Ok(self.head(id).await?.map(|v| v.version_id()))
  }

  async fn version(&self, version_id: i64) -> Result<Option<VersionRecord>> {
    self.read(move |s| s.version(version_id)).await
  }

  async fn as_of(&self, id: i64, at: DateTime<Utc>) -> Result<Option<VersionRecord>> {
    self.read(move |s| s.as_of(id, at)).await
  }

  async fn versions<'a>(&'a self, query: &'a VersionQuery) -> Result<Vec<VersionRecord>> {
    let query = query.clone();
    self.read(move |s| s.versions(&query)).await
  }
}

//! [`SqliteChain`]: one entity's tables seen through a borrowed connection.
//!
//! Mutations only ever run on a `SqliteChain` built by [`in_transaction`], so
//! the primary-row change and the version close/append commit or roll back
//! together. Reads use a plain connection.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, params_from_iter, types::Value};
use verso_core::{
  Error as CoreError,
  chain::ChainStorage,
  mapper::RecordStorage,
  schema::EntitySchema,
  store::VersionQuery,
  value::Snapshot,
  version::{NewVersion, Record, VersionMeta, VersionRecord},
};

use crate::{
  Error, Result,
  encode::{RawRecord, RawVersion, encode_dt, encode_snapshot},
  error::write_failure,
  schema::{field_list, quote, version_select_list},
};

/// Run `f` inside an immediate transaction, committing only if it succeeds.
pub fn in_transaction<T>(
  conn: &mut rusqlite::Connection,
  schema: &EntitySchema,
  f: impl FnOnce(&mut SqliteChain<'_>) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
  let out = f(&mut SqliteChain::new(&tx, schema))?;
  tx.commit().map_err(write_failure)?;
  Ok(out)
}

pub struct SqliteChain<'c> {
  conn:     &'c rusqlite::Connection,
  schema:   &'c EntitySchema,
  primary:  String,
  versions: String,
}

impl<'c> SqliteChain<'c> {
  pub fn new(conn: &'c rusqlite::Connection, schema: &'c EntitySchema) -> Self {
    Self {
      conn,
      schema,
      primary: quote(schema.table_name()),
      versions: quote(&schema.version_table_name()),
    }
  }

  fn query_versions(&self, clause: &str, params: Vec<Value>) -> Result<Vec<VersionRecord>> {
    let sql = format!(
      "SELECT {} FROM {} {clause}",
      version_select_list(self.schema),
      self.versions
    );
    let count = self.schema.fields.len();
    let mut stmt = self.conn.prepare(&sql)?;
    let raws = stmt
      .query_map(params_from_iter(params), |row| RawVersion::from_row(row, count))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(|raw| raw.into_version(self.schema)).collect()
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn get_record(&self, id: i64) -> Result<Option<Record>> {
    let sql = format!(
      "SELECT \"id\", {} FROM {} WHERE \"id\" = ?1",
      field_list(self.schema),
      self.primary
    );
    let count = self.schema.fields.len();
    let raw = self
      .conn
      .query_row(&sql, [id], |row| RawRecord::from_row(row, count))
      .optional()?;
    raw.map(|r| r.into_record(self.schema)).transpose()
  }

  pub fn list_records(&self) -> Result<Vec<Record>> {
    let sql = format!(
      "SELECT \"id\", {} FROM {} ORDER BY \"id\"",
      field_list(self.schema),
      self.primary
    );
    let count = self.schema.fields.len();
    let mut stmt = self.conn.prepare(&sql)?;
    let raws = stmt
      .query_map([], |row| RawRecord::from_row(row, count))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(|r| r.into_record(self.schema)).collect()
  }

  pub fn history(&self, id: i64) -> Result<Vec<VersionRecord>> {
    self.query_versions(
      "WHERE \"original_record\" = ?1 ORDER BY \"version_id\"",
      vec![Value::Integer(id)],
    )
  }

  /// The open versions of `id`, oldest first. More than one means the chain
  /// is corrupt; callers decide what to do about it.
  pub fn heads(&self, id: i64) -> Result<Vec<VersionRecord>> {
    self.query_versions(
      "WHERE \"original_record\" = ?1 AND \"valid_until\" IS NULL ORDER BY \"version_id\"",
      vec![Value::Integer(id)],
    )
  }

  pub fn version(&self, version_id: i64) -> Result<Option<VersionRecord>> {
    Ok(
      self
        .query_versions("WHERE \"version_id\" = ?1", vec![Value::Integer(version_id)])?
        .pop(),
    )
  }

  pub fn as_of(&self, id: i64, at: DateTime<Utc>) -> Result<Option<VersionRecord>> {
    let at = encode_dt(at);
    Ok(
      self
        .query_versions(
          "WHERE \"original_record\" = ?1
             AND \"valid_from\" <= ?2
             AND (\"valid_until\" IS NULL OR \"valid_until\" > ?2)
           ORDER BY \"version_id\" DESC
           LIMIT 1",
          vec![Value::Integer(id), Value::Text(at)],
        )?
        .pop(),
    )
  }

  pub fn versions(&self, query: &VersionQuery) -> Result<Vec<VersionRecord>> {
    let mut conds: Vec<String> = vec![];
    let mut params: Vec<Value> = vec![];

    if let Some(record) = query.original_record {
      params.push(Value::Integer(record));
      conds.push(format!("\"original_record\" = ?{}", params.len()));
    }
    if let Some(deleted) = query.deleted {
      params.push(Value::Integer(i64::from(deleted)));
      conds.push(format!("\"deleted\" = ?{}", params.len()));
    }
    if let Some(after) = query.after_version {
      params.push(Value::Integer(after));
      conds.push(format!("\"version_id\" > ?{}", params.len()));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    // SQLite treats a negative LIMIT as "no limit".
    let limit = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset = query.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));
    params.push(Value::Integer(limit));
    params.push(Value::Integer(offset));
    let n = params.len();

    self.query_versions(
      &format!(
        "{where_clause} ORDER BY \"version_id\" LIMIT ?{} OFFSET ?{n}",
        n - 1
      ),
      params,
    )
  }
}

// ─── Engine seams ────────────────────────────────────────────────────────────

impl ChainStorage for SqliteChain<'_> {
  type Error = Error;

  fn open_versions(&mut self, record_id: i64) -> Result<Vec<VersionMeta>> {
    let sql = format!(
      "SELECT \"version_id\", \"original_record\", \"valid_from\", \"valid_until\", \"deleted\"
       FROM {} WHERE \"original_record\" = ?1 AND \"valid_until\" IS NULL
       ORDER BY \"version_id\"",
      self.versions
    );
    let mut stmt = self.conn.prepare(&sql)?;
    let raws = stmt
      .query_map([record_id], |row| RawVersion::from_row(row, 0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    if raws.len() > 1 {
      tracing::warn!(
        entity = %self.schema.name,
        record_id,
        open_heads = raws.len(),
        "version chain has more than one open head"
      );
    }
    raws.iter().map(RawVersion::meta).collect()
  }

  fn close_version(&mut self, version_id: i64, at: DateTime<Utc>) -> Result<()> {
    let sql = format!(
      "UPDATE {} SET \"valid_until\" = ?1 WHERE \"version_id\" = ?2 AND \"valid_until\" IS NULL",
      self.versions
    );
    let changed = self
      .conn
      .execute(&sql, rusqlite::params![encode_dt(at), version_id])
      .map_err(write_failure)?;
    if changed != 1 {
      return Err(
        CoreError::WriteFailure(format!("version {version_id} is not open")).into(),
      );
    }
    tracing::debug!(entity = %self.schema.name, version_id, "closed version");
    Ok(())
  }

  fn append_version(&mut self, version: NewVersion) -> Result<VersionRecord> {
    let mut values = vec![
      Value::Integer(version.original_record),
      Value::Text(encode_dt(version.valid_from)),
      Value::Integer(i64::from(version.deleted)),
    ];
    values.extend(encode_snapshot(self.schema, &version.fields)?);

    let placeholders = (1..=values.len())
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "INSERT INTO {} (\"original_record\", \"valid_from\", \"deleted\", {}) VALUES ({placeholders})",
      self.versions,
      field_list(self.schema),
    );

    self
      .conn
      .execute(&sql, params_from_iter(values))
      .map_err(write_failure)?;
    let version_id = self.conn.last_insert_rowid();

    tracing::debug!(
      entity = %self.schema.name,
      record_id = version.original_record,
      version_id,
      deleted = version.deleted,
      "appended version"
    );
    Ok(version.into_record(version_id))
  }

  fn chain(&mut self, record_id: i64) -> Result<Vec<VersionRecord>> { self.history(record_id) }
}

impl RecordStorage for SqliteChain<'_> {
  fn insert_record(&mut self, fields: &Snapshot) -> Result<i64> {
    let values = encode_snapshot(self.schema, fields)?;
    let placeholders = (1..=values.len())
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "INSERT INTO {} ({}) VALUES ({placeholders})",
      self.primary,
      field_list(self.schema),
    );
    self.conn.execute(&sql, params_from_iter(values))?;
    Ok(self.conn.last_insert_rowid())
  }

  fn load_record(&mut self, id: i64) -> Result<Option<Snapshot>> {
    Ok(self.get_record(id)?.map(|r| r.fields))
  }

  fn update_record(&mut self, id: i64, fields: &Snapshot) -> Result<()> {
    let mut values = encode_snapshot(self.schema, fields)?;
    let assignments = self
      .schema
      .fields
      .iter()
      .enumerate()
      .map(|(i, f)| format!("{} = ?{}", quote(&f.name), i + 1))
      .collect::<Vec<_>>()
      .join(", ");
    values.push(Value::Integer(id));
    let sql = format!(
      "UPDATE {} SET {assignments} WHERE \"id\" = ?{}",
      self.primary,
      values.len()
    );
    if self.conn.execute(&sql, params_from_iter(values))? == 0 {
      return Err(CoreError::RecordNotFound(id).into());
    }
    Ok(())
  }

  fn delete_record(&mut self, id: i64) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE \"id\" = ?1", self.primary);
    if self.conn.execute(&sql, [id])? == 0 {
      return Err(CoreError::RecordNotFound(id).into());
    }
    Ok(())
  }
}

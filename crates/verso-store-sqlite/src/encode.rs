//! Encoding and decoding helpers between field values and SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with microsecond
//! precision and a `Z` suffix, so lexical order equals chronological order.
//! Dates are `YYYY-MM-DD`, booleans are `0`/`1`, JSON is compact text.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Value;
use verso_core::{
  schema::{EntitySchema, FieldKind},
  value::{FieldValue, Snapshot},
  version::{Record, VersionMeta, VersionRecord},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── FieldValue ──────────────────────────────────────────────────────────────

pub fn encode_value(value: &FieldValue) -> Result<Value> {
  Ok(match value {
    FieldValue::Null => Value::Null,
    FieldValue::Boolean(b) => Value::Integer(i64::from(*b)),
    FieldValue::Integer(i) => Value::Integer(*i),
    FieldValue::Real(r) => Value::Real(*r),
    FieldValue::Text(s) => Value::Text(s.clone()),
    FieldValue::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
    FieldValue::DateTime(dt) => Value::Text(encode_dt(*dt)),
    FieldValue::Json(j) => Value::Text(serde_json::to_string(j)?),
  })
}

pub fn decode_value(column: &str, kind: FieldKind, value: Value) -> Result<FieldValue> {
  let bad = |reason: String| Error::Decode { column: column.to_owned(), reason };

  Ok(match (kind, value) {
    (_, Value::Null) => FieldValue::Null,
    (FieldKind::Boolean, Value::Integer(i)) => FieldValue::Boolean(i != 0),
    (FieldKind::Integer, Value::Integer(i)) => FieldValue::Integer(i),
    (FieldKind::Real, Value::Real(r)) => FieldValue::Real(r),
    // SQLite may hand back whole REAL values as INTEGER.
    (FieldKind::Real, Value::Integer(i)) => FieldValue::Real(i as f64),
    (FieldKind::Text, Value::Text(s)) => FieldValue::Text(s),
    (FieldKind::Date, Value::Text(s)) => FieldValue::Date(
      NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| bad(e.to_string()))?,
    ),
    (FieldKind::DateTime, Value::Text(s)) => FieldValue::DateTime(decode_dt(&s)?),
    (FieldKind::Json, Value::Text(s)) => FieldValue::Json(serde_json::from_str(&s)?),
    (kind, other) => {
      return Err(bad(format!("{:?} is not a valid {kind}", other.data_type())));
    }
  })
}

/// Encode a snapshot's values in schema order.
pub fn encode_snapshot(schema: &EntitySchema, fields: &Snapshot) -> Result<Vec<Value>> {
  schema
    .fields
    .iter()
    .map(|def| fields.get(&def.name).map_or(Ok(Value::Null), encode_value))
    .collect()
}

fn decode_snapshot(schema: &EntitySchema, values: Vec<Value>) -> Result<Snapshot> {
  schema
    .fields
    .iter()
    .zip(values)
    .map(|(def, value)| Ok((def.name.clone(), decode_value(&def.name, def.kind, value)?)))
    .collect()
}

fn read_values(
  row: &rusqlite::Row<'_>,
  start: usize,
  count: usize,
) -> rusqlite::Result<Vec<Value>> {
  (start..start + count).map(|i| row.get(i)).collect()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a primary-table row (`id`, then fields).
pub struct RawRecord {
  pub id:     i64,
  pub values: Vec<Value>,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>, field_count: usize) -> rusqlite::Result<Self> {
    Ok(Self { id: row.get(0)?, values: read_values(row, 1, field_count)? })
  }

  pub fn into_record(self, schema: &EntitySchema) -> Result<Record> {
    Ok(Record { id: self.id, fields: decode_snapshot(schema, self.values)? })
  }
}

/// Raw values read directly from a companion-table row, in the order of
/// [`crate::schema::version_select_list`].
pub struct RawVersion {
  pub version_id:      i64,
  pub original_record: i64,
  pub valid_from:      String,
  pub valid_until:     Option<String>,
  pub deleted:         bool,
  pub values:          Vec<Value>,
}

impl RawVersion {
  pub fn from_row(row: &rusqlite::Row<'_>, field_count: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id:      row.get(0)?,
      original_record: row.get(1)?,
      valid_from:      row.get(2)?,
      valid_until:     row.get(3)?,
      deleted:         row.get(4)?,
      values:          read_values(row, 5, field_count)?,
    })
  }

  pub fn meta(&self) -> Result<VersionMeta> {
    Ok(VersionMeta {
      version_id:      self.version_id,
      original_record: self.original_record,
      valid_from:      decode_dt(&self.valid_from)?,
      valid_until:     self.valid_until.as_deref().map(decode_dt).transpose()?,
      deleted:         self.deleted,
    })
  }

  pub fn into_version(self, schema: &EntitySchema) -> Result<VersionRecord> {
    let meta = self.meta()?;
    Ok(VersionRecord { meta, fields: decode_snapshot(schema, self.values)? })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width() {
    let a = encode_dt(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    let b = encode_dt(Utc.timestamp_opt(1_700_000_000, 1_000).unwrap());
    assert_eq!(a, "2023-11-14T22:13:20.000000Z");
    assert_eq!(a.len(), b.len());
    assert!(a < b);
    assert_eq!(decode_dt(&b).unwrap(), Utc.timestamp_opt(1_700_000_000, 1_000).unwrap());
  }

  #[test]
  fn values_roundtrip_through_columns() {
    let cases = [
      (FieldKind::Boolean, FieldValue::Boolean(true)),
      (FieldKind::Integer, FieldValue::Integer(-7)),
      (FieldKind::Real, FieldValue::Real(2.5)),
      (FieldKind::Text, FieldValue::Text("Mike".into())),
      (FieldKind::Date, FieldValue::Date(NaiveDate::from_ymd_opt(2001, 2, 3).unwrap())),
      (FieldKind::Json, FieldValue::Json(json!({ "tags": ["a", "b"] }))),
      (FieldKind::Text, FieldValue::Null),
    ];
    for (kind, value) in cases {
      let column = encode_value(&value).unwrap();
      assert_eq!(decode_value("c", kind, column).unwrap(), value);
    }
  }

  #[test]
  fn mismatched_column_is_a_decode_error() {
    let err = decode_value("born", FieldKind::Date, Value::Integer(3)).unwrap_err();
    assert!(matches!(err, Error::Decode { ref column, .. } if column == "born"));
  }
}

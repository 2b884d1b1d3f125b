//! Typed field values and snapshots.
//!
//! A [`Snapshot`] is the full set of declared field values of an entity at one
//! point in time. Primary records and version records both carry one.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{Error, Result, schema::FieldKind};

/// A single stored field value.
///
/// Serialises as the plain JSON value (no type tag); decoding goes through
/// [`FieldValue::from_json`] because the declared [`FieldKind`] decides how a
/// JSON string is read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
  Null,
  Boolean(bool),
  Integer(i64),
  Real(f64),
  Text(String),
  Date(NaiveDate),
  DateTime(DateTime<Utc>),
  Json(serde_json::Value),
}

/// Field name → value, for every declared field of an entity.
pub type Snapshot = BTreeMap<String, FieldValue>;

impl FieldValue {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  /// Human-readable type name, used in mismatch errors.
  pub fn type_name(&self) -> &'static str {
    match self {
      Self::Null => "null",
      Self::Boolean(_) => "boolean",
      Self::Integer(_) => "integer",
      Self::Real(_) => "real",
      Self::Text(_) => "text",
      Self::Date(_) => "date",
      Self::DateTime(_) => "date_time",
      Self::Json(_) => "json",
    }
  }

  /// Whether a non-null value can be stored in a column of `kind`.
  pub fn matches(&self, kind: FieldKind) -> bool {
    matches!(
      (self, kind),
      (Self::Boolean(_), FieldKind::Boolean)
        | (Self::Integer(_), FieldKind::Integer)
        | (Self::Real(_), FieldKind::Real)
        | (Self::Text(_), FieldKind::Text)
        | (Self::Date(_), FieldKind::Date)
        | (Self::DateTime(_), FieldKind::DateTime)
        | (Self::Json(_), FieldKind::Json)
    )
  }

  /// Decode a JSON value supplied for `field`, which is declared as `kind`.
  ///
  /// JSON `null` always decodes to [`FieldValue::Null`]; nullability is the
  /// schema's concern.
  pub fn from_json(
    field: &str,
    kind: FieldKind,
    value: &serde_json::Value,
  ) -> Result<Self> {
    use serde_json::Value;

    let mismatch = || Error::TypeMismatch {
      field:    field.to_owned(),
      expected: kind,
      found:    json_type_name(value).to_owned(),
    };

    if value.is_null() {
      return Ok(Self::Null);
    }

    match kind {
      FieldKind::Boolean => value.as_bool().map(Self::Boolean).ok_or_else(mismatch),
      FieldKind::Integer => value.as_i64().map(Self::Integer).ok_or_else(mismatch),
      FieldKind::Real => value.as_f64().map(Self::Real).ok_or_else(mismatch),
      FieldKind::Text => match value {
        Value::String(s) => Ok(Self::Text(s.clone())),
        _ => Err(mismatch()),
      },
      FieldKind::Date => value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .map(Self::Date)
        .ok_or_else(mismatch),
      FieldKind::DateTime => value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| Self::DateTime(dt.with_timezone(&Utc)))
        .ok_or_else(mismatch),
      FieldKind::Json => Ok(Self::Json(value.clone())),
    }
  }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
  use serde_json::Value;
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<bool> for FieldValue {
  fn from(v: bool) -> Self { Self::Boolean(v) }
}

impl From<i64> for FieldValue {
  fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<f64> for FieldValue {
  fn from(v: f64) -> Self { Self::Real(v) }
}

impl From<&str> for FieldValue {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for FieldValue {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<NaiveDate> for FieldValue {
  fn from(v: NaiveDate) -> Self { Self::Date(v) }
}

impl From<DateTime<Utc>> for FieldValue {
  fn from(v: DateTime<Utc>) -> Self { Self::DateTime(v) }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn decodes_by_declared_kind() {
    assert_eq!(
      FieldValue::from_json("born", FieldKind::Date, &json!("1990-04-01")).unwrap(),
      FieldValue::Date(NaiveDate::from_ymd_opt(1990, 4, 1).unwrap()),
    );
    assert_eq!(
      FieldValue::from_json("born", FieldKind::Text, &json!("1990-04-01")).unwrap(),
      FieldValue::Text("1990-04-01".into()),
    );
    assert_eq!(
      FieldValue::from_json("score", FieldKind::Real, &json!(3)).unwrap(),
      FieldValue::Real(3.0),
    );
  }

  #[test]
  fn null_decodes_regardless_of_kind() {
    let v = FieldValue::from_json("x", FieldKind::Integer, &json!(null)).unwrap();
    assert!(v.is_null());
  }

  #[test]
  fn wrong_json_type_is_a_mismatch() {
    let err = FieldValue::from_json("age", FieldKind::Integer, &json!("ten"))
      .unwrap_err();
    assert!(matches!(
      err,
      Error::TypeMismatch { ref field, expected: FieldKind::Integer, ref found }
        if field == "age" && found == "string"
    ));
  }

  #[test]
  fn serialises_without_tag() {
    let v = serde_json::to_value(FieldValue::Text("Mike".into())).unwrap();
    assert_eq!(v, json!("Mike"));
    let v = serde_json::to_value(FieldValue::Null).unwrap();
    assert_eq!(v, json!(null));
  }
}

//! Entity schemas: the declared, typed fields of a tracked entity.
//!
//! A schema describes only the entity's own fields. The version metadata
//! columns are owned by the engine and may not be declared.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  value::{FieldValue, Snapshot},
};

/// Column names owned by the engine: the primary key of the primary table and
/// the version metadata of the companion table.
pub const RESERVED_FIELDS: &[&str] = &[
  "id",
  "version_id",
  "original_record",
  "valid_from",
  "valid_until",
  "deleted",
];

/// Suffix appended to an entity name to form its companion table name.
pub const VERSION_TABLE_SUFFIX: &str = "_versions";

// ─── Field definitions ───────────────────────────────────────────────────────

/// The storage type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
  Text,
  Integer,
  Real,
  Boolean,
  /// Calendar date, `YYYY-MM-DD`.
  Date,
  /// UTC instant, RFC 3339.
  DateTime,
  /// Arbitrary JSON document.
  Json,
}

impl FieldKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Text => "text",
      Self::Integer => "integer",
      Self::Real => "real",
      Self::Boolean => "boolean",
      Self::Date => "date",
      Self::DateTime => "date_time",
      Self::Json => "json",
    }
  }
}

impl fmt::Display for FieldKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
  pub name:     String,
  pub kind:     FieldKind,
  #[serde(default)]
  pub nullable: bool,
}

// ─── EntitySchema ────────────────────────────────────────────────────────────

/// The declared shape of a tracked entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
  /// Entity name; doubles as the primary table name.
  pub name:   String,
  pub fields: Vec<FieldDef>,
}

impl EntitySchema {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), fields: Vec::new() }
  }

  /// Builder-style: declare a required field.
  pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
    self.fields.push(FieldDef { name: name.into(), kind, nullable: false });
    self
  }

  /// Builder-style: declare a nullable field.
  pub fn nullable_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
    self.fields.push(FieldDef { name: name.into(), kind, nullable: true });
    self
  }

  pub fn table_name(&self) -> &str { &self.name }

  pub fn version_table_name(&self) -> String {
    format!("{}{VERSION_TABLE_SUFFIX}", self.name)
  }

  pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
    self.fields.iter().find(|f| f.name == name)
  }

  /// Check that the schema can be bound to storage.
  ///
  /// Names must be plain identifiers, field names must be unique (SQL column
  /// names are case-insensitive) and must not collide with
  /// [`RESERVED_FIELDS`].
  pub fn validate(&self) -> Result<()> {
    if !is_identifier(&self.name) {
      return Err(Error::InvalidSchema(format!(
        "entity name {:?} is not a valid identifier",
        self.name
      )));
    }
    if self.name.to_ascii_lowercase().ends_with(VERSION_TABLE_SUFFIX) {
      return Err(Error::InvalidSchema(format!(
        "entity name {:?} may not end with {VERSION_TABLE_SUFFIX:?}",
        self.name
      )));
    }
    if self.fields.is_empty() {
      return Err(Error::InvalidSchema(format!(
        "entity {:?} declares no fields",
        self.name
      )));
    }

    let mut seen: Vec<String> = Vec::with_capacity(self.fields.len());
    for field in &self.fields {
      if !is_identifier(&field.name) {
        return Err(Error::InvalidSchema(format!(
          "field name {:?} is not a valid identifier",
          field.name
        )));
      }
      let lowered = field.name.to_ascii_lowercase();
      if RESERVED_FIELDS.contains(&lowered.as_str()) {
        return Err(Error::ReservedField(field.name.clone()));
      }
      if seen.contains(&lowered) {
        return Err(Error::InvalidSchema(format!(
          "field {:?} is declared twice",
          field.name
        )));
      }
      seen.push(lowered);
    }
    Ok(())
  }

  /// Validate a full snapshot for a new record. Missing nullable fields are
  /// filled with [`FieldValue::Null`].
  pub fn complete(&self, mut fields: Snapshot) -> Result<Snapshot> {
    self.check_known(&fields)?;
    for def in &self.fields {
      match fields.get(&def.name) {
        Some(value) => check_value(def, value)?,
        None if def.nullable => {
          fields.insert(def.name.clone(), FieldValue::Null);
        }
        None => return Err(Error::MissingField(def.name.clone())),
      }
    }
    Ok(fields)
  }

  /// Merge a partial update into `current`, validating every patched value.
  pub fn apply_patch(&self, current: &Snapshot, patch: Snapshot) -> Result<Snapshot> {
    self.check_known(&patch)?;
    let mut merged = current.clone();
    for (name, value) in patch {
      if let Some(def) = self.field_def(&name) {
        check_value(def, &value)?;
      }
      merged.insert(name, value);
    }
    Ok(merged)
  }

  /// Decode a JSON object into a (possibly partial) snapshot.
  pub fn decode_json(
    &self,
    object: &serde_json::Map<String, serde_json::Value>,
  ) -> Result<Snapshot> {
    object
      .iter()
      .map(|(name, value)| {
        let def = self
          .field_def(name)
          .ok_or_else(|| Error::UnknownField(name.clone()))?;
        Ok((name.clone(), FieldValue::from_json(name, def.kind, value)?))
      })
      .collect()
  }

  fn check_known(&self, fields: &Snapshot) -> Result<()> {
    match fields.keys().find(|name| self.field_def(name).is_none()) {
      Some(unknown) => Err(Error::UnknownField(unknown.clone())),
      None => Ok(()),
    }
  }
}

fn check_value(def: &FieldDef, value: &FieldValue) -> Result<()> {
  let mismatch = |found: &str| Error::TypeMismatch {
    field:    def.name.clone(),
    expected: def.kind,
    found:    found.to_owned(),
  };
  match value {
    FieldValue::Null if def.nullable => Ok(()),
    // SQLite has no representation for NaN or infinities.
    FieldValue::Real(r) if !r.is_finite() => Err(mismatch("non-finite real")),
    v if !v.is_null() && v.matches(def.kind) => Ok(()),
    v => Err(mismatch(v.type_name())),
  }
}

fn is_identifier(s: &str) -> bool {
  let mut chars = s.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
  use super::*;

  fn person() -> EntitySchema {
    EntitySchema::new("person")
      .field("name", FieldKind::Text)
      .field("is_relative", FieldKind::Boolean)
      .nullable_field("nickname", FieldKind::Text)
  }

  #[test]
  fn valid_schema_passes() {
    person().validate().unwrap();
    assert_eq!(person().version_table_name(), "person_versions");
  }

  #[test]
  fn reserved_field_rejected() {
    for reserved in ["valid_from", "Deleted", "ID", "original_record"] {
      let err = person()
        .field(reserved, FieldKind::Text)
        .validate()
        .unwrap_err();
      assert!(matches!(err, Error::ReservedField(ref f) if f == reserved));
    }
  }

  #[test]
  fn duplicate_and_malformed_names_rejected() {
    let dup = person().field("NAME", FieldKind::Text);
    assert!(matches!(dup.validate(), Err(Error::InvalidSchema(_))));

    let bad = EntitySchema::new("person; drop").field("name", FieldKind::Text);
    assert!(matches!(bad.validate(), Err(Error::InvalidSchema(_))));

    let suffixed = EntitySchema::new("person_versions").field("name", FieldKind::Text);
    assert!(matches!(suffixed.validate(), Err(Error::InvalidSchema(_))));

    let empty = EntitySchema::new("person");
    assert!(matches!(empty.validate(), Err(Error::InvalidSchema(_))));
  }

  #[test]
  fn complete_fills_nullable_and_requires_the_rest() {
    let schema = person();
    let full = schema
      .complete(Snapshot::from([
        ("name".to_owned(), "Mike".into()),
        ("is_relative".to_owned(), false.into()),
      ]))
      .unwrap();
    assert_eq!(full.get("nickname"), Some(&FieldValue::Null));

    let err = schema
      .complete(Snapshot::from([("name".to_owned(), "Mike".into())]))
      .unwrap_err();
    assert!(matches!(err, Error::MissingField(ref f) if f == "is_relative"));
  }

  #[test]
  fn null_in_required_field_is_a_mismatch() {
    let err = person()
      .complete(Snapshot::from([
        ("name".to_owned(), FieldValue::Null),
        ("is_relative".to_owned(), false.into()),
      ]))
      .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { ref field, .. } if field == "name"));
  }

  #[test]
  fn non_finite_reals_are_rejected() {
    let schema = EntitySchema::new("reading").field("x", FieldKind::Real);
    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
      let err = schema
        .complete(Snapshot::from([("x".to_owned(), bad.into())]))
        .unwrap_err();
      assert!(matches!(err, Error::TypeMismatch { ref field, .. } if field == "x"));
    }
    let current = schema
      .complete(Snapshot::from([("x".to_owned(), 1.5.into())]))
      .unwrap();
    let err = schema
      .apply_patch(&current, Snapshot::from([("x".to_owned(), f64::NAN.into())]))
      .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
  }

  #[test]
  fn patch_rejects_unknown_fields() {
    let schema = person();
    let current = Snapshot::from([("name".to_owned(), "Mike".into())]);
    let err = schema
      .apply_patch(&current, Snapshot::from([("age".to_owned(), 3_i64.into())]))
      .unwrap_err();
    assert!(matches!(err, Error::UnknownField(ref f) if f == "age"));
  }

  #[test]
  fn deserialises_from_config_shape() {
    let schema: EntitySchema = serde_json::from_value(serde_json::json!({
      "name": "person",
      "fields": [
        { "name": "name", "kind": "text" },
        { "name": "born", "kind": "date", "nullable": true },
      ],
    }))
    .unwrap();
    assert_eq!(schema.fields[1].kind, FieldKind::Date);
    assert!(schema.fields[1].nullable);
    assert!(!schema.fields[0].nullable);
  }
}

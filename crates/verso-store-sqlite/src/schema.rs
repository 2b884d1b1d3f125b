//! SQL schema generation for bound entities.
//!
//! Each entity owns two tables: the primary table named after the entity and
//! its `<name>_versions` companion. Both use `AUTOINCREMENT` so neither a
//! record id nor a `version_id` is ever handed out twice, even after deletes.
//!
//! The companion table declares no foreign key to the primary table; history
//! must outlive the record it describes.

use verso_core::schema::{EntitySchema, FieldKind};

/// Connection-level settings, executed once at open.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Version metadata columns, in the order every version query selects them.
pub const META_COLUMNS: [&str; 5] =
  ["version_id", "original_record", "valid_from", "valid_until", "deleted"];

/// Double-quote an identifier. Schema validation already restricts names to
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub fn quote(ident: &str) -> String { format!("\"{ident}\"") }

fn column_type(kind: FieldKind) -> &'static str {
  match kind {
    FieldKind::Integer | FieldKind::Boolean => "INTEGER",
    FieldKind::Real => "REAL",
    // Dates and instants are fixed-width ISO 8601 text; JSON is compact text.
    FieldKind::Text | FieldKind::Date | FieldKind::DateTime | FieldKind::Json => {
      "TEXT"
    }
  }
}

fn field_columns(schema: &EntitySchema) -> String {
  schema
    .fields
    .iter()
    .map(|f| {
      let null = if f.nullable { "" } else { " NOT NULL" };
      format!(",\n    {} {}{null}", quote(&f.name), column_type(f.kind))
    })
    .collect()
}

/// DDL for both tables and the companion indexes; idempotent.
pub fn create_tables(schema: &EntitySchema) -> String {
  let primary = quote(schema.table_name());
  let versions_name = schema.version_table_name();
  let versions = quote(&versions_name);
  let columns = field_columns(schema);
  let record_idx = quote(&format!("{versions_name}_record_idx"));
  let from_idx = quote(&format!("{versions_name}_valid_from_idx"));

  format!(
    "
CREATE TABLE IF NOT EXISTS {primary} (
    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT{columns}
);

-- Append-only apart from the one-time close of valid_until.
CREATE TABLE IF NOT EXISTS {versions} (
    \"version_id\"      INTEGER PRIMARY KEY AUTOINCREMENT,
    \"original_record\" INTEGER NOT NULL,
    \"valid_from\"      TEXT    NOT NULL,   -- RFC 3339 UTC, microseconds
    \"valid_until\"     TEXT,               -- NULL while this is the head
    \"deleted\"         INTEGER NOT NULL DEFAULT 0{columns}
);

CREATE INDEX IF NOT EXISTS {record_idx} ON {versions}(\"original_record\", \"version_id\");
CREATE INDEX IF NOT EXISTS {from_idx} ON {versions}(\"valid_from\");
"
  )
}

/// DDL dropping both tables.
pub fn drop_tables(schema: &EntitySchema) -> String {
  format!(
    "DROP TABLE IF EXISTS {};\nDROP TABLE IF EXISTS {};",
    quote(&schema.version_table_name()),
    quote(schema.table_name()),
  )
}

/// Comma-separated quoted field columns, in schema order.
pub fn field_list(schema: &EntitySchema) -> String {
  schema
    .fields
    .iter()
    .map(|f| quote(&f.name))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Select list for version rows: metadata first, then fields.
pub fn version_select_list(schema: &EntitySchema) -> String {
  let meta = META_COLUMNS.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
  format!("{meta}, {}", field_list(schema))
}

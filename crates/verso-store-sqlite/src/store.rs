//! [`SqliteStore`] — a SQLite database that entity schemas are bound to.

use std::{path::Path, sync::Arc};

use verso_core::{
  clock::{Clock, MonotonicClock, SystemClock},
  schema::EntitySchema,
};

use crate::{Result, collection::SqliteCollection, schema};

/// A Verso store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every
/// collection bound from one store shares its connection and clock.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  clock: Arc<dyn Clock>,
}

impl SqliteStore {
  /// Open (or create) a store at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(schema::PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, clock: Arc::new(MonotonicClock::new(SystemClock)) })
  }

  /// Replace the timestamp source. Collections bound afterwards use it.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Validate `schema`, create its primary and companion tables if missing,
  /// and return a handle for versioned access to them.
  pub async fn bind(&self, schema: EntitySchema) -> Result<SqliteCollection> {
    schema.validate()?;
    let ddl = schema::create_tables(&schema);
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;

    tracing::info!(
      entity = %schema.name,
      fields = schema.fields.len(),
      "bound versioned entity"
    );
    Ok(SqliteCollection::new(self.conn.clone(), schema, self.clock.clone()))
  }
}

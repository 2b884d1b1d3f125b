//! JSON REST API for Verso.
//!
//! Exposes an axum [`Router`] over a registry of bound
//! [`VersionedCollection`]s, one per tracked entity type. Auth, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", verso_api::api_router(Arc::new(collections)))
//! ```

pub mod error;
pub mod records;
pub mod versions;

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  extract::State,
  routing::{get, post},
};
use serde::Deserialize;
use verso_core::{schema::EntitySchema, store::VersionedCollection};

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `verso.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite file; `:memory:` for a throwaway in-memory store.
  pub store_path: PathBuf,
  #[serde(default)]
  pub entities:   Vec<EntitySchema>,
}

// ─── Registry ─────────────────────────────────────────────────────────────────

/// The bound collections served by the API, keyed by entity name.
pub struct Collections<C> {
  by_name: BTreeMap<String, C>,
}

impl<C> Default for Collections<C> {
  fn default() -> Self { Self { by_name: BTreeMap::new() } }
}

impl<C: VersionedCollection> Collections<C> {
  pub fn new() -> Self { Self::default() }

  /// Register `collection` under its schema's name, replacing any previous
  /// collection of that name.
  pub fn insert(&mut self, collection: C) {
    self
      .by_name
      .insert(collection.schema().name.clone(), collection);
  }

  pub fn get(&self, entity: &str) -> Result<&C, ApiError> {
    self
      .by_name
      .get(entity)
      .ok_or_else(|| ApiError::NotFound(format!("unknown entity {entity:?}")))
  }

  pub fn schemas(&self) -> impl Iterator<Item = &EntitySchema> {
    self.by_name.values().map(|c| c.schema())
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `collections`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<C>(collections: Arc<Collections<C>>) -> Router<()>
where
  C: VersionedCollection + 'static,
{
  Router::new()
    .route("/entities", get(list_entities::<C>))
    // Primary records
    .route(
      "/entities/{entity}/records",
      get(records::list::<C>).post(records::create::<C>),
    )
    .route(
      "/entities/{entity}/records/{id}",
      get(records::get_one::<C>)
        .patch(records::update::<C>)
        .delete(records::delete_one::<C>),
    )
    .route("/entities/{entity}/records/{id}/versions", get(records::history::<C>))
    .route("/entities/{entity}/records/{id}/as_of", get(records::as_of::<C>))
    .route("/entities/{entity}/records/{id}/revert", post(records::revert::<C>))
    // Type-level history
    .route("/entities/{entity}/versions", get(versions::list::<C>))
    .route("/entities/{entity}/versions/{version_id}", get(versions::get_one::<C>))
    .with_state(collections)
}

/// `GET /entities`
async fn list_entities<C>(
  State(collections): State<Arc<Collections<C>>>,
) -> Json<Vec<EntitySchema>>
where
  C: VersionedCollection,
{
  Json(collections.schemas().cloned().collect())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

//! Handlers for `/entities/{entity}/versions` endpoints: the companion table
//! of one entity type, across all of its records.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/versions` | `?original_record=&deleted=&after=&limit=&offset=` |
//! | `GET`  | `/versions/{version_id}` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use verso_core::{
  store::{VersionQuery, VersionedCollection},
  version::VersionRecord,
};

use crate::{Collections, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub original_record: Option<i64>,
  pub deleted:         Option<bool>,
  /// Only versions with a greater `version_id`.
  pub after:           Option<i64>,
  pub limit:           Option<usize>,
  pub offset:          Option<usize>,
}

impl From<ListParams> for VersionQuery {
  fn from(p: ListParams) -> Self {
    VersionQuery {
      original_record: p.original_record,
      deleted:         p.deleted,
      after_version:   p.after,
      limit:           p.limit,
      offset:          p.offset,
    }
  }
}

/// `GET /entities/{entity}/versions[?…]`
pub async fn list<C>(
  State(collections): State<Arc<Collections<C>>>,
  Path(entity): Path<String>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<VersionRecord>>, ApiError>
where
  C: VersionedCollection,
{
  let query = VersionQuery::from(params);
  let versions = collections
    .get(&entity)?
    .versions(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(versions))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /entities/{entity}/versions/{version_id}`
pub async fn get_one<C>(
  State(collections): State<Arc<Collections<C>>>,
  Path((entity, version_id)): Path<(String, i64)>,
) -> Result<Json<VersionRecord>, ApiError>
where
  C: VersionedCollection,
{
  let version = collections
    .get(&entity)?
    .version(version_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("version {version_id} not found")))?;
  Ok(Json(version))
}

//! Handlers for `/entities/{entity}/records` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/records` | All live records |
//! | `POST`   | `/records` | Body: field object; 201 with record and version |
//! | `GET`    | `/records/{id}` | 404 if missing or deleted |
//! | `PATCH`  | `/records/{id}` | Body: partial field object |
//! | `DELETE` | `/records/{id}` | Returns the delete marker |
//! | `GET`    | `/records/{id}/versions` | Full chain, oldest first |
//! | `GET`    | `/records/{id}/as_of` | `?at=<RFC 3339>` |
//! | `POST`   | `/records/{id}/revert` | Body: `{"target": 3}` or `{"target": -1}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use verso_core::{
  revert::RevertTarget,
  store::VersionedCollection,
  version::{Record, VersionRecord},
};

use crate::{Collections, error::ApiError};

/// The result of a create, update, or revert.
#[derive(Debug, Serialize)]
pub struct Mutated {
  pub record:  Record,
  pub version: VersionRecord,
}

impl From<(Record, VersionRecord)> for Mutated {
  fn from((record, version): (Record, VersionRecord)) -> Self { Self { record, version } }
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /entities/{entity}/records`
pub async fn list<C>(
  State(collections): State<Arc<Collections<C>>>,
  Path(entity): Path<String>,
) -> Result<Json<Vec<Record>>, ApiError>
where
  C: VersionedCollection,
{
  let records = collections
    .get(&entity)?
    .list()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /entities/{entity}/records`
pub async fn create<C>(
  State(collections): State<Arc<Collections<C>>>,
  Path(entity): Path<String>,
  Json(body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError>
where
  C: VersionedCollection,
{
  let collection = collections.get(&entity)?;
  let fields = collection.schema().decode_json(&body)?;
  let created = collection.create(fields).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(Mutated::from(created))))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /entities/{entity}/records/{id}`
pub async fn get_one<C>(
  State(collections): State<Arc<Collections<C>>>,
  Path((entity, id)): Path<(String, i64)>,
) -> Result<Json<Record>, ApiError>
where
  C: VersionedCollection,
{
  let record = collections
    .get(&entity)?
    .get(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("{entity} {id} not found")))?;
  Ok(Json(record))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /entities/{entity}/records/{id}`
pub async fn update<C>(
  State(collections): State<Arc<Collections<C>>>,
  Path((entity, id)): Path<(String, i64)>,
  Json(body): Json<Map<String, Value>>,
) -> Result<Json<Mutated>, ApiError>
where
  C: VersionedCollection,
{
  let collection = collections.get(&entity)?;
  let patch = collection.schema().decode_json(&body)?;
  let updated = collection.update(id, patch).await.map_err(ApiError::store)?;
  Ok(Json(updated.into()))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /entities/{entity}/records/{id}`
pub async fn delete_one<C>(
  State(collections): State<Arc<Collections<C>>>,
  Path((entity, id)): Path<(String, i64)>,
) -> Result<Json<VersionRecord>, ApiError>
where
  C: VersionedCollection,
{
  let marker = collections
    .get(&entity)?
    .delete(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(marker))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /entities/{entity}/records/{id}/versions`
pub async fn history<C>(
  State(collections): State<Arc<Collections<C>>>,
  Path((entity, id)): Path<(String, i64)>,
) -> Result<Json<Vec<VersionRecord>>, ApiError>
where
  C: VersionedCollection,
{
  let chain = collections
    .get(&entity)?
    .history(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(chain))
}

#[derive(Debug, Deserialize)]
pub struct AsOfParams {
  pub at: DateTime<Utc>,
}

/// `GET /entities/{entity}/records/{id}/as_of?at=<instant>`
pub async fn as_of<C>(
  State(collections): State<Arc<Collections<C>>>,
  Path((entity, id)): Path<(String, i64)>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<VersionRecord>, ApiError>
where
  C: VersionedCollection,
{
  let version = collections
    .get(&entity)?
    .as_of(id, params.at)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("{entity} {id} has no version at {}", params.at))
    })?;
  Ok(Json(version))
}

// ─── Revert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RevertBody {
  /// Positive: a `version_id` of this record. Negative: steps back from the
  /// head. Zero is rejected with 422.
  pub target: i64,
}

/// `POST /entities/{entity}/records/{id}/revert`
pub async fn revert<C>(
  State(collections): State<Arc<Collections<C>>>,
  Path((entity, id)): Path<(String, i64)>,
  Json(body): Json<RevertBody>,
) -> Result<Json<Mutated>, ApiError>
where
  C: VersionedCollection,
{
  let collection = collections.get(&entity)?;
  let target = RevertTarget::try_from(body.target)?;
  let reverted = collection
    .revert(id, target)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(reverted.into()))
}

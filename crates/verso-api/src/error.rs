//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use verso_core::AsCoreError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// The record's version chain does not allow the operation.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unprocessable: {0}")]
  Unprocessable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error by the engine error it carries, if any.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + AsCoreError + Send + Sync + 'static,
  {
    match e.as_core().and_then(classify) {
      Some(api) => api,
      None => ApiError::Store(Box::new(e)),
    }
  }
}

impl From<verso_core::Error> for ApiError {
  fn from(e: verso_core::Error) -> Self {
    classify(&e).unwrap_or_else(|| ApiError::Store(Box::new(e)))
  }
}

fn classify(e: &verso_core::Error) -> Option<ApiError> {
  use verso_core::Error as E;

  let message = e.to_string();
  match e {
    E::RecordNotFound(_) | E::UnknownVersion { .. } => Some(ApiError::NotFound(message)),
    E::RevertAfterDelete(_) | E::ChainTerminated(_) | E::ChainCorruption { .. } => {
      Some(ApiError::Conflict(message))
    }
    E::InvalidSchema(_)
    | E::ReservedField(_)
    | E::UnknownField(_)
    | E::MissingField(_)
    | E::TypeMismatch { .. }
    | E::RevertOutOfRange { .. }
    | E::NotAVersionTarget => Some(ApiError::Unprocessable(message)),
    E::WriteFailure(_) | E::Serialization(_) => None,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn chain_errors_map_to_statuses() {
    let status = |e: verso_core::Error| ApiError::from(e).into_response().status();
    assert_eq!(status(verso_core::Error::RecordNotFound(1)), StatusCode::NOT_FOUND);
    assert_eq!(status(verso_core::Error::RevertAfterDelete(1)), StatusCode::CONFLICT);
    assert_eq!(
      status(verso_core::Error::RevertOutOfRange { record_id: 1, steps: 4, available: 1 }),
      StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
      status(verso_core::Error::WriteFailure("disk full".into())),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }
}

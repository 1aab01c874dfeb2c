//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tether_core::Error;
use thiserror::Error as ThisError;

/// A core error crossing the HTTP boundary.
#[derive(Debug, ThisError)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self.0 {
      Error::SourceNotFound(_)
      | Error::EntityNotFound { .. }
      | Error::MergeUnknownEntity(_) => StatusCode::NOT_FOUND,

      Error::LinkDuplicate { .. } | Error::MergeConflict => StatusCode::CONFLICT,

      Error::LinkSelfEdge(_) | Error::StrategyMissing { .. } => {
        StatusCode::BAD_REQUEST
      }

      Error::KindUnknown(_)
      | Error::MergeConfigIncomplete { .. }
      | Error::Backend(_)
      | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(json!({ "error": self.0.to_string() }))).into_response()
  }
}

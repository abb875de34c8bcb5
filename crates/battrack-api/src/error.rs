//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use battrack_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  /// The request body was not the JSON the endpoint expects.
  #[error(transparent)]
  Body(#[from] JsonRejection),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::Core(e) => match e {
        CoreError::InvalidCodeFormat { .. }
        | CoreError::InvalidInput(_)
        | CoreError::InvalidWarrantyPeriod { .. } => StatusCode::BAD_REQUEST,
        CoreError::IllegalTransition { .. } | CoreError::DuplicateEvent { .. } => {
          StatusCode::CONFLICT
        }
        CoreError::NoSaleRecorded { .. } => StatusCode::NOT_FOUND,
        CoreError::Ledger(_) | CoreError::Serialization(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
      ApiError::Body(JsonRejection::MissingJsonContentType(_)) => {
        StatusCode::UNSUPPORTED_MEDIA_TYPE
      }
      ApiError::Body(_) => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let err = match &self {
      ApiError::Core(err) => err,
      ApiError::Body(rejection) => {
        let body = json!({
          "error":   "invalid_input",
          "message": rejection.body_text(),
        });
        return (status, Json(body)).into_response();
      }
    };

    if status.is_server_error() {
      tracing::error!(error = %err, "request failed");
    }

    let mut body = json!({
      "error":   err.kind(),
      "message": err.to_string(),
    });
    match err {
      CoreError::IllegalTransition { code, stage, attempted } => {
        body["code"] = json!(code);
        body["stage"] = json!(stage);
        body["attempted"] = json!(attempted);
      }
      CoreError::DuplicateEvent { code, kind } => {
        body["code"] = json!(code);
        body["attempted"] = json!(kind);
      }
      CoreError::NoSaleRecorded { code, stage } => {
        body["code"] = json!(code);
        body["stage"] = json!(stage);
      }
      _ => {}
    }

    (status, Json(body)).into_response()
  }
}

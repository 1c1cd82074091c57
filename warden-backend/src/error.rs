use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use warden_db::DbError;

use crate::roster::RosterError;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      details: None,
    }
  }

  pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      details: Some(details.into()),
    }
  }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
  DatabaseError(DbError),
  RosterError(RosterError),
  ValidationError(String),
  ServerNotFound(String),
}

fn database_error(db_err: DbError) -> Response {
  match db_err {
    DbError::InvalidDocumentId(id) => {
      tracing::warn!(%id, "Rejected document id");
      let error_response = ErrorResponse::with_details("Invalid identifier", id);
      (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
    }
    DbError::Sqlite(_) | DbError::Connection(_) | DbError::Json(_) => {
      // Don't expose internal database errors
      tracing::error!(?db_err, "Internal database error");
      let error_response =
        ErrorResponse::new("An internal error occurred. Please try again later.");
      (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response)).into_response()
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    match self {
      AppError::DatabaseError(db_err) | AppError::RosterError(RosterError::Store(db_err)) => {
        database_error(db_err)
      }
      AppError::RosterError(err) => {
        let status = match err {
          RosterError::PlayerNotFound(_) | RosterError::AccountNotFound { .. } => {
            StatusCode::NOT_FOUND
          }
          RosterError::AccountAlreadyExists { .. } => StatusCode::CONFLICT,
          RosterError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse::new(err.to_string()))).into_response()
      }
      AppError::ValidationError(msg) => {
        tracing::warn!(validation_error = %msg, "Validation failed");
        let error_response = ErrorResponse::new(msg);
        (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
      }
      AppError::ServerNotFound(ip) => {
        let error_response = ErrorResponse::with_details("Server not found", ip);
        (StatusCode::NOT_FOUND, Json(error_response)).into_response()
      }
    }
  }
}

impl From<DbError> for AppError {
  fn from(err: DbError) -> Self {
    AppError::DatabaseError(err)
  }
}

impl From<RosterError> for AppError {
  fn from(err: RosterError) -> Self {
    AppError::RosterError(err)
  }
}

impl From<crate::validation::ValidationError> for AppError {
  fn from(err: crate::validation::ValidationError) -> Self {
    AppError::ValidationError(err.to_string())
  }
}

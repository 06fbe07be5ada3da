//! Maps errors to RFC 9457 problem details.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::extract::Json;
use crate::link_preview::PreviewError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("A valid session is required")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("{1}")]
    Rejected(StatusCode, String),

    #[error(transparent)]
    Domain(#[from] shelfwise_common::Error),
}

pub type ApiResult<T> = Result<Json<T>, AppError>;

#[derive(Debug, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_uri: String,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            type_uri: format!("https://httpstatuses.io/{}", status.as_u16()),
            title: title.into(),
            status: status.as_u16(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<PreviewError> for AppError {
    fn from(error: PreviewError) -> Self {
        match error {
            PreviewError::InvalidUrl(_) => AppError::BadRequest(error.to_string()),
            _ => AppError::Upstream(error.to_string()),
        }
    }
}

impl AppError {
    fn problem(self) -> Problem {
        use shelfwise_common::Error as Domain;

        match self {
            AppError::Unauthorized => {
                Problem::new(StatusCode::UNAUTHORIZED, "Unauthorized").with_detail(self.to_string())
            }
            AppError::BadRequest(detail) => {
                Problem::new(StatusCode::BAD_REQUEST, "Bad Request").with_detail(detail)
            }
            AppError::Rejected(status, detail) => {
                Problem::new(status, status.canonical_reason().unwrap_or("Bad Request"))
                    .with_detail(detail)
            }
            AppError::Upstream(detail) => {
                warn!("Upstream failure: {detail}");
                Problem::new(StatusCode::BAD_GATEWAY, "Bad Gateway").with_detail(detail)
            }
            AppError::Domain(error) => match error {
                Domain::NotFound(what) => Problem::new(StatusCode::NOT_FOUND, "Not Found")
                    .with_detail(format!("{what} not found")),
                Domain::Forbidden(detail) => {
                    Problem::new(StatusCode::FORBIDDEN, "Forbidden").with_detail(detail)
                }
                Domain::Invalid(detail) => {
                    Problem::new(StatusCode::BAD_REQUEST, "Validation Error").with_detail(detail)
                }
                Domain::Conflict(detail) => {
                    Problem::new(StatusCode::CONFLICT, "Conflict").with_detail(detail)
                }
                Domain::Database(e) => {
                    error!("Database error: {e:?}");
                    Problem::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                        .with_detail("An unexpected error occurred")
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.problem().into_response()
    }
}

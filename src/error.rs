//! Request-level failures and their HTTP mapping.
//!
//! Upstream trouble (a dead feed, a slow article page, a failing translator) never
//! shows up here; only conditions that make the whole request unanswerable do.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::article::{Category, Region};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid request")]
    InvalidRequest(String),
    #[error("no feeds configured")]
    NoFeedsConfigured { region: Region, category: Category },
    #[error("no content available")]
    NoContent { attempted: usize, yielded: usize },
}

/// `{error, details?}` wire shape.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl GenerateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GenerateError::InvalidRequest(_) | GenerateError::NoFeedsConfigured { .. } => {
                StatusCode::BAD_REQUEST
            }
            GenerateError::NoContent { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn details(&self) -> Option<String> {
        match self {
            GenerateError::InvalidRequest(d) => Some(d.clone()).filter(|d| !d.is_empty()),
            GenerateError::NoFeedsConfigured { region, category } => {
                Some(format!("no feeds registered for {region}/{category}"))
            }
            GenerateError::NoContent { attempted, yielded } => {
                Some(format!("attempted {attempted} feeds, {yielded} yielded items"))
            }
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            details: self.details(),
        }
    }
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

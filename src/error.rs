// src/error.rs
//! Request-scoped failures and their uniform `{error, details}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::Upstream;
use crate::upstream::UpstreamFailure;

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// Detected before any network call.
    #[error("{upstream} is not configured (missing {})", .missing.join(", "))]
    ConfigMissing {
        upstream: Upstream,
        missing: Vec<&'static str>,
    },

    #[error(transparent)]
    Upstream(#[from] UpstreamFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub details: String,
}

impl AggregatorError {
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            AggregatorError::ConfigMissing { upstream, missing } => ErrorEnvelope {
                error: format!("{upstream} is not configured"),
                details: format!(
                    "missing {}; add it to your .env file",
                    missing.join(", ")
                ),
            },
            AggregatorError::Upstream(failure) => ErrorEnvelope {
                error: match failure.upstream() {
                    Upstream::NewsApi => "Failed to fetch news from NewsAPI".to_string(),
                    Upstream::Chartbeat => {
                        "Failed to fetch top stories from Chartbeat".to_string()
                    }
                },
                details: failure.to_string(),
            },
        }
    }
}

impl IntoResponse for AggregatorError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}

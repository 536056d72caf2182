use crate::messages::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Failures raised while producing a summary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SummarizeError {
    /// Tokenization, generation or decoding failed inside the model.
    #[error("{0}")]
    Generation(String),
    /// The inference thread is gone and no longer accepts work.
    #[error("inference engine stopped")]
    EngineStopped,
}

/// Errors surfaced by the HTTP handlers, rendered as `{"error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Summarization failed: {0}")]
    Summarize(SummarizeError),
    #[error("Batch summarization failed: {0}")]
    BatchSummarize(SummarizeError),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Summarize(_) | ApiError::BatchSummarize(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::InvalidRequest(message) => log::debug!("Rejected request: {}", message),
            _ => log::error!("{}", self),
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        let err = ApiError::invalid("No text provided");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "No text provided");
    }

    #[test]
    fn generation_errors_embed_the_cause() {
        let err = ApiError::Summarize(SummarizeError::Generation("out of memory".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Summarization failed: out of memory");

        let err = ApiError::BatchSummarize(SummarizeError::EngineStopped);
        assert_eq!(
            err.to_string(),
            "Batch summarization failed: inference engine stopped"
        );
    }
}

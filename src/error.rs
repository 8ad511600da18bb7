use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Everything a request handler can fail with. Anything that is not a
/// missing zipcode or a rejected credential collapses into `Prediction`,
/// whose message is passed through to the client verbatim.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Zipcode {0} not found.")]
    ZipcodeNotFound(u32),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Prediction(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Prediction(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::ZipcodeNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Prediction(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zipcode_message_names_the_zipcode() {
        let err = ApiError::ZipcodeNotFound(99999);
        assert_eq!(err.to_string(), "Zipcode 99999 not found.");
    }

    #[test]
    fn anyhow_errors_keep_their_text() {
        let err: ApiError = anyhow::anyhow!("feature length mismatch: got 3, expected 33").into();
        match err {
            ApiError::Prediction(msg) => {
                assert_eq!(msg, "feature length mismatch: got 3, expected 33")
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}

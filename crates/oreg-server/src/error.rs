//! Server errors and their HTTP mapping.
//!
//! Clients see a status code and an OCI error envelope with a fixed message
//! per code. The underlying cause goes to the log only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use oreg_storage::StorageError;
use oreg_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid digest: {0}")]
    InvalidDigest(#[from] TypeError),

    #[error("invalid repository name: {0}")]
    NameInvalid(String),

    #[error("repository not found: {0}")]
    RepoNotFound(String),

    #[error("referrers not supported by repository {0}")]
    ReferrersUnsupported(String),

    #[error("no route for {0}")]
    RouteNotFound(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl From<StorageError> for ServerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidDigest(e) => Self::InvalidDigest(e),
            StorageError::InvalidName { name, .. } => Self::NameInvalid(name),
            StorageError::ReferrerEnumerationUnsupported(name) => Self::ReferrersUnsupported(name),
            other => Self::Storage(other),
        }
    }
}

impl ServerError {
    /// HTTP status, OCI error code, and client-facing message.
    pub fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            Self::InvalidDigest(_) => (
                StatusCode::BAD_REQUEST,
                "DIGEST_INVALID",
                "provided digest is invalid",
            ),
            Self::NameInvalid(_) => (
                StatusCode::BAD_REQUEST,
                "NAME_INVALID",
                "invalid repository name",
            ),
            Self::RepoNotFound(_) => (
                StatusCode::NOT_FOUND,
                "NAME_UNKNOWN",
                "repository name not known to registry",
            ),
            Self::ReferrersUnsupported(_) | Self::RouteNotFound(_) => (
                StatusCode::NOT_FOUND,
                "UNSUPPORTED",
                "the operation is unsupported",
            ),
            Self::Storage(_)
            | Self::Encoding(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UNKNOWN",
                "unknown error",
            ),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::debug!(error = %self, code, "request rejected");
        }
        let body = serde_json::json!({
            "errors": [{
                "code": code,
                "message": message,
            }]
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_status() {
        let invalid: ServerError =
            StorageError::from(oreg_types::Digest::parse("x").unwrap_err()).into();
        assert_eq!(invalid.parts().0, StatusCode::BAD_REQUEST);

        let unsupported: ServerError =
            StorageError::ReferrerEnumerationUnsupported("app".into()).into();
        assert_eq!(unsupported.parts().0, StatusCode::NOT_FOUND);

        let corrupt: ServerError = StorageError::LinkCorrupt {
            path: "/secret/path".into(),
            reason: "bad".into(),
        }
        .into();
        assert_eq!(corrupt.parts(), (StatusCode::INTERNAL_SERVER_ERROR, "UNKNOWN", "unknown error"));

        let canceled: ServerError = StorageError::Canceled.into();
        assert_eq!(canceled.parts().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn response_body_hides_cause() {
        let err = ServerError::Storage(StorageError::LinkCorrupt {
            path: "/docker/registry/v2/secret".into(),
            reason: "garbage".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret"));
        assert!(!text.contains("garbage"));
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["errors"][0]["code"], "UNKNOWN");
    }
}

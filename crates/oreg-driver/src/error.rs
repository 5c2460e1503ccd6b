/// Errors from storage driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Nothing exists at the requested path.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// The path is not a valid driver path.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The caller's context was cancelled or its deadline passed.
    #[error("operation canceled")]
    Canceled,

    /// I/O error from the underlying backend.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend could not serve the request.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl DriverError {
    /// Returns `true` for [`DriverError::PathNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound(_))
    }

    pub(crate) fn io(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::PathNotFound(path.to_string())
        } else {
            Self::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

/// Result alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

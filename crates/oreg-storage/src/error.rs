use oreg_driver::DriverError;
use oreg_types::{Digest, TypeError};

/// Errors from registry storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A digest argument failed validation. Raised before any I/O.
    #[error("invalid digest: {0}")]
    InvalidDigest(#[from] TypeError),

    /// A repository name failed validation.
    #[error("invalid repository name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// No link or object exists at the expected path.
    #[error("not found: {0}")]
    NotFound(String),

    /// A link body does not parse as a digest.
    #[error("corrupt link at {path}: {reason}")]
    LinkCorrupt { path: String, reason: String },

    /// Stored content does not hash to its digest.
    #[error("content corrupt for {digest}: {reason}")]
    ContentCorrupt { digest: Digest, reason: String },

    /// The repository store cannot enumerate referrers.
    #[error("referrer enumeration unsupported for repository {0}")]
    ReferrerEnumerationUnsupported(String),

    /// The storage driver failed for infrastructure reasons.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] DriverError),

    /// The caller's context was cancelled or timed out.
    #[error("operation canceled")]
    Canceled,

    /// Metadata could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Returns `true` for [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<DriverError> for StorageError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::PathNotFound(path) => Self::NotFound(path),
            DriverError::Canceled => Self::Canceled,
            other => Self::StorageUnavailable(other),
        }
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_errors_map_to_taxonomy() {
        assert!(StorageError::from(DriverError::PathNotFound("/x".into())).is_not_found());
        assert!(matches!(
            StorageError::from(DriverError::Canceled),
            StorageError::Canceled
        ));
        assert!(matches!(
            StorageError::from(DriverError::Unavailable("down".into())),
            StorageError::StorageUnavailable(_)
        ));
    }

    #[test]
    fn type_errors_become_invalid_digest() {
        let err: StorageError = oreg_types::Digest::parse("nope").unwrap_err().into();
        assert!(matches!(err, StorageError::InvalidDigest(_)));
    }
}

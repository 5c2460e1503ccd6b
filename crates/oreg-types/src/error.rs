use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid digest {input:?}: {reason}")]
    InvalidDigest { input: String, reason: String },

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

impl TypeError {
    pub(crate) fn invalid_digest(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDigest {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

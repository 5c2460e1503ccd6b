//! Repository name validation.
//!
//! Valid repository names:
//! - Are 1 to 255 characters long
//! - Consist of `/`-separated components
//! - Each component is lowercase alphanumeric runs joined by `.`, `_`,
//!   `__`, or one or more `-`
//!
//! Components always start with `[a-z0-9]`, so a repository name can never
//! collide with the `_`-prefixed reserved subtrees of the storage layout.

use std::fmt;

use crate::error::{StorageError, StorageResult};

/// Maximum length of a repository name.
pub const MAX_NAME_LEN: usize = 255;

/// A validated repository name such as `library/app`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Validate and wrap a repository name.
    ///
    /// # Examples
    ///
    /// ```
    /// use oreg_storage::RepositoryName;
    ///
    /// assert!(RepositoryName::parse("app").is_ok());
    /// assert!(RepositoryName::parse("library/app-server").is_ok());
    /// assert!(RepositoryName::parse("").is_err());
    /// assert!(RepositoryName::parse("_private").is_err());
    /// ```
    pub fn parse(name: &str) -> StorageResult<Self> {
        validate_repository_name(name)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RepositoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> StorageError {
    StorageError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a repository name, returning `Ok(())` if valid.
pub fn validate_repository_name(name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "repository name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid(
            name,
            format!("longer than {MAX_NAME_LEN} characters"),
        ));
    }
    for component in name.split('/') {
        validate_component(name, component)?;
    }
    Ok(())
}

fn validate_component(name: &str, component: &str) -> StorageResult<()> {
    if component.is_empty() {
        return Err(invalid(name, "path components must not be empty"));
    }
    let bytes = component.as_bytes();
    let is_alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !is_alnum(bytes[0]) || !is_alnum(bytes[bytes.len() - 1]) {
        return Err(invalid(
            name,
            format!("component must start and end with [a-z0-9]: {component:?}"),
        ));
    }

    let mut i = 0;
    while i < bytes.len() {
        if is_alnum(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && !is_alnum(bytes[i]) {
            i += 1;
        }
        let separator = &component[start..i];
        let ok = matches!(separator, "." | "_" | "__") || separator.bytes().all(|b| b == b'-');
        if !ok {
            return Err(invalid(
                name,
                format!("invalid separator {separator:?} in component {component:?}"),
            ));
        }
    }
    Ok(())
}

use async_trait::async_trait;
use bytes::Bytes;

use crate::context::Context;
use crate::error::{DriverError, DriverResult};

/// Metadata about one entry in the driver namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Absolute driver path (e.g. `/docker/registry/v2/blobs`).
    pub path: String,
    /// Content length in bytes; zero for directories.
    pub size: u64,
    /// `true` for intermediate namespace entries.
    pub is_dir: bool,
}

impl FileInfo {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            is_dir: false,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            is_dir: true,
        }
    }

    /// The final path segment.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }
}

/// Hierarchical byte-object storage.
///
/// Paths are absolute, `/`-separated, and restricted to `[A-Za-z0-9._-]`
/// segments (see [`validate_path`]). Directories are implicit: they exist
/// while at least one object lives beneath them.
///
/// All implementations must satisfy these invariants:
/// - `put_content` is atomic per object: a concurrent `get_content` sees
///   either the old body or the new one, never a mix.
/// - `put_content` fully replaces any existing body.
/// - `list` returns direct children in lexicographic order.
/// - Every method checks the [`Context`] before doing I/O.
/// - Implementations are safe for concurrent use from many requests.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Read the full body stored at `path`.
    async fn get_content(&self, ctx: &Context, path: &str) -> DriverResult<Bytes>;

    /// Store `content` at `path`, creating parent entries as needed.
    async fn put_content(&self, ctx: &Context, path: &str, content: Bytes) -> DriverResult<()>;

    /// Describe the entry at `path`.
    async fn stat(&self, ctx: &Context, path: &str) -> DriverResult<FileInfo>;

    /// List the direct children of the directory at `path`, as full paths.
    async fn list(&self, ctx: &Context, path: &str) -> DriverResult<Vec<String>>;

    /// Recursively remove the entry at `path`.
    async fn delete(&self, ctx: &Context, path: &str) -> DriverResult<()>;
}

/// Check that `path` is a well-formed driver path.
///
/// `/` alone is accepted and names the namespace root.
pub fn validate_path(path: &str) -> DriverResult<()> {
    let invalid = |reason: &str| DriverError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if path == "/" {
        return Ok(());
    }
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| invalid("must be absolute"))?;
    for segment in rest.split('/') {
        if segment.is_empty() {
            return Err(invalid("empty segment"));
        }
        if segment == "." || segment == ".." {
            return Err(invalid("relative segment"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(invalid("segment contains a forbidden character"));
        }
    }
    Ok(())
}

/// Join a directory path and a child segment.
pub fn join(parent: &str, child: &str) -> String {
    if parent == "/" {
        format!("/{child}")
    } else {
        format!("{parent}/{child}")
    }
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::context::Context;
use crate::error::{DriverError, DriverResult};
use crate::traits::{join, validate_path, FileInfo, StorageDriver};

/// Prefix of in-flight temporary files; hidden from `list`.
const TEMP_PREFIX: &str = ".tmp-";

/// Storage driver rooted at a local directory.
///
/// Writes go to a temporary sibling and are renamed into place, so readers
/// never observe a partially written object.
#[derive(Clone, Debug)]
pub struct FilesystemDriver {
    root: PathBuf,
}

impl FilesystemDriver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The local directory backing this driver.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StorageDriver for FilesystemDriver {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn get_content(&self, ctx: &Context, path: &str) -> DriverResult<Bytes> {
        ctx.check()?;
        validate_path(path)?;
        let data = tokio::fs::read(self.full_path(path))
            .await
            .map_err(|e| DriverError::io(path, e))?;
        Ok(Bytes::from(data))
    }

    async fn put_content(&self, ctx: &Context, path: &str, content: Bytes) -> DriverResult<()> {
        ctx.check()?;
        validate_path(path)?;
        let target = self.full_path(path);
        let parent = target.parent().ok_or_else(|| DriverError::InvalidPath {
            path: path.to_string(),
            reason: "cannot write to the root".into(),
        })?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DriverError::io(path, e))?;

        let temp = parent.join(format!("{TEMP_PREFIX}{}", uuid::Uuid::now_v7()));
        if let Err(e) = tokio::fs::write(&temp, &content).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(DriverError::io(path, e));
        }
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(DriverError::io(path, e));
        }
        tracing::trace!(path, size = content.len(), "wrote object");
        Ok(())
    }

    async fn stat(&self, ctx: &Context, path: &str) -> DriverResult<FileInfo> {
        ctx.check()?;
        validate_path(path)?;
        let meta = tokio::fs::metadata(self.full_path(path))
            .await
            .map_err(|e| DriverError::io(path, e))?;
        if meta.is_dir() {
            Ok(FileInfo::dir(path))
        } else {
            Ok(FileInfo::file(path, meta.len()))
        }
    }

    async fn list(&self, ctx: &Context, path: &str) -> DriverResult<Vec<String>> {
        ctx.check()?;
        validate_path(path)?;
        let mut entries = tokio::fs::read_dir(self.full_path(path))
            .await
            .map_err(|e| DriverError::io(path, e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DriverError::io(path, e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names.into_iter().map(|name| join(path, &name)).collect())
    }

    async fn delete(&self, ctx: &Context, path: &str) -> DriverResult<()> {
        ctx.check()?;
        validate_path(path)?;
        let full = self.full_path(path);
        let meta = tokio::fs::metadata(&full)
            .await
            .map_err(|e| DriverError::io(path, e))?;
        let result = if meta.is_dir() {
            tokio::fs::remove_dir_all(&full).await
        } else {
            tokio::fs::remove_file(&full).await
        };
        result.map_err(|e| DriverError::io(path, e))
    }
}

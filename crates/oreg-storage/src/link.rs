use std::sync::Arc;

use bytes::Bytes;
use oreg_driver::{Context, FileInfo, StorageDriver, Walker};
use oreg_types::Digest;

use crate::error::{StorageError, StorageResult};

/// Link records over a storage driver.
///
/// A link is a small object whose entire body is one digest string. It is
/// an indirection pointer: its presence at a path is the only evidence of
/// the relationship the path encodes.
#[derive(Clone)]
pub struct LinkStore {
    driver: Arc<dyn StorageDriver>,
}

impl LinkStore {
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self { driver }
    }

    /// Write `digest` as the full body at `path`.
    ///
    /// Overwrites any existing body; writing the same digest twice is
    /// observably a no-op.
    pub async fn link(&self, ctx: &Context, path: &str, digest: &Digest) -> StorageResult<()> {
        let body = Bytes::from(digest.to_string());
        self.driver.put_content(ctx, path, body).await?;
        Ok(())
    }

    /// Read the link at `path` and parse its body.
    ///
    /// Fails with `NotFound` if nothing is stored there and `LinkCorrupt` if
    /// the body is not exactly a valid digest string.
    pub async fn read_link(&self, ctx: &Context, path: &str) -> StorageResult<Digest> {
        let body = self.driver.get_content(ctx, path).await?;
        let text = std::str::from_utf8(&body).map_err(|e| StorageError::LinkCorrupt {
            path: path.to_string(),
            reason: format!("body is not UTF-8: {e}"),
        })?;
        Digest::parse(text).map_err(|e| StorageError::LinkCorrupt {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Walk every leaf object beneath `prefix` in namespace order.
    ///
    /// Directories are passed over. A missing `prefix` surfaces as
    /// `NotFound` from the first step; stopping early is just dropping the
    /// walk. Failed steps are not retried.
    pub fn walk(&self, prefix: &str) -> LinkWalk<'_> {
        LinkWalk {
            entries: Walker::new(self.driver.as_ref(), prefix),
        }
    }
}

/// Leaf entries beneath a prefix, produced by [`LinkStore::walk`].
pub struct LinkWalk<'a> {
    entries: Walker<'a>,
}

impl LinkWalk<'_> {
    /// The next leaf, or `None` once the prefix is exhausted.
    pub async fn next(&mut self, ctx: &Context) -> StorageResult<Option<FileInfo>> {
        while let Some(info) = self.entries.next(ctx).await? {
            if !info.is_dir {
                return Ok(Some(info));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for LinkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStore")
            .field("driver", &self.driver.name())
            .finish()
    }
}

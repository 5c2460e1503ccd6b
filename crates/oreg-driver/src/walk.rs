//! Depth-first namespace walk built on `list` and `stat`.
//!
//! The walk is not a snapshot. Entries written after the walk passes their
//! position are missed; entries removed between listing and visiting are
//! skipped.

use crate::context::Context;
use crate::error::DriverResult;
use crate::traits::{FileInfo, StorageDriver};

/// Pull-based walker over every entry beneath a root path.
///
/// Yields directories and files in pre-order with siblings in lexicographic
/// order. The root itself is not yielded; a missing root surfaces as
/// [`PathNotFound`](crate::DriverError::PathNotFound) from the first call to
/// [`Walker::next`]. Stopping early is just dropping the walker.
pub struct Walker<'a> {
    driver: &'a dyn StorageDriver,
    root: String,
    pending: Vec<String>,
    started: bool,
}

impl<'a> Walker<'a> {
    pub fn new(driver: &'a dyn StorageDriver, root: impl Into<String>) -> Self {
        Self {
            driver,
            root: root.into(),
            pending: Vec::new(),
            started: false,
        }
    }

    fn push_children(&mut self, mut children: Vec<String>) {
        children.sort();
        self.pending.extend(children.into_iter().rev());
    }

    /// Advance to the next entry, or `None` once the subtree is exhausted.
    pub async fn next(&mut self, ctx: &Context) -> DriverResult<Option<FileInfo>> {
        if !self.started {
            self.started = true;
            let children = self.driver.list(ctx, &self.root).await?;
            self.push_children(children);
        }
        while let Some(path) = self.pending.pop() {
            ctx.check()?;
            let info = match self.driver.stat(ctx, &path).await {
                Ok(info) => info,
                Err(e) if e.is_not_found() => {
                    tracing::warn!(path = %path, "entry vanished during walk");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if info.is_dir {
                match self.driver.list(ctx, &path).await {
                    Ok(children) => self.push_children(children),
                    Err(e) if e.is_not_found() => {
                        tracing::warn!(path = %path, "directory vanished during walk");
                    }
                    Err(e) => return Err(e),
                }
            }
            return Ok(Some(info));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;
    use crate::memory::InMemoryDriver;
    use bytes::Bytes;

    async fn collect(driver: &InMemoryDriver, root: &str) -> DriverResult<Vec<(String, bool)>> {
        let ctx = Context::background();
        let mut walker = Walker::new(driver, root);
        let mut seen = Vec::new();
        while let Some(info) = walker.next(&ctx).await? {
            seen.push((info.path, info.is_dir));
        }
        Ok(seen)
    }

    async fn seeded() -> InMemoryDriver {
        let driver = InMemoryDriver::new();
        let ctx = Context::background();
        for path in ["/w/b/2", "/w/a/1", "/w/b/1", "/w/c", "/other/x"] {
            driver
                .put_content(&ctx, path, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        driver
    }

    #[tokio::test]
    async fn walk_is_preorder_lexicographic() {
        let driver = seeded().await;
        let seen = collect(&driver, "/w").await.unwrap();
        assert_eq!(
            seen,
            vec![
                ("/w/a".to_string(), true),
                ("/w/a/1".to_string(), false),
                ("/w/b".to_string(), true),
                ("/w/b/1".to_string(), false),
                ("/w/b/2".to_string(), false),
                ("/w/c".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn missing_root_is_not_found() {
        let driver = seeded().await;
        let err = collect(&driver, "/nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn cancellation_aborts_walk() {
        let driver = seeded().await;
        let ctx = Context::background();
        let mut walker = Walker::new(&driver, "/w");
        assert!(walker.next(&ctx).await.unwrap().is_some());
        ctx.cancel();
        assert!(matches!(walker.next(&ctx).await, Err(DriverError::Canceled)));
    }

    #[tokio::test]
    async fn vanished_entries_are_skipped() {
        let driver = seeded().await;
        let ctx = Context::background();
        let mut walker = Walker::new(&driver, "/w");
        let first = walker.next(&ctx).await.unwrap().unwrap();
        assert_eq!(first.path, "/w/a");
        driver.delete(&ctx, "/w/b").await.unwrap();
        let mut rest = Vec::new();
        while let Some(info) = walker.next(&ctx).await.unwrap() {
            rest.push(info.path);
        }
        assert_eq!(rest, vec!["/w/a/1", "/w/c"]);
    }
}

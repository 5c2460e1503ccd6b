use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::context::Context;
use crate::error::{DriverError, DriverResult};
use crate::traits::{join, validate_path, FileInfo, StorageDriver};

/// In-memory, `BTreeMap`-based storage driver.
///
/// Intended for tests and embedding. Only objects are stored; directories
/// are derived from object paths. The ordered map gives `list` its
/// lexicographic order for free.
pub struct InMemoryDriver {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl InMemoryDriver {
    /// Create a new empty driver.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// All object paths in lexicographic order.
    pub fn paths(&self) -> Vec<String> {
        self.objects
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for InMemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn dir_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{path}/")
    }
}

#[async_trait]
impl StorageDriver for InMemoryDriver {
    fn name(&self) -> &'static str {
        "inmemory"
    }

    async fn get_content(&self, ctx: &Context, path: &str) -> DriverResult<Bytes> {
        ctx.check()?;
        validate_path(path)?;
        let map = self.objects.read().expect("lock poisoned");
        map.get(path)
            .cloned()
            .ok_or_else(|| DriverError::PathNotFound(path.to_string()))
    }

    async fn put_content(&self, ctx: &Context, path: &str, content: Bytes) -> DriverResult<()> {
        ctx.check()?;
        validate_path(path)?;
        if path == "/" {
            return Err(DriverError::InvalidPath {
                path: path.to_string(),
                reason: "cannot write to the root".into(),
            });
        }
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert(path.to_string(), content);
        Ok(())
    }

    async fn stat(&self, ctx: &Context, path: &str) -> DriverResult<FileInfo> {
        ctx.check()?;
        validate_path(path)?;
        let map = self.objects.read().expect("lock poisoned");
        if let Some(content) = map.get(path) {
            return Ok(FileInfo::file(path, content.len() as u64));
        }
        let prefix = dir_prefix(path);
        if map.range(prefix.clone()..).next().is_some_and(|(k, _)| k.starts_with(&prefix)) {
            return Ok(FileInfo::dir(path));
        }
        Err(DriverError::PathNotFound(path.to_string()))
    }

    async fn list(&self, ctx: &Context, path: &str) -> DriverResult<Vec<String>> {
        ctx.check()?;
        validate_path(path)?;
        let map = self.objects.read().expect("lock poisoned");
        let prefix = dir_prefix(path);
        let children: BTreeSet<String> = map
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter_map(|(k, _)| k[prefix.len()..].split('/').next())
            .map(|child| join(path, child))
            .collect();
        if children.is_empty() && path != "/" {
            return Err(DriverError::PathNotFound(path.to_string()));
        }
        Ok(children.into_iter().collect())
    }

    async fn delete(&self, ctx: &Context, path: &str) -> DriverResult<()> {
        ctx.check()?;
        validate_path(path)?;
        let mut map = self.objects.write().expect("lock poisoned");
        let prefix = dir_prefix(path);
        let doomed: Vec<String> = map
            .keys()
            .filter(|k| k.as_str() == path || k.starts_with(&prefix))
            .cloned()
            .collect();
        if doomed.is_empty() {
            return Err(DriverError::PathNotFound(path.to_string()));
        }
        for key in doomed {
            map.remove(&key);
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDriver")
            .field("object_count", &self.len())
            .finish()
    }
}

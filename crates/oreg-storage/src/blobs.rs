use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use oreg_driver::{Context, StorageDriver};
use oreg_types::{media_types, Algorithm, Descriptor, Digest};

use crate::error::{StorageError, StorageResult};
use crate::paths::{path_for, PathSpec};

/// Resolves a digest to the descriptor of the stored blob.
#[async_trait]
pub trait BlobDescriptorService: Send + Sync {
    /// Describe the blob identified by `digest`.
    ///
    /// Returns `NotFound` if no such blob is stored.
    async fn stat(&self, ctx: &Context, digest: &Digest) -> StorageResult<Descriptor>;
}

/// Global content store.
///
/// Blobs are stored once per digest regardless of how many repositories
/// reference them. Each blob is written as its raw `data` plus a
/// `descriptor` JSON record carrying the media type it was stored with.
#[derive(Clone)]
pub struct BlobStore {
    driver: Arc<dyn StorageDriver>,
}

impl BlobStore {
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self { driver }
    }

    /// Store `content` and return its descriptor.
    ///
    /// Content is immutable once stored: if a descriptor record already
    /// exists for this digest it is returned unchanged and the media type
    /// and artifact type given here are ignored. Two concurrent first puts
    /// of the same bytes race on the record; the later write wins.
    pub async fn put(
        &self,
        ctx: &Context,
        media_type: &str,
        artifact_type: Option<&str>,
        content: Bytes,
    ) -> StorageResult<Descriptor> {
        let digest = Digest::from_content(Algorithm::Sha256, &content);
        if let Some(existing) = self.read_record(ctx, &digest).await? {
            tracing::debug!(digest = %digest, "blob already stored");
            return Ok(existing);
        }

        let mut descriptor = Descriptor::new(media_type, digest.clone(), content.len() as u64);
        descriptor.artifact_type = artifact_type.map(str::to_string);

        let record = serde_json::to_vec(&descriptor)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let data_path = path_for(&PathSpec::BlobData { digest: &digest })?;
        let descriptor_path = path_for(&PathSpec::BlobDescriptor { digest: &digest })?;

        self.driver.put_content(ctx, &data_path, content).await?;
        self.driver
            .put_content(ctx, &descriptor_path, Bytes::from(record))
            .await?;
        tracing::debug!(digest = %digest, media_type, size = descriptor.size, "stored blob");
        Ok(descriptor)
    }

    /// The stored descriptor record for `digest`, if one was written.
    async fn read_record(&self, ctx: &Context, digest: &Digest) -> StorageResult<Option<Descriptor>> {
        let record_path = path_for(&PathSpec::BlobDescriptor { digest })?;
        let record = match self.driver.get_content(ctx, &record_path).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let descriptor: Descriptor =
            serde_json::from_slice(&record).map_err(|e| StorageError::ContentCorrupt {
                digest: digest.clone(),
                reason: format!("unreadable descriptor record: {e}"),
            })?;
        if &descriptor.digest != digest {
            return Err(StorageError::ContentCorrupt {
                digest: digest.clone(),
                reason: format!("descriptor record names {}", descriptor.digest),
            });
        }
        Ok(Some(descriptor))
    }

    /// Read a blob and verify it still hashes to `digest`.
    pub async fn get(&self, ctx: &Context, digest: &Digest) -> StorageResult<Bytes> {
        let path = path_for(&PathSpec::BlobData { digest })?;
        let content = self.driver.get_content(ctx, &path).await?;
        if !digest.verify(&content)? {
            return Err(StorageError::ContentCorrupt {
                digest: digest.clone(),
                reason: "content does not match digest".into(),
            });
        }
        Ok(content)
    }

    /// Returns `true` if the blob's content is present.
    pub async fn exists(&self, ctx: &Context, digest: &Digest) -> StorageResult<bool> {
        let path = path_for(&PathSpec::BlobData { digest })?;
        match self.driver.stat(ctx, &path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobDescriptorService for BlobStore {
    async fn stat(&self, ctx: &Context, digest: &Digest) -> StorageResult<Descriptor> {
        if let Some(descriptor) = self.read_record(ctx, digest).await? {
            return Ok(descriptor);
        }
        // Blobs written without a descriptor record are described from
        // their data object alone.
        let data_path = path_for(&PathSpec::BlobData { digest })?;
        let info = self.driver.stat(ctx, &data_path).await?;
        Ok(Descriptor::new(
            media_types::OCTET_STREAM,
            digest.clone(),
            info.size,
        ))
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("driver", &self.driver.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oreg_driver::InMemoryDriver;

    fn store() -> (Arc<InMemoryDriver>, BlobStore) {
        let driver = Arc::new(InMemoryDriver::new());
        (driver.clone(), BlobStore::new(driver))
    }

    #[tokio::test]
    async fn put_then_stat_and_get() {
        let (_, blobs) = store();
        let ctx = Context::background();
        let desc = blobs
            .put(&ctx, media_types::IMAGE_MANIFEST, Some("application/vnd.example.sig"), Bytes::from_static(b"{}"))
            .await
            .unwrap();
        assert_eq!(desc.size, 2);
        assert_eq!(desc.digest.algorithm(), "sha256");

        let stat = blobs.stat(&ctx, &desc.digest).await.unwrap();
        assert_eq!(stat, desc);
        assert_eq!(&blobs.get(&ctx, &desc.digest).await.unwrap()[..], b"{}");
        assert!(blobs.exists(&ctx, &desc.digest).await.unwrap());
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let (driver, blobs) = store();
        let ctx = Context::background();
        let a = blobs.put(&ctx, "a/b", None, Bytes::from_static(b"x")).await.unwrap();
        let b = blobs.put(&ctx, "a/b", None, Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(driver.len(), 2);
    }

    #[tokio::test]
    async fn reput_keeps_first_metadata() {
        let (_, blobs) = store();
        let ctx = Context::background();
        let first = blobs
            .put(
                &ctx,
                media_types::IMAGE_MANIFEST,
                Some("application/vnd.example.sig"),
                Bytes::from_static(b"same"),
            )
            .await
            .unwrap();
        let again = blobs
            .put(&ctx, "text/plain", None, Bytes::from_static(b"same"))
            .await
            .unwrap();
        assert_eq!(again, first);

        let stat = blobs.stat(&ctx, &first.digest).await.unwrap();
        assert_eq!(stat.media_type, media_types::IMAGE_MANIFEST);
        assert_eq!(stat.artifact_type.as_deref(), Some("application/vnd.example.sig"));
    }

    #[tokio::test]
    async fn stat_missing_is_not_found() {
        let (_, blobs) = store();
        let d = Digest::parse("sha256:abcd").unwrap();
        let err = blobs.stat(&Context::background(), &d).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!blobs.exists(&Context::background(), &d).await.unwrap());
    }

    #[tokio::test]
    async fn stat_without_descriptor_record_falls_back_to_data() {
        let (driver, blobs) = store();
        let ctx = Context::background();
        let d = Digest::from_content(Algorithm::Sha256, b"legacy");
        let path = path_for(&PathSpec::BlobData { digest: &d }).unwrap();
        driver.put_content(&ctx, &path, Bytes::from_static(b"legacy")).await.unwrap();
        let desc = blobs.stat(&ctx, &d).await.unwrap();
        assert_eq!(desc.media_type, media_types::OCTET_STREAM);
        assert_eq!(desc.size, 6);
    }

    #[tokio::test]
    async fn get_detects_corruption() {
        let (driver, blobs) = store();
        let ctx = Context::background();
        let desc = blobs.put(&ctx, "a/b", None, Bytes::from_static(b"good")).await.unwrap();
        let path = path_for(&PathSpec::BlobData { digest: &desc.digest }).unwrap();
        driver.put_content(&ctx, &path, Bytes::from_static(b"evil")).await.unwrap();
        let err = blobs.get(&ctx, &desc.digest).await.unwrap_err();
        assert!(matches!(err, StorageError::ContentCorrupt { .. }));
    }
}

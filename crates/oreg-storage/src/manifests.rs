use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use oreg_driver::Context;
use oreg_types::{Descriptor, Digest};

use crate::blobs::{BlobDescriptorService, BlobStore};
use crate::error::{StorageError, StorageResult};
use crate::link::LinkStore;
use crate::names::RepositoryName;
use crate::paths::{path_for, PathSpec};
use crate::references::{ReferenceService, ReferrerVisitor};

/// A manifest upload as declared by the client.
///
/// The registry does not parse manifest bodies; media type, artifact type,
/// and subject come from the caller.
#[derive(Clone, Debug)]
pub struct ManifestPut {
    pub media_type: String,
    pub artifact_type: Option<String>,
    pub subject: Option<Digest>,
    pub payload: Bytes,
}

impl ManifestPut {
    pub fn new(media_type: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            media_type: media_type.into(),
            artifact_type: None,
            subject: None,
            payload: payload.into(),
        }
    }

    pub fn with_subject(mut self, subject: Digest) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_artifact_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = Some(artifact_type.into());
        self
    }
}

/// Optional capability: list the referrers of a subject.
#[async_trait]
pub trait ReferrerEnumerator: Send + Sync {
    /// Hand every referrer of `subject` to `visitor`.
    ///
    /// `artifact_type` narrows the walk to one media-type bucket; pass an
    /// empty string for all referrers.
    async fn enumerate_referrers(
        &self,
        ctx: &Context,
        subject: &Digest,
        artifact_type: &str,
        visitor: &mut (dyn ReferrerVisitor + Send),
    ) -> StorageResult<()>;
}

/// Per-repository manifest storage.
#[async_trait]
pub trait ManifestService: Send + Sync {
    /// Returns `true` if `digest` is a manifest revision of this repository.
    async fn exists(&self, ctx: &Context, digest: &Digest) -> StorageResult<bool>;

    /// Fetch a manifest revision and its descriptor.
    async fn get(&self, ctx: &Context, digest: &Digest) -> StorageResult<(Descriptor, Bytes)>;

    /// Store a manifest and, if it declares a subject, link it as a referrer.
    async fn put(&self, ctx: &Context, manifest: ManifestPut) -> StorageResult<Descriptor>;

    /// Probe for the referrer-enumeration capability.
    fn referrers(&self) -> Option<&dyn ReferrerEnumerator> {
        None
    }
}

/// Storage-backed [`ManifestService`] that supports referrer enumeration.
pub struct ManifestStore {
    repository: RepositoryName,
    blobs: BlobStore,
    links: LinkStore,
    references: Arc<dyn ReferenceService>,
}

impl ManifestStore {
    pub fn new(
        repository: RepositoryName,
        blobs: BlobStore,
        links: LinkStore,
        references: Arc<dyn ReferenceService>,
    ) -> Self {
        Self {
            repository,
            blobs,
            links,
            references,
        }
    }

    fn revision_path(&self, digest: &Digest) -> StorageResult<String> {
        path_for(&PathSpec::ManifestRevisionLink {
            name: &self.repository,
            revision: digest,
        })
    }
}

#[async_trait]
impl ManifestService for ManifestStore {
    async fn exists(&self, ctx: &Context, digest: &Digest) -> StorageResult<bool> {
        let path = self.revision_path(digest)?;
        match self.links.read_link(ctx, &path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get(&self, ctx: &Context, digest: &Digest) -> StorageResult<(Descriptor, Bytes)> {
        let path = self.revision_path(digest)?;
        let linked = self.links.read_link(ctx, &path).await?;
        if &linked != digest {
            return Err(StorageError::LinkCorrupt {
                path,
                reason: format!("revision link names {linked}"),
            });
        }
        let descriptor = self.blobs.stat(ctx, digest).await?;
        let payload = self.blobs.get(ctx, digest).await?;
        Ok((descriptor, payload))
    }

    async fn put(&self, ctx: &Context, manifest: ManifestPut) -> StorageResult<Descriptor> {
        let ManifestPut {
            media_type,
            artifact_type,
            subject,
            payload,
        } = manifest;
        let descriptor = self
            .blobs
            .put(ctx, &media_type, artifact_type.as_deref(), payload)
            .await?;
        let path = self.revision_path(&descriptor.digest)?;
        self.links.link(ctx, &path, &descriptor.digest).await?;

        // Referrer links are written only after the content they point at,
        // bucketed by artifact type so enumeration can filter on it.
        if let Some(subject) = subject {
            let bucket = descriptor
                .artifact_type
                .as_deref()
                .unwrap_or(&descriptor.media_type);
            self.references
                .link(ctx, bucket, &descriptor.digest, &subject)
                .await?;
        }
        tracing::debug!(
            repository = %self.repository,
            digest = %descriptor.digest,
            media_type = %media_type,
            "stored manifest"
        );
        Ok(descriptor)
    }

    fn referrers(&self) -> Option<&dyn ReferrerEnumerator> {
        Some(self)
    }
}

#[async_trait]
impl ReferrerEnumerator for ManifestStore {
    async fn enumerate_referrers(
        &self,
        ctx: &Context,
        subject: &Digest,
        artifact_type: &str,
        visitor: &mut (dyn ReferrerVisitor + Send),
    ) -> StorageResult<()> {
        self.references
            .enumerate(ctx, subject, artifact_type, visitor)
            .await
    }
}

impl std::fmt::Debug for ManifestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestStore")
            .field("repository", &self.repository)
            .finish()
    }
}

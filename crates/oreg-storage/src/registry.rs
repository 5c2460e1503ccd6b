use std::sync::Arc;

use oreg_driver::{Context, StorageDriver};
use oreg_types::{Descriptor, Digest};

use crate::blobs::{BlobDescriptorService, BlobStore};
use crate::error::{StorageError, StorageResult};
use crate::link::LinkStore;
use crate::manifests::{ManifestService, ManifestStore};
use crate::names::RepositoryName;
use crate::references::{ReferenceHandler, ReferenceService, ReferrerCollector};

/// A named repository and the services scoped to it.
pub trait Repository: Send + Sync {
    fn name(&self) -> &RepositoryName;

    fn manifests(&self) -> Arc<dyn ManifestService>;

    fn blobs(&self) -> Arc<dyn BlobDescriptorService>;
}

/// Resolves repository names to repositories.
pub trait Namespace: Send + Sync {
    /// Open `name`. Returns `NotFound` if the namespace does not host it.
    fn repository(&self, name: &RepositoryName) -> StorageResult<Arc<dyn Repository>>;
}

/// Registry over a single shared storage driver.
///
/// Repositories are created implicitly by the first write beneath them.
/// Content is global; only links are repository-scoped.
#[derive(Clone)]
pub struct Registry {
    driver: Arc<dyn StorageDriver>,
    blobs: BlobStore,
}

impl Registry {
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self {
            blobs: BlobStore::new(driver.clone()),
            driver,
        }
    }

    pub fn driver(&self) -> &Arc<dyn StorageDriver> {
        &self.driver
    }

    /// The global blob store.
    pub fn blob_store(&self) -> &BlobStore {
        &self.blobs
    }

    /// Open a repository with its concrete service types.
    pub fn open(&self, name: &RepositoryName) -> StoredRepository {
        let links = LinkStore::new(self.driver.clone());
        let references = Arc::new(ReferenceHandler::new(name.clone(), links.clone()));
        let manifests = Arc::new(ManifestStore::new(
            name.clone(),
            self.blobs.clone(),
            links,
            references.clone(),
        ));
        StoredRepository {
            name: name.clone(),
            blobs: Arc::new(self.blobs.clone()),
            manifests,
            references,
        }
    }
}

impl Namespace for Registry {
    fn repository(&self, name: &RepositoryName) -> StorageResult<Arc<dyn Repository>> {
        Ok(Arc::new(self.open(name)))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("driver", &self.driver.name())
            .finish()
    }
}

/// A repository backed by the registry's storage driver.
pub struct StoredRepository {
    name: RepositoryName,
    blobs: Arc<BlobStore>,
    manifests: Arc<ManifestStore>,
    references: Arc<ReferenceHandler>,
}

impl StoredRepository {
    /// The repository's reference service.
    pub fn references(&self) -> Arc<dyn ReferenceService> {
        self.references.clone()
    }
}

impl Repository for StoredRepository {
    fn name(&self) -> &RepositoryName {
        &self.name
    }

    fn manifests(&self) -> Arc<dyn ManifestService> {
        self.manifests.clone()
    }

    fn blobs(&self) -> Arc<dyn BlobDescriptorService> {
        self.blobs.clone()
    }
}

/// Enumerate the referrers of `subject` in `repository` and resolve each
/// to its descriptor, first occurrence order.
///
/// Fails with `ReferrerEnumerationUnsupported` when the repository's
/// manifest service lacks the capability. A referrer whose content is not
/// stored is left out: that is the window between a link write and its
/// content, or content reclaimed ahead of its links. The enumeration runs to
/// completion before any resolution starts.
pub async fn resolve_referrers(
    ctx: &Context,
    repository: &dyn Repository,
    subject: &Digest,
    artifact_type: &str,
) -> StorageResult<Vec<Descriptor>> {
    let manifests = repository.manifests();
    let enumerator = manifests.referrers().ok_or_else(|| {
        StorageError::ReferrerEnumerationUnsupported(repository.name().to_string())
    })?;

    let mut collected = ReferrerCollector::new();
    enumerator
        .enumerate_referrers(ctx, subject, artifact_type, &mut collected)
        .await?;

    let blobs = repository.blobs();
    let mut descriptors = Vec::with_capacity(collected.len());
    for digest in collected.into_digests() {
        match blobs.stat(ctx, &digest).await {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    repository = %repository.name(),
                    referrer = %digest,
                    subject = %subject,
                    "referrer content missing, skipping"
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifests::ManifestPut;
    use bytes::Bytes;
    use oreg_driver::InMemoryDriver;
    use oreg_types::media_types;

    const SIG: &str = "application/vnd.example.sig+json";

    #[tokio::test]
    async fn repository_services_share_storage() {
        let registry = Registry::new(Arc::new(InMemoryDriver::new()));
        let name = RepositoryName::parse("app").unwrap();
        let ctx = Context::background();

        let repo = registry.repository(&name).unwrap();
        assert_eq!(repo.name().as_str(), "app");
        let desc = repo
            .manifests()
            .put(&ctx, ManifestPut::new(media_types::IMAGE_MANIFEST, &b"m"[..]))
            .await
            .unwrap();

        let reopened = registry.repository(&name).unwrap();
        assert!(reopened.manifests().exists(&ctx, &desc.digest).await.unwrap());
        assert_eq!(reopened.blobs().stat(&ctx, &desc.digest).await.unwrap(), desc);
    }

    #[tokio::test]
    async fn content_is_global_links_are_scoped() {
        let registry = Registry::new(Arc::new(InMemoryDriver::new()));
        let ctx = Context::background();
        let app = registry.open(&RepositoryName::parse("app").unwrap());
        let other = registry.open(&RepositoryName::parse("other").unwrap());

        let desc = app
            .manifests()
            .put(&ctx, ManifestPut::new(media_types::IMAGE_MANIFEST, &b"shared"[..]))
            .await
            .unwrap();
        assert!(registry.blob_store().exists(&ctx, &desc.digest).await.unwrap());
        assert!(!other.manifests().exists(&ctx, &desc.digest).await.unwrap());

        let subject = oreg_types::Digest::parse("sha256:aaaa").unwrap();
        app.references()
            .link(&ctx, media_types::IMAGE_MANIFEST, &desc.digest, &subject)
            .await
            .unwrap();
        let mut collected = ReferrerCollector::new();
        other
            .references()
            .enumerate(&ctx, &subject, "", &mut collected)
            .await
            .unwrap();
        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn resolve_referrers_returns_descriptors() {
        let registry = Registry::new(Arc::new(InMemoryDriver::new()));
        let ctx = Context::background();
        let app = registry.open(&RepositoryName::parse("app").unwrap());
        let subject = Digest::parse("sha256:aaaa").unwrap();
        let sig = app
            .manifests()
            .put(
                &ctx,
                ManifestPut::new(media_types::IMAGE_MANIFEST, &b"{\"sig\":1}"[..])
                    .with_artifact_type(SIG)
                    .with_subject(subject.clone()),
            )
            .await
            .unwrap();

        let found = resolve_referrers(&ctx, &app, &subject, "").await.unwrap();
        assert_eq!(found, vec![sig.clone()]);
        assert_eq!(found[0].artifact_type.as_deref(), Some(SIG));

        let scoped = resolve_referrers(&ctx, &app, &subject, SIG).await.unwrap();
        assert_eq!(scoped, vec![sig]);
        assert!(resolve_referrers(&ctx, &app, &subject, "text/plain")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn resolve_referrers_omits_missing_content() {
        let registry = Registry::new(Arc::new(InMemoryDriver::new()));
        let ctx = Context::background();
        let app = registry.open(&RepositoryName::parse("app").unwrap());
        let subject = Digest::parse("sha256:aaaa").unwrap();
        let stored = registry
            .blob_store()
            .put(&ctx, media_types::IMAGE_MANIFEST, None, Bytes::from_static(b"{}"))
            .await
            .unwrap();
        let refs = app.references();
        refs.link(&ctx, SIG, &stored.digest, &subject).await.unwrap();
        refs.link(&ctx, SIG, &Digest::parse("sha256:b1").unwrap(), &subject)
            .await
            .unwrap();

        let found = resolve_referrers(&ctx, &app, &subject, "").await.unwrap();
        assert_eq!(found, vec![stored]);
    }
}

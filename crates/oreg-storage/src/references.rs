//! The subject-to-referrer index.
//!
//! Each `referrer --refers-to--> subject` edge is one link object filed
//! under the subject, bucketed by the referrer's artifact or media type (see
//! [`crate::paths`]). Enumeration walks the subject's subtree and reads
//! every link it finds.
//!
//! Enumeration is not a snapshot. A referrer linked while a walk is in
//! flight is observed only if the walk reaches its path after the write
//! lands. Links never appear torn because drivers write objects atomically.

use std::collections::HashSet;

use async_trait::async_trait;
use oreg_driver::Context;
use oreg_types::Digest;

use crate::error::{StorageError, StorageResult};
use crate::link::LinkStore;
use crate::names::RepositoryName;
use crate::paths::{subject_referrer_link_path, subject_referrers_root_path, LINK_FILE};

/// Receives referrer digests during enumeration.
///
/// Returning an error stops the enumeration; that error is handed back to
/// the caller of `enumerate`. Digests delivered before the error stay
/// delivered.
pub trait ReferrerVisitor {
    fn visit(&mut self, referrer: Digest) -> StorageResult<()>;
}

impl<F> ReferrerVisitor for F
where
    F: FnMut(Digest) -> StorageResult<()>,
{
    fn visit(&mut self, referrer: Digest) -> StorageResult<()> {
        self(referrer)
    }
}

/// Accumulates referrer digests in enumeration order, dropping repeats.
#[derive(Debug, Default)]
pub struct ReferrerCollector {
    seen: HashSet<Digest>,
    digests: Vec<Digest>,
}

impl ReferrerCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// The collected digests, first occurrence order.
    pub fn into_digests(self) -> Vec<Digest> {
        self.digests
    }
}

impl ReferrerVisitor for ReferrerCollector {
    fn visit(&mut self, referrer: Digest) -> StorageResult<()> {
        if self.seen.insert(referrer.clone()) {
            self.digests.push(referrer);
        }
        Ok(())
    }
}

/// Manages links from subjects back to their referrers.
#[async_trait]
pub trait ReferenceService: Send + Sync {
    /// Record that `referrer` refers to `subject`.
    ///
    /// Precondition: the referrer's content is already stored. This method
    /// does not check it, nor does it check that the referrer actually
    /// declares `subject`. Storage failures are returned as-is.
    async fn link(
        &self,
        ctx: &Context,
        media_type: &str,
        referrer: &Digest,
        subject: &Digest,
    ) -> StorageResult<()>;

    /// Hand every linked referrer of `subject` to `visitor`.
    ///
    /// An empty `media_type` covers every media-type bucket. Order follows
    /// the storage namespace, not link creation. A corrupt link aborts the
    /// enumeration with `LinkCorrupt`.
    async fn enumerate(
        &self,
        ctx: &Context,
        subject: &Digest,
        media_type: &str,
        visitor: &mut (dyn ReferrerVisitor + Send),
    ) -> StorageResult<()>;
}

/// [`ReferenceService`] backed by link records in one repository.
#[derive(Clone, Debug)]
pub struct ReferenceHandler {
    repository: RepositoryName,
    links: LinkStore,
}

impl ReferenceHandler {
    pub fn new(repository: RepositoryName, links: LinkStore) -> Self {
        Self { repository, links }
    }

    pub fn repository(&self) -> &RepositoryName {
        &self.repository
    }
}

#[async_trait]
impl ReferenceService for ReferenceHandler {
    async fn link(
        &self,
        ctx: &Context,
        media_type: &str,
        referrer: &Digest,
        subject: &Digest,
    ) -> StorageResult<()> {
        let path = subject_referrer_link_path(&self.repository, media_type, referrer, subject)?;
        self.links.link(ctx, &path, referrer).await?;
        tracing::debug!(
            repository = %self.repository,
            subject = %subject,
            referrer = %referrer,
            media_type,
            "linked referrer"
        );
        Ok(())
    }

    async fn enumerate(
        &self,
        ctx: &Context,
        subject: &Digest,
        media_type: &str,
        visitor: &mut (dyn ReferrerVisitor + Send),
    ) -> StorageResult<()> {
        let root = subject_referrers_root_path(&self.repository, media_type, subject)?;
        let mut walk = self.links.walk(&root);
        loop {
            let entry = match walk.next(ctx).await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) if e.is_not_found() => {
                    tracing::debug!(repository = %self.repository, subject = %subject, "no referrers");
                    break;
                }
                Err(e) => return Err(e),
            };
            if entry.file_name() != LINK_FILE {
                continue;
            }
            let referrer = match self.links.read_link(ctx, &entry.path).await {
                Ok(referrer) => referrer,
                Err(StorageError::NotFound(path)) => {
                    tracing::warn!(path = %path, "referrer link removed during enumeration");
                    continue;
                }
                Err(e) => return Err(e),
            };
            visitor.visit(referrer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use bytes::Bytes;
    use oreg_driver::{FilesystemDriver, InMemoryDriver, StorageDriver};
    use oreg_types::Algorithm;

    const SIG: &str = "application/vnd.example.sig+json";
    const SBOM: &str = "application/vnd.example.sbom+json";

    fn digest(s: &str) -> Digest {
        Digest::parse(s).unwrap()
    }

    fn handler(driver: Arc<dyn StorageDriver>) -> ReferenceHandler {
        ReferenceHandler::new(RepositoryName::parse("app").unwrap(), LinkStore::new(driver))
    }

    async fn collect(h: &ReferenceHandler, subject: &Digest, mt: &str) -> StorageResult<Vec<Digest>> {
        let mut out = Vec::new();
        let mut visitor = |d: Digest| {
            out.push(d);
            Ok(())
        };
        h.enumerate(&Context::background(), subject, mt, &mut visitor).await?;
        Ok(out)
    }

    #[tokio::test]
    async fn link_twice_yields_one_edge() {
        let driver = Arc::new(InMemoryDriver::new());
        let h = handler(driver.clone());
        let ctx = Context::background();
        let s = digest("sha256:aaaa");
        h.link(&ctx, SIG, &digest("sha256:b1"), &s).await.unwrap();
        h.link(&ctx, SIG, &digest("sha256:b1"), &s).await.unwrap();
        assert_eq!(collect(&h, &s, "").await.unwrap(), vec![digest("sha256:b1")]);
        assert_eq!(driver.len(), 1);
    }

    #[tokio::test]
    async fn enumeration_is_complete() {
        let h = handler(Arc::new(InMemoryDriver::new()));
        let ctx = Context::background();
        let s = digest("sha256:aaaa");
        let referrers: BTreeSet<Digest> = ["sha256:01", "sha512:02", "blake3:03", "sha256:ff"]
            .into_iter()
            .map(digest)
            .collect();
        for (i, r) in referrers.iter().enumerate() {
            let mt = if i % 2 == 0 { SIG } else { SBOM };
            h.link(&ctx, mt, r, &s).await.unwrap();
        }
        h.link(&ctx, SIG, &digest("sha256:99"), &digest("sha256:bbbb"))
            .await
            .unwrap();
        let found: BTreeSet<Digest> = collect(&h, &s, "").await.unwrap().into_iter().collect();
        assert_eq!(found, referrers);
    }

    #[tokio::test]
    async fn media_type_scopes_enumeration() {
        let h = handler(Arc::new(InMemoryDriver::new()));
        let ctx = Context::background();
        let s = digest("sha256:aaaa");
        h.link(&ctx, SIG, &digest("sha256:b1"), &s).await.unwrap();
        h.link(&ctx, SBOM, &digest("sha256:b2"), &s).await.unwrap();
        assert_eq!(collect(&h, &s, SBOM).await.unwrap(), vec![digest("sha256:b2")]);
        assert!(collect(&h, &s, "text/plain").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_subject_yields_nothing() {
        let h = handler(Arc::new(InMemoryDriver::new()));
        assert!(collect(&h, &digest("sha256:aaaa"), "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repositories_are_isolated() {
        let driver: Arc<dyn StorageDriver> = Arc::new(InMemoryDriver::new());
        let app = handler(driver.clone());
        let other = ReferenceHandler::new(
            RepositoryName::parse("other").unwrap(),
            LinkStore::new(driver),
        );
        let s = digest("sha256:aaaa");
        app.link(&Context::background(), SIG, &digest("sha256:b1"), &s)
            .await
            .unwrap();
        assert!(collect(&other, &s, "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_link_fails_enumeration() {
        let driver = Arc::new(InMemoryDriver::new());
        let h = handler(driver.clone());
        let ctx = Context::background();
        let s = digest("sha256:aaaa");
        let r = digest("sha256:b1");
        h.link(&ctx, SIG, &r, &s).await.unwrap();
        let path = subject_referrer_link_path(h.repository(), SIG, &r, &s).unwrap();
        driver
            .put_content(&ctx, &path, Bytes::from_static(b"not a digest"))
            .await
            .unwrap();
        let err = collect(&h, &s, "").await.unwrap_err();
        assert!(matches!(err, StorageError::LinkCorrupt { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn visitor_error_aborts_after_partial_delivery() {
        let h = handler(Arc::new(InMemoryDriver::new()));
        let ctx = Context::background();
        let s = digest("sha256:aaaa");
        for r in ["sha256:01", "sha256:02", "sha256:03"] {
            h.link(&ctx, SIG, &digest(r), &s).await.unwrap();
        }
        let mut delivered = Vec::new();
        let mut visitor = |d: Digest| {
            delivered.push(d);
            if delivered.len() == 2 {
                Err(StorageError::Serialization("stop".into()))
            } else {
                Ok(())
            }
        };
        let err = h.enumerate(&ctx, &s, "", &mut visitor).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
        assert_eq!(delivered, vec![digest("sha256:01"), digest("sha256:02")]);
    }

    #[tokio::test]
    async fn cancellation_surfaces_as_canceled() {
        let h = handler(Arc::new(InMemoryDriver::new()));
        let ctx = Context::background();
        let s = digest("sha256:aaaa");
        for r in ["sha256:01", "sha256:02"] {
            h.link(&ctx, SIG, &digest(r), &s).await.unwrap();
        }
        let mut visitor = |_: Digest| {
            ctx.cancel();
            Ok(())
        };
        let err = h.enumerate(&ctx, &s, "", &mut visitor).await.unwrap_err();
        assert!(matches!(err, StorageError::Canceled));
    }

    #[tokio::test]
    async fn works_on_filesystem_driver() {
        let dir = tempfile::tempdir().unwrap();
        let h = handler(Arc::new(FilesystemDriver::new(dir.path())));
        let ctx = Context::background();
        let s = digest("sha256:aaaa");
        h.link(&ctx, SIG, &digest("sha256:b1"), &s).await.unwrap();
        h.link(&ctx, SBOM, &digest("sha256:b2"), &s).await.unwrap();
        h.link(&ctx, SIG, &digest("sha256:b1"), &s).await.unwrap();
        let found: BTreeSet<Digest> = collect(&h, &s, "").await.unwrap().into_iter().collect();
        assert_eq!(found.len(), 2);
    }

    async fn link_concurrently(h: ReferenceHandler, writers: usize) {
        let subject = digest("sha256:aaaa");
        let mut tasks = Vec::new();
        for i in 0..writers {
            let h = h.clone();
            let subject = subject.clone();
            tasks.push(tokio::spawn(async move {
                let referrer = Digest::from_content(Algorithm::Sha256, format!("referrer-{i}").as_bytes());
                let media_type = if i % 2 == 0 { SIG } else { SBOM };
                let ctx = Context::background();
                h.link(&ctx, media_type, &referrer, &subject).await?;
                Ok::<Digest, StorageError>(referrer)
            }));
        }
        let mut expected = BTreeSet::new();
        for task in tasks {
            expected.insert(task.await.unwrap().unwrap());
        }

        let found: BTreeSet<Digest> = collect(&h, &subject, "").await.unwrap().into_iter().collect();
        assert_eq!(found.len(), writers);
        assert_eq!(found, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_links_are_all_enumerated() {
        link_concurrently(handler(Arc::new(InMemoryDriver::new())), 32).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_links_on_filesystem_driver() {
        let dir = tempfile::tempdir().unwrap();
        link_concurrently(handler(Arc::new(FilesystemDriver::new(dir.path()))), 16).await;
    }

    #[test]
    fn collector_drops_repeats_and_keeps_order() {
        let mut c = ReferrerCollector::new();
        for d in ["sha256:02", "sha256:01", "sha256:02"] {
            c.visit(digest(d)).unwrap();
        }
        assert_eq!(c.len(), 2);
        assert_eq!(c.into_digests(), vec![digest("sha256:02"), digest("sha256:01")]);
    }
}

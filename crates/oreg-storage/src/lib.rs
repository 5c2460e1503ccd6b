//! Registry storage for the oreg artifact registry.
//!
//! Content blobs live in a global, digest-keyed store. On top of it sits a
//! repository-scoped reference graph: for every subject digest, a set of
//! link records naming the referrers that annotate it.
//!
//! # Layers
//!
//! - [`paths`] -- pure mapping from logical entities to driver paths
//! - [`LinkStore`] -- `link` / `read_link` / `walk` over a driver
//! - [`ReferenceHandler`] -- the [`ReferenceService`]: `link` and `enumerate`
//! - [`BlobStore`] -- global content plus descriptor metadata
//! - [`ManifestStore`] -- manifests per repository, with the optional
//!   [`ReferrerEnumerator`] capability
//! - [`Registry`] -- opens repositories over one shared driver
//!
//! # Design Rules
//!
//! 1. Write-blob-then-link: referrer content is stored before its link.
//! 2. Links are never mutated to point elsewhere; a link's path already
//!    encodes repository, subject, media type, and referrer.
//! 3. A corrupt link is an error, never silently skipped.
//! 4. Errors are returned to the caller as-is; this layer never retries.

pub mod blobs;
pub mod error;
pub mod link;
pub mod manifests;
pub mod names;
pub mod paths;
pub mod references;
pub mod registry;

pub use blobs::{BlobDescriptorService, BlobStore};
pub use error::{StorageError, StorageResult};
pub use link::{LinkStore, LinkWalk};
pub use manifests::{ManifestPut, ManifestService, ManifestStore, ReferrerEnumerator};
pub use names::{validate_repository_name, RepositoryName};
pub use paths::{path_for, PathSpec, LAYOUT_VERSION};
pub use references::{ReferenceHandler, ReferenceService, ReferrerCollector, ReferrerVisitor};
pub use registry::{resolve_referrers, Namespace, Registry, Repository, StoredRepository};

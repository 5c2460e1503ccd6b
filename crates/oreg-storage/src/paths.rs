//! Storage layout: maps logical registry entities to driver paths.
//!
//! Layout scheme `v2`:
//!
//! ```text
//! /docker/registry/v2/
//!     blobs/<alg>/<hex[0..2]>/<hex>/data
//!     blobs/<alg>/<hex[0..2]>/<hex>/descriptor
//!     repositories/<name>/
//!         _manifests/revisions/<alg>/<hex>/link
//!         _referrers/subjects/<alg>/<hex>/                       (all referrers)
//!         _referrers/subjects/<alg>/<hex>/<bucket>/              (one media type)
//!         _referrers/subjects/<alg>/<hex>/<bucket>/<alg>/<hex>/link
//! ```
//!
//! Digests always occupy two segments, algorithm then hex. `<bucket>` is the
//! referrer media type run through [`escape_segment`]; the escape is
//! reversible, so distinct media types never share a bucket. Repository
//! name components cannot begin with `_`, so the reserved subtrees never
//! collide with a nested repository.
//!
//! Paths produced here contain no trailing `/`. A root path is an ancestor
//! of every link path beneath it: `link.starts_with(root + "/")`.

use oreg_types::Digest;

use crate::error::StorageResult;
use crate::names::RepositoryName;

/// Version tag of the layout scheme in use.
pub const LAYOUT_VERSION: &str = "v2";

/// Root of every path this registry writes.
pub const STORAGE_ROOT: &str = "/docker/registry/v2";

/// File name of link records.
pub const LINK_FILE: &str = "link";

/// Bucket segment used for the empty media type.
const EMPTY_BUCKET: &str = "_";

/// A logical location in the storage layout.
#[derive(Clone, Copy, Debug)]
pub enum PathSpec<'a> {
    /// Raw content of a blob.
    BlobData { digest: &'a Digest },
    /// JSON descriptor metadata recorded alongside a blob.
    BlobDescriptor { digest: &'a Digest },
    /// Link recording that a manifest revision belongs to a repository.
    ManifestRevisionLink {
        name: &'a RepositoryName,
        revision: &'a Digest,
    },
    /// Enumeration prefix for the referrers of `subject`.
    ///
    /// `media_type: None` covers every media-type bucket.
    SubjectReferrersRoot {
        name: &'a RepositoryName,
        subject: &'a Digest,
        media_type: Option<&'a str>,
    },
    /// Link for one `referrer --refers-to--> subject` edge.
    SubjectReferrerLink {
        name: &'a RepositoryName,
        media_type: &'a str,
        referrer: &'a Digest,
        subject: &'a Digest,
    },
}

/// Resolve a [`PathSpec`] to a driver path.
///
/// Pure: performs no I/O. Fails with `InvalidDigest` if a digest argument
/// does not pass syntactic validation.
pub fn path_for(spec: &PathSpec<'_>) -> StorageResult<String> {
    let path = match *spec {
        PathSpec::BlobData { digest } => format!("{}/data", blob_dir(digest)?),
        PathSpec::BlobDescriptor { digest } => format!("{}/descriptor", blob_dir(digest)?),
        PathSpec::ManifestRevisionLink { name, revision } => format!(
            "{}/_manifests/revisions/{}/{LINK_FILE}",
            repository_root(name),
            digest_segments(revision)?
        ),
        PathSpec::SubjectReferrersRoot {
            name,
            subject,
            media_type,
        } => {
            let root = subject_root(name, subject)?;
            match media_type {
                Some(media_type) => format!("{root}/{}", media_type_bucket(media_type)),
                None => root,
            }
        }
        PathSpec::SubjectReferrerLink {
            name,
            media_type,
            referrer,
            subject,
        } => format!(
            "{}/{}/{}/{LINK_FILE}",
            subject_root(name, subject)?,
            media_type_bucket(media_type),
            digest_segments(referrer)?
        ),
    };
    Ok(path)
}

/// Path of the link recording `referrer --refers-to--> subject`.
pub fn subject_referrer_link_path(
    name: &RepositoryName,
    media_type: &str,
    referrer: &Digest,
    subject: &Digest,
) -> StorageResult<String> {
    path_for(&PathSpec::SubjectReferrerLink {
        name,
        media_type,
        referrer,
        subject,
    })
}

/// Enumeration prefix for the referrers of `subject`; an empty media type
/// selects the unscoped root covering every bucket.
pub fn subject_referrers_root_path(
    name: &RepositoryName,
    media_type: &str,
    subject: &Digest,
) -> StorageResult<String> {
    path_for(&PathSpec::SubjectReferrersRoot {
        name,
        subject,
        media_type: (!media_type.is_empty()).then_some(media_type),
    })
}

fn repository_root(name: &RepositoryName) -> String {
    format!("{STORAGE_ROOT}/repositories/{name}")
}

fn subject_root(name: &RepositoryName, subject: &Digest) -> StorageResult<String> {
    Ok(format!(
        "{}/_referrers/subjects/{}",
        repository_root(name),
        digest_segments(subject)?
    ))
}

fn blob_dir(digest: &Digest) -> StorageResult<String> {
    digest.validate()?;
    let hex = digest.encoded();
    let fanout = &hex[..hex.len().min(2)];
    Ok(format!(
        "{STORAGE_ROOT}/blobs/{}/{fanout}/{hex}",
        escape_segment(digest.algorithm())
    ))
}

fn digest_segments(digest: &Digest) -> StorageResult<String> {
    digest.validate()?;
    Ok(format!(
        "{}/{}",
        escape_segment(digest.algorithm()),
        digest.encoded()
    ))
}

/// Bucket segment for a referrer media type.
pub fn media_type_bucket(media_type: &str) -> String {
    if media_type.is_empty() {
        EMPTY_BUCKET.to_string()
    } else {
        escape_segment(media_type)
    }
}

/// Recover the media type from a bucket segment.
pub fn decode_media_type_bucket(bucket: &str) -> Option<String> {
    if bucket == EMPTY_BUCKET {
        return Some(String::new());
    }
    unescape_segment(bucket)
}

/// Escape an arbitrary string into a single safe path segment.
///
/// `[a-z0-9.-]` pass through, except a leading `.`; every other byte
/// becomes `_` followed by two lowercase hex digits.
pub fn escape_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, b) in raw.bytes().enumerate() {
        let plain = b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || (b == b'.' && i > 0);
        if plain {
            out.push(b as char);
        } else {
            out.push('_');
            out.push_str(&format!("{b:02x}"));
        }
    }
    out
}

/// Inverse of [`escape_segment`]. Returns `None` for malformed input.
pub fn unescape_segment(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            let pair = escaped.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(pair, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

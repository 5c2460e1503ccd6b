use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// Well-known OCI media types.
pub mod media_types {
    pub const IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";
    pub const IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
    pub const EMPTY_JSON: &str = "application/vnd.oci.empty.v1+json";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Typed reference to a stored blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,
    pub digest: Digest,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
}

impl Descriptor {
    pub fn new(media_type: impl Into<String>, digest: Digest, size: u64) -> Self {
        Self {
            media_type: media_type.into(),
            digest,
            size,
            artifact_type: None,
        }
    }

    pub fn with_artifact_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = Some(artifact_type.into());
        self
    }
}

/// Versioned index document listing descriptors.
///
/// Serializes as `application/vnd.oci.image.index.v1+json`. This is the
/// body of a referrers response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    pub schema_version: u32,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    pub manifests: Vec<Descriptor>,
}

impl ImageIndex {
    /// Schema version of every index document this registry emits.
    pub const SCHEMA_VERSION: u32 = 2;

    /// Wrap descriptors in a version-2 image index.
    pub fn new(manifests: Vec<Descriptor>) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION,
            media_type: media_types::IMAGE_INDEX.to_string(),
            artifact_type: None,
            manifests,
        }
    }
}

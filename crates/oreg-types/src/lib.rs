//! Foundation types for the oreg artifact registry.
//!
//! Every other oreg crate depends on `oreg-types`.
//!
//! # Key Types
//!
//! - [`Digest`] -- Algorithm-tagged content hash (`algorithm:hex`)
//! - [`Algorithm`] -- Hash algorithms the registry can compute
//! - [`Descriptor`] -- Typed reference to a blob (digest, media type, size)
//! - [`ImageIndex`] -- Versioned index document listing descriptors

pub mod descriptor;
pub mod digest;
pub mod error;

pub use descriptor::{media_types, Descriptor, ImageIndex};
pub use digest::{Algorithm, Digest};
pub use error::TypeError;

//! Byte-storage drivers for the oreg artifact registry.
//!
//! A driver is a flat hierarchical namespace of immutable-by-convention
//! byte objects. It knows nothing about digests, links, or repositories;
//! those live in `oreg-storage`.
//!
//! # Backends
//!
//! All backends implement the [`StorageDriver`] trait:
//!
//! - [`InMemoryDriver`] -- `BTreeMap`-based driver for tests and embedding
//! - [`FilesystemDriver`] -- local directory, atomic rename-into-place writes
//!
//! # Walking
//!
//! [`Walker`] enumerates a subtree depth-first in lexicographic
//! order using only `list` and `stat`, so every backend gets the same walk
//! semantics.

pub mod context;
pub mod error;
pub mod filesystem;
pub mod memory;
pub mod traits;
pub mod walk;

pub use context::Context;
pub use error::{DriverError, DriverResult};
pub use filesystem::FilesystemDriver;
pub use memory::InMemoryDriver;
pub use traits::{join, validate_path, FileInfo, StorageDriver};
pub use walk::Walker;

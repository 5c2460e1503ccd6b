//! HTTP server for the oreg artifact registry.
//!
//! Serves the OCI referrers endpoint over a [`Registry`](oreg_storage::Registry)
//! backed by the configured storage driver.

pub mod config;
pub mod error;
pub mod handler;
pub mod referrers;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ServerConfig, StorageConfig};
pub use error::{ServerError, ServerResult};
pub use server::{build_driver, OregServer};
pub use state::AppState;

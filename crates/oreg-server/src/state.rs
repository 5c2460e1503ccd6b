use std::sync::Arc;
use std::time::Duration;

use oreg_driver::Context;
use oreg_storage::Namespace;

/// Shared state handed to every route handler.
///
/// Holds only the namespace (and through it the shared storage driver);
/// requests share nothing else.
#[derive(Clone)]
pub struct AppState {
    namespace: Arc<dyn Namespace>,
    request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(namespace: Arc<dyn Namespace>) -> Self {
        Self {
            namespace,
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn namespace(&self) -> &dyn Namespace {
        self.namespace.as_ref()
    }

    /// A fresh context for one request, carrying the configured deadline.
    pub fn request_context(&self) -> Context {
        match self.request_timeout {
            Some(timeout) => Context::with_timeout(timeout),
            None => Context::background(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

//! Plugin-based backend registry
//!
//! The registry allows DNS backends to be registered dynamically at
//! runtime, avoiding hardcoded if-else chains in the daemon.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddflare_core::registry::BackendRegistry;
//! use ddflare_core::config::BackendConfig;
//!
//! let registry = BackendRegistry::new();
//! ddflare_provider_cloudflare::register(&registry);
//!
//! let config = BackendConfig::Cloudflare { ... };
//! let backend = registry.build_backend(&config)?;
//! ```
//!
//! ## Registration
//!
//! Backend crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &BackendRegistry) {
//!     registry.register_backend("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::traits::{BackendFactory, DnsBackend};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Backend registry keyed by [`BackendConfig::type_name`]
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct BackendRegistry {
    backends: RwLock<HashMap<String, Box<dyn BackendFactory>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend factory
    ///
    /// Registering the same name twice replaces the earlier factory.
    pub fn register_backend(&self, name: impl Into<String>, factory: Box<dyn BackendFactory>) {
        self.write().insert(name.into(), factory);
    }

    /// Create an uninitialized backend from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsBackend>)`: Created backend instance
    /// - `Err(Error)`: If the backend type is not registered or creation fails
    pub fn create_backend(&self, config: &BackendConfig) -> Result<Box<dyn DnsBackend>> {
        let backend_type = config.type_name();
        let backends = self.read();

        let factory = backends
            .get(backend_type)
            .ok_or_else(|| Error::config(format!("Unknown backend type: {}", backend_type)))?;

        factory.create(config)
    }

    /// Create a backend and initialize it with the configured credential
    pub fn build_backend(&self, config: &BackendConfig) -> Result<Box<dyn DnsBackend>> {
        let mut backend = self.create_backend(config)?;
        backend.init(&config.credential())?;
        Ok(backend)
    }

    /// List all registered backend types
    pub fn list_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a backend type is registered
    pub fn has_backend(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Box<dyn BackendFactory>>> {
        self.backends.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Box<dyn BackendFactory>>> {
        self.backends.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

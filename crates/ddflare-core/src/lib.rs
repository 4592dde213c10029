// # ddflare-core
//
// Core library for the ddflare update reconciliation engine.
//
// ## Architecture Overview
//
// - **DnsBackend**: One contract for protocol-incompatible DDNS providers
// - **IpSource**: Trait for discovering the address the record should hold
// - **resolver**: Syntactic zone derivation and local DNS lookups
// - **LastSetCache**: Process-local record of confirmed addresses
// - **Reconciler**: Decides when a write is needed and performs it
// - **BackendRegistry**: Plugin-based registry for backends
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Protocol clients classify replies, the loop decides
// 2. **Plugin-Based**: Backends are registered dynamically, no hard-coded if-else
// 3. **Library-First**: All core functionality can be used as a library
// 4. **No Hidden Retries**: Failures surface to the caller with context

pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod state;
pub mod traits;

/// User agent sent to providers unless overridden
pub const DEFAULT_USER_AGENT: &str = concat!("ddflare/", env!("CARGO_PKG_VERSION"));

// Re-export core types for convenience
pub use config::{BackendConfig, DdflareConfig, ReconcileConfig, Service};
pub use engine::{CurrentReason, CycleOutcome, EngineEvent, Reconciler};
pub use error::{Error, Result};
pub use registry::BackendRegistry;
pub use resolver::{AddressPolicy, derive_zone, resolve_host};
pub use state::LastSetCache;
pub use traits::{BackendFactory, DnsBackend, IpSource, IpVersion, UpdateResult};

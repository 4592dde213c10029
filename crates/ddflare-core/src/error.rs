//! Error types for ddflare
//!
//! This module defines all error types used throughout the workspace.
//! Backends return these errors immediately and never retry; the
//! reconciliation loop decides what to do with them.

use std::net::IpAddr;
use thiserror::Error;

/// Result type alias for ddflare operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ddflare
#[derive(Error, Debug)]
pub enum Error {
    /// Backend used before (or without) a successful `init`
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// `init` called on an already initialized backend
    #[error("backend already initialized: {0}")]
    AlreadyInitialized(String),

    /// The FQDN cannot yield a zone or is otherwise malformed
    #[error("invalid name {name:?}: {reason}")]
    InvalidName {
        /// The offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Local DNS resolution failed or returned no address
    #[error("cannot resolve {fqdn:?}: {reason}")]
    Resolution {
        /// The name being resolved
        fqdn: String,
        /// Underlying resolver failure
        reason: String,
    },

    /// Transport failure talking to a third-party service
    #[error("network error: {0}")]
    Network(String),

    /// Zone lookup failed at the provider
    #[error("zone {zone:?} not found: {reason}")]
    ZoneNotFound {
        /// The derived zone name
        zone: String,
        /// Provider-side cause
        reason: String,
    },

    /// No address record matches the FQDN
    #[error("no record found for {0:?}")]
    RecordNotFound(String),

    /// More than one address record matches the FQDN
    #[error("found {count} records matching {fqdn:?}, refusing to pick one")]
    AmbiguousRecord {
        /// The FQDN being updated
        fqdn: String,
        /// Number of matching records
        count: usize,
    },

    /// Provider call failed
    #[error("provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Transport-level failure on the legacy update protocol
    #[error("communication error with {endpoint}: {reason}")]
    Communication {
        /// Endpoint base URL
        endpoint: String,
        /// What went wrong
        reason: String,
    },

    /// The update endpoint answered with a failure status
    #[error("update rejected ({code}): {message}")]
    Status {
        /// Raw status token returned by the endpoint
        code: String,
        /// Human readable meaning of the status
        message: String,
    },

    /// Operation not supported by this backend
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// A reconciliation cycle failed; carries the cycle context
    #[error("update of {fqdn} to {ip} failed: {source}")]
    Update {
        /// Target FQDN
        fqdn: String,
        /// Attempted IP
        ip: IpAddr,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a "not authorized" error
    pub fn not_authorized(msg: impl Into<String>) -> Self {
        Self::NotAuthorized(msg.into())
    }

    /// Create an "already initialized" error
    pub fn already_initialized(backend: impl Into<String>) -> Self {
        Self::AlreadyInitialized(backend.into())
    }

    /// Create an invalid name error
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a resolution error
    pub fn resolution(fqdn: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            fqdn: fqdn.into(),
            reason: reason.into(),
        }
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a "zone not found" error
    pub fn zone_not_found(zone: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ZoneNotFound {
            zone: zone.into(),
            reason: reason.into(),
        }
    }

    /// Create a "record not found" error
    pub fn record_not_found(fqdn: impl Into<String>) -> Self {
        Self::RecordNotFound(fqdn.into())
    }

    /// Create an ambiguous record error
    pub fn ambiguous_record(fqdn: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousRecord {
            fqdn: fqdn.into(),
            count,
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a communication error
    pub fn communication(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Communication {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create a status error from a protocol reply
    pub fn status(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Wrap an error with the FQDN and IP of the failed cycle
    pub fn update(fqdn: impl Into<String>, ip: IpAddr, source: Error) -> Self {
        Self::Update {
            fqdn: fqdn.into(),
            ip,
            source: Box::new(source),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// The innermost error, looking through [`Error::Update`] wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Update { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_wrapper_keeps_context() {
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        let err = Error::update("host.example.com", ip, Error::record_not_found("host.example.com"));

        let msg = err.to_string();
        assert!(msg.contains("host.example.com"));
        assert!(msg.contains("203.0.113.9"));
        assert!(matches!(err.root_cause(), Error::RecordNotFound(_)));
    }

    #[test]
    fn status_error_displays_message() {
        let err = Error::status("badauth", "bad username or password");
        assert_eq!(err.to_string(), "update rejected (badauth): bad username or password");
    }
}

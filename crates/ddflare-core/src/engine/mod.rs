//! Update reconciliation loop
//!
//! The [`Reconciler`] is responsible for:
//! - Determining the desired IP (explicit address or [`IpSource`])
//! - Deciding whether a write is needed (check mode: cache, then live resolve)
//! - Writing through the [`DnsBackend`]
//! - Caching the confirmed address after a successful write
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  IpSource   │─── desired IP ──────┐
//! └─────────────┘                     │
//!                                     ▼
//!                            ┌──────────────┐
//!                            │  Reconciler  │
//!                            └──────────────┘
//!                                     │
//!         ┌───────────────────────────┼───────────────────────────┐
//!         │                           │                           │
//!         ▼                           ▼                           ▼
//! ┌──────────────┐          ┌──────────────┐           ┌─────────────┐
//! │ LastSetCache │          │  DnsBackend  │           │   Events    │
//! │ (check)      │          │ (resolve/    │           │  (notify)   │
//! └──────────────┘          │  update)     │           └─────────────┘
//!                           └──────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Desired IP: explicit address wins, else ask the IP source
//! 2. Check mode only: cache hit → done; live resolve match → cache, done
//! 3. `backend.update()`; on success cache the IP
//! 4. Emit event for monitoring/logging

use crate::config::{ReconcileConfig, validate_fqdn};
use crate::error::{Error, Result};
use crate::state::LastSetCache;
use crate::traits::{DnsBackend, IpSource, UpdateResult};
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Default capacity of the engine event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Why a cycle decided no write was needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentReason {
    /// The last-set cache already holds the desired IP
    Cached,
    /// The live lookup returned the desired IP
    Resolved,
    /// The provider answered that nothing changed
    ProviderUnchanged,
}

/// Successful outcome of one reconciliation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The record was written
    Updated {
        /// Address now set
        ip: IpAddr,
    },
    /// The record already pointed at the desired address
    AlreadyCurrent {
        /// Address the record holds
        ip: IpAddr,
        /// How that was established
        reason: CurrentReason,
    },
}

impl CycleOutcome {
    /// Address the record holds after the cycle
    pub fn ip(&self) -> IpAddr {
        match self {
            CycleOutcome::Updated { ip } | CycleOutcome::AlreadyCurrent { ip, .. } => *ip,
        }
    }

    /// True if the cycle performed a write
    pub fn is_updated(&self) -> bool {
        matches!(self, CycleOutcome::Updated { .. })
    }
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Reconciler started
    Started {
        fqdn: String,
        interval: Duration,
    },

    /// Backend write started
    UpdateStarted {
        fqdn: String,
        new_ip: IpAddr,
    },

    /// Backend write succeeded
    UpdateSucceeded {
        fqdn: String,
        new_ip: IpAddr,
    },

    /// Write skipped (record already current)
    UpdateSkipped {
        fqdn: String,
        current_ip: IpAddr,
        reason: CurrentReason,
    },

    /// Cycle failed
    UpdateFailed {
        fqdn: String,
        error: String,
    },

    /// Reconciler stopped
    Stopped {
        reason: String,
    },
}

/// Update reconciliation loop for one FQDN
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`] (backend already initialized)
/// 2. Drive with [`Reconciler::run()`] or single [`Reconciler::run_once()`] cycles
/// 3. Take the cache back with [`Reconciler::into_cache()`] if needed
///
/// ## Ownership
///
/// The reconciler owns its backend, IP source and cache. Everything runs on
/// the caller's task; there is no internal concurrency and the backend
/// never sees concurrent `update` calls.
pub struct Reconciler {
    /// Backend the record is written through
    backend: Box<dyn DnsBackend>,

    /// Source of the desired IP when no explicit address is set
    ip_source: Box<dyn IpSource>,

    /// Loop settings
    config: ReconcileConfig,

    /// Addresses confirmed by this reconciler
    cache: LastSetCache,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `backend`: initialized backend
    /// - `ip_source`: public IP discovery (consulted only without explicit address)
    /// - `config`: loop settings
    /// - `cache`: previously confirmed addresses (usually empty)
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields engine events
    pub fn new(
        backend: Box<dyn DnsBackend>,
        ip_source: Box<dyn IpSource>,
        config: ReconcileConfig,
        cache: LastSetCache,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        Self::with_event_capacity(
            backend,
            ip_source,
            config,
            cache,
            DEFAULT_EVENT_CHANNEL_CAPACITY,
        )
    }

    /// Like [`Reconciler::new()`] with an explicit event channel capacity
    pub fn with_event_capacity(
        backend: Box<dyn DnsBackend>,
        ip_source: Box<dyn IpSource>,
        config: ReconcileConfig,
        cache: LastSetCache,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        validate_fqdn(&config.fqdn)?;
        if capacity == 0 {
            return Err(Error::config("event channel capacity must be > 0"));
        }

        let (tx, rx) = mpsc::channel(capacity);

        let reconciler = Self {
            backend,
            ip_source,
            config,
            cache,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Loop settings
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Current cache contents
    pub fn cache(&self) -> &LastSetCache {
        &self.cache
    }

    /// Consume the reconciler and hand the cache back
    pub fn into_cache(self) -> LastSetCache {
        self.cache
    }

    /// Run the loop
    ///
    /// With a zero interval exactly one cycle runs and its error is returned.
    /// Otherwise cycles repeat until Ctrl-C; cycle errors are logged and the
    /// loop keeps going.
    ///
    /// # Returns
    ///
    /// The outcome of the last cycle that ran.
    pub async fn run(&mut self) -> Result<CycleOutcome> {
        self.run_internal(None).await
    }

    /// Run the loop, stopping when `shutdown_rx` fires instead of on Ctrl-C
    ///
    /// Used by embedding applications and tests that need deterministic
    /// shutdown.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<CycleOutcome> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<CycleOutcome> {
        let interval = self.config.interval;
        self.emit_event(EngineEvent::Started {
            fqdn: self.config.fqdn.clone(),
            interval,
        });

        if interval.is_zero() {
            let outcome = self.run_once().await;
            self.emit_event(EngineEvent::Stopped {
                reason: "Single cycle completed".to_string(),
            });
            return outcome;
        }

        info!(
            "Reconciling {} every {}s (check mode)",
            self.config.fqdn,
            interval.as_secs()
        );

        let mut shutdown_rx = shutdown_rx;
        let mut last = self.run_once().await;

        loop {
            if let Err(e) = &last {
                error!("Update cycle for {} failed: {}", self.config.fqdn, e);
            }

            let stop = match shutdown_rx.as_mut() {
                // Test mode: wait for provided shutdown signal
                Some(rx) => tokio::select! {
                    _ = tokio::time::sleep(interval) => false,
                    _ = rx => true,
                },
                // Production mode: wait for SIGINT
                None => tokio::select! {
                    _ = tokio::time::sleep(interval) => false,
                    _ = tokio::signal::ctrl_c() => true,
                },
            };

            if stop {
                info!("Shutdown signal received");
                self.emit_event(EngineEvent::Stopped {
                    reason: "Shutdown signal".to_string(),
                });
                return last;
            }

            last = self.run_once().await;
        }
    }

    /// Run one reconciliation cycle
    ///
    /// Errors after the desired IP is known are wrapped in
    /// [`Error::Update`] with the FQDN and attempted IP.
    pub async fn run_once(&mut self) -> Result<CycleOutcome> {
        let ip = match self.desired_ip().await {
            Ok(ip) => ip,
            Err(e) => {
                self.emit_failure(&e);
                return Err(e);
            }
        };

        let result = if self.check_enabled() {
            self.reconcile_checked(ip).await
        } else {
            self.write(ip).await
        };

        result.map_err(|e| {
            self.emit_failure(&e);
            Error::update(self.config.fqdn.clone(), ip, e)
        })
    }

    /// Cache-aware write without the live check
    ///
    /// Skips the backend if the cache already holds `ip`, otherwise updates
    /// and caches on success.
    pub async fn update_fqdn(&mut self, ip: IpAddr) -> Result<CycleOutcome> {
        if let Some(outcome) = self.cache_hit(ip) {
            return Ok(outcome);
        }
        self.write(ip)
            .await
            .map_err(|e| Error::update(self.config.fqdn.clone(), ip, e))
    }

    /// Check whether the FQDN already points at `ip`
    ///
    /// The cache is consulted first, then the live resolver. Resolution
    /// errors are returned to the caller.
    pub async fn is_fqdn_up_to_date(&self, ip: IpAddr) -> Result<bool> {
        if self.cache.is_current(&self.config.fqdn, ip) {
            return Ok(true);
        }
        let live = self.backend.resolve(&self.config.fqdn).await?;
        Ok(live == ip)
    }

    /// Check mode is on when requested or when cycles repeat
    fn check_enabled(&self) -> bool {
        self.config.check || !self.config.interval.is_zero()
    }

    async fn desired_ip(&self) -> Result<IpAddr> {
        if let Some(ip) = self.config.address {
            return Ok(ip);
        }

        let ip = self.ip_source.current().await?;
        debug!("Got public IP {} from {}", ip, self.ip_source.describe());
        Ok(ip)
    }

    async fn reconcile_checked(&mut self, ip: IpAddr) -> Result<CycleOutcome> {
        if let Some(outcome) = self.cache_hit(ip) {
            return Ok(outcome);
        }

        let fqdn = self.config.fqdn.clone();
        match self.backend.resolve(&fqdn).await {
            Ok(live) if live == ip => {
                debug!("{} already resolves to {}, skipping update", fqdn, ip);
                self.cache.record(&fqdn, ip);
                self.emit_event(EngineEvent::UpdateSkipped {
                    fqdn,
                    current_ip: ip,
                    reason: CurrentReason::Resolved,
                });
                return Ok(CycleOutcome::AlreadyCurrent {
                    ip,
                    reason: CurrentReason::Resolved,
                });
            }
            Ok(live) => {
                debug!("{} resolves to {}, want {}", fqdn, live, ip);
            }
            Err(e) => {
                warn!("Cannot check {} before update: {}", fqdn, e);
            }
        }

        self.write(ip).await
    }

    fn cache_hit(&self, ip: IpAddr) -> Option<CycleOutcome> {
        if !self.cache.is_current(&self.config.fqdn, ip) {
            return None;
        }

        debug!(
            "{} already set to {} by this process, skipping update",
            self.config.fqdn, ip
        );
        self.emit_event(EngineEvent::UpdateSkipped {
            fqdn: self.config.fqdn.clone(),
            current_ip: ip,
            reason: CurrentReason::Cached,
        });
        Some(CycleOutcome::AlreadyCurrent {
            ip,
            reason: CurrentReason::Cached,
        })
    }

    async fn write(&mut self, ip: IpAddr) -> Result<CycleOutcome> {
        let fqdn = self.config.fqdn.clone();

        self.emit_event(EngineEvent::UpdateStarted {
            fqdn: fqdn.clone(),
            new_ip: ip,
        });

        let outcome = match self.backend.update(&fqdn, ip).await? {
            UpdateResult::Updated { new_ip } => {
                info!(
                    "Updated {} -> {} via {}",
                    fqdn,
                    new_ip,
                    self.backend.backend_name()
                );
                self.emit_event(EngineEvent::UpdateSucceeded {
                    fqdn: fqdn.clone(),
                    new_ip,
                });
                CycleOutcome::Updated { ip }
            }
            UpdateResult::Unchanged { current_ip } => {
                info!("{} unchanged at {}", fqdn, current_ip);
                self.emit_event(EngineEvent::UpdateSkipped {
                    fqdn: fqdn.clone(),
                    current_ip,
                    reason: CurrentReason::ProviderUnchanged,
                });
                CycleOutcome::AlreadyCurrent {
                    ip,
                    reason: CurrentReason::ProviderUnchanged,
                }
            }
        };

        self.cache.record(&fqdn, ip);
        Ok(outcome)
    }

    fn emit_failure(&self, error: &Error) {
        self.emit_event(EngineEvent::UpdateFailed {
            fqdn: self.config.fqdn.clone(),
            error: error.to_string(),
        });
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Send event, logging warning if channel is full (backpressure)
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, event discarded");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_accessors() {
        let ip: IpAddr = "203.0.113.9".parse().unwrap();

        let updated = CycleOutcome::Updated { ip };
        assert!(updated.is_updated());
        assert_eq!(updated.ip(), ip);

        let current = CycleOutcome::AlreadyCurrent {
            ip,
            reason: CurrentReason::Cached,
        };
        assert!(!current.is_updated());
        assert_eq!(current.ip(), ip);
    }

    #[test]
    fn test_engine_event_clone() {
        let event = EngineEvent::UpdateSkipped {
            fqdn: "host.example.com".to_string(),
            current_ip: IpAddr::from([203, 0, 113, 9]),
            reason: CurrentReason::Resolved,
        };

        assert_eq!(event.clone(), event);
    }
}

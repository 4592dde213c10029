//! Test doubles and common utilities for reconciliation tests
//!
//! The mock backend behaves like a tiny in-memory provider: `update` stores
//! the address and `resolve` returns it, so write-then-read round trips can
//! be checked without a network.

#![allow(dead_code)]

use ddflare_core::error::{Error, Result};
use ddflare_core::traits::{DnsBackend, IpSource, UpdateResult};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A mock DnsBackend that tracks calls
pub struct MockBackend {
    /// Call counter for update()
    update_calls: Arc<AtomicUsize>,
    /// Call counter for resolve()
    resolve_calls: Arc<AtomicUsize>,
    /// Address the fake provider currently holds
    record: Arc<Mutex<Option<IpAddr>>>,
    /// Reject every update when set
    fail_updates: Arc<AtomicBool>,
    /// Fail every resolve when set
    fail_resolve: Arc<AtomicBool>,
    /// Address reported back by update(), if it differs from the request
    confirmed: Arc<Mutex<Option<IpAddr>>>,
    /// Credential passed to init()
    credential: Option<String>,
    endpoint: String,
    user_agent: String,
}

impl MockBackend {
    /// Provider holding no record yet
    pub fn new() -> Self {
        Self {
            update_calls: Arc::new(AtomicUsize::new(0)),
            resolve_calls: Arc::new(AtomicUsize::new(0)),
            record: Arc::new(Mutex::new(None)),
            fail_updates: Arc::new(AtomicBool::new(false)),
            fail_resolve: Arc::new(AtomicBool::new(false)),
            confirmed: Arc::new(Mutex::new(None)),
            credential: Some("test-token".to_string()),
            endpoint: "mock://provider".to_string(),
            user_agent: "ddflare-tests".to_string(),
        }
    }

    /// Provider whose record already resolves to `ip`
    pub fn resolving_to(ip: IpAddr) -> Self {
        let backend = Self::new();
        *backend.record.lock().unwrap() = Some(ip);
        backend
    }

    /// Backend that was never initialized
    pub fn uninitialized() -> Self {
        Self {
            credential: None,
            ..Self::new()
        }
    }

    /// Create a new MockBackend that shares counters and record with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            update_calls: Arc::clone(&other.update_calls),
            resolve_calls: Arc::clone(&other.resolve_calls),
            record: Arc::clone(&other.record),
            fail_updates: Arc::clone(&other.fail_updates),
            fail_resolve: Arc::clone(&other.fail_resolve),
            confirmed: Arc::clone(&other.confirmed),
            credential: other.credential.clone(),
            endpoint: other.endpoint.clone(),
            user_agent: other.user_agent.clone(),
        }
    }

    /// Get the number of times update() was called
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Get the number of times resolve() was called
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// Total backend calls
    pub fn total_calls(&self) -> usize {
        self.update_calls() + self.resolve_calls()
    }

    /// Address the fake provider holds
    pub fn record(&self) -> Option<IpAddr> {
        *self.record.lock().unwrap()
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_resolve(&self, fail: bool) {
        self.fail_resolve.store(fail, Ordering::SeqCst);
    }

    /// Make update() report `ip` as the address the provider recorded
    pub fn set_confirmed_ip(&self, ip: IpAddr) {
        *self.confirmed.lock().unwrap() = Some(ip);
    }
}

#[async_trait::async_trait]
impl DnsBackend for MockBackend {
    fn init(&mut self, credential: &str) -> Result<()> {
        if self.credential.is_some() {
            return Err(Error::already_initialized("mock"));
        }
        self.credential = Some(credential.to_string());
        Ok(())
    }

    async fn resolve(&self, fqdn: &str) -> Result<IpAddr> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(Error::resolution(fqdn, "mock resolver failure"));
        }
        self.record()
            .ok_or_else(|| Error::resolution(fqdn, "no address records"))
    }

    async fn update(&self, fqdn: &str, ip: IpAddr) -> Result<UpdateResult> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        if self.credential.is_none() {
            return Err(Error::not_authorized("mock backend not initialized"));
        }
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", format!("update of {} rejected", fqdn)));
        }

        let reported = self.confirmed.lock().unwrap().unwrap_or(ip);
        let mut record = self.record.lock().unwrap();
        if *record == Some(ip) {
            return Ok(UpdateResult::Unchanged {
                current_ip: reported,
            });
        }
        *record = Some(ip);
        Ok(UpdateResult::Updated { new_ip: reported })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn set_endpoint(&mut self, endpoint: &str) {
        self.endpoint = endpoint.to_string();
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn set_user_agent(&mut self, user_agent: &str) {
        self.user_agent = user_agent.to_string();
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// An IP source returning a fixed address
pub struct FixedIpSource {
    ip: IpAddr,
    calls: Arc<AtomicUsize>,
}

impl FixedIpSource {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a new FixedIpSource that shares its counter with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            ip: other.ip,
            calls: Arc::clone(&other.calls),
        }
    }

    /// Get the number of times current() was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ip)
    }

    fn describe(&self) -> String {
        format!("fixed {}", self.ip)
    }
}

/// An IP source that always fails
pub struct FailingIpSource;

#[async_trait::async_trait]
impl IpSource for FailingIpSource {
    async fn current(&self) -> Result<IpAddr> {
        Err(Error::network("IP-echo service unreachable"))
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid IP literal")
}

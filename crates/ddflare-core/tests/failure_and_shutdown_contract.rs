//! Contract Test: Failure Surfacing & Shutdown Determinism
//!
//! Constraints verified:
//! - A single-shot run returns the cycle error with FQDN and IP context
//! - IP discovery failure is fatal for the cycle and never reaches the backend
//! - Backends are driven without retries
//! - With an interval, errors are logged and the loop keeps going until shutdown
//! - Shutdown returns the last cycle outcome

mod common;

use common::*;
use ddflare_core::{
    CycleOutcome, EngineEvent, Error, LastSetCache, ReconcileConfig, Reconciler,
};
use std::time::Duration;
use tokio::sync::oneshot;

const FQDN: &str = "host.example.com";

#[tokio::test]
async fn single_shot_surfaces_wrapped_error() {
    let desired = ip("203.0.113.9");
    let backend = MockBackend::new();
    backend.set_fail_updates(true);

    let (mut reconciler, mut events) = Reconciler::new(
        Box::new(MockBackend::sharing_counters_with(&backend)),
        Box::new(FixedIpSource::new(desired)),
        ReconcileConfig::new(FQDN),
        LastSetCache::new(),
    )
    .unwrap();

    let err = reconciler.run().await.unwrap_err();

    match &err {
        Error::Update { fqdn, ip, source } => {
            assert_eq!(fqdn, FQDN);
            assert_eq!(*ip, desired);
            assert!(matches!(**source, Error::Provider { .. }));
        }
        other => panic!("expected Update error, got {:?}", other),
    }

    // No retries inside the cycle
    assert_eq!(backend.update_calls(), 1);
    assert!(reconciler.cache().is_empty());

    assert!(matches!(events.recv().await, Some(EngineEvent::Started { .. })));
    assert!(matches!(events.recv().await, Some(EngineEvent::UpdateStarted { .. })));
    assert!(matches!(events.recv().await, Some(EngineEvent::UpdateFailed { .. })));
    assert!(matches!(events.recv().await, Some(EngineEvent::Stopped { .. })));
}

#[tokio::test]
async fn discovery_failure_is_fatal_for_cycle() {
    let backend = MockBackend::new();

    let (mut reconciler, _events) = Reconciler::new(
        Box::new(MockBackend::sharing_counters_with(&backend)),
        Box::new(FailingIpSource),
        ReconcileConfig::new(FQDN).with_check(true),
        LastSetCache::new(),
    )
    .unwrap();

    let err = reconciler.run_once().await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn uninitialized_backend_reports_not_authorized() {
    let backend = MockBackend::uninitialized();

    let (mut reconciler, _events) = Reconciler::new(
        Box::new(MockBackend::sharing_counters_with(&backend)),
        Box::new(FixedIpSource::new(ip("203.0.113.9"))),
        ReconcileConfig::new(FQDN),
        LastSetCache::new(),
    )
    .unwrap();

    let err = reconciler.run_once().await.unwrap_err();
    assert!(matches!(err.root_cause(), Error::NotAuthorized(_)));
}

#[tokio::test]
async fn interval_loop_survives_errors_until_shutdown() {
    let desired = ip("203.0.113.9");
    let backend = MockBackend::new();
    backend.set_fail_updates(true);

    let (mut reconciler, _events) = Reconciler::new(
        Box::new(MockBackend::sharing_counters_with(&backend)),
        Box::new(FixedIpSource::new(desired)),
        ReconcileConfig::new(FQDN)
            .with_check(true)
            .with_interval(Duration::from_millis(20)),
        LastSetCache::new(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let result = reconciler.run_with_shutdown(Some(shutdown_rx)).await;
        (result, reconciler)
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(
        backend.update_calls() >= 2,
        "loop should keep cycling after errors, got {} updates",
        backend.update_calls()
    );

    // Recover: next cycle succeeds and is cached
    backend.set_fail_updates(false);
    tokio::time::sleep(Duration::from_millis(100)).await;

    shutdown_tx.send(()).unwrap();
    let (result, reconciler) = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("reconciler stops promptly after shutdown")
        .unwrap();

    assert_eq!(
        result.unwrap(),
        CycleOutcome::AlreadyCurrent {
            ip: desired,
            reason: ddflare_core::CurrentReason::Cached
        }
    );
    assert!(reconciler.cache().is_current(FQDN, desired));
}

#[tokio::test]
async fn repeating_cycles_imply_check_mode() {
    let desired = ip("203.0.113.9");
    let backend = MockBackend::new();

    // No explicit check: the interval alone must enable it
    let (mut reconciler, _events) = Reconciler::new(
        Box::new(MockBackend::sharing_counters_with(&backend)),
        Box::new(FixedIpSource::new(desired)),
        ReconcileConfig::new(FQDN).with_interval(Duration::from_millis(20)),
        LastSetCache::new(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let result = reconciler.run_with_shutdown(Some(shutdown_rx)).await;
        (result, reconciler)
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown_tx.send(()).unwrap();
    let (result, reconciler) = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("reconciler stops promptly after shutdown")
        .unwrap();

    // First cycle: live check misses and writes; later cycles hit the cache
    assert_eq!(backend.update_calls(), 1);
    assert_eq!(backend.resolve_calls(), 1);
    assert_eq!(
        result.unwrap(),
        CycleOutcome::AlreadyCurrent {
            ip: desired,
            reason: ddflare_core::CurrentReason::Cached
        }
    );
    assert!(reconciler.cache().is_current(FQDN, desired));
}

#[tokio::test]
async fn shutdown_interrupts_long_interval() {
    let backend = MockBackend::new();

    let (mut reconciler, mut events) = Reconciler::new(
        Box::new(MockBackend::sharing_counters_with(&backend)),
        Box::new(FixedIpSource::new(ip("203.0.113.9"))),
        ReconcileConfig::new(FQDN).with_interval(Duration::from_secs(3600)),
        LastSetCache::new(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle =
        tokio::spawn(async move { reconciler.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("shutdown is not delayed by the interval")
        .unwrap();

    assert!(result.unwrap().is_updated());
    assert_eq!(backend.update_calls(), 1);

    let mut saw_stopped = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, EngineEvent::Stopped { .. }) {
            saw_stopped = true;
        }
    }
    assert!(saw_stopped);
}

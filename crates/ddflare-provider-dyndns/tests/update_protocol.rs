//! DynDNS backend against an in-process fake update endpoint

use ddflare_test_support::{CannedResponse, FakeServer};
use ddflare_core::traits::{DnsBackend, UpdateResult};
use ddflare_core::Error;
use ddflare_provider_dyndns::{DynDnsBackend, DynStatus};
use std::net::IpAddr;

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn backend_for(server: &FakeServer) -> DynDnsBackend {
    let mut backend = DynDnsBackend::new(server.base_url.clone());
    backend.init("user:secret").unwrap();
    backend
}

#[tokio::test]
async fn good_reply_updates() {
    let server = FakeServer::start(vec![CannedResponse::new(200, "good 203.0.113.9\n")]).await;
    let backend = backend_for(&server);

    let result = backend.update("host.example.com", ip("203.0.113.9")).await.unwrap();
    assert_eq!(result, UpdateResult::Updated { new_ip: ip("203.0.113.9") });

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(
        requests[0].target,
        "/nic/update?hostname=host.example.com&myip=203.0.113.9"
    );
    assert_eq!(
        requests[0].header("authorization"),
        Some("Basic dXNlcjpzZWNyZXQ=")
    );
    let agent = requests[0].header("user-agent").unwrap();
    assert!(agent.starts_with("ddflare/"), "user agent: {}", agent);
}

#[tokio::test]
async fn nochg_reply_is_unchanged() {
    let server = FakeServer::start(vec![CannedResponse::new(200, "nochg 203.0.113.9")]).await;
    let backend = backend_for(&server);

    let result = backend.update("host.example.com", ip("203.0.113.9")).await.unwrap();
    assert_eq!(result, UpdateResult::Unchanged { current_ip: ip("203.0.113.9") });
}

#[tokio::test]
async fn failure_status_is_surfaced() {
    let server = FakeServer::start(vec![CannedResponse::new(200, "badauth")]).await;
    let backend = backend_for(&server);

    let err = backend.update("host.example.com", ip("203.0.113.9")).await.unwrap_err();
    match err {
        Error::Status { code, message } => {
            assert_eq!(code, "badauth");
            assert_eq!(message, "bad username or password");
        }
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn non_success_http_status_is_communication_error() {
    let server = FakeServer::start(vec![CannedResponse::new(500, "good 203.0.113.9")]).await;
    let backend = backend_for(&server);

    let err = backend.update("host.example.com", ip("203.0.113.9")).await.unwrap_err();
    assert!(matches!(err, Error::Communication { .. }), "got {:?}", err);
}

#[tokio::test]
async fn empty_body_is_communication_error() {
    let server = FakeServer::start(vec![CannedResponse::new(200, "")]).await;
    let backend = backend_for(&server);

    let err = backend.update("host.example.com", ip("203.0.113.9")).await.unwrap_err();
    assert!(matches!(err, Error::Communication { .. }), "got {:?}", err);
}

#[tokio::test]
async fn update_from_source_omits_myip() {
    let server = FakeServer::start(vec![CannedResponse::new(200, "good 198.51.100.20")]).await;
    let backend = backend_for(&server);

    let reply = backend.update_from_source("host.example.com").await.unwrap();
    assert_eq!(reply.status, DynStatus::Good);
    assert_eq!(reply.argument.as_deref(), Some("198.51.100.20"));

    let requests = server.requests();
    assert_eq!(requests[0].target, "/nic/update?hostname=host.example.com");
}

#[tokio::test]
async fn custom_user_agent_is_sent() {
    let server = FakeServer::start(vec![CannedResponse::new(200, "good 2001:db8::9")]).await;
    let mut backend = DynDnsBackend::new(server.base_url.clone());
    backend.set_user_agent("router-firmware/3.1 ops@example.com");
    backend.init("user:secret").unwrap();

    let result = backend.update("host.example.com", ip("2001:db8::9")).await.unwrap();
    assert_eq!(result.ip(), ip("2001:db8::9"));

    let requests = server.requests();
    assert_eq!(
        requests[0].header("user-agent"),
        Some("router-firmware/3.1 ops@example.com")
    );
    assert_eq!(
        requests[0].target,
        "/nic/update?hostname=host.example.com&myip=2001%3Adb8%3A%3A9"
    );
}

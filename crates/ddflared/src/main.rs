// # ddflared - Dynamic DNS updater
//
// Thin integration layer: parses the command line, sets up logging and the
// runtime, registers backends and hands control to the core reconciler.
// Update logic lives in ddflare-core and the provider crates.
//
// ## Commands
//
// - `set <fqdn>`: point the record at the given or discovered address,
//   once or every `--interval` seconds
// - `get [fqdn]`: print what the FQDN resolves to, or the public IP
// - `version`
//
// See `cli.rs` for flags and their environment variables.

mod cli;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use cli::{Cli, Command, GetArgs, format_get};
use ddflare_core::traits::IpSource;
use ddflare_core::{BackendRegistry, DnsBackend, EngineEvent, LastSetCache, Reconciler};
use ddflare_ip_http::PublicIpSource;
use std::process::ExitCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdflareExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (update failed)
    RuntimeError = 2,
}

impl From<DdflareExitCode> for ExitCode {
    fn from(code: DdflareExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    DdflareExitCode::CleanShutdown.into()
                }
                _ => DdflareExitCode::ConfigError.into(),
            };
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(cli.level()).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdflareExitCode::ConfigError.into();
    }

    let set = match cli.command {
        Command::Version => {
            println!("ddflared {}", env!("CARGO_PKG_VERSION"));
            return DdflareExitCode::CleanShutdown.into();
        }
        Command::Get(args) => return block_on(run_get(args)),
        Command::Set(args) => args,
    };

    // Configuration problems are reported before any network traffic
    let config = match set.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdflareExitCode::ConfigError.into();
        }
    };

    let registry = BackendRegistry::new();
    register_backends(&registry);

    let backend = match build_backend(&registry, &config.backend, set.user_agent.as_deref()) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("DNS backend initialization failed: {}", e);
            return DdflareExitCode::ConfigError.into();
        }
    };

    let ip_source = PublicIpSource::new(set.ip_service.clone());
    block_on(run_set(config, backend, ip_source))
}

/// Run a command future on a fresh multi-threaded runtime
fn block_on<F>(fut: F) -> ExitCode
where
    F: std::future::Future<Output = Result<()>>,
{
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdflareExitCode::RuntimeError.into();
        }
    };

    match rt.block_on(fut) {
        Ok(()) => DdflareExitCode::CleanShutdown.into(),
        Err(e) => {
            error!("{:#}", e);
            DdflareExitCode::RuntimeError.into()
        }
    }
}

/// Register the backends compiled into this binary
fn register_backends(registry: &BackendRegistry) {
    #[cfg(feature = "cloudflare")]
    ddflare_provider_cloudflare::register(registry);

    #[cfg(feature = "dyndns")]
    ddflare_provider_dyndns::register(registry);

    debug!("Registered backends: {:?}", registry.list_backends());
}

/// Create and initialize the configured backend
///
/// The user agent must be set before `init`: the REST client captures it.
fn build_backend(
    registry: &BackendRegistry,
    config: &ddflare_core::BackendConfig,
    user_agent: Option<&str>,
) -> ddflare_core::Result<Box<dyn DnsBackend>> {
    let Some(user_agent) = user_agent else {
        return registry.build_backend(config);
    };

    let mut backend = registry.create_backend(config)?;
    backend.set_user_agent(user_agent);
    backend.init(&config.credential())?;
    Ok(backend)
}

async fn run_set(
    config: ddflare_core::DdflareConfig,
    backend: Box<dyn DnsBackend>,
    ip_source: PublicIpSource,
) -> Result<()> {
    info!(
        "Managing {} via {} ({})",
        config.fqdn,
        backend.backend_name(),
        backend.endpoint()
    );
    if config.address.is_none() {
        info!("Discovering public IP from {}", ip_source.describe());
    }

    let (mut reconciler, events) = Reconciler::with_event_capacity(
        backend,
        Box::new(ip_source),
        config.reconcile_config(),
        LastSetCache::new(),
        config.engine.event_channel_capacity,
    )?;
    let monitor = tokio::spawn(log_events(events));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown handler error: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    let result = reconciler.run_with_shutdown(Some(shutdown_rx)).await;

    // Dropping the reconciler closes the event channel and ends the monitor
    drop(reconciler);
    let _ = monitor.await;

    match result {
        Ok(outcome) => {
            info!(
                "FQDN update successful: {} -> {} ({})",
                config.fqdn,
                outcome.ip(),
                if outcome.is_updated() { "updated" } else { "already current" }
            );
            Ok(())
        }
        Err(e) => Err(anyhow::Error::from(e).context("FQDN update failed")),
    }
}

/// Print the address of `fqdn`, or the public IP when no FQDN is given
async fn run_get(args: GetArgs) -> Result<()> {
    let (target, ip) = match args.fqdn.as_deref() {
        Some(fqdn) => (fqdn.to_string(), ddflare_core::resolve_host(fqdn).await?),
        None => {
            let source = PublicIpSource::new(args.ip_service.clone());
            ("public IP".to_string(), source.current().await?)
        }
    };

    println!("{}", format_get(&target, ip, args.quiet));
    Ok(())
}

/// Forward engine events to the debug log
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Engine event: {:?}", event);
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

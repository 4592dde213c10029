// # Command Line
//
// Every `set` flag falls back to a `DDFLARE_*` environment variable so the
// daemon can run from a container or a systemd unit without arguments.
//
// ```bash
// export DDFLARE_API_TOKEN=your_token
// ddflared set --loop host.example.com
//
// ddflared set --svc noip --user me --password secret host.example.com
// ddflared get host.example.com
// ```

use anyhow::{Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use ddflare_core::config::{DEFAULT_LOOP_INTERVAL_SECS, resolve_service};
use ddflare_core::{BackendConfig, DdflareConfig, Service};
use std::net::IpAddr;
use tracing::Level;

/// Dynamic DNS updater for Cloudflare and DynDNS-protocol services
#[derive(Debug, Parser)]
#[command(name = "ddflared")]
pub struct Cli {
    /// Log level
    #[arg(
        long,
        global = true,
        env = "DDFLARE_LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    pub log_level: String,

    /// Shorthand for `--log-level debug`
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Effective tracing level
    pub fn level(&self) -> Level {
        if self.verbose {
            return Level::DEBUG;
        }
        match self.log_level.as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Point the address record of an FQDN at the current IP
    Set(SetArgs),
    /// Print the address an FQDN resolves to (or the public IP)
    Get(GetArgs),
    /// Print the version
    Version,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// FQDN whose record is updated
    pub fqdn: String,

    /// Address to set (default: discovered public IP)
    #[arg(short, long, env = "DDFLARE_IP_ADDRESS")]
    pub address: Option<IpAddr>,

    /// API authentication token
    #[arg(short = 't', long, env = "DDFLARE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Username (alternative to the API token)
    #[arg(short, long, env = "DDFLARE_USER")]
    pub user: Option<String>,

    /// Password (alternative to the API token)
    #[arg(short, long, env = "DDFLARE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Service: cflare, dyn, noip, ddns or a DynDNS-protocol URL
    #[arg(short, long, env = "DDFLARE_SERVICE_PROVIDER", default_value = "cflare")]
    pub svc: String,

    /// Cloudflare zone ID (looked up from the FQDN when omitted)
    #[arg(long, env = "DDFLARE_ZONE_ID")]
    pub zone_id: Option<String>,

    /// Skip the write when the record already has the address
    #[arg(short, long)]
    pub check: bool,

    /// Seconds between updates (implies --check)
    #[arg(short, long, env = "DDFLARE_CHECK_INTERVAL")]
    pub interval: Option<u64>,

    /// Keep updating every 5 minutes unless --interval is set
    #[arg(short = 'l', long = "loop")]
    pub run_loop: bool,

    /// IP-echo service used for public IP discovery
    #[arg(long, env = "DDFLARE_IP_SERVICE", default_value = ddflare_ip_http::DEFAULT_IP_SERVICE)]
    pub ip_service: String,

    /// User agent sent to the provider
    #[arg(long, env = "DDFLARE_USER_AGENT")]
    pub user_agent: Option<String>,
}

impl SetArgs {
    /// Seconds between cycles; 0 means a single update
    pub fn interval_secs(&self) -> u64 {
        match self.interval {
            Some(secs) if secs > 0 => secs,
            _ if self.run_loop => DEFAULT_LOOP_INTERVAL_SECS,
            _ => 0,
        }
    }

    /// Build and validate the engine configuration
    pub fn to_config(&self) -> Result<DdflareConfig> {
        let backend = match resolve_service(&self.svc)? {
            Service::Cloudflare => BackendConfig::Cloudflare {
                api_token: self.cloudflare_token()?,
                zone_id: self.zone_id.clone(),
                endpoint: None,
            },
            Service::DynDns(endpoint) => {
                let (username, password) = self.user_password()?;
                BackendConfig::DynDns {
                    endpoint,
                    username,
                    password,
                }
            }
        };

        let mut config = DdflareConfig::new(self.fqdn.clone(), backend);
        config.address = self.address;
        config.interval_secs = self.interval_secs();
        config.check = self.check || config.interval_secs > 0;
        config.validate()?;

        Ok(config)
    }

    fn token(&self) -> Option<&str> {
        self.api_token.as_deref().filter(|t| !t.is_empty())
    }

    fn cloudflare_token(&self) -> Result<String> {
        self.token()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("auth credential missing ('api-token')"))
    }

    // A token given to a DynDNS service is a `user:password` pair
    fn user_password(&self) -> Result<(String, String)> {
        let user = self.user.as_deref().filter(|u| !u.is_empty());
        let password = self.password.as_deref().filter(|p| !p.is_empty());

        if let (Some(user), Some(password)) = (user, password) {
            return Ok((user.to_string(), password.to_string()));
        }
        if let Some((user, password)) = self.token().and_then(|t| t.split_once(':')) {
            return Ok((user.to_string(), password.to_string()));
        }
        bail!("auth credential missing ('api-token' or 'user' + 'password')")
    }
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// FQDN to resolve (default: print the public IP)
    pub fqdn: Option<String>,

    /// Print only the address
    #[arg(short, long)]
    pub quiet: bool,

    /// IP-echo service used for public IP discovery
    #[arg(long, env = "DDFLARE_IP_SERVICE", default_value = ddflare_ip_http::DEFAULT_IP_SERVICE)]
    pub ip_service: String,
}

/// Line printed by `get`
pub fn format_get(target: &str, ip: IpAddr, quiet: bool) -> String {
    if quiet {
        ip.to_string()
    } else {
        format!("{} --> {}", target, ip)
    }
}

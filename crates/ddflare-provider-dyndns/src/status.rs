//! `/nic/update` reply classification
//!
//! The endpoint answers with a plain-text body: a status token, optionally
//! followed by an argument (the confirmed address on success). Classification
//! is pure and does no I/O.

use ddflare_core::{Error, Result};

/// Status token of an update reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynStatus {
    /// `good`: the update was applied
    Good,
    /// `nochg`: the record already had this address
    NoChange,
    /// `nohost`
    NoHost,
    /// `nofqdn`
    NotFqdn,
    /// `numhost`
    NumHost,
    /// `badauth`
    BadAuth,
    /// `badagent`
    BadAgent,
    /// `!donator`
    NotDonator,
    /// `abuse`
    Abuse,
    /// `dnserr`
    DnsError,
    /// `911`
    ServerError,
    /// Anything else
    Unknown,
}

impl DynStatus {
    /// Classify a status token (exact, case-sensitive)
    pub fn from_token(token: &str) -> Self {
        match token {
            "good" => DynStatus::Good,
            "nochg" => DynStatus::NoChange,
            "nohost" => DynStatus::NoHost,
            "nofqdn" => DynStatus::NotFqdn,
            "numhost" => DynStatus::NumHost,
            "badauth" => DynStatus::BadAuth,
            "badagent" => DynStatus::BadAgent,
            "!donator" => DynStatus::NotDonator,
            "abuse" => DynStatus::Abuse,
            "dnserr" => DynStatus::DnsError,
            "911" => DynStatus::ServerError,
            _ => DynStatus::Unknown,
        }
    }

    /// True for `good` and `nochg`
    pub fn is_success(self) -> bool {
        matches!(self, DynStatus::Good | DynStatus::NoChange)
    }

    /// Human readable meaning
    pub fn message(self) -> &'static str {
        match self {
            DynStatus::Good => "the update was successful",
            DynStatus::NoChange => "the update changed no settings",
            DynStatus::NoHost => "invalid FQDN: hostname does not exist",
            DynStatus::NotFqdn => "invalid FQDN: bad syntax",
            DynStatus::NumHost => "round robin update detected",
            DynStatus::BadAuth => "bad username or password",
            DynStatus::BadAgent => "invalid user agent",
            DynStatus::NotDonator => "premium option not available for this account",
            DynStatus::Abuse => "FQDN blocked for update abuse",
            DynStatus::DnsError => "server unavailable: DNS error, retry no sooner than 30 minutes",
            DynStatus::ServerError => {
                "server unavailable: generic error, retry no sooner than 30 minutes"
            }
            DynStatus::Unknown => "protocol error: unknown status received",
        }
    }
}

/// A classified update reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReply {
    /// Classified status
    pub status: DynStatus,
    /// Raw status token as received
    pub code: String,
    /// Optional argument (the confirmed address on success)
    pub argument: Option<String>,
}

impl StatusReply {
    /// Turn a failure status into [`Error::Status`]
    pub fn into_result(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(Error::status(self.code, self.status.message()))
        }
    }
}

/// Classify a reply body
///
/// The body is split on whitespace: the first token is the status, the
/// second an optional argument. Extra tokens are logged and ignored.
pub fn interpret_status(body: &str) -> StatusReply {
    let tokens: Vec<&str> = body.split_whitespace().collect();

    if tokens.len() > 2 {
        tracing::warn!("Unexpected number of arguments in reply: {:?}", tokens);
    }

    let code = tokens.first().copied().unwrap_or_default();
    let status = DynStatus::from_token(code);
    let argument = tokens.get(1).map(|arg| arg.to_string());

    match status {
        DynStatus::Good | DynStatus::NoChange if argument.is_none() => {
            tracing::warn!("Invalid reply, missing argument for status {}", code);
        }
        _ => {}
    }
    if status == DynStatus::NoChange {
        tracing::warn!("Update changed no settings; repeated nochg updates are considered abusive");
    }

    StatusReply {
        status,
        code: code.to_string(),
        argument,
    }
}

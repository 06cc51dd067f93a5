//! Client configuration, read once at process start.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::enrichment::Coordinates;

pub const API_URL_ENV: &str = "MERCHANTDESK_API_URL";
pub const TIMEOUT_ENV: &str = "MERCHANTDESK_TIMEOUT_MS";
pub const ENRICHMENT_TIMEOUT_ENV: &str = "MERCHANTDESK_ENRICHMENT_TIMEOUT_MS";
pub const IP_LOOKUP_URL_ENV: &str = "MERCHANTDESK_IP_LOOKUP_URL";
pub const LOCATION_ENV: &str = "MERCHANTDESK_LOCATION";
pub const STATE_DB_ENV: &str = "MERCHANTDESK_STATE_DB";

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_ENRICHMENT_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid URL '{value}': {reason}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var}: expected a positive number of milliseconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var}: {reason}")]
    InvalidLocation { var: &'static str, reason: String },
}

/// Paths of the authentication endpoints, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub login: String,
    pub register: String,
    pub verify: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            register: "/auth/register".to_string(),
            verify: "/auth/verify".to_string(),
        }
    }
}

/// Navigation targets the session lifecycle redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surfaces {
    pub login: String,
    pub home: String,
}

impl Default for Surfaces {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            home: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Origin every dispatched path is resolved against.
    pub base_url: Url,
    /// Upper bound on a single dispatched call.
    pub request_timeout: Duration,
    /// Upper bound on each enrichment lookup.
    pub enrichment_timeout: Duration,
    /// `None` disables the IP lookup.
    pub ip_lookup_url: Option<Url>,
    /// `None` means geolocation is denied.
    pub fixed_location: Option<Coordinates>,
    /// Durable session state database; `None` when no data directory exists.
    pub state_db_path: Option<PathBuf>,
    pub endpoints: AuthEndpoints,
    pub surfaces: Surfaces,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL.
    ///
    /// Enrichment is disabled; tests and embedders opt in explicitly.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            enrichment_timeout: Duration::from_millis(DEFAULT_ENRICHMENT_TIMEOUT_MS),
            ip_lookup_url: None,
            fixed_location: None,
            state_db_path: None,
            endpoints: AuthEndpoints::default(),
            surfaces: Surfaces::default(),
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (environment-style key/value source).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup(API_URL_ENV) {
            Some(raw) => parse_base_url(API_URL_ENV, &raw)?,
            None => {
                tracing::warn!("{API_URL_ENV} not set; using {DEFAULT_API_URL}");
                parse_base_url(API_URL_ENV, DEFAULT_API_URL)?
            }
        };

        let request_timeout =
            parse_timeout(TIMEOUT_ENV, lookup(TIMEOUT_ENV), DEFAULT_REQUEST_TIMEOUT_MS)?;
        let enrichment_timeout = parse_timeout(
            ENRICHMENT_TIMEOUT_ENV,
            lookup(ENRICHMENT_TIMEOUT_ENV),
            DEFAULT_ENRICHMENT_TIMEOUT_MS,
        )?;

        let ip_lookup_url = match lookup(IP_LOOKUP_URL_ENV) {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(parse_url(IP_LOOKUP_URL_ENV, raw.trim())?),
            None => Some(parse_url(IP_LOOKUP_URL_ENV, DEFAULT_IP_LOOKUP_URL)?),
        };

        let fixed_location = match lookup(LOCATION_ENV) {
            Some(raw) if !raw.trim().is_empty() => Some(raw.parse::<Coordinates>().map_err(
                |e| ConfigError::InvalidLocation {
                    var: LOCATION_ENV,
                    reason: e.to_string(),
                },
            )?),
            _ => None,
        };

        let state_db_path = lookup(STATE_DB_ENV)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .or_else(default_state_db_path);

        Ok(Self {
            base_url,
            request_timeout,
            enrichment_timeout,
            ip_lookup_url,
            fixed_location,
            state_db_path,
            endpoints: AuthEndpoints::default(),
            surfaces: Surfaces::default(),
        })
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            var,
            value: raw.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }

    Ok(url)
}

/// Base URLs always end in `/` so relative paths extend rather than replace
/// the last segment.
fn parse_base_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = parse_url(var, raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_timeout(
    var: &'static str,
    raw: Option<String>,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_millis(default_ms));
    };

    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidTimeout { var, value: raw }),
    }
}

/// `{app_data_dir}/merchantdesk/state.db`.
pub fn default_state_db_path() -> Option<PathBuf> {
    let base = dirs::data_dir().or_else(|| {
        dirs::home_dir().map(|mut h| {
            h.push(".local");
            h.push("share");
            h
        })
    })?;

    Some(base.join("merchantdesk").join("state.db"))
}

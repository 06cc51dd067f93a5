//! Best-effort client context (IP, geolocation) attached to outgoing requests.
//!
//! Both lookups are optional: each one can fail, time out or be disabled
//! without affecting the other or the request being enriched.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;

pub const IP_HEADER: &str = "x-ip";
pub const LOCATION_HEADER: &str = "x-location";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("lookup unavailable: {0}")]
    Unavailable(String),
    #[error("lookup timed out")]
    Timeout,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid coordinates '{0}', expected '<lat>,<long>' within range")]
pub struct InvalidCoordinates(pub String);

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

impl Coordinates {
    pub fn new(lat: f64, long: f64) -> Result<Self, InvalidCoordinates> {
        let in_range = lat.is_finite()
            && long.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&long);
        if !in_range {
            return Err(InvalidCoordinates(format!("{lat},{long}")));
        }
        Ok(Self { lat, long })
    }
}

impl FromStr for Coordinates {
    type Err = InvalidCoordinates;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCoordinates(s.to_string());
        let (lat, long) = s.split_once(',').ok_or_else(invalid)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| invalid())?;
        let long = long.trim().parse::<f64>().map_err(|_| invalid())?;
        Coordinates::new(lat, long).map_err(|_| invalid())
    }
}

impl core::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{},{}", self.lat, self.long)
    }
}

/// Whatever subset of client context could be gathered for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientContext {
    pub ip: Option<String>,
    pub location: Option<Coordinates>,
}

impl ClientContext {
    pub fn is_empty(&self) -> bool {
        self.ip.is_none() && self.location.is_none()
    }

    /// Write `X-IP` / `X-Location` for the fields that are present.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Some(ip) = &self.ip {
            match HeaderValue::from_str(ip) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(IP_HEADER), value);
                }
                Err(_) => tracing::warn!("discarding unrepresentable client IP header"),
            }
        }

        if let Some(location) = &self.location {
            if let Ok(value) = HeaderValue::from_str(&location.to_string()) {
                headers.insert(HeaderName::from_static(LOCATION_HEADER), value);
            }
        }
    }
}

/// Source of the client's public IP address.
#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn lookup(&self) -> Result<String, EnrichmentError>;
}

/// Source of the client's position (the native counterpart of a
/// permission-gated geolocation prompt).
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, EnrichmentError>;
}

/// Looks up the public IP through an external HTTP service answering
/// `{"ip": "..."}` (or the bare address as text).
///
/// Uses its own HTTP client: the session token never leaves for this origin.
#[derive(Debug, Clone)]
pub struct HttpIpLookup {
    http: reqwest::Client,
    url: Url,
}

impl HttpIpLookup {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, EnrichmentError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichmentError::Unavailable(e.to_string()))?;
        Ok(Self { http, url })
    }
}

#[derive(serde::Deserialize)]
struct IpLookupResponse {
    ip: String,
}

#[async_trait]
impl IpLookup for HttpIpLookup {
    async fn lookup(&self) -> Result<String, EnrichmentError> {
        let resp = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EnrichmentError::Timeout
                } else {
                    EnrichmentError::Unavailable(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(EnrichmentError::Unavailable(format!(
                "lookup answered {}",
                resp.status()
            )));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| EnrichmentError::Unavailable(e.to_string()))?;

        let candidate = serde_json::from_str::<IpLookupResponse>(&text)
            .map(|r| r.ip)
            .unwrap_or_else(|_| text.trim().to_string());

        // Only well-formed addresses are forwarded as headers.
        candidate
            .parse::<IpAddr>()
            .map(|ip| ip.to_string())
            .map_err(|_| EnrichmentError::Unavailable("lookup returned no IP address".to_string()))
    }
}

/// Reports a preconfigured position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, EnrichmentError> {
        Ok(self.0)
    }
}

/// Geolocation the user never granted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationDisabled;

#[async_trait]
impl LocationProvider for LocationDisabled {
    async fn current_position(&self) -> Result<Coordinates, EnrichmentError> {
        Err(EnrichmentError::PermissionDenied)
    }
}

/// Gathers [`ClientContext`] by running every configured lookup concurrently
/// and keeping whichever succeed.
#[derive(Clone)]
pub struct Enricher {
    ip: Option<Arc<dyn IpLookup>>,
    location: Option<Arc<dyn LocationProvider>>,
    timeout: Duration,
}

impl Enricher {
    pub fn new(
        ip: Option<Arc<dyn IpLookup>>,
        location: Option<Arc<dyn LocationProvider>>,
        timeout: Duration,
    ) -> Self {
        Self {
            ip,
            location,
            timeout,
        }
    }

    /// An enricher that never looks anything up.
    pub fn disabled() -> Self {
        Self::new(None, None, Duration::ZERO)
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, EnrichmentError> {
        let ip: Option<Arc<dyn IpLookup>> = match &config.ip_lookup_url {
            Some(url) => Some(Arc::new(HttpIpLookup::new(
                url.clone(),
                config.enrichment_timeout,
            )?)),
            None => None,
        };

        let location: Arc<dyn LocationProvider> = match config.fixed_location {
            Some(coords) => Arc::new(FixedLocation(coords)),
            None => Arc::new(LocationDisabled),
        };

        Ok(Self::new(ip, Some(location), config.enrichment_timeout))
    }

    /// Run both lookups concurrently. Never fails; failures only shrink the
    /// returned context.
    pub async fn gather(&self) -> ClientContext {
        let (ip, location) = tokio::join!(self.lookup_ip(), self.locate());
        ClientContext { ip, location }
    }

    async fn lookup_ip(&self) -> Option<String> {
        let source = self.ip.as_ref()?;
        let outcome = tokio::time::timeout(self.timeout, source.lookup())
            .await
            .unwrap_or(Err(EnrichmentError::Timeout));

        match outcome {
            Ok(ip) => Some(ip),
            Err(err) => {
                tracing::debug!(error = %err, "client IP lookup failed; continuing without it");
                None
            }
        }
    }

    async fn locate(&self) -> Option<Coordinates> {
        let source = self.location.as_ref()?;
        let outcome = tokio::time::timeout(self.timeout, source.current_position())
            .await
            .unwrap_or(Err(EnrichmentError::Timeout));

        match outcome {
            Ok(coords) => Some(coords),
            Err(err) => {
                tracing::debug!(error = %err, "geolocation unavailable; continuing without it");
                None
            }
        }
    }
}

impl core::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Enricher")
            .field("ip_lookup", &self.ip.is_some())
            .field("location", &self.location.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

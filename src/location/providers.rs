//! Platform capability traits and their desktop/server implementations:
//! console or fixed permission, IP or manual position, Nominatim reverse
//! geocoding.

use super::types::{AddressCandidate, Coordinates, PermissionStatus, PlatformError};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::{BufRead, Write};
use std::time::Duration;

const USER_AGENT: &str = "autolocate/0.1 (location-detect)";

/// Grants or refuses foreground location access.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn request_foreground_access(&self) -> Result<PermissionStatus, PlatformError>;
}

/// Reports the current device position.
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, PlatformError>;
}

/// Turns coordinates into ordered address candidates.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<Vec<AddressCandidate>, PlatformError>;
}

/// Run a blocking provider call off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, PlatformError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PlatformError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PlatformError::Unavailable(format!("provider task failed: {}", e)))?
}

// ─── Permission ─────────────────────────────────────────────────

/// A fixed permission policy.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission(pub PermissionStatus);

#[async_trait]
impl PermissionProvider for StaticPermission {
    async fn request_foreground_access(&self) -> Result<PermissionStatus, PlatformError> {
        Ok(self.0)
    }
}

/// Asks the user for consent on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePermission;

#[async_trait]
impl PermissionProvider for ConsolePermission {
    async fn request_foreground_access(&self) -> Result<PermissionStatus, PlatformError> {
        blocking(|| {
            let mut stderr = std::io::stderr();
            write!(stderr, "  Allow this app to access your location? [y/N] ")?;
            stderr.flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(parse_consent(&line))
        })
        .await
    }
}

fn parse_consent(answer: &str) -> PermissionStatus {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => PermissionStatus::Granted,
        _ => PermissionStatus::Denied,
    }
}

// ─── Position ───────────────────────────────────────────────────

/// Manually supplied coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FixedPositionProvider {
    coords: Coordinates,
}

impl FixedPositionProvider {
    /// Returns None when the coordinates are out of range.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let coords = Coordinates::new(lat, lon);
        coords.is_valid().then_some(Self { coords })
    }
}

#[async_trait]
impl PositionProvider for FixedPositionProvider {
    async fn current_position(&self) -> Result<Coordinates, PlatformError> {
        Ok(self.coords)
    }
}

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    error: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
}

/// Approximate position from the public IP address (ipapi.co).
#[derive(Debug, Clone)]
pub struct IpPositionProvider {
    endpoint: String,
    timeout: Duration,
}

impl IpPositionProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            endpoint: "https://ipapi.co/json/".into(),
            timeout,
        }
    }
}

#[async_trait]
impl PositionProvider for IpPositionProvider {
    async fn current_position(&self) -> Result<Coordinates, PlatformError> {
        let endpoint = self.endpoint.clone();
        let timeout = self.timeout;
        blocking(move || {
            tracing::debug!(%endpoint, "requesting IP position");
            let response = ureq::get(&endpoint)
                .set("User-Agent", USER_AGENT)
                .timeout(timeout)
                .call()?;
            let body: serde_json::Value = response
                .into_json()
                .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;
            parse_ip_response(body)
        })
        .await
    }
}

fn parse_ip_response(body: serde_json::Value) -> Result<Coordinates, PlatformError> {
    let r: IpApiResult =
        serde_json::from_value(body).map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;

    if r.error.unwrap_or(false) {
        return Err(PlatformError::Unavailable(
            r.reason.unwrap_or_else(|| "IP lookup refused".into()),
        ));
    }

    let lat = r.latitude.ok_or_else(|| PlatformError::InvalidResponse("no latitude".into()))?;
    let lon = r.longitude.ok_or_else(|| PlatformError::InvalidResponse("no longitude".into()))?;
    let coords = Coordinates::new(lat, lon);
    if !coords.is_valid() {
        return Err(PlatformError::InvalidResponse(format!("coordinates out of range: {}, {}", lat, lon)));
    }
    Ok(coords)
}

// ─── Nominatim reverse geocoding ────────────────────────────────

#[derive(Deserialize, Debug, Default)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    region: Option<String>,
    province: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

#[derive(Deserialize, Debug)]
struct NominatimReverse {
    #[serde(default)]
    address: Option<NominatimAddress>,
    #[serde(default)]
    error: Option<String>,
}

/// Reverse geocoding via OpenStreetMap Nominatim.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new(timeout: Duration) -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".into(),
            timeout,
        }
    }

    fn reverse_url(&self, coords: Coordinates) -> String {
        format!(
            "{}/reverse?lat={}&lon={}&format=jsonv2&addressdetails=1",
            self.base_url, coords.latitude, coords.longitude
        )
    }
}

#[async_trait]
impl GeocodeProvider for NominatimGeocoder {
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<Vec<AddressCandidate>, PlatformError> {
        let url = self.reverse_url(coords);
        let timeout = self.timeout;
        blocking(move || {
            tracing::debug!(%url, "requesting reverse geocode");
            let response = ureq::get(&url)
                .set("User-Agent", USER_AGENT)
                .timeout(timeout)
                .call()?;
            let body: serde_json::Value = response
                .into_json()
                .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;
            parse_reverse_response(body)
        })
        .await
    }
}

fn parse_reverse_response(body: serde_json::Value) -> Result<Vec<AddressCandidate>, PlatformError> {
    let r: NominatimReverse =
        serde_json::from_value(body).map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;

    // Nominatim answers 200 with an "error" field when nothing is nearby.
    if let Some(err) = r.error {
        tracing::debug!(error = %err, "nominatim returned no address");
        return Ok(vec![]);
    }

    let Some(a) = r.address else {
        return Ok(vec![]);
    };

    let city = a.city.or(a.town).or(a.village).or(a.hamlet).or(a.municipality);
    let region = a.state.or(a.region).or(a.province).or(a.county);

    Ok(vec![AddressCandidate {
        city,
        region,
        country: a.country,
    }])
}

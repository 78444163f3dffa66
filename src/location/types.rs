//! Core types shared by the platform providers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A device position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both components are inside the valid WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.latitude >= 0.0 { 'N' } else { 'S' };
        let ew = if self.longitude >= 0.0 { 'E' } else { 'W' };
        write!(
            f,
            "{:.4}\u{00B0} {}, {:.4}\u{00B0} {}",
            self.latitude.abs(),
            ns,
            self.longitude.abs(),
            ew
        )
    }
}

/// Outcome of a foreground permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// One reverse-geocode result. Providers may omit either field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCandidate {
    pub city: Option<String>,
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Failures raised by a platform provider.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ureq::Error> for PlatformError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Transport(t) if t.kind() == ureq::ErrorKind::Io => {
                let timed_out = std::error::Error::source(&t)
                    .and_then(|s| s.downcast_ref::<std::io::Error>())
                    .is_some_and(|io| {
                        matches!(io.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock)
                    });
                let msg = t.to_string();
                if timed_out || msg.contains("timed out") {
                    Self::Timeout(msg)
                } else {
                    Self::Network(msg)
                }
            }
            ureq::Error::Status(code, _) => Self::Unavailable(format!("HTTP status {}", code)),
            other => Self::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Duration;

    fn local_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        (listener, url)
    }

    fn fetch(url: &str) -> PlatformError {
        let err = ureq::get(url)
            .timeout(Duration::from_millis(300))
            .call()
            .expect_err("request should fail");
        PlatformError::from(err)
    }

    #[test]
    fn test_ureq_silent_server_is_timeout() {
        // Connections complete in the backlog but nothing ever answers.
        let (_listener, url) = local_listener();
        let err = fetch(&url);
        assert!(matches!(err, PlatformError::Timeout(_)), "got {err:?}");
    }

    #[test]
    fn test_ureq_connection_refused_is_network() {
        let (listener, url) = local_listener();
        drop(listener);
        let err = fetch(&url);
        assert!(matches!(err, PlatformError::Network(_)), "got {err:?}");
    }

    #[test]
    fn test_ureq_http_503_is_unavailable() {
        let (listener, url) = local_listener();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            stream
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .unwrap();
        });

        let err = fetch(&url);
        server.join().unwrap();
        match err {
            PlatformError::Unavailable(msg) => assert_eq!(msg, "HTTP status 503"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_coordinates_validity() {
        assert!(Coordinates::new(37.77, -122.41).is_valid());
        assert!(Coordinates::new(-90.0, 180.0).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -180.5).is_valid());
    }

    #[test]
    fn test_coordinates_display() {
        let c = Coordinates::new(37.77, -122.41);
        assert_eq!(c.to_string(), "37.7700\u{00B0} N, 122.4100\u{00B0} W");
    }

    #[test]
    fn test_permission_serializes_lowercase() {
        let json = serde_json::to_string(&PermissionStatus::Denied).unwrap();
        assert_eq!(json, "\"denied\"");
        assert!(PermissionStatus::Granted.is_granted());
    }
}

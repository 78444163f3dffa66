//! Observable acquisition state and the flow's error taxonomy.

use crate::location::{AddressCandidate, Coordinates, PlatformError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PERMISSION_DENIED_MESSAGE: &str = "Permission to access location was denied";
pub const ACQUISITION_FAILURE_MESSAGE: &str = "Failed to fetch location. Please try again.";
pub const GEOCODE_FAILURE_MESSAGE: &str = "Unable to fetch address from location.";

/// Substituted for address fields the geocoder did not provide.
pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";

/// Coarse status of the current or most recent attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl Phase {
    /// True once an attempt has settled.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Loading => write!(f, "Loading"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    AcquisitionFailure,
    GeocodeFailure,
}

impl ErrorKind {
    /// The fixed, user-facing message for this kind.
    pub fn message(self) -> &'static str {
        match self {
            Self::PermissionDenied => PERMISSION_DENIED_MESSAGE,
            Self::AcquisitionFailure => ACQUISITION_FAILURE_MESSAGE,
            Self::GeocodeFailure => GEOCODE_FAILURE_MESSAGE,
        }
    }
}

/// Why an attempt failed. Never surfaced to collaborators directly; the flow
/// folds it into [`AcquisitionState`].
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location acquisition failed: {0}")]
    AcquisitionFailure(#[source] PlatformError),
    #[error("reverse geocoding failed: {}", geocode_reason(.0))]
    GeocodeFailure(#[source] Option<PlatformError>),
}

fn geocode_reason(source: &Option<PlatformError>) -> String {
    match source {
        Some(e) => e.to_string(),
        None => "no candidates".to_string(),
    }
}

impl AcquisitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied => ErrorKind::PermissionDenied,
            Self::AcquisitionFailure(_) => ErrorKind::AcquisitionFailure,
            Self::GeocodeFailure(_) => ErrorKind::GeocodeFailure,
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.kind().message()
    }
}

/// What the rendering collaborator observes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionState {
    pub phase: Phase,
    pub coordinates: Option<Coordinates>,
    pub display_location: Option<String>,
    pub error_message: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Sequence number of the attempt that produced this state.
    pub attempt: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for AcquisitionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            coordinates: None,
            display_location: None,
            error_message: None,
            error_kind: None,
            attempt: 0,
            updated_at: Utc::now(),
        }
    }
}

impl AcquisitionState {
    pub(crate) fn begin(&mut self, attempt: u64) {
        self.phase = Phase::Loading;
        self.coordinates = None;
        self.display_location = None;
        self.error_message = None;
        self.error_kind = None;
        self.attempt = attempt;
        self.touch();
    }

    pub(crate) fn set_coordinates(&mut self, coords: Coordinates) {
        self.coordinates = Some(coords);
        self.touch();
    }

    pub(crate) fn succeed(&mut self, display: String) {
        self.phase = Phase::Succeeded;
        self.display_location = Some(display);
        self.touch();
    }

    /// Coordinates from an earlier step stay in place.
    pub(crate) fn fail(&mut self, err: &AcquisitionError) {
        self.phase = Phase::Failed;
        self.display_location = None;
        self.error_message = Some(err.user_message().to_string());
        self.error_kind = Some(err.kind());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// One-line rendering for terminal output.
    pub fn status_line(&self) -> String {
        match self.phase {
            Phase::Idle => "Press to auto-detect your location".to_string(),
            Phase::Loading => "Detecting location...".to_string(),
            Phase::Succeeded => format!(
                "Detected Location: {}",
                self.display_location.as_deref().unwrap_or(UNKNOWN_PLACEHOLDER)
            ),
            Phase::Failed => self.error_message.clone().unwrap_or_default(),
        }
    }
}

/// Render `"<city>, <region>"` from a candidate.
pub fn compose_display(candidate: &AddressCandidate) -> String {
    format!(
        "{}, {}",
        candidate.city.as_deref().unwrap_or(UNKNOWN_PLACEHOLDER),
        candidate.region.as_deref().unwrap_or(UNKNOWN_PLACEHOLDER),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(city: Option<&str>, region: Option<&str>) -> AddressCandidate {
        AddressCandidate {
            city: city.map(String::from),
            region: region.map(String::from),
            country: None,
        }
    }

    #[test]
    fn test_compose_display_full() {
        let c = candidate(Some("San Francisco"), Some("California"));
        assert_eq!(compose_display(&c), "San Francisco, California");
    }

    #[test]
    fn test_compose_display_placeholders() {
        assert_eq!(compose_display(&candidate(None, Some("Svalbard"))), "Unknown, Svalbard");
        assert_eq!(compose_display(&candidate(Some("Gaza"), None)), "Gaza, Unknown");
        assert_eq!(compose_display(&candidate(None, None)), "Unknown, Unknown");
    }

    #[test]
    fn test_default_is_idle() {
        let s = AcquisitionState::default();
        assert_eq!(s.phase, Phase::Idle);
        assert!(s.coordinates.is_none());
        assert!(s.display_location.is_none());
        assert!(s.error_message.is_none());
        assert_eq!(s.attempt, 0);
    }

    #[test]
    fn test_begin_clears_previous_attempt() {
        let mut s = AcquisitionState::default();
        s.begin(1);
        s.set_coordinates(Coordinates::new(1.0, 2.0));
        s.fail(&AcquisitionError::GeocodeFailure(None));

        s.begin(2);
        assert_eq!(s.phase, Phase::Loading);
        assert_eq!(s.attempt, 2);
        assert!(s.coordinates.is_none());
        assert!(s.error_message.is_none());
        assert!(s.error_kind.is_none());
    }

    #[test]
    fn test_fail_keeps_coordinates() {
        let mut s = AcquisitionState::default();
        s.begin(1);
        s.set_coordinates(Coordinates::new(1.0, 2.0));
        s.fail(&AcquisitionError::GeocodeFailure(None));
        assert_eq!(s.phase, Phase::Failed);
        assert_eq!(s.coordinates, Some(Coordinates::new(1.0, 2.0)));
        assert_eq!(s.error_message.as_deref(), Some(GEOCODE_FAILURE_MESSAGE));
        assert_eq!(s.error_kind, Some(ErrorKind::GeocodeFailure));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(AcquisitionError::PermissionDenied.user_message(), PERMISSION_DENIED_MESSAGE);
        let e = AcquisitionError::AcquisitionFailure(PlatformError::Timeout("3s".into()));
        assert_eq!(e.user_message(), ACQUISITION_FAILURE_MESSAGE);
        assert_eq!(e.to_string(), "location acquisition failed: Request timed out: 3s");
        let e = AcquisitionError::GeocodeFailure(None);
        assert_eq!(e.to_string(), "reverse geocoding failed: no candidates");
    }

    #[test]
    fn test_state_json_shape() {
        let mut s = AcquisitionState::default();
        s.begin(3);
        s.set_coordinates(Coordinates::new(37.77, -122.41));
        s.succeed("San Francisco, California".into());
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["phase"], "succeeded");
        assert_eq!(v["display_location"], "San Francisco, California");
        assert_eq!(v["coordinates"]["latitude"], 37.77);
        assert_eq!(v["attempt"], 3);
        assert!(v["error_message"].is_null());
    }

    #[test]
    fn test_status_line() {
        let mut s = AcquisitionState::default();
        s.begin(1);
        s.fail(&AcquisitionError::PermissionDenied);
        assert_eq!(s.status_line(), PERMISSION_DENIED_MESSAGE);
    }
}

//! Platform capabilities consumed by the acquisition flow.
//!
//! Permission, position, and reverse-geocode providers, plus an offline
//! built-in city dataset.

pub mod builtin;
pub mod providers;
pub mod types;

pub use builtin::BuiltinGeocoder;
pub use providers::{
    ConsolePermission, FixedPositionProvider, GeocodeProvider, IpPositionProvider, NominatimGeocoder,
    PermissionProvider, PositionProvider, StaticPermission,
};
pub use types::{AddressCandidate, Coordinates, PermissionStatus, PlatformError};

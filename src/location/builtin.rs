//! Offline reverse geocoding against a built-in dataset of well-known cities.

use super::providers::GeocodeProvider;
use super::types::{AddressCandidate, Coordinates, PlatformError};
use async_trait::async_trait;
use std::f64::consts::PI;

const DEG: f64 = PI / 180.0;
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Default search radius around the device position.
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

struct BuiltinCity {
    name: &'static str,
    region: &'static str,
    country: &'static str,
    lat: f64,
    lon: f64,
}

const BUILTIN_CITIES: &[BuiltinCity] = &[
    BuiltinCity { name: "San Francisco", region: "California", country: "United States", lat: 37.7749, lon: -122.4194 },
    BuiltinCity { name: "Oakland", region: "California", country: "United States", lat: 37.8044, lon: -122.2712 },
    BuiltinCity { name: "Los Angeles", region: "California", country: "United States", lat: 34.0522, lon: -118.2437 },
    BuiltinCity { name: "New York", region: "New York", country: "United States", lat: 40.7128, lon: -74.0060 },
    BuiltinCity { name: "Chicago", region: "Illinois", country: "United States", lat: 41.8781, lon: -87.6298 },
    BuiltinCity { name: "Toronto", region: "Ontario", country: "Canada", lat: 43.6532, lon: -79.3832 },
    BuiltinCity { name: "Mexico City", region: "Ciudad de M\u{00E9}xico", country: "Mexico", lat: 19.4326, lon: -99.1332 },
    BuiltinCity { name: "S\u{00E3}o Paulo", region: "S\u{00E3}o Paulo", country: "Brazil", lat: -23.5505, lon: -46.6333 },
    BuiltinCity { name: "London", region: "England", country: "United Kingdom", lat: 51.5074, lon: -0.1278 },
    BuiltinCity { name: "Paris", region: "\u{00CE}le-de-France", country: "France", lat: 48.8566, lon: 2.3522 },
    BuiltinCity { name: "Berlin", region: "Berlin", country: "Germany", lat: 52.5200, lon: 13.4050 },
    BuiltinCity { name: "Stockholm", region: "Stockholm County", country: "Sweden", lat: 59.3293, lon: 18.0686 },
    BuiltinCity { name: "Oslo", region: "Oslo", country: "Norway", lat: 59.9139, lon: 10.7522 },
    BuiltinCity { name: "Troms\u{00F8}", region: "Troms", country: "Norway", lat: 69.6492, lon: 18.9553 },
    BuiltinCity { name: "Moscow", region: "Moscow", country: "Russia", lat: 55.7558, lon: 37.6173 },
    BuiltinCity { name: "Istanbul", region: "Istanbul", country: "Turkey", lat: 41.0082, lon: 28.9784 },
    BuiltinCity { name: "Cairo", region: "Cairo Governorate", country: "Egypt", lat: 30.0444, lon: 31.2357 },
    BuiltinCity { name: "Lagos", region: "Lagos State", country: "Nigeria", lat: 6.5244, lon: 3.3792 },
    BuiltinCity { name: "Nairobi", region: "Nairobi County", country: "Kenya", lat: -1.2921, lon: 36.8219 },
    BuiltinCity { name: "Riyadh", region: "Riyadh Province", country: "Saudi Arabia", lat: 24.7136, lon: 46.6753 },
    BuiltinCity { name: "Mecca", region: "Makkah Province", country: "Saudi Arabia", lat: 21.4225, lon: 39.8262 },
    BuiltinCity { name: "Dubai", region: "Dubai", country: "United Arab Emirates", lat: 25.2048, lon: 55.2708 },
    BuiltinCity { name: "Mumbai", region: "Maharashtra", country: "India", lat: 19.0760, lon: 72.8777 },
    BuiltinCity { name: "Delhi", region: "Delhi", country: "India", lat: 28.6139, lon: 77.2090 },
    BuiltinCity { name: "Dhaka", region: "Dhaka Division", country: "Bangladesh", lat: 23.8103, lon: 90.4125 },
    BuiltinCity { name: "Jakarta", region: "Jakarta", country: "Indonesia", lat: -6.2088, lon: 106.8456 },
    BuiltinCity { name: "Tokyo", region: "Tokyo", country: "Japan", lat: 35.6762, lon: 139.6503 },
    BuiltinCity { name: "Sydney", region: "New South Wales", country: "Australia", lat: -33.8688, lon: 151.2093 },
];

/// Great-circle distance in kilometres (haversine).
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let dlat = (b.latitude - a.latitude) * DEG;
    let dlon = (b.longitude - a.longitude) * DEG;
    let h = (dlat / 2.0).sin().powi(2)
        + (a.latitude * DEG).cos() * (b.latitude * DEG).cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Dataset cities within `radius_km` of `coords`, nearest first.
pub fn nearest_cities(coords: Coordinates, radius_km: f64) -> Vec<AddressCandidate> {
    let mut hits: Vec<(f64, &BuiltinCity)> = BUILTIN_CITIES
        .iter()
        .map(|c| (distance_km(coords, Coordinates::new(c.lat, c.lon)), c))
        .filter(|(d, _)| *d <= radius_km)
        .collect();

    hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    hits.into_iter()
        .map(|(_, c)| AddressCandidate {
            city: Some(c.name.to_string()),
            region: Some(c.region.to_string()),
            country: Some(c.country.to_string()),
        })
        .collect()
}

/// Offline geocoder backed by the built-in dataset.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinGeocoder {
    radius_km: f64,
}

impl BuiltinGeocoder {
    pub fn new(radius_km: f64) -> Self {
        Self { radius_km }
    }
}

impl Default for BuiltinGeocoder {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_KM)
    }
}

#[async_trait]
impl GeocodeProvider for BuiltinGeocoder {
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<Vec<AddressCandidate>, PlatformError> {
        Ok(nearest_cities(coords, self.radius_km))
    }
}

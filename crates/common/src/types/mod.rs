use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// Latitude/longitude pair in decimal degrees.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self { Self { lat, lng } }

    /// Key used for caching lookups; rounds to ~1m precision.
    pub fn cache_key(&self) -> String {
        format!("{:.5},{:.5}", self.lat, self.lng)
    }
}

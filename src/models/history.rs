use serde::{Deserialize, Serialize};

use crate::backend::de::{lenient_f64_opt, lenient_string, lenient_string_opt};
use crate::models::location::GeoPoint;

/// One row of `GetRideHistory`. Coordinates arrive under either naming scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub ride_id: String,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub accepted_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64_opt")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64_opt")]
    pub price: Option<f64>,
    #[serde(default, alias = "start_location_lat", deserialize_with = "lenient_f64_opt")]
    pub start_point_lat: Option<f64>,
    #[serde(default, alias = "start_location_long", deserialize_with = "lenient_f64_opt")]
    pub start_point_long: Option<f64>,
    #[serde(default, alias = "end_location_lat", deserialize_with = "lenient_f64_opt")]
    pub end_point_lat: Option<f64>,
    #[serde(default, alias = "end_location_long", deserialize_with = "lenient_f64_opt")]
    pub end_point_long: Option<f64>,
}

impl RideRecord {
    pub fn start(&self) -> Option<GeoPoint> {
        point(self.start_point_lat, self.start_point_long)
    }

    pub fn end(&self) -> Option<GeoPoint> {
        point(self.end_point_lat, self.end_point_long)
    }
}

// Zero is what the backend sends for "not recorded".
fn point(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 => GeoPoint::new(lat, lng),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideHistoryEntry {
    #[serde(flatten)]
    pub record: RideRecord,
    pub start_address: String,
    pub end_address: String,
}

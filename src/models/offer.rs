use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::location::GeoPoint;

/// Distance, duration and derived price for a pickup → drop route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideQuote {
    /// Human readable distance, e.g. "5.2 km".
    pub distance: String,
    pub distance_km: f64,
    /// `None` when only the straight-line distance was available.
    pub duration: Option<String>,
    /// Price formatted to two decimals.
    pub price: String,
}

/// A pending match surfaced by the backend, held until the driver accepts or rejects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideOffer {
    pub pending_ride_id: String,
    pub pickup: GeoPoint,
    pub drop: GeoPoint,
    pub pickup_address: Option<String>,
    pub drop_address: Option<String>,
    pub quote: Option<RideQuote>,
    pub found_at: DateTime<Utc>,
}

impl RideOffer {
    pub fn new(pending_ride_id: String, pickup: GeoPoint, drop: GeoPoint) -> Self {
        Self {
            pending_ride_id,
            pickup,
            drop,
            pickup_address: None,
            drop_address: None,
            quote: None,
            found_at: Utc::now(),
        }
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::location::GeoPoint;
use crate::models::offer::RideQuote;

/// Where the driver is in the offer → trip lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RidePhase {
    #[default]
    Looking,
    Found,
    Searching,
    Accepted,
    Started,
    Ended,
}

impl RidePhase {
    /// A ride has been accepted and not yet finished.
    pub fn has_active_trip(self) -> bool {
        matches!(self, RidePhase::Accepted | RidePhase::Started)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RidePhase::Looking => "looking",
            RidePhase::Found => "found",
            RidePhase::Searching => "searching",
            RidePhase::Accepted => "accepted",
            RidePhase::Started => "started",
            RidePhase::Ended => "ended",
        }
    }
}

impl fmt::Display for RidePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripAction {
    OfferFound,
    OfferCleared,
    Accept,
    Reject,
    CooldownElapsed,
    Start,
    End,
    Dismiss,
}

impl fmt::Display for TripAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TripAction::OfferFound => "record an offer",
            TripAction::OfferCleared => "clear the offer",
            TripAction::Accept => "accept",
            TripAction::Reject => "reject",
            TripAction::CooldownElapsed => "finish the cooldown",
            TripAction::Start => "start the trip",
            TripAction::End => "end the trip",
            TripAction::Dismiss => "dismiss the summary",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Approved,
    Started,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub distance: String,
    pub duration: Option<String>,
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: String,
    pub approved_ride_id: String,
    pub pending_ride_id: String,
    pub pickup: GeoPoint,
    pub drop: GeoPoint,
    pub pickup_address: Option<String>,
    pub drop_address: Option<String>,
    pub quote: RideQuote,
    pub start_point: Option<GeoPoint>,
    pub end_point: Option<GeoPoint>,
    pub status: TripStatus,
    pub accepted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

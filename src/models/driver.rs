use serde::{Deserialize, Serialize};

use crate::backend::de::{lenient_string, lenient_string_opt};
use crate::models::session::VehicleId;

/// Country dialling prefixes offered at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialCode {
    #[default]
    LK,
    PK,
    US,
    IN,
    GB,
    AE,
}

impl DialCode {
    pub fn prefix(self) -> &'static str {
        match self {
            DialCode::LK => "+94",
            DialCode::PK => "+92",
            DialCode::US => "+1",
            DialCode::IN => "+91",
            DialCode::GB => "+44",
            DialCode::AE => "+971",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDriver {
    #[serde(default)]
    pub country: DialCode,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
}

impl RegisterDriver {
    /// Phone number with the country prefix, leading zeros of the local part dropped.
    pub fn full_mobile(&self) -> String {
        let local: String = self
            .phone
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        format!("{}{}", self.country.prefix(), local.trim_start_matches('0'))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(deserialize_with = "lenient_string")]
    pub vehicle_id: String,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub vehicle_model: Option<String>,
    #[serde(default, alias = "registration_number", deserialize_with = "lenient_string_opt")]
    pub vehicle_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub vehicle_type: Option<String>,
}

impl Vehicle {
    pub fn id(&self) -> VehicleId {
        VehicleId(self.vehicle_id.clone())
    }
}

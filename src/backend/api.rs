use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::warn;

use crate::backend::de::{lenient_f64, lenient_string, lenient_string_opt};
use crate::backend::{BackendTransport, Envelope, Operation};
use crate::error::AppError;
use crate::models::driver::{RegisterDriver, Vehicle};
use crate::models::history::RideRecord;
use crate::models::issue::{Issue, IssueType};
use crate::models::location::{GeoPoint, LocationSample};
use crate::models::offer::RideQuote;
use crate::models::session::{Credentials, LoginToken, PresenceStatus};
use crate::observability::metrics::Metrics;

/// A pending ride returned by `FindRide`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRide {
    pub pending_ride_id: String,
    pub pickup: GeoPoint,
    pub drop: GeoPoint,
}

#[derive(Debug, Deserialize)]
struct PendingRideWire {
    #[serde(alias = "ride_id", alias = "id", deserialize_with = "lenient_string")]
    pending_ride_id: String,
    #[serde(alias = "start_location_lat", alias = "start_point_lat", deserialize_with = "lenient_f64")]
    pickup_lat: f64,
    #[serde(
        alias = "pickup_lng",
        alias = "start_location_long",
        alias = "start_point_long",
        deserialize_with = "lenient_f64"
    )]
    pickup_long: f64,
    #[serde(alias = "end_location_lat", alias = "end_point_lat", deserialize_with = "lenient_f64")]
    drop_lat: f64,
    #[serde(
        alias = "drop_lng",
        alias = "end_location_long",
        alias = "end_point_long",
        deserialize_with = "lenient_f64"
    )]
    drop_long: f64,
}

impl TryFrom<PendingRideWire> for PendingRide {
    type Error = AppError;

    fn try_from(wire: PendingRideWire) -> Result<Self, Self::Error> {
        let pickup = GeoPoint::new(wire.pickup_lat, wire.pickup_long).ok_or_else(|| {
            AppError::MalformedResponse(format!(
                "invalid pickup {},{}",
                wire.pickup_lat, wire.pickup_long
            ))
        })?;
        let drop = GeoPoint::new(wire.drop_lat, wire.drop_long).ok_or_else(|| {
            AppError::MalformedResponse(format!("invalid drop {},{}", wire.drop_lat, wire.drop_long))
        })?;

        Ok(Self {
            pending_ride_id: wire.pending_ride_id,
            pickup,
            drop,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApprovedRide {
    #[serde(deserialize_with = "lenient_string")]
    pub trip_id: String,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub approved_ride_id: Option<String>,
}

/// Fields of the `EndRide` response used for the trip summary.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EndedRide {
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub distance: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub price: Option<String>,
}

/// Typed access to every backend operation the driver app uses.
#[derive(Clone)]
pub struct DriverApi {
    transport: Arc<dyn BackendTransport>,
    metrics: Metrics,
}

impl DriverApi {
    pub fn new(transport: Arc<dyn BackendTransport>, metrics: Metrics) -> Self {
        Self { transport, metrics }
    }

    async fn call(&self, operation: Operation, data: Value) -> Result<Envelope, AppError> {
        let start = Instant::now();
        let result = self.transport.call(operation, data).await;

        let outcome = match &result {
            Ok(envelope) if envelope.is_success() => "success",
            Ok(_) => "rejected",
            Err(err) => err.kind(),
        };
        self.metrics
            .backend_call_seconds
            .with_label_values(&[operation.as_str()])
            .observe(start.elapsed().as_secs_f64());
        self.metrics
            .backend_calls_total
            .with_label_values(&[operation.as_str(), outcome])
            .inc();

        result
    }

    async fn call_data(&self, operation: Operation, data: Value) -> Result<Value, AppError> {
        self.call(operation, data).await?.into_data()
    }

    pub async fn ride_history(&self, token: &LoginToken) -> Result<Vec<RideRecord>, AppError> {
        let data = self
            .call_data(Operation::GetRideHistory, json!({ "login_token": token.expose() }))
            .await?;
        decode_list(Operation::GetRideHistory, data)
    }

    pub async fn vehicles(&self, token: &LoginToken) -> Result<Vec<Vehicle>, AppError> {
        let data = self
            .call_data(Operation::GetVehiclesByToken, json!({ "login_token": token.expose() }))
            .await?;
        decode_list(Operation::GetVehiclesByToken, data)
    }

    pub async fn update_vehicle_location(
        &self,
        credentials: &Credentials,
        sample: &LocationSample,
        status: PresenceStatus,
    ) -> Result<(), AppError> {
        self.call_data(
            Operation::UpdateVehicleLocation,
            json!({
                "login_token": credentials.token.expose(),
                "vehicle_id": credentials.vehicle_id.as_str(),
                "latitude": sample.point.lat,
                "longitude": sample.point.lng,
                "status": status.as_str(),
                "captured_at": sample.captured_at.to_rfc3339(),
            }),
        )
        .await?;
        Ok(())
    }

    /// `Ok(None)` when the backend has no pending match for the vehicle.
    pub async fn find_ride(&self, credentials: &Credentials) -> Result<Option<PendingRide>, AppError> {
        let envelope = self
            .call(
                Operation::FindRide,
                json!({
                    "login_token": credentials.token.expose(),
                    "vehicle_id": credentials.vehicle_id.as_str(),
                }),
            )
            .await?;

        // An error status without data is how the backend says "nothing pending".
        if !envelope.is_success() {
            if envelope.data.is_none() {
                return Ok(None);
            }
            return Err(envelope.rejection());
        }

        let data = match envelope.data {
            Some(Value::Array(mut rides)) => {
                if rides.is_empty() {
                    return Ok(None);
                }
                rides.swap_remove(0)
            }
            Some(Value::Object(map)) if map.is_empty() => return Ok(None),
            Some(Value::Null) | None => return Ok(None),
            Some(other) => other,
        };

        let wire: PendingRideWire = decode(Operation::FindRide, data)?;
        wire.try_into().map(Some)
    }

    pub async fn approve_ride(
        &self,
        credentials: &Credentials,
        pending_ride_id: &str,
        quote: &RideQuote,
    ) -> Result<ApprovedRide, AppError> {
        let data = self
            .call_data(
                Operation::ApproveRide,
                json!({
                    "login_token": credentials.token.expose(),
                    "vehicle_id": credentials.vehicle_id.as_str(),
                    "pending_ride_id": pending_ride_id,
                    "distance": quote.distance,
                    "duration": quote.duration,
                    "price": quote.price,
                }),
            )
            .await?;
        decode(Operation::ApproveRide, data)
    }

    pub async fn reject_ride(&self, credentials: &Credentials, pending_ride_id: &str) -> Result<(), AppError> {
        self.call_data(
            Operation::RejectRide,
            json!({
                "login_token": credentials.token.expose(),
                "vehicle_id": credentials.vehicle_id.as_str(),
                "pending_ride_id": pending_ride_id,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn start_ride(
        &self,
        credentials: &Credentials,
        trip_id: &str,
        approved_ride_id: &str,
        start: GeoPoint,
    ) -> Result<(), AppError> {
        self.call_data(
            Operation::StartRide,
            json!({
                "login_token": credentials.token.expose(),
                "trip_id": trip_id,
                "approved_ride_id": approved_ride_id,
                "start_point_lat": start.lat,
                "start_point_long": start.lng,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn end_ride(
        &self,
        credentials: &Credentials,
        trip_id: &str,
        approved_ride_id: &str,
        end: GeoPoint,
    ) -> Result<EndedRide, AppError> {
        let data = self
            .call_data(
                Operation::EndRide,
                json!({
                    "login_token": credentials.token.expose(),
                    "trip_id": trip_id,
                    "approved_ride_id": approved_ride_id,
                    "end_point_lat": end.lat,
                    "end_point_long": end.lng,
                }),
            )
            .await?;

        match data {
            Value::Object(_) => decode(Operation::EndRide, data),
            _ => Ok(EndedRide::default()),
        }
    }

    pub async fn create_driver(&self, registration: &RegisterDriver) -> Result<LoginToken, AppError> {
        let envelope = self
            .call(
                Operation::CreateDriver,
                json!({
                    "mobile": registration.full_mobile(),
                    "email": registration.email,
                    "password": registration.password,
                    "firstname": registration.first_name,
                    "lastname": registration.last_name,
                    "address": registration.address,
                }),
            )
            .await?;
        login_token_from(Operation::CreateDriver, envelope)
    }

    pub async fn verify_otp(&self, mobile: &str, otp: &str) -> Result<LoginToken, AppError> {
        let envelope = self
            .call(Operation::VerifyOtpDriver, json!({ "mobile": mobile, "otp": otp }))
            .await?;
        login_token_from(Operation::VerifyOtpDriver, envelope)
    }

    pub async fn submit_issue(
        &self,
        token: &LoginToken,
        issue_type: IssueType,
        note: &str,
    ) -> Result<(), AppError> {
        self.call_data(
            Operation::SubmitIssue,
            json!({
                "login_token": token.expose(),
                "issue_type": issue_type.as_str(),
                "issue_note": note,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn issues(&self, token: &LoginToken) -> Result<Vec<Issue>, AppError> {
        let data = self
            .call_data(Operation::GetIssueList, json!({ "login_token": token.expose() }))
            .await?;
        decode_list(Operation::GetIssueList, data)
    }
}

fn decode<T: DeserializeOwned>(operation: Operation, data: Value) -> Result<T, AppError> {
    serde_json::from_value(data).map_err(|err| {
        warn!(operation = operation.as_str(), error = %err, "unexpected response shape");
        AppError::MalformedResponse(format!("{}: {err}", operation.as_str()))
    })
}

fn decode_list<T: DeserializeOwned>(operation: Operation, data: Value) -> Result<Vec<T>, AppError> {
    match data {
        Value::Null => Ok(Vec::new()),
        other => decode(operation, other),
    }
}

fn login_token_from(operation: Operation, envelope: Envelope) -> Result<LoginToken, AppError> {
    if !envelope.is_success() {
        return Err(envelope.rejection());
    }

    let nested = envelope
        .data
        .as_ref()
        .and_then(|data| data.get("login_token"))
        .and_then(|token| token.as_str())
        .map(str::to_string);

    envelope
        .login_token
        .or(nested)
        .filter(|token| !token.is_empty())
        .map(LoginToken::new)
        .ok_or_else(|| {
            AppError::MalformedResponse(format!("{} response has no login_token", operation.as_str()))
        })
}

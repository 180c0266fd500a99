//! Registration, vehicle selection, ride history and support issues.

pub mod history;

use std::sync::Arc;

use tracing::info;

use crate::backend::DriverApi;
use crate::device::CredentialStore;
use crate::error::AppError;
use crate::geo::maps::MapsProvider;
use crate::models::driver::{RegisterDriver, Vehicle};
use crate::models::history::RideHistoryEntry;
use crate::models::issue::{Issue, NewIssue};
use crate::models::session::VehicleId;

#[derive(Clone)]
pub struct AccountService {
    api: DriverApi,
    maps: Arc<dyn MapsProvider>,
    credentials: CredentialStore,
}

impl AccountService {
    pub fn new(api: DriverApi, maps: Arc<dyn MapsProvider>, credentials: CredentialStore) -> Self {
        Self {
            api,
            maps,
            credentials,
        }
    }

    /// Creates the driver account and keeps the issued token. Returns the full mobile
    /// number the OTP was sent to.
    pub async fn register(&self, registration: &RegisterDriver) -> Result<String, AppError> {
        validate_registration(registration)?;

        let token = self.api.create_driver(registration).await?;
        self.credentials.save_token(&token).await?;

        let mobile = registration.full_mobile();
        info!(mobile = %mobile, "driver registered; awaiting otp");
        Ok(mobile)
    }

    pub async fn verify_otp(&self, mobile: &str, otp: &str) -> Result<(), AppError> {
        let otp = otp.trim();
        if otp.len() != 4 || !otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::BadRequest("otp must be 4 digits".to_string()));
        }
        if mobile.trim().is_empty() {
            return Err(AppError::BadRequest("mobile cannot be empty".to_string()));
        }

        let token = self.api.verify_otp(mobile.trim(), otp).await?;
        self.credentials.save_token(&token).await?;
        info!("otp verified");
        Ok(())
    }

    pub async fn vehicles(&self) -> Result<Vec<Vehicle>, AppError> {
        let token = self.credentials.require_token().await?;
        self.api.vehicles(&token).await
    }

    /// Makes `vehicle_id` the active vehicle, provided the backend lists it for this driver.
    pub async fn select_vehicle(&self, vehicle_id: &VehicleId) -> Result<Vehicle, AppError> {
        let vehicle = self
            .vehicles()
            .await?
            .into_iter()
            .find(|vehicle| vehicle.id() == *vehicle_id)
            .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} not found")))?;

        self.credentials.select_vehicle(vehicle_id).await?;
        info!(vehicle_id = %vehicle_id, "vehicle selected");
        Ok(vehicle)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.credentials.clear().await?;
        info!("driver logged out");
        Ok(())
    }

    pub async fn history(&self) -> Result<Vec<RideHistoryEntry>, AppError> {
        let token = self.credentials.require_token().await?;
        let records = self.api.ride_history(&token).await?;
        Ok(history::with_addresses(self.maps.as_ref(), records).await)
    }

    pub async fn issues(&self) -> Result<Vec<Issue>, AppError> {
        let token = self.credentials.require_token().await?;
        self.api.issues(&token).await
    }

    /// Files a support issue and returns the refreshed list.
    pub async fn submit_issue(&self, issue: &NewIssue) -> Result<Vec<Issue>, AppError> {
        let note = issue.note.trim();
        if note.is_empty() {
            return Err(AppError::BadRequest("please describe your issue".to_string()));
        }

        let token = self.credentials.require_token().await?;
        self.api.submit_issue(&token, issue.issue_type, note).await?;
        info!(issue_type = issue.issue_type.as_str(), "issue submitted");
        self.api.issues(&token).await
    }
}

fn validate_registration(registration: &RegisterDriver) -> Result<(), AppError> {
    let required = [
        ("phone", &registration.phone),
        ("email", &registration.email),
        ("password", &registration.password),
        ("first name", &registration.first_name),
        ("last name", &registration.last_name),
        ("address", &registration.address),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(AppError::BadRequest(format!("{field} cannot be empty")));
    }

    if !registration.email.contains('@') {
        return Err(AppError::BadRequest("email is not valid".to_string()));
    }

    let digits = registration
        .full_mobile()
        .chars()
        .filter(char::is_ascii_digit)
        .count();
    if digits < 8 {
        return Err(AppError::BadRequest("phone number is too short".to_string()));
    }

    Ok(())
}

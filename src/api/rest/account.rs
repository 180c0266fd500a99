use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::driver::{RegisterDriver, Vehicle};
use crate::models::history::RideHistoryEntry;
use crate::models::issue::{Issue, NewIssue};
use crate::models::session::VehicleId;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/account/register", post(register))
        .route("/account/verify", post(verify))
        .route("/account/logout", post(logout))
        .route("/account/vehicles", get(vehicles))
        .route("/account/vehicle", put(select_vehicle))
        .route("/account/history", get(history))
        .route("/account/issues", get(issues).post(submit_issue))
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub mobile: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub mobile: String,
    pub otp: String,
}

#[derive(Deserialize)]
pub struct SelectVehicleRequest {
    pub vehicle_id: VehicleId,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterDriver>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let mobile = state.account.register(&payload).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { mobile })))
}

async fn verify(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyRequest>,
) -> Result<StatusCode, AppError> {
    state.account.verify_otp(&payload.mobile, &payload.otp).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Goes offline first; refused while a trip is active.
async fn logout(State(state): State<Arc<AppState>>) -> Result<StatusCode, AppError> {
    state.session.go_offline().await?;
    state.account.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn vehicles(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Vehicle>>, AppError> {
    Ok(Json(state.account.vehicles().await?))
}

async fn select_vehicle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SelectVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    Ok(Json(state.account.select_vehicle(&payload.vehicle_id).await?))
}

async fn history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RideHistoryEntry>>, AppError> {
    Ok(Json(state.account.history().await?))
}

async fn issues(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Issue>>, AppError> {
    Ok(Json(state.account.issues().await?))
}

async fn submit_issue(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewIssue>,
) -> Result<Json<Vec<Issue>>, AppError> {
    Ok(Json(state.account.submit_issue(&payload).await?))
}

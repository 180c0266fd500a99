use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::put;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::location::GeoPoint;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/device/location", put(report_location))
        .route("/device/permission", put(set_permission))
}

#[derive(Deserialize)]
pub struct LocationRequest {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
pub struct PermissionRequest {
    pub granted: bool,
}

async fn report_location(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LocationRequest>,
) -> Result<Json<GeoPoint>, AppError> {
    let point = GeoPoint::new(payload.lat, payload.lng).ok_or_else(|| {
        AppError::BadRequest(format!("invalid coordinates {},{}", payload.lat, payload.lng))
    })?;

    state.device.report(point).await;
    Ok(Json(point))
}

async fn set_permission(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PermissionRequest>,
) -> StatusCode {
    state.device.set_permission(payload.granted);
    StatusCode::NO_CONTENT
}

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::post;

use crate::engine::SessionSnapshot;
use crate::error::AppError;
use crate::models::trip::{Trip, TripSummary};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trip/accept", post(accept))
        .route("/trip/reject", post(reject))
        .route("/trip/start", post(start))
        .route("/trip/end", post(end))
        .route("/trip/dismiss", post(dismiss))
}

async fn accept(State(state): State<Arc<AppState>>) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.session.accept().await?))
}

async fn reject(State(state): State<Arc<AppState>>) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.session.reject().await?))
}

async fn start(State(state): State<Arc<AppState>>) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.session.start_trip().await?))
}

async fn end(State(state): State<Arc<AppState>>) -> Result<Json<TripSummary>, AppError> {
    Ok(Json(state.session.end_trip().await?))
}

async fn dismiss(State(state): State<Arc<AppState>>) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.session.dismiss_summary().await?))
}

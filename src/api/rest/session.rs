use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::Serialize;

use crate::engine::{PollOutcome, SessionSnapshot};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session", get(snapshot))
        .route("/session/online", post(go_online))
        .route("/session/offline", post(go_offline))
        .route("/session/poll", post(poll_now))
}

#[derive(Serialize)]
pub struct PollResponse {
    pub outcome: PollOutcome,
    pub session: SessionSnapshot,
}

async fn snapshot(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

async fn go_online(State(state): State<Arc<AppState>>) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.session.go_online().await?))
}

async fn go_offline(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.session.go_offline().await?))
}

async fn poll_now(State(state): State<Arc<AppState>>) -> Json<PollResponse> {
    let outcome = state.session.poll_now().await;
    Json(PollResponse {
        outcome,
        session: state.session.snapshot().await,
    })
}

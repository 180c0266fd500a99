#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use driver_session::backend::{BackendTransport, Envelope, Operation};
use driver_session::config::SessionSettings;
use driver_session::device::{CredentialStore, KeyValueStore, MemoryStore, ReportedLocation};
use driver_session::error::AppError;
use driver_session::geo::maps::{MapsProvider, Route};
use driver_session::models::location::GeoPoint;
use driver_session::models::session::{LoginToken, VehicleId};
use driver_session::state::AppState;
use serde_json::{Value, json};

pub const PICKUP: (f64, f64) = (6.9271, 79.8612);
pub const DROP: (f64, f64) = (6.9319, 79.8478);

#[derive(Debug, Clone)]
pub struct Call {
    pub operation: Operation,
    pub data: Value,
}

#[derive(Default)]
struct Gauge {
    current: usize,
    max: usize,
}

/// Scripted backend. Replies are queued per operation; an empty queue answers
/// `{"status":"success","data":null}`. Calls are recorded when they start.
#[derive(Default)]
pub struct FakeBackend {
    replies: Mutex<HashMap<Operation, VecDeque<Result<Value, String>>>>,
    delays: Mutex<HashMap<Operation, Duration>>,
    calls: Mutex<Vec<Call>>,
    in_flight: Mutex<HashMap<Operation, Gauge>>,
}

impl FakeBackend {
    pub fn reply(&self, operation: Operation, envelope: Value) {
        self.replies
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(Ok(envelope));
    }

    pub fn fail(&self, operation: Operation, reason: &str) {
        self.replies
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(Err(reason.to_string()));
    }

    pub fn delay(&self, operation: Operation, delay: Duration) {
        self.delays.lock().unwrap().insert(operation, delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, operation: Operation) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == operation)
            .map(|call| call.data)
            .collect()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls_of(operation).len()
    }

    pub fn max_in_flight(&self, operation: Operation) -> usize {
        self.in_flight
            .lock()
            .unwrap()
            .get(&operation)
            .map(|gauge| gauge.max)
            .unwrap_or(0)
    }

    fn enter(&self, operation: Operation) {
        let mut gauges = self.in_flight.lock().unwrap();
        let gauge = gauges.entry(operation).or_default();
        gauge.current += 1;
        gauge.max = gauge.max.max(gauge.current);
    }

    fn leave(&self, operation: Operation) {
        if let Some(gauge) = self.in_flight.lock().unwrap().get_mut(&operation) {
            gauge.current -= 1;
        }
    }
}

#[async_trait]
impl BackendTransport for FakeBackend {
    async fn call(&self, operation: Operation, data: Value) -> Result<Envelope, AppError> {
        self.calls.lock().unwrap().push(Call { operation, data });
        self.enter(operation);

        let delay = self.delays.lock().unwrap().get(&operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(json!({ "status": "success", "data": null })));
        self.leave(operation);

        match reply {
            Ok(envelope) => serde_json::from_value(envelope)
                .map_err(|err| AppError::MalformedResponse(err.to_string())),
            Err(reason) => Err(AppError::Transport(reason)),
        }
    }
}

/// Geocodes to "lat,lng" labels; routes answer whatever was set, or fail.
#[derive(Default)]
pub struct FakeMaps {
    route: Mutex<Option<Route>>,
}

impl FakeMaps {
    pub fn set_route(&self, distance: &str, duration: &str) {
        *self.route.lock().unwrap() = Some(Route {
            distance_text: distance.to_string(),
            distance_meters: None,
            duration_text: duration.to_string(),
            duration_secs: None,
        });
    }
}

#[async_trait]
impl MapsProvider for FakeMaps {
    async fn reverse_geocode(&self, point: GeoPoint) -> Result<String, AppError> {
        Ok(format!("{:.4},{:.4}", point.lat, point.lng))
    }

    async fn route(&self, _origin: GeoPoint, _destination: GeoPoint) -> Result<Route, AppError> {
        self.route
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Transport("directions unavailable".to_string()))
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub maps: Arc<FakeMaps>,
    pub device: Arc<ReportedLocation>,
    pub store: Arc<MemoryStore>,
    pub state: Arc<AppState>,
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        presence_interval: Duration::from_secs(60),
        offer_poll_interval: Duration::from_secs(12),
        offer_min_spacing: Duration::from_secs(5),
        reject_cooldown: Duration::from_millis(2_000),
        rate_per_km: 100.0,
    }
}

impl Harness {
    /// A driver with a stored token, a selected vehicle and a location fix at the pickup.
    pub async fn signed_in() -> Self {
        let harness = Self::signed_out();
        let credentials = CredentialStore::new(harness.store.clone());
        credentials
            .save_token(&LoginToken::new("tok-1"))
            .await
            .unwrap();
        credentials
            .select_vehicle(&VehicleId("veh-7".to_string()))
            .await
            .unwrap();
        harness
    }

    pub fn signed_out() -> Self {
        let backend = Arc::new(FakeBackend::default());
        let maps = Arc::new(FakeMaps::default());
        let store = Arc::new(MemoryStore::new());
        let device = Arc::new(ReportedLocation::new(GeoPoint::new(PICKUP.0, PICKUP.1)));
        let state = Arc::new(AppState::new(
            backend.clone(),
            maps.clone(),
            store.clone(),
            device.clone(),
            settings(),
            64,
        ));

        Self {
            backend,
            maps,
            device,
            store,
            state,
        }
    }

    pub fn offer_ride(&self, pending_ride_id: &str) {
        self.backend.reply(
            Operation::FindRide,
            json!({
                "status": "success",
                "data": [{
                    "pending_ride_id": pending_ride_id,
                    "pickup_lat": PICKUP.0.to_string(),
                    "pickup_long": PICKUP.1.to_string(),
                    "drop_lat": DROP.0,
                    "drop_long": DROP.1
                }]
            }),
        );
    }

    pub async fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key).await.unwrap()
    }
}

/// Lets spawned timer work run without moving the paused clock meaningfully.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

use std::sync::Arc;

use crate::account::AccountService;
use crate::backend::{BackendTransport, DriverApi};
use crate::config::SessionSettings;
use crate::device::{CredentialStore, KeyValueStore, ReportedLocation};
use crate::engine::{SessionController, SessionDeps};
use crate::geo::maps::MapsProvider;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub session: SessionController,
    pub account: AccountService,
    pub device: Arc<ReportedLocation>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        transport: Arc<dyn BackendTransport>,
        maps: Arc<dyn MapsProvider>,
        store: Arc<dyn KeyValueStore>,
        device: Arc<ReportedLocation>,
        settings: SessionSettings,
        event_buffer_size: usize,
    ) -> Self {
        let metrics = Metrics::new();
        let api = DriverApi::new(transport, metrics.clone());
        let credentials = CredentialStore::new(store);

        let session = SessionController::new(
            SessionDeps {
                api: api.clone(),
                maps: maps.clone(),
                location: device.clone(),
                credentials: credentials.clone(),
            },
            settings,
            metrics.clone(),
            event_buffer_size,
        );

        Self {
            session,
            account: AccountService::new(api, maps, credentials),
            device,
            metrics,
        }
    }
}

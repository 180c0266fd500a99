use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::location::{GeoPoint, LocationSample};

/// Answers "where is the device right now". Queried once per cycle, never cached by callers.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<LocationSample, AppError>;
}

/// Location fed from outside (the platform GPS bridge or the console).
pub struct ReportedLocation {
    granted: AtomicBool,
    latest: RwLock<Option<GeoPoint>>,
}

impl ReportedLocation {
    pub fn new(initial: Option<GeoPoint>) -> Self {
        Self {
            granted: AtomicBool::new(true),
            latest: RwLock::new(initial),
        }
    }

    pub async fn report(&self, point: GeoPoint) {
        *self.latest.write().await = Some(point);
    }

    pub fn set_permission(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocationProvider for ReportedLocation {
    async fn current_location(&self) -> Result<LocationSample, AppError> {
        if !self.granted.load(Ordering::SeqCst) {
            return Err(AppError::PermissionDenied(
                "location access was denied".to_string(),
            ));
        }

        let latest = *self.latest.read().await;
        latest
            .map(LocationSample::now)
            .ok_or_else(|| AppError::PermissionDenied("no location fix available".to_string()))
    }
}

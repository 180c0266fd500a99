use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held for the duration of one in-flight call.
pub type FlightGuard = OwnedMutexGuard<()>;

/// At most one in-flight invocation of an operation; late arrivals are turned away.
#[derive(Clone, Default)]
pub struct SingleFlight {
    gate: Arc<Mutex<()>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another invocation holds the guard.
    pub fn try_begin(&self) -> Option<FlightGuard> {
        self.gate.clone().try_lock_owned().ok()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Waits until the current invocation, if any, has finished.
    pub async fn settled(&self) {
        let _idle = self.gate.lock().await;
    }
}

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::engine::controller::SessionCore;
use crate::engine::timer::{TimerHandle, every};
use crate::error::AppError;
use crate::models::location::LocationSample;
use crate::models::session::PresenceStatus;

/// Result of one presence tick, used for metrics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceOutcome {
    Published,
    Failed,
    SkippedBusy,
    Stale,
}

impl PresenceOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PresenceOutcome::Published => "published",
            PresenceOutcome::Failed => "failed",
            PresenceOutcome::SkippedBusy => "skipped",
            PresenceOutcome::Stale => "stale",
        }
    }
}

impl SessionCore {
    pub(crate) fn start_presence(self: &Arc<Self>, epoch: u64) -> TimerHandle {
        let core = self.clone();
        every("presence", self.settings.presence_interval, move || {
            let core = core.clone();
            async move {
                core.presence_cycle(epoch).await;
            }
        })
    }

    pub(crate) async fn presence_cycle(&self, epoch: u64) -> PresenceOutcome {
        let outcome = self.run_presence(epoch).await;
        self.metrics
            .presence_publishes_total
            .with_label_values(&[PresenceStatus::Active.as_str(), outcome.as_str()])
            .inc();
        outcome
    }

    async fn run_presence(&self, epoch: u64) -> PresenceOutcome {
        let Some(_flight) = self.publish_flight.try_begin() else {
            debug!("presence update still in flight; skipping tick");
            return PresenceOutcome::SkippedBusy;
        };

        if !self.is_current(epoch).await {
            return PresenceOutcome::Stale;
        }

        let sample = match self.publish_presence(PresenceStatus::Active).await {
            Ok(sample) => sample,
            Err(err) => {
                log_presence_failure(&err);
                return PresenceOutcome::Failed;
            }
        };

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return PresenceOutcome::Stale;
        }
        state.last_location = Some(sample);
        state.last_presence_at = Some(Utc::now());
        self.publish_snapshot(&state);
        PresenceOutcome::Published
    }

    /// One presence update: fresh credentials, fresh location, one backend call.
    pub(crate) async fn publish_presence(
        &self,
        status: PresenceStatus,
    ) -> Result<LocationSample, AppError> {
        let credentials = self.credentials.require().await?;
        let sample = self.location.current_location().await?;
        self.api
            .update_vehicle_location(&credentials, &sample, status)
            .await?;
        debug!(
            vehicle_id = %credentials.vehicle_id,
            status = status.as_str(),
            lat = sample.point.lat,
            lng = sample.point.lng,
            "presence published"
        );
        Ok(sample)
    }

    pub(crate) async fn is_current(&self, epoch: u64) -> bool {
        let state = self.state.read().await;
        state.epoch == epoch && state.online.is_online() && !state.going_offline
    }
}

pub(crate) fn log_presence_failure(err: &AppError) {
    match err {
        AppError::Rejected(_) => debug!(error = %err, "presence update rejected"),
        _ => warn!(error = %err, kind = err.kind(), "presence update failed"),
    }
}

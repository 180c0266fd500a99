use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::PendingRide;
use crate::engine::controller::SessionCore;
use crate::engine::timer::{TimerHandle, every};
use crate::error::AppError;
use crate::geo::pricing;
use crate::models::offer::RideOffer;
use crate::models::trip::{RidePhase, TripAction};

/// What a single poll attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    Matched,
    NoMatch,
    Failed,
    SkippedOffline,
    /// An offer or trip is already on screen.
    SkippedBusy,
    SkippedInFlight,
    SkippedTooSoon,
    /// The session went offline or changed while the call was outstanding.
    Stale,
}

impl PollOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PollOutcome::Matched => "matched",
            PollOutcome::NoMatch => "no_match",
            PollOutcome::Failed => "failed",
            PollOutcome::SkippedOffline => "skipped_offline",
            PollOutcome::SkippedBusy => "skipped_busy",
            PollOutcome::SkippedInFlight => "skipped_in_flight",
            PollOutcome::SkippedTooSoon => "skipped_too_soon",
            PollOutcome::Stale => "stale",
        }
    }
}

impl SessionCore {
    pub(crate) fn start_poller(self: &Arc<Self>, epoch: u64) -> TimerHandle {
        let core = self.clone();
        every("offer-poller", self.settings.offer_poll_interval, move || {
            let core = core.clone();
            async move {
                core.poll_cycle(Some(epoch)).await;
            }
        })
    }

    /// Timer ticks pass the epoch they were started under; manual refreshes pass `None`.
    pub(crate) async fn poll_cycle(&self, epoch: Option<u64>) -> PollOutcome {
        let outcome = self.run_poll(epoch).await;
        self.metrics
            .offer_polls_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        outcome
    }

    async fn run_poll(&self, expected: Option<u64>) -> PollOutcome {
        let Some(_flight) = self.poll_flight.try_begin() else {
            debug!("offer poll still in flight; skipping");
            return PollOutcome::SkippedInFlight;
        };

        let epoch = {
            let mut state = self.state.write().await;
            if expected.is_some_and(|epoch| epoch != state.epoch) {
                return PollOutcome::Stale;
            }
            if !state.online.is_online() || state.going_offline {
                return PollOutcome::SkippedOffline;
            }
            if state.phase != RidePhase::Looking {
                return PollOutcome::SkippedBusy;
            }
            let now = Instant::now();
            if let Some(last) = state.last_poll_at {
                if now.duration_since(last) < self.settings.offer_min_spacing {
                    return PollOutcome::SkippedTooSoon;
                }
            }
            state.last_poll_at = Some(now);
            state.epoch
        };

        let found = match self.credentials.require().await {
            Ok(credentials) => self.api.find_ride(&credentials).await,
            Err(err) => Err(err),
        };

        let ride = match found {
            Ok(ride) => ride,
            Err(err) => {
                log_poll_failure(&err);
                return PollOutcome::Failed;
            }
        };

        let Some(ride) = ride else {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return PollOutcome::Stale;
            }
            if state.phase == RidePhase::Looking {
                let had_offer = state.offer.take().is_some();
                if self.apply(&mut state, TripAction::OfferCleared).is_ok() && had_offer {
                    self.publish_snapshot(&state);
                }
            }
            return PollOutcome::NoMatch;
        };

        {
            let mut state = self.state.write().await;
            if state.epoch != epoch || state.phase != RidePhase::Looking {
                return PollOutcome::Stale;
            }
            if self.apply(&mut state, TripAction::OfferFound).is_err() {
                return PollOutcome::Stale;
            }
            state.offer = Some(RideOffer::new(
                ride.pending_ride_id.clone(),
                ride.pickup,
                ride.drop,
            ));
            self.publish_snapshot(&state);
        }

        info!(pending_ride_id = %ride.pending_ride_id, "ride offer found");
        self.enrich_offer(epoch, &ride).await;
        PollOutcome::Matched
    }

    /// Resolves both addresses and the route concurrently, then prices the ride.
    async fn enrich_offer(&self, epoch: u64, ride: &PendingRide) {
        let (pickup_address, drop_address, route) = tokio::join!(
            self.maps.reverse_geocode(ride.pickup),
            self.maps.reverse_geocode(ride.drop),
            self.maps.route(ride.pickup, ride.drop),
        );

        if let Err(err) = &route {
            warn!(error = %err, "route lookup failed; pricing by straight-line distance");
        }
        let quote = pricing::quote(&route, &ride.pickup, &ride.drop, self.settings.rate_per_km);

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return;
        }
        let Some(offer) = state
            .offer
            .as_mut()
            .filter(|offer| offer.pending_ride_id == ride.pending_ride_id)
        else {
            return;
        };

        offer.pickup_address = pickup_address
            .inspect_err(|err| debug!(error = %err, "pickup reverse geocode failed"))
            .ok();
        offer.drop_address = drop_address
            .inspect_err(|err| debug!(error = %err, "drop reverse geocode failed"))
            .ok();
        debug!(distance = %quote.distance, price = %quote.price, "ride offer priced");
        offer.quote = Some(quote);
        self.publish_snapshot(&state);
    }
}

fn log_poll_failure(err: &AppError) {
    match err {
        AppError::Rejected(_) | AppError::MissingCredential(_) => {
            debug!(error = %err, "offer poll skipped")
        }
        _ => warn!(error = %err, kind = err.kind(), "offer poll failed"),
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::DriverApi;
use crate::config::SessionSettings;
use crate::device::{CredentialStore, LocationProvider};
use crate::engine::flight::SingleFlight;
use crate::engine::lifecycle::next_phase;
use crate::engine::poller::PollOutcome;
use crate::engine::timer::{TimerHandle, after};
use crate::error::AppError;
use crate::geo::maps::MapsProvider;
use crate::geo::pricing::straight_line_quote;
use crate::models::location::LocationSample;
use crate::models::offer::RideOffer;
use crate::models::session::{OnlineStatus, PresenceStatus};
use crate::models::trip::{RidePhase, Trip, TripAction, TripStatus, TripSummary};
use crate::observability::metrics::Metrics;

/// Read-only view of the session handed to the view layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Identifies one online shift; `None` while offline.
    pub session_id: Option<Uuid>,
    pub online: OnlineStatus,
    pub phase: RidePhase,
    pub offer: Option<RideOffer>,
    pub trip: Option<Trip>,
    pub summary: Option<TripSummary>,
    pub last_location: Option<LocationSample>,
    pub last_presence_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub session_id: Option<Uuid>,
    pub online: OnlineStatus,
    pub phase: RidePhase,
    pub offer: Option<RideOffer>,
    pub trip: Option<Trip>,
    pub summary: Option<TripSummary>,
    pub last_location: Option<LocationSample>,
    pub last_presence_at: Option<DateTime<Utc>>,
    pub last_poll_at: Option<Instant>,
    /// Set between an offline request and the final presence update.
    pub going_offline: bool,
    /// Bumped on every online/offline switch and on teardown; work started under an
    /// older epoch must not write back.
    pub epoch: u64,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            online: self.online,
            phase: self.phase,
            offer: self.offer.clone(),
            trip: self.trip.clone(),
            summary: self.summary.clone(),
            last_location: self.last_location,
            last_presence_at: self.last_presence_at,
        }
    }

    fn clear_ride(&mut self) {
        self.phase = RidePhase::Looking;
        self.offer = None;
        self.trip = None;
        self.summary = None;
        self.last_poll_at = None;
    }
}

#[derive(Default)]
pub(crate) struct Timers {
    pub presence: Option<TimerHandle>,
    pub poller: Option<TimerHandle>,
    pub cooldown: Option<TimerHandle>,
}

/// Collaborators the controller talks to.
pub struct SessionDeps {
    pub api: DriverApi,
    pub maps: Arc<dyn MapsProvider>,
    pub location: Arc<dyn LocationProvider>,
    pub credentials: CredentialStore,
}

pub(crate) struct SessionCore {
    pub api: DriverApi,
    pub maps: Arc<dyn MapsProvider>,
    pub location: Arc<dyn LocationProvider>,
    pub credentials: CredentialStore,
    pub settings: SessionSettings,
    pub metrics: Metrics,
    pub state: RwLock<SessionState>,
    pub timers: Mutex<Timers>,
    pub publish_flight: SingleFlight,
    pub poll_flight: SingleFlight,
    actions: Mutex<()>,
    events: broadcast::Sender<SessionSnapshot>,
}

impl SessionCore {
    /// Moves the state machine and records the transition.
    pub(crate) fn apply(
        &self,
        state: &mut SessionState,
        action: TripAction,
    ) -> Result<RidePhase, AppError> {
        let to = next_phase(state.phase, action)?;
        if to != state.phase {
            info!(from = %state.phase, to = %to, "ride phase changed");
            self.metrics
                .trip_transitions_total
                .with_label_values(&[to.as_str()])
                .inc();
        }
        state.phase = to;
        Ok(to)
    }

    pub(crate) fn publish_snapshot(&self, state: &SessionState) {
        let _ = self.events.send(state.snapshot());
    }

    async fn stop_timers(&self) {
        let timers = std::mem::take(&mut *self.timers.lock().await);
        for handle in [timers.presence, timers.poller, timers.cooldown]
            .into_iter()
            .flatten()
        {
            handle.cancel().await;
        }
    }

    async fn stop_poller(&self) {
        let poller = self.timers.lock().await.poller.take();
        if let Some(poller) = poller {
            poller.cancel().await;
        }
    }

    async fn resume_poller(self: &Arc<Self>, epoch: u64) {
        let mut timers = self.timers.lock().await;
        if let Some(previous) = timers.poller.take() {
            previous.cancel().await;
        }
        timers.poller = Some(self.start_poller(epoch));
    }

    fn schedule_cooldown(self: &Arc<Self>, epoch: u64) -> TimerHandle {
        let core = self.clone();
        after("reject-cooldown", self.settings.reject_cooldown, move || async move {
            core.finish_cooldown(epoch).await;
        })
    }

    async fn finish_cooldown(self: &Arc<Self>, epoch: u64) {
        let mut timers = self.timers.lock().await;
        timers.cooldown = None;

        {
            let mut state = self.state.write().await;
            if state.epoch != epoch || !state.online.is_online() {
                return;
            }
            if self.apply(&mut state, TripAction::CooldownElapsed).is_err() {
                return;
            }
            state.last_poll_at = None;
            self.publish_snapshot(&state);
        }

        if let Some(previous) = timers.poller.take() {
            previous.cancel().await;
        }
        timers.poller = Some(self.start_poller(epoch));
    }
}

/// The driver trip session controller: presence publisher, ride offer poller and trip
/// lifecycle behind one handle. Cloning shares the same session.
#[derive(Clone)]
pub struct SessionController {
    core: Arc<SessionCore>,
}

impl SessionController {
    pub fn new(
        deps: SessionDeps,
        settings: SessionSettings,
        metrics: Metrics,
        event_buffer_size: usize,
    ) -> Self {
        let (events, _unused_rx) = broadcast::channel(event_buffer_size.max(1));

        Self {
            core: Arc::new(SessionCore {
                api: deps.api,
                maps: deps.maps,
                location: deps.location,
                credentials: deps.credentials,
                settings,
                metrics,
                state: RwLock::new(SessionState::default()),
                timers: Mutex::new(Timers::default()),
                publish_flight: SingleFlight::new(),
                poll_flight: SingleFlight::new(),
                actions: Mutex::new(()),
                events,
            }),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.core.state.read().await.snapshot()
    }

    /// Snapshots published after every state change.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.core.events.subscribe()
    }

    /// Starts publishing presence and polling for offers.
    pub async fn go_online(&self) -> Result<SessionSnapshot, AppError> {
        let core = &self.core;
        let _action = core.actions.lock().await;

        let (epoch, session_id) = {
            let mut state = core.state.write().await;
            if state.online.is_online() {
                return Ok(state.snapshot());
            }
            state.epoch += 1;
            state.session_id = Some(Uuid::new_v4());
            state.online = OnlineStatus::Online;
            state.going_offline = false;
            state.clear_ride();
            core.metrics.driver_online.set(1);
            core.publish_snapshot(&state);
            (state.epoch, state.session_id)
        };

        let mut timers = core.timers.lock().await;
        timers.presence = Some(core.start_presence(epoch));
        timers.poller = Some(core.start_poller(epoch));
        drop(timers);

        if let Some(session_id) = session_id {
            info!(%session_id, "driver online");
        }
        Ok(self.snapshot().await)
    }

    /// Stops both timers and sends one final "inactive" presence update.
    /// Refused while a ride is accepted or in progress.
    pub async fn go_offline(&self) -> Result<SessionSnapshot, AppError> {
        let core = &self.core;
        let _action = core.actions.lock().await;

        {
            let mut state = core.state.write().await;
            if !state.online.is_online() {
                return Ok(state.snapshot());
            }
            if state.phase.has_active_trip() {
                return Err(AppError::Conflict(format!(
                    "cannot go offline while the trip is {}",
                    state.phase
                )));
            }
            state.epoch += 1;
            state.going_offline = true;
        }

        core.stop_timers().await;
        core.poll_flight.settled().await;
        core.publish_flight.settled().await;

        let farewell = core.publish_presence(PresenceStatus::Inactive).await;

        let snapshot = {
            let mut state = core.state.write().await;
            state.online = OnlineStatus::Offline;
            state.going_offline = false;
            state.session_id = None;
            state.clear_ride();
            if let Ok(sample) = &farewell {
                state.last_location = Some(*sample);
                state.last_presence_at = Some(Utc::now());
            }
            core.metrics.driver_online.set(0);
            core.publish_snapshot(&state);
            state.snapshot()
        };

        let outcome = if farewell.is_ok() { "published" } else { "failed" };
        core.metrics
            .presence_publishes_total
            .with_label_values(&[PresenceStatus::Inactive.as_str(), outcome])
            .inc();
        match farewell {
            Ok(_) => info!("driver offline"),
            Err(err) => warn!(error = %err, "driver offline; final presence update failed"),
        }
        Ok(snapshot)
    }

    /// Runs one offer poll now, subject to the single-flight and spacing rules.
    pub async fn poll_now(&self) -> PollOutcome {
        self.core.poll_cycle(None).await
    }

    pub async fn accept(&self) -> Result<Trip, AppError> {
        let core = &self.core;
        let _action = core.actions.lock().await;

        let (offer, epoch) = {
            let state = core.state.read().await;
            next_phase(state.phase, TripAction::Accept)?;
            let offer = state
                .offer
                .clone()
                .ok_or_else(|| AppError::Conflict("no ride offer to accept".to_string()))?;
            (offer, state.epoch)
        };

        let credentials = core.credentials.require().await?;
        let quote = offer.quote.clone().unwrap_or_else(|| {
            straight_line_quote(&offer.pickup, &offer.drop, core.settings.rate_per_km)
        });

        let approved = core
            .api
            .approve_ride(&credentials, &offer.pending_ride_id, &quote)
            .await
            .inspect_err(|err| {
                warn!(
                    pending_ride_id = %offer.pending_ride_id,
                    error = %err,
                    "approve ride failed"
                )
            })?;

        let trip = Trip {
            approved_ride_id: approved
                .approved_ride_id
                .unwrap_or_else(|| offer.pending_ride_id.clone()),
            trip_id: approved.trip_id,
            pending_ride_id: offer.pending_ride_id.clone(),
            pickup: offer.pickup,
            drop: offer.drop,
            pickup_address: offer.pickup_address.clone(),
            drop_address: offer.drop_address.clone(),
            quote,
            start_point: None,
            end_point: None,
            status: TripStatus::Approved,
            accepted_at: Utc::now(),
            started_at: None,
            ended_at: None,
        };

        {
            let mut state = core.state.write().await;
            if state.epoch != epoch {
                return Err(AppError::Conflict("session changed while accepting".to_string()));
            }
            core.apply(&mut state, TripAction::Accept)?;
            state.offer = None;
            state.trip = Some(trip.clone());
            core.publish_snapshot(&state);
        }

        core.stop_poller().await;

        info!(trip_id = %trip.trip_id, price = %trip.quote.price, "ride accepted");
        Ok(trip)
    }

    /// Rejects the offer, waits out the cooldown in `searching`, then polls again.
    pub async fn reject(&self) -> Result<SessionSnapshot, AppError> {
        let core = &self.core;
        let _action = core.actions.lock().await;

        let (pending_ride_id, epoch) = {
            let state = core.state.read().await;
            next_phase(state.phase, TripAction::Reject)?;
            let offer = state
                .offer
                .as_ref()
                .ok_or_else(|| AppError::Conflict("no ride offer to reject".to_string()))?;
            (offer.pending_ride_id.clone(), state.epoch)
        };

        let credentials = core.credentials.require().await?;
        core.api
            .reject_ride(&credentials, &pending_ride_id)
            .await
            .inspect_err(|err| {
                warn!(
                    pending_ride_id = %pending_ride_id,
                    error = %err,
                    "reject ride failed"
                )
            })?;

        let snapshot = {
            let mut state = core.state.write().await;
            if state.epoch != epoch {
                return Err(AppError::Conflict("session changed while rejecting".to_string()));
            }
            core.apply(&mut state, TripAction::Reject)?;
            state.offer = None;
            core.publish_snapshot(&state);
            state.snapshot()
        };

        core.stop_poller().await;
        let cooldown = core.schedule_cooldown(epoch);
        core.timers.lock().await.cooldown = Some(cooldown);

        info!(pending_ride_id = %pending_ride_id, "ride rejected");
        Ok(snapshot)
    }

    /// Starts the accepted trip at the device's current location.
    pub async fn start_trip(&self) -> Result<Trip, AppError> {
        let core = &self.core;
        let _action = core.actions.lock().await;

        let trip = {
            let state = core.state.read().await;
            next_phase(state.phase, TripAction::Start)?;
            state
                .trip
                .clone()
                .ok_or_else(|| AppError::Internal("accepted phase without a trip".to_string()))?
        };

        let sample = core.location.current_location().await?;
        let credentials = core.credentials.require().await?;
        core.api
            .start_ride(&credentials, &trip.trip_id, &trip.approved_ride_id, sample.point)
            .await
            .inspect_err(|err| {
                warn!(trip_id = %trip.trip_id, error = %err, "start ride failed")
            })?;

        let mut state = core.state.write().await;
        core.apply(&mut state, TripAction::Start)?;
        state.last_location = Some(sample);
        let trip = state
            .trip
            .as_mut()
            .ok_or_else(|| AppError::Internal("trip vanished while starting".to_string()))?;
        trip.status = TripStatus::Started;
        trip.start_point = Some(sample.point);
        trip.started_at = Some(sample.captured_at);
        let started = trip.clone();
        core.publish_snapshot(&state);

        info!(trip_id = %started.trip_id, "trip started");
        Ok(started)
    }

    /// Ends the trip at the device's current location and records its summary.
    pub async fn end_trip(&self) -> Result<TripSummary, AppError> {
        let core = &self.core;
        let _action = core.actions.lock().await;

        let trip = {
            let state = core.state.read().await;
            next_phase(state.phase, TripAction::End)?;
            state
                .trip
                .clone()
                .ok_or_else(|| AppError::Internal("started phase without a trip".to_string()))?
        };

        let sample = core.location.current_location().await?;
        let credentials = core.credentials.require().await?;
        let ended = core
            .api
            .end_ride(&credentials, &trip.trip_id, &trip.approved_ride_id, sample.point)
            .await
            .inspect_err(|err| {
                warn!(trip_id = %trip.trip_id, error = %err, "end ride failed")
            })?;

        let summary = TripSummary {
            distance: ended.distance.unwrap_or_else(|| trip.quote.distance.clone()),
            duration: ended.duration.or_else(|| trip.quote.duration.clone()),
            price: ended.price.unwrap_or_else(|| trip.quote.price.clone()),
        };

        let mut state = core.state.write().await;
        core.apply(&mut state, TripAction::End)?;
        state.last_location = Some(sample);
        if let Some(trip) = state.trip.as_mut() {
            trip.status = TripStatus::Ended;
            trip.end_point = Some(sample.point);
            trip.ended_at = Some(sample.captured_at);
        }
        state.summary = Some(summary.clone());
        core.publish_snapshot(&state);

        info!(
            trip_id = %trip.trip_id,
            distance = %summary.distance,
            price = %summary.price,
            "trip ended"
        );
        Ok(summary)
    }

    /// Acknowledges the trip summary and resumes looking for rides.
    pub async fn dismiss_summary(&self) -> Result<SessionSnapshot, AppError> {
        let core = &self.core;
        let _action = core.actions.lock().await;

        let (snapshot, online, epoch) = {
            let mut state = core.state.write().await;
            core.apply(&mut state, TripAction::Dismiss)?;
            state.clear_ride();
            core.publish_snapshot(&state);
            (state.snapshot(), state.online.is_online(), state.epoch)
        };

        if online {
            core.resume_poller(epoch).await;
        }
        Ok(snapshot)
    }

    /// Cancels every timer without notifying the backend. Used when the owner goes away.
    pub async fn shutdown(&self) {
        let core = &self.core;
        let _action = core.actions.lock().await;

        {
            let mut state = core.state.write().await;
            state.epoch += 1;
            state.online = OnlineStatus::Offline;
            state.going_offline = false;
            state.session_id = None;
            core.metrics.driver_online.set(0);
            core.publish_snapshot(&state);
        }

        core.stop_timers().await;
        info!("session torn down");
    }
}

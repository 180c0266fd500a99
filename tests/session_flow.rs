mod common;

use std::time::Duration;

use driver_session::backend::Operation;
use driver_session::engine::PollOutcome;
use driver_session::error::AppError;
use driver_session::models::location::GeoPoint;
use driver_session::models::session::OnlineStatus;
use driver_session::models::trip::RidePhase;
use serde_json::json;
use tokio::time::sleep;

use common::{DROP, Harness, settle};

async fn harness_with_offer() -> Harness {
    let harness = Harness::signed_in().await;
    harness.maps.set_route("5.2 km", "14 mins");
    harness.offer_ride("P-100");
    harness.state.session.go_online().await.unwrap();
    settle().await;
    harness
}

#[tokio::test(start_paused = true)]
async fn presence_ticks_never_overlap_a_slow_update() {
    let harness = Harness::signed_in().await;
    harness
        .backend
        .delay(Operation::UpdateVehicleLocation, Duration::from_secs(150));

    harness.state.session.go_online().await.unwrap();

    // Ticks at 60 s and 120 s land while the first update is still outstanding.
    sleep(Duration::from_secs(170)).await;
    assert_eq!(harness.backend.count(Operation::UpdateVehicleLocation), 1);

    sleep(Duration::from_secs(15)).await;
    assert_eq!(harness.backend.count(Operation::UpdateVehicleLocation), 2);
    assert_eq!(harness.backend.max_in_flight(Operation::UpdateVehicleLocation), 1);

    let first = harness.backend.calls_of(Operation::UpdateVehicleLocation).remove(0);
    assert_eq!(first["status"], "active");
    assert_eq!(first["vehicle_id"], "veh-7");
    assert_eq!(first["login_token"], "tok-1");
}

#[tokio::test(start_paused = true)]
async fn offer_polls_never_overlap_a_slow_find_ride() {
    let harness = Harness::signed_in().await;
    harness
        .backend
        .delay(Operation::FindRide, Duration::from_secs(30));

    harness.state.session.go_online().await.unwrap();
    sleep(Duration::from_secs(29)).await;

    assert_eq!(harness.backend.count(Operation::FindRide), 1);
    assert_eq!(
        harness.state.session.poll_now().await,
        PollOutcome::SkippedInFlight
    );

    sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.backend.max_in_flight(Operation::FindRide), 1);
}

#[tokio::test(start_paused = true)]
async fn going_offline_sends_exactly_one_final_inactive_update() {
    let harness = Harness::signed_in().await;
    harness
        .backend
        .delay(Operation::UpdateVehicleLocation, Duration::from_secs(20));

    let session = harness.state.session.clone();
    session.go_online().await.unwrap();
    sleep(Duration::from_secs(1)).await;

    // The first "active" update is still outstanding; going offline waits for it.
    let snapshot = session.go_offline().await.unwrap();
    assert_eq!(snapshot.online, OnlineStatus::Offline);
    assert!(snapshot.session_id.is_none());

    let calls_at_offline = harness.backend.calls().len();
    sleep(Duration::from_secs(600)).await;
    assert_eq!(harness.backend.calls().len(), calls_at_offline);

    let updates = harness.backend.calls_of(Operation::UpdateVehicleLocation);
    let inactive: Vec<_> = updates
        .iter()
        .filter(|update| update["status"] == "inactive")
        .collect();
    assert_eq!(inactive.len(), 1);
    assert_eq!(updates.last().unwrap()["status"], "inactive");
    assert_eq!(
        harness.backend.max_in_flight(Operation::UpdateVehicleLocation),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_is_refused_while_going_offline() {
    let harness = Harness::signed_in().await;
    let session = harness.state.session.clone();

    session.go_online().await.unwrap();
    sleep(Duration::from_secs(6)).await;
    let polls_before = harness.backend.count(Operation::FindRide);

    // Hold the final "inactive" update open so the refresh lands mid-shutdown.
    harness
        .backend
        .delay(Operation::UpdateVehicleLocation, Duration::from_secs(10));
    let leaving = tokio::spawn({
        let session = session.clone();
        async move { session.go_offline().await }
    });
    sleep(Duration::from_secs(1)).await;

    assert_eq!(session.poll_now().await, PollOutcome::SkippedOffline);

    let snapshot = leaving.await.unwrap().unwrap();
    assert_eq!(snapshot.online, OnlineStatus::Offline);
    assert_eq!(harness.backend.count(Operation::FindRide), polls_before);

    let last = harness.backend.calls().pop().unwrap();
    assert_eq!(last.operation, Operation::UpdateVehicleLocation);
    assert_eq!(last.data["status"], "inactive");
}

#[tokio::test(start_paused = true)]
async fn failed_presence_updates_keep_the_timer_running() {
    let harness = Harness::signed_in().await;
    harness
        .backend
        .fail(Operation::UpdateVehicleLocation, "connection reset");
    harness
        .backend
        .reply(Operation::UpdateVehicleLocation, json!({ "data": null }));

    let session = harness.state.session.clone();
    session.go_online().await.unwrap();
    settle().await;
    assert_eq!(harness.backend.count(Operation::UpdateVehicleLocation), 1);
    assert!(session.snapshot().await.last_presence_at.is_none());

    sleep(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(harness.backend.count(Operation::UpdateVehicleLocation), 2);
    assert!(session.snapshot().await.last_presence_at.is_none());

    sleep(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(harness.backend.count(Operation::UpdateVehicleLocation), 3);
    let snapshot = session.snapshot().await;
    assert!(snapshot.online.is_online());
    assert!(snapshot.last_presence_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_offer_polls_keep_the_timer_running() {
    let harness = Harness::signed_in().await;
    harness.backend.fail(Operation::FindRide, "connection reset");
    harness.backend.reply(
        Operation::FindRide,
        json!({ "status": "success", "data": "garbled" }),
    );
    harness.offer_ride("P-200");

    let session = harness.state.session.clone();
    session.go_online().await.unwrap();
    settle().await;
    assert_eq!(harness.backend.count(Operation::FindRide), 1);
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.phase, RidePhase::Looking);
    assert!(snapshot.offer.is_none());

    sleep(Duration::from_secs(12)).await;
    settle().await;
    assert_eq!(harness.backend.count(Operation::FindRide), 2);
    assert_eq!(session.snapshot().await.phase, RidePhase::Looking);

    sleep(Duration::from_secs(12)).await;
    settle().await;
    assert_eq!(harness.backend.count(Operation::FindRide), 3);
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.phase, RidePhase::Found);
    assert_eq!(snapshot.offer.unwrap().pending_ride_id, "P-200");
}

#[tokio::test(start_paused = true)]
async fn going_offline_twice_is_a_no_op() {
    let harness = Harness::signed_in().await;
    let session = harness.state.session.clone();

    session.go_online().await.unwrap();
    settle().await;
    session.go_offline().await.unwrap();
    session.go_offline().await.unwrap();

    let inactive = harness
        .backend
        .calls_of(Operation::UpdateVehicleLocation)
        .into_iter()
        .filter(|update| update["status"] == "inactive")
        .count();
    assert_eq!(inactive, 1);
}

#[tokio::test(start_paused = true)]
async fn matched_offer_is_geocoded_and_priced_from_the_route() {
    let harness = harness_with_offer().await;

    let snapshot = harness.state.session.snapshot().await;
    assert_eq!(snapshot.phase, RidePhase::Found);

    let offer = snapshot.offer.expect("offer is shown");
    assert_eq!(offer.pending_ride_id, "P-100");
    assert_eq!(offer.drop, GeoPoint::new(DROP.0, DROP.1).unwrap());
    assert_eq!(offer.pickup_address.as_deref(), Some("6.9271,79.8612"));
    assert_eq!(offer.drop_address.as_deref(), Some("6.9319,79.8478"));

    let quote = offer.quote.expect("offer is priced");
    assert_eq!(quote.distance, "5.2 km");
    assert_eq!(quote.duration.as_deref(), Some("14 mins"));
    assert_eq!(quote.price, "520.00");
}

#[tokio::test(start_paused = true)]
async fn route_failure_falls_back_to_straight_line_distance() {
    let harness = Harness::signed_in().await;
    harness.offer_ride("P-101");
    harness.state.session.go_online().await.unwrap();
    settle().await;

    let quote = harness
        .state
        .session
        .snapshot()
        .await
        .offer
        .and_then(|offer| offer.quote)
        .expect("offer is priced");

    assert_eq!(quote.duration, None);
    assert_eq!(quote.distance, "1.6 km");
    assert!((quote.distance_km - 1.572).abs() < 0.01);
    assert!(quote.price.starts_with("157."));
}

#[tokio::test(start_paused = true)]
async fn polling_pauses_while_an_offer_is_shown() {
    let harness = harness_with_offer().await;
    assert_eq!(harness.backend.count(Operation::FindRide), 1);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.backend.count(Operation::FindRide), 1);
    assert_eq!(
        harness.state.session.poll_now().await,
        PollOutcome::SkippedBusy
    );
}

#[tokio::test(start_paused = true)]
async fn rejection_waits_out_the_cooldown_before_polling_again() {
    let harness = harness_with_offer().await;
    let session = harness.state.session.clone();

    let snapshot = session.reject().await.unwrap();
    assert_eq!(snapshot.phase, RidePhase::Searching);
    assert!(snapshot.offer.is_none());
    assert_eq!(
        harness.backend.calls_of(Operation::RejectRide)[0]["pending_ride_id"],
        "P-100"
    );

    sleep(Duration::from_millis(1_990)).await;
    assert_eq!(session.snapshot().await.phase, RidePhase::Searching);
    assert_eq!(harness.backend.count(Operation::FindRide), 1);

    sleep(Duration::from_millis(60)).await;
    assert_eq!(session.snapshot().await.phase, RidePhase::Looking);
    assert_eq!(harness.backend.count(Operation::FindRide), 2);
}

#[tokio::test(start_paused = true)]
async fn accepted_trip_suspends_polling_until_the_summary_is_dismissed() {
    let harness = harness_with_offer().await;
    let session = harness.state.session.clone();
    harness.backend.reply(
        Operation::ApproveRide,
        json!({ "status": "success", "data": { "trip_id": 9001, "approved_ride_id": "A-3" } }),
    );
    harness.backend.reply(
        Operation::EndRide,
        json!({ "status": "success", "data": { "price": "530.00" } }),
    );

    let trip = session.accept().await.unwrap();
    assert_eq!(trip.trip_id, "9001");
    assert_eq!(trip.approved_ride_id, "A-3");

    let approve = harness.backend.calls_of(Operation::ApproveRide).remove(0);
    assert_eq!(approve["pending_ride_id"], "P-100");
    assert_eq!(approve["distance"], "5.2 km");
    assert_eq!(approve["duration"], "14 mins");
    assert_eq!(approve["price"], "520.00");

    sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.backend.count(Operation::FindRide), 1);

    let started = session.start_trip().await.unwrap();
    assert_eq!(started.start_point, GeoPoint::new(6.9271, 79.8612));

    harness.device.report(GeoPoint::new(DROP.0, DROP.1).unwrap()).await;
    let summary = session.end_trip().await.unwrap();
    assert_eq!(summary.price, "530.00");
    assert_eq!(summary.distance, "5.2 km");
    assert_eq!(summary.duration.as_deref(), Some("14 mins"));

    let end = harness.backend.calls_of(Operation::EndRide).remove(0);
    assert_eq!(end["trip_id"], "9001");
    assert_eq!(end["end_point_lat"], DROP.0);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.backend.count(Operation::FindRide), 1);
    assert_eq!(session.snapshot().await.phase, RidePhase::Ended);

    let snapshot = session.dismiss_summary().await.unwrap();
    assert_eq!(snapshot.phase, RidePhase::Looking);
    assert!(snapshot.trip.is_none() && snapshot.summary.is_none());

    settle().await;
    assert_eq!(harness.backend.count(Operation::FindRide), 2);
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_respects_minimum_spacing() {
    let harness = Harness::signed_in().await;
    let session = harness.state.session.clone();

    session.go_online().await.unwrap();
    settle().await;
    assert_eq!(harness.backend.count(Operation::FindRide), 1);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(session.poll_now().await, PollOutcome::SkippedTooSoon);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(session.poll_now().await, PollOutcome::NoMatch);
    assert_eq!(harness.backend.count(Operation::FindRide), 2);
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_while_offline_does_nothing() {
    let harness = Harness::signed_in().await;

    assert_eq!(
        harness.state.session.poll_now().await,
        PollOutcome::SkippedOffline
    );
    assert!(harness.backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cannot_go_offline_with_an_active_trip() {
    let harness = harness_with_offer().await;
    let session = harness.state.session.clone();
    harness.backend.reply(
        Operation::ApproveRide,
        json!({ "status": "success", "data": { "trip_id": "T-1" } }),
    );
    session.accept().await.unwrap();

    let err = session.go_offline().await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.online, OnlineStatus::Online);
    assert_eq!(snapshot.phase, RidePhase::Accepted);
    // The approved ride id falls back to the pending one.
    assert_eq!(snapshot.trip.unwrap().approved_ride_id, "P-100");
}

#[tokio::test(start_paused = true)]
async fn failed_backend_call_leaves_the_phase_unchanged() {
    let harness = harness_with_offer().await;
    let session = harness.state.session.clone();
    harness.backend.reply(
        Operation::ApproveRide,
        json!({ "status": "error", "message": "Ride already taken" }),
    );

    match session.accept().await {
        Err(AppError::Rejected(message)) => assert_eq!(message, "Ride already taken"),
        other => panic!("unexpected: {other:?}"),
    }

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.phase, RidePhase::Found);
    assert!(snapshot.offer.is_some());
}

#[tokio::test(start_paused = true)]
async fn actions_outside_the_table_are_refused() {
    let harness = Harness::signed_in().await;
    let session = harness.state.session.clone();
    session.go_online().await.unwrap();
    settle().await;

    let err = session.start_trip().await.unwrap_err();
    assert_eq!(err.to_string(), "cannot start the trip while looking");
    assert!(matches!(
        session.dismiss_summary().await,
        Err(AppError::InvalidTransition { .. })
    ));
    assert_eq!(harness.backend.count(Operation::StartRide), 0);
}

#[tokio::test(start_paused = true)]
async fn denied_location_skips_presence_without_calling_the_backend() {
    let harness = Harness::signed_in().await;
    harness.device.set_permission(false);

    harness.state.session.go_online().await.unwrap();
    sleep(Duration::from_secs(130)).await;

    assert_eq!(harness.backend.count(Operation::UpdateVehicleLocation), 0);
    assert!(harness.backend.count(Operation::FindRide) > 0);
}

#[tokio::test(start_paused = true)]
async fn missing_vehicle_skips_every_cycle() {
    let harness = Harness::signed_out();

    harness.state.session.go_online().await.unwrap();
    sleep(Duration::from_secs(130)).await;

    assert!(harness.backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_timers_without_notifying_the_backend() {
    let harness = Harness::signed_in().await;
    let session = harness.state.session.clone();
    session.go_online().await.unwrap();
    settle().await;

    let calls = harness.backend.calls().len();
    session.shutdown().await;
    sleep(Duration::from_secs(300)).await;

    assert_eq!(harness.backend.calls().len(), calls);
    assert!(
        harness
            .backend
            .calls_of(Operation::UpdateVehicleLocation)
            .iter()
            .all(|update| update["status"] == "active")
    );
}

#[tokio::test(start_paused = true)]
async fn snapshots_are_broadcast_on_every_change() {
    let harness = Harness::signed_in().await;
    harness.maps.set_route("5.2 km", "14 mins");
    harness.offer_ride("P-102");
    let mut events = harness.state.session.subscribe();

    harness.state.session.go_online().await.unwrap();
    settle().await;

    let mut phases = Vec::new();
    while let Ok(snapshot) = events.try_recv() {
        phases.push(snapshot.phase);
    }
    assert_eq!(phases.first(), Some(&RidePhase::Looking));
    assert!(phases.contains(&RidePhase::Found));
}

use crate::error::AppError;
use crate::models::trip::{RidePhase, TripAction};

/// Every action, in table order.
pub const ALL_ACTIONS: [TripAction; 8] = [
    TripAction::OfferFound,
    TripAction::OfferCleared,
    TripAction::Accept,
    TripAction::Reject,
    TripAction::CooldownElapsed,
    TripAction::Start,
    TripAction::End,
    TripAction::Dismiss,
];

/// The offer → trip state machine. Anything not listed is refused.
pub fn next_phase(from: RidePhase, action: TripAction) -> Result<RidePhase, AppError> {
    use RidePhase::*;
    use TripAction::*;

    let to = match (from, action) {
        (Looking, OfferFound) => Found,
        (Looking, OfferCleared) => Looking,
        (Found, Accept) => Accepted,
        (Found, Reject) => Searching,
        (Searching, CooldownElapsed) => Looking,
        (Accepted, Start) => Started,
        (Started, End) => Ended,
        (Ended, Dismiss) => Looking,
        _ => return Err(AppError::InvalidTransition { from, action }),
    };
    Ok(to)
}

/// Phases reachable from `from` in one step, excluding staying put.
pub fn successors(from: RidePhase) -> Vec<RidePhase> {
    let mut reachable: Vec<RidePhase> = ALL_ACTIONS
        .iter()
        .filter_map(|action| next_phase(from, *action).ok())
        .filter(|to| *to != from)
        .collect();
    reachable.dedup();
    reachable
}

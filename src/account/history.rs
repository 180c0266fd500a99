use futures::future::join_all;
use tracing::debug;

use crate::geo::maps::MapsProvider;
use crate::models::history::{RideHistoryEntry, RideRecord};
use crate::models::location::GeoPoint;

const NO_LOCATION: &str = "Location not available";
const NO_ADDRESS: &str = "Address not found";
const LOOKUP_FAILED: &str = "Address lookup failed";

/// Resolves start and end addresses for every record concurrently. Lookups never fail the
/// list; a placeholder is shown instead.
pub async fn with_addresses(
    maps: &dyn MapsProvider,
    records: Vec<RideRecord>,
) -> Vec<RideHistoryEntry> {
    join_all(records.into_iter().map(|record| async move {
        let (start_address, end_address) =
            futures::join!(address(maps, record.start()), address(maps, record.end()));
        RideHistoryEntry {
            record,
            start_address,
            end_address,
        }
    }))
    .await
}

async fn address(maps: &dyn MapsProvider, point: Option<GeoPoint>) -> String {
    let Some(point) = point else {
        return NO_LOCATION.to_string();
    };

    match maps.reverse_geocode(point).await {
        Ok(address) if !address.trim().is_empty() => address,
        Ok(_) => NO_ADDRESS.to_string(),
        Err(err) if err.kind() == "not_found" => NO_ADDRESS.to_string(),
        Err(err) => {
            debug!(error = %err, "history address lookup failed");
            LOOKUP_FAILED.to_string()
        }
    }
}

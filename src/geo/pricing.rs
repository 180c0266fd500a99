use crate::error::AppError;
use crate::geo::haversine_km;
use crate::geo::maps::Route;
use crate::models::location::GeoPoint;
use crate::models::offer::RideQuote;

const METERS_PER_MILE: f64 = 1_609.344;

/// Kilometres from a directions distance label such as "5.2 km", "1,204 km" or "850 m".
pub fn parse_distance_km(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', "");
    let split = cleaned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(cleaned.len());
    let (number, unit) = cleaned.split_at(split);
    let value: f64 = number.parse().ok()?;

    let km = match unit.trim().to_ascii_lowercase().as_str() {
        "km" | "" => value,
        "m" => value / 1_000.0,
        "mi" => value * METERS_PER_MILE / 1_000.0,
        "ft" => value * 0.3048 / 1_000.0,
        _ => return None,
    };
    km.is_finite().then_some(km)
}

pub fn format_price(distance_km: f64, rate_per_km: f64) -> String {
    format!("{:.2}", distance_km * rate_per_km)
}

pub fn route_quote(route: &Route, rate_per_km: f64) -> RideQuote {
    let distance_km = parse_distance_km(&route.distance_text)
        .or_else(|| route.distance_meters.map(|m| m as f64 / 1_000.0))
        .unwrap_or(0.0);

    RideQuote {
        distance: route.distance_text.clone(),
        distance_km,
        duration: Some(route.duration_text.clone()),
        price: format_price(distance_km, rate_per_km),
    }
}

pub fn straight_line_quote(pickup: &GeoPoint, drop: &GeoPoint, rate_per_km: f64) -> RideQuote {
    let distance_km = haversine_km(pickup, drop);
    RideQuote {
        distance: format!("{distance_km:.1} km"),
        distance_km,
        duration: None,
        price: format_price(distance_km, rate_per_km),
    }
}

/// Prices the directions result, or the straight-line distance when the lookup failed.
pub fn quote(
    route: &Result<Route, AppError>,
    pickup: &GeoPoint,
    drop: &GeoPoint,
    rate_per_km: f64,
) -> RideQuote {
    match route {
        Ok(route) if parse_distance_km(&route.distance_text).is_some() || route.distance_meters.is_some() => {
            route_quote(route, rate_per_km)
        }
        _ => straight_line_quote(pickup, drop, rate_per_km),
    }
}

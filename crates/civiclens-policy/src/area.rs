//! Coordinate to area-type bucketing

use civiclens_core::{AreaDecision, AreaType, Error, Result};

use crate::FallbackGenerator;

/// Deterministic bucket for a coordinate pair.
///
/// `|round(lat * 1e6) + round(lon * 1e6)| mod 4` indexes [`AreaType::ALL`].
/// Stable across calls and restarts.
pub fn area_bucket(latitude: f64, longitude: f64) -> AreaType {
    let lat = (latitude * 1e6).round() as i64;
    let lon = (longitude * 1e6).round() as i64;
    let index = lat.wrapping_add(lon).unsigned_abs() % AreaType::ALL.len() as u64;

    AreaType::ALL[index as usize]
}

/// Area decision for a coordinate pair.
///
/// The confidence is random and carries no signal; it is kept for response
/// compatibility.
pub fn area_type(latitude: f64, longitude: f64, fallback: &FallbackGenerator) -> AreaDecision {
    AreaDecision {
        area_type: area_bucket(latitude, longitude),
        confidence: fallback.confidence(),
    }
}

/// Reject non-finite or out-of-range coordinates
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(Error::coordinates("latitude and longitude must be finite"));
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::coordinates(format!("latitude {} out of range", latitude)));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::coordinates(format!("longitude {} out of range", longitude)));
    }
    Ok(())
}

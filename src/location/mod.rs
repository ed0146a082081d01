//! Venue lookup, geolocation and location-aware thresholds.

pub mod database;
pub mod geo;
pub mod thresholds;

pub use database::{CarpetData, CarpetDatabase, CarpetSignature};
pub use geo::{haversine_km, GeoPoint, GeoReading, MovementTracker, EARTH_RADIUS_KM};
pub use thresholds::{
    pattern_adjustment, AdaptiveThresholds, CarpetInfo, LocationContext,
    LocationThresholdService, ThresholdSource, NEARBY_RADIUS_KM,
};

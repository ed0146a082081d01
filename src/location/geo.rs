//! Great-circle distance and geolocation movement tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance between consecutive readings that counts as moving, metres.
pub const MOVEMENT_THRESHOLD_M: f64 = 50.0;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Haversine distance to another point in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self, other)
    }
}

/// Haversine great-circle distance in kilometres.
///
/// Symmetric in its arguments and zero for identical points.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).abs().to_radians();
    let delta_lng = (b.lng - a.lng).abs().to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// One position fix from the geolocation provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoReading {
    pub point: GeoPoint,
    /// Reported accuracy radius in metres.
    pub accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl GeoReading {
    pub fn new(lat: f64, lng: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            point: GeoPoint::new(lat, lng),
            accuracy_m: None,
            timestamp,
        }
    }
}

/// Derives movement from consecutive position fixes.
#[derive(Debug, Clone, Default)]
pub struct MovementTracker {
    latest: Option<GeoReading>,
    is_moving: bool,
    movement_speed: f64,
}

impl MovementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reading and updates movement state.
    pub fn record(&mut self, reading: GeoReading) {
        if let Some(previous) = self.latest {
            let distance_m = haversine_km(&previous.point, &reading.point) * 1000.0;
            let elapsed_s =
                (reading.timestamp - previous.timestamp).num_milliseconds() as f64 / 1000.0;

            self.is_moving = distance_m > MOVEMENT_THRESHOLD_M;
            self.movement_speed = if elapsed_s > 0.0 {
                distance_m / elapsed_s
            } else {
                0.0
            };

            tracing::debug!(
                distance_m,
                elapsed_s,
                speed = self.movement_speed,
                moving = self.is_moving,
                "Geolocation updated"
            );
        }
        self.latest = Some(reading);
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    /// Speed between the last two readings in metres per second.
    pub fn movement_speed(&self) -> f64 {
        self.movement_speed
    }

    pub fn latest(&self) -> Option<&GeoReading> {
        self.latest.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_haversine_known_distance() {
        // London to Paris is roughly 344 km.
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let d = haversine_km(&london, &paris);
        assert!((d - 343.5).abs() < 2.0, "{d}");
    }

    #[test]
    fn test_distance_symmetric_and_zero() {
        let a = GeoPoint::new(51.6560, -0.3960);
        let b = GeoPoint::new(51.6580, -0.3990);
        assert_eq!(haversine_km(&a, &b), haversine_km(&b, &a));
        assert_eq!(haversine_km(&a, &a), 0.0);
    }

    #[test]
    fn test_single_reading_not_moving() {
        let mut tracker = MovementTracker::new();
        tracker.record(GeoReading::new(51.0, 0.0, Utc::now()));
        assert!(!tracker.is_moving());
        assert_eq!(tracker.movement_speed(), 0.0);
    }

    #[test]
    fn test_movement_detected() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap();
        let mut tracker = MovementTracker::new();

        tracker.record(GeoReading::new(51.6560, -0.3960, t0));
        // ~111 m north
        tracker.record(GeoReading::new(51.6570, -0.3960, t0 + Duration::seconds(2)));

        assert!(tracker.is_moving());
        let expected = haversine_km(
            &GeoPoint::new(51.6560, -0.3960),
            &GeoPoint::new(51.6570, -0.3960),
        ) * 1000.0
            / 2.0;
        assert!((tracker.movement_speed() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_small_drift_not_moving() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap();
        let mut tracker = MovementTracker::new();

        tracker.record(GeoReading::new(51.6560, -0.3960, t0));
        tracker.record(GeoReading::new(51.6561, -0.3960, t0 + Duration::seconds(2)));

        assert!(!tracker.is_moving());
        assert!(tracker.movement_speed() > 0.0);
    }
}

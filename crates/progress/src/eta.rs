//! Arrival estimates and journey telemetry.

use serde::Serialize;
use shiptrack_core::{distance_km, CurrentLocation, Location, Shipment, ShipmentStatus, Time};
use crate::config::TrackingConfig;

/// Read-only view of how a journey is going.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtaSummary {
    /// Stored arrival estimate (actual arrival once delivered)
    pub estimated_arrival: Time,
    /// Distance from the current location to the destination (km)
    pub distance_remaining: f64,
    /// Distance from the first waypoint to the destination (km)
    pub total_journey_distance: f64,
    /// Sum of every leg travelled (km)
    pub total_distance_covered: f64,
    /// Share of the journey distance closed, 0 to 100
    pub progress_percentage: u8,
    /// Observed speed since the journey began, one decimal (km/h)
    pub average_speed: f64,
    /// Time left at the observed speed, one decimal (hours)
    pub estimated_remaining_hours: f64,
    /// Where the shipment is now
    pub current_location: CurrentLocation,
    /// Where it is going
    pub destination: Location,
    /// Current status
    pub status: ShipmentStatus,
    /// Whether the current location is inside the arrival radius
    pub at_destination: bool,
}

/// Derives [`EtaSummary`] values from shipments.
#[derive(Debug, Clone, Default)]
pub struct EtaReporter {
    config: TrackingConfig,
}

impl EtaReporter {
    /// Create a reporter with the given configuration.
    pub fn new(config: TrackingConfig) -> Self {
        Self { config }
    }

    /// Summarize a shipment as of `now`. Pure: nothing is modified.
    pub fn summarize(&self, shipment: &Shipment, now: Time) -> EtaSummary {
        let destination = shipment.destination.coordinates;
        let distance_remaining = distance_km(shipment.current_location.coordinates, destination);

        let total_journey_distance = match shipment.route.first() {
            Some(first) => distance_km(first.coordinates, destination),
            None => distance_remaining,
        };
        let total_distance_covered = shipment.total_distance_covered();

        let progress_percentage = if total_journey_distance > 0.0 {
            let closed = (total_journey_distance - distance_remaining) / total_journey_distance;
            (closed * 100.0).clamp(0.0, 100.0).round() as u8
        } else {
            0
        };

        let started = shipment
            .route
            .first()
            .map_or(shipment.created_at, |w| w.timestamp);
        let journey_hours = (now - started).num_milliseconds() as f64 / 3_600_000.0;
        let average_speed = if journey_hours > 0.0 {
            total_distance_covered / journey_hours
        } else {
            self.config.cruising_speed_kmh
        };

        let estimated_remaining_hours =
            distance_remaining / average_speed.max(self.config.min_speed_kmh);

        EtaSummary {
            estimated_arrival: shipment.estimated_arrival,
            distance_remaining,
            total_journey_distance,
            total_distance_covered,
            progress_percentage,
            average_speed: round1(average_speed),
            estimated_remaining_hours: round1(estimated_remaining_hours),
            current_location: shipment.current_location.clone(),
            destination: shipment.destination.clone(),
            status: shipment.status,
            at_destination: distance_remaining <= self.config.arrival_radius_km,
        }
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ProgressEngine;
    use chrono::{Duration, TimeZone, Utc};
    use shiptrack_core::{LocationInput, NewShipment, RecordKey, ShipmentId};

    fn t0() -> Time {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
    }

    fn start(from: (f64, f64), to: (f64, f64)) -> Shipment {
        let draft = NewShipment {
            container_id: "C1".to_string(),
            current_location: LocationInput::new("Origin", from.0, from.1),
            destination: LocationInput::new("Destination", to.0, to.1),
            cargo: "Coffee".to_string(),
            weight: 20.0,
        };
        ProgressEngine::default()
            .start(RecordKey::new(), ShipmentId::from("SH9"), draft, t0())
            .unwrap()
    }

    #[test]
    fn test_fresh_shipment_uses_cruising_speed() {
        let shipment = start((40.7128, -74.0060), (34.0522, -118.2437));
        let summary = EtaReporter::default().summarize(&shipment, t0());

        assert_eq!(summary.progress_percentage, 0);
        assert_eq!(summary.total_distance_covered, 0.0);
        assert_eq!(summary.average_speed, 50.0);
        assert_eq!(summary.distance_remaining, summary.total_journey_distance);
        assert!((summary.estimated_remaining_hours - 78.7).abs() < 1e-9);
        assert_eq!(summary.status, ShipmentStatus::Pending);
        assert!(!summary.at_destination);
    }

    #[test]
    fn test_progress_and_observed_speed() {
        let engine = ProgressEngine::default();
        // 0,0 -> 0,2 along the equator, report at 0,1 after 2 hours
        let shipment = start((0.0, 0.0), (0.0, 2.0));
        let moved = engine
            .report_location(shipment, LocationInput::new("Halfway", 0.0, 1.0), t0() + Duration::hours(2))
            .unwrap()
            .shipment;

        let summary = EtaReporter::default().summarize(&moved, t0() + Duration::hours(2));
        assert_eq!(summary.progress_percentage, 50);
        // 111.19 km in 2 hours
        assert_eq!(summary.average_speed, 55.6);
        let expected_hours = summary.distance_remaining / (summary.total_distance_covered / 2.0);
        assert_eq!(summary.estimated_remaining_hours, (expected_hours * 10.0).round() / 10.0);
    }

    #[test]
    fn test_slow_journeys_use_speed_floor() {
        let engine = ProgressEngine::default();
        let shipment = start((0.0, 0.0), (0.0, 2.0));
        let moved = engine
            .report_location(shipment, LocationInput::new("Crawl", 0.0, 0.1), t0() + Duration::hours(100))
            .unwrap()
            .shipment;

        let summary = EtaReporter::default().summarize(&moved, t0() + Duration::hours(100));
        assert!(summary.average_speed < 20.0);
        let expected = (summary.distance_remaining / 20.0 * 10.0).round() / 10.0;
        assert_eq!(summary.estimated_remaining_hours, expected);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let engine = ProgressEngine::default();
        let shipment = start((0.0, 0.0), (0.0, 2.0));
        let moved = engine
            .report_location(shipment, LocationInput::new("A", 0.0, 0.5), t0() + Duration::hours(1))
            .unwrap()
            .shipment;

        let reporter = EtaReporter::default();
        let now = t0() + Duration::hours(3);
        assert_eq!(reporter.summarize(&moved, now), reporter.summarize(&moved, now));
        assert_eq!(reporter.summarize(&moved, now).total_distance_covered, moved.total_distance_covered());
    }

    #[test]
    fn test_progress_never_drops_while_closing_in() {
        let engine = ProgressEngine::default();
        let reporter = EtaReporter::default();
        let mut shipment = start((0.0, 0.0), (0.0, 2.0));
        let mut last = 0u8;

        for (i, lon) in [0.2, 0.5, 0.9, 1.3, 1.8, 1.95].into_iter().enumerate() {
            let now = t0() + Duration::hours(i as i64 + 1);
            shipment = engine
                .report_location(shipment, LocationInput::new("Stop", 0.0, lon), now)
                .unwrap()
                .shipment;
            let pct = reporter.summarize(&shipment, now).progress_percentage;
            assert!(pct >= last, "{pct} < {last}");
            last = pct;
        }
        assert!(last >= 97);
    }

    #[test]
    fn test_moving_away_clamps_to_zero() {
        let engine = ProgressEngine::default();
        let shipment = start((0.0, 0.0), (0.0, 2.0));
        let moved = engine
            .report_location(shipment, LocationInput::new("Wrong way", 0.0, -1.0), t0() + Duration::hours(1))
            .unwrap()
            .shipment;
        assert_eq!(EtaReporter::default().summarize(&moved, t0()).progress_percentage, 0);
    }

    #[test]
    fn test_zero_length_journey() {
        let shipment = start((10.0, 10.0), (10.0, 10.0));
        let summary = EtaReporter::default().summarize(&shipment, t0() + Duration::hours(1));
        assert_eq!(summary.total_journey_distance, 0.0);
        assert_eq!(summary.progress_percentage, 0);
        assert!(summary.at_destination);
        assert_eq!(summary.estimated_remaining_hours, 0.0);
    }

    #[test]
    fn test_empty_route_falls_back_to_creation_time() {
        let mut shipment = start((0.0, 0.0), (0.0, 2.0));
        shipment.route.clear();
        let summary = EtaReporter::default().summarize(&shipment, t0() + Duration::hours(4));
        assert_eq!(summary.total_journey_distance, summary.distance_remaining);
        assert_eq!(summary.total_distance_covered, 0.0);
        // Time has passed but nothing was covered
        assert_eq!(summary.average_speed, 0.0);
        let expected = (summary.distance_remaining / 20.0 * 10.0).round() / 10.0;
        assert_eq!(summary.estimated_remaining_hours, expected);
    }
}

//! Journey progress engine.
//!
//! Every state change that depends on geography goes through here:
//! opening a journey, applying a location report and forcing a status.
//! The engine works on owned values and never touches storage; callers
//! load a shipment, hand it in, and persist what comes back.

use chrono::Duration;
use serde::Serialize;
use shiptrack_core::{
    distance_km, CurrentLocation, LocationInput, NewShipment, RecordKey, Shipment, ShipmentId,
    ShipmentStatus, Time, Waypoint,
};
use tracing::debug;
use crate::config::TrackingConfig;
use crate::error::ProgressError;

/// Result of applying a location report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationUpdate {
    /// The shipment after the report
    #[serde(flatten)]
    pub shipment: Shipment,

    /// Distance from the reported position to the destination (km)
    pub distance_to_destination: f64,

    /// Sum of every leg along the route (km)
    pub total_distance_covered: f64,

    /// Whether the report landed inside the arrival radius
    pub at_destination: bool,
}

/// Applies location reports and status overrides to shipments.
#[derive(Debug, Clone, Default)]
pub struct ProgressEngine {
    config: TrackingConfig,
}

impl ProgressEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: TrackingConfig) -> Self {
        Self { config }
    }

    /// Arrival time if the remaining distance is covered at cruising speed.
    pub fn eta_from(&self, distance_km: f64, now: Time) -> Result<Time, ProgressError> {
        let speed_kmh = self.config.cruising_speed_kmh;
        let out_of_range = || ProgressError::EtaOutOfRange { distance_km, speed_kmh };

        let millis = (distance_km / speed_kmh * 3_600_000.0).round();
        if !millis.is_finite() || millis < 0.0 || millis > i64::MAX as f64 {
            return Err(out_of_range());
        }
        let ahead = Duration::try_milliseconds(millis as i64).ok_or_else(out_of_range)?;
        now.checked_add_signed(ahead).ok_or_else(out_of_range)
    }

    /// Open a new journey. The route is seeded with the starting point.
    pub fn start(
        &self,
        key: RecordKey,
        shipment_id: ShipmentId,
        draft: NewShipment,
        now: Time,
    ) -> Result<Shipment, ProgressError> {
        let draft = draft.validate()?;
        let distance = distance_km(draft.origin.coordinates, draft.destination.coordinates);

        let first = Waypoint {
            name: draft.origin.name,
            coordinates: draft.origin.coordinates,
            timestamp: now,
            distance_covered_km: 0.0,
        };

        Ok(Shipment {
            key,
            shipment_id,
            container_id: draft.container_id,
            cargo: draft.cargo,
            weight: draft.weight,
            current_location: CurrentLocation::from(&first),
            destination: draft.destination,
            route: vec![first],
            status: ShipmentStatus::Pending,
            estimated_arrival: self.eta_from(distance, now)?,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Apply a reported position.
    ///
    /// Appends a waypoint, moves the current location and derives the new
    /// status and ETA. Delivered shipments are rejected.
    pub fn report_location(
        &self,
        mut shipment: Shipment,
        report: LocationInput,
        now: Time,
    ) -> Result<LocationUpdate, ProgressError> {
        let location = report.validate("location")?;
        if shipment.status.is_terminal() {
            return Err(ProgressError::TerminalState {
                shipment_id: shipment.shipment_id,
            });
        }

        let distance_to_destination =
            distance_km(location.coordinates, shipment.destination.coordinates);
        let at_destination = distance_to_destination <= self.config.arrival_radius_km;

        let leg = shipment
            .route
            .last()
            .map_or(0.0, |last| distance_km(last.coordinates, location.coordinates));

        let waypoint = Waypoint {
            name: location.name,
            coordinates: location.coordinates,
            timestamp: now,
            distance_covered_km: leg,
        };
        shipment.current_location = CurrentLocation::from(&waypoint);
        shipment.route.push(waypoint);

        if at_destination {
            shipment.status = ShipmentStatus::Delivered;
            shipment.estimated_arrival = now;
        } else {
            if shipment.status == ShipmentStatus::Pending {
                shipment.status = ShipmentStatus::InTransit;
            }
            shipment.estimated_arrival = self.eta_from(distance_to_destination, now)?;

            // NOTE: compares against the ETA just derived from `now`, so this
            // cannot fire at normal clock rates. Kept as-is: whether the
            // previous ETA was meant here is unknown.
            if now > shipment.estimated_arrival && shipment.status == ShipmentStatus::InTransit {
                shipment.status = ShipmentStatus::Delayed;
            }
        }
        shipment.updated_at = now;

        let total_distance_covered = shipment.total_distance_covered();
        debug!(
            "Shipment {} at {:.1} km from destination, leg {:.1} km, status {}",
            shipment.shipment_id, distance_to_destination, leg, shipment.status
        );

        Ok(LocationUpdate {
            shipment,
            distance_to_destination,
            total_distance_covered,
            at_destination,
        })
    }

    /// Force a status without any distance checks.
    ///
    /// Forcing `delivered` freezes the ETA at `now`; every other status
    /// leaves it untouched.
    pub fn override_status(&self, mut shipment: Shipment, status: ShipmentStatus, now: Time) -> Shipment {
        shipment.status = status;
        if status == ShipmentStatus::Delivered {
            shipment.estimated_arrival = now;
        }
        shipment.updated_at = now;
        shipment
    }
}

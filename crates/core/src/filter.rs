//! Listing filters and sort orders for shipments.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use crate::shipment::{Shipment, ShipmentStatus};

/// Which shipments to list and in what order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentFilter {
    /// Only shipments in this status
    pub status: Option<ShipmentStatus>,

    /// Field to sort by
    pub sort_by: SortField,

    /// Sort direction
    pub order: SortOrder,
}

impl ShipmentFilter {
    /// Whether `shipment` passes the filter.
    pub fn matches(&self, shipment: &Shipment) -> bool {
        self.status.map_or(true, |s| shipment.status == s)
    }

    /// Filter and sort in one pass over an owned list.
    pub fn apply(&self, shipments: impl IntoIterator<Item = Shipment>) -> Vec<Shipment> {
        let mut out: Vec<Shipment> = shipments.into_iter().filter(|s| self.matches(s)).collect();
        out.sort_by(|a, b| {
            let ord = self.sort_by.compare(a, b);
            match self.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        out
    }
}

/// Sortable shipment fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Creation time
    #[default]
    CreatedAt,
    /// Last mutation time
    UpdatedAt,
    /// Projected arrival
    EstimatedArrival,
    /// Status name, alphabetically (delayed, delivered, in-transit, pending)
    Status,
    /// Container identifier
    ContainerId,
    /// Cargo weight
    Weight,
    /// Public shipment identifier
    ShipmentId,
}

impl SortField {
    fn compare(&self, a: &Shipment, b: &Shipment) -> Ordering {
        match self {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::EstimatedArrival => a.estimated_arrival.cmp(&b.estimated_arrival),
            SortField::Status => a.status.as_str().cmp(b.status.as_str()),
            SortField::ContainerId => a.container_id.cmp(&b.container_id),
            SortField::Weight => a.weight.total_cmp(&b.weight),
            SortField::ShipmentId => a.shipment_id.cmp(&b.shipment_id),
        }
    }
}

/// Sort direction. Newest first unless asked otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending
    Asc,
    /// Descending
    #[default]
    Desc,
}

/// Error returned for an unknown sort field or direction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort option '{0}'")]
pub struct ParseSortError(pub String);

impl std::str::FromStr for SortField {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both snake_case and the camelCase names clients tend to send.
        let normalized: String = s.chars().filter(|c| *c != '_' && *c != '-').collect();
        match normalized.to_ascii_lowercase().as_str() {
            "createdat" => Ok(SortField::CreatedAt),
            "updatedat" => Ok(SortField::UpdatedAt),
            "estimatedarrival" => Ok(SortField::EstimatedArrival),
            "status" => Ok(SortField::Status),
            "containerid" => Ok(SortField::ContainerId),
            "weight" => Ok(SortField::Weight),
            "shipmentid" => Ok(SortField::ShipmentId),
            _ => Err(ParseSortError(s.to_string())),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ParseSortError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::id::{RecordKey, ShipmentId};
    use crate::shipment::{CurrentLocation, Location};
    use chrono::{Duration, TimeZone, Utc};

    fn shipment(id: &str, status: ShipmentStatus, age_hours: i64, weight: f64) -> Shipment {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let at = base + Duration::hours(age_hours);
        let here = Coordinate::new(0.0, 0.0).unwrap();
        Shipment {
            key: RecordKey::new(),
            shipment_id: ShipmentId::from(id),
            container_id: format!("C-{id}"),
            cargo: "X".to_string(),
            weight,
            current_location: CurrentLocation { name: "here".to_string(), coordinates: here, timestamp: at },
            destination: Location { name: "there".to_string(), coordinates: here },
            route: Vec::new(),
            status,
            estimated_arrival: at,
            created_at: at,
            updated_at: at,
            version: 0,
        }
    }

    fn ids(list: &[Shipment]) -> Vec<&str> {
        list.iter().map(|s| s.shipment_id.as_str()).collect()
    }

    #[test]
    fn test_default_is_newest_first() {
        let list = vec![
            shipment("a", ShipmentStatus::Pending, 1, 5.0),
            shipment("b", ShipmentStatus::Delivered, 3, 1.0),
            shipment("c", ShipmentStatus::InTransit, 2, 9.0),
        ];
        let out = ShipmentFilter::default().apply(list);
        assert_eq!(ids(&out), ["b", "c", "a"]);
    }

    #[test]
    fn test_status_filter_and_ascending_weight() {
        let list = vec![
            shipment("a", ShipmentStatus::InTransit, 1, 5.0),
            shipment("b", ShipmentStatus::Delivered, 3, 1.0),
            shipment("c", ShipmentStatus::InTransit, 2, 2.0),
        ];
        let filter = ShipmentFilter {
            status: Some(ShipmentStatus::InTransit),
            sort_by: SortField::Weight,
            order: SortOrder::Asc,
        };
        assert_eq!(ids(&filter.apply(list)), ["c", "a"]);
    }

    #[test]
    fn test_status_sorts_by_name() {
        let list = vec![
            shipment("p", ShipmentStatus::Pending, 1, 1.0),
            shipment("t", ShipmentStatus::InTransit, 2, 1.0),
            shipment("v", ShipmentStatus::Delivered, 3, 1.0),
            shipment("d", ShipmentStatus::Delayed, 4, 1.0),
        ];
        let filter = ShipmentFilter {
            status: None,
            sort_by: SortField::Status,
            order: SortOrder::Asc,
        };
        assert_eq!(ids(&filter.apply(list)), ["d", "v", "t", "p"]);
    }

    #[test]
    fn test_parse_sort_options() {
        assert_eq!("createdAt".parse::<SortField>().unwrap(), SortField::CreatedAt);
        assert_eq!("estimated_arrival".parse::<SortField>().unwrap(), SortField::EstimatedArrival);
        assert_eq!("shipmentId".parse::<SortField>().unwrap(), SortField::ShipmentId);
        assert!("colour".parse::<SortField>().is_err());
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}

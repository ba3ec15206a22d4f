//! Instance input in the routing-service request format.
//!
//! ```json
//! {
//!   "depot": {"lat": 0.0, "lng": 0.0},
//!   "locations": [{"lat": 1.0, "lng": 0.0, "demand": 10}],
//!   "vehicles": 2,
//!   "capacity": 100
//! }
//! ```
//!
//! `lat` maps to the x axis and `lng` to the y axis; distances stay planar
//! Euclidean.

use serde::{Deserialize, Serialize};

use crate::error::{CvrpError, Result};

use super::{Customer, Instance};

/// A bare coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude (x axis).
    pub lat: f64,
    /// Longitude (y axis).
    pub lng: f64,
}

/// A customer location with its demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude (x axis).
    pub lat: f64,
    /// Longitude (y axis).
    pub lng: f64,
    /// Units to deliver.
    #[serde(default)]
    pub demand: i32,
}

fn default_one() -> i64 {
    1
}

/// Request payload describing a CVRP instance.
///
/// Missing `vehicles` and `capacity` default to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancePayload {
    /// Depot location.
    #[serde(default)]
    pub depot: Option<LatLng>,
    /// Customer locations.
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Fleet size.
    #[serde(default = "default_one")]
    pub vehicles: i64,
    /// Capacity of every vehicle.
    #[serde(default = "default_one")]
    pub capacity: i64,
}

impl InstancePayload {
    /// Parses a payload from JSON text.
    #[cfg(feature = "json")]
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CvrpError::invalid(format!("bad payload: {e}")))
    }

    /// Number of vehicles, usable as a route limit.
    pub fn vehicles(&self) -> Result<usize> {
        usize::try_from(self.vehicles)
            .ok()
            .filter(|&v| v > 0)
            .ok_or_else(|| {
                CvrpError::invalid(format!("vehicles must be positive, got {}", self.vehicles))
            })
    }

    /// Converts the payload into a validated instance (depot at index 0).
    pub fn to_instance(&self) -> Result<Instance> {
        let depot = match self.depot {
            Some(depot) if !self.locations.is_empty() => depot,
            _ => return Err(CvrpError::invalid("depot and locations are required")),
        };
        let capacity = i32::try_from(self.capacity).map_err(|_| {
            CvrpError::invalid(format!("capacity {} out of range", self.capacity))
        })?;

        let mut customers = Vec::with_capacity(self.locations.len() + 1);
        customers.push(Customer::depot(depot.lat, depot.lng));
        for (idx, loc) in self.locations.iter().enumerate() {
            customers.push(Customer::new(idx + 1, loc.lat, loc.lng, loc.demand));
        }
        Instance::new(customers, capacity)
    }
}

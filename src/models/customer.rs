//! Customer (node) type.

use serde::{Deserialize, Serialize};

/// A customer (or depot) in a CVRP instance.
///
/// Customer 0 is the depot. Each node has a planar location and a demand;
/// the depot's demand is always zero.
///
/// # Examples
///
/// ```
/// use u_cvrp::models::Customer;
///
/// let depot = Customer::depot(35.0, 35.0);
/// assert_eq!(depot.id(), 0);
/// assert_eq!(depot.demand(), 0);
///
/// let c = Customer::new(1, 41.0, 49.0, 10);
/// assert_eq!(c.id(), 1);
/// assert_eq!(c.demand(), 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    id: usize,
    x: f64,
    y: f64,
    demand: i32,
}

impl Customer {
    /// Creates a new customer.
    pub fn new(id: usize, x: f64, y: f64, demand: i32) -> Self {
        Self { id, x, y, demand }
    }

    /// Creates a depot at the given coordinates (id=0, demand=0).
    pub fn depot(x: f64, y: f64) -> Self {
        Self::new(0, x, y, 0)
    }

    /// Customer ID (0 = depot).
    pub fn id(&self) -> usize {
        self.id
    }

    /// X-coordinate.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Y-coordinate.
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Demand at this customer.
    pub fn demand(&self) -> i32 {
        self.demand
    }

    /// Returns `true` for the depot.
    pub fn is_depot(&self) -> bool {
        self.id == 0
    }

    /// Location as an `(x, y)` pair.
    pub fn coords(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Euclidean distance to another customer.
    pub fn distance_to(&self, other: &Customer) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Copy of this customer with a different ID.
    pub(crate) fn renumbered(&self, id: usize) -> Self {
        Self { id, ..self.clone() }
    }
}

//! Route and visit types.

use serde::{Deserialize, Serialize};

/// A single visit to a customer within a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    /// Customer ID being visited.
    pub customer_id: usize,
    /// Cumulative load after this visit.
    pub load_after: i32,
}

/// An ordered sequence of customer visits served by one vehicle.
///
/// A route starts and ends at the depot (not stored in `visits`).
///
/// # Examples
///
/// ```
/// use u_cvrp::models::{Route, Visit};
///
/// let mut route = Route::new();
/// route.push_visit(Visit { customer_id: 1, load_after: 10 });
/// route.push_visit(Visit { customer_id: 4, load_after: 25 });
/// assert_eq!(route.len(), 2);
/// assert_eq!(route.total_load(), 25);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    visits: Vec<Visit>,
    total_distance: f64,
    total_load: i32,
}

impl Route {
    /// Creates an empty route.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a visit to the end of this route.
    pub fn push_visit(&mut self, visit: Visit) {
        self.total_load = visit.load_after;
        self.visits.push(visit);
    }

    /// Returns the ordered sequence of visits.
    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    /// Returns the number of customer visits (excluding depot).
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    /// Returns `true` if this route has no customer visits.
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    /// Returns the customer IDs in visit order.
    pub fn customer_ids(&self) -> Vec<usize> {
        self.visits.iter().map(|v| v.customer_id).collect()
    }

    /// Depot-to-depot distance of this route (set by evaluator).
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    /// Total load served by this route.
    pub fn total_load(&self) -> i32 {
        self.total_load
    }

    /// Sets the total distance (used by evaluator).
    pub fn set_total_distance(&mut self, d: f64) {
        self.total_distance = d;
    }
}

//! Solution and violation types.

use serde::{Deserialize, Serialize};

use super::Route;

/// A type of constraint violation in a route or solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Vehicle capacity exceeded.
    CapacityExceeded {
        /// Route index in the solution.
        route_index: usize,
        /// Load that exceeded capacity.
        load: i32,
        /// Vehicle capacity.
        capacity: i32,
    },
    /// A customer is not on any route.
    CustomerMissing {
        /// Customer ID.
        customer_id: usize,
    },
    /// A customer is visited more than once.
    CustomerRepeated {
        /// Customer ID.
        customer_id: usize,
        /// Number of visits found.
        visits: usize,
    },
    /// A route references a node that is not a customer of the instance.
    UnknownCustomer {
        /// Route index.
        route_index: usize,
        /// Offending ID.
        customer_id: usize,
    },
}

/// A constraint violation in a solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// The type of violation.
    pub kind: ViolationType,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationType) -> Self {
        Self { kind }
    }
}

/// A complete set of depot-rooted routes.
///
/// # Examples
///
/// ```
/// use u_cvrp::models::{Solution, Route};
///
/// let mut sol = Solution::new();
/// sol.add_route(Route::new());
/// assert_eq!(sol.num_routes(), 1);
/// assert_eq!(sol.num_served(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    routes: Vec<Route>,
}

impl Solution {
    /// Creates an empty solution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route to this solution.
    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Moves all routes of `other` into this solution.
    pub fn absorb(&mut self, other: Solution) {
        self.routes.extend(other.routes);
    }

    /// Returns the routes in this solution.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of routes (vehicles used).
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Total distance across all routes.
    pub fn total_distance(&self) -> f64 {
        self.routes.iter().map(|r| r.total_distance()).sum()
    }

    /// Total number of customers served (across all routes).
    pub fn num_served(&self) -> usize {
        self.routes.iter().map(|r| r.len()).sum()
    }
}

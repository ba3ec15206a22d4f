//! Domain model types for CVRP instances.
//!
//! Provides customers with demands, validated instances (and the
//! depot-plus-cluster sub-instances carved from them), routes as ordered
//! sequences of visits, and solutions made of routes.

mod customer;
mod instance;
mod payload;
mod route;
mod solution;

pub use customer::Customer;
pub use instance::{Instance, SubInstance};
pub use payload::{InstancePayload, LatLng, Location};
pub use route::{Route, Visit};
pub use solution::{Solution, Violation, ViolationType};

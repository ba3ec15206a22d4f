//! Exact CVRP formulation.
//!
//! - [`ModelBuilder`] — turns a node subset, demands, distances and an
//!   optional edge restriction into a [`CvrpModel`]
//! - [`CvrpModel`] — arc and load variables, objective and constraints,
//!   plus exact checking of candidate arc assignments

mod builder;
mod model;

pub use builder::ModelBuilder;
pub use model::{
    ArcAssignment, ArcVar, AssignmentViolation, Constraint, ConstraintKind, CvrpModel, LoadVar,
    Sense, Var,
};

//! Error types shared across the crate.

use std::fmt;

use thiserror::Error;

/// Direction of an arc relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    /// Arc entering the node.
    Incoming,
    /// Arc leaving the node.
    Outgoing,
}

impl fmt::Display for ArcDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArcDirection::Incoming => f.write_str("incoming"),
            ArcDirection::Outgoing => f.write_str("outgoing"),
        }
    }
}

/// Structural reasons an instance cannot have any feasible solution.
///
/// These are detected before a model reaches a solver and are reported
/// separately from "no solution found within budget".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Infeasibility {
    /// A single customer needs more than one vehicle can carry.
    #[error("demand {demand} at node {node} exceeds vehicle capacity {capacity}")]
    DemandExceedsCapacity {
        /// Original node index.
        node: usize,
        /// Demand of the node.
        demand: i32,
        /// Vehicle capacity.
        capacity: i32,
    },
    /// An edge restriction leaves a customer without any usable arc.
    #[error("node {node} has no allowed {direction} arc")]
    UnroutableNode {
        /// Original node index.
        node: usize,
        /// Which side of the node is cut off.
        direction: ArcDirection,
    },
    /// The route limit cannot carry the total demand.
    #[error("{max_routes} routes of capacity {capacity} cannot carry total demand {total_demand}")]
    InsufficientRoutes {
        /// Configured route limit.
        max_routes: usize,
        /// Vehicle capacity.
        capacity: i32,
        /// Sum of all customer demands.
        total_demand: i64,
    },
}

/// Errors returned by instance construction, model building and solving.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CvrpError {
    /// Malformed input: dimension mismatch, negative demand, bad capacity.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The instance has no feasible solution by construction.
    #[error("infeasible instance: {0}")]
    InfeasibleInstance(#[from] Infeasibility),
    /// The solver backend failed to run.
    #[error("solver unavailable: {0}")]
    SolverUnavailable(String),
}

impl CvrpError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        CvrpError::InvalidInput(msg.into())
    }

    /// Returns `true` for structural infeasibility.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, CvrpError::InfeasibleInstance(_))
    }
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, CvrpError>;

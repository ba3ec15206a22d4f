//! Model solver capability and backends.
//!
//! - [`ModelSolver`] — solves a built [`CvrpModel`] within a time budget
//! - [`ExhaustiveSolver`] — enumerates successor choices; small models only
//! - [`MilpSolver`] — branch-and-bound via `microlp` (feature `milp`)
//!
//! Running out of time is an ordinary outcome ([`SolveStatus::Feasible`] or
//! [`SolveStatus::TimedOut`]), not an error. `Err` means the backend itself
//! could not run.

mod exhaustive;
#[cfg(feature = "milp")]
mod milp;

pub use exhaustive::ExhaustiveSolver;
#[cfg(feature = "milp")]
pub use milp::MilpSolver;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formulation::{ArcAssignment, CvrpModel};

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Proven optimal.
    Optimal,
    /// A solution was found but the budget ran out before proving optimality.
    Feasible,
    /// The search proved no solution exists.
    Infeasible,
    /// The budget ran out before any solution was found.
    TimedOut,
}

impl SolveStatus {
    /// Returns `true` if the outcome carries a solution.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// Result of one solve call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// How the solve ended.
    pub status: SolveStatus,
    /// Objective of the best solution, when there is one.
    pub objective: Option<f64>,
    /// Selected arcs of the best solution, when there is one.
    pub assignment: Option<ArcAssignment>,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl SolveOutcome {
    /// A proven optimum.
    pub fn optimal(objective: f64, assignment: ArcAssignment, elapsed: Duration) -> Self {
        Self {
            status: SolveStatus::Optimal,
            objective: Some(objective),
            assignment: Some(assignment),
            elapsed,
        }
    }

    /// An incumbent found before the budget ran out.
    pub fn feasible(objective: f64, assignment: ArcAssignment, elapsed: Duration) -> Self {
        Self {
            status: SolveStatus::Feasible,
            objective: Some(objective),
            assignment: Some(assignment),
            elapsed,
        }
    }

    /// Proven infeasible.
    pub fn infeasible(elapsed: Duration) -> Self {
        Self {
            status: SolveStatus::Infeasible,
            objective: None,
            assignment: None,
            elapsed,
        }
    }

    /// Budget exhausted without a solution.
    pub fn timed_out(elapsed: Duration) -> Self {
        Self {
            status: SolveStatus::TimedOut,
            objective: None,
            assignment: None,
            elapsed,
        }
    }
}

/// Finds the best arc assignment of a model within a time budget.
///
/// The call may block up to `time_limit` (plus backend overhead) and must
/// not hang beyond it. Solvers are shared across threads when clusters are
/// solved concurrently.
pub trait ModelSolver: Send + Sync {
    /// Short backend name for logs and reports.
    fn name(&self) -> &'static str;

    /// Solves `model`, returning the outcome or a backend failure.
    fn solve(&self, model: &CvrpModel, time_limit: Duration) -> Result<SolveOutcome>;
}

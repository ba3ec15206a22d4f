//! Mixed-integer backend on top of `microlp`.
//!
//! # Algorithm
//!
//! Depth-first branch-and-bound over the LP relaxation. Arc variables are
//! relaxed to `[0, 1]`; each node re-solves the parent's LP with one arc
//! fixed via [`microlp::Solution::fix_var`], so no LP is rebuilt from
//! scratch. The most fractional arc is branched on, the `1` side first.
//! Nodes whose relaxation bound cannot beat the incumbent are pruned.
//!
//! The budget is checked before every node on the calling thread, so a
//! solve overruns its budget by at most one LP re-solve and leaves nothing
//! running after it returns.

use std::time::{Duration, Instant};

use log::{debug, warn};
use microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem, Solution, Variable};

use crate::error::{CvrpError, Result};
use crate::formulation::{ArcAssignment, CvrpModel, Sense, Var};

use super::{ModelSolver, SolveOutcome};

const EPS: f64 = 1e-9;
const INTEGRALITY: f64 = 1e-6;

/// Solves the model as a MILP with `microlp` LP relaxations.
///
/// Runs entirely on the calling thread. When the budget runs out the best
/// integral solution found so far is returned as
/// [`SolveStatus::Feasible`](super::SolveStatus::Feasible), or
/// [`SolveStatus::TimedOut`](super::SolveStatus::TimedOut) without one.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_cvrp::formulation::ModelBuilder;
/// use u_cvrp::models::Instance;
/// use u_cvrp::solver::{MilpSolver, ModelSolver, SolveStatus};
///
/// let instance = Instance::from_points(&[(0.0, 0.0), (3.0, 4.0)], &[0, 1], 10).unwrap();
/// let model = ModelBuilder::for_instance(&instance).build().unwrap();
/// let outcome = MilpSolver::new().solve(&model, Duration::from_secs(10)).unwrap();
/// assert_eq!(outcome.status, SolveStatus::Optimal);
/// assert!((outcome.objective.unwrap() - 10.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MilpSolver;

impl MilpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl ModelSolver for MilpSolver {
    fn name(&self) -> &'static str {
        "milp"
    }

    fn solve(&self, model: &CvrpModel, time_limit: Duration) -> Result<SolveOutcome> {
        let started = Instant::now();
        let mut search = BranchAndBound {
            model,
            deadline: started.checked_add(time_limit),
            arc_vars: Vec::with_capacity(model.arcs().len()),
            best_cost: f64::INFINITY,
            best: None,
            nodes: 0,
            timed_out: false,
        };
        let completed = search.run().map_err(|e| CvrpError::SolverUnavailable(e.to_string()))?;

        let elapsed = started.elapsed();
        debug!(
            "milp explored {} nodes over {} variables in {elapsed:?}",
            search.nodes,
            model.num_variables()
        );
        Ok(match (search.best, completed) {
            (Some(best), true) => SolveOutcome::optimal(search.best_cost, best, elapsed),
            (Some(best), false) => {
                warn!("milp solve hit its {time_limit:?} budget with an incumbent");
                SolveOutcome::feasible(search.best_cost, best, elapsed)
            }
            (None, true) => SolveOutcome::infeasible(elapsed),
            (None, false) => {
                warn!("milp solve hit its {time_limit:?} budget without a solution");
                SolveOutcome::timed_out(elapsed)
            }
        })
    }
}

struct BranchAndBound<'m> {
    model: &'m CvrpModel,
    deadline: Option<Instant>,
    arc_vars: Vec<Variable>,
    best_cost: f64,
    best: Option<ArcAssignment>,
    nodes: u64,
    timed_out: bool,
}

impl BranchAndBound<'_> {
    fn out_of_time(&mut self) -> bool {
        if !self.timed_out {
            self.timed_out = self.deadline.map_or(false, |d| Instant::now() >= d);
        }
        self.timed_out
    }

    /// Explores the tree; `Ok(false)` when the budget cut the search short.
    fn run(&mut self) -> std::result::Result<bool, microlp::Error> {
        let Some(problem) = self.relaxation() else {
            return Ok(true);
        };
        if self.arc_vars.is_empty() && self.model.loads().is_empty() {
            self.best_cost = 0.0;
            self.best = Some(ArcAssignment::empty(self.model));
            return Ok(true);
        }

        let root = match problem.solve() {
            Ok(root) => root,
            Err(microlp::Error::Infeasible) => return Ok(true),
            Err(e) => return Err(e),
        };

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.out_of_time() {
                return Ok(false);
            }
            self.nodes += 1;
            if node.objective() >= self.best_cost - EPS {
                continue;
            }

            match self.most_fractional(&node) {
                None => self.accept(&node),
                Some(var) => {
                    for value in [0.0, 1.0] {
                        match node.clone().fix_var(var, value) {
                            Ok(child) => stack.push(child),
                            Err(microlp::Error::Infeasible) => {}
                            Err(e) => return Err(e),
                        }
                    }
                }
            }
        }
        Ok(true)
    }

    /// LP relaxation of the model; `None` if an empty constraint fails.
    fn relaxation(&mut self) -> Option<Problem> {
        let model = self.model;
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        self.arc_vars = model
            .arcs()
            .iter()
            .map(|arc| problem.add_var(arc.cost, (0.0, 1.0)))
            .collect();
        let load_vars: Vec<Variable> = model
            .loads()
            .iter()
            .map(|load| problem.add_var(0.0, (load.lower, load.upper)))
            .collect();

        for constraint in model.constraints() {
            if constraint.terms.is_empty() {
                if constraint.sense.holds(0.0, constraint.rhs) {
                    continue;
                }
                return None;
            }
            let expr: LinearExpr = constraint
                .terms
                .iter()
                .map(|&(var, coef)| {
                    let v = match var {
                        Var::Arc(idx) => self.arc_vars[idx],
                        Var::Load(idx) => load_vars[idx],
                    };
                    (v, coef)
                })
                .collect();
            let op = match constraint.sense {
                Sense::Le => ComparisonOp::Le,
                Sense::Eq => ComparisonOp::Eq,
                Sense::Ge => ComparisonOp::Ge,
            };
            problem.add_constraint(expr, op, constraint.rhs);
        }
        Some(problem)
    }

    fn most_fractional(&self, node: &Solution) -> Option<Variable> {
        self.arc_vars
            .iter()
            .map(|&v| (v, (node[v] - 0.5).abs()))
            .filter(|&(_, gap)| gap < 0.5 - INTEGRALITY)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(v, _)| v)
    }

    fn accept(&mut self, node: &Solution) {
        let assignment =
            ArcAssignment::from_flags(self.arc_vars.iter().map(|&v| node[v] > 0.5).collect());
        if self.model.check(&assignment).is_err() {
            debug!("integral relaxation rejected by the model check");
            return;
        }
        let cost = self.model.objective(&assignment);
        if cost < self.best_cost - EPS {
            self.best_cost = cost;
            self.best = Some(assignment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::ModelBuilder;
    use crate::models::Instance;
    use crate::solver::{ExhaustiveSolver, SolveStatus};

    const BUDGET: Duration = Duration::from_secs(30);

    fn ten_customers() -> Instance {
        let points = [
            (0.0, 0.0),
            (2.0, 7.0),
            (-3.0, 4.0),
            (6.0, -2.0),
            (-5.0, -5.0),
            (8.0, 3.0),
            (1.0, -6.0),
            (-7.0, 1.0),
            (4.0, 5.0),
            (-2.0, -3.0),
            (5.0, -7.0),
        ];
        let demands = [0, 12, 8, 15, 10, 9, 14, 7, 11, 6, 13];
        Instance::from_points(&points, &demands, 40).expect("valid")
    }

    #[cfg(target_os = "linux")]
    fn thread_names() -> Vec<String> {
        std::fs::read_dir("/proc/self/task")
            .expect("task dir")
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| std::fs::read_to_string(entry.path().join("comm")).ok())
            .map(|name| name.trim().to_string())
            .collect()
    }

    #[test]
    fn test_depot_only() {
        let inst = Instance::from_points(&[(0.0, 0.0)], &[0], 10).expect("valid");
        let model = ModelBuilder::for_instance(&inst).build().expect("model");
        let out = MilpSolver::new().solve(&model, BUDGET).expect("solve");
        assert_eq!(out.status, SolveStatus::Optimal);
        assert_eq!(out.objective, Some(0.0));
    }

    #[test]
    fn test_solution_satisfies_model() {
        let inst = Instance::from_points(
            &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 1.0)],
            &[0, 10, 10, 10],
            100,
        )
        .expect("valid");
        let model = ModelBuilder::for_instance(&inst).build().expect("model");
        let out = MilpSolver::new().solve(&model, BUDGET).expect("solve");
        assert_eq!(out.status, SolveStatus::Optimal);
        let assignment = out.assignment.expect("assignment");
        assert!(model.check(&assignment).is_ok());
        let expected = 3.0 + 5f64.sqrt();
        assert!((out.objective.expect("objective") - expected).abs() < 1e-6);
    }

    #[test]
    fn test_agrees_with_exhaustive_under_capacity() {
        let inst = Instance::from_points(
            &[(0.0, 0.0), (2.0, 1.0), (3.0, -1.0), (-2.0, 2.0), (-1.0, -3.0)],
            &[0, 40, 40, 40, 40],
            100,
        )
        .expect("valid");
        let model = ModelBuilder::for_instance(&inst).build().expect("model");
        let milp = MilpSolver::new().solve(&model, BUDGET).expect("solve");
        let brute = ExhaustiveSolver::new().solve(&model, BUDGET).expect("solve");
        assert_eq!(brute.status, SolveStatus::Optimal);
        assert_eq!(milp.status, SolveStatus::Optimal);
        let a = milp.objective.expect("objective");
        let b = brute.objective.expect("objective");
        assert!((a - b).abs() < 1e-6, "milp {a} vs exhaustive {b}");
    }

    #[test]
    fn test_zero_budget_times_out() {
        let inst = ten_customers();
        let model = ModelBuilder::for_instance(&inst).build().expect("model");
        let out = MilpSolver::new().solve(&model, Duration::ZERO).expect("solve");
        assert_eq!(out.status, SolveStatus::TimedOut);
        assert!(out.objective.is_none());
        assert!(out.assignment.is_none());
    }

    #[test]
    fn test_short_budget_is_honoured() {
        let inst = ten_customers();
        let model = ModelBuilder::for_instance(&inst).build().expect("model");
        let budget = Duration::from_millis(50);
        let out = MilpSolver::new().solve(&model, budget).expect("solve");
        if out.status != SolveStatus::Optimal {
            assert!(matches!(
                out.status,
                SolveStatus::Feasible | SolveStatus::TimedOut
            ));
            // One LP re-solve past the deadline at most
            assert!(out.elapsed < budget + Duration::from_secs(2));
        }
        if let Some(assignment) = &out.assignment {
            assert!(model.check(assignment).is_ok());
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_timeout_leaves_no_solver_thread() {
        let inst = ten_customers();
        let model = ModelBuilder::for_instance(&inst).build().expect("model");
        let out = MilpSolver::new()
            .solve(&model, Duration::from_millis(1))
            .expect("solve");
        assert_ne!(out.status, SolveStatus::Infeasible);
        assert!(!thread_names().iter().any(|name| name == "cvrp-milp"));
    }
}

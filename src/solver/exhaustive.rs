//! Exhaustive search over successor assignments.
//!
//! # Algorithm
//!
//! Every customer picks one successor among its arc variables (another
//! customer or the depot), with no customer chosen twice. Customers nobody
//! points to are entered from the depot. Each completed candidate is
//! accepted only if [`CvrpModel::check`] finds it satisfies the model's own
//! constraint set, so the search validates the generated formulation rather
//! than re-implementing CVRP feasibility. Branches whose partial distance
//! already matches the incumbent are pruned.
//!
//! # Complexity
//!
//! O(n^n) in the worst case; intended for models of a handful of customers.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{CvrpError, Result};
use crate::formulation::{ArcAssignment, CvrpModel};

use super::{ModelSolver, SolveOutcome};

const EPS: f64 = 1e-9;
const CLOCK_CHECK_INTERVAL: u64 = 256;

/// Brute-force [`ModelSolver`] for small models.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_cvrp::formulation::ModelBuilder;
/// use u_cvrp::models::Instance;
/// use u_cvrp::solver::{ExhaustiveSolver, ModelSolver, SolveStatus};
///
/// let instance = Instance::from_points(
///     &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
///     &[0, 10, 10, 10],
///     100,
/// )
/// .unwrap();
/// let model = ModelBuilder::for_instance(&instance).build().unwrap();
/// let outcome = ExhaustiveSolver::new().solve(&model, Duration::from_secs(5)).unwrap();
/// assert_eq!(outcome.status, SolveStatus::Optimal);
/// assert!((outcome.objective.unwrap() - 4.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct ExhaustiveSolver {
    max_customers: usize,
}

impl Default for ExhaustiveSolver {
    fn default() -> Self {
        Self { max_customers: 8 }
    }
}

impl ExhaustiveSolver {
    /// Solver accepting models of up to 8 customers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes the customer limit.
    pub fn with_max_customers(mut self, max_customers: usize) -> Self {
        self.max_customers = max_customers;
        self
    }
}

impl ModelSolver for ExhaustiveSolver {
    fn name(&self) -> &'static str {
        "exhaustive"
    }

    fn solve(&self, model: &CvrpModel, time_limit: Duration) -> Result<SolveOutcome> {
        let customers = model.num_nodes().saturating_sub(1);
        if customers > self.max_customers {
            return Err(CvrpError::SolverUnavailable(format!(
                "exhaustive search is limited to {} customers, model has {customers}",
                self.max_customers
            )));
        }

        let started = Instant::now();
        let mut search = Search {
            model,
            deadline: started.checked_add(time_limit),
            chosen: Vec::with_capacity(customers),
            entered: vec![false; model.num_nodes()],
            best_cost: f64::INFINITY,
            best: None,
            visits: 0,
            timed_out: false,
        };
        search.descend(1, 0.0);

        let elapsed = started.elapsed();
        debug!(
            "exhaustive search visited {} nodes in {elapsed:?}",
            search.visits
        );
        Ok(match (search.best, search.timed_out) {
            (Some(best), false) => SolveOutcome::optimal(search.best_cost, best, elapsed),
            (Some(best), true) => {
                warn!("exhaustive search hit its {time_limit:?} budget with an incumbent");
                SolveOutcome::feasible(search.best_cost, best, elapsed)
            }
            (None, false) => SolveOutcome::infeasible(elapsed),
            (None, true) => {
                warn!("exhaustive search hit its {time_limit:?} budget without a solution");
                SolveOutcome::timed_out(elapsed)
            }
        })
    }
}

struct Search<'m> {
    model: &'m CvrpModel,
    deadline: Option<Instant>,
    /// Arc chosen for each customer decided so far.
    chosen: Vec<usize>,
    /// Customers already entered from another customer.
    entered: Vec<bool>,
    best_cost: f64,
    best: Option<ArcAssignment>,
    visits: u64,
    timed_out: bool,
}

impl Search<'_> {
    fn out_of_time(&mut self) -> bool {
        if !self.timed_out && self.visits % CLOCK_CHECK_INTERVAL == 1 {
            if let Some(deadline) = self.deadline {
                self.timed_out = Instant::now() >= deadline;
            }
        }
        self.timed_out
    }

    fn descend(&mut self, customer: usize, cost: f64) {
        self.visits += 1;
        if self.out_of_time() || cost >= self.best_cost - EPS {
            return;
        }
        let model = self.model;
        if customer == model.num_nodes() {
            self.complete(cost);
            return;
        }

        for &arc in model.outgoing(customer) {
            let to = model.arcs()[arc].to;
            if to != 0 && self.entered[to] {
                continue;
            }
            if to != 0 {
                self.entered[to] = true;
            }
            self.chosen.push(arc);
            self.descend(customer + 1, cost + model.arcs()[arc].cost);
            self.chosen.pop();
            if to != 0 {
                self.entered[to] = false;
            }
            if self.timed_out {
                return;
            }
        }
    }

    fn complete(&mut self, mut cost: f64) {
        let model = self.model;
        let mut assignment = ArcAssignment::empty(model);
        for &arc in &self.chosen {
            assignment.select(arc);
        }
        for node in 1..model.num_nodes() {
            if self.entered[node] {
                continue;
            }
            let Some(arc) = model.arc_index(0, node) else {
                return;
            };
            assignment.select(arc);
            cost += model.arcs()[arc].cost;
        }

        if cost < self.best_cost - EPS && model.check(&assignment).is_ok() {
            self.best_cost = cost;
            self.best = Some(assignment);
        }
    }
}

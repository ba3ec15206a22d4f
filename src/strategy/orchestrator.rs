//! Runs the exact, cluster-decomposed and sparsified strategies.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cluster::{KMeans, Partition, Partitioner};
use crate::error::{CvrpError, Result};
use crate::evaluation::RouteEvaluator;
use crate::formulation::{CvrpModel, ModelBuilder};
use crate::models::{Instance, Solution, SubInstance};
use crate::solver::{ModelSolver, SolveOutcome, SolveStatus};
use crate::sparsify::restrict;

use super::{Comparison, StrategyConfig};

/// One of the three ways of turning an instance into models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// One model over the full instance.
    Exact,
    /// One model per customer cluster, objectives summed.
    Clustered,
    /// One model over the full instance restricted to near-neighbor arcs.
    Sparsified,
}

impl StrategyKind {
    /// Label used in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Exact => "Exact",
            StrategyKind::Clustered => "Clustered",
            StrategyKind::Sparsified => "Sparsified",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a strategy or sub-solve has no solution.
#[derive(Debug, Clone, PartialEq)]
pub enum AbsentReason {
    /// The time budget ran out before any solution was found.
    NoSolutionWithinBudget,
    /// The solver proved the model has no solution.
    ProvenInfeasible,
    /// The solver backend failed.
    Failed(CvrpError),
}

impl fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbsentReason::NoSolutionWithinBudget => f.write_str("no solution within budget"),
            AbsentReason::ProvenInfeasible => f.write_str("proven infeasible"),
            AbsentReason::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// Reported status of a strategy or sub-solve.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Every model involved was solved to proven optimality.
    Optimal,
    /// A solution exists but at least one model hit its budget first.
    FeasibleUnproven,
    /// No solution.
    Absent(AbsentReason),
}

impl Outcome {
    /// Returns `true` if a solution (and therefore a distance) exists.
    pub fn is_present(&self) -> bool {
        !matches!(self, Outcome::Absent(_))
    }

    /// Short status label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Optimal => "optimal",
            Outcome::FeasibleUnproven => "feasible (unproven)",
            Outcome::Absent(_) => "absent",
        }
    }

    // Combining keeps the worst outcome; failures outrank everything.
    fn severity(&self) -> u8 {
        match self {
            Outcome::Optimal => 0,
            Outcome::FeasibleUnproven => 1,
            Outcome::Absent(AbsentReason::NoSolutionWithinBudget) => 2,
            Outcome::Absent(AbsentReason::ProvenInfeasible) => 3,
            Outcome::Absent(AbsentReason::Failed(_)) => 4,
        }
    }

    fn from_status(status: SolveStatus) -> Self {
        match status {
            SolveStatus::Optimal => Outcome::Optimal,
            SolveStatus::Feasible => Outcome::FeasibleUnproven,
            SolveStatus::Infeasible => Outcome::Absent(AbsentReason::ProvenInfeasible),
            SolveStatus::TimedOut => Outcome::Absent(AbsentReason::NoSolutionWithinBudget),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Absent(reason) => write!(f, "absent ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Result of solving one model within a strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct SubSolve {
    /// Original indices of the customers in the model.
    pub members: Vec<usize>,
    /// How the solve ended.
    pub outcome: Outcome,
    /// Objective value; `None` whenever the outcome is absent.
    pub objective: Option<f64>,
    /// Wall-clock time of the solve call.
    pub elapsed: Duration,
}

/// Aggregated result of one strategy over an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    /// Strategy that produced this result.
    pub strategy: StrategyKind,
    /// Worst outcome over the strategy's models.
    pub outcome: Outcome,
    /// Sum of model objectives; `None` whenever the outcome is absent.
    pub total_distance: Option<f64>,
    /// Wall-clock time of the whole strategy, model building included.
    pub elapsed: Duration,
    /// One entry per model, in cluster order for the clustered strategy.
    pub sub_results: Vec<SubSolve>,
    /// Routes rebuilt on the full instance, when every model was solved.
    pub solution: Option<Solution>,
}

/// Per-model solve plus the routes it selected, before aggregation.
struct SubRun {
    summary: SubSolve,
    routes: Option<Vec<Vec<usize>>>,
}

/// Runs the solution strategies over an instance with a shared solver.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_cvrp::models::Instance;
/// use u_cvrp::solver::ExhaustiveSolver;
/// use u_cvrp::strategy::{Orchestrator, Outcome, StrategyConfig};
///
/// let instance = Instance::from_points(
///     &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 1.0)],
///     &[0, 10, 10, 10],
///     100,
/// )
/// .unwrap();
/// let config = StrategyConfig::new().with_time_limit(Duration::from_secs(5));
/// let orchestrator = Orchestrator::new(ExhaustiveSolver::new(), config).unwrap();
///
/// let exact = orchestrator.run_exact(&instance).unwrap();
/// assert_eq!(exact.outcome, Outcome::Optimal);
/// let expected = 3.0 + 5f64.sqrt();
/// assert!((exact.total_distance.unwrap() - expected).abs() < 1e-9);
/// ```
pub struct Orchestrator<S, P = KMeans> {
    solver: S,
    partitioner: P,
    config: StrategyConfig,
}

impl<S: ModelSolver> Orchestrator<S, KMeans> {
    /// Orchestrator partitioning with k-means seeded from the config.
    pub fn new(solver: S, config: StrategyConfig) -> Result<Self> {
        config.validate()?;
        let partitioner = KMeans::new().with_seed(config.seed());
        Ok(Self {
            solver,
            partitioner,
            config,
        })
    }
}

impl<S: ModelSolver, P: Partitioner> Orchestrator<S, P> {
    /// Replaces the partitioner used by the clustered strategy.
    pub fn with_partitioner<Q: Partitioner>(self, partitioner: Q) -> Orchestrator<S, Q> {
        Orchestrator {
            solver: self.solver,
            partitioner,
            config: self.config,
        }
    }

    /// Validated configuration shared by all strategies.
    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Solves one model over the full instance.
    ///
    /// Instance-level infeasibility is returned as an error before any solve.
    pub fn run_exact(&self, instance: &Instance) -> Result<StrategyResult> {
        let started = Instant::now();
        let model = self.limit_routes(ModelBuilder::for_instance(instance)).build()?;
        let run = self.solve_model(&model);
        Ok(assemble(
            StrategyKind::Exact,
            instance,
            vec![run],
            started.elapsed(),
        ))
    }

    /// Partitions the customers, solves each depot-plus-cluster sub-instance
    /// independently and sums the objectives.
    ///
    /// A failure or timeout in one cluster does not stop the others; the
    /// strategy is then reported absent with the worst reason found.
    pub fn run_clustered(&self, instance: &Instance) -> Result<StrategyResult> {
        let started = Instant::now();
        let partition = Partition::compute(instance, &self.partitioner, self.config.num_clusters())?;
        let subs: Vec<SubInstance> = partition
            .sub_instances(instance)?
            .into_iter()
            .filter(|sub| sub.instance().num_customers() > 0)
            .collect();
        debug!(
            "{} clusters requested, {} non-empty",
            partition.num_clusters(),
            subs.len()
        );

        let runs: Vec<SubRun> = if self.config.parallel_clusters() {
            subs.par_iter()
                .map(|sub| self.solve_sub_instance(sub))
                .collect::<Result<_>>()?
        } else {
            subs.iter()
                .map(|sub| self.solve_sub_instance(sub))
                .collect::<Result<_>>()?
        };
        Ok(assemble(
            StrategyKind::Clustered,
            instance,
            runs,
            started.elapsed(),
        ))
    }

    /// Solves one model restricted to the k-nearest-neighbor arcs.
    pub fn run_sparsified(&self, instance: &Instance) -> Result<StrategyResult> {
        let started = Instant::now();
        let edges = restrict(instance.distances(), self.config.neighbors())?;
        let model = self
            .limit_routes(ModelBuilder::for_instance(instance).with_allowed_edges(&edges))
            .build()?;
        let run = self.solve_model(&model);
        if run.summary.outcome == Outcome::Absent(AbsentReason::ProvenInfeasible) {
            warn!(
                "restriction to {} neighbors leaves no feasible solution",
                self.config.neighbors()
            );
        }
        Ok(assemble(
            StrategyKind::Sparsified,
            instance,
            vec![run],
            started.elapsed(),
        ))
    }

    /// Runs all three strategies, one after another, on the same instance.
    pub fn run_all(&self, instance: &Instance) -> Result<Comparison> {
        let exact = self.run_exact(instance)?;
        let clustered = self.run_clustered(instance)?;
        let sparsified = self.run_sparsified(instance)?;
        Ok(Comparison::new(exact, clustered, sparsified))
    }

    fn limit_routes<'a>(&self, builder: ModelBuilder<'a>) -> ModelBuilder<'a> {
        match self.config.max_routes() {
            Some(max_routes) => builder.with_max_routes(max_routes),
            None => builder,
        }
    }

    fn solve_sub_instance(&self, sub: &SubInstance) -> Result<SubRun> {
        let model = self.limit_routes(ModelBuilder::for_sub_instance(sub)).build()?;
        Ok(self.solve_model(&model))
    }

    fn solve_model(&self, model: &CvrpModel) -> SubRun {
        let members = model
            .nodes()
            .get(1..)
            .map(<[usize]>::to_vec)
            .unwrap_or_default();
        let started = Instant::now();
        let result = self.solver.solve(model, self.config.time_limit());
        let elapsed = started.elapsed();
        debug!("{} solver: {model} in {elapsed:?}", self.solver.name());

        let (outcome, objective, routes) = match result {
            Ok(out) => classify(model, out),
            Err(err) => {
                warn!(
                    "{} solver failed on {} customers: {err}",
                    self.solver.name(),
                    members.len()
                );
                (Outcome::Absent(AbsentReason::Failed(err)), None, None)
            }
        };
        SubRun {
            summary: SubSolve {
                members,
                outcome,
                objective,
                elapsed,
            },
            routes,
        }
    }
}

fn classify(
    model: &CvrpModel,
    out: SolveOutcome,
) -> (Outcome, Option<f64>, Option<Vec<Vec<usize>>>) {
    let outcome = Outcome::from_status(out.status);
    if !outcome.is_present() {
        return (outcome, None, None);
    }
    let Some(objective) = out.objective else {
        let err = CvrpError::SolverUnavailable("solver reported a solution without an objective".into());
        return (Outcome::Absent(AbsentReason::Failed(err)), None, None);
    };
    let routes = match out.assignment.as_ref().map(|a| model.extract_routes(a)) {
        Some(Ok(routes)) => Some(routes),
        Some(Err(err)) => {
            warn!("cannot read routes from solver assignment: {err}");
            None
        }
        None => None,
    };
    (outcome, Some(objective), routes)
}

fn assemble(
    strategy: StrategyKind,
    instance: &Instance,
    runs: Vec<SubRun>,
    elapsed: Duration,
) -> StrategyResult {
    let outcome = runs
        .iter()
        .map(|run| &run.summary.outcome)
        .max_by_key(|o| o.severity())
        .cloned()
        .unwrap_or(Outcome::Optimal);

    let (total_distance, solution) = if outcome.is_present() {
        let total: f64 = runs.iter().filter_map(|run| run.summary.objective).sum();
        let routes: Option<Vec<Vec<usize>>> = runs
            .iter()
            .map(|run| run.routes.clone())
            .collect::<Option<Vec<_>>>()
            .map(|per_model| per_model.into_iter().flatten().collect());
        let solution = routes.map(|routes| {
            let (solution, violations) = RouteEvaluator::new(instance).build_solution(&routes);
            if !violations.is_empty() {
                warn!("{strategy} routes violate {} constraints", violations.len());
            }
            solution
        });
        (Some(total), solution)
    } else {
        (None, None)
    };

    match total_distance {
        Some(total) => info!("{strategy}: {outcome}, distance {total:.2}, {elapsed:?}"),
        None => warn!("{strategy}: {outcome}, {elapsed:?}"),
    }

    StrategyResult {
        strategy,
        outcome,
        total_distance,
        elapsed,
        sub_results: runs.into_iter().map(|run| run.summary).collect(),
        solution,
    }
}

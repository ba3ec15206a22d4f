//! # u-cvrp
//!
//! Exact formulation and decomposition engine for the Capacitated Vehicle
//! Routing Problem. Builds load-tracking (MTZ) models over an instance and
//! compares three ways of making them tractable: the full model, one model
//! per customer cluster, and a model restricted to near-neighbor arcs.
//!
//! ## Modules
//!
//! - [`models`] — Domain model types (Customer, Instance, Route, Solution)
//! - [`distance`] — Euclidean distance matrix and nearest-neighbor queries
//! - [`formulation`] — Model builder, constraint set and assignment checking
//! - [`sparsify`] — k-nearest-neighbor edge restriction with depot repair
//! - [`cluster`] — Customer partitioning (k-means)
//! - [`solver`] — `ModelSolver` capability with exhaustive and MILP backends
//! - [`evaluation`] — Route feasibility checking and distance evaluation
//! - [`strategy`] — Exact, clustered and sparsified strategies, comparison report
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use u_cvrp::models::Instance;
//! use u_cvrp::solver::ExhaustiveSolver;
//! use u_cvrp::strategy::{Orchestrator, StrategyConfig};
//!
//! let instance = Instance::from_points(
//!     &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 1.0), (-1.0, 0.0)],
//!     &[0, 10, 10, 10, 10],
//!     100,
//! )
//! .unwrap();
//! let config = StrategyConfig::new().with_time_limit(Duration::from_secs(5));
//! let comparison = Orchestrator::new(ExhaustiveSolver::new(), config)
//!     .unwrap()
//!     .run_all(&instance)
//!     .unwrap();
//!
//! let exact = comparison.exact.total_distance.unwrap();
//! assert!(comparison.clustered.total_distance.unwrap() >= exact - 1e-9);
//! println!("{comparison}");
//! ```

pub mod cluster;
pub mod distance;
pub mod error;
pub mod evaluation;
pub mod formulation;
pub mod models;
pub mod solver;
pub mod sparsify;
pub mod strategy;

pub use error::{CvrpError, Result};

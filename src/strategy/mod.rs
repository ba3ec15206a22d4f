//! Solution strategies and their comparison.
//!
//! - [`Orchestrator::run_exact`] — one model over the whole instance
//! - [`Orchestrator::run_clustered`] — one model per customer cluster,
//!   optionally solved concurrently
//! - [`Orchestrator::run_sparsified`] — one model over near-neighbor arcs
//! - [`Orchestrator::run_all`] — all three, collected in a [`Comparison`]

mod config;
mod orchestrator;
mod report;

pub use config::StrategyConfig;
pub use orchestrator::{AbsentReason, Orchestrator, Outcome, StrategyKind, StrategyResult, SubSolve};
pub use report::{Comparison, ReportRow};

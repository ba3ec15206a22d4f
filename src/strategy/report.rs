//! Side-by-side comparison of strategy results.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{StrategyKind, StrategyResult};

/// One line of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub strategy: StrategyKind,
    pub status: String,
    /// Present only when the strategy produced a solution.
    pub total_distance: Option<f64>,
    pub elapsed_secs: f64,
    /// Number of models solved.
    pub models: usize,
}

/// Results of the exact, clustered and sparsified strategies on one
/// instance. Results are listed as-is, never reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Full model over the whole instance.
    pub exact: StrategyResult,
    /// One model per customer cluster.
    pub clustered: StrategyResult,
    /// Full instance restricted to near-neighbor arcs.
    pub sparsified: StrategyResult,
}

impl Comparison {
    pub fn new(exact: StrategyResult, clustered: StrategyResult, sparsified: StrategyResult) -> Self {
        Self {
            exact,
            clustered,
            sparsified,
        }
    }

    /// The three results in report order.
    pub fn results(&self) -> [&StrategyResult; 3] {
        [&self.exact, &self.clustered, &self.sparsified]
    }

    pub fn rows(&self) -> Vec<ReportRow> {
        self.results()
            .into_iter()
            .map(|result| ReportRow {
                strategy: result.strategy,
                status: result.outcome.to_string(),
                total_distance: result.total_distance,
                elapsed_secs: result.elapsed.as_secs_f64(),
                models: result.sub_results.len(),
            })
            .collect()
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} | {:<36} | {:>14} | {:>10}",
            "Method", "Status", "Total Distance", "Time (s)"
        )?;
        writeln!(f, "{:-<12}-|-{:-<36}-|-{:->14}-|-{:->10}", "", "", "", "")?;
        for row in self.rows() {
            let distance = row
                .total_distance
                .map_or_else(|| "-".to_string(), |d| format!("{d:.2}"));
            writeln!(
                f,
                "{:<12} | {:<36} | {:>14} | {:>10.3}",
                row.strategy.name(),
                row.status,
                distance,
                row.elapsed_secs
            )?;
        }
        Ok(())
    }
}

//! Strategy configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CvrpError, Result};

/// Parameters shared by the three solution strategies.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_cvrp::strategy::StrategyConfig;
///
/// let config = StrategyConfig::new()
///     .with_time_limit(Duration::from_secs(5))
///     .with_num_clusters(3)
///     .with_max_routes(4);
/// assert_eq!(config.num_clusters(), 3);
/// assert_eq!(config.neighbors(), 3);
/// assert_eq!(config.max_routes(), Some(4));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    time_limit: Duration,
    num_clusters: usize,
    neighbors: usize,
    max_routes: Option<usize>,
    seed: u64,
    parallel_clusters: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(30),
            num_clusters: 2,
            neighbors: 3,
            max_routes: None,
            seed: 0,
            parallel_clusters: true,
        }
    }
}

impl StrategyConfig {
    /// Defaults: 30 s per solve, 2 clusters, 3 neighbors, no route limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time budget for each individual solve.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Number of clusters for the decomposed strategy.
    pub fn with_num_clusters(mut self, num_clusters: usize) -> Self {
        self.num_clusters = num_clusters;
        self
    }

    /// Neighbors per node for the sparsified strategy.
    pub fn with_neighbors(mut self, neighbors: usize) -> Self {
        self.neighbors = neighbors;
        self
    }

    /// Route limit applied to every model built.
    pub fn with_max_routes(mut self, max_routes: usize) -> Self {
        self.max_routes = Some(max_routes);
        self
    }

    /// Seed for the default k-means partitioner.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Solve clusters concurrently or one after another.
    pub fn with_parallel_clusters(mut self, parallel: bool) -> Self {
        self.parallel_clusters = parallel;
        self
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    pub fn neighbors(&self) -> usize {
        self.neighbors
    }

    pub fn max_routes(&self) -> Option<usize> {
        self.max_routes
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn parallel_clusters(&self) -> bool {
        self.parallel_clusters
    }

    /// Rejects zero counts and a zero time budget.
    pub fn validate(&self) -> Result<()> {
        if self.time_limit.is_zero() {
            return Err(CvrpError::invalid("time limit must be positive"));
        }
        if self.num_clusters == 0 {
            return Err(CvrpError::invalid("cluster count must be positive"));
        }
        if self.neighbors == 0 {
            return Err(CvrpError::invalid("neighbor count must be positive"));
        }
        if self.max_routes == Some(0) {
            return Err(CvrpError::invalid("route limit must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StrategyConfig::default();
        assert_eq!(config.time_limit(), Duration::from_secs(30));
        assert_eq!(config.num_clusters(), 2);
        assert_eq!(config.neighbors(), 3);
        assert_eq!(config.max_routes(), None);
        assert_eq!(config.seed(), 0);
        assert!(config.parallel_clusters());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zeros() {
        assert!(StrategyConfig::new()
            .with_time_limit(Duration::ZERO)
            .validate()
            .is_err());
        assert!(StrategyConfig::new().with_num_clusters(0).validate().is_err());
        assert!(StrategyConfig::new().with_neighbors(0).validate().is_err());
        assert!(StrategyConfig::new().with_max_routes(0).validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StrategyConfig =
            serde_json::from_str(r#"{"num_clusters": 4, "parallel_clusters": false}"#)
                .expect("parse");
        assert_eq!(config.num_clusters(), 4);
        assert!(!config.parallel_clusters());
        assert_eq!(config.neighbors(), 3);
        assert_eq!(config.time_limit(), Duration::from_secs(30));
    }
}

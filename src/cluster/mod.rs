//! Customer partitioning for the decomposed strategy.
//!
//! The depot never takes part in partitioning; it joins every cluster's
//! sub-instance when the sub-instances are built.

mod kmeans;

pub use kmeans::KMeans;

use log::warn;

use crate::error::{CvrpError, Result};
use crate::models::{Instance, SubInstance};

/// Splits planar points into clusters.
///
/// Returns one cluster ID in `0..num_clusters` per input point, in input
/// order. IDs carry no ordering meaning and clusters may be empty.
pub trait Partitioner: Send + Sync {
    /// Labels each point with a cluster ID.
    fn partition(&self, points: &[(f64, f64)], num_clusters: usize) -> Result<Vec<usize>>;
}

/// Assignment of every customer of an instance to exactly one cluster.
///
/// # Examples
///
/// ```
/// use u_cvrp::cluster::Partition;
///
/// // customers 1..=4
/// let partition = Partition::from_labels(vec![0, 1, 0, 1], 2).unwrap();
/// assert_eq!(partition.members(0), vec![1, 3]);
/// assert_eq!(partition.cluster_of(4), Some(1));
/// assert_eq!(partition.cluster_of(0), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    labels: Vec<usize>,
    num_clusters: usize,
}

impl Partition {
    /// Partitions the customers of `instance` into at most `num_clusters`
    /// clusters.
    ///
    /// A cluster count above the number of customers is lowered to it.
    pub fn compute(
        instance: &Instance,
        partitioner: &dyn Partitioner,
        num_clusters: usize,
    ) -> Result<Self> {
        if num_clusters == 0 {
            return Err(CvrpError::invalid("cluster count must be positive"));
        }
        let num_customers = instance.num_customers();
        if num_customers == 0 {
            return Ok(Self {
                labels: Vec::new(),
                num_clusters: 0,
            });
        }
        let effective = num_clusters.min(num_customers);
        if effective < num_clusters {
            warn!("{num_clusters} clusters requested for {num_customers} customers; using {effective}");
        }

        let labels = partitioner.partition(&instance.customer_coords(), effective)?;
        if labels.len() != num_customers {
            return Err(CvrpError::invalid(format!(
                "partitioner labelled {} of {num_customers} customers",
                labels.len()
            )));
        }
        Self::from_labels(labels, effective)
    }

    /// Wraps precomputed labels; `labels[i]` is the cluster of node `i + 1`.
    pub fn from_labels(labels: Vec<usize>, num_clusters: usize) -> Result<Self> {
        if let Some(&bad) = labels.iter().find(|&&l| l >= num_clusters) {
            return Err(CvrpError::invalid(format!(
                "cluster label {bad} out of range 0..{num_clusters}"
            )));
        }
        Ok(Self {
            labels,
            num_clusters,
        })
    }

    /// Number of clusters, empty ones included.
    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// Cluster of a node; `None` for the depot or an unknown node.
    pub fn cluster_of(&self, node: usize) -> Option<usize> {
        node.checked_sub(1)
            .and_then(|idx| self.labels.get(idx))
            .copied()
    }

    /// Customers (original node indices) in a cluster, ascending.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == cluster)
            .map(|(idx, _)| idx + 1)
            .collect()
    }

    /// Depot-plus-members sub-instance of every cluster, in cluster order.
    pub fn sub_instances(&self, instance: &Instance) -> Result<Vec<SubInstance>> {
        (0..self.num_clusters)
            .map(|cluster| instance.sub_instance(&self.members(cluster)))
            .collect()
    }
}

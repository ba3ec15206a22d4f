//! CVRP instance and sub-instance types.

use std::collections::HashSet;

use crate::distance::DistanceMatrix;
use crate::error::{CvrpError, Result};

use super::Customer;

/// A validated CVRP instance: depot plus customers, a vehicle capacity, and
/// the Euclidean distance matrix derived from the node locations.
///
/// The instance is read-only once built. Demands above capacity are not
/// rejected here; the model builder reports them as infeasibility.
///
/// # Examples
///
/// ```
/// use u_cvrp::models::Instance;
///
/// let instance = Instance::from_points(
///     &[(0.0, 0.0), (3.0, 4.0), (6.0, 8.0)],
///     &[0, 10, 20],
///     100,
/// )
/// .unwrap();
/// assert_eq!(instance.num_customers(), 2);
/// assert!((instance.distances().get(0, 1) - 5.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct Instance {
    customers: Vec<Customer>,
    capacity: i32,
    distances: DistanceMatrix,
}

impl Instance {
    /// Validates the nodes and derives the distance matrix.
    ///
    /// Node `i` must carry ID `i`, node 0 is the depot with zero demand,
    /// demands must be non-negative and coordinates finite.
    pub fn new(customers: Vec<Customer>, capacity: i32) -> Result<Self> {
        if customers.is_empty() {
            return Err(CvrpError::invalid("instance needs at least a depot"));
        }
        if capacity <= 0 {
            return Err(CvrpError::invalid(format!(
                "capacity must be positive, got {capacity}"
            )));
        }
        for (idx, c) in customers.iter().enumerate() {
            if c.id() != idx {
                return Err(CvrpError::invalid(format!(
                    "node at position {idx} has id {}",
                    c.id()
                )));
            }
            if !c.x().is_finite() || !c.y().is_finite() {
                return Err(CvrpError::invalid(format!(
                    "node {idx} has a non-finite coordinate"
                )));
            }
            if c.demand() < 0 {
                return Err(CvrpError::invalid(format!(
                    "node {idx} has negative demand {}",
                    c.demand()
                )));
            }
        }
        if customers[0].demand() != 0 {
            return Err(CvrpError::invalid("depot demand must be zero"));
        }

        let distances = DistanceMatrix::from_customers(&customers);
        Ok(Self {
            customers,
            capacity,
            distances,
        })
    }

    /// Builds an instance from parallel coordinate and demand slices.
    ///
    /// Index 0 is the depot.
    pub fn from_points(points: &[(f64, f64)], demands: &[i32], capacity: i32) -> Result<Self> {
        if points.len() != demands.len() {
            return Err(CvrpError::invalid(format!(
                "{} points but {} demands",
                points.len(),
                demands.len()
            )));
        }
        let customers = points
            .iter()
            .zip(demands)
            .enumerate()
            .map(|(id, (&(x, y), &demand))| Customer::new(id, x, y, demand))
            .collect();
        Self::new(customers, capacity)
    }

    /// All nodes (index 0 = depot).
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// The depot node.
    pub fn depot(&self) -> &Customer {
        &self.customers[0]
    }

    /// Vehicle capacity.
    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    /// Distance matrix derived from the node locations.
    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Number of nodes including the depot.
    pub fn num_nodes(&self) -> usize {
        self.customers.len()
    }

    /// Number of customers (excluding depot).
    pub fn num_customers(&self) -> usize {
        self.customers.len() - 1
    }

    /// Demand vector indexed by node.
    pub fn demands(&self) -> Vec<i32> {
        self.customers.iter().map(Customer::demand).collect()
    }

    /// Sum of all customer demands.
    pub fn total_demand(&self) -> i64 {
        self.customers.iter().map(|c| i64::from(c.demand())).sum()
    }

    /// Customer locations without the depot, in node order (node `i + 1`).
    pub fn customer_coords(&self) -> Vec<(f64, f64)> {
        self.customers[1..].iter().map(Customer::coords).collect()
    }

    /// Builds the sub-instance made of the depot and the given customers.
    ///
    /// Members keep their demands; distances are recomputed on the
    /// sub-instance. Local node `k + 1` is `members[k]`.
    pub fn sub_instance(&self, members: &[usize]) -> Result<SubInstance> {
        let mut seen = HashSet::with_capacity(members.len());
        let mut customers = Vec::with_capacity(members.len() + 1);
        let mut original_ids = Vec::with_capacity(members.len() + 1);

        customers.push(self.depot().clone());
        original_ids.push(0);

        for &node in members {
            if node == 0 || node >= self.customers.len() {
                return Err(CvrpError::invalid(format!(
                    "sub-instance member {node} is not a customer"
                )));
            }
            if !seen.insert(node) {
                return Err(CvrpError::invalid(format!(
                    "sub-instance member {node} listed twice"
                )));
            }
            customers.push(self.customers[node].renumbered(customers.len()));
            original_ids.push(node);
        }

        Ok(SubInstance {
            instance: Self::new(customers, self.capacity)?,
            original_ids,
        })
    }
}

/// An instance carved out of a larger one, remembering the original IDs.
#[derive(Debug, Clone)]
pub struct SubInstance {
    instance: Instance,
    original_ids: Vec<usize>,
}

impl SubInstance {
    /// The renumbered instance (depot at 0).
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Original node index of each local node.
    pub fn original_ids(&self) -> &[usize] {
        &self.original_ids
    }

    /// Original node index of the given local node.
    pub fn original_id(&self, local: usize) -> usize {
        self.original_ids[local]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Instance {
        Instance::from_points(
            &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 1.0)],
            &[0, 10, 20, 30],
            100,
        )
        .expect("valid")
    }

    #[test]
    fn test_from_points() {
        let inst = sample();
        assert_eq!(inst.num_nodes(), 4);
        assert_eq!(inst.num_customers(), 3);
        assert_eq!(inst.capacity(), 100);
        assert_eq!(inst.demands(), vec![0, 10, 20, 30]);
        assert_eq!(inst.total_demand(), 60);
        assert!(inst.distances().is_symmetric(1e-12));
    }

    #[test]
    fn test_rejects_non_positive_capacity() {
        let err = Instance::from_points(&[(0.0, 0.0)], &[0], 0).expect_err("zero capacity");
        assert!(matches!(err, CvrpError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_negative_demand() {
        let err = Instance::from_points(&[(0.0, 0.0), (1.0, 1.0)], &[0, -1], 10)
            .expect_err("negative demand");
        assert!(matches!(err, CvrpError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = Instance::from_points(&[(0.0, 0.0), (1.0, 1.0)], &[0], 10)
            .expect_err("mismatch");
        assert!(matches!(err, CvrpError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_depot_demand() {
        let err = Instance::from_points(&[(0.0, 0.0)], &[5], 10).expect_err("depot demand");
        assert!(matches!(err, CvrpError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_misnumbered_nodes() {
        let customers = vec![Customer::depot(0.0, 0.0), Customer::new(5, 1.0, 1.0, 1)];
        assert!(Instance::new(customers, 10).is_err());
    }

    #[test]
    fn test_rejects_nan_coordinate() {
        let err = Instance::from_points(&[(0.0, 0.0), (f64::NAN, 1.0)], &[0, 1], 10)
            .expect_err("nan");
        assert!(matches!(err, CvrpError::InvalidInput(_)));
    }

    #[test]
    fn test_oversized_demand_is_accepted_here() {
        let inst = Instance::from_points(&[(0.0, 0.0), (1.0, 1.0)], &[0, 150], 100);
        assert!(inst.is_ok());
    }

    #[test]
    fn test_sub_instance() {
        let inst = sample();
        let sub = inst.sub_instance(&[3, 1]).expect("valid members");
        assert_eq!(sub.original_ids(), &[0, 3, 1]);
        assert_eq!(sub.original_id(1), 3);

        let local = sub.instance();
        assert_eq!(local.num_nodes(), 3);
        assert_eq!(local.demands(), vec![0, 30, 10]);
        // (0,1) to (1,0)
        assert!((local.distances().get(1, 2) - 2f64.sqrt()).abs() < 1e-10);
        assert!((local.distances().get(0, 1) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_sub_instance_depot_only() {
        let sub = sample().sub_instance(&[]).expect("empty cluster");
        assert_eq!(sub.instance().num_customers(), 0);
    }

    #[test]
    fn test_sub_instance_rejects_depot_and_duplicates() {
        let inst = sample();
        assert!(inst.sub_instance(&[0]).is_err());
        assert!(inst.sub_instance(&[1, 1]).is_err());
        assert!(inst.sub_instance(&[9]).is_err());
    }
}

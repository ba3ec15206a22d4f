//! k-nearest-neighbor edge restriction.

use std::collections::{BTreeSet, VecDeque};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::distance::DistanceMatrix;
use crate::error::{CvrpError, Result};

/// A set of allowed directed arcs, keyed by original node index.
///
/// Ordered storage keeps iteration (and serialization) deterministic.
///
/// # Examples
///
/// ```
/// use u_cvrp::sparsify::AllowedEdges;
///
/// let mut edges = AllowedEdges::new();
/// edges.insert_both(0, 3);
/// assert!(edges.contains(3, 0));
/// assert_eq!(edges.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedEdges {
    edges: BTreeSet<(usize, usize)>,
}

impl AllowedEdges {
    /// Creates an empty edge set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows the arc `from -> to`. Self-loops are ignored.
    pub fn insert(&mut self, from: usize, to: usize) {
        if from != to {
            self.edges.insert((from, to));
        }
    }

    /// Allows both `a -> b` and `b -> a`.
    pub fn insert_both(&mut self, a: usize, b: usize) {
        self.insert(a, b);
        self.insert(b, a);
    }

    /// Returns `true` if the arc `from -> to` is allowed.
    pub fn contains(&self, from: usize, to: usize) -> bool {
        self.edges.contains(&(from, to))
    }

    /// Number of allowed arcs.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if no arc is allowed.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Allowed arcs in ascending `(from, to)` order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.iter().copied()
    }

    /// Allowed heads of arcs leaving `from`.
    pub fn successors(&self, from: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .range((from, 0)..=(from, usize::MAX))
            .map(|&(_, to)| to)
    }
}

/// Restricts arcs to each node's `k` nearest neighbors, in both directions.
///
/// Node 0 of `distances` is the depot. If the symmetric k-NN graph leaves a
/// group of nodes disconnected from the depot, the member of that group
/// closest to the depot is linked to it both ways, so every node keeps a
/// path to and from the depot. A model built on the result can still be
/// infeasible when `k` is too small for the capacity structure; that is a
/// parameter choice, not a fault.
///
/// Deterministic: neighbor ties are broken by index.
///
/// # Examples
///
/// ```
/// use u_cvrp::distance::DistanceMatrix;
/// use u_cvrp::sparsify::restrict;
///
/// let dm = DistanceMatrix::from_points(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
/// let edges = restrict(&dm, 1).unwrap();
/// assert!(edges.contains(1, 2));
/// assert!(edges.contains(2, 1));
/// assert!(!edges.contains(0, 3));
/// ```
pub fn restrict(distances: &DistanceMatrix, k: usize) -> Result<AllowedEdges> {
    if k == 0 {
        return Err(CvrpError::invalid("neighbor count must be positive"));
    }
    let n = distances.size();
    let mut edges = AllowedEdges::new();
    for i in 0..n {
        for j in distances.k_nearest(i, k) {
            edges.insert_both(i, j);
        }
    }

    let linked = link_depot(distances, &mut edges);
    debug!(
        "k-NN restriction (k={k}): {} of {} arcs kept, {linked} components linked to depot",
        edges.len(),
        n * n.saturating_sub(1)
    );
    Ok(edges)
}

/// Connects every component that misses the depot; returns how many.
fn link_depot(distances: &DistanceMatrix, edges: &mut AllowedEdges) -> usize {
    let n = distances.size();
    if n == 0 {
        return 0;
    }
    let mut reached = vec![false; n];
    let mut linked = 0;

    flood(edges, 0, &mut reached);
    for start in 1..n {
        if reached[start] {
            continue;
        }
        let component = flood(edges, start, &mut reached);
        if let Some(gate) = distances.nearest_neighbor(0, &component) {
            edges.insert_both(0, gate);
            linked += 1;
        }
    }
    linked
}

/// Marks and returns every node reachable from `start`.
fn flood(edges: &AllowedEdges, start: usize, reached: &mut [bool]) -> Vec<usize> {
    let mut members = vec![start];
    let mut queue = VecDeque::from([start]);
    reached[start] = true;
    while let Some(node) = queue.pop_front() {
        for next in edges.successors(node) {
            if next < reached.len() && !reached[next] {
                reached[next] = true;
                members.push(next);
                queue.push_back(next);
            }
        }
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(n: usize) -> DistanceMatrix {
        let points: Vec<(f64, f64)> = (0..n).map(|i| (i as f64, 0.0)).collect();
        DistanceMatrix::from_points(&points)
    }

    #[test]
    fn test_zero_k_rejected() {
        assert!(matches!(
            restrict(&line(3), 0),
            Err(CvrpError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_both_directions() {
        let edges = restrict(&line(5), 1).expect("edges");
        for (a, b) in edges.iter() {
            assert!(edges.contains(b, a), "missing reverse of {a}->{b}");
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_large_k_keeps_everything() {
        let edges = restrict(&line(4), 10).expect("edges");
        assert_eq!(edges.len(), 12);
    }

    #[test]
    fn test_links_far_cluster_to_depot() {
        // Two tight pairs far apart; with k=1 the far pair is its own component.
        let dm = DistanceMatrix::from_points(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (100.0, 0.0),
            (101.0, 0.0),
        ]);
        let edges = restrict(&dm, 1).expect("edges");
        assert!(edges.contains(0, 2));
        assert!(edges.contains(2, 0));
        assert!(!edges.contains(0, 3));

        let mut reached = vec![false; 4];
        let component = flood(&edges, 0, &mut reached);
        assert_eq!(component.len(), 4);
    }

    #[test]
    fn test_successors() {
        let mut edges = AllowedEdges::new();
        edges.insert(2, 5);
        edges.insert(2, 1);
        edges.insert(3, 2);
        edges.insert(4, 4);
        assert_eq!(edges.successors(2).collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(edges.successors(4).count(), 0);
        assert_eq!(edges.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_restriction_is_deterministic(
            points in prop::collection::vec((0.0f64..100.0, 0.0f64..100.0), 2..12),
            k in 1usize..5,
        ) {
            let dm = DistanceMatrix::from_points(&points);
            let first = restrict(&dm, k).expect("edges");
            let second = restrict(&dm, k).expect("edges");
            prop_assert_eq!(
                serde_json::to_string(&first).expect("serialize"),
                serde_json::to_string(&second).expect("serialize")
            );
        }

        #[test]
        fn prop_every_node_reaches_depot(
            points in prop::collection::vec((0.0f64..100.0, 0.0f64..100.0), 2..12),
            k in 1usize..4,
        ) {
            let dm = DistanceMatrix::from_points(&points);
            let edges = restrict(&dm, k).expect("edges");
            let mut reached = vec![false; points.len()];
            let component = flood(&edges, 0, &mut reached);
            prop_assert_eq!(component.len(), points.len());
            for node in 0..points.len() {
                prop_assert!(edges.successors(node).count() >= 1);
            }
        }
    }
}

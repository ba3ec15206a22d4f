//! Dense distance matrix.

use std::cmp::Ordering;

use crate::models::Customer;

/// A dense n×n distance matrix stored in row-major order.
///
/// Built from coordinates (Euclidean) or from an explicit grid. There is no
/// public mutation: a matrix always reflects the data it was derived from.
///
/// # Examples
///
/// ```
/// use u_cvrp::models::Customer;
/// use u_cvrp::distance::DistanceMatrix;
///
/// let customers = vec![
///     Customer::depot(0.0, 0.0),
///     Customer::new(1, 3.0, 4.0, 10),
///     Customer::new(2, 6.0, 8.0, 20),
/// ];
/// let dm = DistanceMatrix::from_customers(&customers);
/// assert!((dm.get(0, 1) - 5.0).abs() < 1e-10);
/// assert_eq!(dm.size(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DistanceMatrix {
    fn zeros(size: usize) -> Self {
        Self {
            data: vec![0.0; size * size],
            size,
        }
    }

    fn set(&mut self, from: usize, to: usize, distance: f64) {
        self.data[from * self.size + to] = distance;
    }

    /// Computes a Euclidean distance matrix from customer coordinates.
    pub fn from_customers(customers: &[Customer]) -> Self {
        let n = customers.len();
        let mut dm = Self::zeros(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = customers[i].distance_to(&customers[j]);
                dm.set(i, j, d);
                dm.set(j, i, d);
            }
        }
        dm
    }

    /// Computes a Euclidean distance matrix from `(x, y)` points.
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        let n = points.len();
        let mut dm = Self::zeros(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let (dx, dy) = (points[i].0 - points[j].0, points[i].1 - points[j].1);
                let d = (dx * dx + dy * dy).sqrt();
                dm.set(i, j, d);
                dm.set(j, i, d);
            }
        }
        dm
    }

    /// Creates a distance matrix from an explicit n×n grid.
    ///
    /// Returns `None` if the data length doesn't match `size * size` or any
    /// entry is negative or non-finite.
    pub fn from_data(size: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != size * size || data.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return None;
        }
        Some(Self { data, size })
    }

    /// Returns the distance from location `from` to location `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    /// Number of locations in this matrix.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns `true` if the matrix is symmetric within the given tolerance.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                if (self.get(i, j) - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Restricts the matrix to the given locations, in the given order.
    ///
    /// Returns `None` if any index is out of bounds.
    pub fn submatrix(&self, indices: &[usize]) -> Option<Self> {
        if indices.iter().any(|&i| i >= self.size) {
            return None;
        }
        let n = indices.len();
        let mut dm = Self::zeros(n);
        for (a, &i) in indices.iter().enumerate() {
            for (b, &j) in indices.iter().enumerate() {
                dm.set(a, b, self.get(i, j));
            }
        }
        Some(dm)
    }

    /// Returns the nearest neighbor of `from` among the given candidates.
    ///
    /// Ties go to the lower index. Returns `None` if `candidates` is empty.
    pub fn nearest_neighbor(&self, from: usize, candidates: &[usize]) -> Option<usize> {
        candidates
            .iter()
            .copied()
            .min_by(|&a, &b| self.compare_from(from, a, b))
    }

    /// The `k` locations closest to `from`, excluding `from` itself.
    ///
    /// Ordered by distance, ties broken by index, so the result is
    /// deterministic. Returns fewer than `k` entries on small matrices.
    pub fn k_nearest(&self, from: usize, k: usize) -> Vec<usize> {
        let mut others: Vec<usize> = (0..self.size).filter(|&j| j != from).collect();
        others.sort_by(|&a, &b| self.compare_from(from, a, b));
        others.truncate(k);
        others
    }

    fn compare_from(&self, from: usize, a: usize, b: usize) -> Ordering {
        self.get(from, a)
            .total_cmp(&self.get(from, b))
            .then(a.cmp(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_customers() -> Vec<Customer> {
        vec![
            Customer::depot(0.0, 0.0),
            Customer::new(1, 3.0, 4.0, 10),
            Customer::new(2, 0.0, 8.0, 20),
        ]
    }

    #[test]
    fn test_from_customers() {
        let dm = DistanceMatrix::from_customers(&sample_customers());
        assert_eq!(dm.size(), 3);
        assert!((dm.get(0, 1) - 5.0).abs() < 1e-10);
        assert!((dm.get(0, 2) - 8.0).abs() < 1e-10);
        assert!((dm.get(0, 0)).abs() < 1e-10);
    }

    #[test]
    fn test_from_points_matches_customers() {
        let points: Vec<(f64, f64)> = sample_customers().iter().map(|c| c.coords()).collect();
        assert_eq!(
            DistanceMatrix::from_points(&points),
            DistanceMatrix::from_customers(&sample_customers())
        );
    }

    #[test]
    fn test_symmetric() {
        let dm = DistanceMatrix::from_customers(&sample_customers());
        assert!(dm.is_symmetric(1e-10));
    }

    #[test]
    fn test_from_data() {
        let dm = DistanceMatrix::from_data(2, vec![0.0, 5.0, 5.0, 0.0]).expect("valid");
        assert_eq!(dm.get(0, 1), 5.0);
        assert_eq!(dm.get(1, 0), 5.0);
    }

    #[test]
    fn test_from_data_invalid() {
        assert!(DistanceMatrix::from_data(2, vec![0.0, 1.0, 2.0]).is_none());
        assert!(DistanceMatrix::from_data(2, vec![0.0, -1.0, 1.0, 0.0]).is_none());
        assert!(DistanceMatrix::from_data(1, vec![f64::NAN]).is_none());
    }

    #[test]
    fn test_asymmetric_matrix() {
        let dm = DistanceMatrix::from_data(2, vec![0.0, 10.0, 15.0, 0.0]).expect("valid");
        assert!(!dm.is_symmetric(1e-10));
    }

    #[test]
    fn test_submatrix() {
        let dm = DistanceMatrix::from_customers(&sample_customers());
        let sub = dm.submatrix(&[2, 0]).expect("in bounds");
        assert_eq!(sub.size(), 2);
        assert!((sub.get(0, 1) - 8.0).abs() < 1e-10);
        assert!(dm.submatrix(&[3]).is_none());
    }

    #[test]
    fn test_nearest_neighbor() {
        let dm = DistanceMatrix::from_customers(&sample_customers());
        // From depot (0,0): customer 1 at (3,4) is dist 5, customer 2 at (0,8) is dist 8
        assert_eq!(dm.nearest_neighbor(0, &[1, 2]), Some(1));
        assert_eq!(dm.nearest_neighbor(0, &[2]), Some(2));
        assert_eq!(dm.nearest_neighbor(0, &[]), None);
    }

    #[test]
    fn test_k_nearest_breaks_ties_by_index() {
        // 1 and 2 are both at distance 1 from the depot
        let dm = DistanceMatrix::from_points(&[(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (5.0, 5.0)]);
        assert_eq!(dm.k_nearest(0, 2), vec![1, 2]);
        assert_eq!(dm.k_nearest(0, 10), vec![1, 2, 3]);
        assert!(dm.k_nearest(0, 0).is_empty());
    }
}

//! Planar k-means with k-means++ seeding.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{CvrpError, Result};

use super::Partitioner;

/// Lloyd's k-means over 2-D points with squared Euclidean distance.
///
/// Seeding is k-means++ from a fixed seed, so repeated calls on the same
/// input produce identical labels. A cluster that loses all its points keeps
/// its previous centroid and may end up empty.
///
/// # Examples
///
/// ```
/// use u_cvrp::cluster::{KMeans, Partitioner};
///
/// let points = [(0.0, 0.0), (0.5, 0.0), (10.0, 10.0), (10.5, 10.0)];
/// let labels = KMeans::new().partition(&points, 2).unwrap();
/// assert_eq!(labels[0], labels[1]);
/// assert_eq!(labels[2], labels[3]);
/// assert_ne!(labels[0], labels[2]);
/// ```
#[derive(Debug, Clone)]
pub struct KMeans {
    max_iterations: usize,
    tolerance: f64,
    seed: u64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-9,
            seed: 0,
        }
    }
}

impl KMeans {
    /// k-means with 100 iterations and seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the seed for k-means++ initialization.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the iteration cap for Lloyd refinement.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Runs k-means and returns `(centroids, labels)`.
    pub fn fit(&self, points: &[(f64, f64)], k: usize) -> Result<(Vec<(f64, f64)>, Vec<usize>)> {
        if k == 0 {
            return Err(CvrpError::invalid("cluster count must be positive"));
        }
        if k > points.len() {
            return Err(CvrpError::invalid(format!(
                "cannot form {k} clusters from {} points",
                points.len()
            )));
        }

        let mut centroids = self.kmeans_plus_plus(points, k);
        let mut labels = assign(points, &centroids);

        for _ in 0..self.max_iterations {
            let updated = update_centroids(points, &labels, &centroids);
            let shift = centroids
                .iter()
                .zip(&updated)
                .map(|(&a, &b)| sq_dist(a, b))
                .fold(0.0, f64::max);
            centroids = updated;

            let relabeled = assign(points, &centroids);
            let stable = relabeled == labels;
            labels = relabeled;
            if stable || shift <= self.tolerance {
                break;
            }
        }

        Ok((centroids, labels))
    }

    fn kmeans_plus_plus(&self, points: &[(f64, f64)], k: usize) -> Vec<(f64, f64)> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = Vec::with_capacity(k);
        centroids.push(points[rng.random_range(0..points.len())]);

        while centroids.len() < k {
            // Sample proportional to squared distance to the nearest centroid
            let weights: Vec<f64> = points
                .iter()
                .map(|&p| {
                    centroids
                        .iter()
                        .map(|&c| sq_dist(p, c))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();
            let total: f64 = weights.iter().sum();

            let next = if total > 0.0 {
                let threshold = rng.random::<f64>() * total;
                let mut cumulative = 0.0;
                weights
                    .iter()
                    .position(|&w| {
                        cumulative += w;
                        w > 0.0 && cumulative >= threshold
                    })
                    .or_else(|| weights.iter().rposition(|&w| w > 0.0))
                    .unwrap_or(0)
            } else {
                // Every point coincides with a centroid
                rng.random_range(0..points.len())
            };
            centroids.push(points[next]);
        }
        centroids
    }
}

impl Partitioner for KMeans {
    fn partition(&self, points: &[(f64, f64)], num_clusters: usize) -> Result<Vec<usize>> {
        self.fit(points, num_clusters).map(|(_, labels)| labels)
    }
}

fn sq_dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

/// Nearest centroid per point, ties to the lower cluster index.
fn assign(points: &[(f64, f64)], centroids: &[(f64, f64)]) -> Vec<usize> {
    points
        .iter()
        .map(|&p| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (idx, &c) in centroids.iter().enumerate() {
                let d = sq_dist(p, c);
                if d < best_dist {
                    best = idx;
                    best_dist = d;
                }
            }
            best
        })
        .collect()
}

fn update_centroids(
    points: &[(f64, f64)],
    labels: &[usize],
    previous: &[(f64, f64)],
) -> Vec<(f64, f64)> {
    let mut sums = vec![(0.0, 0.0); previous.len()];
    let mut counts = vec![0usize; previous.len()];
    for (&(x, y), &label) in points.iter().zip(labels) {
        sums[label].0 += x;
        sums[label].1 += y;
        counts[label] += 1;
    }
    sums.iter()
        .zip(&counts)
        .zip(previous)
        .map(|((&(sx, sy), &count), &old)| {
            if count > 0 {
                (sx / count as f64, sy / count as f64)
            } else {
                old
            }
        })
        .collect()
}

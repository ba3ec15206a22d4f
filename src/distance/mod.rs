//! Distance matrices.
//!
//! Provides the dense Euclidean distance matrix and the nearest-neighbor
//! queries the edge sparsifier relies on.

mod matrix;

pub use matrix::DistanceMatrix;

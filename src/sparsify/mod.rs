//! Edge sparsification.
//!
//! Shrinks a model by keeping only arcs between near neighbors. Excluded
//! arcs get no variable in the [`formulation`](crate::formulation).

mod neighbors;

pub use neighbors::{restrict, AllowedEdges};

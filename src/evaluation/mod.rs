//! Route feasibility checking and distance evaluation.

mod evaluator;

pub use evaluator::RouteEvaluator;

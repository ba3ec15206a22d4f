//! Route evaluator that computes load, distance, and feasibility.

use crate::models::{Instance, Route, Solution, Violation, ViolationType, Visit};

/// Evaluates routes against an instance: cumulative load, depot-to-depot
/// distance, capacity, and customer coverage.
///
/// # Examples
///
/// ```
/// use u_cvrp::models::Instance;
/// use u_cvrp::evaluation::RouteEvaluator;
///
/// let instance = Instance::from_points(
///     &[(0.0, 0.0), (3.0, 4.0), (6.0, 8.0)],
///     &[0, 10, 20],
///     100,
/// )
/// .unwrap();
///
/// let evaluator = RouteEvaluator::new(&instance);
/// let (route, violations) = evaluator.build_route(&[1, 2]);
/// assert_eq!(route.len(), 2);
/// assert_eq!(route.total_load(), 30);
/// assert!(violations.is_empty());
/// ```
pub struct RouteEvaluator<'a> {
    instance: &'a Instance,
}

impl<'a> RouteEvaluator<'a> {
    /// Creates a new evaluator for the given instance.
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Builds a route from a sequence of customer IDs, computing load and
    /// distance.
    ///
    /// IDs that are not customers of the instance are reported and skipped.
    pub fn build_route(&self, customer_ids: &[usize]) -> (Route, Vec<Violation>) {
        let customers = self.instance.customers();
        let distances = self.instance.distances();
        let capacity = self.instance.capacity();

        let mut route = Route::new();
        let mut violations = Vec::new();
        let mut current_load: i32 = 0;
        let mut total_distance = 0.0;
        let mut prev = 0;

        for &cid in customer_ids {
            if cid == 0 || cid >= customers.len() {
                violations.push(Violation::new(ViolationType::UnknownCustomer {
                    route_index: 0,
                    customer_id: cid,
                }));
                continue;
            }
            total_distance += distances.get(prev, cid);
            current_load = current_load.saturating_add(customers[cid].demand());
            route.push_visit(Visit {
                customer_id: cid,
                load_after: current_load,
            });
            prev = cid;
        }

        // Return to depot
        total_distance += distances.get(prev, 0);
        route.set_total_distance(total_distance);

        if current_load > capacity {
            violations.push(Violation::new(ViolationType::CapacityExceeded {
                route_index: 0,
                load: current_load,
                capacity,
            }));
        }

        (route, violations)
    }

    /// Builds a solution from depot-rooted customer sequences.
    ///
    /// Empty sequences produce no route.
    pub fn build_solution(&self, sequences: &[Vec<usize>]) -> (Solution, Vec<Violation>) {
        let mut solution = Solution::new();
        let mut all_violations = Vec::new();
        for sequence in sequences.iter().filter(|s| !s.is_empty()) {
            let (route, mut violations) = self.build_route(sequence);
            set_route_index(&mut violations, solution.num_routes());
            solution.add_route(route);
            all_violations.append(&mut violations);
        }
        (solution, all_violations)
    }

    /// Evaluates an entire solution, returning its total distance and all
    /// violations.
    ///
    /// Besides per-route capacity, every customer of the instance must be
    /// served exactly once.
    pub fn evaluate_solution(&self, solution: &Solution) -> (f64, Vec<Violation>) {
        let mut total_distance = 0.0;
        let mut all_violations = Vec::new();
        let mut visits = vec![0usize; self.instance.num_nodes()];

        for (idx, route) in solution.routes().iter().enumerate() {
            let customer_ids = route.customer_ids();
            let (rebuilt, mut violations) = self.build_route(&customer_ids);
            set_route_index(&mut violations, idx);

            for cid in customer_ids {
                if let Some(count) = visits.get_mut(cid) {
                    *count += 1;
                }
            }
            total_distance += rebuilt.total_distance();
            all_violations.append(&mut violations);
        }

        for (customer_id, &count) in visits.iter().enumerate().skip(1) {
            match count {
                0 => all_violations.push(Violation::new(ViolationType::CustomerMissing {
                    customer_id,
                })),
                1 => {}
                n => all_violations.push(Violation::new(ViolationType::CustomerRepeated {
                    customer_id,
                    visits: n,
                })),
            }
        }

        (total_distance, all_violations)
    }
}

fn set_route_index(violations: &mut [Violation], idx: usize) {
    for v in violations {
        match &mut v.kind {
            ViolationType::CapacityExceeded { route_index, .. }
            | ViolationType::UnknownCustomer { route_index, .. } => {
                *route_index = idx;
            }
            ViolationType::CustomerMissing { .. } | ViolationType::CustomerRepeated { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(capacity: i32) -> Instance {
        Instance::from_points(
            &[(0.0, 0.0), (3.0, 4.0), (6.0, 8.0), (0.0, 10.0)],
            &[0, 10, 20, 15],
            capacity,
        )
        .expect("valid")
    }

    #[test]
    fn test_build_route_empty() {
        let inst = setup(50);
        let eval = RouteEvaluator::new(&inst);
        let (route, violations) = eval.build_route(&[]);
        assert!(route.is_empty());
        assert!(violations.is_empty());
        assert_eq!(route.total_distance(), 0.0);
    }

    #[test]
    fn test_build_route_single() {
        let inst = setup(50);
        let eval = RouteEvaluator::new(&inst);
        let (route, violations) = eval.build_route(&[1]);
        assert_eq!(route.len(), 1);
        assert!(violations.is_empty());
        // depot->1 = 5.0, 1->depot = 5.0
        assert!((route.total_distance() - 10.0).abs() < 1e-10);
        assert_eq!(route.total_load(), 10);
    }

    #[test]
    fn test_build_route_capacity_violated() {
        let inst = setup(25);
        let eval = RouteEvaluator::new(&inst);
        // 10 + 20 + 15 = 45 > 25
        let (route, violations) = eval.build_route(&[1, 2, 3]);
        assert_eq!(route.len(), 3);
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0].kind,
            ViolationType::CapacityExceeded {
                load: 45,
                capacity: 25,
                ..
            }
        ));
    }

    #[test]
    fn test_load_accumulates() {
        let inst = setup(50);
        let eval = RouteEvaluator::new(&inst);
        let (route, _) = eval.build_route(&[1, 2]);
        let loads: Vec<i32> = route.visits().iter().map(|v| v.load_after).collect();
        assert_eq!(loads, vec![10, 30]);
    }

    #[test]
    fn test_unknown_customer_skipped() {
        let inst = setup(50);
        let eval = RouteEvaluator::new(&inst);
        let (route, violations) = eval.build_route(&[1, 9, 0]);
        assert_eq!(route.customer_ids(), vec![1]);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_evaluate_solution_complete() {
        let inst = setup(50);
        let eval = RouteEvaluator::new(&inst);
        let (sol, violations) = eval.build_solution(&[vec![1, 2], vec![], vec![3]]);
        assert!(violations.is_empty());
        assert_eq!(sol.num_routes(), 2);

        let (total, violations) = eval.evaluate_solution(&sol);
        assert!(violations.is_empty());
        // 0->1->2->0 = 5 + 5 + 10, 0->3->0 = 20
        assert!((total - 40.0).abs() < 1e-10);
        assert!((sol.total_distance() - total).abs() < 1e-10);
    }

    #[test]
    fn test_evaluate_solution_coverage() {
        let inst = setup(50);
        let eval = RouteEvaluator::new(&inst);
        let (sol, _) = eval.build_solution(&[vec![1, 2], vec![2]]);
        let (_, violations) = eval.evaluate_solution(&sol);
        assert!(violations.contains(&Violation::new(ViolationType::CustomerMissing {
            customer_id: 3
        })));
        assert!(violations.contains(&Violation::new(ViolationType::CustomerRepeated {
            customer_id: 2,
            visits: 2
        })));
    }

    #[test]
    fn test_route_index_adjusted() {
        let inst = setup(25);
        let eval = RouteEvaluator::new(&inst);
        let (_, violations) = eval.build_solution(&[vec![1], vec![2, 3]]);
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0].kind,
            ViolationType::CapacityExceeded { route_index: 1, .. }
        ));
    }
}

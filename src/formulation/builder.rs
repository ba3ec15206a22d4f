//! Builds the load-tracking CVRP formulation.
//!
//! # Formulation
//!
//! For nodes `0..n` (0 = depot), capacity `Q` and demands `d`:
//!
//! ```text
//! min  Σ c_ij x_ij
//! s.t. Σ_i x_ij = 1                       j = 1..n-1   (in-degree)
//!      Σ_j x_ij = 1                       i = 1..n-1   (out-degree)
//!      Σ_j x_0j <= R                                   (route limit)
//!      Σ_i x_i0 = Σ_j x_0j                             (depot balance)
//!      u_i - u_j + Q x_ij <= Q - d_j      i, j >= 1    (load propagation)
//!      d_i <= u_i <= Q,  x_ij ∈ {0, 1}
//! ```
//!
//! Load propagation rules out cycles that miss the depot and keeps every
//! route within capacity (Miller-Tucker-Zemlin, 1960, in its capacity form).
//! Arcs outside an edge restriction get no variable at all.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::distance::DistanceMatrix;
use crate::error::{ArcDirection, CvrpError, Infeasibility, Result};
use crate::models::{Instance, SubInstance};
use crate::sparsify::AllowedEdges;

use super::model::{ArcVar, Constraint, ConstraintKind, CvrpModel, LoadVar, Sense, Var};

/// Assembles a [`CvrpModel`] from a node subset and its data.
///
/// `nodes` holds original node indices with the depot first; `demands` and
/// `distances` are indexed by position in `nodes`. An edge restriction is
/// looked up with original indices.
///
/// # Examples
///
/// ```
/// use u_cvrp::formulation::ModelBuilder;
/// use u_cvrp::models::Instance;
///
/// let instance = Instance::from_points(
///     &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
///     &[0, 10, 10],
///     100,
/// )
/// .unwrap();
/// let model = ModelBuilder::for_instance(&instance).build().unwrap();
/// assert_eq!(model.arcs().len(), 6);
/// assert_eq!(model.loads().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ModelBuilder<'a> {
    nodes: Vec<usize>,
    demands: Vec<i32>,
    distances: &'a DistanceMatrix,
    capacity: i32,
    allowed: Option<&'a AllowedEdges>,
    max_routes: Option<usize>,
}

impl<'a> ModelBuilder<'a> {
    /// Creates a builder from raw parts.
    pub fn new(nodes: &[usize], demands: &[i32], distances: &'a DistanceMatrix, capacity: i32) -> Self {
        Self {
            nodes: nodes.to_vec(),
            demands: demands.to_vec(),
            distances,
            capacity,
            allowed: None,
            max_routes: None,
        }
    }

    /// Builder over a whole instance.
    pub fn for_instance(instance: &'a Instance) -> Self {
        let nodes: Vec<usize> = (0..instance.num_nodes()).collect();
        Self::new(
            &nodes,
            &instance.demands(),
            instance.distances(),
            instance.capacity(),
        )
    }

    /// Builder over a sub-instance, keeping original node indices.
    pub fn for_sub_instance(sub: &'a SubInstance) -> Self {
        let instance = sub.instance();
        Self::new(
            sub.original_ids(),
            &instance.demands(),
            instance.distances(),
            instance.capacity(),
        )
    }

    /// Restricts arc variables to the given edge set.
    pub fn with_allowed_edges(mut self, allowed: &'a AllowedEdges) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Bounds the number of routes leaving the depot.
    ///
    /// Without a limit the bound is the number of customers, which never
    /// cuts off a feasible solution.
    pub fn with_max_routes(mut self, max_routes: usize) -> Self {
        self.max_routes = Some(max_routes);
        self
    }

    fn validate(&self) -> Result<usize> {
        let n = self.nodes.len();
        if n == 0 {
            return Err(CvrpError::invalid("model needs at least the depot"));
        }
        if self.demands.len() != n {
            return Err(CvrpError::invalid(format!(
                "{n} nodes but {} demands",
                self.demands.len()
            )));
        }
        if self.distances.size() != n {
            return Err(CvrpError::invalid(format!(
                "{n} nodes but a {size}x{size} distance matrix",
                size = self.distances.size()
            )));
        }
        if self.capacity <= 0 {
            return Err(CvrpError::invalid(format!(
                "capacity must be positive, got {}",
                self.capacity
            )));
        }
        let mut seen = HashSet::with_capacity(n);
        if let Some(dup) = self.nodes.iter().find(|&&node| !seen.insert(node)) {
            return Err(CvrpError::invalid(format!("node {dup} listed twice")));
        }
        if let Some(pos) = self.demands.iter().position(|&d| d < 0) {
            return Err(CvrpError::invalid(format!(
                "node {} has negative demand {}",
                self.nodes[pos], self.demands[pos]
            )));
        }
        if self.demands[0] != 0 {
            return Err(CvrpError::invalid("depot demand must be zero"));
        }
        for (pos, &demand) in self.demands.iter().enumerate() {
            if demand > self.capacity {
                return Err(Infeasibility::DemandExceedsCapacity {
                    node: self.nodes[pos],
                    demand,
                    capacity: self.capacity,
                }
                .into());
            }
        }

        let num_customers = n - 1;
        let max_routes = self.max_routes.unwrap_or(num_customers);
        if num_customers > 0 {
            if max_routes == 0 {
                return Err(CvrpError::invalid("max_routes must be positive"));
            }
            let total_demand: i64 = self.demands.iter().map(|&d| i64::from(d)).sum();
            let fleet = i64::try_from(max_routes)
                .unwrap_or(i64::MAX)
                .saturating_mul(i64::from(self.capacity));
            if total_demand > fleet {
                return Err(Infeasibility::InsufficientRoutes {
                    max_routes,
                    capacity: self.capacity,
                    total_demand,
                }
                .into());
            }
        }
        Ok(max_routes)
    }

    fn arc_allowed(&self, i: usize, j: usize) -> bool {
        self.allowed
            .map_or(true, |edges| edges.contains(self.nodes[i], self.nodes[j]))
    }

    /// Validates the input and generates variables, objective and constraints.
    ///
    /// # Errors
    ///
    /// - [`CvrpError::InvalidInput`] on dimension mismatches, duplicate
    ///   nodes, negative demand or non-positive capacity.
    /// - [`CvrpError::InfeasibleInstance`] when a demand exceeds capacity,
    ///   the route limit cannot carry the total demand, or the edge
    ///   restriction leaves a customer without an incoming or outgoing arc.
    pub fn build(self) -> Result<CvrpModel> {
        let max_routes = self.validate()?;
        let n = self.nodes.len();
        let q = f64::from(self.capacity);

        let mut arcs = Vec::new();
        let mut arc_lookup = HashMap::new();
        let mut out_arcs = vec![Vec::new(); n];
        let mut in_arcs = vec![Vec::new(); n];
        for i in 0..n {
            for j in 0..n {
                if i == j || !self.arc_allowed(i, j) {
                    continue;
                }
                let idx = arcs.len();
                arcs.push(ArcVar {
                    from: i,
                    to: j,
                    cost: self.distances.get(i, j),
                });
                arc_lookup.insert((i, j), idx);
                out_arcs[i].push(idx);
                in_arcs[j].push(idx);
            }
        }

        for j in 1..n {
            let cut_off = if in_arcs[j].is_empty() {
                Some(ArcDirection::Incoming)
            } else if out_arcs[j].is_empty() {
                Some(ArcDirection::Outgoing)
            } else {
                None
            };
            if let Some(direction) = cut_off {
                return Err(Infeasibility::UnroutableNode {
                    node: self.nodes[j],
                    direction,
                }
                .into());
            }
        }

        let mut loads = Vec::with_capacity(n.saturating_sub(1));
        let mut load_lookup = vec![None; n];
        for (j, slot) in load_lookup.iter_mut().enumerate().skip(1) {
            *slot = Some(loads.len());
            loads.push(LoadVar {
                node: j,
                lower: f64::from(self.demands[j]),
                upper: q,
            });
        }

        let arc_sum = |indices: &[usize], coef: f64| -> Vec<(Var, f64)> {
            indices.iter().map(|&a| (Var::Arc(a), coef)).collect()
        };

        let mut constraints = Vec::new();
        for j in 1..n {
            constraints.push(Constraint {
                kind: ConstraintKind::InDegree { node: j },
                terms: arc_sum(&in_arcs[j], 1.0),
                sense: Sense::Eq,
                rhs: 1.0,
            });
            constraints.push(Constraint {
                kind: ConstraintKind::OutDegree { node: j },
                terms: arc_sum(&out_arcs[j], 1.0),
                sense: Sense::Eq,
                rhs: 1.0,
            });
        }

        constraints.push(Constraint {
            kind: ConstraintKind::RouteLimit,
            terms: arc_sum(&out_arcs[0], 1.0),
            sense: Sense::Le,
            rhs: max_routes as f64,
        });

        let mut balance = arc_sum(&in_arcs[0], 1.0);
        balance.extend(arc_sum(&out_arcs[0], -1.0));
        constraints.push(Constraint {
            kind: ConstraintKind::DepotBalance,
            terms: balance,
            sense: Sense::Eq,
            rhs: 0.0,
        });

        for (idx, arc) in arcs.iter().enumerate() {
            let (Some(from_load), Some(to_load)) = (load_lookup[arc.from], load_lookup[arc.to])
            else {
                continue;
            };
            constraints.push(Constraint {
                kind: ConstraintKind::LoadPropagation {
                    from: arc.from,
                    to: arc.to,
                },
                terms: vec![
                    (Var::Load(from_load), 1.0),
                    (Var::Load(to_load), -1.0),
                    (Var::Arc(idx), q),
                ],
                sense: Sense::Le,
                rhs: q - f64::from(self.demands[arc.to]),
            });
        }

        let model = CvrpModel {
            nodes: self.nodes,
            demands: self.demands,
            capacity: self.capacity,
            max_routes,
            arcs,
            arc_lookup,
            out_arcs,
            in_arcs,
            loads,
            load_lookup,
            constraints,
        };
        debug!("{model}");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::ArcAssignment;
    use crate::sparsify::AllowedEdges;

    fn square() -> Instance {
        Instance::from_points(
            &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            &[0, 10, 20, 30],
            100,
        )
        .expect("valid")
    }

    fn count(model: &CvrpModel, pred: impl Fn(&ConstraintKind) -> bool) -> usize {
        model.constraints().iter().filter(|c| pred(&c.kind)).count()
    }

    #[test]
    fn test_full_model_sizes() {
        let model = ModelBuilder::for_instance(&square()).build().expect("model");
        // n(n-1) arcs, one load per customer
        assert_eq!(model.arcs().len(), 12);
        assert_eq!(model.loads().len(), 3);
        assert_eq!(model.num_variables(), 15);
        assert_eq!(
            count(&model, |k| matches!(k, ConstraintKind::InDegree { .. })),
            3
        );
        assert_eq!(
            count(&model, |k| matches!(k, ConstraintKind::OutDegree { .. })),
            3
        );
        assert_eq!(count(&model, |k| *k == ConstraintKind::RouteLimit), 1);
        assert_eq!(count(&model, |k| *k == ConstraintKind::DepotBalance), 1);
        // ordered customer pairs
        assert_eq!(
            count(&model, |k| matches!(k, ConstraintKind::LoadPropagation { .. })),
            6
        );
        assert_eq!(model.max_routes(), 3);
    }

    #[test]
    fn test_no_self_loops() {
        let model = ModelBuilder::for_instance(&square()).build().expect("model");
        assert!(model.arcs().iter().all(|a| a.from != a.to));
        for i in 0..4 {
            assert!(model.arc_index(i, i).is_none());
        }
    }

    #[test]
    fn test_load_bounds() {
        let model = ModelBuilder::for_instance(&square()).build().expect("model");
        assert!(model.load_index(0).is_none());
        for load in model.loads() {
            assert_eq!(load.lower, f64::from(model.demands()[load.node]));
            assert_eq!(load.upper, 100.0);
        }
    }

    #[test]
    fn test_load_propagation_coefficients() {
        let model = ModelBuilder::for_instance(&square()).build().expect("model");
        let c = model
            .constraints()
            .iter()
            .find(|c| c.kind == ConstraintKind::LoadPropagation { from: 1, to: 3 })
            .expect("constraint");
        assert_eq!(c.sense, Sense::Le);
        assert_eq!(c.rhs, 70.0);
        let arc = model.arc_index(1, 3).expect("arc");
        assert!(c.terms.contains(&(Var::Arc(arc), 100.0)));
    }

    #[test]
    fn test_demand_exceeds_capacity() {
        let inst = Instance::from_points(&[(0.0, 0.0), (1.0, 0.0)], &[0, 150], 100)
            .expect("valid instance");
        let err = ModelBuilder::for_instance(&inst).build().expect_err("infeasible");
        assert_eq!(
            err,
            CvrpError::InfeasibleInstance(Infeasibility::DemandExceedsCapacity {
                node: 1,
                demand: 150,
                capacity: 100,
            })
        );
    }

    #[test]
    fn test_two_oversized_customers() {
        let inst = Instance::from_points(
            &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
            &[0, 120, 120],
            100,
        )
        .expect("valid instance");
        let err = ModelBuilder::for_instance(&inst).build().expect_err("infeasible");
        assert!(err.is_infeasible());
    }

    #[test]
    fn test_dimension_mismatch() {
        let dm = DistanceMatrix::from_points(&[(0.0, 0.0), (1.0, 0.0)]);
        let err = ModelBuilder::new(&[0, 1, 2], &[0, 1, 1], &dm, 10)
            .build()
            .expect_err("bad dims");
        assert!(matches!(err, CvrpError::InvalidInput(_)));

        let err = ModelBuilder::new(&[0, 1], &[0], &dm, 10)
            .build()
            .expect_err("bad demands");
        assert!(matches!(err, CvrpError::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_scalars() {
        let dm = DistanceMatrix::from_points(&[(0.0, 0.0), (1.0, 0.0)]);
        assert!(ModelBuilder::new(&[0, 1], &[0, 1], &dm, 0).build().is_err());
        assert!(ModelBuilder::new(&[0, 1], &[0, -1], &dm, 10).build().is_err());
        assert!(ModelBuilder::new(&[0, 0], &[0, 1], &dm, 10).build().is_err());
        assert!(ModelBuilder::new(&[], &[], &dm, 10).build().is_err());
    }

    #[test]
    fn test_insufficient_routes() {
        let inst = Instance::from_points(
            &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
            &[0, 60, 60],
            100,
        )
        .expect("valid");
        let err = ModelBuilder::for_instance(&inst)
            .with_max_routes(1)
            .build()
            .expect_err("one vehicle cannot carry 120");
        assert!(matches!(
            err,
            CvrpError::InfeasibleInstance(Infeasibility::InsufficientRoutes { .. })
        ));
        let model = ModelBuilder::for_instance(&inst)
            .with_max_routes(2)
            .build()
            .expect("two vehicles suffice");
        let c = model
            .constraints()
            .iter()
            .find(|c| c.kind == ConstraintKind::RouteLimit)
            .expect("route limit");
        assert_eq!(c.rhs, 2.0);
    }

    #[test]
    fn test_allowed_edges_drop_variables() {
        let inst = square();
        let mut edges = AllowedEdges::new();
        for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            edges.insert_both(a, b);
        }
        let model = ModelBuilder::for_instance(&inst)
            .with_allowed_edges(&edges)
            .build()
            .expect("model");
        assert_eq!(model.arcs().len(), 8);
        assert!(model.arc_index(0, 2).is_none());
        assert!(model.arc_index(1, 3).is_none());
        // no constraint mentions a dropped arc
        for c in model.constraints() {
            for (var, _) in &c.terms {
                if let Var::Arc(idx) = var {
                    assert!(*idx < model.arcs().len());
                }
            }
        }
        assert_eq!(
            count(&model, |k| matches!(k, ConstraintKind::LoadPropagation { .. })),
            4
        );
    }

    #[test]
    fn test_restriction_isolating_node() {
        let inst = square();
        let mut edges = AllowedEdges::new();
        edges.insert_both(0, 1);
        edges.insert_both(1, 2);
        edges.insert(3, 0);
        let err = ModelBuilder::for_instance(&inst)
            .with_allowed_edges(&edges)
            .build()
            .expect_err("node 3 unreachable");
        assert_eq!(
            err,
            CvrpError::InfeasibleInstance(Infeasibility::UnroutableNode {
                node: 3,
                direction: ArcDirection::Incoming,
            })
        );
    }

    #[test]
    fn test_sub_instance_uses_original_ids() {
        let inst = square();
        let sub = inst.sub_instance(&[3, 2]).expect("sub");
        let mut edges = AllowedEdges::new();
        edges.insert_both(0, 3);
        edges.insert_both(3, 2);
        edges.insert_both(2, 0);
        let model = ModelBuilder::for_sub_instance(&sub)
            .with_allowed_edges(&edges)
            .build()
            .expect("model");
        assert_eq!(model.nodes(), &[0, 3, 2]);
        assert_eq!(model.arcs().len(), 6);
        let tour = ArcAssignment::from_arcs(&model, &[(0, 1), (1, 2), (2, 0)]).expect("arcs");
        assert!(model.check(&tour).is_ok());
        assert_eq!(model.extract_routes(&tour).expect("route"), vec![vec![3, 2]]);
    }

    #[test]
    fn test_depot_only_model() {
        let inst = Instance::from_points(&[(0.0, 0.0)], &[0], 10).expect("valid");
        let model = ModelBuilder::for_instance(&inst).build().expect("model");
        assert!(model.arcs().is_empty());
        let empty = ArcAssignment::empty(&model);
        assert!(model.check(&empty).is_ok());
        assert!(model.extract_routes(&empty).expect("no routes").is_empty());
    }

    #[test]
    fn test_accepted_assignments_have_unit_degree() {
        // Exhaustive over all 2^12 arc subsets of a 4-node model.
        let model = ModelBuilder::for_instance(&square()).build().expect("model");
        let m = model.arcs().len();
        let mut accepted = 0;
        for mask in 0u32..(1 << m) {
            let flags = (0..m).map(|i| mask & (1 << i) != 0).collect();
            let assignment = ArcAssignment::from_flags(flags);
            if model.check(&assignment).is_err() {
                continue;
            }
            accepted += 1;
            for node in 1..model.num_nodes() {
                let ins = model
                    .incoming(node)
                    .iter()
                    .filter(|&&a| assignment.is_selected(a))
                    .count();
                let outs = model
                    .outgoing(node)
                    .iter()
                    .filter(|&&a| assignment.is_selected(a))
                    .count();
                assert_eq!((ins, outs), (1, 1));
            }
            assert!(model.extract_routes(&assignment).is_ok());
        }
        assert!(accepted > 0);
    }
}

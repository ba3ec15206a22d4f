//! Solver-agnostic CVRP model: variables, objective, constraints.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const TOLERANCE: f64 = 1e-9;

/// Binary decision: is the directed arc `from -> to` travelled?
///
/// Endpoints are local node positions within the model (0 = depot).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcVar {
    /// Tail node (local).
    pub from: usize,
    /// Head node (local).
    pub to: usize,
    /// Objective coefficient (travel distance).
    pub cost: f64,
}

/// Continuous vehicle load on arrival at a customer, own demand included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadVar {
    /// Customer node (local, never the depot).
    pub node: usize,
    /// Lower bound: the node's demand.
    pub lower: f64,
    /// Upper bound: the vehicle capacity.
    pub upper: f64,
}

/// Reference to a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Var {
    /// Index into [`CvrpModel::arcs`].
    Arc(usize),
    /// Index into [`CvrpModel::loads`].
    Load(usize),
}

/// Relation between the left- and right-hand side of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// `lhs <= rhs`
    Le,
    /// `lhs == rhs`
    Eq,
    /// `lhs >= rhs`
    Ge,
}

impl Sense {
    pub(crate) fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Sense::Le => lhs <= rhs + TOLERANCE,
            Sense::Eq => (lhs - rhs).abs() <= TOLERANCE,
            Sense::Ge => lhs >= rhs - TOLERANCE,
        }
    }
}

/// What a constraint enforces. Node indices are local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Exactly one arc enters the customer.
    InDegree {
        /// Customer node.
        node: usize,
    },
    /// Exactly one arc leaves the customer.
    OutDegree {
        /// Customer node.
        node: usize,
    },
    /// Arcs leaving the depot are bounded by the route limit.
    RouteLimit,
    /// As many routes return to the depot as leave it.
    DepotBalance,
    /// `load[from] - load[to] + Q * arc <= Q - demand[to]`.
    LoadPropagation {
        /// Tail customer.
        from: usize,
        /// Head customer.
        to: usize,
    },
}

/// A linear constraint `sum(coef * var) <sense> rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Role of the constraint in the formulation.
    pub kind: ConstraintKind,
    /// Left-hand side terms.
    pub terms: Vec<(Var, f64)>,
    /// Relation.
    pub sense: Sense,
    /// Right-hand side constant.
    pub rhs: f64,
}

/// A set of selected arcs for one model.
///
/// # Examples
///
/// ```
/// use u_cvrp::formulation::ModelBuilder;
/// use u_cvrp::formulation::ArcAssignment;
/// use u_cvrp::models::Instance;
///
/// let instance = Instance::from_points(&[(0.0, 0.0), (1.0, 0.0)], &[0, 5], 10).unwrap();
/// let model = ModelBuilder::for_instance(&instance).build().unwrap();
/// let tour = ArcAssignment::from_arcs(&model, &[(0, 1), (1, 0)]).unwrap();
/// assert!(model.check(&tour).is_ok());
/// assert!((model.objective(&tour) - 2.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcAssignment {
    selected: Vec<bool>,
}

impl ArcAssignment {
    /// No arcs selected.
    pub fn empty(model: &CvrpModel) -> Self {
        Self {
            selected: vec![false; model.arcs.len()],
        }
    }

    /// Builds an assignment from per-arc flags.
    pub fn from_flags(selected: Vec<bool>) -> Self {
        Self { selected }
    }

    /// Selects the listed local `(from, to)` pairs.
    pub fn from_arcs(
        model: &CvrpModel,
        arcs: &[(usize, usize)],
    ) -> Result<Self, AssignmentViolation> {
        let mut assignment = Self::empty(model);
        for &(from, to) in arcs {
            let idx = model
                .arc_index(from, to)
                .ok_or(AssignmentViolation::UnknownArc { from, to })?;
            assignment.select(idx);
        }
        Ok(assignment)
    }

    /// Marks arc `idx` as selected. Out-of-range indices are ignored.
    pub fn select(&mut self, idx: usize) {
        if let Some(flag) = self.selected.get_mut(idx) {
            *flag = true;
        }
    }

    /// Clears arc `idx`. Out-of-range indices are ignored.
    pub fn deselect(&mut self, idx: usize) {
        if let Some(flag) = self.selected.get_mut(idx) {
            *flag = false;
        }
    }

    /// Returns `true` if arc `idx` is selected.
    pub fn is_selected(&self, idx: usize) -> bool {
        self.selected.get(idx).copied().unwrap_or(false)
    }

    /// Indices of the selected arcs.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.selected
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect()
    }

    /// Number of arc flags (selected or not).
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Returns `true` if there are no arc flags at all.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Why an arc assignment is not a solution of a model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssignmentViolation {
    /// The assignment was made for a model with a different arc count.
    #[error("assignment has {found} arc flags, model has {expected} arcs")]
    SizeMismatch {
        /// Arc count of the model.
        expected: usize,
        /// Arc count of the assignment.
        found: usize,
    },
    /// The arc has no variable in the model.
    #[error("arc {from} -> {to} is not a model variable")]
    UnknownArc {
        /// Tail node.
        from: usize,
        /// Head node.
        to: usize,
    },
    /// An arc-only constraint does not hold.
    #[error("{kind:?} violated: lhs {lhs} vs rhs {rhs}")]
    Violated {
        /// The failing constraint.
        kind: ConstraintKind,
        /// Evaluated left-hand side.
        lhs: f64,
        /// Right-hand side.
        rhs: f64,
    },
    /// No load values satisfy the load constraints (subtour or overload).
    #[error("no load values satisfy the load propagation constraints")]
    LoadInfeasible,
    /// The constraint is not a difference constraint in the loads.
    #[error("{kind:?} is not a difference constraint over load variables")]
    Unsupported {
        /// The offending constraint.
        kind: ConstraintKind,
    },
    /// Following selected arcs from the depot does not give a proper route.
    #[error("selected arcs do not form a route through node {node}")]
    BrokenRoute {
        /// Local node where the walk failed.
        node: usize,
    },
}

/// A CVRP model over one (sub-)instance.
///
/// Local node 0 is the depot; local node `i` stands for original node
/// `nodes()[i]`. Arcs excluded by an edge restriction have no variable and
/// appear in no sum. Built by [`ModelBuilder`](super::ModelBuilder) and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct CvrpModel {
    pub(super) nodes: Vec<usize>,
    pub(super) demands: Vec<i32>,
    pub(super) capacity: i32,
    pub(super) max_routes: usize,
    pub(super) arcs: Vec<ArcVar>,
    pub(super) arc_lookup: HashMap<(usize, usize), usize>,
    pub(super) out_arcs: Vec<Vec<usize>>,
    pub(super) in_arcs: Vec<Vec<usize>>,
    pub(super) loads: Vec<LoadVar>,
    pub(super) load_lookup: Vec<Option<usize>>,
    pub(super) constraints: Vec<Constraint>,
}

impl CvrpModel {
    /// Number of nodes including the depot.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Original node index of each local node.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Demand of each local node.
    pub fn demands(&self) -> &[i32] {
        &self.demands
    }

    /// Vehicle capacity.
    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    /// Upper bound on arcs leaving the depot.
    pub fn max_routes(&self) -> usize {
        self.max_routes
    }

    /// Arc variables.
    pub fn arcs(&self) -> &[ArcVar] {
        &self.arcs
    }

    /// Index of the arc variable `from -> to`, if it exists.
    pub fn arc_index(&self, from: usize, to: usize) -> Option<usize> {
        self.arc_lookup.get(&(from, to)).copied()
    }

    /// Indices of arc variables leaving `node`.
    pub fn outgoing(&self, node: usize) -> &[usize] {
        &self.out_arcs[node]
    }

    /// Indices of arc variables entering `node`.
    pub fn incoming(&self, node: usize) -> &[usize] {
        &self.in_arcs[node]
    }

    /// Load variables, one per customer.
    pub fn loads(&self) -> &[LoadVar] {
        &self.loads
    }

    /// Index of the load variable of `node`; `None` for the depot.
    pub fn load_index(&self, node: usize) -> Option<usize> {
        self.load_lookup.get(node).copied().flatten()
    }

    /// All constraints.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Total number of variables (arcs and loads).
    pub fn num_variables(&self) -> usize {
        self.arcs.len() + self.loads.len()
    }

    /// Objective value (total distance) of an assignment.
    pub fn objective(&self, assignment: &ArcAssignment) -> f64 {
        self.arcs
            .iter()
            .enumerate()
            .filter(|(idx, _)| assignment.is_selected(*idx))
            .map(|(_, arc)| arc.cost)
            .sum()
    }

    /// Checks an arc assignment against every constraint.
    ///
    /// Arc-only constraints are evaluated directly. Once the arcs are fixed,
    /// the remaining constraints are difference constraints over the loads,
    /// so load feasibility is decided exactly by negative-cycle detection.
    /// On success returns one feasible value per load variable.
    pub fn check(&self, assignment: &ArcAssignment) -> Result<Vec<f64>, AssignmentViolation> {
        if assignment.len() != self.arcs.len() {
            return Err(AssignmentViolation::SizeMismatch {
                expected: self.arcs.len(),
                found: assignment.len(),
            });
        }

        let source = self.loads.len();
        let mut edges = Vec::with_capacity(self.constraints.len() + 2 * self.loads.len());

        for constraint in &self.constraints {
            let mut arc_part = 0.0;
            let mut load_terms = Vec::new();
            for &(var, coef) in &constraint.terms {
                match var {
                    Var::Arc(idx) => {
                        if assignment.is_selected(idx) {
                            arc_part += coef;
                        }
                    }
                    Var::Load(idx) => load_terms.push((idx, coef)),
                }
            }

            if load_terms.is_empty() {
                if !constraint.sense.holds(arc_part, constraint.rhs) {
                    return Err(AssignmentViolation::Violated {
                        kind: constraint.kind,
                        lhs: arc_part,
                        rhs: constraint.rhs,
                    });
                }
                continue;
            }

            // x_pos - x_neg <= bound, where a missing side is the source
            let (mut pos, mut neg) = (None, None);
            for (idx, coef) in load_terms {
                let slot = if (coef - 1.0).abs() <= TOLERANCE {
                    &mut pos
                } else if (coef + 1.0).abs() <= TOLERANCE {
                    &mut neg
                } else {
                    return Err(AssignmentViolation::Unsupported {
                        kind: constraint.kind,
                    });
                };
                if slot.replace(idx).is_some() {
                    return Err(AssignmentViolation::Unsupported {
                        kind: constraint.kind,
                    });
                }
            }
            let pos = pos.unwrap_or(source);
            let neg = neg.unwrap_or(source);
            let bound = constraint.rhs - arc_part;
            match constraint.sense {
                Sense::Le => edges.push((neg, pos, bound)),
                Sense::Ge => edges.push((pos, neg, -bound)),
                Sense::Eq => {
                    edges.push((neg, pos, bound));
                    edges.push((pos, neg, -bound));
                }
            }
        }

        for (idx, load) in self.loads.iter().enumerate() {
            edges.push((source, idx, load.upper));
            edges.push((idx, source, -load.lower));
        }

        let dist = shortest_potentials(source + 1, &edges)
            .ok_or(AssignmentViolation::LoadInfeasible)?;
        Ok((0..source).map(|i| dist[i] - dist[source]).collect())
    }

    /// Walks the selected arcs from the depot and returns the routes as
    /// original node indices (depot excluded).
    pub fn extract_routes(
        &self,
        assignment: &ArcAssignment,
    ) -> Result<Vec<Vec<usize>>, AssignmentViolation> {
        let n = self.nodes.len();
        let next = |node: usize| -> Result<usize, AssignmentViolation> {
            let mut chosen = self.out_arcs[node]
                .iter()
                .filter(|&&a| assignment.is_selected(a))
                .map(|&a| self.arcs[a].to);
            match (chosen.next(), chosen.next()) {
                (Some(to), None) => Ok(to),
                _ => Err(AssignmentViolation::BrokenRoute { node }),
            }
        };

        let mut visited = vec![false; n];
        let mut routes = Vec::new();
        for &start in &self.out_arcs[0] {
            if !assignment.is_selected(start) {
                continue;
            }
            let mut route = Vec::new();
            let mut node = self.arcs[start].to;
            while node != 0 {
                if visited[node] {
                    return Err(AssignmentViolation::BrokenRoute { node });
                }
                visited[node] = true;
                route.push(self.nodes[node]);
                node = next(node)?;
            }
            routes.push(route);
        }

        if let Some(node) = (1..n).find(|&node| !visited[node]) {
            return Err(AssignmentViolation::BrokenRoute { node });
        }
        Ok(routes)
    }
}

impl fmt::Display for CvrpModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CVRP model: {} nodes, {} arc vars, {} load vars, {} constraints",
            self.nodes.len(),
            self.arcs.len(),
            self.loads.len(),
            self.constraints.len()
        )
    }
}

/// Bellman-Ford from a virtual source linked to every vertex at cost zero.
///
/// `edges` are `(u, v, w)` meaning `x_v - x_u <= w`. Returns `None` when a
/// negative cycle makes the system infeasible.
fn shortest_potentials(num_vertices: usize, edges: &[(usize, usize, f64)]) -> Option<Vec<f64>> {
    let mut dist = vec![0.0_f64; num_vertices];
    for _ in 0..num_vertices {
        let mut changed = false;
        for &(u, v, w) in edges {
            if dist[u] + w < dist[v] - TOLERANCE {
                dist[v] = dist[u] + w;
                changed = true;
            }
        }
        if !changed {
            return Some(dist);
        }
    }
    let relaxable = edges
        .iter()
        .any(|&(u, v, w)| dist[u] + w < dist[v] - TOLERANCE);
    (!relaxable).then_some(dist)
}

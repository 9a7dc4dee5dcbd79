//! Constraint networks: 2D nodes tied together by rigid-distance edges,
//! with some nodes pinned to fixed positions.
//!
//! The network carries its own constraint Jacobian and residual assembly
//! plus `rectify()`, the Newton-style correction controllers lean on to
//! pull drifting nodes back onto the constraint manifold.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point2d;
use crate::numeric::min_norm_lstsq;

/// Below this separation the distance-gradient row is left zero rather
/// than dividing by a vanishing distance.
const DEGENERATE_DISTANCE: f64 = 1e-12;

// ── Constraints ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    #[error("node index {index} out of range for {node_count} nodes")]
    NodeOutOfRange { index: usize, node_count: usize },
    #[error("distance constraint joins node {index} to itself")]
    SelfConstraint { index: usize },
    #[error("distance constraint target must be positive, got {length}")]
    NonPositiveDistance { length: f64 },
    #[error("constraint index {index} out of range for {constraint_count} distance constraints")]
    ConstraintOutOfRange {
        index: usize,
        constraint_count: usize,
    },
}

/// Rigid separation between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceConstraint {
    pub a: usize,
    pub b: usize,
    pub length: f64,
}

/// A node pinned to a position in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedConstraint {
    pub node: usize,
    pub position: Point2d,
}

// ── The network ──────────────────────────────────────────────────────────────

/// A planar constraint network. Node positions are the mutable state;
/// constraints are set at construction, though distance targets may be
/// retargeted later. Initial positions need not satisfy the constraints —
/// rectification converges them over successive frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintNetwork {
    nodes: Vec<Point2d>,
    distance_constraints: Vec<DistanceConstraint>,
    fixed_constraints: Vec<FixedConstraint>,
}

impl ConstraintNetwork {
    pub fn new(
        nodes: Vec<Point2d>,
        distance_constraints: Vec<DistanceConstraint>,
        fixed_constraints: Vec<FixedConstraint>,
    ) -> Result<Self, NetworkError> {
        let node_count = nodes.len();
        for constraint in &distance_constraints {
            for index in [constraint.a, constraint.b] {
                if index >= node_count {
                    return Err(NetworkError::NodeOutOfRange { index, node_count });
                }
            }
            if constraint.a == constraint.b {
                return Err(NetworkError::SelfConstraint {
                    index: constraint.a,
                });
            }
            if !(constraint.length > 0.0) {
                return Err(NetworkError::NonPositiveDistance {
                    length: constraint.length,
                });
            }
        }
        for constraint in &fixed_constraints {
            if constraint.node >= node_count {
                return Err(NetworkError::NodeOutOfRange {
                    index: constraint.node,
                    node_count,
                });
            }
        }
        Ok(Self {
            nodes,
            distance_constraints,
            fixed_constraints,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: usize) -> Point2d {
        self.nodes[index]
    }

    pub fn nodes(&self) -> &[Point2d] {
        &self.nodes
    }

    pub fn distance_constraints(&self) -> &[DistanceConstraint] {
        &self.distance_constraints
    }

    pub fn fixed_constraints(&self) -> &[FixedConstraint] {
        &self.fixed_constraints
    }

    /// Dimension of the variable space: two coordinates per node.
    pub fn variable_count(&self) -> usize {
        2 * self.nodes.len()
    }

    /// Retarget a distance constraint. This is the perturbation that
    /// rectification subsequently corrects.
    pub fn set_distance_target(&mut self, index: usize, length: f64) -> Result<(), NetworkError> {
        if index >= self.distance_constraints.len() {
            return Err(NetworkError::ConstraintOutOfRange {
                index,
                constraint_count: self.distance_constraints.len(),
            });
        }
        if !(length > 0.0) {
            return Err(NetworkError::NonPositiveDistance { length });
        }
        self.distance_constraints[index].length = length;
        Ok(())
    }

    /// Whether the node is pinned by a fixed constraint.
    pub fn is_fixed(&self, node: usize) -> bool {
        self.fixed_constraints.iter().any(|c| c.node == node)
    }

    /// The movable node nearest to `target`; ties go to the lowest index.
    /// `None` when every node is pinned.
    pub fn nearest_movable_node(&self, target: Point2d) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, node) in self.nodes.iter().enumerate() {
            if self.is_fixed(index) {
                continue;
            }
            let distance_squared = node.distance_squared_to(&target);
            if best.is_none_or(|(_, best_distance)| distance_squared < best_distance) {
                best = Some((index, distance_squared));
            }
        }
        best.map(|(index, _)| index)
    }

    // ── Jacobian & rectification ─────────────────────────────────────────────

    /// Number of constraint equations: one per distance constraint, two per
    /// fixed constraint.
    pub fn constraint_count(&self) -> usize {
        self.distance_constraints.len() + 2 * self.fixed_constraints.len()
    }

    /// Constraint Jacobian at the current node positions: one row per
    /// distance constraint (gradient of the plain, non-squared distance)
    /// and one unit row per pinned coordinate. Recomputed from scratch —
    /// it is a linearization, not stored state.
    pub fn jacobian(&self) -> DMatrix<f64> {
        let mut jacobian = DMatrix::zeros(self.constraint_count(), self.variable_count());
        for (row, c) in self.distance_constraints.iter().enumerate() {
            let pa = self.nodes[c.a];
            let pb = self.nodes[c.b];
            let distance = pa.distance_to(&pb);
            if distance < DEGENERATE_DISTANCE {
                continue;
            }
            jacobian[(row, 2 * c.a)] = (pa.x - pb.x) / distance;
            jacobian[(row, 2 * c.a + 1)] = (pa.y - pb.y) / distance;
            jacobian[(row, 2 * c.b)] = (pb.x - pa.x) / distance;
            jacobian[(row, 2 * c.b + 1)] = (pb.y - pa.y) / distance;
        }
        let base = self.distance_constraints.len();
        for (k, c) in self.fixed_constraints.iter().enumerate() {
            jacobian[(base + 2 * k, 2 * c.node)] = 1.0;
            jacobian[(base + 2 * k + 1, 2 * c.node + 1)] = 1.0;
        }
        jacobian
    }

    /// Constraint residuals at the current node positions, in the same row
    /// order as [`jacobian`](Self::jacobian): `current - target` throughout.
    pub fn residuals(&self) -> DVector<f64> {
        let mut residuals = DVector::zeros(self.constraint_count());
        for (row, c) in self.distance_constraints.iter().enumerate() {
            let distance = self.nodes[c.a].distance_to(&self.nodes[c.b]);
            residuals[row] = distance - c.length;
        }
        let base = self.distance_constraints.len();
        for (k, c) in self.fixed_constraints.iter().enumerate() {
            let node = self.nodes[c.node];
            residuals[base + 2 * k] = node.x - c.position.x;
            residuals[base + 2 * k + 1] = node.y - c.position.y;
        }
        residuals
    }

    /// Largest absolute constraint residual.
    pub fn max_residual(&self) -> f64 {
        self.residuals().iter().fold(0.0_f64, |acc, r| acc.max(r.abs()))
    }

    /// One Newton correction toward zero residual: solve `J dx = -e` in the
    /// minimum-norm least-squares sense and apply `dx`. The Jacobian is a
    /// linearization, so callers iterate a few times per frame to converge.
    pub fn rectify(&mut self) {
        if self.constraint_count() == 0 {
            return;
        }
        let jacobian = self.jacobian();
        let rhs = -self.residuals();
        let correction = min_norm_lstsq(&jacobian, &rhs).solution;
        self.displace(&correction);
    }

    /// Add a variable-space displacement to the node positions.
    /// Panics if `displacement` is not `variable_count()` long; callers
    /// derive it from this network's own Jacobian.
    pub(crate) fn displace(&mut self, displacement: &DVector<f64>) {
        debug_assert_eq!(displacement.len(), self.variable_count());
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.x += displacement[2 * index];
            node.y += displacement[2 * index + 1];
        }
    }

    /// The constrained node pairs as position segments, for rendering.
    pub fn segments(&self) -> Vec<(Point2d, Point2d)> {
        self.distance_constraints
            .iter()
            .map(|c| (self.nodes[c.a], self.nodes[c.b]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_node_network() -> ConstraintNetwork {
        ConstraintNetwork::new(
            vec![Point2d::new(0.0, 0.0), Point2d::new(1.0, 0.0)],
            vec![DistanceConstraint {
                a: 0,
                b: 1,
                length: 1.0,
            }],
            vec![FixedConstraint {
                node: 0,
                position: Point2d::new(0.0, 0.0),
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_construction_validation() {
        let nodes = vec![Point2d::new(0.0, 0.0), Point2d::new(1.0, 0.0)];
        let out_of_range = ConstraintNetwork::new(
            nodes.clone(),
            vec![DistanceConstraint {
                a: 0,
                b: 2,
                length: 1.0,
            }],
            vec![],
        );
        assert_eq!(
            out_of_range.unwrap_err(),
            NetworkError::NodeOutOfRange {
                index: 2,
                node_count: 2
            }
        );

        let self_loop = ConstraintNetwork::new(
            nodes.clone(),
            vec![DistanceConstraint {
                a: 1,
                b: 1,
                length: 1.0,
            }],
            vec![],
        );
        assert_eq!(
            self_loop.unwrap_err(),
            NetworkError::SelfConstraint { index: 1 }
        );

        let bad_length = ConstraintNetwork::new(
            nodes.clone(),
            vec![DistanceConstraint {
                a: 0,
                b: 1,
                length: -1.0,
            }],
            vec![],
        );
        assert_eq!(
            bad_length.unwrap_err(),
            NetworkError::NonPositiveDistance { length: -1.0 }
        );

        let bad_pin = ConstraintNetwork::new(
            nodes,
            vec![],
            vec![FixedConstraint {
                node: 5,
                position: Point2d::ORIGIN,
            }],
        );
        assert!(matches!(
            bad_pin.unwrap_err(),
            NetworkError::NodeOutOfRange { index: 5, .. }
        ));
    }

    #[test]
    fn test_jacobian_rows() {
        let network = two_node_network();
        let jacobian = network.jacobian();
        assert_eq!(jacobian.shape(), (3, 4));
        // Distance row: plain-distance gradient at separation 1 along x.
        assert_relative_eq!(jacobian[(0, 0)], -1.0);
        assert_relative_eq!(jacobian[(0, 1)], 0.0);
        assert_relative_eq!(jacobian[(0, 2)], 1.0);
        assert_relative_eq!(jacobian[(0, 3)], 0.0);
        // Pinned coordinates of node 0.
        assert_relative_eq!(jacobian[(1, 0)], 1.0);
        assert_relative_eq!(jacobian[(2, 1)], 1.0);
    }

    #[test]
    fn test_residuals_ordering() {
        let mut network = two_node_network();
        network.set_distance_target(0, 1.05).unwrap();
        let residuals = network.residuals();
        assert_eq!(residuals.len(), 3);
        assert_relative_eq!(residuals[0], -0.05, epsilon = 1e-12);
        assert_relative_eq!(residuals[1], 0.0);
        assert_relative_eq!(residuals[2], 0.0);
    }

    #[test]
    fn test_rectify_moves_free_node_along_bearing() {
        // Retargeting 1.0 -> 1.05 must push node 1 outward by exactly
        // 0.05 along its original bearing from the pinned node.
        let mut network = two_node_network();
        network.set_distance_target(0, 1.05).unwrap();
        network.rectify();
        let moved = network.node(1);
        assert_relative_eq!(moved.x, 1.05, epsilon = 1e-9);
        assert_relative_eq!(moved.y, 0.0, epsilon = 1e-9);
        let pinned = network.node(0);
        assert_relative_eq!(pinned.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pinned.y, 0.0, epsilon = 1e-9);
        assert!(network.max_residual() < 1e-9);
    }

    #[test]
    fn test_rectify_converges_from_violated_start() {
        // Start with the free node well off the constraint circle.
        let mut network = ConstraintNetwork::new(
            vec![Point2d::new(0.0, 0.0), Point2d::new(1.6, 1.2)],
            vec![DistanceConstraint {
                a: 0,
                b: 1,
                length: 1.0,
            }],
            vec![FixedConstraint {
                node: 0,
                position: Point2d::new(0.0, 0.0),
            }],
        )
        .unwrap();
        for _ in 0..4 {
            network.rectify();
        }
        assert!(network.max_residual() < 1e-9);
        // The node was pulled in along its bearing (3-4-5 direction).
        let node = network.node(1);
        assert_relative_eq!(node.x, 0.8, epsilon = 1e-6);
        assert_relative_eq!(node.y, 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_distance_row_is_zero() {
        let network = ConstraintNetwork::new(
            vec![Point2d::new(1.0, 1.0), Point2d::new(1.0, 1.0)],
            vec![DistanceConstraint {
                a: 0,
                b: 1,
                length: 1.0,
            }],
            vec![],
        )
        .unwrap();
        let jacobian = network.jacobian();
        assert!(jacobian.row(0).iter().all(|&x| x == 0.0));
        // Residual still reports the violation.
        assert_relative_eq!(network.residuals()[0], -1.0);
    }

    #[test]
    fn test_nearest_movable_node() {
        let network = ConstraintNetwork::new(
            vec![
                Point2d::new(0.0, 0.0),
                Point2d::new(1.0, 0.0),
                Point2d::new(2.0, 0.0),
            ],
            vec![
                DistanceConstraint {
                    a: 0,
                    b: 1,
                    length: 1.0,
                },
                DistanceConstraint {
                    a: 1,
                    b: 2,
                    length: 1.0,
                },
            ],
            vec![FixedConstraint {
                node: 0,
                position: Point2d::new(0.0, 0.0),
            }],
        )
        .unwrap();
        // Node 0 is nearer but pinned.
        assert_eq!(
            network.nearest_movable_node(Point2d::new(0.1, 0.0)),
            Some(1)
        );
        assert_eq!(
            network.nearest_movable_node(Point2d::new(5.0, 0.0)),
            Some(2)
        );
        // Equidistant between nodes 1 and 2: lowest index wins.
        assert_eq!(
            network.nearest_movable_node(Point2d::new(1.5, 0.0)),
            Some(1)
        );
    }

    #[test]
    fn test_all_nodes_fixed_has_no_movable() {
        let network = ConstraintNetwork::new(
            vec![Point2d::new(0.0, 0.0)],
            vec![],
            vec![FixedConstraint {
                node: 0,
                position: Point2d::ORIGIN,
            }],
        )
        .unwrap();
        assert_eq!(network.nearest_movable_node(Point2d::new(1.0, 1.0)), None);
    }

    #[test]
    fn test_set_distance_target_validation() {
        let mut network = two_node_network();
        assert!(matches!(
            network.set_distance_target(3, 1.0),
            Err(NetworkError::ConstraintOutOfRange { index: 3, .. })
        ));
        assert_eq!(
            network.set_distance_target(0, 0.0),
            Err(NetworkError::NonPositiveDistance { length: 0.0 })
        );
    }
}

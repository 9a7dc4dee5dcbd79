//! Nullspace-projected motion for constraint networks.
//!
//! The controller pulls the movable node nearest the target toward it, but
//! only along directions that leave every constraint unchanged to first
//! order; rectification passes then absorb the second-order drift the
//! linear projection leaves behind.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::controller::{ControlError, Controller};
use crate::geometry::Point2d;
use crate::network::ConstraintNetwork;
use crate::numeric::{nullspace_basis, span_projector};

/// Configuration for [`ConstraintMotionController`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintMotionConfig {
    /// Rectification passes after each projected move.
    pub rectify_passes: usize,
    /// `meets_target` distance tolerance for the driven node.
    pub tolerance: f64,
}

impl Default for ConstraintMotionConfig {
    fn default() -> Self {
        Self {
            rectify_passes: 4,
            tolerance: 1e-3,
        }
    }
}

/// Drives the nearest movable node of a [`ConstraintNetwork`] toward the
/// target through the constraint nullspace.
#[derive(Debug, Clone, Default)]
pub struct ConstraintMotionController {
    config: ConstraintMotionConfig,
}

impl ConstraintMotionController {
    pub fn new(config: ConstraintMotionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConstraintMotionConfig {
        &self.config
    }
}

impl Controller<ConstraintNetwork> for ConstraintMotionController {
    #[instrument(skip(self, network), level = "debug")]
    fn update(&mut self, network: &mut ConstraintNetwork, target: Point2d) -> Result<(), ControlError> {
        if let Some(node) = network.nearest_movable_node(target) {
            let pull = target - network.node(node);
            let mut raw = DVector::zeros(network.variable_count());
            raw[2 * node] = pull.x;
            raw[2 * node + 1] = pull.y;

            let basis = nullspace_basis(&network.jacobian());
            if basis.ncols() == 0 {
                // Rigid network: no motion exists that preserves the
                // constraints. A valid terminal state, not an error.
                debug!("constraint nullspace is empty, network cannot move");
            } else {
                let projected = span_projector(&basis) * raw;
                debug!(
                    node,
                    motion_norm = projected.norm(),
                    nullspace_dim = basis.ncols(),
                    "projected motion applied"
                );
                network.displace(&projected);
            }
        }

        for _ in 0..self.config.rectify_passes {
            network.rectify();
        }
        Ok(())
    }

    fn meets_target(&self, network: &ConstraintNetwork, target: Point2d) -> bool {
        network
            .nearest_movable_node(target)
            .is_some_and(|node| network.node(node).distance_to(&target) < self.config.tolerance)
    }
}

//! Jacobian-based differential control for chains of any length.
//!
//! Each step linearizes the forward kinematics at the current pose, solves
//! for the joint-space motion that best reproduces the remaining effector
//! error, and applies it. Rank-deficient poses are warned about and handled
//! with the degenerate minimum-norm solution rather than rejected.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::chain::OpenChain;
use crate::controller::{ControlError, Controller};
use crate::geometry::Point2d;
use crate::numeric::min_norm_lstsq;

/// The effector task has two dimensions (x, y); below this Jacobian rank
/// some effector directions are locally unreachable.
const TASK_RANK: usize = 2;

/// Configuration for [`DifferentialIkController`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferentialIkConfig {
    /// Hard cap on the joint-space step norm; larger solutions are rescaled
    /// preserving direction.
    pub max_step: f64,
    /// Optional cap on the effector-space residual magnitude before
    /// solving; bounds how far the linearization is trusted.
    pub max_reach: Option<f64>,
    /// Newton-like refinements per `update` call, each recomputing the
    /// Jacobian and residual.
    pub iterations: usize,
    /// `meets_target` distance tolerance.
    pub tolerance: f64,
}

impl Default for DifferentialIkConfig {
    fn default() -> Self {
        Self {
            max_step: 1e9,
            max_reach: None,
            iterations: 1,
            tolerance: 1e-4,
        }
    }
}

/// What one differential step did, for logging and tests.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Numerical rank of the chain Jacobian at the pose the step left from.
    pub rank: usize,
    /// Whether the pose was singular (rank below the task dimension).
    pub singular: bool,
    /// Norm of the applied joint-space step, after any rescaling.
    pub step_norm: f64,
}

/// Jacobian pseudo-inverse control loop for an [`OpenChain`].
#[derive(Debug, Clone, Default)]
pub struct DifferentialIkController {
    config: DifferentialIkConfig,
}

impl DifferentialIkController {
    pub fn new(config: DifferentialIkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DifferentialIkConfig {
        &self.config
    }

    /// One linearized step toward the target.
    pub fn step(&self, chain: &mut OpenChain, target: Point2d) -> Result<StepOutcome, ControlError> {
        let mut residual = target - chain.last_endpoint();
        if let Some(max_reach) = self.config.max_reach {
            residual = residual.clamped_to_length(max_reach);
        }

        let jacobian = chain_jacobian(chain);
        let rhs = DVector::from_column_slice(&residual.to_array());
        let least_squares = min_norm_lstsq(&jacobian, &rhs);

        let singular = least_squares.rank < TASK_RANK;
        if singular {
            warn!(
                rank = least_squares.rank,
                "singular configuration, applying degenerate minimum-norm step"
            );
        }

        let mut step = least_squares.solution;
        let norm = step.norm();
        if norm > self.config.max_step {
            step *= self.config.max_step / norm;
        }
        chain.move_angles(step.as_slice())?;

        Ok(StepOutcome {
            rank: least_squares.rank,
            singular,
            step_norm: step.norm(),
        })
    }
}

impl Controller<OpenChain> for DifferentialIkController {
    #[instrument(skip(self, chain), level = "debug")]
    fn update(&mut self, chain: &mut OpenChain, target: Point2d) -> Result<(), ControlError> {
        for _ in 0..self.config.iterations.max(1) {
            let outcome = self.step(chain, target)?;
            debug!(
                step_norm = outcome.step_norm,
                rank = outcome.rank,
                "differential step applied"
            );
        }
        Ok(())
    }

    fn meets_target(&self, chain: &OpenChain, target: Point2d) -> bool {
        chain.last_endpoint().distance_to(&target) < self.config.tolerance
    }
}

/// The 2 x n chain Jacobian at the current pose. Column `i` holds the
/// effector velocity per unit motion of joint `i`: the suffix sums
/// `(-sum_{k>=i} l_k sin theta_k, sum_{k>=i} l_k cos theta_k)` over the
/// cumulative link orientations.
pub fn chain_jacobian(chain: &OpenChain) -> DMatrix<f64> {
    let n = chain.link_count();
    let mut x_factors = vec![0.0; n];
    let mut y_factors = vec![0.0; n];
    let mut orientation = 0.0;
    for (i, (&length, &angle)) in chain.links().iter().zip(chain.angles()).enumerate() {
        orientation += angle;
        x_factors[i] = -length * orientation.sin();
        y_factors[i] = length * orientation.cos();
    }

    let mut jacobian = DMatrix::zeros(2, n);
    let (mut x_suffix, mut y_suffix) = (0.0, 0.0);
    for i in (0..n).rev() {
        x_suffix += x_factors[i];
        y_suffix += y_factors[i];
        jacobian[(0, i)] = x_suffix;
        jacobian[(1, i)] = y_suffix;
    }
    jacobian
}

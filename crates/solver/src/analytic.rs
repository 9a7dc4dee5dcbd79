//! Closed-form inverse kinematics for one- and two-link chains.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::OpenChain;
use crate::controller::{ControlError, Controller};
use crate::geometry::Point2d;

/// Which of the two valid two-link solutions to produce. The cosine ratio
/// fixes `|theta2|`; the branch picks its sign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElbowBranch {
    #[default]
    Positive,
    Negative,
}

/// Configuration for [`AnalyticIkController`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticIkConfig {
    /// `meets_target` distance tolerance.
    pub tolerance: f64,
    pub elbow: ElbowBranch,
}

impl Default for AnalyticIkConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            elbow: ElbowBranch::Positive,
        }
    }
}

/// Direct trigonometric IK. Applicable only to 1R and 2R chains; anything
/// longer is rejected as caller misuse.
#[derive(Debug, Clone, Default)]
pub struct AnalyticIkController {
    config: AnalyticIkConfig,
}

impl AnalyticIkController {
    pub fn new(config: AnalyticIkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticIkConfig {
        &self.config
    }

    /// Compute the joint angles that place the effector on `target`,
    /// without touching the chain.
    ///
    /// Unreachable two-link targets (too far or too close) clamp the cosine
    /// ratio to `[-1, 1]`, silently producing the fully-extended or
    /// fully-folded pose aimed at the target. That is policy, not an error.
    pub fn solve(&self, chain: &OpenChain, target: Point2d) -> Result<Vec<f64>, ControlError> {
        match chain.links() {
            [_] => Ok(vec![target.y.atan2(target.x)]),
            &[l1, l2] => {
                let reach_squared = target.x * target.x + target.y * target.y;
                let cos_ratio =
                    ((reach_squared - l1 * l1 - l2 * l2) / (2.0 * l1 * l2)).clamp(-1.0, 1.0);
                let theta2 = match self.config.elbow {
                    ElbowBranch::Positive => cos_ratio.acos(),
                    ElbowBranch::Negative => -cos_ratio.acos(),
                };
                let elbow_offset = (l2 * theta2.sin()).atan2(l1 + l2 * theta2.cos());
                let target_bearing = target.y.atan2(target.x);
                Ok(vec![target_bearing - elbow_offset, theta2])
            }
            links => Err(ControlError::UnsupportedChainLength { links: links.len() }),
        }
    }
}

impl Controller<OpenChain> for AnalyticIkController {
    fn update(&mut self, chain: &mut OpenChain, target: Point2d) -> Result<(), ControlError> {
        // Both angles are computed before any mutation: the set is atomic.
        let angles = self.solve(chain, target)?;
        chain.set_angles(&angles)?;
        debug!(
            effector_error = chain.last_endpoint().distance_to(&target),
            "analytic ik applied"
        );
        Ok(())
    }

    fn meets_target(&self, chain: &OpenChain, target: Point2d) -> bool {
        chain.last_endpoint().distance_to(&target) < self.config.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn controller() -> AnalyticIkController {
        AnalyticIkController::default()
    }

    #[test]
    fn test_one_link_points_at_target() {
        let mut chain = OpenChain::new(vec![1.0]).unwrap();
        let mut ik = controller();
        ik.update(&mut chain, Point2d::new(0.0, 2.0)).unwrap();
        assert_relative_eq!(chain.angles()[0], PI / 2.0, epsilon = 1e-12);
        // Target off the unit circle: the chain still points at it.
        assert!(ik.meets_target(&chain, Point2d::new(0.0, 1.0)));
    }

    #[test]
    fn test_two_link_reachable_target() {
        let mut chain = OpenChain::new(vec![1.3, 0.9]).unwrap();
        let mut ik = controller();
        let target = Point2d::new(1.5, 0.7);
        ik.update(&mut chain, target).unwrap();
        assert!(
            ik.meets_target(&chain, target),
            "effector {:?} missed {:?}",
            chain.last_endpoint(),
            target
        );
    }

    #[test]
    fn test_unreachable_far_clamps_to_full_extension() {
        let mut chain = OpenChain::new(vec![2.0, 1.0]).unwrap();
        let mut ik = controller();
        ik.update(&mut chain, Point2d::new(5.0, 0.0)).unwrap();
        // cos ratio clamps to 1: elbow locked straight, aimed at the target.
        assert_relative_eq!(chain.angles()[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(chain.angles()[0], 0.0, epsilon = 1e-12);
        let effector = chain.last_endpoint();
        assert_relative_eq!(effector.x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(effector.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unreachable_near_clamps_to_full_fold() {
        let mut chain = OpenChain::new(vec![2.0, 1.0]).unwrap();
        let mut ik = controller();
        ik.update(&mut chain, Point2d::new(0.5, 0.0)).unwrap();
        // cos ratio clamps to -1: elbow folded back completely.
        assert_relative_eq!(chain.angles()[1], PI, epsilon = 1e-12);
        let effector = chain.last_endpoint();
        // Folded reach is |l1 - l2| = 1, along the target bearing.
        assert_relative_eq!(effector.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(effector.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_elbow_branches_mirror() {
        let chain = OpenChain::new(vec![1.0, 1.0]).unwrap();
        let target = Point2d::new(1.0, 1.0);
        let up = controller().solve(&chain, target).unwrap();
        let down = AnalyticIkController::new(AnalyticIkConfig {
            elbow: ElbowBranch::Negative,
            ..AnalyticIkConfig::default()
        })
        .solve(&chain, target)
        .unwrap();
        assert_relative_eq!(up[1], -down[1], epsilon = 1e-12);
        // Both land on the target.
        for angles in [up, down] {
            let mut test_chain = chain.clone();
            test_chain.set_angles(&angles).unwrap();
            assert!(test_chain.last_endpoint().distance_to(&target) < 1e-9);
        }
    }

    #[test]
    fn test_three_links_rejected() {
        let mut chain = OpenChain::new(vec![1.0, 1.0, 1.0]).unwrap();
        let err = controller()
            .update(&mut chain, Point2d::new(1.0, 1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            ControlError::UnsupportedChainLength { links: 3 }
        ));
        // Fail-fast means no partial mutation.
        assert_eq!(chain.angles(), &[0.0, 0.0, 0.0]);
    }
}

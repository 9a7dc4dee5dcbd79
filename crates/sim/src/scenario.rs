//! Explicit scenario configuration: which model, which controller, which
//! target source. A plain value handed to `build`, not process-wide state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use linkage_solver::analytic::{AnalyticIkConfig, AnalyticIkController};
use linkage_solver::chain::{ChainError, OpenChain};
use linkage_solver::differential::{DifferentialIkConfig, DifferentialIkController};
use linkage_solver::geometry::Point2d;
use linkage_solver::linkage::Linkage;
use linkage_solver::motion::{ConstraintMotionConfig, ConstraintMotionController};
use linkage_solver::network::{
    ConstraintNetwork, DistanceConstraint, FixedConstraint, NetworkError,
};

use crate::driver::{LinkageController, SimulationDriver};
use crate::provider::{ClickTargetProvider, PathTargetProvider, TargetProvider};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("chain controllers need a chain model, network controllers a network")]
    ModelControllerMismatch,
    #[error("analytic inverse kinematics supports at most 2 links, scenario has {links}")]
    ChainTooLongForAnalytic { links: usize },
    #[error("a target path needs at least 2 points, got {points}")]
    PathTooShort { points: usize },
}

/// Model half of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelConfig {
    Chain {
        links: Vec<f64>,
        /// Defaults to all zeros.
        angles: Option<Vec<f64>>,
    },
    Network {
        nodes: Vec<Point2d>,
        distance_constraints: Vec<DistanceConstraint>,
        fixed_constraints: Vec<FixedConstraint>,
    },
}

/// Controller half of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ControllerConfig {
    AnalyticIk(AnalyticIkConfig),
    DifferentialIk(DifferentialIkConfig),
    ConstraintMotion(ConstraintMotionConfig),
}

/// Target-source half of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TargetConfig {
    Path {
        points: Vec<Point2d>,
        loop_path: bool,
    },
    Click {
        /// Defaults to the model's current effector / nearest free node,
        /// so the simulation starts at rest.
        initial: Option<Point2d>,
    },
}

/// A complete, explicit scenario description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub model: ModelConfig,
    pub controller: ControllerConfig,
    pub target: TargetConfig,
}

impl Scenario {
    /// Validate the configuration and assemble a driver from it.
    pub fn build(self) -> Result<SimulationDriver, ScenarioError> {
        let linkage = match self.model {
            ModelConfig::Chain { links, angles } => {
                let chain = match angles {
                    Some(angles) => OpenChain::with_angles(links, angles)?,
                    None => OpenChain::new(links)?,
                };
                Linkage::Chain(chain)
            }
            ModelConfig::Network {
                nodes,
                distance_constraints,
                fixed_constraints,
            } => Linkage::Network(ConstraintNetwork::new(
                nodes,
                distance_constraints,
                fixed_constraints,
            )?),
        };

        let controller = match (&self.controller, &linkage) {
            (ControllerConfig::AnalyticIk(config), Linkage::Chain(chain)) => {
                if chain.link_count() > 2 {
                    return Err(ScenarioError::ChainTooLongForAnalytic {
                        links: chain.link_count(),
                    });
                }
                LinkageController::AnalyticIk(AnalyticIkController::new(config.clone()))
            }
            (ControllerConfig::DifferentialIk(config), Linkage::Chain(_)) => {
                LinkageController::DifferentialIk(DifferentialIkController::new(config.clone()))
            }
            (ControllerConfig::ConstraintMotion(config), Linkage::Network(_)) => {
                LinkageController::ConstraintMotion(ConstraintMotionController::new(
                    config.clone(),
                ))
            }
            _ => return Err(ScenarioError::ModelControllerMismatch),
        };

        let provider: Box<dyn TargetProvider> = match self.target {
            TargetConfig::Path { points, loop_path } => {
                if points.len() < 2 {
                    return Err(ScenarioError::PathTooShort {
                        points: points.len(),
                    });
                }
                Box::new(PathTargetProvider::new(points, loop_path))
            }
            TargetConfig::Click { initial } => {
                let initial = initial.unwrap_or_else(|| rest_point(&linkage));
                Box::new(ClickTargetProvider::new(initial))
            }
        };

        Ok(SimulationDriver::new(linkage, controller, provider))
    }

    /// Two-bar chain under closed-form IK, looping a square of corners.
    pub fn two_bar_analytic() -> Self {
        Self {
            model: ModelConfig::Chain {
                links: vec![1.3, 0.9],
                angles: Some(vec![0.1, 0.1]),
            },
            controller: ControllerConfig::AnalyticIk(AnalyticIkConfig::default()),
            target: TargetConfig::Path {
                points: square_corners(1.5),
                loop_path: true,
            },
        }
    }

    /// The same two-bar chain under differential control.
    pub fn two_bar_differential() -> Self {
        Self {
            model: ModelConfig::Chain {
                links: vec![1.3, 0.9],
                angles: Some(vec![0.1, 0.1]),
            },
            controller: ControllerConfig::DifferentialIk(DifferentialIkConfig {
                iterations: 8,
                max_step: 0.5,
                ..DifferentialIkConfig::default()
            }),
            target: TargetConfig::Path {
                points: square_corners(1.5),
                loop_path: true,
            },
        }
    }

    /// Five-bar chain wandering between waypoints under differential
    /// control.
    pub fn five_bar_differential() -> Self {
        let links = vec![3.0, 2.0, 1.0, 1.5, 2.0];
        let angles = vec![0.123, 0.0, 30f64.to_radians(), (-30f64).to_radians(), 0.0];
        // Start the path at the chain's own effector so frame zero is calm.
        let rest = OpenChain::with_angles(links.clone(), angles.clone())
            .map(|chain| chain.last_endpoint())
            .unwrap_or(Point2d::ORIGIN);
        Self {
            model: ModelConfig::Chain {
                links,
                angles: Some(angles),
            },
            controller: ControllerConfig::DifferentialIk(DifferentialIkConfig {
                iterations: 8,
                max_step: 0.5,
                ..DifferentialIkConfig::default()
            }),
            target: TargetConfig::Path {
                points: vec![rest, Point2d::new(-4.0, 4.0), Point2d::new(-0.2, -2.3)],
                loop_path: true,
            },
        }
    }

    /// Two-bar chain chasing mouse clicks.
    pub fn two_bar_click() -> Self {
        Self {
            model: ModelConfig::Chain {
                links: vec![1.3, 0.9],
                angles: Some(vec![0.1, 0.1]),
            },
            controller: ControllerConfig::AnalyticIk(AnalyticIkConfig::default()),
            target: TargetConfig::Click { initial: None },
        }
    }

    /// Six-node ladder network with one pinned corner, driven around a
    /// surrounding rectangle.
    pub fn ladder_network() -> Self {
        Self {
            model: ModelConfig::Network {
                nodes: vec![
                    Point2d::new(0.0, 0.0),
                    Point2d::new(1.0, 0.0),
                    Point2d::new(2.0, 0.0),
                    Point2d::new(2.0, 1.0),
                    Point2d::new(1.0, 1.0),
                    Point2d::new(0.0, 1.0),
                ],
                distance_constraints: vec![
                    DistanceConstraint { a: 0, b: 1, length: 1.0 },
                    DistanceConstraint { a: 1, b: 2, length: 1.0 },
                    DistanceConstraint { a: 2, b: 3, length: 1.0 },
                    DistanceConstraint { a: 3, b: 4, length: 1.0 },
                    DistanceConstraint { a: 4, b: 5, length: 1.0 },
                    DistanceConstraint { a: 5, b: 0, length: 1.0 },
                    DistanceConstraint { a: 1, b: 4, length: 1.0 },
                ],
                fixed_constraints: vec![FixedConstraint {
                    node: 0,
                    position: Point2d::new(0.0, 0.0),
                }],
            },
            controller: ControllerConfig::ConstraintMotion(ConstraintMotionConfig::default()),
            target: TargetConfig::Path {
                points: vec![
                    Point2d::new(2.5, 1.5),
                    Point2d::new(-0.5, 1.5),
                    Point2d::new(-0.5, -0.5),
                    Point2d::new(2.5, -0.5),
                ],
                loop_path: true,
            },
        }
    }
}

fn square_corners(half_side: f64) -> Vec<Point2d> {
    vec![
        Point2d::new(half_side, half_side),
        Point2d::new(-half_side, half_side),
        Point2d::new(-half_side, -half_side),
        Point2d::new(half_side, -half_side),
    ]
}

/// Where a click-driven target should start so nothing moves before the
/// first click.
fn rest_point(linkage: &Linkage) -> Point2d {
    match linkage {
        Linkage::Chain(chain) => chain.last_endpoint(),
        Linkage::Network(network) => network
            .nearest_movable_node(Point2d::ORIGIN)
            .map(|node| network.node(node))
            .unwrap_or(Point2d::ORIGIN),
    }
}

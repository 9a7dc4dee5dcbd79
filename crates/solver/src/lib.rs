//! Planar linkage kinematics and constraint solving.
//!
//! Two mechanism models — [`OpenChain`] serial chains and
//! [`ConstraintNetwork`] node networks — plus the controllers that drive
//! them toward moving targets: closed-form and differential inverse
//! kinematics for chains, nullspace-projected motion with Newton
//! rectification for networks. Everything is single-threaded,
//! frame-synchronous, and deterministic given the current state.

pub mod analytic;
pub mod chain;
pub mod controller;
pub mod differential;
pub mod geometry;
pub mod linkage;
pub mod motion;
pub mod network;
pub mod numeric;

pub use analytic::{AnalyticIkConfig, AnalyticIkController, ElbowBranch};
pub use chain::{ChainError, OpenChain};
pub use controller::{ControlError, Controller};
pub use differential::{DifferentialIkConfig, DifferentialIkController, chain_jacobian};
pub use geometry::{Point2d, Vec2};
pub use linkage::Linkage;
pub use motion::{ConstraintMotionConfig, ConstraintMotionController};
pub use network::{ConstraintNetwork, DistanceConstraint, FixedConstraint, NetworkError};

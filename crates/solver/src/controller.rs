//! The strategy interface every motion controller implements.

use thiserror::Error;

use crate::chain::ChainError;
use crate::geometry::Point2d;

#[derive(Debug, Error)]
pub enum ControlError {
    /// Closed-form IK only exists for one- and two-link chains.
    #[error("analytic inverse kinematics supports 1 or 2 links, chain has {links}")]
    UnsupportedChainLength { links: usize },
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// A swappable control strategy for one model type.
///
/// `update` mutates the model in place toward the target; exactly one
/// controller owns write access to one model for the simulation's
/// lifetime. An `Err` signals caller misuse (fail fast), never a numeric
/// condition — singular and rigid configurations degrade gracefully inside
/// the implementations.
pub trait Controller<M> {
    fn update(&mut self, model: &mut M, target: Point2d) -> Result<(), ControlError>;

    /// Whether the model has reached the target within this controller's
    /// tolerance.
    fn meets_target(&self, model: &M, target: Point2d) -> bool;
}

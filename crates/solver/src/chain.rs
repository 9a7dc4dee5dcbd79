//! Open kinematic chains: rigid links joined by rotational joints, anchored
//! at the origin, with one free end.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::geometry::Point2d;

/// Distance from the origin under which the free end counts as closing the
/// chain back on its anchor.
pub const CLOSURE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Error, PartialEq)]
pub enum ChainError {
    #[error("a chain needs at least one link")]
    Empty,
    #[error("link {index} has non-positive length {length}")]
    NonPositiveLink { index: usize, length: f64 },
    #[error("expected {expected} joint angles, got {got}")]
    AngleCountMismatch { expected: usize, got: usize },
}

/// A planar open linkage: fixed link lengths and one joint angle per link.
///
/// Angles are in radians, each relative to the accumulated orientation of
/// all preceding joints. Lengths are immutable after construction; angles
/// are mutated in place by controllers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenChain {
    links: Vec<f64>,
    angles: Vec<f64>,
}

impl OpenChain {
    /// Build a chain from link lengths, all joints at zero.
    pub fn new(links: Vec<f64>) -> Result<Self, ChainError> {
        let angles = vec![0.0; links.len()];
        Self::with_angles(links, angles)
    }

    /// Build a chain from link lengths and initial joint angles.
    pub fn with_angles(links: Vec<f64>, angles: Vec<f64>) -> Result<Self, ChainError> {
        if links.is_empty() {
            return Err(ChainError::Empty);
        }
        for (index, &length) in links.iter().enumerate() {
            if !(length > 0.0) {
                return Err(ChainError::NonPositiveLink { index, length });
            }
        }
        if angles.len() != links.len() {
            return Err(ChainError::AngleCountMismatch {
                expected: links.len(),
                got: angles.len(),
            });
        }
        Ok(Self { links, angles })
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn links(&self) -> &[f64] {
        &self.links
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    /// Sum of all link lengths: the chain's maximum reach.
    pub fn total_length(&self) -> f64 {
        self.links.iter().sum()
    }

    /// Replace all joint angles at once. The chain is untouched on error.
    pub fn set_angles(&mut self, angles: &[f64]) -> Result<(), ChainError> {
        if angles.len() != self.links.len() {
            return Err(ChainError::AngleCountMismatch {
                expected: self.links.len(),
                got: angles.len(),
            });
        }
        self.angles.copy_from_slice(angles);
        Ok(())
    }

    /// Add a delta to each joint angle.
    pub fn move_angles(&mut self, deltas: &[f64]) -> Result<(), ChainError> {
        if deltas.len() != self.angles.len() {
            return Err(ChainError::AngleCountMismatch {
                expected: self.angles.len(),
                got: deltas.len(),
            });
        }
        for (angle, delta) in self.angles.iter_mut().zip(deltas) {
            *angle += delta;
        }
        Ok(())
    }

    /// Forward kinematics: the ordered joint positions, starting at the
    /// origin and ending at the effector. Recomputed from scratch on every
    /// call; `link_count() + 1` points.
    pub fn endpoints(&self) -> Vec<Point2d> {
        let mut points = Vec::with_capacity(self.links.len() + 1);
        let (mut x, mut y, mut orientation) = (0.0, 0.0, 0.0);
        points.push(Point2d::new(x, y));
        for (&length, &angle) in self.links.iter().zip(&self.angles) {
            orientation += angle;
            x += length * orientation.cos();
            y += length * orientation.sin();
            points.push(Point2d::new(x, y));
        }
        points
    }

    /// The free end of the chain.
    pub fn last_endpoint(&self) -> Point2d {
        let (mut x, mut y, mut orientation) = (0.0, 0.0, 0.0);
        for (&length, &angle) in self.links.iter().zip(&self.angles) {
            orientation += angle;
            x += length * orientation.cos();
            y += length * orientation.sin();
        }
        Point2d::new(x, y)
    }

    /// Whether the free end has come back to the anchor.
    pub fn is_closed(&self) -> bool {
        self.last_endpoint().distance_squared_to(&Point2d::ORIGIN)
            < CLOSURE_TOLERANCE * CLOSURE_TOLERANCE
    }

    /// A square bounding box big enough to hold the chain in any
    /// configuration, with a 2% margin. `(min_x, max_x, min_y, max_y)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let size = 1.02 * self.total_length();
        (-size, size, -size, size)
    }
}

impl fmt::Display for OpenChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chain: ")?;
        for (i, (&length, &angle)) in self.links.iter().zip(&self.angles).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({length} @ {:.1} deg)", angle.to_degrees())?;
        }
        Ok(())
    }
}

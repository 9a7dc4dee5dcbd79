//! The per-frame simulation loop: advance the target, run the controller,
//! expose the model for rendering.

use thiserror::Error;
use tracing::{debug, instrument};

use linkage_solver::analytic::AnalyticIkController;
use linkage_solver::controller::{ControlError, Controller};
use linkage_solver::differential::DifferentialIkController;
use linkage_solver::geometry::Point2d;
use linkage_solver::linkage::Linkage;
use linkage_solver::motion::ConstraintMotionController;

use crate::provider::TargetProvider;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("controller does not operate on this linkage variant")]
    ModelMismatch,
}

/// A controller paired with the linkage variant it can drive.
#[derive(Debug, Clone)]
pub enum LinkageController {
    AnalyticIk(AnalyticIkController),
    DifferentialIk(DifferentialIkController),
    ConstraintMotion(ConstraintMotionController),
}

impl LinkageController {
    fn update(&mut self, linkage: &mut Linkage, target: Point2d) -> Result<(), DriverError> {
        match (self, linkage) {
            (LinkageController::AnalyticIk(controller), Linkage::Chain(chain)) => {
                controller.update(chain, target)?
            }
            (LinkageController::DifferentialIk(controller), Linkage::Chain(chain)) => {
                controller.update(chain, target)?
            }
            (LinkageController::ConstraintMotion(controller), Linkage::Network(network)) => {
                controller.update(network, target)?
            }
            _ => return Err(DriverError::ModelMismatch),
        }
        Ok(())
    }

    fn meets_target(&self, linkage: &Linkage, target: Point2d) -> bool {
        match (self, linkage) {
            (LinkageController::AnalyticIk(controller), Linkage::Chain(chain)) => {
                controller.meets_target(chain, target)
            }
            (LinkageController::DifferentialIk(controller), Linkage::Chain(chain)) => {
                controller.meets_target(chain, target)
            }
            (LinkageController::ConstraintMotion(controller), Linkage::Network(network)) => {
                controller.meets_target(network, target)
            }
            _ => false,
        }
    }
}

/// Owns one linkage, one controller, and one target provider for the life
/// of the simulation. Nothing else mutates the model.
pub struct SimulationDriver {
    linkage: Linkage,
    controller: LinkageController,
    provider: Box<dyn TargetProvider>,
    previous_frame: f64,
}

impl SimulationDriver {
    pub fn new(
        linkage: Linkage,
        controller: LinkageController,
        provider: Box<dyn TargetProvider>,
    ) -> Self {
        Self {
            linkage,
            controller,
            provider,
            previous_frame: 0.0,
        }
    }

    /// Advance one frame: move the target, then chase it.
    #[instrument(skip(self), level = "debug")]
    pub fn step(&mut self, frame: f64) -> Result<(), DriverError> {
        let delta = frame - self.previous_frame;
        self.provider.update_target(frame, delta);
        let target = self.provider.target();
        self.controller.update(&mut self.linkage, target)?;
        self.previous_frame = frame;
        debug!(frame, target.x = target.x, target.y = target.y, "frame stepped");
        Ok(())
    }

    /// Forward a pointer press to the target provider.
    pub fn mouse_pressed(&mut self, x: f64, y: f64) {
        self.provider.button_clicked(x, y);
    }

    pub fn meets_target(&self) -> bool {
        self.controller
            .meets_target(&self.linkage, self.provider.target())
    }

    pub fn target(&self) -> Point2d {
        self.provider.target()
    }

    pub fn linkage(&self) -> &Linkage {
        &self.linkage
    }

    /// Renderer-facing reads: every joint/node position this frame.
    pub fn positions(&self) -> Vec<Point2d> {
        self.linkage.positions()
    }

    pub fn segments(&self) -> Vec<(Point2d, Point2d)> {
        self.linkage.segments()
    }

    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.linkage.bounds()
    }
}

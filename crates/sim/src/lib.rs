//! Frame-synchronous driver side of the linkage simulator: target
//! providers, the per-frame driver loop, and explicit scenario
//! configuration. Rendering is somebody else's job — the driver only
//! exposes positions, segments, and bounds for whoever draws them.

pub mod driver;
pub mod provider;
pub mod scenario;

pub use driver::{DriverError, LinkageController, SimulationDriver};
pub use provider::{ClickTargetProvider, PathTargetProvider, TargetProvider};
pub use scenario::{ControllerConfig, ModelConfig, Scenario, ScenarioError, TargetConfig};

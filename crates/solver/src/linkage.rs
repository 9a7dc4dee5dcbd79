//! The two planar mechanism variants behind one value type, so drivers and
//! renderers can hold either without caring which.

use serde::{Deserialize, Serialize};

use crate::chain::OpenChain;
use crate::geometry::Point2d;
use crate::network::ConstraintNetwork;

/// A planar articulated mechanism: an open chain or a constraint network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Linkage {
    Chain(OpenChain),
    Network(ConstraintNetwork),
}

impl Linkage {
    /// Every joint/node position, for rendering. Chains list their joint
    /// positions anchor-to-effector; networks list node positions.
    pub fn positions(&self) -> Vec<Point2d> {
        match self {
            Linkage::Chain(chain) => chain.endpoints(),
            Linkage::Network(network) => network.nodes().to_vec(),
        }
    }

    /// Line segments to draw: consecutive links for a chain, constrained
    /// node pairs for a network.
    pub fn segments(&self) -> Vec<(Point2d, Point2d)> {
        match self {
            Linkage::Chain(chain) => {
                let points = chain.endpoints();
                points.windows(2).map(|pair| (pair[0], pair[1])).collect()
            }
            Linkage::Network(network) => network.segments(),
        }
    }

    /// A view box holding the mechanism: `(min_x, max_x, min_y, max_y)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match self {
            Linkage::Chain(chain) => chain.bounds(),
            Linkage::Network(network) => {
                let mut bounds = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);
                for node in network.nodes() {
                    bounds.0 = bounds.0.min(node.x);
                    bounds.1 = bounds.1.max(node.x);
                    bounds.2 = bounds.2.min(node.y);
                    bounds.3 = bounds.3.max(node.y);
                }
                // Same 2% margin convention as the chain, plus a little
                // slack so degenerate single-node networks stay visible.
                let margin = 0.02 * (bounds.1 - bounds.0).max(bounds.3 - bounds.2).max(1.0);
                (
                    bounds.0 - margin,
                    bounds.1 + margin,
                    bounds.2 - margin,
                    bounds.3 + margin,
                )
            }
        }
    }

    pub fn as_chain(&self) -> Option<&OpenChain> {
        match self {
            Linkage::Chain(chain) => Some(chain),
            Linkage::Network(_) => None,
        }
    }

    pub fn as_network(&self) -> Option<&ConstraintNetwork> {
        match self {
            Linkage::Chain(_) => None,
            Linkage::Network(network) => Some(network),
        }
    }
}

impl From<OpenChain> for Linkage {
    fn from(chain: OpenChain) -> Self {
        Linkage::Chain(chain)
    }
}

impl From<ConstraintNetwork> for Linkage {
    fn from(network: ConstraintNetwork) -> Self {
        Linkage::Network(network)
    }
}

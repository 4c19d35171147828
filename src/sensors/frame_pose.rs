use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;

use super::Sensor;

/// `(4 × 4)` homogeneous transform from `System.get_frame_pose(frame_id)`.
#[derive(Debug, Clone)]
pub struct FramePoseSensor {
    frame: String,
}

impl FramePoseSensor {
    pub fn new(frame: impl Into<String>) -> Self {
        Self { frame: frame.into() }
    }

    pub(crate) fn deserialize(node: &DescriptionNode) -> Result<Self, AutomatonError> {
        Ok(Self::new(node.require_attribute("frame")?.to_string()))
    }
}

impl Sensor for FramePoseSensor {
    fn current_value(&self, ctx: &RuntimeContext) -> Result<Matrix, AutomatonError> {
        ctx.system.get_frame_pose(&self.frame)
    }

    fn sensor_type(&self) -> &'static str {
        "FramePose"
    }

    fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("Sensor");
        node.set_attribute("type", self.sensor_type());
        node.set_attribute("frame", self.frame.clone());
        node
    }
}

use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;

use super::Sensor;

/// A fixed matrix supplied at construction; no external input. Used as the
/// reference side of a jump condition (§4.3).
#[derive(Debug, Clone)]
pub struct ConstantSensor {
    value: Matrix,
}

impl ConstantSensor {
    pub fn new(value: Matrix) -> Self {
        Self { value }
    }

    pub(crate) fn deserialize(node: &DescriptionNode) -> Result<Self, AutomatonError> {
        Ok(Self::new(node.require_matrix("value")?))
    }
}

impl Sensor for ConstantSensor {
    fn current_value(&self, _ctx: &RuntimeContext) -> Result<Matrix, AutomatonError> {
        Ok(self.value.clone())
    }

    fn sensor_type(&self) -> &'static str {
        "Constant"
    }

    fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("Sensor");
        node.set_attribute("type", self.sensor_type());
        node.set_matrix("value", &self.value);
        node
    }
}

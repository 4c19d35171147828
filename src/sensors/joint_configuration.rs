use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;

use super::Sensor;

/// `(dof × 1)` joint positions from `System.get_configuration`.
#[derive(Debug, Clone, Copy)]
pub struct JointConfigurationSensor;

impl Sensor for JointConfigurationSensor {
    fn current_value(&self, ctx: &RuntimeContext) -> Result<Matrix, AutomatonError> {
        Ok(ctx.system.get_configuration())
    }

    fn sensor_type(&self) -> &'static str {
        "JointConfiguration"
    }

    fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("Sensor");
        node.set_attribute("type", self.sensor_type());
        node
    }
}

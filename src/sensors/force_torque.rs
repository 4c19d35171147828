use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;

use super::Sensor;

/// `(6 × 1)` wrench from `System.get_force_torque`.
#[derive(Debug, Clone, Copy)]
pub struct ForceTorqueSensor;

impl Sensor for ForceTorqueSensor {
    fn current_value(&self, ctx: &RuntimeContext) -> Result<Matrix, AutomatonError> {
        Ok(ctx.system.get_force_torque())
    }

    fn sensor_type(&self) -> &'static str {
        "ForceTorque"
    }

    fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("Sensor");
        node.set_attribute("type", self.sensor_type());
        node
    }
}

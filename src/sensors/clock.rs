use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::{vector, Matrix};

use super::Sensor;

/// `(1 × 1)` elapsed seconds since automaton start (§4.3). The elapsed time
/// is computed by the engine from the `t` values it has been given, never
/// from a wall-clock read (§5).
#[derive(Debug, Clone, Copy)]
pub struct ClockSensor;

impl Sensor for ClockSensor {
    fn current_value(&self, ctx: &RuntimeContext) -> Result<Matrix, AutomatonError> {
        Ok(vector(&[ctx.elapsed]))
    }

    fn sensor_type(&self) -> &'static str {
        "Clock"
    }

    fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("Sensor");
        node.set_attribute("type", self.sensor_type());
        node
    }
}

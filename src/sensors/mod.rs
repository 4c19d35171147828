/*!
Typed adapters producing a numeric reading from the external [`System`]
(§4.3). Grounded on the teacher's `Sensor` trait
(`src/sensors/sensor.rs`) and its one-struct-per-variant layout
(`gnss_sensor.rs`, `odometry_sensor.rs`, ...), generalized to dispatch
through the [`crate::registry::Registry`] by string tag instead of a closed
`SensorConfig` enum, since jump conditions need to build sensors from a
description tree at runtime.
*/

mod clock;
mod constant;
mod force_torque;
mod frame_pose;
mod joint_configuration;

pub use clock::ClockSensor;
pub use constant::ConstantSensor;
pub use force_torque::ForceTorqueSensor;
pub use frame_pose::FramePoseSensor;
pub use joint_configuration::JointConfigurationSensor;

use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;

/// Stateless adapter producing a fresh reading per query.
pub trait Sensor: std::fmt::Debug + Send + Sync {
    /// Produces the current reading.
    fn current_value(&self, ctx: &RuntimeContext) -> Result<Matrix, AutomatonError>;

    /// The type tag used for (de)serialization and registry dispatch.
    fn sensor_type(&self) -> &'static str;

    fn serialize(&self) -> DescriptionNode;
}

/// Builds a sensor from its description node. Sensors are not registered in
/// the [`crate::registry::Registry`] (they are a closed, small set owned
/// directly by jump conditions, §4.3), so dispatch is a plain match over the
/// `type` attribute.
pub fn deserialize_sensor(node: &DescriptionNode) -> Result<Box<dyn Sensor>, AutomatonError> {
    if node.get_type() != "Sensor" {
        return Err(AutomatonError::ParseError {
            path: node.get_type().to_string(),
            reason: format!("expected a <Sensor> node, found <{}>", node.get_type()),
        });
    }
    let type_name = node.require_attribute("type")?;
    match type_name {
        "JointConfiguration" => Ok(Box::new(JointConfigurationSensor)),
        "FramePose" => Ok(Box::new(FramePoseSensor::deserialize(node)?)),
        "ForceTorque" => Ok(Box::new(ForceTorqueSensor)),
        "Clock" => Ok(Box::new(ClockSensor)),
        "Constant" => Ok(Box::new(ConstantSensor::deserialize(node)?)),
        other => Err(AutomatonError::UnknownType {
            path: "Sensor".to_string(),
            type_name: other.to_string(),
        }),
    }
}

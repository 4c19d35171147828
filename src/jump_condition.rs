/*!
A typed predicate comparing a `current` sensor reading against a reference
under a chosen norm, epsilon, negation and dwell (§4.6). New layer: the
teacher has nothing analogous to a guard predicate (its mode switching, if
any, lives in `Navigator`), so this is grounded on the spec's own algebra and
built from `Sensor` (§4.3) plus `nalgebra`'s rotation/vector norms, which the
teacher already depends on for its own pose math.
*/

use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;
use crate::sensors::{deserialize_sensor, ConstantSensor, Sensor};

/// The comparison applied to `current - reference` (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Norm {
    L1,
    L2,
    LInf,
    ThreshUpper,
    ThreshLower,
    Rotation,
    Transform,
}

impl Norm {
    fn as_str(self) -> &'static str {
        match self {
            Norm::L1 => "L1",
            Norm::L2 => "L2",
            Norm::LInf => "L_INF",
            Norm::ThreshUpper => "Thresh_Upper",
            Norm::ThreshLower => "Thresh_Lower",
            Norm::Rotation => "Rotation",
            Norm::Transform => "Transform",
        }
    }

    fn parse(text: &str) -> Result<Self, AutomatonError> {
        match text {
            "L1" => Ok(Norm::L1),
            "L2" => Ok(Norm::L2),
            "L_INF" => Ok(Norm::LInf),
            "Thresh_Upper" => Ok(Norm::ThreshUpper),
            "Thresh_Lower" => Ok(Norm::ThreshLower),
            "Rotation" => Ok(Norm::Rotation),
            "Transform" => Ok(Norm::Transform),
            other => Err(AutomatonError::ParseError {
                path: "JumpCondition".to_string(),
                reason: format!("unknown norm {other:?}"),
            }),
        }
    }
}

/// The angle, in `[0, pi]`, of the rotation carrying `reference`'s upper-left
/// 3x3 block onto `current`'s.
fn rotation_angle(current: &Matrix, reference: &Matrix) -> Result<f64, AutomatonError> {
    let bad = |reason: &str| AutomatonError::ShapeMismatch {
        path: "JumpCondition(Rotation)".to_string(),
        reason: reason.to_string(),
    };
    if current.nrows() < 3 || current.ncols() < 3 || reference.nrows() < 3 || reference.ncols() < 3 {
        return Err(bad("both sides must carry at least a 3x3 rotation block"));
    }
    let r_current = current.view((0, 0), (3, 3)).into_owned();
    let r_reference = reference.view((0, 0), (3, 3)).into_owned();
    // reference is orthonormal, so its inverse is its transpose.
    let relative = r_current * r_reference.transpose();
    let trace = relative[(0, 0)] + relative[(1, 1)] + relative[(2, 2)];
    let cos_angle = ((trace - 1.0) / 2.0).clamp(-1.0, 1.0);
    Ok(cos_angle.acos())
}

fn translation(m: &Matrix) -> Result<Matrix, AutomatonError> {
    if m.nrows() < 4 || m.ncols() < 4 {
        return Err(AutomatonError::ShapeMismatch {
            path: "JumpCondition(Transform)".to_string(),
            reason: "expected a 4x4 homogeneous transform".to_string(),
        });
    }
    Ok(m.view((0, 3), (3, 1)).into_owned())
}

fn l2_norm(d: &Matrix) -> f64 {
    d.iter().map(|v| v * v).sum::<f64>().sqrt()
}

fn satisfies(norm: Norm, current: &Matrix, reference: &Matrix, epsilon: &Matrix) -> Result<bool, AutomatonError> {
    let eps = |i: usize| -> f64 {
        if epsilon.len() == 1 {
            epsilon[(0, 0)]
        } else {
            epsilon[(i.min(epsilon.len().saturating_sub(1)), 0)]
        }
    };
    match norm {
        Norm::L1 | Norm::L2 | Norm::LInf | Norm::ThreshUpper | Norm::ThreshLower => {
            if current.shape() != reference.shape() {
                return Err(AutomatonError::ShapeMismatch {
                    path: format!("JumpCondition({})", norm.as_str()),
                    reason: format!(
                        "current is {:?} but reference is {:?}",
                        current.shape(),
                        reference.shape()
                    ),
                });
            }
            let d = current - reference;
            Ok(match norm {
                Norm::L1 => d.iter().map(|v| v.abs()).sum::<f64>() <= eps(0),
                Norm::L2 => l2_norm(&d) <= eps(0),
                Norm::LInf => d.iter().cloned().fold(0.0_f64, |acc, v| acc.max(v.abs())) <= eps(0),
                Norm::ThreshUpper => d.iter().all(|v| *v <= eps(0)),
                Norm::ThreshLower => d.iter().all(|v| *v >= eps(0)),
                _ => unreachable!(),
            })
        }
        Norm::Rotation => {
            let angle = rotation_angle(current, reference)?;
            Ok(angle.abs() <= eps(0))
        }
        Norm::Transform => {
            let pos_current = translation(current)?;
            let pos_reference = translation(reference)?;
            let position_ok = l2_norm(&(pos_current - pos_reference)) <= eps(0);
            let rotation_ok = rotation_angle(current, reference)?.abs() <= eps(1);
            Ok(position_ok && rotation_ok)
        }
    }
}

/// A guard predicate: `current` vs. `reference`, under `norm`, within
/// `epsilon`, optionally negated and debounced by `dwell` (§4.6).
#[derive(Debug)]
pub struct JumpCondition {
    current: Box<dyn Sensor>,
    reference: Box<dyn Sensor>,
    norm: Norm,
    epsilon: Matrix,
    negated: bool,
    dwell: f64,

    holding_since: Option<f64>,
    active: bool,
}

impl JumpCondition {
    /// A blank instance, populated by [`JumpCondition::deserialize`].
    pub fn blank() -> Self {
        Self {
            current: Box::new(crate::sensors::JointConfigurationSensor),
            reference: Box::new(ConstantSensor::new(Matrix::zeros(0, 0))),
            norm: Norm::L2,
            epsilon: Matrix::zeros(1, 1),
            negated: false,
            dwell: 0.0,
            holding_since: None,
            active: false,
        }
    }

    pub fn new(
        current: Box<dyn Sensor>,
        reference: Box<dyn Sensor>,
        norm: Norm,
        epsilon: Matrix,
        negated: bool,
        dwell: f64,
    ) -> Self {
        Self {
            current,
            reference,
            norm,
            epsilon,
            negated,
            dwell,
            holding_since: None,
            active: false,
        }
    }

    /// Arms dwell bookkeeping at the owning switch's activation instant.
    pub fn activate(&mut self, _ctx: &RuntimeContext) {
        self.holding_since = None;
        self.active = false;
    }

    pub fn deactivate(&mut self) {
        self.holding_since = None;
        self.active = false;
    }

    /// Re-evaluates the predicate and updates dwell bookkeeping (§4.6 point 4).
    pub fn step(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        let current = self.current.current_value(ctx)?;
        let reference = self.reference.current_value(ctx)?;
        let mut holding = satisfies(self.norm, &current, &reference, &self.epsilon)?;
        if self.negated {
            holding = !holding;
        }

        if !holding {
            self.holding_since = None;
            self.active = false;
            return Ok(());
        }
        let since = *self.holding_since.get_or_insert(ctx.t);
        self.active = ctx.t - since >= self.dwell;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("JumpCondition");
        node.set_attribute("norm", self.norm.as_str());
        node.set_matrix("epsilon", &self.epsilon);
        node.set_bool("negated", self.negated);
        node.set_double("dwell", self.dwell);
        node.add_child(self.current.serialize());
        node.add_child(self.reference.serialize());
        node
    }

    pub fn deserialize(&mut self, node: &DescriptionNode) -> Result<(), AutomatonError> {
        self.norm = Norm::parse(node.require_attribute("norm")?)?;
        self.epsilon = node.require_matrix("epsilon")?;
        self.negated = node.get_bool("negated")?.unwrap_or(false);
        self.dwell = node.get_double("dwell")?.unwrap_or(0.0);
        if self.dwell < 0.0 {
            return Err(AutomatonError::ParseError {
                path: "JumpCondition".to_string(),
                reason: "dwell must be non-negative".to_string(),
            });
        }

        let sensors = node.children_of_type("Sensor");
        match sensors.len() {
            1 => {
                self.current = deserialize_sensor(sensors[0])?;
                self.reference = Box::new(ConstantSensor::new(node.require_matrix("reference")?));
            }
            2 => {
                self.current = deserialize_sensor(sensors[0])?;
                self.reference = deserialize_sensor(sensors[1])?;
            }
            n => {
                return Err(AutomatonError::ParseError {
                    path: "JumpCondition".to_string(),
                    reason: format!("expected one or two <Sensor> children, found {n}"),
                })
            }
        }
        self.holding_since = None;
        self.active = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::vector;
    use crate::system::System;
    use crate::testing::MockSystem;

    fn ctx(t: f64, system: &dyn System) -> RuntimeContext {
        RuntimeContext { t, elapsed: t, system }
    }

    fn l2_condition(epsilon: f64, dwell: f64) -> JumpCondition {
        JumpCondition::new(
            Box::new(crate::sensors::JointConfigurationSensor),
            Box::new(ConstantSensor::new(vector(&[1.0, 1.0, 1.0]))),
            Norm::L2,
            vector(&[epsilon]),
            false,
            dwell,
        )
    }

    #[test]
    fn l2_condition_fires_within_epsilon() {
        let system = MockSystem::new(3).with_configuration(vector(&[1.0, 1.0, 1.0]));
        let mut cond = l2_condition(0.1, 0.0);
        let ctx = ctx(0.0, &system);
        cond.activate(&ctx);
        cond.step(&ctx).unwrap();
        assert!(cond.is_active());
    }

    #[test]
    fn l2_condition_does_not_fire_outside_epsilon() {
        let system = MockSystem::new(3).with_configuration(vector(&[5.0, 5.0, 5.0]));
        let mut cond = l2_condition(0.1, 0.0);
        let ctx = ctx(0.0, &system);
        cond.activate(&ctx);
        cond.step(&ctx).unwrap();
        assert!(!cond.is_active());
    }

    #[test]
    fn dwell_requires_continuous_holding() {
        let mut cond = l2_condition(0.1, 0.5);
        let mut system = MockSystem::new(3).with_configuration(vector(&[1.0, 1.0, 1.0]));
        cond.activate(&ctx(0.0, &system));

        // tick 3 (t=0.2): starts holding.
        system = system.with_configuration(vector(&[1.0, 1.0, 1.0]));
        cond.step(&ctx(0.2, &system)).unwrap();
        assert!(!cond.is_active());

        // tick 4 (t=0.3): briefly leaves the holding region, resets.
        system = system.with_configuration(vector(&[5.0, 5.0, 5.0]));
        cond.step(&ctx(0.3, &system)).unwrap();
        assert!(!cond.is_active());

        // ticks 5..=10 (t=0.4..=0.9): holds again, re-armed at t=0.4.
        system = system.with_configuration(vector(&[1.0, 1.0, 1.0]));
        for i in 5..=10 {
            let t = i as f64 * 0.1;
            cond.step(&ctx(t, &system)).unwrap();
        }
        assert!(cond.is_active());
    }

    #[test]
    fn negation_inverts_the_result() {
        let system = MockSystem::new(3).with_configuration(vector(&[1.0, 1.0, 1.0]));
        let mut cond = JumpCondition::new(
            Box::new(crate::sensors::JointConfigurationSensor),
            Box::new(ConstantSensor::new(vector(&[1.0, 1.0, 1.0]))),
            Norm::L2,
            vector(&[0.1]),
            true,
            0.0,
        );
        let ctx = ctx(0.0, &system);
        cond.activate(&ctx);
        cond.step(&ctx).unwrap();
        assert!(!cond.is_active());
    }

    #[test]
    fn rotation_norm_detects_small_but_not_large_rotations() {
        let identity = Matrix::identity(3, 3);
        let small = nalgebra::Rotation3::from_axis_angle(&nalgebra::Vector3::z_axis(), 0.005);
        let large = nalgebra::Rotation3::from_axis_angle(&nalgebra::Vector3::z_axis(), 0.02);

        let to_matrix = |r: nalgebra::Rotation3<f64>| -> Matrix {
            let m = r.matrix();
            Matrix::from_fn(3, 3, |i, j| m[(i, j)])
        };

        assert!(satisfies(Norm::Rotation, &to_matrix(small), &identity, &vector(&[0.01])).unwrap());
        assert!(!satisfies(Norm::Rotation, &to_matrix(large), &identity, &vector(&[0.01])).unwrap());
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let result = satisfies(Norm::L2, &vector(&[1.0, 2.0]), &vector(&[1.0]), &vector(&[0.1]));
        assert!(matches!(result, Err(AutomatonError::ShapeMismatch { .. })));
    }
}

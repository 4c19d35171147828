/*!
PD controller toward an interpolated waypoint sequence, operating directly
on `System.get_configuration` (§4.4). Generalizes the shape of the
teacher's `PID` (`src/controllers/pid.rs`: config struct, persistent
gains, a finite-difference derivative, current-command bookkeeping) from a
fixed two-wheel differential-drive law to the spec's generic
goal/kp/kv/completion_times contract.

`goal` is a `(dof × n)` matrix of `n` waypoints; `completion_times` (length
`n`, or empty for a single waypoint with no interpolation) names the time,
since activation, by which each waypoint should be reached. Between
waypoints the target is linearly interpolated; after the last
`completion_times` entry the target holds at the final waypoint.
*/

use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;
use crate::system::System;

use super::{parse_common_fields, serialize_common_fields, Controller};

#[derive(Debug)]
pub struct Setpoint {
    name: String,
    goal: Matrix,
    goal_is_relative: bool,
    kp: Matrix,
    kv: Matrix,
    completion_times: Vec<f64>,

    activated_at: Option<f64>,
    last_step_at: Option<f64>,
    previous_error: Option<Matrix>,
    command: Matrix,
}

impl Setpoint {
    /// A blank instance, as the registry factory builds before
    /// `deserialize` populates it (§4.1).
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            goal: Matrix::zeros(0, 0),
            goal_is_relative: false,
            kp: Matrix::zeros(0, 0),
            kv: Matrix::zeros(0, 0),
            completion_times: Vec::new(),
            activated_at: None,
            last_step_at: None,
            previous_error: None,
            command: Matrix::zeros(0, 0),
        }
    }

    fn dof(&self) -> usize {
        self.goal.nrows()
    }

    /// The target waypoint at `elapsed` seconds since activation.
    fn target_at(&self, elapsed: f64) -> Matrix {
        let n = self.goal.ncols();
        if n == 0 {
            return Matrix::zeros(self.dof(), 1);
        }
        if self.completion_times.is_empty() || n == 1 {
            return self.goal.column(0).into_owned();
        }
        if elapsed <= self.completion_times[0] {
            return self.goal.column(0).into_owned();
        }
        if elapsed >= *self.completion_times.last().unwrap() {
            return self.goal.column(n - 1).into_owned();
        }
        for i in 0..self.completion_times.len() - 1 {
            let (t0, t1) = (self.completion_times[i], self.completion_times[i + 1]);
            if elapsed >= t0 && elapsed <= t1 {
                let span = (t1 - t0).max(f64::EPSILON);
                let ratio = (elapsed - t0) / span;
                let a = self.goal.column(i);
                let b = self.goal.column(i + 1);
                return a + (b - a) * ratio;
            }
        }
        self.goal.column(n - 1).into_owned()
    }
}

impl Controller for Setpoint {
    fn activate(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        if self.goal_is_relative {
            let current = ctx.system.get_configuration();
            if current.nrows() != self.goal.nrows() {
                return Err(AutomatonError::ShapeMismatch {
                    path: format!("Controller({})", self.name),
                    reason: format!(
                        "goal has {} rows but the system has {} degrees of freedom",
                        self.goal.nrows(),
                        current.nrows()
                    ),
                });
            }
            for mut col in self.goal.column_iter_mut() {
                col += &current;
            }
            self.goal_is_relative = false;
        }
        self.activated_at = Some(ctx.t);
        self.last_step_at = None;
        self.previous_error = None;
        Ok(())
    }

    fn deactivate(&mut self) {
        self.activated_at = None;
        self.last_step_at = None;
        self.previous_error = None;
    }

    fn step(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        let activated_at = self.activated_at.unwrap_or(ctx.t);
        let elapsed = ctx.t - activated_at;
        let current = ctx.system.get_configuration();
        if current.nrows() != self.dof() {
            return Err(AutomatonError::ShapeMismatch {
                path: format!("Controller({})", self.name),
                reason: format!(
                    "goal has {} rows but the system has {} degrees of freedom",
                    self.dof(),
                    current.nrows()
                ),
            });
        }
        let target = self.target_at(elapsed);
        let error = target - current;

        let dt = match self.last_step_at {
            Some(last) if ctx.t > last => ctx.t - last,
            _ => 0.0,
        };
        let derivative = match (&self.previous_error, dt > 0.0) {
            (Some(prev), true) => (&error - prev) / dt,
            _ => Matrix::zeros(error.nrows(), error.ncols()),
        };

        self.command = self.kp.component_mul(&error) + self.kv.component_mul(&derivative);
        self.previous_error = Some(error);
        self.last_step_at = Some(ctx.t);
        Ok(())
    }

    fn get_command(&self) -> Matrix {
        self.command.clone()
    }

    fn get_goal(&self) -> Matrix {
        self.goal.clone()
    }

    fn set_goal(&mut self, goal: Matrix) {
        self.goal = goal;
    }

    fn get_kp(&self) -> Matrix {
        self.kp.clone()
    }

    fn set_kp(&mut self, kp: Matrix) {
        self.kp = kp;
    }

    fn get_kv(&self) -> Matrix {
        self.kv.clone()
    }

    fn set_kv(&mut self, kv: Matrix) {
        self.kv = kv;
    }

    fn get_completion_times(&self) -> &[f64] {
        &self.completion_times
    }

    fn controller_type(&self) -> &'static str {
        "Setpoint"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("Controller");
        node.set_attribute("type", self.controller_type());
        serialize_common_fields(
            &mut node,
            &super::CommonFields {
                name: self.name.clone(),
                goal: self.goal.clone(),
                goal_is_relative: self.goal_is_relative,
                kp: self.kp.clone(),
                kv: self.kv.clone(),
                completion_times: self.completion_times.clone(),
            },
        );
        node
    }

    fn deserialize(&mut self, node: &DescriptionNode, _system: &dyn System) -> Result<(), AutomatonError> {
        let fields = parse_common_fields(node)?;
        if fields.kp.nrows() != fields.goal.nrows() || fields.kv.nrows() != fields.goal.nrows() {
            return Err(AutomatonError::ShapeMismatch {
                path: format!("Controller({})", fields.name),
                reason: "kp/kv row count must match the goal's degree of freedom".to_string(),
            });
        }
        if !fields.completion_times.is_empty() && fields.completion_times.len() != fields.goal.ncols() {
            return Err(AutomatonError::ParseError {
                path: format!("Controller({})", fields.name),
                reason: "completion_times length must match the number of goal waypoints".to_string(),
            });
        }
        self.name = fields.name;
        self.goal = fields.goal;
        self.goal_is_relative = fields.goal_is_relative;
        self.kp = fields.kp;
        self.kv = fields.kv;
        self.completion_times = fields.completion_times;
        self.command = Matrix::zeros(self.dof(), 1);
        Ok(())
    }
}

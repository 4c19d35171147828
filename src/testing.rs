/*!
Deterministic in-memory [`System`] implementation usable both by this
crate's own tests and by downstream embedders exercising an automaton
without a real plant (§2.1 expansion). Grounded on the teacher's own test
doubles for `Turtlebot`/`Physics` (`src/physics/mod.rs` tests), which build
a minimal stand-in rather than a full simulation.
*/

use crate::errors::AutomatonError;
use crate::matrix::Matrix;
use crate::system::{BodyHandle, System};

/// A `System` whose readings are fixed at construction and updated only by
/// the builder methods below; never reads real hardware or a clock.
#[derive(Debug, Clone)]
pub struct MockSystem {
    dof: usize,
    configuration: Matrix,
    frame_poses: Vec<(String, Matrix)>,
    force_torque: Matrix,
    current_time: f64,
    bodies: Vec<String>,
}

impl MockSystem {
    pub fn new(dof: usize) -> Self {
        Self {
            dof,
            configuration: Matrix::zeros(dof, 1),
            frame_poses: Vec::new(),
            force_torque: Matrix::zeros(6, 1),
            current_time: 0.0,
            bodies: Vec::new(),
        }
    }

    pub fn with_configuration(mut self, configuration: Matrix) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_frame_pose(mut self, frame: impl Into<String>, pose: Matrix) -> Self {
        self.frame_poses.push((frame.into(), pose));
        self
    }

    pub fn with_force_torque(mut self, force_torque: Matrix) -> Self {
        self.force_torque = force_torque;
        self
    }

    pub fn with_current_time(mut self, current_time: f64) -> Self {
        self.current_time = current_time;
        self
    }

    pub fn with_body(mut self, name: impl Into<String>) -> Self {
        self.bodies.push(name.into());
        self
    }
}

impl System for MockSystem {
    fn dof(&self) -> usize {
        self.dof
    }

    fn get_configuration(&self) -> Matrix {
        self.configuration.clone()
    }

    fn get_frame_pose(&self, frame: &str) -> Result<Matrix, AutomatonError> {
        self.frame_poses
            .iter()
            .find(|(name, _)| name == frame)
            .map(|(_, pose)| pose.clone())
            .ok_or_else(|| AutomatonError::SystemError(format!("no frame pose registered for {frame:?}")))
    }

    fn get_force_torque(&self) -> Matrix {
        self.force_torque.clone()
    }

    fn get_current_time(&self) -> f64 {
        self.current_time
    }

    fn find_body(&self, name: &str) -> Result<BodyHandle, AutomatonError> {
        self.bodies
            .iter()
            .position(|b| b == name)
            .map(BodyHandle)
            .ok_or_else(|| AutomatonError::SystemError(format!("no body named {name:?}")))
    }
}

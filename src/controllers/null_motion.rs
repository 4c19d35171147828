/*!
Always-zero filler controller (§4.5): the "null-motion controller available
to all [composition] policies".
*/

use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;
use crate::system::System;

use super::Controller;

#[derive(Debug)]
pub struct NullMotion {
    name: String,
    dof: usize,
}

impl NullMotion {
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            dof: 0,
        }
    }

    pub fn new(name: impl Into<String>, dof: usize) -> Self {
        Self {
            name: name.into(),
            dof,
        }
    }
}

impl Controller for NullMotion {
    fn activate(&mut self, _ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        Ok(())
    }

    fn deactivate(&mut self) {}

    fn step(&mut self, _ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        Ok(())
    }

    fn get_command(&self) -> Matrix {
        Matrix::zeros(self.dof, 1)
    }

    fn get_goal(&self) -> Matrix {
        Matrix::zeros(self.dof, 1)
    }

    fn set_goal(&mut self, _goal: Matrix) {}

    fn get_kp(&self) -> Matrix {
        Matrix::zeros(self.dof, 1)
    }

    fn set_kp(&mut self, _kp: Matrix) {}

    fn get_kv(&self) -> Matrix {
        Matrix::zeros(self.dof, 1)
    }

    fn set_kv(&mut self, _kv: Matrix) {}

    fn get_completion_times(&self) -> &[f64] {
        &[]
    }

    fn controller_type(&self) -> &'static str {
        "NullMotion"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("Controller");
        node.set_attribute("type", self.controller_type());
        node.set_attribute("name", self.name.clone());
        node.set_int("dof", self.dof as i64);
        node
    }

    fn deserialize(&mut self, node: &DescriptionNode, _system: &dyn System) -> Result<(), AutomatonError> {
        self.name = node.require_attribute("name")?.to_string();
        self.dof = node.get_int("dof")?.unwrap_or(0) as usize;
        Ok(())
    }
}

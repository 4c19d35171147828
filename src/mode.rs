/*!
A graph vertex: a unique name paired with exactly one owned [`ControlSet`]
(§3, §4.8). New layer: grounded on the same ownership shape as
`ControlSwitch`/`JumpCondition` — no teacher analogue.
*/

use crate::context::RuntimeContext;
use crate::control_set::ControlSet;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;
use crate::registry::Registry;
use crate::system::System;

/// A named vertex of the mode graph, resident for as long as it is the
/// automaton's current mode.
#[derive(Debug)]
pub struct ControlMode {
    name: String,
    control_set: Box<dyn ControlSet>,
}

impl ControlMode {
    pub fn new(name: impl Into<String>, control_set: Box<dyn ControlSet>) -> Self {
        Self {
            name: name.into(),
            control_set,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn control_set(&self) -> &dyn ControlSet {
        self.control_set.as_ref()
    }

    pub fn control_set_mut(&mut self) -> &mut dyn ControlSet {
        self.control_set.as_mut()
    }

    pub fn get_command(&self) -> Matrix {
        self.control_set.get_command()
    }

    pub fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("ControlMode");
        node.set_attribute("name", self.name.clone());
        node.add_child(self.control_set.serialize());
        node
    }

    pub fn deserialize(node: &DescriptionNode, system: &dyn System, registry: &Registry) -> Result<Self, AutomatonError> {
        let name = node.require_attribute("name")?.to_string();
        let child = node.child_of_type("ControlSet")?;
        let type_name = child.require_attribute("type")?;
        let mut control_set = registry.make_control_set(type_name)?;
        control_set.deserialize(child, system, registry)?;
        Ok(Self::new(name, control_set))
    }
}

/// Fans `activate`/`deactivate`/`step` out to the owned control set; kept
/// separate from `ControlMode` itself so `HybridAutomaton` can call through
/// a `&mut ControlMode` without also needing `&RuntimeContext` plumbing at
/// the field level.
impl ControlMode {
    pub fn activate(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        self.control_set.activate(ctx)
    }

    pub fn deactivate(&mut self) {
        self.control_set.deactivate();
    }

    pub fn step(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        self.control_set.step(ctx)
    }
}

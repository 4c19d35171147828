/*!
An edge of the mode graph: a conjunction of [`JumpCondition`]s guarding a
`(source, target)` transition (§4.7). New layer: grounded on the same
trait+registry shape the rest of the crate uses, since the teacher has no
analogous guarded-edge concept.
*/

use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::jump_condition::JumpCondition;

/// A named edge from `source` to `target`, active only when every owned
/// condition is active (§4.7). A switch with zero conditions is always
/// inactive (§9 "Open question (resolved)").
#[derive(Debug)]
pub struct ControlSwitch {
    name: String,
    source: String,
    target: String,
    conditions: Vec<JumpCondition>,
}

impl ControlSwitch {
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            source: String::new(),
            target: String::new(),
            conditions: Vec::new(),
        }
    }

    pub fn new(name: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            conditions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn add_condition(&mut self, condition: JumpCondition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[JumpCondition] {
        &self.conditions
    }

    pub fn activate(&mut self, ctx: &RuntimeContext) {
        for condition in &mut self.conditions {
            condition.activate(ctx);
        }
    }

    pub fn deactivate(&mut self) {
        for condition in &mut self.conditions {
            condition.deactivate();
        }
    }

    pub fn step(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        for condition in &mut self.conditions {
            condition.step(ctx)?;
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| c.is_active())
    }

    pub fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("ControlSwitch");
        node.set_attribute("name", self.name.clone());
        node.set_attribute("source", self.source.clone());
        node.set_attribute("target", self.target.clone());
        for condition in &self.conditions {
            node.add_child(condition.serialize());
        }
        node
    }

    pub fn deserialize(&mut self, node: &DescriptionNode) -> Result<(), AutomatonError> {
        self.name = node.require_attribute("name")?.to_string();
        self.source = node.require_attribute("source")?.to_string();
        self.target = node.require_attribute("target")?.to_string();
        self.conditions.clear();
        for child in node.children_of_type("JumpCondition") {
            let mut condition = JumpCondition::blank();
            condition.deserialize(child)?;
            self.conditions.push(condition);
        }
        Ok(())
    }
}

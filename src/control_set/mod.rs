/*!
Composes multiple concurrently active controllers into a single plant
command (§4.5). New layer: the teacher has no multi-controller composition
(one `Controller` per `Turtlebot`), so this is grounded on the general
trait+registry shape used throughout (`Controller`, §4.4) rather than on a
specific teacher file; see `composition.rs` for the three concrete
policies.
*/

pub mod composition;

use indexmap::IndexSet;

use crate::context::RuntimeContext;
use crate::controllers::null_motion::NullMotion;
use crate::controllers::Controller;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;
use crate::registry::Registry;
use crate::system::System;

/// One controller owned by a control set, with the priority the
/// composition policy honors (§3 "priorities ... are honored by the
/// composition policy").
pub struct ControllerEntry {
    pub controller: Box<dyn Controller>,
    pub priority: i64,
    pub is_goal_controller: bool,
}

impl std::fmt::Debug for ControllerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerEntry")
            .field("name", &self.controller.name())
            .field("priority", &self.priority)
            .field("is_goal_controller", &self.is_goal_controller)
            .finish()
    }
}

/// Composes the active controllers' commands into one plant command and
/// manages their activation ordering (§4.5).
pub trait ControlSet: std::fmt::Debug + Send + Sync {
    fn activate(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError>;
    fn deactivate(&mut self);
    fn step(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError>;
    fn get_command(&self) -> Matrix;

    fn add_controller(
        &mut self,
        controller: Box<dyn Controller>,
        priority: i64,
        is_goal_controller: bool,
    ) -> Result<(), AutomatonError>;

    fn get_controllers(&self) -> &[ControllerEntry];

    fn control_set_type(&self) -> &'static str;
    fn name(&self) -> &str;

    fn serialize(&self) -> DescriptionNode;

    /// Builds every child `Controller` via `registry`, then calls
    /// `add_controller` with the priority carried on its `priority`
    /// attribute (§4.5).
    fn deserialize(
        &mut self,
        node: &DescriptionNode,
        system: &dyn System,
        registry: &Registry,
    ) -> Result<(), AutomatonError>;
}

/// Shared bookkeeping every composition policy needs: the controller list,
/// name uniqueness, the always-present null-motion filler (§4.5), and the
/// composed command cache.
pub(crate) struct ControlSetCore {
    name: String,
    entries: Vec<ControllerEntry>,
    names: IndexSet<String>,
    null_motion: NullMotion,
    command: Matrix,
}

impl std::fmt::Debug for ControlSetCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSetCore")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .finish()
    }
}

impl ControlSetCore {
    pub(crate) fn blank() -> Self {
        Self {
            name: String::new(),
            entries: Vec::new(),
            names: IndexSet::new(),
            null_motion: NullMotion::new("__null_motion__", 0),
            command: Matrix::zeros(0, 0),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn entries(&self) -> &[ControllerEntry] {
        &self.entries
    }

    pub(crate) fn command(&self) -> Matrix {
        self.command.clone()
    }

    pub(crate) fn add_controller(
        &mut self,
        controller: Box<dyn Controller>,
        priority: i64,
        is_goal_controller: bool,
    ) -> Result<(), AutomatonError> {
        let name = controller.name().to_string();
        if !self.names.insert(name.clone()) {
            return Err(AutomatonError::DuplicateName {
                path: format!("ControlSet({})", self.name),
                name,
            });
        }
        self.entries.push(ControllerEntry {
            controller,
            priority,
            is_goal_controller,
        });
        Ok(())
    }

    pub(crate) fn activate(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        self.null_motion = NullMotion::new("__null_motion__", ctx.system.dof());
        for entry in &mut self.entries {
            entry.controller.activate(ctx)?;
        }
        Ok(())
    }

    pub(crate) fn deactivate(&mut self) {
        for entry in &mut self.entries {
            entry.controller.deactivate();
        }
    }

    pub(crate) fn step(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        for entry in &mut self.entries {
            entry.controller.step(ctx)?;
        }
        Ok(())
    }

    pub(crate) fn deserialize(
        &mut self,
        node: &DescriptionNode,
        system: &dyn System,
        registry: &Registry,
    ) -> Result<(), AutomatonError> {
        self.name = node.require_attribute("name")?.to_string();
        for child in node.children_of_type("Controller") {
            let type_name = child.require_attribute("type")?;
            let mut controller = registry.make_controller(type_name)?;
            controller.deserialize(child, system)?;
            let priority = child.get_int("priority")?.unwrap_or(0);
            let is_goal_controller = child.get_bool("is_goal_controller")?.unwrap_or(false);
            self.add_controller(controller, priority, is_goal_controller)?;
        }
        Ok(())
    }

    pub(crate) fn serialize_into(&self, node: &mut DescriptionNode) {
        node.set_attribute("name", self.name.clone());
        for entry in &self.entries {
            let mut child = entry.controller.serialize();
            child.set_int("priority", entry.priority);
            child.set_bool("is_goal_controller", entry.is_goal_controller);
            node.add_child(child);
        }
    }

    /// The zero-command filler available to every composition policy
    /// (§4.5), sized to the last-activated `System`'s degree-of-freedom
    /// count. Any degree of freedom no configured controller claims keeps
    /// this (zero) value.
    pub(crate) fn null_motion_command(&self) -> Matrix {
        self.null_motion.get_command()
    }
}

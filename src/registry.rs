/*!
Process-wide registry mapping type names to factory closures (§4.1),
generalizing the teacher's closed `*Config` enum + `make_*_from_config`
match into an open, runtime-extensible map.

Factories build a *blank* instance; the blank is then populated by its own
`deserialize(node, system)`, matching §4.5's "Registry is consulted to
construct each controller by its type name, then `controller.deserialize`
is invoked" description.
*/

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::control_set::composition::{Nakamura, SerialNullSpace, TaskPriority};
use crate::control_set::ControlSet;
use crate::controllers::null_motion::NullMotion;
use crate::controllers::setpoint::Setpoint;
use crate::controllers::Controller;
use crate::errors::AutomatonError;

type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;
type ControlSetFactory = Arc<dyn Fn() -> Box<dyn ControlSet> + Send + Sync>;

struct Entry<F> {
    /// Identity of the Rust type the factory builds, used to decide whether
    /// a re-registration under the same name is the idempotent no-op case
    /// or a genuine `DuplicateRegistration`.
    target: TypeId,
    factory: F,
}

/// The process-wide factory map. Construct one with [`Registry::new`] (empty)
/// or reach for the global instance via [`registry`].
#[derive(Default)]
pub struct Registry {
    controllers: HashMap<String, Entry<ControllerFactory>>,
    control_sets: HashMap<String, Entry<ControlSetFactory>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            controllers: HashMap::new(),
            control_sets: HashMap::new(),
        }
    }

    /// Registers a controller factory under `name`. Idempotent if `name`
    /// already maps to the same concrete type `T`; fails with
    /// `DuplicateRegistration` if it maps to a different type.
    pub fn register_controller<T, F>(&mut self, name: &str, factory: F) -> Result<(), AutomatonError>
    where
        T: Controller + 'static,
        F: Fn() -> Box<dyn Controller> + Send + Sync + 'static,
    {
        register(&mut self.controllers, name, TypeId::of::<T>(), Arc::new(factory))
    }

    /// Registers a control-set (composition policy) factory under `name`.
    pub fn register_control_set<T, F>(&mut self, name: &str, factory: F) -> Result<(), AutomatonError>
    where
        T: ControlSet + 'static,
        F: Fn() -> Box<dyn ControlSet> + Send + Sync + 'static,
    {
        register(&mut self.control_sets, name, TypeId::of::<T>(), Arc::new(factory))
    }

    pub fn make_controller(&self, type_name: &str) -> Result<Box<dyn Controller>, AutomatonError> {
        self.controllers
            .get(type_name)
            .map(|e| (e.factory)())
            .ok_or_else(|| AutomatonError::UnknownType {
                path: "Controller".to_string(),
                type_name: type_name.to_string(),
            })
    }

    pub fn make_control_set(&self, type_name: &str) -> Result<Box<dyn ControlSet>, AutomatonError> {
        self.control_sets
            .get(type_name)
            .map(|e| (e.factory)())
            .ok_or_else(|| AutomatonError::UnknownType {
                path: "ControlSet".to_string(),
                type_name: type_name.to_string(),
            })
    }

    pub fn has_controller(&self, type_name: &str) -> bool {
        self.controllers.contains_key(type_name)
    }

    pub fn has_control_set(&self, type_name: &str) -> bool {
        self.control_sets.contains_key(type_name)
    }
}

fn register<F>(
    map: &mut HashMap<String, Entry<F>>,
    name: &str,
    target: TypeId,
    factory: F,
) -> Result<(), AutomatonError> {
    if let Some(existing) = map.get(name) {
        if existing.target != target {
            return Err(AutomatonError::DuplicateRegistration {
                type_name: name.to_string(),
            });
        }
        return Ok(());
    }
    map.insert(name.to_string(), Entry { target, factory });
    Ok(())
}

lazy_static! {
    /// The process-wide registry, guarded by a read-mostly lock (§5):
    /// written only during initialization, read on any thread thereafter.
    static ref GLOBAL_REGISTRY: RwLock<Registry> = RwLock::new(Registry::new());
}

/// Registers the engine's built-in controller and control-set types.
///
/// Called during engine initialization (§9 "Registry initialization
/// order"), before any automaton is deserialized. Safe to call more than
/// once.
pub fn register_builtin_types(registry: &mut Registry) -> Result<(), AutomatonError> {
    registry.register_controller::<Setpoint, _>("Setpoint", || Box::new(Setpoint::blank()))?;
    registry.register_controller::<NullMotion, _>("NullMotion", || Box::new(NullMotion::blank()))?;

    registry.register_control_set::<SerialNullSpace, _>("SerialNullSpace", || {
        Box::new(SerialNullSpace::blank())
    })?;
    registry.register_control_set::<TaskPriority, _>("TaskPriority", || {
        Box::new(TaskPriority::blank())
    })?;
    registry.register_control_set::<Nakamura, _>("Nakamura", || Box::new(Nakamura::blank()))?;
    Ok(())
}

/// Runs `f` with a read lock on the global registry, having lazily
/// populated it with the built-in types on first use.
pub fn with_global_registry<R>(f: impl FnOnce(&Registry) -> R) -> R {
    {
        let guard = GLOBAL_REGISTRY.read().unwrap();
        if guard.has_controller("Setpoint") {
            return f(&guard);
        }
    }
    {
        let mut guard = GLOBAL_REGISTRY.write().unwrap();
        register_builtin_types(&mut guard).expect("built-in type registration cannot fail");
    }
    let guard = GLOBAL_REGISTRY.read().unwrap();
    f(&guard)
}

/// Grants write access to the global registry, e.g. to register a
/// third-party controller type before constructing an automaton.
pub fn with_global_registry_mut<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    let mut guard = GLOBAL_REGISTRY.write().unwrap();
    f(&mut guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RuntimeContext;
    use crate::description_tree::DescriptionNode;
    use crate::matrix::Matrix;

    #[derive(Debug)]
    struct Dummy;

    impl Controller for Dummy {
        fn activate(&mut self, _ctx: &RuntimeContext) -> Result<(), AutomatonError> {
            Ok(())
        }
        fn deactivate(&mut self) {}
        fn step(&mut self, _ctx: &RuntimeContext) -> Result<(), AutomatonError> {
            Ok(())
        }
        fn get_command(&self) -> Matrix {
            Matrix::zeros(1, 1)
        }
        fn get_goal(&self) -> Matrix {
            Matrix::zeros(1, 1)
        }
        fn set_goal(&mut self, _goal: Matrix) {}
        fn get_kp(&self) -> Matrix {
            Matrix::zeros(1, 1)
        }
        fn set_kp(&mut self, _kp: Matrix) {}
        fn get_kv(&self) -> Matrix {
            Matrix::zeros(1, 1)
        }
        fn set_kv(&mut self, _kv: Matrix) {}
        fn get_completion_times(&self) -> &[f64] {
            &[]
        }
        fn controller_type(&self) -> &'static str {
            "Dummy"
        }
        fn name(&self) -> &str {
            "dummy"
        }
        fn serialize(&self) -> DescriptionNode {
            DescriptionNode::new("Controller")
        }
        fn deserialize(
            &mut self,
            _node: &DescriptionNode,
            _system: &dyn crate::system::System,
        ) -> Result<(), AutomatonError> {
            Ok(())
        }
    }

    #[test]
    fn registration_is_idempotent_for_the_same_type() {
        let mut registry = Registry::new();
        registry
            .register_controller::<Dummy, _>("Dummy", || Box::new(Dummy))
            .unwrap();
        registry
            .register_controller::<Dummy, _>("Dummy", || Box::new(Dummy))
            .unwrap();
        assert!(registry.has_controller("Dummy"));
    }

    #[test]
    fn registering_a_different_type_under_the_same_name_fails() {
        let mut registry = Registry::new();
        registry
            .register_controller::<Dummy, _>("X", || Box::new(Dummy))
            .unwrap();
        let err = registry
            .register_controller::<Setpoint, _>("X", || Box::new(Setpoint::blank()))
            .unwrap_err();
        assert!(matches!(err, AutomatonError::DuplicateRegistration { .. }));
    }

    #[test]
    fn unknown_type_lookup_fails() {
        let registry = Registry::new();
        let err = registry.make_controller("Nope").unwrap_err();
        assert!(matches!(err, AutomatonError::UnknownType { .. }));
    }

    #[test]
    fn builtin_types_are_registered() {
        let mut registry = Registry::new();
        register_builtin_types(&mut registry).unwrap();
        assert!(registry.has_controller("Setpoint"));
        assert!(registry.has_controller("NullMotion"));
        assert!(registry.has_control_set("SerialNullSpace"));
        assert!(registry.has_control_set("TaskPriority"));
        assert!(registry.has_control_set("Nakamura"));
    }
}

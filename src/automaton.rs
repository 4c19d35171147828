/*!
The mode graph, the tick-driven scheduler, and the top-level (de)serialization
entry point (§4.8). New layer: grounded on the same index-by-name,
owned-children shape the rest of the crate uses (`IndexMap`-keyed tables,
cf. `registry.rs`), since the teacher has no comparable mode-graph scheduler.
*/

use std::sync::Arc;

use indexmap::IndexMap;

use crate::context::RuntimeContext;
use crate::control_switch::ControlSwitch;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;
use crate::mode::ControlMode;
use crate::registry::Registry;
use crate::system::System;

/// The four states of §4.8's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomatonState {
    Unbound,
    Armed,
    Running,
    Halted,
}

/// The mode graph plus the scheduler driving it (§3, §4.8).
#[derive(Debug)]
pub struct HybridAutomaton {
    name: String,
    modes: IndexMap<String, ControlMode>,
    switches: IndexMap<String, ControlSwitch>,
    current_mode: Option<String>,
    system: Option<Arc<dyn System>>,
    strict: bool,
    state: AutomatonState,
    start_time: Option<f64>,
    last_t: Option<f64>,
    last_command: Matrix,
}

impl HybridAutomaton {
    /// A fresh, `Unbound` automaton. `add_mode`/`add_switch` are the only
    /// legal operations until `arm` is called.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modes: IndexMap::new(),
            switches: IndexMap::new(),
            current_mode: None,
            system: None,
            strict: true,
            state: AutomatonState::Unbound,
            start_time: None,
            last_t: None,
            last_command: Matrix::zeros(0, 1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> AutomatonState {
        self.state
    }

    pub fn current_mode_name(&self) -> Option<&str> {
        self.current_mode.as_deref()
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn add_mode(&mut self, mode: ControlMode) -> Result<(), AutomatonError> {
        let name = mode.name().to_string();
        if self.modes.contains_key(&name) {
            return Err(AutomatonError::DuplicateName {
                path: format!("HybridAutomaton({})", self.name),
                name,
            });
        }
        self.modes.insert(name, mode);
        Ok(())
    }

    pub fn add_switch(&mut self, switch: ControlSwitch) -> Result<(), AutomatonError> {
        let name = switch.name().to_string();
        if self.switches.contains_key(&name) {
            return Err(AutomatonError::DuplicateName {
                path: format!("HybridAutomaton({})", self.name),
                name,
            });
        }
        self.switches.insert(name, switch);
        Ok(())
    }

    /// Validates that `start_mode` and every switch's endpoints refer to
    /// modes that exist, binds `system`, and moves to `Armed` (§4.8).
    pub fn arm(&mut self, start_mode: &str, system: Arc<dyn System>) -> Result<(), AutomatonError> {
        if self.state != AutomatonState::Unbound {
            return Err(AutomatonError::AlreadyRunning);
        }
        if !self.modes.contains_key(start_mode) {
            return Err(AutomatonError::UnresolvedReference {
                path: format!("HybridAutomaton({})", self.name),
                reference: start_mode.to_string(),
            });
        }
        for switch in self.switches.values() {
            if !self.modes.contains_key(switch.source()) {
                return Err(AutomatonError::UnresolvedReference {
                    path: format!("ControlSwitch({})", switch.name()),
                    reference: switch.source().to_string(),
                });
            }
            if !self.modes.contains_key(switch.target()) {
                return Err(AutomatonError::UnresolvedReference {
                    path: format!("ControlSwitch({})", switch.name()),
                    reference: switch.target().to_string(),
                });
            }
        }
        self.system = Some(system);
        self.current_mode = Some(start_mode.to_string());
        self.state = AutomatonState::Armed;
        log::debug!("automaton {:?} armed with start mode {start_mode:?}", self.name);
        Ok(())
    }

    pub fn halt(&mut self) {
        self.state = AutomatonState::Halted;
    }

    /// The current mode's composed command, or the zero-sized command if no
    /// tick has yet succeeded.
    pub fn get_command(&self) -> Matrix {
        self.last_command.clone()
    }

    fn outgoing_switch_names(&self, mode_name: &str) -> Vec<String> {
        self.switches
            .values()
            .filter(|s| s.source() == mode_name)
            .map(|s| s.name().to_string())
            .collect()
    }

    fn activate_mode(&mut self, mode_name: &str, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
        {
            let mode = self.modes.get_mut(mode_name).ok_or_else(|| AutomatonError::UnresolvedReference {
                path: format!("HybridAutomaton({})", self.name),
                reference: mode_name.to_string(),
            })?;
            mode.activate(ctx)?;
        }
        for name in self.outgoing_switch_names(mode_name) {
            if let Some(switch) = self.switches.get_mut(&name) {
                switch.activate(ctx);
            }
        }
        Ok(())
    }

    fn deactivate_mode(&mut self, mode_name: &str) {
        if let Some(mode) = self.modes.get_mut(mode_name) {
            mode.deactivate();
        }
        for name in self.outgoing_switch_names(mode_name) {
            if let Some(switch) = self.switches.get_mut(&name) {
                switch.deactivate();
            }
        }
    }

    /// Advances the automaton by one tick (§4.8). Non-monotonic `t` is
    /// rejected regardless of strict/tolerant policy. A runtime error from a
    /// controller/sensor/switch either propagates and halts the engine
    /// (`strict`) or is logged and absorbed, leaving `get_command()` at its
    /// last successful value (`tolerant`).
    pub fn tick(&mut self, t: f64) -> Result<(), AutomatonError> {
        if self.state == AutomatonState::Halted {
            return Err(AutomatonError::Halted);
        }
        if self.state == AutomatonState::Unbound {
            return Err(AutomatonError::NotArmed);
        }
        if let Some(previous) = self.last_t {
            if t < previous {
                return Err(AutomatonError::NonMonotonicTime { previous, t });
            }
        }
        self.last_t = Some(t);

        let system = self.system.clone().ok_or(AutomatonError::NotArmed)?;

        let result = (|| {
            if self.state == AutomatonState::Armed {
                self.start_time = Some(t);
                self.state = AutomatonState::Running;
                let ctx = RuntimeContext {
                    t,
                    elapsed: 0.0,
                    system: system.as_ref(),
                };
                let mode_name = self.current_mode.clone().ok_or(AutomatonError::NotArmed)?;
                self.activate_mode(&mode_name, &ctx)?;
            }
            self.step_once(t, system.as_ref())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(err) if self.strict => {
                self.state = AutomatonState::Halted;
                Err(err)
            }
            Err(err) => {
                log::warn!("tick absorbed in tolerant mode: {err}");
                Ok(())
            }
        }
    }

    fn step_once(&mut self, t: f64, system: &dyn System) -> Result<(), AutomatonError> {
        let elapsed = t - self.start_time.unwrap_or(t);
        let ctx = RuntimeContext { t, elapsed, system };
        let mode_name = self.current_mode.clone().ok_or(AutomatonError::NotArmed)?;

        {
            let mode = self.modes.get_mut(&mode_name).ok_or_else(|| AutomatonError::UnresolvedReference {
                path: format!("HybridAutomaton({})", self.name),
                reference: mode_name.clone(),
            })?;
            mode.step(&ctx)?;
        }

        let outgoing = self.outgoing_switch_names(&mode_name);
        for name in &outgoing {
            if let Some(switch) = self.switches.get_mut(name) {
                switch.step(&ctx)?;
            }
        }

        let fired = outgoing
            .iter()
            .find(|name| self.switches.get(*name).map(|s| s.is_active()).unwrap_or(false))
            .cloned();

        if let Some(switch_name) = fired {
            let target = self.switches.get(&switch_name).unwrap().target().to_string();
            log::info!("switch {switch_name:?} fired at t={t}: {mode_name:?} -> {target:?}");
            self.deactivate_mode(&mode_name);
            self.current_mode = Some(target.clone());
            self.activate_mode(&target, &ctx)?;
        }

        let current = self.current_mode.clone().unwrap();
        self.last_command = self
            .modes
            .get(&current)
            .ok_or_else(|| AutomatonError::UnresolvedReference {
                path: format!("HybridAutomaton({})", self.name),
                reference: current.clone(),
            })?
            .get_command();
        Ok(())
    }

    pub fn serialize(&self) -> DescriptionNode {
        let mut node = DescriptionNode::new("HybridAutomaton");
        node.set_attribute("name", self.name.clone());
        if let Some(current) = &self.current_mode {
            node.set_attribute("current_control_mode", current.clone());
        }
        node.set_bool("strict", self.strict);
        for mode in self.modes.values() {
            node.add_child(mode.serialize());
        }
        for switch in self.switches.values() {
            node.add_child(switch.serialize());
        }
        node
    }

    /// Builds, validates and arms an automaton from a description tree in
    /// one step. No partially-built automaton is ever returned on an `Err`
    /// path (§7).
    pub fn deserialize(node: &DescriptionNode, system: Arc<dyn System>, registry: &Registry) -> Result<Self, AutomatonError> {
        let name = node.require_attribute("name")?.to_string();
        let strict = node.get_bool("strict")?.unwrap_or(true);
        let start_mode = node.require_attribute("current_control_mode")?.to_string();

        let mut automaton = HybridAutomaton::new(name);
        automaton.strict = strict;

        for child in node.children_of_type("ControlMode") {
            let mode = ControlMode::deserialize(child, system.as_ref(), registry)?;
            automaton.add_mode(mode)?;
        }
        for child in node.children_of_type("ControlSwitch") {
            let mut switch = ControlSwitch::blank();
            switch.deserialize(child)?;
            automaton.add_switch(switch)?;
        }

        automaton.arm(&start_mode, system)?;
        Ok(automaton)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_set::composition::SerialNullSpace;
    use crate::control_set::ControlSet;
    use crate::controllers::Controller;
    use crate::jump_condition::{JumpCondition, Norm};
    use crate::matrix::vector;
    use crate::sensors::{ConstantSensor, JointConfigurationSensor};
    use crate::testing::MockSystem;

    fn two_mode_automaton(epsilon: f64, dwell: f64) -> HybridAutomaton {
        let mut automaton = HybridAutomaton::new("demo");
        automaton.add_mode(ControlMode::new("CM1", Box::new(SerialNullSpace::blank()))).unwrap();
        automaton.add_mode(ControlMode::new("CM2", Box::new(SerialNullSpace::blank()))).unwrap();

        let mut switch = ControlSwitch::new("S", "CM1", "CM2");
        switch.add_condition(JumpCondition::new(
            Box::new(JointConfigurationSensor),
            Box::new(ConstantSensor::new(vector(&[1.0, 1.0, 1.0]))),
            Norm::LInf,
            vector(&[0.1]),
            false,
            dwell,
        ));
        let _ = epsilon;
        automaton.add_switch(switch).unwrap();
        automaton
    }

    #[test]
    fn minimal_two_mode_automaton_transitions_on_tick_three() {
        let mut automaton = two_mode_automaton(0.1, 0.0);
        let readings = [
            vector(&[0.0, 0.0, 0.0]),
            vector(&[0.0, 0.0, 0.0]),
            vector(&[1.0, 1.0, 1.0]),
            vector(&[1.0, 1.0, 1.0]),
        ];
        let system: Arc<dyn System> = Arc::new(MockSystem::new(3));
        automaton.arm("CM1", system).unwrap();

        for (i, reading) in readings.iter().enumerate() {
            let t = (i + 1) as f64;
            automaton.system = Some(Arc::new(MockSystem::new(3).with_configuration(reading.clone())));
            automaton.tick(t).unwrap();
            if i < 2 {
                assert_eq!(automaton.current_mode_name(), Some("CM1"));
            }
        }
        assert_eq!(automaton.current_mode_name(), Some("CM2"));
    }

    #[test]
    fn dwell_debouncing_delays_transition_to_tick_ten() {
        let mut automaton = two_mode_automaton(0.1, 0.5);
        let system: Arc<dyn System> = Arc::new(MockSystem::new(3));
        automaton.arm("CM1", system).unwrap();

        let reading_at = |tick: usize| -> Matrix {
            match tick {
                3 => vector(&[1.0, 1.0, 1.0]),
                4 => vector(&[5.0, 5.0, 5.0]),
                _ => vector(&[1.0, 1.0, 1.0]),
            }
        };

        for tick in 1..=10 {
            let t = tick as f64 * 0.1;
            automaton.system = Some(Arc::new(MockSystem::new(3).with_configuration(reading_at(tick))));
            automaton.tick(t).unwrap();
            if tick < 10 {
                assert_eq!(automaton.current_mode_name(), Some("CM1"), "tick {tick}");
            }
        }
        assert_eq!(automaton.current_mode_name(), Some("CM2"));
    }

    #[test]
    fn unresolved_switch_target_fails_deserialization() {
        let mut node = DescriptionNode::new("HybridAutomaton");
        node.set_attribute("name", "demo");
        node.set_attribute("current_control_mode", "CM1");

        let mut cm1 = DescriptionNode::new("ControlMode");
        cm1.set_attribute("name", "CM1");
        let mut control_set = DescriptionNode::new("ControlSet");
        control_set.set_attribute("type", "SerialNullSpace");
        control_set.set_attribute("name", "cs1");
        cm1.add_child(control_set);
        node.add_child(cm1);

        let mut switch = DescriptionNode::new("ControlSwitch");
        switch.set_attribute("name", "S");
        switch.set_attribute("source", "CM1");
        switch.set_attribute("target", "Fantasia");
        node.add_child(switch);

        let system: Arc<dyn System> = Arc::new(MockSystem::new(0));
        let err = crate::registry::with_global_registry(|registry| HybridAutomaton::deserialize(&node, system, registry)).unwrap_err();
        assert!(matches!(err, AutomatonError::UnresolvedReference { .. }));
    }

    #[test]
    fn non_monotonic_time_is_rejected() {
        let mut automaton = two_mode_automaton(0.1, 0.0);
        let system: Arc<dyn System> = Arc::new(MockSystem::new(3));
        automaton.arm("CM1", system).unwrap();
        automaton.tick(1.0).unwrap();
        let err = automaton.tick(0.5).unwrap_err();
        assert!(matches!(err, AutomatonError::NonMonotonicTime { .. }));
    }

    #[test]
    fn strict_mode_halts_on_controller_error() {
        #[derive(Debug)]
        struct FailingControlSet;
        impl ControlSet for FailingControlSet {
            fn activate(&mut self, _ctx: &RuntimeContext) -> Result<(), AutomatonError> {
                Ok(())
            }
            fn deactivate(&mut self) {}
            fn step(&mut self, _ctx: &RuntimeContext) -> Result<(), AutomatonError> {
                Err(AutomatonError::SystemError("plant fault".to_string()))
            }
            fn get_command(&self) -> Matrix {
                Matrix::zeros(0, 1)
            }
            fn add_controller(&mut self, _c: Box<dyn Controller>, _p: i64, _g: bool) -> Result<(), AutomatonError> {
                Ok(())
            }
            fn get_controllers(&self) -> &[crate::control_set::ControllerEntry] {
                &[]
            }
            fn control_set_type(&self) -> &'static str {
                "FailingControlSet"
            }
            fn name(&self) -> &str {
                "cs"
            }
            fn serialize(&self) -> DescriptionNode {
                DescriptionNode::new("ControlSet")
            }
            fn deserialize(&mut self, _n: &DescriptionNode, _s: &dyn System, _r: &Registry) -> Result<(), AutomatonError> {
                Ok(())
            }
        }

        let mut automaton = HybridAutomaton::new("demo");
        automaton.add_mode(ControlMode::new("CM1", Box::new(FailingControlSet))).unwrap();
        let system: Arc<dyn System> = Arc::new(MockSystem::new(0));
        automaton.arm("CM1", system).unwrap();
        let err = automaton.tick(1.0).unwrap_err();
        assert!(matches!(err, AutomatonError::SystemError(_)));
        assert_eq!(automaton.state(), AutomatonState::Halted);
    }

    #[derive(Debug)]
    struct FailingActivateControlSet;
    impl ControlSet for FailingActivateControlSet {
        fn activate(&mut self, _ctx: &RuntimeContext) -> Result<(), AutomatonError> {
            Err(AutomatonError::ShapeMismatch {
                path: "cs".to_string(),
                reason: "goal row count mismatch".to_string(),
            })
        }
        fn deactivate(&mut self) {}
        fn step(&mut self, _ctx: &RuntimeContext) -> Result<(), AutomatonError> {
            Ok(())
        }
        fn get_command(&self) -> Matrix {
            Matrix::zeros(0, 1)
        }
        fn add_controller(&mut self, _c: Box<dyn Controller>, _p: i64, _g: bool) -> Result<(), AutomatonError> {
            Ok(())
        }
        fn get_controllers(&self) -> &[crate::control_set::ControllerEntry] {
            &[]
        }
        fn control_set_type(&self) -> &'static str {
            "FailingActivateControlSet"
        }
        fn name(&self) -> &str {
            "cs"
        }
        fn serialize(&self) -> DescriptionNode {
            DescriptionNode::new("ControlSet")
        }
        fn deserialize(&mut self, _n: &DescriptionNode, _s: &dyn System, _r: &Registry) -> Result<(), AutomatonError> {
            Ok(())
        }
    }

    #[test]
    fn strict_mode_halts_when_initial_mode_activation_fails() {
        let mut automaton = HybridAutomaton::new("demo");
        automaton
            .add_mode(ControlMode::new("CM1", Box::new(FailingActivateControlSet)))
            .unwrap();
        let system: Arc<dyn System> = Arc::new(MockSystem::new(0));
        automaton.arm("CM1", system).unwrap();

        let err = automaton.tick(1.0).unwrap_err();
        assert!(matches!(err, AutomatonError::ShapeMismatch { .. }));
        assert_eq!(automaton.state(), AutomatonState::Halted);
    }

    #[test]
    fn tolerant_mode_absorbs_initial_mode_activation_failure() {
        let mut automaton = HybridAutomaton::new("demo");
        automaton
            .add_mode(ControlMode::new("CM1", Box::new(FailingActivateControlSet)))
            .unwrap();
        automaton.set_strict(false);
        let system: Arc<dyn System> = Arc::new(MockSystem::new(0));
        automaton.arm("CM1", system).unwrap();

        automaton.tick(1.0).unwrap();
        assert_eq!(automaton.state(), AutomatonState::Running);
        assert_eq!(automaton.get_command(), Matrix::zeros(0, 1));
    }
}

/*!
The three composition policies named in §4.5. Each orders its controllers
by descending priority (ties in stable insertion order) and decides, per
degree of freedom, which controller's command value wins. Since the opaque
`System` (§6) exposes no Jacobian or null-space projector, "claiming" a
degree of freedom here means "this controller's command has a non-zero
entry there" rather than a true kinematic null-space projection — the spec
requires only the externally observable behavior in §8 scenario 4, which
this satisfies.
*/

use crate::context::RuntimeContext;
use crate::controllers::Controller;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;
use crate::registry::Registry;
use crate::system::System;

use super::{ControlSet, ControlSetCore, ControllerEntry};

/// Descending-priority order, stable on ties (insertion order preserved).
fn priority_order(entries: &[ControllerEntry]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| entries[b].priority.cmp(&entries[a].priority));
    order
}

fn dof_from(entries: &[ControllerEntry], fallback: &Matrix, path: &str) -> Result<usize, AutomatonError> {
    let mut dof = fallback.nrows();
    for entry in entries {
        let rows = entry.controller.get_command().nrows();
        if dof == 0 {
            dof = rows;
        } else if rows != 0 && rows != dof {
            return Err(AutomatonError::ShapeMismatch {
                path: path.to_string(),
                reason: format!("controller {:?} commands {rows} rows, expected {dof}", entry.controller.name()),
            });
        }
    }
    Ok(dof)
}

/// Default multi-objective policy: each higher-priority controller claims
/// the degrees of freedom where its command is non-zero; the first
/// lower-priority controller to have a non-zero entry on a still-unclaimed
/// degree of freedom fills it.
fn serial_null_space(entries: &[ControllerEntry], null_motion: &Matrix, path: &str) -> Result<Matrix, AutomatonError> {
    let dof = dof_from(entries, null_motion, path)?;
    let mut combined = Matrix::zeros(dof, 1);
    let mut claimed = vec![false; dof];
    for &i in &priority_order(entries) {
        let command = entries[i].controller.get_command();
        for row in 0..dof.min(command.nrows()) {
            if !claimed[row] && command[(row, 0)] != 0.0 {
                combined[(row, 0)] = command[(row, 0)];
                claimed[row] = true;
            }
        }
    }
    Ok(combined)
}

/// Approximates a weighted stacking of tasks: the single highest-priority
/// controller claims whichever degrees of freedom its command is non-zero
/// on, fixing them to its value; every other controller — regardless of
/// priority relative to one another — contributes additively to any
/// degree of freedom the top controller left unclaimed.
fn task_priority(entries: &[ControllerEntry], null_motion: &Matrix, path: &str) -> Result<Matrix, AutomatonError> {
    let dof = dof_from(entries, null_motion, path)?;
    let mut combined = Matrix::zeros(dof, 1);
    let mut claimed = vec![false; dof];
    for (rank, &i) in priority_order(entries).iter().enumerate() {
        let command = entries[i].controller.get_command();
        for row in 0..dof.min(command.nrows()) {
            if claimed[row] {
                continue;
            }
            let value = command[(row, 0)];
            if value == 0.0 {
                continue;
            }
            combined[(row, 0)] += value;
            // Only the top-priority controller's own writes claim a dof;
            // every lower-priority controller always contributes.
            if rank == 0 {
                claimed[row] = true;
            }
        }
    }
    Ok(combined)
}

/// As `TaskPriority`, but lower-priority contributions on degrees of
/// freedom already claimed by a higher-priority tier are damped, an
/// approximation of a damped-least-squares inverse's singularity-robust
/// blending.
const DAMPING_FACTOR: f64 = 0.2;

fn nakamura(entries: &[ControllerEntry], null_motion: &Matrix, path: &str) -> Result<Matrix, AutomatonError> {
    let dof = dof_from(entries, null_motion, path)?;
    let mut combined = Matrix::zeros(dof, 1);
    let mut claim_tier = vec![i64::MAX; dof];
    for &i in &priority_order(entries) {
        let command = entries[i].controller.get_command();
        let priority = entries[i].priority;
        for row in 0..dof.min(command.nrows()) {
            let value = command[(row, 0)];
            if value == 0.0 {
                continue;
            }
            if claim_tier[row] == i64::MAX {
                combined[(row, 0)] = value;
                claim_tier[row] = priority;
            } else if priority < claim_tier[row] {
                combined[(row, 0)] += value * DAMPING_FACTOR;
            }
        }
    }
    Ok(combined)
}

macro_rules! composition_control_set {
    ($name:ident, $type_tag:literal, $compose:path) => {
        #[derive(Debug)]
        pub struct $name {
            core: ControlSetCore,
        }

        impl $name {
            pub fn blank() -> Self {
                Self {
                    core: ControlSetCore::blank(),
                }
            }
        }

        impl ControlSet for $name {
            fn activate(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
                self.core.activate(ctx)
            }

            fn deactivate(&mut self) {
                self.core.deactivate()
            }

            fn step(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError> {
                self.core.step(ctx)
            }

            fn get_command(&self) -> Matrix {
                let null_motion = self.core.null_motion_command();
                let path = format!("{}({})", $type_tag, self.core.name());
                $compose(self.core.entries(), &null_motion, &path).unwrap_or(null_motion)
            }

            fn add_controller(
                &mut self,
                controller: Box<dyn Controller>,
                priority: i64,
                is_goal_controller: bool,
            ) -> Result<(), AutomatonError> {
                self.core.add_controller(controller, priority, is_goal_controller)
            }

            fn get_controllers(&self) -> &[ControllerEntry] {
                self.core.entries()
            }

            fn control_set_type(&self) -> &'static str {
                $type_tag
            }

            fn name(&self) -> &str {
                self.core.name()
            }

            fn serialize(&self) -> DescriptionNode {
                let mut node = DescriptionNode::new("ControlSet");
                node.set_attribute("type", $type_tag);
                self.core.serialize_into(&mut node);
                node
            }

            fn deserialize(
                &mut self,
                node: &DescriptionNode,
                system: &dyn System,
                registry: &Registry,
            ) -> Result<(), AutomatonError> {
                self.core.deserialize(node, system, registry)
            }
        }
    };
}

composition_control_set!(SerialNullSpace, "SerialNullSpace", serial_null_space);
composition_control_set!(TaskPriority, "TaskPriority", task_priority);
composition_control_set!(Nakamura, "Nakamura", nakamura);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSystem;

    #[derive(Debug)]
    struct FixedCommand {
        name: String,
        command: Matrix,
    }

    impl Controller for FixedCommand {
        fn activate(&mut self, _ctx: &RuntimeContext) -> Result<(), AutomatonError> {
            Ok(())
        }
        fn deactivate(&mut self) {}
        fn step(&mut self, _ctx: &RuntimeContext) -> Result<(), AutomatonError> {
            Ok(())
        }
        fn get_command(&self) -> Matrix {
            self.command.clone()
        }
        fn get_goal(&self) -> Matrix {
            self.command.clone()
        }
        fn set_goal(&mut self, goal: Matrix) {
            self.command = goal;
        }
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
            "FixedCommand"
        }
        fn name(&self) -> &str {
            &self.name
        }
        fn serialize(&self) -> DescriptionNode {
            DescriptionNode::new("Controller")
        }
        fn deserialize(&mut self, _node: &DescriptionNode, _system: &dyn System) -> Result<(), AutomatonError> {
            Ok(())
        }
    }

    fn fixed(name: &str, values: &[f64]) -> Box<dyn Controller> {
        Box::new(FixedCommand {
            name: name.to_string(),
            command: Matrix::from_column_slice(values.len(), 1, values),
        })
    }

    #[test]
    fn serial_null_space_lets_high_priority_dominate_and_low_priority_fill() {
        let mut set = SerialNullSpace::blank();
        set.add_controller(fixed("high", &[1.0, 0.0, 0.0, 0.0]), 10, false)
            .unwrap();
        set.add_controller(fixed("low", &[0.0, 2.0, 0.0, 0.0]), 1, false)
            .unwrap();

        let system = MockSystem::new(4);
        let ctx = RuntimeContext {
            t: 0.0,
            elapsed: 0.0,
            system: &system,
        };
        set.activate(&ctx).unwrap();
        set.step(&ctx).unwrap();

        assert_eq!(set.get_command(), Matrix::from_column_slice(4, 1, &[1.0, 2.0, 0.0, 0.0]));
    }

    #[test]
    fn equal_priority_composes_in_insertion_order() {
        let mut set = SerialNullSpace::blank();
        set.add_controller(fixed("first", &[1.0]), 5, false).unwrap();
        set.add_controller(fixed("second", &[2.0]), 5, false).unwrap();

        let system = MockSystem::new(1);
        let ctx = RuntimeContext {
            t: 0.0,
            elapsed: 0.0,
            system: &system,
        };
        set.activate(&ctx).unwrap();
        set.step(&ctx).unwrap();
        assert_eq!(set.get_command(), Matrix::from_column_slice(1, 1, &[1.0]));
    }

    #[test]
    fn duplicate_controller_names_are_rejected() {
        let mut set = SerialNullSpace::blank();
        set.add_controller(fixed("dup", &[1.0]), 1, false).unwrap();
        let err = set.add_controller(fixed("dup", &[2.0]), 2, false).unwrap_err();
        assert!(matches!(err, AutomatonError::DuplicateName { .. }));
    }

    #[test]
    fn task_priority_sums_unclaimed_lower_priority_contributions() {
        let mut set = TaskPriority::blank();
        set.add_controller(fixed("high", &[1.0, 0.0]), 10, false).unwrap();
        set.add_controller(fixed("mid", &[0.0, 2.0]), 5, false).unwrap();
        set.add_controller(fixed("low", &[0.0, 3.0]), 1, false).unwrap();

        let system = MockSystem::new(2);
        let ctx = RuntimeContext {
            t: 0.0,
            elapsed: 0.0,
            system: &system,
        };
        set.activate(&ctx).unwrap();
        set.step(&ctx).unwrap();
        assert_eq!(set.get_command(), Matrix::from_column_slice(2, 1, &[1.0, 5.0]));
    }

    #[test]
    fn nakamura_damps_lower_priority_contributions_on_claimed_dofs() {
        let mut set = Nakamura::blank();
        set.add_controller(fixed("high", &[1.0]), 10, false).unwrap();
        set.add_controller(fixed("low", &[1.0]), 1, false).unwrap();

        let system = MockSystem::new(1);
        let ctx = RuntimeContext {
            t: 0.0,
            elapsed: 0.0,
            system: &system,
        };
        set.activate(&ctx).unwrap();
        set.step(&ctx).unwrap();
        assert_eq!(set.get_command(), Matrix::from_column_slice(1, 1, &[1.0 + DAMPING_FACTOR]));
    }
}

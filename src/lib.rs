/*!
Hybrid-automaton execution engine for robot control: a mode graph whose
vertices bind control sets and whose guarded edges fire discrete mode
transitions, driven by an externally-supplied tick clock. See each module
for its part of the contract; [`automaton::HybridAutomaton`] is the
top-level entry point and [`registry::with_global_registry`] the usual way
to obtain a populated [`registry::Registry`] for deserialization.
*/

pub mod automaton;
pub mod blackboard;
pub mod config;
pub mod context;
pub mod control_set;
pub mod control_switch;
pub mod controllers;
pub mod description_tree;
pub mod errors;
pub mod jump_condition;
pub mod logger;
pub mod matrix;
pub mod mode;
pub mod registry;
pub mod sensors;
pub mod system;
pub mod testing;

pub use automaton::{AutomatonState, HybridAutomaton};
pub use context::RuntimeContext;
pub use description_tree::DescriptionNode;
pub use errors::{AutomatonError, Result};
pub use registry::Registry;
pub use system::{BodyHandle, System};

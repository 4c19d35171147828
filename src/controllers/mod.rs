/*!
Opaque behaviors computing a control command (§4.4). Grounded on the
teacher's `Controller` trait (`src/controllers/controller.rs`) and the
concrete shape of `src/controllers/pid.rs` (config/gains/internal
interpolation state), generalized so the engine can reconstruct any
registered concrete type from a description tree rather than matching a
closed config enum.
*/

pub mod null_motion;
pub mod setpoint;

use crate::context::RuntimeContext;
use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;
use crate::matrix::Matrix;
use crate::system::System;

/// A behavior computing a command from a goal, gains and timing, per §4.4.
///
/// The engine assumes `step` is pure with respect to its inputs except for
/// the controller's own interpolator state, and that `get_command` is
/// idempotent between steps.
pub trait Controller: std::fmt::Debug + Send + Sync {
    /// Called once when the owning control set becomes active. Resolves a
    /// relative goal against the pose read from `ctx.system` at this
    /// instant (§4.4, §9 "Goal-relative controllers").
    fn activate(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError>;

    fn deactivate(&mut self);

    fn step(&mut self, ctx: &RuntimeContext) -> Result<(), AutomatonError>;

    fn get_command(&self) -> Matrix;

    fn get_goal(&self) -> Matrix;

    /// Sets the goal. If the controller was constructed with
    /// `goal_is_relative`, the matrix passed here is the absolute goal only
    /// once `activate` has resolved it; before that it is interpreted as an
    /// offset.
    fn set_goal(&mut self, goal: Matrix);

    fn get_kp(&self) -> Matrix;
    fn set_kp(&mut self, kp: Matrix);

    fn get_kv(&self) -> Matrix;
    fn set_kv(&mut self, kv: Matrix);

    fn get_completion_times(&self) -> &[f64];

    /// The type tag used for registry dispatch and serialization.
    fn controller_type(&self) -> &'static str;

    /// Name, unique within the owning control set.
    fn name(&self) -> &str;

    fn serialize(&self) -> DescriptionNode;

    /// Populates `self` from `node`. Called once, right after the registry
    /// builds a blank instance (§4.1, §4.5).
    fn deserialize(&mut self, node: &DescriptionNode, system: &dyn System) -> Result<(), AutomatonError>;
}

/// Shared parsing of the attributes every concrete controller carries
/// (§6): `name`, `goal`, `goal_is_relative`, `kp`, `kv`, `completion_times`.
/// Concrete controllers call this from their own `deserialize` and then
/// read any type-specific attributes themselves.
pub(crate) struct CommonFields {
    pub name: String,
    pub goal: Matrix,
    pub goal_is_relative: bool,
    pub kp: Matrix,
    pub kv: Matrix,
    pub completion_times: Vec<f64>,
}

pub(crate) fn parse_common_fields(node: &DescriptionNode) -> Result<CommonFields, AutomatonError> {
    let name = node.require_attribute("name")?.to_string();
    let goal = node.require_matrix("goal")?;
    let goal_is_relative = node.get_bool("goal_is_relative")?.unwrap_or(false);
    let kp = node.require_matrix("kp")?;
    let kv = node.require_matrix("kv")?;
    let completion_times = match node.get_attribute("completion_times") {
        Some(text) => parse_completion_times(node, text)?,
        None => Vec::new(),
    };
    if !is_monotonic(&completion_times) {
        return Err(AutomatonError::ParseError {
            path: format!("Controller({name})"),
            reason: "completion_times must be monotonically non-decreasing".to_string(),
        });
    }
    Ok(CommonFields {
        name,
        goal,
        goal_is_relative,
        kp,
        kv,
        completion_times,
    })
}

fn parse_completion_times(node: &DescriptionNode, text: &str) -> Result<Vec<f64>, AutomatonError> {
    text.split(';')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim().parse::<f64>().map_err(|_| AutomatonError::ParseError {
                path: node.get_type().to_string(),
                reason: format!("completion_times entry {s:?} is not a double"),
            })
        })
        .collect()
}

fn is_monotonic(times: &[f64]) -> bool {
    times.windows(2).all(|w| w[0] <= w[1])
}

pub(crate) fn serialize_common_fields(node: &mut DescriptionNode, fields: &CommonFields) {
    node.set_attribute("name", fields.name.clone());
    node.set_matrix("goal", &fields.goal);
    node.set_bool("goal_is_relative", fields.goal_is_relative);
    node.set_matrix("kp", &fields.kp);
    node.set_matrix("kv", &fields.kv);
    let completion_times = fields
        .completion_times
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(";");
    node.set_attribute("completion_times", completion_times);
}

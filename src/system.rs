/*!
The `System` collaborator (§6): the opaque robot abstraction that sensors
read from and that controllers drive indirectly through the commands this
engine computes. The engine only ever reads it.
*/

use crate::errors::AutomatonError;
use crate::matrix::Matrix;

/// Opaque handle to a rigid body found by name, as returned by
/// [`System::find_body`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub usize);

/// The small query surface the engine needs from the robot abstraction.
///
/// Forward/inverse kinematics, dynamics and rigid-body queries themselves
/// are out of scope (§1); this trait only names the read-only queries
/// sensors and controllers are specified to make.
pub trait System: Send + Sync {
    /// Number of actuated degrees of freedom.
    fn dof(&self) -> usize;

    /// Current joint configuration, `(dof × 1)`.
    fn get_configuration(&self) -> Matrix;

    /// Pose of the named frame as a `(4 × 4)` homogeneous transform.
    fn get_frame_pose(&self, frame: &str) -> Result<Matrix, AutomatonError>;

    /// Current wrench, `(6 × 1)`.
    fn get_force_torque(&self) -> Matrix;

    /// Current time as seen by the plant (not necessarily the tick's `t`).
    fn get_current_time(&self) -> f64;

    /// Looks up a rigid body by name.
    fn find_body(&self, name: &str) -> Result<BodyHandle, AutomatonError>;
}

/*!
The per-tick context threaded through controllers, control sets, sensors and
jump conditions, so every one of them sees the same `t` and the same
`System` handle without each defining its own parameter list.
*/

use crate::system::System;

/// Snapshot of "where we are" for one `activate`/`step` call.
pub struct RuntimeContext<'a> {
    /// Monotonic time supplied by the caller of `tick` (§5).
    pub t: f64,
    /// Seconds since the automaton's `Armed` → `Running` transition; the
    /// basis for the `Clock` sensor (§4.3). Zero before that transition.
    pub elapsed: f64,
    pub system: &'a dyn System,
}

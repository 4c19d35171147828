/*!
The out-of-process key/value publish-subscribe collaborator (§5, §9). This
crate defines only the contract a real-time embedder must honor: the engine
thread never blocks, and any lock is held only for a fixed-size buffer swap.
No transport is shipped.
*/

use crate::matrix::Matrix;

/// A try-lock-only exchange of named values with an external process.
///
/// Implementors back `read`/`write` with two independently-locked buffers (one
/// for each direction) so the real-time engine thread and an I/O thread never
/// contend for the same mutex; see §5 "Two mutexes ... neither is held across
/// I/O".
pub trait Blackboard: Send + Sync {
    /// Attempts to read the named value without blocking. Returns `None`
    /// both when the key is absent and when the read would have blocked.
    fn try_read(&self, key: &str) -> Option<Matrix>;

    /// Attempts to publish `value` under `key` without blocking. Returns
    /// `false` if the write would have blocked; the caller MUST NOT retry
    /// within the same tick (§5 "skips the copy if contended").
    fn try_write(&self, key: &str, value: Matrix) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A single-threaded stand-in exercising the trait contract in tests;
    /// never actually contends, since nothing besides the call itself locks.
    struct InMemoryBlackboard {
        values: Mutex<HashMap<String, Matrix>>,
    }

    impl Blackboard for InMemoryBlackboard {
        fn try_read(&self, key: &str) -> Option<Matrix> {
            self.values.lock().ok()?.get(key).cloned()
        }

        fn try_write(&self, key: &str, value: Matrix) -> bool {
            match self.values.lock() {
                Ok(mut guard) => {
                    guard.insert(key.to_string(), value);
                    true
                }
                Err(_) => false,
            }
        }
    }

    #[test]
    fn round_trips_a_value() {
        let board = InMemoryBlackboard {
            values: Mutex::new(HashMap::new()),
        };
        assert!(board.try_write("goal", Matrix::zeros(1, 1)));
        assert_eq!(board.try_read("goal"), Some(Matrix::zeros(1, 1)));
        assert_eq!(board.try_read("missing"), None);
    }
}

use serde::Serialize;

/// Stage of a timed or typed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Finished,
}

impl Phase {
    pub fn is_running(&self) -> bool {
        *self == Phase::Running
    }
}

/// Generation counter for a session. Timers carry the epoch they were scheduled in,
/// so a restart can tell late firings apart from its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Epoch(u64);

impl Epoch {
    pub fn new() -> Self {
        Self(0)
    }

    /// Returns the following generation; wraps rather than panics.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

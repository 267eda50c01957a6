//! Wall clock abstraction in integer epoch seconds

use chrono::Utc;

/// Source of the current time; every window comparison goes through it
pub trait Clock: Send + Sync {
    /// Current time in epoch seconds
    fn now(&self) -> i64;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

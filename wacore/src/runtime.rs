use futures_util::future::BoxFuture;
use std::time::Duration;

pub type ScheduledTask = BoxFuture<'static, ()>;

/// Runs work after a delay. The driver crate decides what a "task" is
/// (a tokio task, a timer wheel slot, a test queue).
pub trait Scheduler: Send + Sync {
    /// Schedules `task` to start once `delay` has elapsed. Must not block
    /// the caller; a zero delay still runs the task later, not inline.
    fn schedule(&self, delay: Duration, task: ScheduledTask);
}

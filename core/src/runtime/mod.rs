//! Execution model: cooperative per-thread task scheduling, timers,
//! notifiers, and cross-thread handoff (spec.md §4.8, §5, §9 "Global
//! state").
//!
//! Grounded in `original_source/elements/standard/pipeliner.cc`/`.hh` for
//! [`Pipeliner`] and in the scheduling prose of spec.md §4.8 and §5 for
//! [`Scheduler`]/[`TimerWheel`]/[`Notifier`] — FastClick's own task queue
//! (`lib/task.cc`, `lib/routerthread.cc`) is a per-thread ring of `Task*`
//! plus a separate `Timestamp`-keyed heap for timers, the same two-queue
//! split this module keeps.

pub mod notifier;
pub mod pipeliner;
pub mod scheduler;
pub mod task;
pub mod timer;

pub use notifier::Notifier;
pub use pipeliner::Pipeliner;
pub use scheduler::{DriverStop, Scheduler};
pub use task::{TaskContext, TaskId};
pub use timer::TimerWheel;

/// Bundles the one piece of state every worker thread's [`Scheduler`]
/// shares: the driver-stop flag a control-plane handler can raise to ask
/// every thread's scheduler loop to wind down (spec.md §9 "Global state":
/// "the only state shared unconditionally across all threads is the
/// driver-stop flag; everything else — flow tables, FCB pools, per-thread
/// schedulers — is partitioned per thread").
///
/// One `Runtime` is constructed once at startup and a clone of its
/// `DriverStop` handed to each thread's [`Scheduler::new`]; the rest of a
/// thread's state (its `Scheduler`, `ElementGraph`, FCB pool, flow table)
/// stays thread-local and is not part of this struct.
#[derive(Clone, Default)]
pub struct Runtime {
    stop: DriverStop,
}

impl Runtime {
    pub fn new() -> Self {
        Runtime::default()
    }

    pub fn driver_stop(&self) -> DriverStop {
        self.stop.clone()
    }

    /// Builds a scheduler for one worker thread, wired to this runtime's
    /// shared driver-stop flag.
    pub fn new_scheduler(&self) -> Scheduler {
        Scheduler::new(self.stop.clone())
    }

    pub fn please_stop_driver(&self) {
        self.stop.please_stop_driver();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_flag_is_shared_across_schedulers_built_from_one_runtime() {
        let runtime = Runtime::new();
        let mut scheduler_a = runtime.new_scheduler();
        let scheduler_b = runtime.new_scheduler();

        scheduler_a.spawn(|ctx| {
            ctx.fast_reschedule();
            true
        });
        runtime.please_stop_driver();

        assert_eq!(scheduler_a.run_until_idle(std::time::Instant::now()), 0);
        assert!(scheduler_b.driver_stop().is_stopped());
    }
}

use std::sync::atomic::{AtomicBool, Ordering};

/// Stop signal shared between the [`SchedulerContext`], its handles and
/// the scheduler thread.
///
/// Once raised it stays raised: the scheduler thread finishes the tick
/// it is running and exits.
///
/// [`SchedulerContext`]: crate::SchedulerContext
#[derive(Debug)]
pub(crate) struct Stop(AtomicBool);

/// The stop signal is checked once per tick, there is no need for
/// anything weaker than sequential consistency.
const ORDERING: Ordering = Ordering::SeqCst;

impl Stop {
    pub(crate) fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[inline]
    pub(crate) fn is_raised(&self) -> bool {
        self.0.load(ORDERING)
    }

    /// raise the stop signal, returns `true` if it was not raised already
    #[inline]
    pub(crate) fn raise(&self) -> bool {
        !self.0.swap(true, ORDERING)
    }
}

impl Default for Stop {
    fn default() -> Self {
        Self::new()
    }
}

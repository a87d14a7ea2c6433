/// the tick counter of a [`Scheduler`]
///
/// Incremented once per call to [`Scheduler::advance_with`]. Useful to
/// correlate the log lines of the same tick.
///
/// [`Scheduler`]: crate::scheduler::Scheduler
/// [`Scheduler::advance_with`]: crate::scheduler::Scheduler::advance_with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Round(u64);

impl Round {
    pub const ZERO: Self = Round(0);

    /// get the next round.
    ///
    /// ```
    /// # use prionet_core::scheduler::Round;
    /// let prev = Round::ZERO;
    /// let next = prev.next();
    /// assert!(prev < next);
    /// assert_eq!(next.into_u64(), 1);
    /// ```
    ///
    /// After `u64::MAX` ticks the counter wraps to [`Round::ZERO`]. At the
    /// default tick interval that is billions of years of simulated time.
    #[inline(always)]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    #[inline(always)]
    pub fn into_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

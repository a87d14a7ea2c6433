use std::{cmp::Ordering, fmt, str::FromStr};
use thiserror::Error;

/// Priority class of a [`Packet`].
///
/// The classes are strictly ordered by their [`weight`](Priority::weight):
/// `Critical > High > Medium > Low`. Only [`Priority::Critical`] traffic
/// preempts transmissions that are already in progress, the other classes
/// are ordered but never displace each other.
///
/// ```
/// # use prionet_core::Priority;
/// let p: Priority = "critical".parse().unwrap();
/// assert_eq!(p, Priority::Critical);
/// assert!(Priority::Critical > Priority::Low);
/// assert_eq!(p.to_string(), "CRITICAL");
/// ```
///
/// [`Packet`]: crate::packet::Packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Error returned when parsing an unknown [`Priority`] level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown priority level `{0}', expecting one of CRITICAL, HIGH, MEDIUM or LOW")]
pub struct PriorityParseError(String);

impl Priority {
    /// All the priority levels, from the highest to the lowest.
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// The ranking weight of the priority level.
    ///
    /// | priority | weight |
    /// |----------|--------|
    /// | `Critical` | 4 |
    /// | `High` | 3 |
    /// | `Medium` | 2 |
    /// | `Low` | 1 |
    #[inline]
    pub const fn weight(self) -> u8 {
        match self {
            Self::Critical => 4,
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    /// How many retries a packet of this priority gets before being dropped.
    ///
    /// This is fixed once, when the packet is built.
    #[inline]
    pub const fn max_retries(self) -> u32 {
        match self {
            Self::Critical => 5,
            Self::High => 3,
            Self::Medium | Self::Low => 1,
        }
    }

    /// Position of the priority in [`Priority::ALL`].
    #[inline]
    pub(crate) const fn index(self) -> usize {
        (4 - self.weight()) as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight().cmp(&other.weight())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PriorityParseError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights() {
        assert_eq!(Priority::Critical.weight(), 4);
        assert_eq!(Priority::High.weight(), 3);
        assert_eq!(Priority::Medium.weight(), 2);
        assert_eq!(Priority::Low.weight(), 1);
    }

    #[test]
    fn retry_budgets() {
        assert_eq!(Priority::Critical.max_retries(), 5);
        assert_eq!(Priority::High.max_retries(), 3);
        assert_eq!(Priority::Medium.max_retries(), 1);
        assert_eq!(Priority::Low.max_retries(), 1);
    }

    #[test]
    fn total_order() {
        let mut all = vec![
            Priority::Medium,
            Priority::Critical,
            Priority::Low,
            Priority::High,
        ];
        all.sort_by(|a, b| b.cmp(a));
        assert_eq!(all, Priority::ALL);
    }

    #[test]
    fn index_follows_all() {
        for (index, priority) in Priority::ALL.into_iter().enumerate() {
            assert_eq!(priority.index(), index);
        }
    }

    #[test]
    fn parse() {
        assert_eq!("CRITICAL".parse(), Ok(Priority::Critical));
        assert_eq!("high".parse(), Ok(Priority::High));
        assert_eq!(" Medium ".parse(), Ok(Priority::Medium));
        assert_eq!("low".parse(), Ok(Priority::Low));
    }

    #[test]
    fn parse_unknown() {
        let error = "URGENT".parse::<Priority>().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unknown priority level `URGENT', expecting one of CRITICAL, HIGH, MEDIUM or LOW"
        );
        assert!("".parse::<Priority>().is_err());
    }

    #[test]
    fn display_round_trip() {
        for priority in Priority::ALL {
            assert_eq!(priority.to_string().parse(), Ok(priority));
        }
    }
}

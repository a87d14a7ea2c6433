use std::fmt;

/// Lifecycle status of a [`Packet`].
///
/// ```text
///            ┌──────────── preempted ────────────┐
///            ▼                                   │
///  Queued ──────▶ Transmitting ──▶ Transmitted ──┼──▶ Acknowledged
///    ▲               │    │                      │
///    │               │    └──▶ Dropped ◀─────────┘ (retries exhausted)
///    └─── Failed ◀───┘
/// ```
///
/// [`Acknowledged`](PacketStatus::Acknowledged) and
/// [`Dropped`](PacketStatus::Dropped) are terminal.
///
/// [`Packet`]: crate::packet::Packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketStatus {
    /// waiting in the priority queue
    Queued,
    /// occupying the link
    Transmitting,
    /// went over the air, waiting for the acknowledgment
    Transmitted,
    Acknowledged,
    /// the attempt was lost, the packet will be retried
    Failed,
    /// lost with no retry left
    Dropped,
}

impl PacketStatus {
    /// No transition leaves a terminal status.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Acknowledged | Self::Dropped)
    }

    /// The packet made it over the air (regardless of the acknowledgment)
    /// or was given up on.
    #[inline]
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Transmitted | Self::Acknowledged | Self::Dropped)
    }

    /// Whether `self → next` is an edge of the lifecycle.
    pub fn can_transition_to(self, next: Self) -> bool {
        use PacketStatus::*;

        matches!(
            (self, next),
            (Queued, Transmitting)
                | (Transmitting, Queued)
                | (Transmitting, Transmitted)
                | (Transmitting, Failed)
                | (Transmitting, Dropped)
                | (Failed, Queued)
                | (Transmitted, Acknowledged)
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Transmitting => "transmitting",
            Self::Transmitted => "transmitted",
            Self::Acknowledged => "acknowledged",
            Self::Failed => "failed",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for PacketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PacketStatus::*;

    const ALL: [PacketStatus; 6] = [
        Queued,
        Transmitting,
        Transmitted,
        Acknowledged,
        Failed,
        Dropped,
    ];

    #[test]
    fn terminal_states() {
        assert!(Acknowledged.is_terminal());
        assert!(Dropped.is_terminal());
        assert!(!Failed.is_terminal());
        assert!(!Transmitted.is_terminal());
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for next in ALL {
            assert!(!Acknowledged.can_transition_to(next));
            assert!(!Dropped.can_transition_to(next));
        }
    }

    #[test]
    fn failed_only_returns_to_queue() {
        for next in ALL {
            assert_eq!(Failed.can_transition_to(next), next == Queued);
        }
    }

    #[test]
    fn queued_only_starts_transmitting() {
        for next in ALL {
            assert_eq!(Queued.can_transition_to(next), next == Transmitting);
        }
    }
}

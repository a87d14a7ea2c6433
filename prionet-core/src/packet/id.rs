use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// a generator for monotonically increasing **unique** [`PacketId`]
///
/// The generator is cheap to clone and every clone shares the same
/// counter, so handles living on different threads never hand out
/// the same identifier twice.
#[derive(Debug, Clone)]
pub struct PacketIdGenerator(Arc<AtomicU64>);

/// # [`Packet`] Identifier
///
/// Uniquely identifies the packet during its whole lifetime, across
/// retries and preemptions.
///
/// [`Packet`]: crate::packet::Packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketId(u64);

impl PacketIdGenerator {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }

    /// generate a new unique identifier
    pub fn generate(&self) -> PacketId {
        let id = self.0.fetch_add(1, Ordering::SeqCst);

        debug_assert!(
            id != 0,
            "The only case this can be equal to 0 is if the generator overflowed. If this \
            happens it means we have generated `u64::MAX` unique packet identifier and we \
            wrapped around on overflow. This shouldn't happen!"
        );

        PacketId(id)
    }
}

impl Default for PacketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketId {
    /// a _NULL_ packet identifier (i.e. doesn't have a packet to it)
    #[cfg(test)]
    pub(crate) const NULL: Self = Self(0);

    #[inline]
    pub fn into_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_id_null() {
        let null = PacketId::NULL;

        assert_eq!(null, PacketId(0));
        assert_eq!(null.to_string(), "0x0000000000000000");
        assert_eq!(format!("{null:?}"), "PacketId(0)");
    }

    #[test]
    fn generator_starts_at_one() {
        let generator = PacketIdGenerator::new();
        assert_eq!(generator.generate().into_u64(), 1);
        assert_eq!(generator.generate().into_u64(), 2);
    }

    #[test]
    fn clones_share_the_counter() {
        let generator = PacketIdGenerator::new();
        let other = generator.clone();

        let a = generator.generate();
        let b = other.generate();
        let c = generator.generate();

        assert!(a < b && b < c);
    }
}

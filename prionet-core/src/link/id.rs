use anyhow::anyhow;
use std::{fmt, str};

/// Identifier of a simulated link.
///
/// ```
/// # use prionet_core::link::LinkId;
/// let id: LinkId = "3".parse().unwrap();
/// assert_eq!(id, LinkId::new(3));
/// assert_eq!(id.to_string(), "3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LinkId(u64);

impl LinkId {
    pub const ZERO: Self = LinkId::new(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn into_u64(self) -> u64 {
        self.0
    }
}

impl str::FromStr for LinkId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|error| anyhow!("Invalid link identifier `{s}': {error}"))
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

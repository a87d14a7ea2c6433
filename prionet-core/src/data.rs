/// Trait for the payload carried by a [`Packet`].
///
/// The scheduler never looks inside the payload. It only needs to
/// know how many bytes would go over the air so that it can compute
/// how long the transmission occupies the link and how much throughput
/// a successful delivery accounts for.
///
/// [`Packet`]: crate::packet::Packet
pub trait Data: Send + 'static {
    /// return the size of the payload in bytes
    ///
    /// # case for `0` bytes data
    ///
    /// A payload of `0` bytes is a valid control message. Its
    /// transmission still occupies the link for the minimum
    /// transmission duration.
    ///
    fn bytes_size(&self) -> u64;
}

impl Data for () {
    fn bytes_size(&self) -> u64 {
        0
    }
}
impl<const S: usize> Data for [u8; S] {
    fn bytes_size(&self) -> u64 {
        S as u64
    }
}
impl Data for Box<[u8]> {
    fn bytes_size(&self) -> u64 {
        self.len() as u64
    }
}
impl Data for &'static str {
    fn bytes_size(&self) -> u64 {
        self.len() as u64
    }
}
impl Data for &'static [u8] {
    fn bytes_size(&self) -> u64 {
        self.len() as u64
    }
}
impl Data for Vec<u8> {
    fn bytes_size(&self) -> u64 {
        self.len() as u64
    }
}
impl Data for String {
    fn bytes_size(&self) -> u64 {
        self.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void() {
        assert_eq!(().bytes_size(), 0);
    }

    #[test]
    fn array() {
        assert_eq!([0u8; 0].bytes_size(), 0);
        assert_eq!([0u8; 512].bytes_size(), 512);
    }

    #[test]
    fn box_u8() {
        assert_eq!(
            <Box<[u8]> as Data>::bytes_size(&vec![0u8].into_boxed_slice()),
            1
        );
        assert_eq!(
            <Box<[u8]> as Data>::bytes_size(&vec![0u8; 12].into_boxed_slice()),
            12
        );
    }

    #[test]
    fn string_counts_content_only() {
        let mut s = String::with_capacity(1_024);
        s.push_str("hello world!");
        assert_eq!(s.bytes_size(), 12);
    }

    #[test]
    fn static_str_() {
        const STR: &str = "hello world!";

        assert_eq!(STR.bytes_size(), 12);
    }

    #[test]
    fn vec() {
        assert_eq!(Vec::<u8>::new().bytes_size(), 0);
        assert_eq!(vec![0u8; 12].bytes_size(), 12);
    }
}

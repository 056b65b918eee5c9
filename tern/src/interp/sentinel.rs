//! End-of-sequence marker for the iterator protocol
//!
//! `next()` returns [`SENTINEL`] once a sequence is exhausted. The marker has
//! no public constructor, so no script value can ever compare equal to it
//! except the marker itself; checks are a tag comparison on [`Value`].
//!
//! [`Value`]: super::Value

use std::fmt;

/// The exhaustion marker. The only instance is [`SENTINEL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sentinel {
    _private: (),
}

/// The process-wide sentinel
pub const SENTINEL: Sentinel = Sentinel { _private: () };

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<sentinel>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_unique() {
        let a = SENTINEL;
        let b = SENTINEL;
        assert_eq!(a, b);
    }

    #[test]
    fn test_sentinel_is_zero_sized() {
        assert_eq!(std::mem::size_of::<Sentinel>(), 0);
    }

    #[test]
    fn test_sentinel_display() {
        assert_eq!(SENTINEL.to_string(), "<sentinel>");
    }
}

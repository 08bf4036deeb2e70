use std::fmt;

use crate::error::{Result, SparseDataError};

/// A half-open byte range `[start, end)` of a remote resource.
///
/// An interval may instead be open-ended, meaning the bytes from `start` onward are known to be
/// valid but the resource length isn't known yet.  Open-ended intervals still track how many bytes
/// from `start` are currently materialized (the staged length), which starts at zero.
///
/// `start + length` always fits in a `u64`; constructors that would overflow fail with
/// [`SparseDataError::InvalidInterval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    start: u64,
    // Full length when finite, staged length when open-ended.
    length: u64,
    open_ended: bool,
}

impl Interval {
    /// The finite interval `[start, end)`.
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if end < start {
            return Err(SparseDataError::invalid_interval(format!("end {end} is before start {start}")));
        }
        Ok(Self {
            start,
            length: end - start,
            open_ended: false,
        })
    }

    /// The finite interval `[start, start + length)`.
    pub fn from_start_length(start: u64, length: u64) -> Result<Self> {
        checked_end(start, length)?;
        Ok(Self {
            start,
            length,
            open_ended: false,
        })
    }

    /// An open-ended interval starting at `start` with nothing staged yet.
    pub fn open_ended(start: u64) -> Self {
        Self {
            start,
            length: 0,
            open_ended: true,
        }
    }

    /// An open-ended interval starting at `start` with the first `staged_length` bytes materialized.
    pub fn open_ended_with_staged(start: u64, staged_length: u64) -> Result<Self> {
        checked_end(start, staged_length)?;
        Ok(Self {
            start,
            length: staged_length,
            open_ended: true,
        })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// The exclusive end, or `None` if the interval extends to the end of the resource.
    pub fn end(&self) -> Option<u64> {
        (!self.open_ended).then_some(self.start + self.length)
    }

    /// `end - start`, or `None` if open-ended.
    pub fn length(&self) -> Option<u64> {
        (!self.open_ended).then_some(self.length)
    }

    /// Number of bytes a buffer for this interval holds.
    pub fn staged_length(&self) -> u64 {
        self.length
    }

    /// One past the last materialized byte.
    pub fn staged_end(&self) -> u64 {
        self.start + self.length
    }

    pub fn is_open_ended(&self) -> bool {
        self.open_ended
    }

    pub fn is_empty(&self) -> bool {
        !self.open_ended && self.length == 0
    }

    /// Whether `offset` lies inside the interval.  Any offset at or after the start of an
    /// open-ended interval is inside it.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start && (self.open_ended || offset < self.staged_end())
    }

    /// Whether the two intervals overlap or touch with no gap between them.
    pub fn touches(&self, other: &Interval) -> bool {
        self.start <= other.upper_bound() && other.start <= self.upper_bound()
    }

    /// Whether every byte of the interval lies strictly before `offset` with at least one byte of gap.
    pub(crate) fn ends_before(&self, offset: u64) -> bool {
        !self.open_ended && self.staged_end() < offset
    }

    /// Whether every byte of the interval lies before `offset`.
    pub(crate) fn ends_at_or_before(&self, offset: u64) -> bool {
        !self.open_ended && self.staged_end() <= offset
    }

    /// Interval over `[start, staged_end)` built from bounds that already came from valid intervals.
    pub(crate) fn from_staged_bounds(start: u64, staged_end: u64, open_ended: bool) -> Self {
        debug_assert!(start <= staged_end);
        Self {
            start,
            length: staged_end - start,
            open_ended,
        }
    }

    /// Same start, new length and open-ended flag.
    pub(crate) fn resized(&self, new_length: u64, open_ended: bool) -> Result<Self> {
        checked_end(self.start, new_length)?;
        Ok(Self {
            start: self.start,
            length: new_length,
            open_ended,
        })
    }

    // Open-ended intervals compare as reaching u64::MAX.
    fn upper_bound(&self) -> u64 {
        if self.open_ended { u64::MAX } else { self.staged_end() }
    }
}

fn checked_end(start: u64, length: u64) -> Result<u64> {
    start
        .checked_add(length)
        .ok_or_else(|| SparseDataError::invalid_interval(format!("start {start} + length {length} overflows u64")))
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.open_ended {
            write!(f, "[{}, ..) ({} staged)", self.start, self.length)
        } else {
            write!(f, "[{}, {})", self.start, self.staged_end())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_interval() {
        let i = Interval::new(100, 200).unwrap();
        assert_eq!(i.start(), 100);
        assert_eq!(i.end(), Some(200));
        assert_eq!(i.length(), Some(100));
        assert_eq!(i.staged_length(), 100);
        assert!(!i.is_open_ended());
        assert!(i.contains(100));
        assert!(i.contains(199));
        assert!(!i.contains(200));
        assert!(!i.contains(99));
        assert_eq!(i.to_string(), "[100, 200)");
    }

    #[test]
    fn test_invalid_intervals() {
        assert!(matches!(Interval::new(10, 5), Err(SparseDataError::InvalidInterval(_))));
        assert!(Interval::from_start_length(u64::MAX, 1).is_err());
        assert!(Interval::open_ended_with_staged(u64::MAX - 1, 2).is_err());
        assert!(Interval::from_start_length(u64::MAX - 1, 1).is_ok());
    }

    #[test]
    fn test_empty_interval() {
        let i = Interval::new(7, 7).unwrap();
        assert!(i.is_empty());
        assert!(!i.contains(7));
        assert!(!Interval::open_ended(7).is_empty());
    }

    #[test]
    fn test_open_ended_interval() {
        let i = Interval::open_ended(50);
        assert_eq!(i.end(), None);
        assert_eq!(i.length(), None);
        assert_eq!(i.staged_length(), 0);
        assert!(i.contains(50));
        assert!(i.contains(u64::MAX));
        assert!(!i.contains(49));

        let staged = Interval::open_ended_with_staged(50, 10).unwrap();
        assert_eq!(staged.staged_end(), 60);
        assert!(staged.contains(1_000_000));
        assert_eq!(staged.to_string(), "[50, ..) (10 staged)");
    }

    #[test]
    fn test_touches() {
        let a = Interval::new(0, 10).unwrap();
        let adjacent = Interval::new(10, 20).unwrap();
        let overlapping = Interval::new(5, 15).unwrap();
        let separated = Interval::new(11, 20).unwrap();

        assert!(a.touches(&adjacent));
        assert!(adjacent.touches(&a));
        assert!(a.touches(&overlapping));
        assert!(!a.touches(&separated));
        assert!(!separated.touches(&a));

        let open = Interval::open_ended(50);
        assert!(open.touches(&Interval::new(80, 120).unwrap()));
        assert!(open.touches(&Interval::new(40, 50).unwrap()));
        assert!(!open.touches(&Interval::new(0, 30).unwrap()));
    }

    #[test]
    fn test_resized() {
        let i = Interval::new(10, 20).unwrap();
        let grown = i.resized(30, false).unwrap();
        assert_eq!(grown.end(), Some(40));
        let open = i.resized(5, true).unwrap();
        assert!(open.is_open_ended());
        assert_eq!(open.staged_end(), 15);
        assert!(i.resized(u64::MAX, false).is_err());
    }
}

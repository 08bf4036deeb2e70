use std::ops::Range;

use crate::error::{Result, SparseDataError};
use crate::interval::Interval;
use crate::spans;

/// A single contiguous block of resource bytes together with the interval of the resource it came from.
///
/// The buffer always holds exactly `interval.staged_length()` bytes: the full length of a finite
/// interval, or the materialized prefix of an open-ended one.
///
/// An open-ended block built up by merges may have holes: byte ranges inside its staged buffer that
/// no insert has filled yet.  Hole bytes read as zero and are never returned by [`DenseData::read`].
/// Finite blocks never have holes.
#[derive(Debug, PartialEq, Eq)]
pub struct DenseData {
    interval: Interval,
    data: Vec<u8>,
    // Sorted, disjoint, non-touching absolute ranges inside [start, staged_end).
    holes: Vec<Range<u64>>,
}

impl DenseData {
    /// Allocates a zero-filled block covering `interval`.  The caller fills it through
    /// [`DenseData::data_mut`] before handing it to a store.
    ///
    /// Fails with [`SparseDataError::InvalidInterval`] if the buffer can't be allocated.
    pub fn new(interval: Interval) -> Result<Self> {
        let len = buffer_len(&interval, interval.staged_length())?;
        let mut data = Vec::new();
        reserve(&mut data, &interval, interval.staged_length(), true)?;
        data.resize(len, 0);
        Ok(Self {
            interval,
            data,
            holes: Vec::new(),
        })
    }

    /// A finite block holding `data` at `[start, start + data.len())`.
    pub fn from_bytes(start: u64, data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        let interval = Interval::from_start_length(start, data.len() as u64)?;
        Ok(Self {
            interval,
            data,
            holes: Vec::new(),
        })
    }

    /// An open-ended block starting at `start` whose first `staged.len()` bytes are known.
    pub fn open_ended(start: u64, staged: impl Into<Vec<u8>>) -> Result<Self> {
        let data = staged.into();
        let interval = Interval::open_ended_with_staged(start, data.len() as u64)?;
        Ok(Self {
            interval,
            data,
            holes: Vec::new(),
        })
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn start(&self) -> u64 {
        self.interval.start()
    }

    /// `None` while the block is open-ended.
    pub fn length(&self) -> Option<u64> {
        self.interval.length()
    }

    pub fn staged_length(&self) -> u64 {
        self.interval.staged_length()
    }

    /// Bytes of the staged buffer that hold real data, i.e. excluding holes.
    pub fn filled_length(&self) -> u64 {
        self.staged_length() - spans::total_len(&self.holes)
    }

    /// Unfilled ranges inside the staged buffer, in offset order.
    pub fn holes(&self) -> impl Iterator<Item = Interval> + '_ {
        self.holes.iter().map(|h| Interval::from_staged_bounds(h.start, h.end, false))
    }

    pub fn is_open_ended(&self) -> bool {
        self.interval.is_open_ended()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The filled bytes from `offset` up to the next hole or the end of the buffer.
    ///
    /// `None` if `offset` isn't inside the interval or falls in a hole.  For an open-ended block,
    /// offsets past the staged bytes give an empty slice.
    pub fn read(&self, offset: u64) -> Option<&[u8]> {
        if !self.interval.contains(offset) || self.hole_at(offset).is_some() {
            return None;
        }
        let staged_end = self.interval.staged_end();
        let from = offset.min(staged_end);
        let to = self.holes.iter().find(|h| h.start > from).map_or(staged_end, |h| h.start);
        Some(&self.data[(from - self.start()) as usize..(to - self.start()) as usize])
    }

    /// Reallocates the buffer to exactly `new_length` bytes and updates the interval to match.
    ///
    /// Existing bytes up to `min(old, new)` are preserved; bytes exposed by growth are zero and
    /// count as filled.  With `open_ended` set, `new_length` becomes the staged length of an
    /// open-ended interval.  Closing a block that still has holes inside `new_length` fails, as
    /// does a length that can't be allocated; the block is unchanged on failure.
    pub fn resize(&mut self, new_length: u64, open_ended: bool) -> Result<()> {
        let interval = self.interval.resized(new_length, open_ended)?;
        let new_end = interval.staged_end();

        if !open_ended && self.holes.iter().any(|h| h.start < new_end) {
            return Err(SparseDataError::invalid_interval(format!(
                "cannot close {} with unfilled byte ranges",
                self.interval
            )));
        }

        let new_len = buffer_len(&interval, new_length)?;
        let shrinking = new_len < self.data.len();
        if !shrinking {
            reserve(&mut self.data, &interval, new_length, false)?;
        }
        self.data.resize(new_len, 0);
        if shrinking {
            self.data.shrink_to_fit();
        }

        self.holes.retain(|h| h.start < new_end);
        if let Some(last) = self.holes.last_mut() {
            last.end = last.end.min(new_end);
        }
        self.interval = interval;
        Ok(())
    }

    /// Absolute ranges of the staged buffer that hold real data.
    pub(crate) fn filled_spans(&self) -> Vec<Range<u64>> {
        spans::subtract(&[self.start()..self.interval.staged_end()], &self.holes)
    }

    pub(crate) fn set_holes(&mut self, holes: Vec<Range<u64>>) {
        debug_assert!(holes.is_empty() || self.is_open_ended());
        self.holes = holes;
    }

    /// The hole containing `offset`, if any.
    pub(crate) fn hole_at(&self, offset: u64) -> Option<&Range<u64>> {
        let i = self.holes.partition_point(|h| h.end <= offset);
        self.holes.get(i).filter(|h| h.start <= offset)
    }

    /// First offset at or after the start that reads as data: past a leading hole if there is one.
    pub(crate) fn first_known_offset(&self) -> u64 {
        self.hole_at(self.start()).map_or(self.start(), |h| h.end)
    }

    /// Copies the bytes of `other` lying in `spans` into place.  Parts of `spans` outside either
    /// buffer are skipped.  Returns the number of bytes copied.
    pub(crate) fn copy_spans_from(&mut self, other: &DenseData, spans: &[Range<u64>]) -> u64 {
        let lo_bound = self.start().max(other.start());
        let hi_bound = self.interval.staged_end().min(other.interval.staged_end());

        let mut copied = 0;
        for span in spans {
            let lo = span.start.max(lo_bound);
            let hi = span.end.min(hi_bound);
            if lo >= hi {
                continue;
            }
            let dst = (lo - self.start()) as usize;
            let src = (lo - other.start()) as usize;
            let n = (hi - lo) as usize;
            self.data[dst..dst + n].copy_from_slice(&other.data[src..src + n]);
            copied += hi - lo;
        }
        copied
    }

    /// Whether every byte `other` holds, and its open-endedness, is already covered by filled bytes
    /// of this block.
    pub(crate) fn covers(&self, other: &DenseData) -> bool {
        let other_end = other.interval.staged_end();
        other.start() >= self.start()
            && other_end <= self.interval.staged_end()
            && (self.is_open_ended() || !other.is_open_ended())
            && !self.holes.iter().any(|h| h.start < other_end && other.start() < h.end)
    }
}

fn buffer_len(interval: &Interval, length: u64) -> Result<usize> {
    usize::try_from(length)
        .map_err(|_| SparseDataError::invalid_interval(format!("{interval} is too large to hold in memory")))
}

// Reserves room for `length` bytes in total.  Growth is amortized unless `exact` is set.
fn reserve(data: &mut Vec<u8>, interval: &Interval, length: u64, exact: bool) -> Result<()> {
    let additional = buffer_len(interval, length)?.saturating_sub(data.len());
    let reserved = if exact {
        data.try_reserve_exact(additional)
    } else {
        data.try_reserve(additional)
    };
    reserved.map_err(|e| SparseDataError::invalid_interval(format!("cannot allocate {length} bytes for {interval}: {e}")))
}

use std::fmt;
use std::ops::Range;

use tracing::{debug, trace};

use crate::dense_data::DenseData;
use crate::error::{Result, SparseDataError};
use crate::interval::Interval;
use crate::spans;

/// A length that is either a concrete number of bytes or runs to the end of the resource.
///
/// `Unbounded` orders after every concrete length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Extent {
    Bytes(u64),
    Unbounded,
}

impl Extent {
    pub fn bytes(&self) -> Option<u64> {
        match self {
            Extent::Bytes(n) => Some(*n),
            Extent::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Extent::Unbounded)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::Bytes(n) => write!(f, "{n}"),
            Extent::Unbounded => write!(f, ".."),
        }
    }
}

/// Result of a point lookup into a [`SparseData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The offset is inside a known block.  `bytes` starts at the offset and runs to the end of the
    /// block, or for an open-ended block to its next hole or the end of its staged bytes.
    /// `valid_length` is the distance to the end of the block, or `Unbounded` for an open-ended block.
    Data { bytes: &'a [u8], valid_length: Extent },

    /// Nothing is known at the offset, including offsets in a hole of an open-ended block.
    /// `gap_length` is the distance to the next known byte, or `Unbounded` if nothing is known
    /// anywhere after it.
    Gap { gap_length: Extent },
}

/// Which bytes survive when an inserted range overlaps bytes that are already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// The most recently inserted bytes win.
    #[default]
    PreferNewer,
    /// Bytes already held win; the incoming block only fills what was missing.
    PreferExisting,
}

impl OverlapPolicy {
    pub fn from_prefer_newer(prefer_newer: bool) -> Self {
        if prefer_newer {
            OverlapPolicy::PreferNewer
        } else {
            OverlapPolicy::PreferExisting
        }
    }
}

/// Everything currently known about the bytes of one resource.
///
/// Blocks are kept sorted by start offset, never overlap, and never touch: every insert merges the
/// incoming block with all blocks it overlaps or abuts, so gaps between blocks are exactly the
/// unknown byte ranges.  At most one block is open-ended and it is always the last one; bytes
/// inserted inside its range are kept, and ranges between them that nobody filled are tracked as
/// holes of that block.
///
/// SparseData is not synchronized.  Concurrent writers for the same resource must go through a
/// single owner or a lock, e.g. [`crate::SparseDataCache`].
#[derive(Debug, Default)]
pub struct SparseData {
    blocks: Vec<DenseData>,
    space_used: u64,
    policy: OverlapPolicy,
}

impl SparseData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: OverlapPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Adds a block of valid data, merging it with every held block it overlaps or touches.
    ///
    /// Inserting data that is already known is a no-op merge.  Zero-length finite blocks carry no
    /// information and are ignored.  An open-ended block absorbs every held block at or after its
    /// start, and any later insert inside its range.
    ///
    /// Fails with [`SparseDataError::InvalidInterval`] if the merged block can't be allocated; the
    /// store is unchanged in that case.
    pub fn insert(&mut self, block: DenseData) -> Result<()> {
        let interval = *block.interval();
        if interval.is_empty() {
            trace!("SparseData: ignoring empty insert at {}", interval.start());
            return Ok(());
        }

        // The mergeable run is [first, stop): blocks ending at or after the incoming start
        // and starting at or before the incoming end.
        let first = self.blocks.partition_point(|b| b.interval().ends_before(interval.start()));
        let stop = match interval.end() {
            Some(end) => self.blocks.partition_point(|b| b.start() <= end),
            None => self.blocks.len(),
        };

        if stop <= first {
            trace!("SparseData: inserting {interval} at position {first}");
            self.space_used += block.filled_length();
            self.blocks.insert(first, block);
            return Ok(());
        }

        // Already covered by a single held block; write in place.
        if stop - first == 1 && self.blocks[first].covers(&block) {
            trace!("SparseData: {interval} already covered by {}", self.blocks[first].interval());
            if self.policy == OverlapPolicy::PreferNewer {
                self.blocks[first].copy_spans_from(&block, &block.filled_spans());
            }
            return Ok(());
        }

        self.merge_run(first, stop, block)
    }

    /// Replaces the touching run `blocks[first..stop]` and `incoming` with one block spanning their
    /// union.
    ///
    /// Whichever block already starts at the union start is grown in place, and only the other
    /// contributors are copied into it.  Offsets inside the union that no contributor filled become
    /// holes of the (necessarily open-ended) result.
    fn merge_run(&mut self, first: usize, stop: usize, incoming: DenseData) -> Result<()> {
        let policy = self.policy;
        let run = &self.blocks[first..stop];

        let start = run[0].start().min(incoming.start());
        let open_ended = incoming.is_open_ended() || run.iter().any(DenseData::is_open_ended);
        let grow_held = run[0].start() == start;
        let removed: u64 = run.iter().map(DenseData::filled_length).sum();

        let held: Vec<Range<u64>> = run.iter().flat_map(DenseData::filled_spans).collect();
        let fresh = incoming.filled_spans();
        let filled = spans::union(&held, &fresh);

        // Staging stops at the last filled byte; an open-ended claim beyond it adds no buffer.
        let staged_end = filled.last().map_or(start, |r| r.end.max(start));
        let holes = spans::subtract(&[start..staged_end], &filled);
        let unfilled = spans::total_len(&holes);
        let n_holes = holes.len();
        let n_merged = stop - first;

        if grow_held {
            self.blocks[first].resize(staged_end - start, open_ended)?;
            let rest: Vec<DenseData> = self.blocks.drain(first + 1..stop).collect();

            let base = &mut self.blocks[first];
            for block in &rest {
                base.copy_spans_from(block, &block.filled_spans());
            }
            let incoming_spans = match policy {
                OverlapPolicy::PreferNewer => fresh,
                OverlapPolicy::PreferExisting => spans::subtract(&fresh, &held),
            };
            base.copy_spans_from(&incoming, &incoming_spans);
            base.set_holes(holes);
        } else {
            let mut base = incoming;
            base.resize(staged_end - start, open_ended)?;

            for block in self.blocks.drain(first..stop) {
                let block_spans = match policy {
                    OverlapPolicy::PreferNewer => spans::subtract(&block.filled_spans(), &fresh),
                    OverlapPolicy::PreferExisting => block.filled_spans(),
                };
                base.copy_spans_from(&block, &block_spans);
            }
            base.set_holes(holes);
            self.blocks.insert(first, base);
        }

        let merged = &self.blocks[first];
        trace!("SparseData: merged {n_merged} blocks into {}", merged.interval());
        if n_holes > 0 {
            debug!(
                "SparseData: open-ended {} has {unfilled} unfilled bytes in {n_holes} holes",
                merged.interval()
            );
        }

        self.space_used = self.space_used - removed + merged.filled_length();
        Ok(())
    }

    /// Convenience for `insert(DenseData::from_bytes(start, data)?)`.
    pub fn insert_bytes(&mut self, start: u64, data: impl Into<Vec<u8>>) -> Result<()> {
        self.insert(DenseData::from_bytes(start, data)?)
    }

    /// Looks up the data at `offset`, or the distance to the next known data if there is none.
    pub fn lookup(&self, offset: u64) -> Lookup<'_> {
        let index = self.blocks.partition_point(|b| b.interval().ends_at_or_before(offset));

        let Some(block) = self.blocks.get(index) else {
            return Lookup::Gap {
                gap_length: Extent::Unbounded,
            };
        };

        if block.start() > offset {
            return Lookup::Gap {
                gap_length: Extent::Bytes(block.first_known_offset() - offset),
            };
        }

        if let Some(hole) = block.hole_at(offset) {
            return Lookup::Gap {
                gap_length: Extent::Bytes(hole.end - offset),
            };
        }

        let valid_length = match block.interval().end() {
            Some(end) => Extent::Bytes(end - offset),
            None => Extent::Unbounded,
        };

        Lookup::Data {
            bytes: block.read(offset).unwrap_or_default(),
            valid_length,
        }
    }

    /// The unknown sub-ranges of `[start, end)`, in order.  These are the ranges a fetcher still
    /// needs to request.
    ///
    /// Holes of an open-ended block are missing.  Offsets past its staged bytes are not, since the
    /// open-ended block already claims them.
    pub fn missing_ranges(&self, start: u64, end: u64) -> Result<Vec<Interval>> {
        if end < start {
            return Err(SparseDataError::invalid_interval(format!("end {end} is before start {start}")));
        }

        let mut missing = Vec::new();
        let mut cursor = start;

        while cursor < end {
            match self.lookup(cursor) {
                Lookup::Data { bytes, .. } if bytes.is_empty() => break,
                Lookup::Data { bytes, .. } => cursor = cursor.saturating_add(bytes.len() as u64),
                Lookup::Gap { gap_length } => {
                    let gap_end = match gap_length {
                        Extent::Bytes(n) => cursor.saturating_add(n).min(end),
                        Extent::Unbounded => end,
                    };
                    missing.push(Interval::from_staged_bounds(cursor, gap_end, false));
                    cursor = gap_end;
                },
            }
        }

        Ok(missing)
    }

    /// Whether every byte of `[start, end)` is known.  Empty ranges are always contained.
    pub fn contains_range(&self, start: u64, end: u64) -> bool {
        if end <= start {
            return true;
        }
        self.missing_ranges(start, end).is_ok_and(|missing| missing.is_empty())
    }

    /// Total bytes of data held across all blocks.  An open-ended block counts its filled staged
    /// bytes; holes don't count.
    pub fn space_used(&self) -> u64 {
        self.space_used
    }

    /// Number of disjoint blocks held.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The held blocks in offset order.
    pub fn blocks(&self) -> &[DenseData] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DenseData> {
        self.blocks.iter()
    }

    /// Removes and returns the block at `position` in offset order, or `None` if out of range.
    pub fn remove_at(&mut self, position: usize) -> Option<DenseData> {
        if position >= self.blocks.len() {
            return None;
        }
        let block = self.blocks.remove(position);
        self.space_used -= block.filled_length();
        Some(block)
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.space_used = 0;
    }
}

impl<'a> IntoIterator for &'a SparseData {
    type Item = &'a DenseData;
    type IntoIter = std::slice::Iter<'a, DenseData>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Renders the layout as runs of known data and gaps, e.g. `[gap:100]{data:100}[gap:..]`.
/// An open-ended block renders its filled runs and holes, e.g. `{data:100}[hole:100]{data:100..}`,
/// with `..` marking the open end.
impl fmt::Display for SparseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cursor = 0;
        for block in &self.blocks {
            if block.start() > cursor {
                write!(f, "[gap:{}]", block.start() - cursor)?;
            }
            if block.is_open_ended() {
                return fmt_open_ended(f, block);
            }
            write!(f, "{{data:{}}}", block.staged_length())?;
            cursor = block.interval().staged_end();
        }
        write!(f, "[gap:..]")
    }
}

fn fmt_open_ended(f: &mut fmt::Formatter<'_>, block: &DenseData) -> fmt::Result {
    // (filled, length) runs across the staged buffer.
    let mut runs: Vec<(bool, u64)> = Vec::new();
    let mut pos = block.start();
    for hole in block.holes() {
        if hole.start() > pos {
            runs.push((true, hole.start() - pos));
        }
        runs.push((false, hole.staged_length()));
        pos = hole.staged_end();
    }
    let staged_end = block.interval().staged_end();
    if staged_end > pos {
        runs.push((true, staged_end - pos));
    }
    if !matches!(runs.last(), Some((true, _))) {
        runs.push((true, 0));
    }

    let last = runs.len() - 1;
    for (i, (filled, n)) in runs.into_iter().enumerate() {
        match (filled, i == last) {
            (true, true) => write!(f, "{{data:{n}..}}")?,
            (true, false) => write!(f, "{{data:{n}}}")?,
            (false, _) => write!(f, "[hole:{n}]")?,
        }
    }
    Ok(())
}

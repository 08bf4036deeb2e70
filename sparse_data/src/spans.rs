//! Set operations over sorted, disjoint absolute byte ranges.

use std::ops::Range;

/// Union of two sorted span lists; touching spans are coalesced.
pub(crate) fn union(a: &[Range<u64>], b: &[Range<u64>]) -> Vec<Range<u64>> {
    let mut all: Vec<Range<u64>> = a.iter().chain(b).filter(|r| !r.is_empty()).cloned().collect();
    all.sort_unstable_by_key(|r| r.start);

    let mut out: Vec<Range<u64>> = Vec::with_capacity(all.len());
    for r in all {
        match out.last_mut() {
            Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
            _ => out.push(r),
        }
    }
    out
}

/// The parts of `a` not covered by `b`.  Both inputs must be sorted and disjoint.
pub(crate) fn subtract(a: &[Range<u64>], b: &[Range<u64>]) -> Vec<Range<u64>> {
    let mut out = Vec::new();
    let mut j = 0;

    for r in a.iter().filter(|r| !r.is_empty()) {
        while j < b.len() && b[j].end <= r.start {
            j += 1;
        }

        let mut lo = r.start;
        let mut k = j;
        while lo < r.end {
            match b.get(k) {
                Some(cut) if cut.start < r.end => {
                    if cut.start > lo {
                        out.push(lo..cut.start);
                    }
                    lo = lo.max(cut.end);
                    k += 1;
                },
                _ => {
                    out.push(lo..r.end);
                    break;
                },
            }
        }
    }
    out
}

pub(crate) fn total_len(spans: &[Range<u64>]) -> u64 {
    spans.iter().map(|r| r.end - r.start).sum()
}

//! C3 — Coverage engine (spec.md §3–§4): a set of disjoint half-open
//! address intervals with union, overlap test, and hole enumeration. No
//! teacher counterpart — the teacher never tracks address coverage — so
//! this is built directly from spec.md's invariants, kept in the
//! teacher's plain-struct-and-inherent-method style.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    fn overlaps_or_touches(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Disjoint, sorted-by-start half-open `[start, end)` intervals. `add`
/// merges touching or overlapping intervals, preserving the invariant
/// that no two stored intervals touch or overlap.
#[derive(Debug, Default, Clone)]
pub struct Coverage {
    intervals: Vec<Interval>,
}

impl Coverage {
    pub fn new() -> Self {
        Coverage::default()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Adds `[addr, addr+len)`, merging with any touching or overlapping
    /// stored interval.
    pub fn add(&mut self, addr: u64, len: u64) {
        if len == 0 {
            return;
        }
        let new = Interval {
            start: addr,
            end: addr + len,
        };
        let mut merged = new;
        let mut kept = Vec::with_capacity(self.intervals.len() + 1);
        for iv in &self.intervals {
            if iv.overlaps_or_touches(&merged) {
                merged.start = merged.start.min(iv.start);
                merged.end = merged.end.max(iv.end);
            } else {
                kept.push(*iv);
            }
        }
        kept.push(merged);
        kept.sort_by_key(|iv| iv.start);
        self.intervals = kept;
    }

    /// `true` iff `[addr, addr+len)` is entirely contained in some stored
    /// interval (not necessarily a single one before merging — but since
    /// `add` always merges, containment in the union implies containment
    /// in one interval).
    pub fn is_covered(&self, addr: u64, len: u64) -> bool {
        let want = Interval {
            start: addr,
            end: addr + len,
        };
        self.intervals
            .iter()
            .any(|iv| iv.start <= want.start && want.end <= iv.end)
    }

    /// `true` iff `[addr, addr+len)` overlaps (shares at least one byte
    /// with, but is not merely adjacent to) any stored interval.
    pub fn is_overlap(&self, addr: u64, len: u64) -> bool {
        let want = Interval {
            start: addr,
            end: addr + len,
        };
        self.intervals.iter().any(|iv| iv.overlaps(&want))
    }

    /// Iterates gaps strictly inside `[begin, end)` between stored
    /// intervals (and at the two ends), invoking `cb(start, len)` for
    /// each.
    pub fn find_holes(&self, begin: u64, end: u64, mut cb: impl FnMut(u64, u64)) {
        let mut cursor = begin;
        for iv in &self.intervals {
            let (s, e) = (iv.start.max(begin), iv.end.min(end));
            if s > e || s >= end {
                continue;
            }
            if s > cursor {
                cb(cursor, s - cursor);
            }
            cursor = cursor.max(e);
        }
        if cursor < end {
            cb(cursor, end - cursor);
        }
    }

    /// Iterates every stored interval as `(start, len)`.
    pub fn find_ranges(&self, mut cb: impl FnMut(u64, u64)) {
        for iv in &self.intervals {
            cb(iv.start, iv.len());
        }
    }

    /// Removes every byte covered by `other` from `self`, splitting
    /// intervals as needed.
    pub fn remove_all(&mut self, other: &Coverage) {
        for sub in &other.intervals {
            let mut next = Vec::with_capacity(self.intervals.len());
            for iv in &self.intervals {
                if !iv.overlaps(sub) {
                    next.push(*iv);
                    continue;
                }
                if iv.start < sub.start {
                    next.push(Interval {
                        start: iv.start,
                        end: sub.start,
                    });
                }
                if sub.end < iv.end {
                    next.push(Interval {
                        start: sub.end,
                        end: iv.end,
                    });
                }
            }
            self.intervals = next;
        }
    }

    pub fn clone_coverage(&self) -> Coverage {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_merges_touching_intervals() {
        let mut c = Coverage::new();
        c.add(0, 10);
        c.add(10, 5);
        assert_eq!(c.intervals(), &[Interval { start: 0, end: 15 }]);
    }

    #[test]
    fn add_merges_overlapping_intervals() {
        let mut c = Coverage::new();
        c.add(0, 10);
        c.add(5, 10);
        assert_eq!(c.intervals(), &[Interval { start: 0, end: 15 }]);
    }

    #[test]
    fn is_overlap_matches_invariant() {
        let mut c = Coverage::new();
        c.add(10, 10); // [10,20)
        assert!(c.is_overlap(15, 10)); // [15,25) overlaps
        assert!(!c.is_overlap(20, 5)); // [20,25) merely touches
        assert!(!c.is_overlap(25, 5));
    }

    #[test]
    fn is_covered_requires_full_containment() {
        let mut c = Coverage::new();
        c.add(0, 10);
        assert!(c.is_covered(2, 5));
        assert!(!c.is_covered(8, 5));
    }

    #[test]
    fn find_holes_reports_gaps_and_ends() {
        let mut c = Coverage::new();
        c.add(10, 5); // [10,15)
        c.add(20, 5); // [20,25)
        let mut holes = vec![];
        c.find_holes(0, 30, |s, l| holes.push((s, l)));
        assert_eq!(holes, vec![(0, 10), (15, 5), (25, 5)]);
    }

    #[test]
    fn remove_all_splits_intervals() {
        let mut c = Coverage::new();
        c.add(0, 20); // [0,20)
        let mut other = Coverage::new();
        other.add(5, 5); // [5,10)
        c.remove_all(&other);
        assert_eq!(
            c.intervals(),
            &[Interval { start: 0, end: 5 }, Interval { start: 10, end: 20 }]
        );
    }
}

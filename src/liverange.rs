//! Data structure representing the live interval of a value.
//!
//! A live interval records the positions in a linearized function where a
//! compiler-generated value must be kept available, as an ordered sequence of
//! closed `[start, end]` ranges. A value that is used across a lifetime hole
//! (a loop body it does not participate in, an `else` branch, ...) has more
//! than one range; most values have exactly one.
//!
//! # Coalescing
//!
//! The range sequence is kept maximally coalesced: ranges are sorted by start
//! position, and no two ranges overlap or touch. `add_range` merges a new
//! range into its overlapping and directly adjacent neighbors, so
//! `[5,7]` + `[8,10]` becomes the single range `[5,10]`.
//!
//! # Splitting
//!
//! A linear-scan register allocator walks intervals in start order and
//! assigns each one a register. When an active interval must give up its
//! register at some position, the allocator splits it there: the original
//! interval keeps the liveness up to the split position and stays bound to
//! its current storage, while a new interval carries the remaining liveness
//! and competes for storage again. `split` implements exactly that
//! partition, including the case where the value's next use has been
//! eliminated and the tail interval is not needed at all.
//!
//! # The stored end position
//!
//! An interval caches its end position instead of deriving it from the last
//! range. The two agree while an interval is built up with `add_range`, but
//! diverge after a split: the receiver's end becomes the position where the
//! split-off tail resumes, which lies past its last retained range. The
//! allocator relies on this when expiring intervals, so `end` must not be
//! recomputed from the ranges.

use crate::result::{IntervalError, IntervalResult};
use core::fmt;
use smallvec::SmallVec;

/// A program position in a linearized function.
///
/// Positions are assigned by the consumer, typically one per instruction in
/// layout order. The interval code only compares them and does not care
/// about the numbering scheme, except that adjacency (`p + 1`) must mean
/// "the next program position".
pub type Position = u32;

/// A register unit number assigned by the register allocator.
pub type RegUnit = u16;

/// One contiguous liveness span, both endpoints included.
///
/// Ranges are immutable values; they are created by live-range analysis and
/// reshaped only through `LiveInterval`'s own operations.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LiveRange {
    start: Position,
    end: Position,
}

impl LiveRange {
    /// Create a range covering `start` through `end`, inclusive.
    ///
    /// A backwards range is refused, never silently swapped.
    pub fn new(start: Position, end: Position) -> IntervalResult<Self> {
        if start > end {
            return Err(IntervalError::BackwardsRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First position covered by this range.
    pub fn start(self) -> Position {
        self.start
    }

    /// Last position covered by this range.
    pub fn end(self) -> Position {
        self.end
    }
}

impl fmt::Display for LiveRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{};{}]", self.start, self.end)
    }
}

/// Live interval of a single value: a sorted, coalesced sequence of ranges.
///
/// A freshly created interval is *invalid*: it has no liveness at all and
/// `end()` returns `None`. It becomes valid with the first `add_range` call.
/// The allocator also encounters invalid intervals as the result of a split
/// whose tail was discarded; those must not be fed back into allocation.
#[derive(Clone, Debug, Default)]
pub struct LiveInterval {
    /// Sorted by start, pairwise non-overlapping and non-touching.
    ///
    /// Most values are live in a single contiguous stretch, so the first two
    /// ranges live inline.
    ranges: SmallVec<[LiveRange; 2]>,

    /// Cached end of liveness; see the module documentation. `None` means
    /// the interval is not live anywhere.
    end: Option<Position>,

    /// Register this interval is currently assigned to, if any.
    reg: Option<RegUnit>,

    /// A fixed interval models a physical register that is live around
    /// instructions with register constraints. Fixed intervals are never
    /// spilled or split.
    fixed: bool,

    /// True if this interval was produced by splitting another one. Split
    /// tails sort before other intervals starting at the same position, and
    /// the allocator uses the flag to track spill history.
    split_from_interval: bool,
}

impl LiveInterval {
    /// Create an empty, invalid interval with no liveness.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the ranges, sorted by start position.
    pub fn ranges(&self) -> &[LiveRange] {
        &self.ranges
    }

    /// Start of the first range, or `None` for an invalid interval.
    pub fn start(&self) -> Option<Position> {
        self.ranges.first().map(|r| r.start)
    }

    /// Last position the value must stay available, or `None` for an
    /// invalid interval.
    ///
    /// After a split this is the position where the split-off tail resumes,
    /// which can lie past the last range; see the module documentation.
    pub fn end(&self) -> Option<Position> {
        self.end
    }

    /// Does this interval have any liveness?
    pub fn is_valid(&self) -> bool {
        self.end.is_some()
    }

    /// Was this interval produced by `split`?
    pub fn is_split_from_interval(&self) -> bool {
        self.split_from_interval
    }

    /// Register currently assigned to this interval.
    pub fn reg(&self) -> Option<RegUnit> {
        self.reg
    }

    /// Assign a register to this interval.
    pub fn set_reg(&mut self, reg: RegUnit) {
        debug_assert!(!self.fixed, "fixed intervals are preassigned");
        self.reg = Some(reg);
    }

    /// Is this a fixed interval for a physical register?
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Turn this interval into a fixed interval for `reg`.
    pub fn set_fixed(&mut self, reg: RegUnit) {
        self.reg = Some(reg);
        self.fixed = true;
    }

    /// Add the range `start` through `end`, inclusive, merging it with any
    /// existing ranges it overlaps or touches.
    ///
    /// The ranges stay sorted and coalesced, and the interval's end is
    /// raised to `end` if that extends it.
    pub fn add_range(&mut self, start: Position, end: Position) {
        debug_assert!(start <= end, "backwards range {start}..{end}");

        // The block `first..last` of existing ranges overlaps or touches
        // the new range: `first` is the first range not entirely before it,
        // `last` the first range entirely after it.
        let first = self.ranges.partition_point(|r| r.end < start.saturating_sub(1));
        let last = self
            .ranges
            .partition_point(|r| r.start <= end.saturating_add(1));

        if first < last {
            let merged = LiveRange {
                start: start.min(self.ranges[first].start),
                end: end.max(self.ranges[last - 1].end),
            };
            self.ranges.drain(first..last);
            self.ranges.insert(first, merged);
        } else {
            // Nothing to coalesce with, plain insertion keeps the ordering.
            self.ranges.insert(first, LiveRange { start, end });
        }

        self.end = Some(match self.end {
            Some(e) => e.max(end),
            None => end,
        });
    }

    /// Clamp the start of liveness to the defining position `from`.
    ///
    /// Backward liveness construction discovers uses before the definition;
    /// once the definition is seen, the first range is pulled up to it. A
    /// definition with no uses at all becomes a single-position range.
    pub fn set_from(&mut self, from: Position) {
        match self.ranges.first_mut() {
            Some(first) => {
                debug_assert!(from <= first.end);
                first.start = from;
            }
            None => self.add_range(from, from),
        }
    }

    /// Is the value live at `pos`?
    pub fn covers(&self, pos: Position) -> bool {
        match self.ranges.binary_search_by(|r| r.start.cmp(&pos)) {
            Ok(_) => true,
            Err(n) => n > 0 && pos <= self.ranges[n - 1].end,
        }
    }

    /// Processing order for the allocator's work list.
    ///
    /// Intervals are ordered by start position. On ties, split tails come
    /// first so a value re-entering allocation is handled before fresh
    /// definitions at the same position, then shorter intervals first.
    pub fn sorts_before(&self, other: &Self) -> bool {
        debug_assert!(self.is_valid() && other.is_valid());
        let (a, b) = (self.start(), other.start());
        if a != b {
            return a < b;
        }
        if self.split_from_interval != other.split_from_interval {
            return self.split_from_interval;
        }
        match (self.ranges.last(), other.ranges.last()) {
            (Some(ra), Some(rb)) => ra.end < rb.end,
            _ => false,
        }
    }

    /// Split this interval at `at`, returning the interval for the
    /// remaining liveness.
    ///
    /// The receiver keeps every range up to `at`; a range containing `at`
    /// is truncated to end there. The returned interval carries the ranges
    /// after `at`, starting at `new_start`, the position where the value
    /// becomes live again, typically its reload point. A `new_start` of
    /// `None` means the value never resumes: the returned interval is
    /// empty and invalid, and the receiver's cached end keeps its original
    /// value rather than shrinking to `at`.
    ///
    /// `at` must fall inside the receiver's liveness span (lifetime holes
    /// are fine), and `new_start` must be after `at`. Splitting an invalid
    /// or fixed interval is a caller bug.
    pub fn split(&mut self, at: Position, new_start: Option<Position>) -> LiveInterval {
        assert!(self.is_valid(), "cannot split an invalid interval");
        debug_assert!(!self.fixed, "cannot split a fixed interval");
        let (first, last) = (self.ranges[0], self.ranges[self.ranges.len() - 1]);
        assert!(
            first.start <= at && at <= last.end,
            "split position {at} outside live span {};{}",
            first.start,
            last.end
        );
        if let Some(p) = new_start {
            debug_assert!(at < p, "resume position {p} not after split position {at}");
        }
        log::trace!("splitting {self} at {at}");

        // Partition the ranges around `at`. A range containing `at` is
        // kept by the receiver and also seeds the tail; its endpoints are
        // corrected below. A range whose last position is `at` itself
        // contributes nothing to the tail.
        let before = self.ranges.partition_point(|r| r.end < at);
        let keep = before + usize::from(self.covers(at));
        let mut tail: SmallVec<[LiveRange; 2]> = self.ranges[before..]
            .iter()
            .copied()
            .filter(|r| r.end > at)
            .collect();
        self.ranges.truncate(keep);

        let mut new = LiveInterval {
            ranges: SmallVec::new(),
            end: None,
            reg: None,
            fixed: false,
            split_from_interval: true,
        };

        if let Some(p) = new_start {
            // Drop transferred ranges the value sleeps through entirely,
            // then resume either inside a range (clamp its start) or in a
            // lifetime hole before one (keep the range whole).
            let skip = tail.partition_point(|r| r.end < p);
            tail.drain(..skip);
            match tail.first_mut() {
                Some(r) if r.start < p => r.start = p,
                Some(_) => {}
                // The reload lands after every remaining use.
                None => tail.push(LiveRange { start: p, end: p }),
            }
            new.end = self.end.map(|e| e.max(p));
            new.ranges = tail;
            // The receiver stays the value's storage until the reload.
            self.end = Some(p);
        }

        // Truncate the receiver's shared range at the split position. When
        // the tail is discarded the receiver's cached end is left alone.
        if let Some(r) = self.ranges.last_mut() {
            if r.end > at {
                r.end = at;
            }
        }

        log::trace!("split tail is {new}");
        new
    }

    /// Check the interval's invariants, panicking on violation.
    ///
    /// Ranges must be individually non-backwards, sorted by start, and
    /// coalesced (no overlapping or touching neighbors); a non-empty
    /// interval must be valid with its cached end at or past the last
    /// range's end. Used by tests and by allocator debug builds.
    pub fn validate(&self) {
        for r in &self.ranges {
            assert!(r.start <= r.end, "backwards range {r}");
        }
        for pair in self.ranges.windows(2) {
            assert!(
                pair[0].end + 1 < pair[1].start,
                "unmerged neighbors {} {}",
                pair[0],
                pair[1]
            );
        }
        if let Some(last) = self.ranges.last() {
            let end = self.end.expect("interval with ranges must be valid");
            assert!(end >= last.end, "cached end {end} before last range {last}");
        }
    }
}

impl fmt::Display for LiveInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "(invalid)");
        }
        for r in &self.ranges {
            write!(f, "{r}")?;
        }
        if let Some(reg) = self.reg {
            write!(f, " reg{reg}")?;
        }
        if let (Some(end), Some(last)) = (self.end, self.ranges.last()) {
            if end != last.end {
                write!(f, " end {end}")?;
            }
        }
        Ok(())
    }
}

//! Sets of code points, stored as sorted intervals.

use crate::util::SliceHelp;
use core::cmp::{self, Ordering};
use core::fmt;

pub type CodePoint = u32;

/// The maximum (inclusive) code point.
pub const CODE_POINT_MAX: CodePoint = 0x10FFFF;

/// An inclusive range of code points.
/// This is more efficient than InclusiveRange because it does not need to carry
/// around the `Option<bool>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub(crate) first: CodePoint,
    pub(crate) last: CodePoint,
}

/// A list of sorted, inclusive, non-empty ranges of code points.
impl Interval {
    pub const fn new(first: CodePoint, last: CodePoint) -> Interval {
        debug_assert!(first <= last);
        Interval { first, last }
    }

    /// \return the first code point, inclusive.
    pub fn first(self) -> CodePoint {
        self.first
    }

    /// \return the last code point, inclusive.
    pub fn last(self) -> CodePoint {
        self.last
    }

    #[inline(always)]
    pub fn compare(self, cp: u32) -> Ordering {
        if self.first > cp {
            Ordering::Greater
        } else if self.last < cp {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }

    /// Return whether self is before rhs.
    fn is_before(self, other: Interval) -> bool {
        self.last < other.first
    }

    /// Return whether self is strictly before rhs.
    /// "Strictly" here means there is at least one value after the end of self,
    /// and before the start of rhs. Overlapping *or abutting* intervals are
    /// not considered strictly before.
    fn is_strictly_before(self, rhs: Interval) -> bool {
        self.last + 1 < rhs.first
    }

    /// Compare two intervals.
    /// Overlapping *or abutting* intervals are considered equal.
    fn mergecmp(self, rhs: Interval) -> cmp::Ordering {
        if self.is_strictly_before(rhs) {
            Ordering::Less
        } else if rhs.is_strictly_before(self) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// Return whether self is mergeable with rhs.
    fn mergeable(self, rhs: Interval) -> bool {
        self.mergecmp(rhs) == Ordering::Equal
    }

    /// Return whether self overlaps 'other'.
    /// Overlaps means that we share at least one code point with 'other'.
    pub fn overlaps(self, other: Interval) -> bool {
        !self.is_before(other) && !other.is_before(self)
    }
}

pub(crate) fn interval_contains(interval: &[Interval], cp: u32) -> bool {
    interval.binary_search_by(|iv| iv.compare(cp)).is_ok()
}

/// Merge two intervals, which must be overlapping or abutting.
fn merge_intervals(x: Interval, y: &Interval) -> Interval {
    debug_assert!(x.mergeable(*y), "Ranges not mergeable");
    Interval {
        first: core::cmp::min(x.first, y.first),
        last: core::cmp::max(x.last, y.last),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CodePointSet {
    ivs: Vec<Interval>,
}

/// A set of code points stored via as disjoint, non-abutting, sorted intervals.
impl CodePointSet {
    pub fn new() -> CodePointSet {
        CodePointSet { ivs: Vec::new() }
    }

    /// A set containing a single interval.
    pub fn from_interval(iv: Interval) -> CodePointSet {
        CodePointSet { ivs: vec![iv] }
    }

    /// A set containing exactly one code point.
    pub fn from_code_point(cp: CodePoint) -> CodePointSet {
        CodePointSet::from_interval(Interval::new(cp, cp))
    }

    // Return true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ivs.is_empty()
    }

    /// \return the smallest contained code point.
    pub fn first(&self) -> Option<CodePoint> {
        self.ivs.first().map(|iv| iv.first)
    }

    /// \return the code point if this set contains exactly one.
    pub fn single_code_point(&self) -> Option<CodePoint> {
        match self.ivs.as_slice() {
            [iv] if iv.first == iv.last => Some(iv.first),
            _ => None,
        }
    }

    // Return true if we contain all code points.
    pub(crate) fn contains_all_codepoints(&self) -> bool {
        self.ivs.len() == 1 && self.ivs[0] == Interval::new(0, CODE_POINT_MAX)
    }

    #[inline]
    pub fn contains(&self, cp: u32) -> bool {
        interval_contains(&self.ivs, cp)
    }

    #[inline]
    fn assert_is_well_formed(&self) {
        if cfg!(debug_assertions) {
            for iv in &self.ivs {
                debug_assert!(iv.last <= CODE_POINT_MAX);
                debug_assert!(iv.first <= iv.last);
            }
            for w in self.ivs.windows(2) {
                debug_assert!(w[0].is_strictly_before(w[1]));
            }
        }
    }

    /// Construct from sorted, disjoint intervals. Note these are not allowed to
    /// even abut.
    pub fn from_sorted_disjoint_intervals(ivs: Vec<Interval>) -> CodePointSet {
        let res = CodePointSet { ivs };
        res.assert_is_well_formed();
        res
    }

    /// Add an interval of code points to the set.
    pub fn add(&mut self, new_iv: Interval) {
        // Find the mergeable subarray, that is, the range of intervals that intersect
        // or abut new_iv.
        let mergeable = self.ivs.equal_range_by(|iv| iv.mergecmp(new_iv));

        // Check our work.
        if cfg!(debug_assertions) {
            debug_assert!(new_iv.first <= new_iv.last);
            for (idx, iv) in self.ivs.iter().enumerate() {
                if idx < mergeable.start {
                    debug_assert!(iv.is_strictly_before(new_iv));
                } else if idx >= mergeable.end {
                    debug_assert!(new_iv.is_strictly_before(*iv));
                } else {
                    debug_assert!(iv.mergeable(new_iv) && new_iv.mergeable(*iv));
                }
            }
        }

        // Merge all the overlapping intervals (possibly none), and then replace the
        // range. Tests show that drain(), which modifies the vector, is not effectively
        // optimized, so try to avoid it in the cases of a new entry or replacing an existing
        // entry.
        match mergeable.end - mergeable.start {
            0 => {
                // New entry.
                self.ivs.insert(mergeable.start, new_iv);
            }
            1 => {
                // Replace a single entry.
                let entry = &mut self.ivs[mergeable.start];
                *entry = Interval {
                    first: cmp::min(entry.first, new_iv.first),
                    last: cmp::max(entry.last, new_iv.last),
                };
            }
            _ => {
                // Replace range of entries.
                let merged_iv: Interval = self.ivs[mergeable.clone()]
                    .iter()
                    .fold(new_iv, merge_intervals);
                self.ivs[mergeable.start] = merged_iv;
                self.ivs.drain(mergeable.start + 1..mergeable.end);
            }
        }
        self.assert_is_well_formed();
    }

    /// Add a single code point to the set.
    #[inline]
    pub fn add_one(&mut self, cp: CodePoint) {
        self.add(Interval {
            first: cp,
            last: cp,
        })
    }

    /// Add another code point set.
    pub fn add_set(&mut self, mut rhs: CodePointSet) {
        // Prefer to add to the set with more intervals.
        if self.ivs.len() < rhs.ivs.len() {
            core::mem::swap(self, &mut rhs);
        }
        for iv in rhs.intervals() {
            self.add(*iv)
        }
    }

    /// \return the intervals
    pub fn intervals(&self) -> &[Interval] {
        self.ivs.as_slice()
    }

    /// Remove the the given intervals from the set.
    ///
    /// Invariants: The intervals must be sorted and disjoint.
    pub fn remove(&mut self, intervals: &[Interval]) {
        let mut result = Vec::new();
        let mut remove_iter = intervals.iter().peekable();
        let mut current_remove = remove_iter.next();

        for iv in &mut self.ivs {
            while let Some(remove_iv) = current_remove {
                if remove_iv.last < iv.first {
                    current_remove = remove_iter.next();
                } else if remove_iv.first > iv.last {
                    result.push(*iv);
                    break;
                } else {
                    if remove_iv.first > iv.first {
                        result.push(Interval {
                            first: iv.first,
                            last: remove_iv.first - 1,
                        });
                    }
                    if remove_iv.last < iv.last {
                        iv.first = remove_iv.last + 1;
                        current_remove = remove_iter.next();
                    } else {
                        break;
                    }
                }
            }
            if current_remove.is_none() {
                result.push(*iv);
            }
        }

        self.ivs = result;
    }

    /// \return the intersection of self and rhs.
    pub fn intersection(&self, rhs: &CodePointSet) -> CodePointSet {
        let mut result = self.clone();
        result.intersect(rhs.intervals());
        result
    }

    /// \return the code points of `space` which are not in self.
    /// This is the complement relative to an encoding's code point space.
    pub fn complement_within(&self, space: &CodePointSet) -> CodePointSet {
        let mut result = space.clone();
        result.remove(self.intervals());
        result
    }

    /// Intersect the set with the given intervals.
    pub fn intersect(&mut self, intervals: &[Interval]) {
        let mut new_ivs = Vec::new();
        for iv in intervals {
            for self_iv in self.intervals() {
                if iv.overlaps(*self_iv) {
                    new_ivs.push(Interval {
                        first: cmp::max(iv.first, self_iv.first),
                        last: cmp::min(iv.last, self_iv.last),
                    });
                }
            }
        }
        self.ivs = new_ivs;
    }
}

fn fmt_code_point(f: &mut fmt::Formatter<'_>, cp: CodePoint) -> fmt::Result {
    match char::from_u32(cp) {
        Some(c) if c.is_ascii_graphic() => write!(f, "'{}'", c),
        _ => write!(f, "U+{:04X}", cp),
    }
}

impl fmt::Display for CodePointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains_all_codepoints() {
            return f.write_str("[any]");
        }
        f.write_str("[")?;
        for (idx, iv) in self.ivs.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            fmt_code_point(f, iv.first)?;
            if iv.last != iv.first {
                f.write_str("-")?;
                fmt_code_point(f, iv.last)?;
            }
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(first: u32, last: u32) -> Interval {
        Interval { first, last }
    }

    #[test]
    fn test_is_before() {
        let a = iv(0, 9);
        let b = iv(10, 19);
        assert!(a.is_before(b));
        assert!(!b.is_before(a));
    }

    #[test]
    fn test_is_strictly_before() {
        let a = iv(0, 9);
        let b = iv(10, 19);
        let c = iv(11, 19);
        assert!(!a.is_strictly_before(b));
        assert!(a.is_strictly_before(c));
        assert!(!b.is_strictly_before(a));
        assert!(!b.is_strictly_before(c));
    }

    #[test]
    fn test_mergecmp() {
        let a = iv(0, 9);
        let b = iv(10, 19);
        let c = iv(9, 18);
        assert_eq!(a.mergecmp(b), Ordering::Equal);
        assert_eq!(b.mergecmp(a), Ordering::Equal);
        assert_eq!(a.mergecmp(c), Ordering::Equal);
        assert_eq!(c.mergecmp(a), Ordering::Equal);

        let d = iv(11, 19);
        assert_eq!(a.mergecmp(d), Ordering::Less);
        assert_eq!(d.mergecmp(a), Ordering::Greater);
        assert_eq!(b.mergecmp(d), Ordering::Equal);
        assert_eq!(d.mergecmp(b), Ordering::Equal);
        assert_eq!(c.mergecmp(d), Ordering::Equal);
        assert_eq!(d.mergecmp(c), Ordering::Equal);

        let e = iv(100, 109);
        assert_eq!(a.mergecmp(e), Ordering::Less);
        assert_eq!(e.mergecmp(a), Ordering::Greater);
    }

    #[test]
    fn test_mergeable() {
        let a = iv(0, 9);
        let b = iv(9, 19);
        assert!(a.mergeable(a));
        assert!(a.mergeable(b));
        assert!(b.mergeable(b));
    }

    #[test]
    fn test_overlaps() {
        let a = iv(0, 9);
        let b = iv(5, 14);
        let c = iv(10, 19);
        assert!(a.overlaps(b));
        assert!(!a.overlaps(c));
    }

    #[test]
    fn test_add() {
        let mut set = CodePointSet::new();
        set.add(iv(10, 20));
        set.add(iv(30, 40));
        set.add(iv(15, 35));
        assert_eq!(set.intervals(), &[iv(10, 40)]);
    }

    #[test]
    fn test_add_one() {
        let mut set = CodePointSet::new();
        set.add_one(10);
        set.add_one(20);
        set.add_one(15);
        assert_eq!(set.intervals(), &[iv(10, 10), iv(15, 15), iv(20, 20)]);
    }

    #[test]
    fn test_add_set() {
        let mut set1 = CodePointSet::new();
        set1.add(iv(10, 20));
        set1.add(iv(30, 40));
        let mut set2 = CodePointSet::new();
        set2.add(iv(15, 25));
        set2.add(iv(35, 45));
        set1.add_set(set2);
        assert_eq!(set1.intervals(), &[iv(10, 25), iv(30, 45)]);
    }

    #[test]
    fn test_adds_torture() {
        let mut set = CodePointSet::new();
        set.add(iv(1, 3));
        assert_eq!(&set.intervals(), &[iv(1, 3)]);
        set.add(iv(0, 0));
        assert_eq!(&set.intervals(), &[iv(0, 3)]);
        set.add(iv(3, 5));
        assert_eq!(&set.intervals(), &[iv(0, 5)]);
        set.add(iv(6, 10));
        assert_eq!(&set.intervals(), &[iv(0, 10)]);
        set.add(iv(15, 15));
        assert_eq!(&set.intervals(), &[iv(0, 10), iv(15, 15)]);
        set.add(iv(12, 14));
        assert_eq!(&set.intervals(), &[iv(0, 10), iv(12, 15)]);
        set.add(iv(16, 20));
        assert_eq!(&set.intervals(), &[iv(0, 10), iv(12, 20)]);
        set.add(iv(21, 22));
        assert_eq!(&set.intervals(), &[iv(0, 10), iv(12, 22)]);
        set.add(iv(23, 23));
        assert_eq!(&set.intervals(), &[iv(0, 10), iv(12, 23)]);
        set.add(iv(100, 200));
        assert_eq!(&set.intervals(), &[iv(0, 10), iv(12, 23), iv(100, 200)]);
        set.add(iv(201, 250));
        assert_eq!(&set.intervals(), &[iv(0, 10), iv(12, 23), iv(100, 250)]);
        set.add(iv(0, 0x10ffff));
        assert_eq!(&set.intervals(), &[iv(0, 0x10ffff)]);
    }

    #[test]
    fn test_intersection_and_complement() {
        let mut a = CodePointSet::new();
        a.add(iv(10, 20));
        a.add(iv(30, 40));
        let mut b = CodePointSet::new();
        b.add(iv(15, 35));
        assert_eq!(a.intersection(&b).intervals(), &[iv(15, 20), iv(30, 35)]);
        assert!(a
            .intersection(&CodePointSet::from_interval(iv(21, 29)))
            .is_empty());

        let latin1 = CodePointSet::from_interval(iv(0, 0xFF));
        assert_eq!(
            a.complement_within(&latin1).intervals(),
            &[iv(0, 9), iv(21, 29), iv(41, 0xFF)]
        );
        assert_eq!(a.first(), Some(10));
        assert_eq!(CodePointSet::from_code_point(7).single_code_point(), Some(7));
        assert_eq!(a.single_code_point(), None);
    }

    #[test]
    fn test_display() {
        let mut set = CodePointSet::new();
        set.add(iv('a' as u32, 'z' as u32));
        set.add_one('_' as u32);
        set.add_one(0x2028);
        assert_eq!(set.to_string(), "['_' 'a'-'z' U+2028]");
        assert_eq!(
            CodePointSet::from_interval(iv(0, CODE_POINT_MAX)).to_string(),
            "[any]"
        );
    }
}

use std::fmt;
use std::ops::RangeInclusive;

use crate::PairTable;

/// One crossing stem of a pseudoknot: positions in `[outer.0, inner.0]` pair
/// in reverse order with positions in `[inner.1, outer.1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Band {
    pub outer: (usize, usize),
    pub inner: (usize, usize),
}

impl Band {
    pub fn left(&self) -> RangeInclusive<usize> {
        self.outer.0..=self.inner.0
    }

    pub fn right(&self) -> RangeInclusive<usize> {
        self.inner.1..=self.outer.1
    }

    pub fn contains(&self, k: usize) -> bool {
        self.left().contains(&k) || self.right().contains(&k)
    }

    /// Strictly inside one of the two sub-intervals, i.e. in a loop that
    /// spans this band rather than in the pseudoloop.
    pub fn spans(&self, k: usize) -> bool {
        (self.outer.0 < k && k < self.inner.0) || (self.inner.1 < k && k < self.outer.1)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>3}, {:>3}]-[{:>3}, {:>3}]", self.outer.0, self.inner.0, self.inner.1, self.outer.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PatternEntry {
    is_left_border: bool,
    prev: usize,
    next: usize,
    other_border: usize,
}

/// Doubly linked skip list over the positions of a structure.
///
/// Slot `0` is a head sentinel, slot `n + 1` a tail sentinel, position `k`
/// lives in slot `k + 1`. Unpaired positions are unlinked on construction;
/// nested closed regions are unlinked with [`BandPattern::splice_out`]
/// before the region around them is decomposed.
#[derive(Debug, Clone)]
pub struct BandPattern {
    entries: Vec<PatternEntry>,
}

impl BandPattern {
    pub fn new(pt: &PairTable) -> Self {
        let n = pt.len();
        let entries = (0..n + 2)
            .map(|s| PatternEntry {
                is_left_border: false,
                prev: s.saturating_sub(1),
                next: (s + 1).min(n + 1),
                other_border: s,
            })
            .collect();
        let mut pattern = BandPattern { entries };
        for k in (0..n).filter(|&k| !pt.is_paired(k)) {
            pattern.splice_out(k, k);
        }
        pattern
    }

    fn tail(&self) -> usize {
        self.entries.len() - 1
    }

    /// Connect slot `from` to slot `to`, skipping everything in between.
    fn link(&mut self, from: usize, to: usize) {
        self.entries[from].next = to;
        self.entries[to].prev = from;
    }

    /// Remove the positions `begin..=end` from the list.
    pub fn splice_out(&mut self, begin: usize, end: usize) {
        let before = self.entries[begin + 1].prev;
        let after = self.entries[end + 1].next;
        self.link(before, after);
    }

    /// The next linked position after `k`.
    pub fn next(&self, k: usize) -> Option<usize> {
        let s = self.entries[k + 1].next;
        (s != self.tail()).then(|| s - 1)
    }

    /// The previous linked position before `k`.
    pub fn prev(&self, k: usize) -> Option<usize> {
        let s = self.entries[k + 1].prev;
        (s != 0).then(|| s - 1)
    }

    pub fn is_left_border(&self, k: usize) -> bool {
        self.entries[k + 1].is_left_border
    }

    /// For a left border, the last position of its sub-interval.
    pub fn other_border(&self, k: usize) -> usize {
        self.entries[k + 1].other_border - 1
    }

    /// Starting at `k`, skip positions already claimed as left borders.
    fn next_good(&self, mut k: Option<usize>, end: usize) -> Option<usize> {
        while let Some(i) = k {
            if i > end {
                return None;
            }
            if !self.is_left_border(i) {
                return Some(i);
            }
            k = self.next(i);
        }
        None
    }

    fn mark(&mut self, left: usize, right: usize) {
        let entry = &mut self.entries[left + 1];
        entry.is_left_border = true;
        entry.other_border = right + 1;
    }

    /// Partition the crossing region `[begin, end]` into bands, ordered by
    /// their left border. Each band is extended inward as far as the linked
    /// positions keep pairing with each other. A region whose outermost
    /// positions pair with each other is not crossing and has no bands.
    pub fn decompose(&mut self, pt: &PairTable, begin: usize, end: usize) -> Vec<Band> {
        let mut bands = Vec::new();
        if pt.partner(begin) == Some(end) {
            return bands;
        }

        let mut cursor = self.next_good(Some(begin), end);
        while let Some(i) = cursor {
            let Some(j) = pt.partner(i) else {
                cursor = self.next_good(self.next(i), end);
                continue;
            };
            let (mut ip, mut jp) = (i, j);
            while let (Some(ni), Some(pj)) = (self.next(ip), self.prev(jp)) {
                if ni >= pj || pt.partner(ni) != Some(pj) {
                    break;
                }
                ip = ni;
                jp = pj;
            }

            self.mark(i, ip);
            self.mark(jp, j);
            if i != ip {
                let after_ip = self.entries[ip + 1].next;
                let after_j = self.entries[j + 1].next;
                self.link(i + 1, after_ip);
                self.link(jp + 1, after_j);
            }
            bands.push(Band { outer: (i, j), inner: (ip, jp) });
            cursor = self.next_good(self.next(i), end);
        }
        bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect_regions;

    fn decompose(s: &str) -> Vec<Band> {
        let pt = PairTable::try_from(s).unwrap();
        let mut pattern = BandPattern::new(&pt);
        let region = detect_regions(&pt).unwrap().into_iter().last().unwrap();
        pattern.decompose(&pt, region.begin, region.end)
    }

    #[test]
    fn test_pattern_skips_unpaired() {
        let pt = PairTable::try_from("(..(..).)").unwrap();
        let pattern = BandPattern::new(&pt);
        assert_eq!(pattern.next(0), Some(3));
        assert_eq!(pattern.next(3), Some(6));
        assert_eq!(pattern.next(6), Some(8));
        assert_eq!(pattern.next(8), None);
        assert_eq!(pattern.prev(8), Some(6));
        assert_eq!(pattern.prev(0), None);
    }

    #[test]
    fn test_splice_out_region() {
        let pt = PairTable::try_from("(.(..).)").unwrap();
        let mut pattern = BandPattern::new(&pt);
        pattern.splice_out(2, 5);
        assert_eq!(pattern.next(0), Some(7));
        assert_eq!(pattern.prev(7), Some(0));
    }

    #[test]
    fn test_htype_bands() {
        let bands = decompose("((..[[..))..]]");
        assert_eq!(bands, vec![
            Band { outer: (0, 9), inner: (1, 8) },
            Band { outer: (4, 13), inner: (5, 12) },
        ]);
    }

    #[test]
    fn test_band_extends_over_bulges() {
        let bands = decompose("((.(..[[..)).)..]]");
        assert_eq!(bands, vec![
            Band { outer: (0, 13), inner: (3, 10) },
            Band { outer: (6, 17), inner: (7, 16) },
        ]);
    }

    #[test]
    fn test_kissing_hairpin_bands() {
        let bands = decompose("((..[[..))..{{..]]..}}");
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[1], Band { outer: (4, 17), inner: (5, 16) });
        assert_eq!(bands[2], Band { outer: (12, 21), inner: (13, 20) });
    }

    #[test]
    fn test_single_pair_bands() {
        let bands = decompose("(.[.).]");
        assert_eq!(bands, vec![
            Band { outer: (0, 4), inner: (0, 4) },
            Band { outer: (2, 6), inner: (2, 6) },
        ]);
    }

    #[test]
    fn test_nested_region_has_no_bands() {
        assert!(decompose("((..))").is_empty());
    }

    #[test]
    fn test_band_completeness() {
        for s in ["((..[[..))..]]", "((.(..[[..)).)..]]", "((..[[..))..{{..]]..}}", "(.[.).]"] {
            let pt = PairTable::try_from(s).unwrap();
            let bands = decompose(s);
            for k in 0..pt.len() {
                let owners = bands.iter().filter(|b| b.contains(k)).count();
                if pt.is_paired(k) {
                    assert_eq!(owners, 1, "position {} in {}", k, s);
                } else {
                    assert!(owners <= 1);
                }
            }
            for b in &bands {
                for k in b.left().filter(|&k| pt.is_paired(k)) {
                    assert!(b.right().contains(&pt.partner(k).unwrap()));
                }
            }
        }
    }

    #[test]
    fn test_left_border_marks() {
        let pt = PairTable::try_from("((..[[..))..]]").unwrap();
        let mut pattern = BandPattern::new(&pt);
        pattern.decompose(&pt, 0, 13);
        assert!(pattern.is_left_border(0));
        assert!(pattern.is_left_border(8));
        assert!(!pattern.is_left_border(9));
        assert_eq!(pattern.other_border(0), 1);
        assert_eq!(pattern.other_border(8), 9);
        assert_eq!(pattern.other_border(4), 5);
        assert_eq!(pattern.other_border(12), 13);
    }
}

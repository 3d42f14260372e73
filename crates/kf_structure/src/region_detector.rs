use std::fmt;

use crate::PairTable;
use crate::StructureError;

/// A maximal interval `[begin, end]` whose pairs all stay inside it.
///
/// Nested regions satisfy `partner(begin) == end`. If a region had to be
/// dragged forward over a crossing pair, the outermost pairs interleave and
/// `partner(begin) != end`: the region is a pseudoknot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClosedRegion {
    pub begin: usize,
    pub end: usize,
}

impl ClosedRegion {
    pub fn contains(&self, k: usize) -> bool {
        self.begin <= k && k <= self.end
    }

    pub fn is_pseudoknotted(&self, pt: &PairTable) -> bool {
        pt.partner(self.begin) != Some(self.end)
    }
}

impl fmt::Display for ClosedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.begin, self.end)
    }
}

/// Bracket matching that tolerates crossings.
///
/// Positions are fed strictly left to right. The stack holds the regions
/// that are still open; a closing position whose partner lies below the
/// begin of the topmost region drags every region above that partner into
/// the enclosing one.
#[derive(Debug, Default)]
pub struct RegionDetector {
    stack: Vec<ClosedRegion>,
    position: usize,
}

impl RegionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the next position and return the region it completes, if any.
    pub fn push_position(&mut self, pt: &PairTable, i: usize) -> Result<Option<ClosedRegion>, StructureError> {
        if i != self.position {
            return Err(StructureError::MalformedRegion(i));
        }
        self.position += 1;

        match pt.partner(i) {
            None => return Ok(None),
            Some(j) if j > i => {
                self.stack.push(ClosedRegion { begin: i, end: j });
            }
            Some(j) if j < i => {
                let mut end = i;
                loop {
                    let top = self.stack.last().ok_or(StructureError::MalformedRegion(i))?;
                    if top.begin <= j {
                        break;
                    }
                    end = end.max(top.end);
                    self.stack.pop();
                }
                if let Some(top) = self.stack.last_mut() {
                    top.end = top.end.max(end);
                }
            }
            Some(_) => return Err(StructureError::InvalidPairTable(i)),
        }

        match self.stack.last() {
            Some(top) if top.end == i => Ok(self.stack.pop()),
            _ => Ok(None),
        }
    }

    /// Every opened region must have been closed by the end of the scan.
    pub fn finish(self) -> Result<(), StructureError> {
        match self.stack.first() {
            Some(open) => Err(StructureError::UnmatchedOpen(open.begin)),
            None => Ok(()),
        }
    }
}

/// All closed regions of a pair table, in the order they close.
pub fn detect_regions(pt: &PairTable) -> Result<Vec<ClosedRegion>, StructureError> {
    let mut detector = RegionDetector::new();
    let mut regions = Vec::new();
    for i in 0..pt.len() {
        if let Some(region) = detector.push_position(pt, i)? {
            regions.push(region);
        }
    }
    detector.finish()?;
    Ok(regions)
}

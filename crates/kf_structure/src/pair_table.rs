use std::ops::Deref;
use std::convert::TryFrom;

use crate::StructureError;
use crate::{DotBracket, DotBracketVec, NUM_FAMILIES};

/// Symmetric partner table: `pt[i] == Some(j)` iff `pt[j] == Some(i)`.
/// Pairs may cross.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairTable(Vec<Option<usize>>);

impl PairTable {
    /// An open chain of length `n`.
    pub fn unpaired(n: usize) -> Self {
        PairTable(vec![None; n])
    }

    pub fn partner(&self, i: usize) -> Option<usize> {
        self.0.get(i).copied().flatten()
    }

    pub fn is_paired(&self, i: usize) -> bool {
        self.partner(i).is_some()
    }

    /// All pairs `(i, j)` with `i < j`, ordered by `i`.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().enumerate().filter_map(|(i, &p)| match p {
            Some(j) if j > i => Some((i, j)),
            _ => None,
        })
    }

    /// Check if the substructure from `i..j` is well-formed:
    /// - All pairings are internal to the interval
    pub fn is_well_formed(&self, i: usize, j: usize) -> bool {
        (i..j.min(self.len())).all(|k| match self[k] {
            Some(l) => i <= l && l < j,
            None => true,
        })
    }

    /// True if no two pairs interleave.
    pub fn is_pseudoknot_free(&self) -> bool {
        let mut stack: Vec<usize> = Vec::new();
        for (i, &p) in self.0.iter().enumerate() {
            match p {
                Some(j) if j > i => stack.push(j),
                Some(_) => {
                    if stack.pop() != Some(i) {
                        return false;
                    }
                }
                None => (),
            }
        }
        true
    }

    fn validate(&self) -> Result<(), StructureError> {
        for (i, &p) in self.0.iter().enumerate() {
            if let Some(j) = p {
                if j == i || j >= self.len() {
                    return Err(StructureError::InvalidPairTable(i));
                }
                if self.0[j] != Some(i) {
                    return Err(StructureError::AsymmetricPair(i, j));
                }
            }
        }
        Ok(())
    }
}

impl Deref for PairTable {
    type Target = [Option<usize>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Accepts an explicit partner table, rejecting asymmetric or out-of-range
/// entries.
impl TryFrom<Vec<Option<usize>>> for PairTable {
    type Error = StructureError;

    fn try_from(table: Vec<Option<usize>>) -> Result<Self, Self::Error> {
        let pt = PairTable(table);
        pt.validate()?;
        Ok(pt)
    }
}

impl TryFrom<&str> for PairTable {
    type Error = StructureError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        PairTable::try_from(&DotBracketVec::try_from(s)?)
    }
}

impl TryFrom<&DotBracketVec> for PairTable {
    type Error = StructureError;

    fn try_from(db: &DotBracketVec) -> Result<Self, Self::Error> {
        // One stack per bracket family: brackets of different families may
        // interleave, brackets of the same family must nest.
        let mut stacks: Vec<Vec<usize>> = vec![Vec::new(); NUM_FAMILIES];
        let mut table = vec![None; db.len()];

        for (i, dot) in db.iter().enumerate() {
            match *dot {
                DotBracket::Open(k) => stacks[k as usize].push(i),
                DotBracket::Close(k) => {
                    let j = stacks[k as usize].pop().ok_or(StructureError::UnmatchedClose(i))?;
                    table[i] = Some(j);
                    table[j] = Some(i);
                }
                DotBracket::Unpaired => {}
            }
        }

        if let Some(i) = stacks.iter().filter_map(|s| s.first()).min() {
            return Err(StructureError::UnmatchedOpen(*i));
        }

        Ok(PairTable(table))
    }
}

use crate::EnergyError;

/// One flag per position: has some loop already counted this base as a
/// dangling end (or as part of a coaxial stack)?
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingTable {
    consumed: Vec<bool>,
}

impl DanglingTable {
    pub fn new(len: usize) -> Self {
        DanglingTable { consumed: vec![false; len] }
    }

    pub fn is_available(&self, k: usize) -> bool {
        self.consumed.get(k).is_some_and(|&c| !c)
    }

    /// Mark `k` as counted. Counting a base twice is a bookkeeping bug.
    pub fn consume(&mut self, k: usize) -> Result<(), EnergyError> {
        match self.consumed.get_mut(k) {
            Some(c) if !*c => {
                *c = true;
                Ok(())
            }
            _ => Err(EnergyError::DanglingConflict(k)),
        }
    }

    pub fn num_consumed(&self) -> usize {
        self.consumed.iter().filter(|&&c| c).count()
    }
}

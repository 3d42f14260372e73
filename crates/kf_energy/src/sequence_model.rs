use kf_structure::PairTable;

use crate::Base;
use crate::EnergyError;
use crate::NucleotideVec;
use crate::PairTypeRNA;

/// A sequence together with its (possibly crossing) pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceModel {
    sequence: NucleotideVec,
    pairs: PairTable,
    /// Unpaired and directly next to a paired position.
    may_dangle: Vec<bool>,
}

impl SequenceModel {
    pub fn new(sequence: NucleotideVec, pairs: PairTable) -> Result<Self, EnergyError> {
        if sequence.len() != pairs.len() {
            return Err(EnergyError::LengthMismatch(sequence.len(), pairs.len()));
        }
        let may_dangle = (0..pairs.len()).map(|i| {
            !pairs.is_paired(i)
                && ((i > 0 && pairs.is_paired(i - 1)) || (i + 1 < pairs.len() && pairs.is_paired(i + 1)))
        }).collect();
        Ok(SequenceModel { sequence, pairs, may_dangle })
    }

    /// Parse and validate both strings. Sequence symbols are checked first,
    /// then the length limit, so neither of those errors depends on the
    /// structure being well-formed.
    pub fn from_strings(sequence: &str, structure: &str, max_len: usize) -> Result<Self, EnergyError> {
        let sequence = NucleotideVec::try_from(sequence.trim())?;
        if sequence.len() > max_len {
            return Err(EnergyError::SizeLimitExceeded { len: sequence.len(), max: max_len });
        }
        let pairs = PairTable::try_from(structure.trim())?;
        SequenceModel::new(sequence, pairs)
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn sequence(&self) -> &NucleotideVec {
        &self.sequence
    }

    pub fn pairs(&self) -> &PairTable {
        &self.pairs
    }

    pub fn base(&self, i: usize) -> Base {
        self.sequence[i]
    }

    pub fn partner(&self, i: usize) -> Option<usize> {
        self.pairs.partner(i)
    }

    /// Only these positions can dangle on a helix or join a coaxial stack.
    pub fn may_dangle(&self, i: usize) -> bool {
        self.may_dangle.get(i).copied().unwrap_or(false)
    }

    /// Type of the pair `(i, partner(i))`, in that orientation.
    pub fn pair_type(&self, i: usize) -> PairTypeRNA {
        match self.partner(i) {
            Some(j) => PairTypeRNA::from((self.base(i), self.base(j))),
            None => PairTypeRNA::NN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kf_structure::StructureError;
    use crate::SequenceError;

    #[test]
    fn test_from_strings() {
        let model = SequenceModel::from_strings("GGGAAACCC", "(((...)))", 100).unwrap();
        assert_eq!(model.len(), 9);
        assert_eq!(model.partner(0), Some(8));
        assert_eq!(model.pair_type(0), PairTypeRNA::GC);
        assert_eq!(model.pair_type(8), PairTypeRNA::CG);
        assert_eq!(model.pair_type(4), PairTypeRNA::NN);
    }

    #[test]
    fn test_invalid_symbol_comes_first() {
        let err = SequenceModel::from_strings("GGXAAACCC", "((((", 100).unwrap_err();
        assert!(matches!(err, EnergyError::Sequence(SequenceError::InvalidChar('X', 2))));
    }

    #[test]
    fn test_size_limit_before_structure() {
        let err = SequenceModel::from_strings("GGGAAACCC", "(((", 5).unwrap_err();
        assert!(matches!(err, EnergyError::SizeLimitExceeded { len: 9, max: 5 }));
    }

    #[test]
    fn test_malformed_structure() {
        let err = SequenceModel::from_strings("GGGAAACCC", "(((...))", 100).unwrap_err();
        assert!(matches!(err, EnergyError::Structure(StructureError::UnmatchedOpen(0))));
        assert!(err.is_malformed_pairing());
    }

    #[test]
    fn test_length_mismatch() {
        let err = SequenceModel::from_strings("GGGAAACCC", "((...))", 100).unwrap_err();
        assert!(matches!(err, EnergyError::LengthMismatch(9, 7)));
    }

    #[test]
    fn test_may_dangle_flags() {
        let model = SequenceModel::from_strings("AGGAAACCA", ".((...)).", 100).unwrap();
        assert!(model.may_dangle(0));
        assert!(model.may_dangle(8));
        assert!(model.may_dangle(3));
        assert!(!model.may_dangle(4));
        assert!(!model.may_dangle(1));
        assert!(!model.may_dangle(9));

        let model = SequenceModel::from_strings("AAAA", "....", 100).unwrap();
        assert!((0..4).all(|i| !model.may_dangle(i)));
    }
}

use std::fmt;
use std::borrow::Borrow;
use std::ops::Deref;

use log::warn;
use colored::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// An unsupported symbol and its position.
    InvalidChar(char, usize),
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceError::InvalidChar(c, i) => {
                write!(f, "Unsupported nucleotide '{}' at position {}", c, i)
            }
        }
    }
}

impl std::error::Error for SequenceError {}

#[derive(Clone, Hash, Copy, Debug, Eq, PartialEq)]
pub enum Base { A, C, G, U }
pub const BCOUNT: usize = 4; // 4 Base variants for tables.

impl TryFrom<char> for Base {
    type Error = SequenceError;
    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c.to_ascii_uppercase() {
            'A' => Ok(Base::A),
            'C' => Ok(Base::C),
            'G' => Ok(Base::G),
            'U' | 'T' => Ok(Base::U),
            _ => Err(SequenceError::InvalidChar(c, 0)),
        }
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Base::A => 'A',
            Base::C => 'C',
            Base::G => 'G',
            Base::U => 'U',
        };
        write!(f, "{}", c)
    }
}

#[derive(Clone, Hash, Debug, Eq, PartialEq)]
pub struct NucleotideVec(pub Vec<Base>);

impl Deref for NucleotideVec {
    type Target = [Base];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<[Base]> for NucleotideVec {
    fn borrow(&self) -> &[Base] {
        &self.0
    }
}

impl TryFrom<&str> for NucleotideVec {
    type Error = SequenceError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let mut vec = Vec::with_capacity(s.len());
        for (i, c) in s.chars().enumerate() {
            let base = Base::try_from(c).map_err(|_| SequenceError::InvalidChar(c, i))?;
            vec.push(base);
        }
        Ok(NucleotideVec(vec))
    }
}

impl fmt::Display for NucleotideVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for base in &self.0 {
            write!(f, "{}", base)?;
        }
        Ok(())
    }
}

const PAIR_LOOKUP: [[PairTypeRNA; BCOUNT]; BCOUNT] = {
    use Base::*;
    use PairTypeRNA::*;
    let mut table = [[NN; BCOUNT]; BCOUNT];
    table[A as usize][U as usize] = AU;
    table[U as usize][A as usize] = UA;
    table[C as usize][G as usize] = CG;
    table[G as usize][C as usize] = GC;
    table[G as usize][U as usize] = GU;
    table[U as usize][G as usize] = UG;
    table
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PairTypeRNA { AU, UA, CG, GC, GU, UG, NN }
pub const PCOUNT: usize = 7; // 7 Pair variants for tables.

impl From<(Base, Base)> for PairTypeRNA {
    fn from(pair: (Base, Base)) -> Self {
        PAIR_LOOKUP[pair.0 as usize][pair.1 as usize]
    }
}

impl fmt::Display for PairTypeRNA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PairTypeRNA::AU => "A-U",
            PairTypeRNA::UA => "U-A",
            PairTypeRNA::CG => "C-G",
            PairTypeRNA::GC => "G-C",
            PairTypeRNA::GU => "G-U",
            PairTypeRNA::UG => "U-G",
            PairTypeRNA::NN => "N-N",
        };
        write!(f, "{}", s)
    }
}

impl PairTypeRNA {
    /// Like `from`, but complains about non-canonical pairs. Structures may
    /// pair any two bases; those pairs are scored as `NN`.
    pub fn new(pair: (Base, Base)) -> Self {
        let pt = PAIR_LOOKUP[pair.0 as usize][pair.1 as usize];

        if pt == PairTypeRNA::NN {
            warn!("{} Non-canonical base pair: {}-{} -> scored as {}", "WARNING:".red(), pair.0, pair.1, pt);
        }

        pt
    }

    /// Pairs that take a terminal AU penalty.
    pub fn is_ru(&self) -> bool {
       matches!(self
            , PairTypeRNA::GU | PairTypeRNA::UG
            | PairTypeRNA::AU | PairTypeRNA::UA
            | PairTypeRNA::NN)
    }

    pub fn is_wcf(&self) -> bool {
       matches!(self
            , PairTypeRNA::GC | PairTypeRNA::CG
            | PairTypeRNA::AU | PairTypeRNA::UA)
    }

    pub fn is_wobble(&self) -> bool {
       matches!(self, PairTypeRNA::GU | PairTypeRNA::UG)
    }

    pub fn can_pair(&self) -> bool {
       self != &PairTypeRNA::NN
    }

    pub fn invert(&self) -> PairTypeRNA {
        use PairTypeRNA::*;
        match self {
            AU => UA,
            UA => AU,
            CG => GC,
            GC => CG,
            GU => UG,
            UG => GU,
            NN => NN,
        }
    }
}

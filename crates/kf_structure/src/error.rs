use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    UnmatchedOpen(usize),                // opening bracket at this position was never closed
    UnmatchedClose(usize),               // closing bracket at this position has no partner
    InvalidToken(String, String, usize), // invalid token, source, position
    InvalidPairTable(usize),             // self-pairing or out-of-range partner
    AsymmetricPair(usize, usize),        // i -> j, but j does not point back to i
    MalformedRegion(usize),              // no open region left to close at this position
}

impl StructureError {
    /// True for every error that describes an inconsistent pairing, as
    /// opposed to an unparsable token.
    pub fn is_malformed_pairing(&self) -> bool {
        !matches!(self, StructureError::InvalidToken(..))
    }
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureError::UnmatchedOpen(i) => {
                write!(f, "Unmatched opening bracket at position {}", i)
            }
            StructureError::UnmatchedClose(i) => {
                write!(f, "Unmatched closing bracket at position {}", i)
            }
            StructureError::InvalidToken(tok, src, i) => {
                write!(f, "Invalid {} in {} at position {}", tok, src, i)
            }
            StructureError::InvalidPairTable(i) => {
                write!(f, "Invalid entry at pair table position {}", i)
            }
            StructureError::AsymmetricPair(i, j) => {
                write!(f, "Asymmetric pairing: {} -> {}, but not {} -> {}", i, j, j, i)
            }
            StructureError::MalformedRegion(i) => {
                write!(f, "Malformed pairing: cannot close a region at position {}", i)
            }
        }
    }
}

impl std::error::Error for StructureError {}

use std::fmt;

use kf_structure::StructureError;

use crate::SequenceError;

#[derive(Debug)]
pub enum ParamError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl std::error::Error for ParamError {}

impl From<std::io::Error> for ParamError {
    fn from(e: std::io::Error) -> Self {
        ParamError::Io(e)
    }
}

impl From<serde_json::Error> for ParamError {
    fn from(e: serde_json::Error) -> Self {
        ParamError::Parse(e.to_string())
    }
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::Io(e) => write!(f, "I/O error: {}", e),
            ParamError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ParamError::Invalid(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

/// Everything that can abort an evaluation.
#[derive(Debug)]
pub enum EnergyError {
    Sequence(SequenceError),
    Structure(StructureError),
    Parameters(ParamError),
    /// Sequence and structure lengths differ.
    LengthMismatch(usize, usize),
    SizeLimitExceeded { len: usize, max: usize },
    /// A loop tried to count a dangling end that another loop already counted.
    DanglingConflict(usize),
    UnknownNode(usize),
}

impl std::error::Error for EnergyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EnergyError::Sequence(e) => Some(e),
            EnergyError::Structure(e) => Some(e),
            EnergyError::Parameters(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for EnergyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnergyError::Sequence(e) => write!(f, "{}", e),
            EnergyError::Structure(e) => write!(f, "{}", e),
            EnergyError::Parameters(e) => write!(f, "{}", e),
            EnergyError::LengthMismatch(s, p) => {
                write!(f, "Sequence length {} does not match structure length {}", s, p)
            }
            EnergyError::SizeLimitExceeded { len, max } => {
                write!(f, "Sequence length {} exceeds the maximum of {}", len, max)
            }
            EnergyError::DanglingConflict(k) => {
                write!(f, "Internal error: dangling end at position {} counted twice", k)
            }
            EnergyError::UnknownNode(id) => {
                write!(f, "Internal error: no loop with id {}", id)
            }
        }
    }
}

impl From<SequenceError> for EnergyError {
    fn from(e: SequenceError) -> Self {
        EnergyError::Sequence(e)
    }
}

impl From<StructureError> for EnergyError {
    fn from(e: StructureError) -> Self {
        EnergyError::Structure(e)
    }
}

impl From<ParamError> for EnergyError {
    fn from(e: ParamError) -> Self {
        EnergyError::Parameters(e)
    }
}

impl EnergyError {
    /// Malformed pairing input, as opposed to bad symbols or resources.
    pub fn is_malformed_pairing(&self) -> bool {
        matches!(self, EnergyError::Structure(e) if e.is_malformed_pairing())
    }
}

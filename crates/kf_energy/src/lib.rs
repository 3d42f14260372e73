/// Error types for parameters and evaluation.
mod error;

/// Base, NucleotideVec, PairTypeRNA, ....
mod nucleotides;

/// The energy oracle trait: primitive loop energies.
mod energy_model;

/// Reading ViennaRNA parameter files.
mod parameter_parsing;

/// Nearest neighbor tables, built-in or from a parameter file.
mod energy_tables;

/// The tables behind the oracle trait.
mod nearest_neighbor;

/// Sequence plus pair table, validated together.
mod sequence_model;

/// Pseudoknot parameters and engine configuration.
mod pk_model;

/// Bookkeeping of dangling ends.
mod dangles;

/// Choosing coaxial stacks within a loop.
pub mod coaxial;

/// Per-evaluation working state.
mod context;

/// Putting it all together.
mod engine;

pub use error::*;
pub use nucleotides::*;
pub use energy_model::*;
pub use energy_tables::*;
pub use nearest_neighbor::*;
pub use sequence_model::*;
pub use pk_model::*;
pub use dangles::*;
pub use context::*;
pub use engine::*;

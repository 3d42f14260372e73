//! # knotfold
//!
//! Free energies of RNA secondary structures, pseudoknots included.
//!
//! ```
//! let dg = knotfold::get_energy("GGGAAAGGGAAACCCAAACCC", "(((...[[[...)))...]]]").unwrap();
//! assert!(dg.is_finite());
//! ```
//!
//! This crate re-exports the main functionality from its submodules.

pub mod input_parsers;
pub mod energy_parsers;

mod evaluator;
pub use evaluator::*;

pub mod structure {
    pub use ::kf_structure::*;
}

pub mod energy {
    pub use ::kf_energy::*;
}

mod error;
mod dotbracket;
mod pair_table;
mod region_detector;
mod bands;
mod loop_tree;

pub use error::*;
pub use dotbracket::*;
pub use pair_table::*;
pub use region_detector::*;
pub use bands::*;
pub use loop_tree::*;

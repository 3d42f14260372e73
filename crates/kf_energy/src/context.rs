use std::fmt;

use log::debug;
use kf_structure::BandPattern;
use kf_structure::PairTable;

use crate::DanglingTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    DetectingRegions,
    BuildingTree,
    DecomposingBands,
    Classifying,
    Scoring,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::DetectingRegions => "detecting regions",
            Stage::BuildingTree => "building tree",
            Stage::DecomposingBands => "decomposing bands",
            Stage::Classifying => "classifying",
            Stage::Scoring => "scoring",
            Stage::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// All mutable state of one evaluation. Nothing here outlives the call that
/// created it.
#[derive(Debug)]
pub struct EvaluationContext {
    stage: Stage,
    pub dangles: DanglingTable,
    pub pattern: BandPattern,
}

impl EvaluationContext {
    pub fn new(pt: &PairTable) -> Self {
        EvaluationContext {
            stage: Stage::Idle,
            dangles: DanglingTable::new(pt.len()),
            pattern: BandPattern::new(pt),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn advance(&mut self, next: Stage) {
        debug!("{} -> {}", self.stage, next);
        self.stage = next;
    }
}

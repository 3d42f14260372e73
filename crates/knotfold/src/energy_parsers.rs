use std::path::PathBuf;
use clap::Args;
use clap::ValueEnum;
use log::debug;

use kf_energy::CoaxialStrategy;
use kf_energy::EngineConfig;
use kf_energy::MAX_SEQUENCE_LENGTH;
use kf_energy::MismatchDangles;
use kf_energy::ParamError;
use kf_energy::PkModel;

use crate::Evaluator;
use crate::ModelParameters;

/// Pseudoknot energy model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PkModelArg {
    /// Dirks & Pierce
    Dp,
    /// Rivas & Eddy
    Re,
    /// H-type tables where they apply, Dirks & Pierce elsewhere
    Htype,
}

impl From<PkModelArg> for PkModel {
    fn from(arg: PkModelArg) -> Self {
        match arg {
            PkModelArg::Dp => PkModel::DirksPierce,
            PkModelArg::Re => PkModel::RivasEddy,
            PkModelArg::Htype => PkModel::HType,
        }
    }
}

/// Coaxial stacking of adjacent helices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CoaxialArg {
    /// Best set in which no helix stacks twice
    Minimum,
    /// Every favorable pair
    All,
    /// No coaxial stacking
    #[value(name = "none")]
    Disabled,
}

impl From<CoaxialArg> for CoaxialStrategy {
    fn from(arg: CoaxialArg) -> Self {
        match arg {
            CoaxialArg::Minimum => CoaxialStrategy::MinimumNonOverlapping,
            CoaxialArg::All => CoaxialStrategy::AllPairs,
            CoaxialArg::Disabled => CoaxialStrategy::Disabled,
        }
    }
}

/// Dangles claimed by a single-mismatch coaxial stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MismatchDanglesArg {
    /// Only the end that forms the mismatch
    Involved,
    /// Both ends flanking the stack
    Both,
}

impl From<MismatchDanglesArg> for MismatchDangles {
    fn from(arg: MismatchDanglesArg) -> Self {
        match arg {
            MismatchDanglesArg::Involved => MismatchDangles::Involved,
            MismatchDanglesArg::Both => MismatchDangles::Both,
        }
    }
}

/// Free energy evaluation parameters.
#[derive(Debug, Args)]
pub struct EnergyModelArguments {
    /// Parameter file or directory, repeatable: *.par for nearest neighbor
    /// tables, JSON for pseudoknot parameters
    #[arg(short, long, value_name = "PATH")]
    pub parameters: Vec<PathBuf>,

    /// Pseudoknot model
    #[arg(long, value_name = "MODEL", default_value = "dp")]
    pub pk_model: PkModelArg,

    /// Coaxial stacking
    #[arg(long, value_name = "STRATEGY", default_value = "minimum")]
    pub coaxial: CoaxialArg,

    /// Dangles claimed by a mismatch coaxial stack
    #[arg(long, value_name = "RULE", default_value = "both")]
    pub mismatch_dangles: MismatchDanglesArg,

    /// Ignore dangling ends
    #[arg(long)]
    pub no_dangles: bool,

    /// Longest sequence accepted
    #[arg(long, value_name = "N", default_value_t = MAX_SEQUENCE_LENGTH)]
    pub max_length: usize,
}

impl EnergyModelArguments {
    fn load_parameters(&self) -> Result<ModelParameters, ParamError> {
        let mut parameters = ModelParameters::default();
        for path in &self.parameters {
            parameters.load(path)?;
        }
        Ok(parameters)
    }

    fn config(&self, parameters: &ModelParameters) -> EngineConfig {
        debug!("Pseudoknot model: {:?}, coaxial stacking: {:?}, mismatch dangles: {:?}",
            self.pk_model, self.coaxial, self.mismatch_dangles);
        EngineConfig {
            params: parameters.pk.clone(),
            pk_model: self.pk_model.into(),
            coaxial: self.coaxial.into(),
            mismatch_dangles: self.mismatch_dangles.into(),
            dangles: !self.no_dangles,
            max_length: self.max_length,
        }
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ParamError> {
        Ok(self.config(&self.load_parameters()?))
    }

    pub fn build_evaluator(&self) -> Result<Evaluator, ParamError> {
        let parameters = self.load_parameters()?;
        let config = self.config(&parameters);
        Ok(Evaluator::with_oracle(parameters.oracle, config))
    }
}

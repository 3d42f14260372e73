use std::io;
use std::path::Path;

use log::debug;

use kf_energy::EnergyError;
use kf_energy::EngineConfig;
use kf_energy::Evaluation;
use kf_energy::NearestNeighborOracle;
use kf_energy::ParamError;
use kf_energy::PkModelParams;
use kf_energy::PseudoknotEnergy;
use kf_energy::SequenceModel;

/// Name of the pseudoknot parameter file inside a parameter directory.
pub const PARAMETER_FILE: &str = "pkmodel.json";

/// Name of the nearest neighbor parameter file (ViennaRNA format) inside a
/// parameter directory.
pub const TABLE_FILE: &str = "rna_turner2004.par";

/// Pseudoknot parameters and nearest neighbor tables. Both start out as the
/// built-in sets.
#[derive(Debug, Clone, Default)]
pub struct ModelParameters {
    pub pk: PkModelParams,
    pub oracle: NearestNeighborOracle,
}

impl ModelParameters {
    /// Files ending in `.par` replace the nearest neighbor tables, any other
    /// file is read as pseudoknot parameters (JSON). A directory may hold
    /// one of each, named [`PARAMETER_FILE`] and [`TABLE_FILE`].
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ParamError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return self.load_file(path);
        }
        for name in [PARAMETER_FILE, TABLE_FILE] {
            let file = path.join(name);
            if file.is_file() {
                self.load_file(&file)?;
            } else {
                debug!("No {} in {}, keeping the built-in set", name, path.display());
            }
        }
        Ok(())
    }

    fn load_file(&mut self, path: &Path) -> Result<(), ParamError> {
        debug!("Using parameter file: {}", path.display());
        if path.extension().is_some_and(|ext| ext == "par") {
            self.oracle = NearestNeighborOracle::from_parameter_file(path)?;
        } else {
            self.pk = PkModelParams::from_json_file(path)?;
        }
        Ok(())
    }
}

/// A configured energy model, ready to score any number of structures.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    engine: PseudoknotEnergy,
}

impl Evaluator {
    pub fn new(config: EngineConfig) -> Self {
        Evaluator { engine: PseudoknotEnergy::new(config) }
    }

    pub fn with_oracle(oracle: NearestNeighborOracle, config: EngineConfig) -> Self {
        Evaluator { engine: PseudoknotEnergy::with_oracle(oracle, config) }
    }

    pub fn engine(&self) -> &PseudoknotEnergy {
        &self.engine
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    /// Per-loop breakdown of one sequence/structure pair.
    pub fn evaluate(&self, sequence: &str, structure: &str) -> Result<Evaluation, EnergyError> {
        let model = SequenceModel::from_strings(sequence, structure, self.config().max_length)?;
        self.engine.evaluate(&model)
    }

    /// Free energy in kcal/mol.
    pub fn get_energy(&self, sequence: &str, structure: &str) -> Result<f64, EnergyError> {
        Ok(self.engine.energy_of_structure(sequence, structure)? as f64 / 100.)
    }
}

/// Load [`PARAMETER_FILE`] and [`TABLE_FILE`] from `dir`. Either one falls
/// back to the built-in set if the directory does not have it.
pub fn initialize<P: AsRef<Path>>(dir: P) -> Result<Evaluator, EnergyError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        let msg = format!("parameter directory {} not found", dir.display());
        return Err(ParamError::Io(io::Error::new(io::ErrorKind::NotFound, msg)).into());
    }

    let mut parameters = ModelParameters::default();
    parameters.load(dir)?;
    let config = EngineConfig { params: parameters.pk, ..Default::default() };
    Ok(Evaluator::with_oracle(parameters.oracle, config))
}

/// Free energy in kcal/mol under the default model.
pub fn get_energy(sequence: &str, structure: &str) -> Result<f64, EnergyError> {
    Evaluator::default().get_energy(sequence, structure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    const HTYPE_SEQ: &str = "GGGAAAGGGAAACCCAAACCC";
    const HTYPE_DB: &str = "(((...[[[...)))...]]]";

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("knotfold-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_energy() {
        let dg = get_energy("GGGAAACCC", "(((...)))").unwrap();
        let evaluator = Evaluator::default();
        let eval = evaluator.evaluate("GGGAAACCC", "(((...)))").unwrap();
        assert_eq!(dg, eval.kcal());
    }

    #[test]
    fn test_initialize_with_parameters() {
        let dir = scratch_dir("params");
        fs::write(dir.join(PARAMETER_FILE), r#"{ "ps": 5.6 }"#).unwrap();
        let custom = initialize(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let default = get_energy(HTYPE_SEQ, HTYPE_DB).unwrap();
        let cheaper = custom.get_energy(HTYPE_SEQ, HTYPE_DB).unwrap();
        assert!((default - cheaper - 4.0).abs() < 1e-9);
    }

    const TURNER_SUBSET: &str = "\
# stack
  -240  -330  -210  -140  -210  -210  -140
  -330  -340  -250  -150  -220  -240  -150
  -210  -250   130   -50  -140  -130   130
  -140  -150   -50    30   -60  -100    30
  -210  -220  -140   -60  -110   -90   -60
  -210  -240  -130  -100   -90  -130   -90
  -140  -150   130    30   -60   -90   130
# mismatch_hairpin
   -80  -100  -110  -100   -80
  -140  -150  -150  -140  -150
# dangle5
   -10   -50   -30   -20   -10
    -0   -20   -30    -0    -0
# dangle3
   -40  -110   -40  -130   -60
   -80  -170   -80  -170  -120
# hairpin
   INF   INF   INF   540   560   570   540   600   550   640
   650   660   670   680   690   690   700   710   710   720
   720   730   730   740   740   750   750   750   760   760
   770
# bulge
   INF   380   280   320   360   400   440   459   470   480
   490   500   510   519   527   534   541   548   554   560
   565   571   576   580   585   589   594   598   602   605
   609
# interior
   INF   INF   INF   INF   110   200   200   210   230   240
   250   260   270   280   290   290   300   310   310   320
   330   330   340   340   350   350   350   360   360   370
   370
# NINIO
    60   320   300
# Misc
   410   360    50   370  107856     0
# END
";

    #[test]
    fn test_initialize_with_tables() {
        let dir = scratch_dir("tables");
        fs::write(dir.join(TABLE_FILE), TURNER_SUBSET).unwrap();
        let custom = initialize(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        // The hairpin mismatch table replaces the dangle approximation:
        // 560 - 150 instead of 560 - 50 - 110.
        let seq = "GGCAAAAGCC";
        let db = "(((....)))";
        let default = get_energy(seq, db).unwrap();
        let tabulated = custom.get_energy(seq, db).unwrap();
        assert!((tabulated - default - 0.1).abs() < 1e-9);
        assert_eq!(custom.config().params, PkModelParams::default());
    }

    #[test]
    fn test_load_single_files() {
        let dir = scratch_dir("files");
        let table = dir.join("custom.par");
        let json = dir.join("custom.json");
        fs::write(&table, TURNER_SUBSET).unwrap();
        fs::write(&json, r#"{ "pb": 0.5 }"#).unwrap();
        fs::write(dir.join("broken.par"), "# stack\n-240 -330\n").unwrap();

        let mut parameters = ModelParameters::default();
        parameters.load(&table).unwrap();
        parameters.load(&json).unwrap();
        let broken = parameters.load(dir.join("broken.par"));
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(parameters.pk.pb, 0.5);
        assert!(parameters.oracle.tables().mismatch_hairpin.iter().flatten().flatten().any(|x| x.is_some()));
        assert!(matches!(broken, Err(ParamError::Invalid(_))));
    }

    #[test]
    fn test_initialize_without_file() {
        let dir = scratch_dir("empty");
        let evaluator = initialize(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();
        assert_eq!(evaluator.config().params, PkModelParams::default());
    }

    #[test]
    fn test_initialize_errors() {
        let err = initialize("/no/such/knotfold/dir").unwrap_err();
        assert!(matches!(err, EnergyError::Parameters(ParamError::Io(_))));

        let dir = scratch_dir("broken");
        fs::write(dir.join(PARAMETER_FILE), "{ not json").unwrap();
        let err = initialize(&dir).unwrap_err();
        fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(err, EnergyError::Parameters(ParamError::Parse(_))));
    }

    #[test]
    fn test_errors_pass_through() {
        assert!(get_energy("GGGAAACC", "(((...))").unwrap_err().is_malformed_pairing());
        assert!(matches!(get_energy("GGGAZACCC", "(((...)))"), Err(EnergyError::Sequence(_))));
    }
}

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ParamError;

/// Conversion from kcal/mol to the internal dcal/mol unit.
pub const KCAL_TO_DCAL: f64 = 100.0;

/// Default maximum sequence length.
pub const MAX_SEQUENCE_LENGTH: usize = 1600;

/// kcal/(mol K)
pub const GAS_CONSTANT: f64 = 0.001987;

/// 37°C in Kelvin.
pub const TEMPERATURE: f64 = 310.15;

fn to_dcal(kcal: f64) -> i32 {
    (kcal * KCAL_TO_DCAL).round() as i32
}

/// Lookup tables for the H-type pseudoknot model, in kcal/mol.
///
/// `loop1[l1][l2]` is the cost of the loop that crosses the deep groove
/// (spanning the second stem) given its length and the length of the
/// middle loop, `loop3[l3][l2]` the cost of the loop crossing the shallow
/// groove. Loops shorter than `min_loop` are not covered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HTypeTables {
    pub assembly: f64,
    pub max_loop2: usize,
    #[serde(default)]
    pub min_loop: usize,
    pub loop1: Vec<Vec<f64>>,
    pub loop3: Vec<Vec<f64>>,
}

/// Longest outer loop in the default tables.
const HTYPE_DEFAULT_MAX_LOOP: usize = 12;

impl Default for HTypeTables {
    /// Stems that touch (no middle loop) and outer loops of 1 to 12 bases.
    /// Assembly is the cost of fixing the junction, RT ln 9. Each outer loop
    /// pays a hairpin-like initiation, logarithmic in its length.
    fn default() -> Self {
        let cost = |l: usize| 5.4 + 1.07856 * (l.max(1) as f64 / 3.0).ln();
        let rows: Vec<Vec<f64>> = (0..=HTYPE_DEFAULT_MAX_LOOP).map(|l| vec![cost(l)]).collect();
        HTypeTables {
            assembly: GAS_CONSTANT * TEMPERATURE * 9f64.ln(),
            max_loop2: 0,
            min_loop: 1,
            loop1: rows.clone(),
            loop3: rows,
        }
    }
}

impl HTypeTables {
    /// Loop cost for loop lengths `(l1, l2, l3)`, if the tables cover them.
    pub fn lookup(&self, l1: usize, l2: usize, l3: usize) -> Option<f64> {
        if l2 > self.max_loop2 || l1 < self.min_loop || l3 < self.min_loop {
            return None;
        }
        let a = self.loop1.get(l1)?.get(l2)?;
        let b = self.loop3.get(l3)?.get(l2)?;
        Some(self.assembly + a + b)
    }
}

/// Rivas & Eddy pseudoknot parameters, in kcal/mol.
///
/// `g_interior` scales every loop that spans a band. Only `g_interior`
/// and `m_tilda` are published values, the rest are starting points meant
/// to be overridden from `pkmodel.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReParams {
    pub g_interior: f64,
    /// Per band pair closing the pseudoloop.
    pub p_tilda: f64,
    /// Per nested child of the pseudoloop.
    pub p_i: f64,
    /// Per unpaired base of the pseudoloop.
    pub q_tilda: f64,
    /// Initiation of a multiloop that spans a band.
    pub m_tilda: f64,
    /// Pseudoknot initiation.
    pub gw: f64,
    /// Each band beyond the first two.
    pub gwh: f64,
    /// Per band pair closing a spanning multiloop.
    pub p_paired: f64,
}

impl Default for ReParams {
    fn default() -> Self {
        ReParams {
            g_interior: 0.83,
            p_tilda: 0.1,
            p_i: 0.1,
            q_tilda: 0.2,
            m_tilda: 8.43,
            gw: 7.0,
            gwh: 6.0,
            p_paired: 0.1,
        }
    }
}

impl ReParams {
    fn named(&self) -> [(&'static str, f64); 8] {
        [
            ("re.g_interior", self.g_interior), ("re.p_tilda", self.p_tilda),
            ("re.p_i", self.p_i), ("re.q_tilda", self.q_tilda),
            ("re.m_tilda", self.m_tilda), ("re.gw", self.gw),
            ("re.gwh", self.gwh), ("re.p_paired", self.p_paired),
        ]
    }

    pub fn penalties(&self) -> RePenalties {
        RePenalties {
            g_interior: self.g_interior,
            p_tilda: to_dcal(self.p_tilda),
            p_i: to_dcal(self.p_i),
            q_tilda: to_dcal(self.q_tilda),
            m_tilda: to_dcal(self.m_tilda),
            gw: to_dcal(self.gw),
            gwh: to_dcal(self.gwh),
            p_paired: to_dcal(self.p_paired),
        }
    }
}

/// Rivas & Eddy parameters in dcal/mol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RePenalties {
    pub g_interior: f64,
    pub p_tilda: i32,
    pub p_i: i32,
    pub q_tilda: i32,
    pub m_tilda: i32,
    pub gw: i32,
    pub gwh: i32,
    pub p_paired: i32,
}

/// Dirks & Pierce pseudoknot parameters as read from JSON, in kcal/mol.
/// `st_p` and `int_p` scale the energies of loops that span a band. The
/// Rivas & Eddy set lives under `re`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PkModelParams {
    pub ps: f64,
    pub psm: f64,
    pub psp: f64,
    pub pb: f64,
    pub pup: f64,
    pub pps: f64,
    pub st_p: f64,
    pub int_p: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub a_p: f64,
    pub b_p: f64,
    pub c_p: f64,
    pub re: ReParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub htype: Option<HTypeTables>,
}

impl Default for PkModelParams {
    fn default() -> Self {
        PkModelParams {
            ps: 9.6,
            psm: 15.0,
            psp: 15.0,
            pb: 0.2,
            pup: 0.1,
            pps: 0.1,
            st_p: 0.89,
            int_p: 0.74,
            a: 3.4,
            b: 0.4,
            c: 0.0,
            a_p: 3.4,
            b_p: 0.4,
            c_p: 0.0,
            re: ReParams::default(),
            htype: None,
        }
    }
}

impl PkModelParams {
    pub fn from_json_str(json: &str) -> Result<Self, ParamError> {
        let params: PkModelParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ParamError> {
        let reader = BufReader::new(File::open(path)?);
        let params: PkModelParams = serde_json::from_reader(reader)?;
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), ParamError> {
        let named = [
            ("ps", self.ps), ("psm", self.psm), ("psp", self.psp),
            ("pb", self.pb), ("pup", self.pup), ("pps", self.pps),
            ("st_p", self.st_p), ("int_p", self.int_p),
            ("a", self.a), ("b", self.b), ("c", self.c),
            ("a_p", self.a_p), ("b_p", self.b_p), ("c_p", self.c_p),
        ];
        let re = self.re.named();
        if let Some((name, _)) = named.iter().chain(re.iter()).find(|(_, v)| !v.is_finite()) {
            return Err(ParamError::Invalid(format!("'{}' must be a finite number", name)));
        }
        if let Some(h) = &self.htype {
            let ragged = |t: &Vec<Vec<f64>>| t.iter().any(|row| row.len() <= h.max_loop2);
            if ragged(&h.loop1) || ragged(&h.loop3) {
                return Err(ParamError::Invalid(format!(
                    "htype rows need {} columns (max_loop2 + 1)", h.max_loop2 + 1)));
            }
        }
        Ok(())
    }

    pub fn penalties(&self) -> PkPenalties {
        PkPenalties {
            ps: to_dcal(self.ps),
            psm: to_dcal(self.psm),
            psp: to_dcal(self.psp),
            pb: to_dcal(self.pb),
            pup: to_dcal(self.pup),
            pps: to_dcal(self.pps),
            st_p: self.st_p,
            int_p: self.int_p,
            a: to_dcal(self.a),
            b: to_dcal(self.b),
            c: to_dcal(self.c),
            a_p: to_dcal(self.a_p),
            b_p: to_dcal(self.b_p),
            c_p: to_dcal(self.c_p),
            re: self.re.penalties(),
        }
    }
}

/// The same parameters in dcal/mol, converted once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PkPenalties {
    pub ps: i32,
    pub psm: i32,
    pub psp: i32,
    pub pb: i32,
    pub pup: i32,
    pub pps: i32,
    pub st_p: f64,
    pub int_p: f64,
    pub a: i32,
    pub b: i32,
    pub c: i32,
    pub a_p: i32,
    pub b_p: i32,
    pub c_p: i32,
    pub re: RePenalties,
}

impl PkPenalties {
    pub fn scale(factor: f64, en: i32) -> i32 {
        (factor * en as f64).round() as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PkModel {
    #[default]
    DirksPierce,
    RivasEddy,
    /// H-type lookup tables where they apply, Dirks & Pierce elsewhere.
    HType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoaxialStrategy {
    /// Best set of adjacent helix pairs in which no helix stacks twice.
    #[default]
    MinimumNonOverlapping,
    /// Every favorable adjacent pair, without resolving conflicts.
    AllPairs,
    Disabled,
}

/// Which dangling ends a single-mismatch coaxial stack claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MismatchDangles {
    /// Only the end that forms the mismatch.
    Involved,
    /// Both ends flanking the stack.
    #[default]
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub params: PkModelParams,
    pub pk_model: PkModel,
    pub coaxial: CoaxialStrategy,
    pub mismatch_dangles: MismatchDangles,
    pub dangles: bool,
    pub max_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            params: PkModelParams::default(),
            pk_model: PkModel::default(),
            coaxial: CoaxialStrategy::default(),
            mismatch_dangles: MismatchDangles::default(),
            dangles: true,
            max_length: MAX_SEQUENCE_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_parameters_match_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/params/pkmodel_dp.json");
        let params = PkModelParams::from_json_file(path).unwrap();
        assert_eq!(params, PkModelParams::default());
    }

    #[test]
    fn test_unit_conversion() {
        let pen = PkModelParams::default().penalties();
        assert_eq!(pen.ps, 960);
        assert_eq!(pen.psm, 1500);
        assert_eq!(pen.pb, 20);
        assert_eq!(pen.pup, 10);
        assert_eq!(pen.c, 0);
        assert_eq!(PkPenalties::scale(pen.st_p, -330), -294);
        assert_eq!(PkPenalties::scale(pen.int_p, 110), 81);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params = PkModelParams::from_json_str(r#"{ "ps": 7.0, "pb": 0.3 }"#).unwrap();
        assert_eq!(params.ps, 7.0);
        assert_eq!(params.pb, 0.3);
        assert_eq!(params.psm, 15.0);
        assert!(params.htype.is_none());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(PkModelParams::from_json_str("{ ps: 1 }"), Err(ParamError::Parse(_))));
        assert!(matches!(PkModelParams::from_json_file("/no/such/pkmodel.json"), Err(ParamError::Io(_))));

        let ragged = r#"{ "htype": { "assembly": 1.0, "max_loop2": 2,
            "loop1": [[0.0, 0.0, 0.0], [0.0]], "loop3": [[0.0, 0.0, 0.0]] } }"#;
        assert!(matches!(PkModelParams::from_json_str(ragged), Err(ParamError::Invalid(_))));
    }

    #[test]
    fn test_htype_lookup() {
        let tables = HTypeTables {
            assembly: 2.0,
            max_loop2: 1,
            min_loop: 0,
            loop1: vec![vec![9.0, 9.0], vec![1.0, 1.5], vec![0.5, 0.75]],
            loop3: vec![vec![9.0, 9.0], vec![3.0, 3.5]],
        };
        assert_eq!(tables.lookup(1, 0, 1), Some(6.0));
        assert_eq!(tables.lookup(2, 1, 1), Some(6.25));
        assert_eq!(tables.lookup(3, 0, 1), None);
        assert_eq!(tables.lookup(1, 2, 1), None);
        assert_eq!(tables.lookup(1, 0, 2), None);
    }

    #[test]
    fn test_default_htype_tables() {
        let tables = HTypeTables::default();
        assert!((tables.assembly - 1.354).abs() < 1e-3);
        assert_eq!(tables.lookup(3, 0, 3).map(|e| (e * 100.0).round()), Some(1215.0));
        // Longer loops cost more.
        assert!(tables.lookup(3, 0, 9) > tables.lookup(3, 0, 3));
        assert_eq!(tables.lookup(0, 0, 3), None);
        assert_eq!(tables.lookup(3, 1, 3), None);
        assert_eq!(tables.lookup(13, 0, 3), None);
    }

    #[test]
    fn test_rivas_eddy_parameters() {
        let params = PkModelParams::from_json_str(r#"{ "re": { "gw": 8.0 } }"#).unwrap();
        assert_eq!(params.re.gw, 8.0);
        assert_eq!(params.re.g_interior, 0.83);
        let pen = params.penalties();
        assert_eq!(pen.re.gw, 800);
        assert_eq!(pen.re.m_tilda, 843);
        assert_eq!(PkPenalties::scale(pen.re.g_interior, -240), -199);

        let bad = PkModelParams { re: ReParams { gwh: f64::NAN, ..Default::default() }, ..Default::default() };
        assert!(matches!(bad.validate(), Err(ParamError::Invalid(_))));
    }
}

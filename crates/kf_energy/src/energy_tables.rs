use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use ahash::AHashMap;
use ahash::AHashSet;

use crate::NucleotideVec;
use crate::ParamError;
use crate::BCOUNT as B;
use crate::PCOUNT as P;
use crate::parameter_parsing::ParamFileSection;

pub const MAX_LOOP: usize = 30;

/// The built-in set, compiled into the binary.
const BUILTIN_PARAMETERS: &str = include_str!("../params/rna_nearest_neighbor.par");

/// Sections a parameter file must provide, the rest are optional.
const REQUIRED_SECTIONS: [&str; 8] = [
    "stack", "dangle5", "dangle3", "hairpin", "bulge", "interior", "NINIO", "Misc",
];

pub type MismatchTable = [[[Option<i32>; B]; B]; P];

#[derive(Debug, Clone, PartialEq)]
pub struct Ninio {
    pub en37: i32,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Misc {
    pub terminal_ru: i32,
    /// Slope of the logarithmic loop extrapolation (dcal/mol).
    pub lxc: f64,
}

/// Nearest neighbor tables in dcal/mol. `None` marks entries the parameter
/// file leaves undefined (INF) or does not provide.
#[derive(Debug, Clone)]
pub struct EnergyTables {
    pub stack: [[Option<i32>; P]; P],
    pub dangle5: [[Option<i32>; B]; P],
    pub dangle3: [[Option<i32>; B]; P],
    pub mismatch_hairpin: MismatchTable,
    pub mismatch_interior: MismatchTable,
    pub mismatch_interior_1n: MismatchTable,
    pub mismatch_interior_23: MismatchTable,
    pub int11: Box<[[[[Option<i32>; B]; B]; P]; P]>,
    pub int21: Box<[[[[[Option<i32>; B]; B]; B]; P]; P]>,
    pub int22: Box<[[[[[[Option<i32>; B]; B]; B]; B]; P - 1]; P - 1]>,
    pub hairpin: [Option<i32>; MAX_LOOP + 1],
    pub bulge: [Option<i32>; MAX_LOOP + 1],
    pub interior: [Option<i32>; MAX_LOOP + 1],
    pub ninio: Ninio,
    pub misc: Misc,
    pub hairpin_sequences: AHashMap<NucleotideVec, i32>,
}

impl Default for EnergyTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EnergyTables {
    pub fn empty() -> Self {
        EnergyTables {
            stack: [[None; P]; P],
            dangle5: [[None; B]; P],
            dangle3: [[None; B]; P],
            mismatch_hairpin: [[[None; B]; B]; P],
            mismatch_interior: [[[None; B]; B]; P],
            mismatch_interior_1n: [[[None; B]; B]; P],
            mismatch_interior_23: [[[None; B]; B]; P],
            int11: Box::new([[[[None; B]; B]; P]; P]),
            int21: Box::new([[[[[None; B]; B]; B]; P]; P]),
            int22: Box::new([[[[[[None; B]; B]; B]; B]; P - 1]; P - 1]),
            hairpin: [None; MAX_LOOP + 1],
            bulge: [None; MAX_LOOP + 1],
            interior: [None; MAX_LOOP + 1],
            ninio: Ninio { en37: 0, max: 0 },
            misc: Misc { terminal_ru: 0, lxc: 0.0 },
            hairpin_sequences: AHashMap::default(),
        }
    }

    pub fn builtin() -> Self {
        Self::from_reader(Cursor::new(BUILTIN_PARAMETERS))
            .expect("Failed to parse built-in nearest neighbor parameters")
    }

    pub fn from_parameter_file<T: AsRef<Path>>(path: T) -> Result<Self, ParamError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Reads a complete parameter file. Every section in
    /// `REQUIRED_SECTIONS` must be present.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ParamError> {
        let mut tables = Self::empty();
        let seen = tables.read_sections(reader)?;
        if let Some(missing) = REQUIRED_SECTIONS.iter().find(|s| !seen.contains(**s)) {
            return Err(ParamError::Invalid(format!(
                "Parameter file lacks the {:?} section", missing)));
        }
        Ok(tables)
    }

    /// Overwrites the entries of every section found in `reader`, returns
    /// the names of those sections.
    pub(crate) fn read_sections<R: BufRead>(&mut self, reader: R) -> Result<AHashSet<String>, ParamError> {
        let mut seen = AHashSet::default();
        let mut section = ParamFileSection::None;
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with("/*") || line.starts_with("##") {
                continue;
            }
            if let Some(name) = line.strip_prefix("# ") {
                section = ParamFileSection::try_from(name)?;
                seen.insert(name.trim().to_string());
                continue;
            }
            section.parse_line(line, self)?;
        }
        Ok(seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Base;
    use crate::PairTypeRNA;

    #[test]
    fn test_builtin_tables() {
        let t = EnergyTables::builtin();
        assert_eq!(t.stack[PairTypeRNA::CG as usize][PairTypeRNA::CG as usize], Some(-240));
        assert_eq!(t.stack[PairTypeRNA::AU as usize][PairTypeRNA::UA as usize], Some(-90));
        // The N column is not stored.
        assert_eq!(t.dangle5[PairTypeRNA::CG as usize][Base::A as usize], Some(-50));
        assert_eq!(t.dangle3[PairTypeRNA::GC as usize][Base::A as usize], Some(-170));
        assert_eq!(t.hairpin[2], None);
        assert_eq!(t.hairpin[3], Some(540));
        assert_eq!(t.hairpin[MAX_LOOP], Some(770));
        assert_eq!(t.bulge[1], Some(380));
        assert_eq!(t.interior[4], Some(110));
        assert_eq!(t.ninio, Ninio { en37: 60, max: 300 });
        assert_eq!(t.misc.terminal_ru, 50);
        assert!((t.misc.lxc - 107.856).abs() < 1e-9);
        assert_eq!(t.hairpin_sequences.len(), 22);
        let key = NucleotideVec::try_from("CUUCGG").unwrap();
        assert_eq!(t.hairpin_sequences.get(&key), Some(&370));
        assert!(t.mismatch_hairpin.iter().flatten().flatten().all(|x| x.is_none()));
    }

    #[test]
    fn test_parse_stack_section() {
        let mut t = EnergyTables::empty();
        let input = "\
# stack
/*  CG    GC    GU    UG    AU    UA    NN */
  -240  -330  -210  -140  -210  -210  -140
  -330  -340  -250  -150  -220  -240  -150
   INF   INF   INF   INF   INF   INF   INF
";
        let seen = t.read_sections(Cursor::new(input)).unwrap();
        assert!(seen.contains("stack"));
        assert_eq!(t.stack[PairTypeRNA::CG as usize][PairTypeRNA::GC as usize], Some(-330));
        assert_eq!(t.stack[PairTypeRNA::GC as usize][PairTypeRNA::AU as usize], Some(-220));
        assert_eq!(t.stack[PairTypeRNA::GU as usize][PairTypeRNA::CG as usize], None);
    }

    #[test]
    fn test_parse_mismatch_section() {
        let mut t = EnergyTables::empty();
        let input = "\
# mismatch_hairpin
   -80  -100  -110  -100   -80    /* CG,N */
  -140  -150  -150  -140  -150    /* CG,A */
   -80  -100  -110  -100   -80    /* CG,C */
  -150  -230  -150  -240  -150    /* CG,G */
  -100  -100  -140  -100  -210    /* CG,U */
   -50  -110   -70  -110   -50    /* GC,N */
  -110  -110  -150  -130  -210    /* GC,A */
";
        t.read_sections(Cursor::new(input)).unwrap();
        let cg = PairTypeRNA::CG as usize;
        let gc = PairTypeRNA::GC as usize;
        assert_eq!(t.mismatch_hairpin[cg][Base::A as usize][Base::A as usize], Some(-150));
        assert_eq!(t.mismatch_hairpin[cg][Base::G as usize][Base::G as usize], Some(-240));
        assert_eq!(t.mismatch_hairpin[cg][Base::U as usize][Base::U as usize], Some(-210));
        assert_eq!(t.mismatch_hairpin[gc][Base::A as usize][Base::C as usize], Some(-150));
        assert_eq!(t.mismatch_hairpin[gc][Base::C as usize][Base::A as usize], None);
    }

    #[test]
    fn test_parse_int22_section() {
        let mut t = EnergyTables::empty();
        let input = "\
# int22
/* CG.AA..CG */
   120   160    20   160
   110   150    20   150
";
        t.read_sections(Cursor::new(input)).unwrap();
        let cg = PairTypeRNA::CG as usize;
        let (a, c, u) = (Base::A as usize, Base::C as usize, Base::U as usize);
        assert_eq!(t.int22[cg][cg][a][a][a][a], Some(120));
        assert_eq!(t.int22[cg][cg][a][a][a][c], Some(160));
        assert_eq!(t.int22[cg][cg][a][a][c][u], Some(150));
    }

    #[test]
    fn test_parse_loops_and_sequences() {
        let mut t = EnergyTables::empty();
        let input = "\
## a comment header
# hairpin
   INF   INF   INF   540   560
   570   540
# Triloops
CAACG     680    2370
# NINIO
        60        320     300
# Misc
   410   360        50   370     107856     0
# END
";
        let seen = t.read_sections(Cursor::new(input)).unwrap();
        assert_eq!(seen.len(), 5);
        assert_eq!(t.hairpin[..8], [None, None, None, Some(540), Some(560), Some(570), Some(540), None]);
        assert_eq!(t.hairpin_sequences.get(&NucleotideVec::try_from("CAACG").unwrap()), Some(&680));
        assert_eq!(t.ninio.max, 300);
        assert_eq!(t.misc.terminal_ru, 50);
    }

    #[test]
    fn test_skipped_sections() {
        let mut t = EnergyTables::empty();
        let input = "\
# stack_enthalpies
  -1060 -1340
# mismatch_exterior
   -50  -110   -50  -140   -70
# ML_params
     0     0   930  3000   -90  -220
";
        t.read_sections(Cursor::new(input)).unwrap();
        assert!(t.stack.iter().flatten().all(|x| x.is_none()));
    }

    #[test]
    fn test_malformed_parameter_files() {
        let mut t = EnergyTables::empty();
        assert!(matches!(t.read_sections(Cursor::new("# unknown_section\n1 2 3\n")),
            Err(ParamError::Parse(_))));
        assert!(matches!(t.read_sections(Cursor::new("-240 -330\n")),
            Err(ParamError::Parse(_))));
        assert!(matches!(t.read_sections(Cursor::new("# bulge\nINF 380 x\n")),
            Err(ParamError::Parse(_))));
        let long = format!("# interior\n{}\n", "100 ".repeat(MAX_LOOP + 2));
        assert!(matches!(t.read_sections(Cursor::new(long)),
            Err(ParamError::Parse(_))));
        assert!(matches!(t.read_sections(Cursor::new("# Triloops\nCAXCG 680 2370\n")),
            Err(ParamError::Parse(_))));

        // Complete files need every required section.
        let partial = "# stack\n-240 -330 -210 -140 -210 -210 -140\n";
        assert!(matches!(EnergyTables::from_reader(Cursor::new(partial)),
            Err(ParamError::Invalid(_))));
    }
}

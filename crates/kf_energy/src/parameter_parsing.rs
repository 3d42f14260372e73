/// A parser for the parameter file format shipped with ViennaRNA.
///
/// IMPORTANT: This module hardcodes the order of rows and columns as they
/// appear in those files. Verify the orders before adding a section!
///
/// Sections that only matter for other temperatures or other loop types
/// (enthalpies, multiloop and exterior mismatches, ML_params) are skipped.
use crate::Base;
use crate::EnergyTables;
use crate::NucleotideVec;
use crate::PairTypeRNA;
use crate::ParamError;

const PARAM_FILE_PAIR_ORDER: [PairTypeRNA; 7] = [
    PairTypeRNA::CG,
    PairTypeRNA::GC,
    PairTypeRNA::GU,
    PairTypeRNA::UG,
    PairTypeRNA::AU,
    PairTypeRNA::UA,
    PairTypeRNA::NN,
];

/// The leading N column has no table entry.
const PARAM_FILE_MM_ORDER: [Option<Base>; 5] = [
    None,
    Some(Base::A),
    Some(Base::C),
    Some(Base::G),
    Some(Base::U),
];

/// int22 lists canonical pairs and plain bases only.
const PARAM_FILE_INT22_PAIRS: usize = 6;
const PARAM_FILE_INT22_BASES: [Base; 4] = [Base::A, Base::C, Base::G, Base::U];

/// Tokens of a line, up to a trailing comment.
fn values(line: &str) -> impl Iterator<Item = &str> {
    line.split_whitespace().take_while(|t| !t.starts_with("/*"))
}

fn parse_value(token: &str, section: &str, line: &str) -> Result<Option<i32>, ParamError> {
    match token {
        "INF" => Ok(None),
        "DEF" => Ok(Some(-50)),
        _ => token.parse::<i32>().map(Some).map_err(|_| ParamError::Parse(format!(
            "Failed to parse integer in {} while parsing line {:?}, token {:?}",
            section, line, token))),
    }
}

fn too_many_rows(section: &str, line: &str) -> ParamError {
    ParamError::Parse(format!("Too many rows in {} at line {:?}", section, line))
}

pub trait SectionParser {
    fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError>;
}

macro_rules! impl_stack_parser {
    ($struct_name:ident, $field:ident) => {
        #[derive(Default, Debug)]
        pub struct $struct_name {
            outer: usize,
        }

        impl SectionParser for $struct_name {
            fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError> {
                let Some(&p1) = PARAM_FILE_PAIR_ORDER.get(self.outer) else {
                    return Err(too_many_rows(stringify!($field), line));
                };
                for (inner, token) in values(line).take(PARAM_FILE_PAIR_ORDER.len()).enumerate() {
                    let p2 = PARAM_FILE_PAIR_ORDER[inner];
                    tables.$field[p1 as usize][p2 as usize] = parse_value(token, stringify!($field), line)?;
                }
                self.outer += 1;
                Ok(())
            }
        }
    };
}

impl_stack_parser!(Stack, stack);

macro_rules! impl_mismatch_parser {
    ($struct_name:ident, $field:ident) => {
        #[derive(Default, Debug)]
        pub struct $struct_name {
            outer: usize,
            m5: usize,
        }

        impl SectionParser for $struct_name {
            fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError> {
                let Some(&pair) = PARAM_FILE_PAIR_ORDER.get(self.outer) else {
                    return Err(too_many_rows(stringify!($field), line));
                };
                for (m3, token) in values(line).take(PARAM_FILE_MM_ORDER.len()).enumerate() {
                    let val = parse_value(token, stringify!($field), line)?;
                    if let (Some(b5), Some(b3)) = (PARAM_FILE_MM_ORDER[self.m5], PARAM_FILE_MM_ORDER[m3]) {
                        tables.$field[pair as usize][b5 as usize][b3 as usize] = val;
                    }
                }
                self.m5 += 1;
                if self.m5 == PARAM_FILE_MM_ORDER.len() {
                    self.outer += 1;
                    self.m5 = 0;
                }
                Ok(())
            }
        }
    };
}

impl_mismatch_parser!(MismatchHairpin, mismatch_hairpin);
impl_mismatch_parser!(MismatchInterior, mismatch_interior);
impl_mismatch_parser!(MismatchInterior1n, mismatch_interior_1n);
impl_mismatch_parser!(MismatchInterior23, mismatch_interior_23);

macro_rules! impl_dangle_parser {
    ($struct_name:ident, $field:ident) => {
        #[derive(Default, Debug)]
        pub struct $struct_name {
            outer: usize,
        }

        impl SectionParser for $struct_name {
            fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError> {
                let Some(&pair) = PARAM_FILE_PAIR_ORDER.get(self.outer) else {
                    return Err(too_many_rows(stringify!($field), line));
                };
                for (m, token) in values(line).take(PARAM_FILE_MM_ORDER.len()).enumerate() {
                    let val = parse_value(token, stringify!($field), line)?;
                    if let Some(b) = PARAM_FILE_MM_ORDER[m] {
                        tables.$field[pair as usize][b as usize] = val;
                    }
                }
                self.outer += 1;
                Ok(())
            }
        }
    };
}

impl_dangle_parser!(Dangle5, dangle5);
impl_dangle_parser!(Dangle3, dangle3);

#[derive(Default, Debug)]
pub struct Int11 {
    outer: usize,
    inner: usize,
    mm5: usize,
}

impl SectionParser for Int11 {
    fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError> {
        let Some(&p1) = PARAM_FILE_PAIR_ORDER.get(self.outer) else {
            return Err(too_many_rows("int11", line));
        };
        let p2 = PARAM_FILE_PAIR_ORDER[self.inner];
        for (mm3, token) in values(line).take(PARAM_FILE_MM_ORDER.len()).enumerate() {
            let val = parse_value(token, "int11", line)?;
            if let (Some(b5), Some(b3)) = (PARAM_FILE_MM_ORDER[self.mm5], PARAM_FILE_MM_ORDER[mm3]) {
                tables.int11[p1 as usize][p2 as usize][b5 as usize][b3 as usize] = val;
            }
        }
        self.mm5 += 1;
        if self.mm5 == PARAM_FILE_MM_ORDER.len() {
            self.mm5 = 0;
            self.inner += 1;
        }
        if self.inner == PARAM_FILE_PAIR_ORDER.len() {
            self.outer += 1;
            self.inner = 0;
        }
        Ok(())
    }
}

#[derive(Default, Debug)]
pub struct Int21 {
    outer: usize,
    inner: usize,
    mm55: usize,
    mm53: usize,
}

impl SectionParser for Int21 {
    fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError> {
        let Some(&p1) = PARAM_FILE_PAIR_ORDER.get(self.outer) else {
            return Err(too_many_rows("int21", line));
        };
        let p2 = PARAM_FILE_PAIR_ORDER[self.inner];
        for (mm3, token) in values(line).take(PARAM_FILE_MM_ORDER.len()).enumerate() {
            let val = parse_value(token, "int21", line)?;
            let bases = (PARAM_FILE_MM_ORDER[self.mm55], PARAM_FILE_MM_ORDER[self.mm53], PARAM_FILE_MM_ORDER[mm3]);
            if let (Some(b55), Some(b53), Some(b3)) = bases {
                tables.int21[p1 as usize][p2 as usize][b55 as usize][b53 as usize][b3 as usize] = val;
            }
        }
        self.mm53 += 1;
        if self.mm53 == PARAM_FILE_MM_ORDER.len() {
            self.mm55 += 1;
            self.mm53 = 0;
        }
        if self.mm55 == PARAM_FILE_MM_ORDER.len() {
            self.mm55 = 0;
            self.inner += 1;
        }
        if self.inner == PARAM_FILE_PAIR_ORDER.len() {
            self.outer += 1;
            self.inner = 0;
        }
        Ok(())
    }
}

#[derive(Default, Debug)]
pub struct Int22 {
    outer: usize,
    inner: usize,
    mm55: usize,
    mm53: usize,
    mm35: usize,
}

impl SectionParser for Int22 {
    fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError> {
        if self.outer == PARAM_FILE_INT22_PAIRS {
            return Err(too_many_rows("int22", line));
        }
        let p1 = PARAM_FILE_PAIR_ORDER[self.outer] as usize;
        let p2 = PARAM_FILE_PAIR_ORDER[self.inner] as usize;
        let b55 = PARAM_FILE_INT22_BASES[self.mm55] as usize;
        let b53 = PARAM_FILE_INT22_BASES[self.mm53] as usize;
        let b35 = PARAM_FILE_INT22_BASES[self.mm35] as usize;
        for (mm33, token) in values(line).take(PARAM_FILE_INT22_BASES.len()).enumerate() {
            let b33 = PARAM_FILE_INT22_BASES[mm33] as usize;
            tables.int22[p1][p2][b55][b53][b35][b33] = parse_value(token, "int22", line)?;
        }
        self.mm35 += 1;
        if self.mm35 == PARAM_FILE_INT22_BASES.len() {
            self.mm53 += 1;
            self.mm35 = 0;
        }
        if self.mm53 == PARAM_FILE_INT22_BASES.len() {
            self.mm55 += 1;
            self.mm53 = 0;
        }
        if self.mm55 == PARAM_FILE_INT22_BASES.len() {
            self.mm55 = 0;
            self.inner += 1;
        }
        if self.inner == PARAM_FILE_INT22_PAIRS {
            self.outer += 1;
            self.inner = 0;
        }
        Ok(())
    }
}

macro_rules! impl_loop_parser {
    ($struct_name:ident, $field:ident) => {
        #[derive(Default, Debug)]
        pub struct $struct_name {
            base: usize,
        }

        impl SectionParser for $struct_name {
            fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError> {
                for token in values(line) {
                    let Some(slot) = tables.$field.get_mut(self.base) else {
                        return Err(too_many_rows(stringify!($field), line));
                    };
                    *slot = parse_value(token, stringify!($field), line)?;
                    self.base += 1;
                }
                Ok(())
            }
        }
    };
}

impl_loop_parser!(Hairpin, hairpin);
impl_loop_parser!(Bulge, bulge);
impl_loop_parser!(Interior, interior);

/// Sections that hold a handful of scalars, possibly spread over lines.
macro_rules! impl_scalar_parser {
    ($struct_name:ident, $name:literal, $needed:literal, |$v:ident, $tables:ident| $assign:block) => {
        #[derive(Default, Debug)]
        pub struct $struct_name {
            values: Vec<i32>,
        }

        impl SectionParser for $struct_name {
            fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError> {
                for token in values(line) {
                    let val = parse_value(token, $name, line)?.ok_or_else(|| {
                        ParamError::Parse(format!("{} must not contain INF", $name))
                    })?;
                    self.values.push(val);
                }
                if self.values.len() >= $needed {
                    let $v = &self.values;
                    let $tables = tables;
                    $assign
                }
                Ok(())
            }
        }
    };
}

impl_scalar_parser!(Ninio, "NINIO", 3, |v, tables| {
    tables.ninio.en37 = v[0];
    tables.ninio.max = v[2];
});

impl_scalar_parser!(Misc, "Misc", 5, |v, tables| {
    tables.misc.terminal_ru = v[2];
    tables.misc.lxc = v[4] as f64 / 1000.0;
});

#[derive(Default, Debug)]
pub struct HairpinSequences {}

impl SectionParser for HairpinSequences {
    fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError> {
        let mut parts = values(line);
        if let (Some(seq), Some(g)) = (parts.next(), parts.next()) {
            let key = NucleotideVec::try_from(seq)
                .map_err(|e| ParamError::Parse(format!("{} in special hairpin {:?}", e, seq)))?;
            if let Some(en) = parse_value(g, "special hairpins", line)? {
                tables.hairpin_sequences.insert(key, en);
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ParamFileSection {
    None,
    Skip,
    Stack(Stack),
    MismatchHairpin(MismatchHairpin),
    MismatchInterior(MismatchInterior),
    MismatchInterior1n(MismatchInterior1n),
    MismatchInterior23(MismatchInterior23),
    Dangle5(Dangle5),
    Dangle3(Dangle3),
    Int11(Int11),
    Int21(Int21),
    Int22(Int22),
    Hairpin(Hairpin),
    Bulge(Bulge),
    Interior(Interior),
    Ninio(Ninio),
    Misc(Misc),
    HairpinSequences(HairpinSequences),
}

macro_rules! section_dispatch {
    ($section:expr, $line:expr, $tables:expr, $($variant:ident),+ $(,)?) => {
        match $section {
            $(
                ParamFileSection::$variant(parser) => parser.parse_line($line, $tables),
            )+
            ParamFileSection::Skip => Ok(()),
            ParamFileSection::None => Err(ParamError::Parse(
                format!("Line outside of any section: {:?}", $line))),
        }
    };
}

impl ParamFileSection {
    pub fn parse_line(&mut self, line: &str, tables: &mut EnergyTables) -> Result<(), ParamError> {
        section_dispatch!(self, line, tables,
            Stack,
            MismatchHairpin,
            MismatchInterior,
            MismatchInterior1n,
            MismatchInterior23,
            Dangle5,
            Dangle3,
            Int11,
            Int21,
            Int22,
            Hairpin,
            Bulge,
            Interior,
            Ninio,
            Misc,
            HairpinSequences,
        )
    }
}

macro_rules! section_match {
    ($s:expr, $($field:literal, $variant:ident),+ $(,)?) => {
        match $s {
            $(
                $field => Ok(ParamFileSection::$variant(Default::default())),
            )+
            _ if SKIPPED_SECTIONS.contains(&$s) || $s.ends_with("_enthalpies") => Ok(ParamFileSection::Skip),
            _ => Err(ParamError::Parse(format!("Unknown parameter file section: {:?}", $s))),
        }
    };
}

const SKIPPED_SECTIONS: [&str; 4] = ["mismatch_multi", "mismatch_exterior", "ML_params", "END"];

impl TryFrom<&str> for ParamFileSection {
    type Error = ParamError;

    fn try_from(s: &str) -> Result<Self, ParamError> {
        let key = s.trim();
        section_match!(key,
            "stack", Stack,
            "mismatch_hairpin", MismatchHairpin,
            "mismatch_interior", MismatchInterior,
            "mismatch_interior_1n", MismatchInterior1n,
            "mismatch_interior_23", MismatchInterior23,
            "dangle5", Dangle5,
            "dangle3", Dangle3,
            "int11", Int11,
            "int21", Int21,
            "int22", Int22,
            "hairpin", Hairpin,
            "bulge", Bulge,
            "interior", Interior,
            "NINIO", Ninio,
            "Misc", Misc,
            "Hexaloops", HairpinSequences,
            "Tetraloops", HairpinSequences,
            "Triloops", HairpinSequences,
        )
    }
}

use std::path::Path;

use log::warn;
use colored::*;

use crate::Base;
use crate::PairTypeRNA;
use crate::EnergyOracle;
use crate::EnergyTables;
use crate::MismatchTable;
use crate::ParamError;
use crate::MAX_LOOP;

const MIN_HP_SIZE: usize = 3;

/// Per A-U or G-U pair closing an interior loop, used where the parameter
/// set has no mismatch table for that loop.
const INTERIOR_RU: i32 = 70;

const COAXIAL_DISCONTINUOUS: i32 = -210;
const COAXIAL_BONUS_WCF: i32 = -40;
const COAXIAL_BONUS_WOBBLE: i32 = -20;

/// Nearest neighbor oracle backed by ViennaRNA style parameter tables,
/// Turner 2004 at 37°C unless a parameter file says otherwise.
///
/// The built-in set has no mismatch or small interior loop tables: those
/// loops fall back to dangles, initiation and asymmetry terms.
#[derive(Debug, Clone, Default)]
pub struct NearestNeighborOracle {
    tables: EnergyTables,
}

impl NearestNeighborOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: EnergyTables) -> Self {
        NearestNeighborOracle { tables }
    }

    pub fn from_parameter_file<T: AsRef<Path>>(path: T) -> Result<Self, ParamError> {
        Ok(Self::from_tables(EnergyTables::from_parameter_file(path)?))
    }

    pub fn tables(&self) -> &EnergyTables {
        &self.tables
    }

    fn extrapolate(&self, table: &[Option<i32>; MAX_LOOP + 1], n: usize) -> i32 {
        if n <= MAX_LOOP {
            table[n].unwrap_or(0)
        } else {
            let lxc = self.tables.misc.lxc;
            table[MAX_LOOP].unwrap_or(0) + (lxc * ((n as f64) / MAX_LOOP as f64).ln()) as i32
        }
    }

    /// Both dangles of a pair, standing in for a terminal mismatch.
    fn dangle_mismatch(&self, pair: PairTypeRNA, b5: Base, b3: Base) -> i32 {
        self.dangle5(pair, b5) + self.dangle3(pair, b3)
    }

    fn interior_ends(&self, table: &MismatchTable,
        outer: PairTypeRNA, inner: PairTypeRNA, fwd: &[Base], rev: &[Base]
    ) -> i32 {
        let (lfwd, lrev) = (fwd.len(), rev.len());
        let mm = |p: PairTypeRNA, b5: Base, b3: Base| table[p as usize][b5 as usize][b3 as usize];
        match (mm(outer, fwd[1], rev[lrev - 2]), mm(inner, rev[1], fwd[lfwd - 2])) {
            (Some(o), Some(i)) => o + i,
            _ => {
                let ru = |p: PairTypeRNA| if p.is_ru() { INTERIOR_RU } else { 0 };
                ru(outer) + ru(inner)
            }
        }
    }

    fn interior_loop(&self, table: &MismatchTable,
        outer: PairTypeRNA, inner: PairTypeRNA, fwd: &[Base], rev: &[Base]
    ) -> i32 {
        let (lfwd, lrev) = (fwd.len(), rev.len());
        let ninio = &self.tables.ninio;
        let asy = (lfwd as i32 - lrev as i32).abs();
        self.extrapolate(&self.tables.interior, lfwd + lrev - 4)
            + ninio.max.min(asy * ninio.en37)
            + self.interior_ends(table, outer, inner, fwd, rev)
    }

    fn int22(&self, outer: PairTypeRNA, inner: PairTypeRNA, fwd: &[Base], rev: &[Base]) -> Option<i32> {
        if outer == PairTypeRNA::NN || inner == PairTypeRNA::NN {
            return None;
        }
        self.tables.int22[outer as usize][inner as usize]
            [fwd[1] as usize][fwd[2] as usize][rev[1] as usize][rev[2] as usize]
    }
}

impl EnergyOracle for NearestNeighborOracle {
    fn hairpin(&self, seq: &[Base]) -> i32 {
        let n = seq.len().saturating_sub(2);
        let (Some(&first), Some(&last)) = (seq.first(), seq.last()) else {
            return 0;
        };
        let closing = PairTypeRNA::new((first, last));

        if n < MIN_HP_SIZE {
            warn!("{} hairpin of size {} scored as size {}", "WARNING:".red(), n, MIN_HP_SIZE);
            return self.extrapolate(&self.tables.hairpin, MIN_HP_SIZE) + self.terminal_penalty(closing);
        }

        if seq.len() <= 8 {
            if let Some(&en) = self.tables.hairpin_sequences.get(seq) {
                return en;
            }
        }

        let en = self.extrapolate(&self.tables.hairpin, n);
        if n == MIN_HP_SIZE {
            en + self.terminal_penalty(closing)
        } else {
            let (b5, b3) = (seq[1], seq[n]);
            en + self.tables.mismatch_hairpin[closing as usize][b5 as usize][b3 as usize]
                .unwrap_or_else(|| self.dangle_mismatch(closing, b5, b3))
        }
    }

    fn interior(&self, fwd: &[Base], rev: &[Base]) -> i32 {
        let (lfwd, lrev) = (fwd.len(), rev.len());
        if lfwd < 2 || lrev < 2 {
            return 0;
        }
        let et = &self.tables;
        let outer = PairTypeRNA::new((fwd[0], rev[lrev - 1]));
        let inner = PairTypeRNA::from((rev[0], fwd[lfwd - 1]));
        let (o, i) = (outer as usize, inner as usize);
        let generic = || self.interior_loop(&et.mismatch_interior, outer, inner, fwd, rev);

        match (lfwd, lrev) {
            (2, 2) => self.stack(outer, inner),
            (3, 2) | (2, 3) => self.extrapolate(&et.bulge, 1) + self.stack(outer, inner),
            (l, 2) | (2, l) => {
                self.extrapolate(&et.bulge, l - 2)
                    + self.terminal_penalty(outer)
                    + self.terminal_penalty(inner)
            }
            (3, 3) => et.int11[o][i][fwd[1] as usize][rev[1] as usize]
                .unwrap_or_else(generic),
            (3, 4) => et.int21[o][i][fwd[1] as usize][rev[1] as usize][rev[2] as usize]
                .unwrap_or_else(generic),
            (4, 3) => et.int21[i][o][rev[1] as usize][fwd[1] as usize][fwd[2] as usize]
                .unwrap_or_else(generic),
            (4, 4) => self.int22(outer, inner, fwd, rev).unwrap_or_else(generic),
            (3, _) | (_, 3) => self.interior_loop(&et.mismatch_interior_1n, outer, inner, fwd, rev),
            (4, 5) | (5, 4) => self.interior_loop(&et.mismatch_interior_23, outer, inner, fwd, rev),
            _ => generic(),
        }
    }

    fn stack(&self, outer: PairTypeRNA, inner: PairTypeRNA) -> i32 {
        self.tables.stack[outer as usize][inner as usize].unwrap_or(0)
    }

    fn dangle5(&self, pair: PairTypeRNA, base: Base) -> i32 {
        self.tables.dangle5[pair as usize][base as usize].unwrap_or(0)
    }

    fn dangle3(&self, pair: PairTypeRNA, base: Base) -> i32 {
        self.tables.dangle3[pair as usize][base as usize].unwrap_or(0)
    }

    fn terminal_penalty(&self, pair: PairTypeRNA) -> i32 {
        if pair.is_ru() { self.tables.misc.terminal_ru } else { 0 }
    }

    fn coaxial_flush(&self, left: PairTypeRNA, right: PairTypeRNA) -> i32 {
        self.stack(left.invert(), right.invert())
    }

    fn coaxial_mismatch(&self, pair: PairTypeRNA, b5: Base, b3: Base) -> i32 {
        let across = PairTypeRNA::from((b5, b3));
        let bonus = if across.is_wobble() {
            COAXIAL_BONUS_WOBBLE
        } else if across.can_pair() {
            COAXIAL_BONUS_WCF
        } else { 0 };
        self.dangle_mismatch(pair, b5, b3) + COAXIAL_DISCONTINUOUS + bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use crate::NucleotideVec;

    fn nv(s: &str) -> NucleotideVec {
        NucleotideVec::try_from(s).unwrap()
    }

    /// The built-in set plus the given sections.
    fn with_sections(input: &str) -> NearestNeighborOracle {
        let mut tables = EnergyTables::builtin();
        tables.read_sections(Cursor::new(input)).unwrap();
        NearestNeighborOracle::from_tables(tables)
    }

    #[test]
    fn test_hairpin_evaluation() {
        let model = NearestNeighborOracle::new();
        assert_eq!(model.hairpin(&nv("GAAAC")), 540);
        assert_eq!(model.hairpin(&nv("AAAAU")), 590);
        // G-C closing pair, mismatch A (5') and A (3'): -20 + -170.
        assert_eq!(model.hairpin(&nv("GAAAAC")), 560 - 190);
        assert_eq!(model.hairpin(&nv(&format!("C{}G", "A".repeat(30)))), 770 - 160);
        assert_eq!(model.hairpin(&nv(&format!("C{}G", "A".repeat(31)))), 770 + 3 - 160);
    }

    #[test]
    fn test_special_hairpins() {
        let model = NearestNeighborOracle::new();
        assert_eq!(model.hairpin(&nv("CAACG")), 680);
        assert_eq!(model.hairpin(&nv("CCAAGG")), 330);
        assert_eq!(model.hairpin(&nv("ACAGUACU")), 280);
        // Not in the list: initiation plus mismatch.
        assert_eq!(model.hairpin(&nv("CCAAAG")), 560 - 30 - 110);
    }

    #[test]
    fn test_small_hairpins_are_clamped() {
        let model = NearestNeighborOracle::new();
        assert_eq!(model.hairpin(&nv("AU")), 590);
        assert_eq!(model.hairpin(&nv("GAC")), 540);
        assert_eq!(model.hairpin(&[]), 0);
    }

    #[test]
    fn test_hairpin_mismatch_table() {
        let model = with_sections("\
# mismatch_hairpin
   -80  -100  -110  -100   -80    /* CG,N */
  -140  -150  -150  -140  -150    /* CG,A */
");
        assert_eq!(model.hairpin(&nv("CAAAAG")), 410);
        assert_eq!(model.hairpin(&nv(&format!("C{}G", "A".repeat(30)))), 620);
        // Missing entries fall back to the dangles.
        assert_eq!(model.hairpin(&nv("GAAAAC")), 560 - 190);
    }

    #[test]
    fn test_stacking_evaluation() {
        let model = NearestNeighborOracle::new();
        assert_eq!(model.interior(&nv("CG"), &nv("CG")), -240);
        assert_eq!(model.interior(&nv("AC"), &nv("GU")), -220);
        assert_eq!(model.interior(&nv("GU"), &nv("AC")), -220);
    }

    #[test]
    fn test_stack_table_is_symmetric() {
        use PairTypeRNA::*;
        let model = NearestNeighborOracle::new();
        for p in [AU, UA, CG, GC, GU, UG] {
            for q in [AU, UA, CG, GC, GU, UG] {
                assert_eq!(model.stack(p, q), model.stack(q, p), "{} {}", p, q);
            }
        }
    }

    #[test]
    fn test_bulge_evaluation() {
        let model = NearestNeighborOracle::new();
        assert_eq!(model.interior(&nv("CAG"), &nv("CG")), 380 - 240);
        assert_eq!(model.interior(&nv("CG"), &nv("CAG")), 380 - 240);
        assert_eq!(model.interior(&nv("CAAG"), &nv("CG")), 280);
        assert_eq!(model.interior(&nv("AAAU"), &nv("AU")), 380);
    }

    #[test]
    fn test_interior_evaluation() {
        let model = NearestNeighborOracle::new();
        // 1x1 without an int11 table.
        assert_eq!(model.interior(&nv("CAG"), &nv("CAG")), 50);
        // 2x2 with two G-C pairs: plain initiation.
        assert_eq!(model.interior(&nv("GAAG"), &nv("CAAC")), 110);
        // 1x3 with an A-U outer pair: asymmetry 2.
        assert_eq!(model.interior(&nv("AAG"), &nv("CAAAU")), 110 + 120 + 70);
        // Asymmetry is capped.
        assert_eq!(model.interior(&nv("GAC"), &nv("GAAAAAAAC")), 230 + 300);
    }

    #[test]
    fn test_small_interior_tables() {
        let model = with_sections("\
# int11
    90    90    50    50    50    /* CG,CG,N */
    90    90    50    50    50    /* CG,CG,A */
    50    50    50    50    50    /* CG,CG,C */
# int21
   230   230   230   230   230    /* CG,CG,N,N */
   230   230   230   230   230
   230   230   230   230   230
   230   230   230   230   230
   230   230   230   230   230
   230   230   230   230   230    /* CG,CG,A,N */
   230   230   230   110   230    /* CG,CG,A,A */
# int22
   120   160    20   160    /* CG,CG,A,A,A */
   110   150    20   150    /* CG,CG,A,A,C */
");
        assert_eq!(model.interior(&nv("CAG"), &nv("CAG")), 90);
        assert_eq!(model.interior(&nv("CCG"), &nv("CGG")), 50);
        assert_eq!(model.interior(&nv("CAG"), &nv("CAGG")), 110);
        assert_eq!(model.interior(&nv("CAAG"), &nv("CAAG")), 120);
        assert_eq!(model.interior(&nv("CAAG"), &nv("CCUG")), 150);
        // Pairs without int22 entries use the generic loop.
        assert_eq!(model.interior(&nv("GAAG"), &nv("CAAC")), 110);
    }

    #[test]
    fn test_interior_mismatch_tables() {
        let model = with_sections("\
# mismatch_interior_1n
     0     0     0     0     0    /* CG,N */
     0     0     0     0     0    /* CG,A */
     0     0     0     0     0    /* CG,C */
     0     0     0     0     0    /* CG,G */
     0     0     0     0     0    /* CG,U */
     0     0     0     0     0    /* GC,N */
     0     0     0     0     0    /* GC,A */
     0     0     0     0     0    /* GC,C */
     0     0     0     0     0    /* GC,G */
     0     0     0     0     0    /* GC,U */
    70    70    70    70    70    /* GU,N */
    70    70    70    70    70    /* GU,A */
    70    70    70    70    70    /* GU,C */
    70    70    70    70    70    /* GU,G */
    70    70    70    70    70    /* GU,U */
    70    70    70    70    70    /* UG,N */
    70    70    70    70    70    /* UG,A */
    70    70    70    70    70    /* UG,C */
    70    70    70    70    70    /* UG,G */
    70    70    70    70    70    /* UG,U */
    70    70    70    70    70    /* AU,N */
    70    70    70    70    70    /* AU,A */
    70    70    70    70    70    /* AU,C */
    70    70    70    70    70    /* AU,G */
    70    70    70    70    70    /* AU,U */
    70    70    70    70    70    /* UA,N */
    70    70    70    70    70    /* UA,A */
    70    70    70    70    70    /* UA,C */
    70    70    70    70    70    /* UA,G */
    70    70    70    70    70    /* UA,U */
");
        // interior[4] + ninio + both mismatches.
        assert_eq!(model.interior(&nv("ACA"), &nv("UGAAU")), 110 + 120 + 70 + 70);
    }

    #[test]
    fn test_coaxial_stacks() {
        use PairTypeRNA::*;
        let model = NearestNeighborOracle::new();
        assert_eq!(model.coaxial_flush(GC, CG), model.stack(CG, GC));
        // A-U across the mismatch earns the Watson-Crick bonus.
        assert_eq!(model.coaxial_mismatch(GC, Base::A, Base::U), -20 - 120 - 210 - 40);
        assert_eq!(model.coaxial_mismatch(GC, Base::G, Base::U), 0 - 120 - 210 - 20);
        assert_eq!(model.coaxial_mismatch(GC, Base::A, Base::A), -20 - 170 - 210);
    }
}

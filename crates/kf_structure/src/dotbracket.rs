use std::fmt;
use std::ops::Deref;
use std::ops::DerefMut;
use std::convert::TryFrom;

use crate::PairTable;
use crate::StructureError;

/// Opening brackets, one per crossing family. Family `k` closes with the
/// `k`-th character of [`CLOSE_BRACKETS`].
pub const OPEN_BRACKETS: &str = "([{<ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const CLOSE_BRACKETS: &str = ")]}>abcdefghijklmnopqrstuvwxyz";
pub const NUM_FAMILIES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DotBracket {
    Unpaired,  // '.' or '_'
    Open(u8),  // opening bracket of a family
    Close(u8), // closing bracket of a family
}

impl DotBracket {
    pub fn family(&self) -> Option<usize> {
        match self {
            DotBracket::Unpaired => None,
            DotBracket::Open(k) | DotBracket::Close(k) => Some(*k as usize),
        }
    }
}

impl TryFrom<char> for DotBracket {
    type Error = StructureError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        if c == '.' || c == '_' {
            return Ok(DotBracket::Unpaired);
        }
        if let Some(k) = OPEN_BRACKETS.chars().position(|o| o == c) {
            return Ok(DotBracket::Open(k as u8));
        }
        if let Some(k) = CLOSE_BRACKETS.chars().position(|o| o == c) {
            return Ok(DotBracket::Close(k as u8));
        }
        Err(StructureError::InvalidToken(format!("character '{}'", c), "structure".into(), 0))
    }
}

impl From<DotBracket> for char {
    fn from(db: DotBracket) -> Self {
        match db {
            DotBracket::Unpaired => '.',
            DotBracket::Open(k) => OPEN_BRACKETS.as_bytes()[k as usize] as char,
            DotBracket::Close(k) => CLOSE_BRACKETS.as_bytes()[k as usize] as char,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DotBracketVec(pub Vec<DotBracket>);

impl Deref for DotBracketVec {
    type Target = [DotBracket];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DotBracketVec {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl TryFrom<&str> for DotBracketVec {
    type Error = StructureError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let mut vec = Vec::with_capacity(s.len());
        for (i, c) in s.chars().enumerate() {
            match DotBracket::try_from(c) {
                Ok(db) => vec.push(db),
                Err(StructureError::InvalidToken(tok, src, _)) => {
                    return Err(StructureError::InvalidToken(tok, src, i));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(DotBracketVec(vec))
    }
}

/// Renders a pair table with as few bracket families as a greedy
/// left-to-right assignment needs: every pair gets the first family in
/// which it crosses no previously assigned pair.
impl From<&PairTable> for DotBracketVec {
    fn from(pt: &PairTable) -> Self {
        let mut result = vec![DotBracket::Unpaired; pt.len()];
        let mut families: Vec<Vec<(usize, usize)>> = Vec::new();

        for (i, j) in pt.pairs() {
            let crosses = |&(k, l): &(usize, usize)| (k < i && i < l && l < j) || (i < k && k < j && j < l);
            let slot = families.iter().position(|fam| !fam.iter().any(crosses));
            let k = match slot {
                Some(k) => k,
                None if families.len() < NUM_FAMILIES => {
                    families.push(Vec::new());
                    families.len() - 1
                }
                // Out of bracket families, the rendering is lossy from here.
                None => NUM_FAMILIES - 1,
            };
            families[k].push((i, j));
            result[i] = DotBracket::Open(k as u8);
            result[j] = DotBracket::Close(k as u8);
        }
        DotBracketVec(result)
    }
}

impl fmt::Display for DotBracketVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for db in &self.0 {
            write!(f, "{}", char::from(*db))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_bracket_from_char() {
        assert_eq!(DotBracket::try_from('.').unwrap(), DotBracket::Unpaired);
        assert_eq!(DotBracket::try_from('_').unwrap(), DotBracket::Unpaired);
        assert_eq!(DotBracket::try_from('(').unwrap(), DotBracket::Open(0));
        assert_eq!(DotBracket::try_from(']').unwrap(), DotBracket::Close(1));
        assert_eq!(DotBracket::try_from('A').unwrap(), DotBracket::Open(4));
        assert_eq!(DotBracket::try_from('z').unwrap(), DotBracket::Close(29));
    }

    #[test]
    fn test_char_from_dot_bracket() {
        assert_eq!(char::from(DotBracket::Unpaired), '.');
        assert_eq!(char::from(DotBracket::Open(2)), '{');
        assert_eq!(char::from(DotBracket::Close(3)), '>');
        assert_eq!(char::from(DotBracket::Close(4)), 'a');
    }

    #[test]
    fn test_bracket_alphabets_line_up() {
        assert_eq!(OPEN_BRACKETS.len(), NUM_FAMILIES);
        assert_eq!(CLOSE_BRACKETS.len(), NUM_FAMILIES);
        for (o, c) in OPEN_BRACKETS.chars().zip(CLOSE_BRACKETS.chars()) {
            assert_eq!(DotBracket::try_from(o).unwrap().family(), DotBracket::try_from(c).unwrap().family());
        }
    }

    #[test]
    fn test_dot_bracket_from_invalid_char() {
        let res = DotBracket::try_from('x');
        assert!(res.is_ok(), "lowercase letters close bracket families");
        let res = DotBracket::try_from('#');
        assert!(matches!(res, Err(StructureError::InvalidToken(_, src, _)) if src == "structure"));
    }

    #[test]
    fn test_dot_bracket_vec_from_str() {
        let dbv = DotBracketVec::try_from("(.[).]").unwrap();
        assert_eq!(format!("{}", dbv), "(.[).]");
        assert_eq!(dbv.len(), 6);
        assert_eq!(dbv[2], DotBracket::Open(1));
        assert_eq!(dbv[5], DotBracket::Close(1));

        let err = DotBracketVec::try_from("((#))").unwrap_err();
        assert_eq!(format!("{}", err), "Invalid character '#' in structure at position 2");
    }

    #[test]
    fn test_dot_bracket_vec_from_pair_table() {
        let pt = PairTable::try_from("((..))").unwrap();
        assert_eq!(format!("{}", DotBracketVec::from(&pt)), "((..))");

        let pt = PairTable::try_from("((..[[..))..]]").unwrap();
        assert_eq!(format!("{}", DotBracketVec::from(&pt)), "((..[[..))..]]");

        // Family choice is canonical, not a copy of the input.
        let pt = PairTable::try_from("[[..((..]]..))").unwrap();
        assert_eq!(format!("{}", DotBracketVec::from(&pt)), "((..[[..))..]]");
    }

    #[test]
    fn test_dot_bracket_vec_three_families() {
        let pt = PairTable::try_from("(.[.).{.].}").unwrap();
        assert_eq!(format!("{}", DotBracketVec::from(&pt)), "(.[.).(.].)");

        let pt = PairTable::try_from("(.[.{.).].}").unwrap();
        assert_eq!(format!("{}", DotBracketVec::from(&pt)), "(.[.{.).].}");
    }
}

use crate::Base;
use crate::PairTypeRNA;

/// Which of the two helices takes the mismatch of a single-mismatch coaxial
/// stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MismatchSide {
    Left,
    Right,
}

/// Primitive loop energies in dcal/mol.
///
/// Pair types are always given as seen from inside the loop: for a helix end
/// `(p, q)` with `p` facing the 5' side of the loop, the pair type is
/// `(seq[p], seq[q])`, `dangle5` talks about the base at `p - 1` and
/// `dangle3` about the base at `q + 1`.
pub trait EnergyOracle {
    /// Closing pair and loop bases, `seq[0]` pairs with the last base.
    fn hairpin(&self, seq: &[Base]) -> i32;

    /// `fwd` runs from the outer 5' base to the inner 5' base, `rev` from
    /// the inner 3' base to the outer 3' base.
    fn interior(&self, fwd: &[Base], rev: &[Base]) -> i32;

    /// Stacked pairs `(i, j)` and `(i + 1, j - 1)`, with the inner pair
    /// typed as `(seq[j - 1], seq[i + 1])`.
    fn stack(&self, outer: PairTypeRNA, inner: PairTypeRNA) -> i32;

    fn dangle5(&self, pair: PairTypeRNA, base: Base) -> i32;

    fn dangle3(&self, pair: PairTypeRNA, base: Base) -> i32;

    /// Terminal AU (and GU) penalty of a helix end.
    fn terminal_penalty(&self, pair: PairTypeRNA) -> i32;

    /// Two helices stacked end to end: `left` is the 3' end of the first
    /// helix, `right` the 5' end of the second.
    fn coaxial_flush(&self, left: PairTypeRNA, right: PairTypeRNA) -> i32;

    /// Discontinuous stack where `pair` carries the mismatch `b5`, `b3`.
    fn coaxial_mismatch(&self, pair: PairTypeRNA, b5: Base, b3: Base) -> i32;

    /// Two helices separated by the single base `mid`. The mismatch goes to
    /// whichever side stacks better; the far bases are the ones flanking the
    /// other end of each helix, if they are free to take part.
    fn coaxial_mismatch_choice(&self,
        left: PairTypeRNA,
        left_far: Option<Base>,
        mid: Base,
        right: PairTypeRNA,
        right_far: Option<Base>,
    ) -> Option<(i32, MismatchSide)> {
        let l = left_far.map(|b| (self.coaxial_mismatch(left, b, mid), MismatchSide::Left));
        let r = right_far.map(|b| (self.coaxial_mismatch(right, mid, b), MismatchSide::Right));
        match (l, r) {
            (Some(l), Some(r)) => Some(if r.0 < l.0 { r } else { l }),
            (l, r) => l.or(r),
        }
    }
}

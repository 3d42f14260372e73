use ahash::AHashMap;
use log::debug;

/// A possible coaxial stack between two neighboring helices of one loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoaxialCandidate {
    /// Index of the 5' helix among the helices of the loop.
    pub left: usize,
    /// Index of the 3' helix.
    pub right: usize,
    pub energy: i32,
    /// Unpaired positions the stack takes away from the dangle pass.
    pub consumes: Vec<usize>,
}

impl CoaxialCandidate {
    /// Two stacks conflict if they share a helix or a claimed base.
    pub fn conflicts(&self, other: &CoaxialCandidate) -> bool {
        self.left == other.left
            || self.left == other.right
            || self.right == other.left
            || self.right == other.right
            || self.consumes.iter().any(|k| other.consumes.contains(k))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoaxialChoice {
    /// Indices into the candidate list.
    pub chosen: Vec<usize>,
    pub energy: i32,
}

impl CoaxialChoice {
    /// Lower energy first, then fewer stacks, then the lexicographically
    /// smaller index list.
    fn improves_on(&self, other: &CoaxialChoice) -> bool {
        (self.energy, self.chosen.len(), &self.chosen) < (other.energy, other.chosen.len(), &other.chosen)
    }
}

/// A combination under construction. `blocked` lists the candidates after
/// the last chosen one that conflict with some chosen candidate.
#[derive(Debug, Clone)]
struct Partial {
    choice: CoaxialChoice,
    blocked: Vec<usize>,
}

fn later_conflicts(candidates: &[CoaxialCandidate], i: usize) -> Vec<usize> {
    (i + 1..candidates.len())
        .filter(|&j| candidates[i].conflicts(&candidates[j]))
        .collect()
}

fn extend(candidates: &[CoaxialCandidate], generation: &[Partial]) -> Vec<Partial> {
    // Two partial sets of equal size that end on the same candidate and
    // block the same later candidates accept the same extensions. Only the
    // better one is kept.
    let mut index: AHashMap<(usize, Vec<usize>), usize> = AHashMap::new();
    let mut next_generation: Vec<Partial> = Vec::new();

    for partial in generation {
        let last = partial.choice.chosen.last().copied().unwrap_or(0);
        for j in last + 1..candidates.len() {
            if partial.blocked.binary_search(&j).is_ok() {
                continue;
            }
            let mut blocked: Vec<usize> = partial.blocked.iter().copied().filter(|&k| k > j).collect();
            blocked.extend(later_conflicts(candidates, j));
            blocked.sort_unstable();
            blocked.dedup();

            let mut chosen = partial.choice.chosen.clone();
            chosen.push(j);
            let extended = Partial {
                choice: CoaxialChoice { chosen, energy: partial.choice.energy + candidates[j].energy },
                blocked,
            };

            match index.get(&(j, extended.blocked.clone())) {
                Some(&at) => {
                    if extended.choice.improves_on(&next_generation[at].choice) {
                        next_generation[at] = extended;
                    }
                }
                None => {
                    index.insert((j, extended.blocked.clone()), next_generation.len());
                    next_generation.push(extended);
                }
            }
        }
    }
    next_generation
}

/// Minimum energy set of pairwise compatible candidates.
///
/// Combinations are built generation by generation: every combination of
/// size `k + 1` extends one of size `k` with a later, compatible candidate.
/// Sets hold at most `num_helices / 2` stacks. Among equal energies the
/// smaller set wins, then the one found first. Unless `allow_empty` is set,
/// some stack is chosen whenever there is a candidate at all.
pub fn best_combination(candidates: &[CoaxialCandidate], num_helices: usize, allow_empty: bool) -> CoaxialChoice {
    let max_size = num_helices / 2;
    let mut best: Option<CoaxialChoice> = allow_empty.then(CoaxialChoice::default);
    let mut generation: Vec<Partial> = Vec::new();
    if max_size > 0 {
        generation = (0..candidates.len())
            .map(|i| Partial {
                choice: CoaxialChoice { chosen: vec![i], energy: candidates[i].energy },
                blocked: later_conflicts(candidates, i),
            })
            .collect();
    }

    let mut size = 1;
    let mut visited = 0;
    while !generation.is_empty() {
        visited += generation.len();
        for partial in &generation {
            if best.as_ref().is_none_or(|b| partial.choice.improves_on(b)) {
                best = Some(partial.choice.clone());
            }
        }
        if size == max_size {
            break;
        }
        generation = extend(candidates, &generation);
        size += 1;
    }
    debug!("{} coaxial candidates, {} combinations visited", candidates.len(), visited);
    best.unwrap_or_default()
}

/// Every candidate, without resolving conflicts.
pub fn all_pairs(candidates: &[CoaxialCandidate]) -> CoaxialChoice {
    CoaxialChoice {
        chosen: (0..candidates.len()).collect(),
        energy: candidates.iter().map(|c| c.energy).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(left: usize, right: usize, energy: i32, consumes: &[usize]) -> CoaxialCandidate {
        CoaxialCandidate { left, right, energy, consumes: consumes.to_vec() }
    }

    #[test]
    fn test_non_overlapping_pairs() {
        // Four helices on a circle: 0-1, 1-2, 2-3, 3-0.
        let candidates = vec![
            cand(0, 1, -200, &[]),
            cand(1, 2, -300, &[]),
            cand(2, 3, -200, &[]),
            cand(3, 0, -50, &[]),
        ];
        let best = best_combination(&candidates, 4, false);
        assert_eq!(best.chosen, vec![0, 2]);
        assert_eq!(best.energy, -400);
    }

    #[test]
    fn test_single_better_than_pair() {
        let candidates = vec![
            cand(0, 1, -100, &[]),
            cand(1, 2, -500, &[]),
            cand(2, 0, -100, &[]),
        ];
        let best = best_combination(&candidates, 3, false);
        assert_eq!(best.chosen, vec![1]);
        assert_eq!(best.energy, -500);
    }

    #[test]
    fn test_ties_go_to_first_found() {
        let candidates = vec![
            cand(0, 1, -200, &[]),
            cand(1, 2, -200, &[]),
        ];
        assert_eq!(best_combination(&candidates, 3, false).chosen, vec![0]);
    }

    #[test]
    fn test_shared_bases_conflict() {
        let candidates = vec![
            cand(0, 1, -200, &[5]),
            cand(2, 3, -200, &[5, 9]),
        ];
        assert!(candidates[0].conflicts(&candidates[1]));
        let best = best_combination(&candidates, 4, true);
        assert_eq!(best.chosen, vec![0]);
    }

    #[test]
    fn test_empty_combination() {
        let candidates = vec![cand(0, 1, 30, &[])];
        assert_eq!(best_combination(&candidates, 2, true), CoaxialChoice::default());
        assert_eq!(best_combination(&candidates, 2, false).chosen, vec![0]);
        assert_eq!(best_combination(&[], 3, false), CoaxialChoice::default());
        assert_eq!(best_combination(&candidates, 1, false), CoaxialChoice::default());
    }

    #[test]
    fn test_size_limit() {
        // Five helices allow two stacks, even though three would not conflict
        // in this artificial set.
        let candidates = vec![
            cand(0, 1, -100, &[]),
            cand(2, 3, -100, &[]),
            cand(4, 5, -100, &[]),
        ];
        assert_eq!(best_combination(&candidates, 5, false).energy, -200);
    }

    /// Reference: every subset, compared with the same ordering.
    fn exhaustive(candidates: &[CoaxialCandidate], num_helices: usize, allow_empty: bool) -> CoaxialChoice {
        let mut best: Option<CoaxialChoice> = allow_empty.then(CoaxialChoice::default);
        for mask in 1u32..(1 << candidates.len()) {
            let chosen: Vec<usize> = (0..candidates.len()).filter(|i| mask & (1 << i) != 0).collect();
            if chosen.len() > num_helices / 2 {
                continue;
            }
            let compatible = chosen.iter().enumerate()
                .all(|(n, &a)| chosen[n + 1..].iter().all(|&b| !candidates[a].conflicts(&candidates[b])));
            if !compatible {
                continue;
            }
            let energy = chosen.iter().map(|&i| candidates[i].energy).sum();
            let choice = CoaxialChoice { chosen, energy };
            if best.as_ref().is_none_or(|b| choice.improves_on(b)) {
                best = Some(choice);
            }
        }
        best.unwrap_or_default()
    }

    #[test]
    fn test_many_candidates_stay_optimal() {
        // A strong middle stack flanked by two that beat it together, plus
        // 23 independent weak stacks.
        let mut candidates = vec![
            cand(0, 1, -100, &[]),
            cand(1, 2, -150, &[]),
            cand(2, 3, -100, &[]),
        ];
        for k in 0..23 {
            candidates.push(cand(4 + 2 * k, 5 + 2 * k, -10, &[]));
        }
        let best = best_combination(&candidates, 50, true);
        assert_eq!(best.energy, -200 - 230);
        assert_eq!(best.chosen.len(), 25);
        assert_eq!(&best.chosen[..2], &[0, 2]);
        assert!(!best.chosen.contains(&1));

        let first = exhaustive(&candidates[..3], 4, true);
        assert_eq!(first.chosen, vec![0, 2]);
        assert_eq!(first.energy, -200);
    }

    #[test]
    fn test_long_cycle() {
        // 40 helices around a multiloop, every neighbor pair stacks equally.
        let candidates: Vec<CoaxialCandidate> = (0..40)
            .map(|i| cand(i, (i + 1) % 40, -100, &[]))
            .collect();
        let best = best_combination(&candidates, 40, false);
        assert_eq!(best.energy, -2000);
        assert_eq!(best.chosen, (0..40).step_by(2).collect::<Vec<usize>>());
    }

    #[test]
    fn test_matches_exhaustive_search() {
        use rand::{Rng, SeedableRng};
        use rand::rngs::StdRng;

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let num_helices = rng.random_range(2..9);
            let n = rng.random_range(0..11);
            let candidates: Vec<CoaxialCandidate> = (0..n)
                .map(|_| {
                    let left = rng.random_range(0..num_helices);
                    let right = (left + 1) % num_helices;
                    let consumes: Vec<usize> = (0..rng.random_range(0..3))
                        .map(|_| rng.random_range(0..12))
                        .collect();
                    cand(left, right, rng.random_range(-300..50), &consumes)
                })
                .collect();
            for allow_empty in [true, false] {
                assert_eq!(
                    best_combination(&candidates, num_helices, allow_empty),
                    exhaustive(&candidates, num_helices, allow_empty),
                    "{:?}", candidates
                );
            }
        }
    }

    #[test]
    fn test_all_pairs() {
        let candidates = vec![
            cand(0, 1, -200, &[4]),
            cand(1, 2, -300, &[4]),
        ];
        let all = all_pairs(&candidates);
        assert_eq!(all.chosen, vec![0, 1]);
        assert_eq!(all.energy, -500);
    }
}

use std::fmt;
use std::iter;

use ahash::AHashSet;
use colored::*;
use log::{debug, info};
use serde::{Serialize, Serializer};

use kf_structure::LoopKind;
use kf_structure::LoopNode;
use kf_structure::LoopTree;
use kf_structure::Nesting;
use kf_structure::NodeId;
use kf_structure::SpanKind;
use kf_structure::SpanLoop;
use kf_structure::detect_regions;

use crate::coaxial::{CoaxialCandidate, all_pairs, best_combination};
use crate::CoaxialStrategy;
use crate::DanglingTable;
use crate::EnergyError;
use crate::EnergyOracle;
use crate::EngineConfig;
use crate::EvaluationContext;
use crate::HTypeTables;
use crate::KCAL_TO_DCAL;
use crate::MismatchDangles;
use crate::MismatchSide;
use crate::NearestNeighborOracle;
use crate::PairTypeRNA;
use crate::PkModel;
use crate::PkPenalties;
use crate::SequenceModel;
use crate::Stage;

fn kind_name<S: Serializer>(kind: &LoopKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.name())
}

fn as_kcal<S: Serializer>(en: &i32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(*en as f64 / 100.)
}

/// The free energy of one loop, in dcal/mol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopContribution {
    pub node: NodeId,
    #[serde(serialize_with = "kind_name")]
    pub kind: LoopKind,
    pub begin: usize,
    pub end: usize,
    #[serde(serialize_with = "as_kcal")]
    pub energy: i32,
}

impl fmt::Display for LoopContribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            LoopKind::Hairpin => "Hairpin loop".red().bold(),
            LoopKind::Stack => "Stacked pair".normal(),
            LoopKind::Interior => "Interior loop".blue().bold(),
            LoopKind::Multi => "Multibranch".green().bold(),
            LoopKind::Pseudo => "Pseudoknot".magenta().bold(),
            LoopKind::Exterior => "Exterior loop".cyan().bold(),
        };
        write!(f, "{} ({}, {})", name, self.begin, self.end)
    }
}

/// Result of scoring one sequence/structure pair.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub tree: LoopTree,
    /// One entry per loop, in the order the loops were scored.
    pub contributions: Vec<LoopContribution>,
    /// dcal/mol
    pub total: i32,
}

impl Evaluation {
    pub fn kcal(&self) -> f64 {
        self.total as f64 / 100.
    }

    pub fn contribution(&self, node: NodeId) -> Result<&LoopContribution, EnergyError> {
        self.contributions.iter()
            .find(|c| c.node == node)
            .ok_or(EnergyError::UnknownNode(node))
    }
}

/// A helix end pair as seen from one loop: the loop enters the helix at
/// `five` and leaves it again at `three`. For a plain branch these are the
/// two bases of its closing pair, for a band or a crossing branch they
/// belong to different pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stem {
    five: usize,
    three: usize,
}

impl Stem {
    /// The pair that closes a loop, seen from inside.
    fn closing(i: usize, j: usize) -> Self {
        Stem { five: j, three: i }
    }

    fn branch(begin: usize, end: usize) -> Self {
        Stem { five: begin, three: end }
    }
}

/// Unpaired positions `start..end` between two stems of a loop. Only the
/// exterior loop has gaps that are open on one side.
#[derive(Debug, Clone, Copy)]
struct Gap {
    start: usize,
    end: usize,
    left: Option<usize>,
    right: Option<usize>,
}

impl Gap {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn contains(&self, k: usize) -> bool {
        self.start <= k && k < self.end
    }
}

/// Stems of one loop in the order the loop visits them, and the gaps
/// between them.
#[derive(Debug)]
struct LoopFace {
    stems: Vec<Stem>,
    gaps: Vec<Gap>,
}

impl LoopFace {
    /// Closed loops: the last stem is followed by the first.
    fn circular(stems: Vec<Stem>) -> Self {
        let n = stems.len();
        let gaps = (0..n).map(|s| {
            let t = (s + 1) % n;
            Gap { start: stems[s].three + 1, end: stems[t].five, left: Some(s), right: Some(t) }
        }).collect();
        LoopFace { stems, gaps }
    }

    /// The pseudoloop: only the gaps between its first and last stem.
    fn linear(stems: Vec<Stem>) -> Self {
        let gaps = stems.windows(2).enumerate().map(|(s, w)| {
            Gap { start: w[0].three + 1, end: w[1].five, left: Some(s), right: Some(s + 1) }
        }).collect();
        LoopFace { stems, gaps }
    }

    /// Like [`LoopFace::linear`], plus the free 5' and 3' ends of the chain.
    fn exterior(stems: Vec<Stem>, len: usize) -> Self {
        let mut face = LoopFace::linear(stems);
        if let (Some(first), Some(last)) = (face.stems.first(), face.stems.last()) {
            let n = face.stems.len();
            let lead = Gap { start: 0, end: first.five, left: None, right: Some(0) };
            let trail = Gap { start: last.three + 1, end: len, left: Some(n - 1), right: None };
            face.gaps.insert(0, lead);
            face.gaps.push(trail);
        }
        face
    }

    fn in_gaps(&self, k: usize) -> bool {
        self.gaps.iter().any(|g| g.contains(k))
    }

    fn unpaired(&self) -> usize {
        self.gaps.iter().map(|g| g.len()).sum()
    }
}

/// How loops between consecutive pairs of a band are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanRules {
    Unscaled,
    DirksPierce,
    RivasEddy,
}

/// Pair type at the 5' side of a stem, as seen from the loop.
fn five_pair(model: &SequenceModel, stem: &Stem) -> PairTypeRNA {
    model.pair_type(stem.five)
}

/// Pair type at the 3' side of a stem, as seen from the loop.
fn three_pair(model: &SequenceModel, stem: &Stem) -> PairTypeRNA {
    model.pair_type(stem.three).invert()
}

/// Children of a pseudoknot that sit in the pseudoloop rather than in a band.
fn unbanded_children(tree: &LoopTree, id: NodeId) -> usize {
    tree.children(id)
        .filter(|&c| tree.node(c).nesting == Nesting::UnBand)
        .count()
}

/// The multiloop between two pairs of a band: the outer pair closes it,
/// the inner pair and the nested branches are its stems.
fn span_face(tree: &LoopTree, span: &SpanLoop) -> LoopFace {
    let ((k, pk), (k2, pk2)) = (span.outer, span.inner);
    let mut inside: Vec<Stem> = span.branches.iter()
        .map(|&c| Stem::branch(tree.node(c).begin, tree.node(c).end))
        .collect();
    inside.push(Stem::branch(k2, pk2));
    inside.sort_by_key(|s| s.five);

    let stems: Vec<Stem> = iter::once(Stem::closing(k, pk)).chain(inside).collect();
    LoopFace::circular(stems)
}

/// Free energy of structures with crossing pairs: nearest neighbor loops
/// from an [`EnergyOracle`], pseudoknots after Dirks & Pierce, Rivas & Eddy
/// or H-type tables, coaxial stacking and dangling ends on top.
#[derive(Debug, Clone)]
pub struct PseudoknotEnergy<O: EnergyOracle = NearestNeighborOracle> {
    oracle: O,
    config: EngineConfig,
    penalties: PkPenalties,
    htype: HTypeTables,
}

impl PseudoknotEnergy<NearestNeighborOracle> {
    pub fn new(config: EngineConfig) -> Self {
        PseudoknotEnergy::with_oracle(NearestNeighborOracle::default(), config)
    }
}

impl Default for PseudoknotEnergy<NearestNeighborOracle> {
    fn default() -> Self {
        PseudoknotEnergy::new(EngineConfig::default())
    }
}

impl<O: EnergyOracle> PseudoknotEnergy<O> {
    pub fn with_oracle(oracle: O, config: EngineConfig) -> Self {
        let penalties = config.params.penalties();
        let htype = config.params.htype.clone().unwrap_or_default();
        PseudoknotEnergy { oracle, config, penalties, htype }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Parse, validate and score in one call. Returns dcal/mol.
    pub fn energy_of_structure(&self, sequence: &str, structure: &str) -> Result<i32, EnergyError> {
        let model = SequenceModel::from_strings(sequence, structure, self.config.max_length)?;
        Ok(self.evaluate(&model)?.total)
    }

    /// Decompose the structure into loops and score each of them. All
    /// working state lives in a fresh [`EvaluationContext`], so repeated
    /// calls on the same input give the same result.
    pub fn evaluate(&self, model: &SequenceModel) -> Result<Evaluation, EnergyError> {
        if model.len() > self.config.max_length {
            return Err(EnergyError::SizeLimitExceeded { len: model.len(), max: self.config.max_length });
        }
        let pt = model.pairs();
        let mut ctx = EvaluationContext::new(pt);

        ctx.advance(Stage::DetectingRegions);
        let regions = detect_regions(pt)?;

        ctx.advance(Stage::BuildingTree);
        let mut tree = LoopTree::new(model.len());
        for region in regions {
            tree.insert(region);
        }

        ctx.advance(Stage::DecomposingBands);
        tree.decompose_bands(pt, &mut ctx.pattern);

        ctx.advance(Stage::Classifying);
        tree.classify(pt);

        ctx.advance(Stage::Scoring);
        let mut contributions = Vec::with_capacity(tree.num_nodes());
        let mut total = 0;
        for id in tree.post_order() {
            let node = tree.node(id);
            let energy = self.energy_of_node(model, &tree, id, &mut ctx)?;
            let contribution = LoopContribution {
                node: id,
                kind: node.kind,
                begin: node.begin,
                end: node.end,
                energy,
            };
            info!("{:<41} {}", format!("{}:", contribution), format!("{:>6.2}", energy as f64 / 100.).green());
            total += energy;
            contributions.push(contribution);
        }

        ctx.advance(Stage::Done);
        Ok(Evaluation { tree, contributions, total })
    }

    fn energy_of_node(&self,
        model: &SequenceModel,
        tree: &LoopTree,
        id: NodeId,
        ctx: &mut EvaluationContext,
    ) -> Result<i32, EnergyError> {
        let node = tree.node(id);
        let (i, j) = (node.begin, node.end);
        let seq = model.sequence();

        let en = match node.kind {
            LoopKind::Hairpin => self.oracle.hairpin(&seq[i..=j]),
            LoopKind::Stack => self.oracle.stack(model.pair_type(i), model.pair_type(j - 1)),
            LoopKind::Interior => {
                let c = tree.children(id).next().ok_or(EnergyError::UnknownNode(id))?;
                let (p, q) = (tree.node(c).begin, tree.node(c).end);
                if p > i + 1 {
                    ctx.dangles.consume(p - 1)?;
                }
                if q + 1 < j {
                    ctx.dangles.consume(q + 1)?;
                }
                self.oracle.interior(&seq[i..=p], &seq[q..=j])
            }
            LoopKind::Multi => {
                let stems: Vec<Stem> = iter::once(Stem::closing(i, j))
                    .chain(tree.children(id).map(|c| Stem::branch(tree.node(c).begin, tree.node(c).end)))
                    .collect();
                let face = LoopFace::circular(stems);
                let pen = &self.penalties;
                pen.a + pen.b * (node.num_children as i32 + 1) + pen.c * face.unpaired() as i32
                    + self.terminal_energy(model, &face.stems)
                    + self.coaxial_energy(model, &face, &mut ctx.dangles, false)?
                    + self.dangle_energy(model, &face, &mut ctx.dangles)?
            }
            LoopKind::Exterior => {
                let stems: Vec<Stem> = tree.children(id)
                    .map(|c| Stem::branch(tree.node(c).begin, tree.node(c).end))
                    .collect();
                let face = LoopFace::exterior(stems, model.len());
                self.terminal_energy(model, &face.stems)
                    + self.coaxial_energy(model, &face, &mut ctx.dangles, true)?
                    + self.dangle_energy(model, &face, &mut ctx.dangles)?
            }
            LoopKind::Pseudo => self.pseudoknot_energy(model, tree, id, ctx)?,
        };
        Ok(en)
    }

    fn pseudoknot_energy(&self,
        model: &SequenceModel,
        tree: &LoopTree,
        id: NodeId,
        ctx: &mut EvaluationContext,
    ) -> Result<i32, EnergyError> {
        let node = tree.node(id);
        let face = self.pseudoloop(tree, id);
        let terminal = self.pseudoloop_terminal_energy(model, node, &face);

        match self.config.pk_model {
            PkModel::HType => {
                if let Some(loops) = self.htype_loops(node) {
                    let spans = self.span_energy(model, tree, node, ctx, SpanRules::Unscaled)?;
                    return Ok(loops + spans + terminal);
                }
                debug!("pseudoknot [{}, {}] is not a tabulated H-type, using Dirks & Pierce", node.begin, node.end);
            }
            PkModel::RivasEddy => {
                let re = &self.penalties.re;
                let extra_bands = node.bands.len().saturating_sub(2);
                return Ok(re.gw
                    + re.gwh * extra_bands as i32
                    + re.p_tilda * 2 * node.bands.len() as i32
                    + re.p_i * unbanded_children(tree, id) as i32
                    + re.q_tilda * node.unpaired as i32
                    + self.span_energy(model, tree, node, ctx, SpanRules::RivasEddy)?
                    + terminal
                    + self.coaxial_energy(model, &face, &mut ctx.dangles, true)?
                    + self.dangle_energy(model, &face, &mut ctx.dangles)?);
            }
            PkModel::DirksPierce => (),
        }

        let pen = &self.penalties;
        let init = match node.parent.map(|p| tree.node(p).kind) {
            Some(LoopKind::Exterior) | None => pen.ps,
            Some(LoopKind::Pseudo) if node.nesting == Nesting::UnBand => pen.psp,
            Some(_) => pen.psm,
        };

        Ok(init
            + pen.pb * node.bands.len() as i32
            + pen.pps * unbanded_children(tree, id) as i32
            + pen.pup * node.unpaired as i32
            + self.span_energy(model, tree, node, ctx, SpanRules::DirksPierce)?
            + terminal
            + self.coaxial_energy(model, &face, &mut ctx.dangles, true)?
            + self.dangle_energy(model, &face, &mut ctx.dangles)?)
    }

    /// Both strands of every band, and every crossing-free child that sits
    /// between bands.
    fn pseudoloop(&self, tree: &LoopTree, id: NodeId) -> LoopFace {
        let node = tree.node(id);
        let mut stems: Vec<Stem> = node.bands.iter()
            .flat_map(|b| [Stem::branch(b.outer.0, b.inner.0), Stem::branch(b.inner.1, b.outer.1)])
            .collect();
        stems.extend(tree.children(id)
            .filter(|&c| tree.node(c).nesting == Nesting::UnBand)
            .map(|c| Stem::branch(tree.node(c).begin, tree.node(c).end)));
        stems.sort_by_key(|s| s.five);
        LoopFace::linear(stems)
    }

    /// Terminal penalties of the helix ends inside the pseudoloop. The two
    /// outermost pairs face the parent loop and are paid for there.
    fn pseudoloop_terminal_energy(&self, model: &SequenceModel, node: &LoopNode, face: &LoopFace) -> i32 {
        let key = |p: usize, q: usize| (p.min(q), p.max(q));
        let mut seen: AHashSet<(usize, usize)> = AHashSet::new();
        for k in [node.begin, node.end] {
            if let Some(l) = model.partner(k) {
                seen.insert(key(k, l));
            }
        }

        let mut en = 0;
        for stem in &face.stems {
            for p in [stem.five, stem.three] {
                let Some(q) = model.partner(p) else { continue };
                let pair = key(p, q);
                if seen.insert(pair) {
                    en += self.oracle.terminal_penalty(model.pair_type(pair.0));
                }
            }
        }
        en
    }

    /// Loops between consecutive pairs of the same band. Dirks & Pierce
    /// scales stacks by `st_p` and interior loops by `int_p`, Rivas & Eddy
    /// scales both by `g_interior`.
    fn span_energy(&self,
        model: &SequenceModel,
        tree: &LoopTree,
        node: &LoopNode,
        ctx: &mut EvaluationContext,
        rules: SpanRules,
    ) -> Result<i32, EnergyError> {
        let pen = &self.penalties;
        let seq = model.sequence();
        let scaled = |dp: f64, en: i32| match rules {
            SpanRules::Unscaled => en,
            SpanRules::DirksPierce => PkPenalties::scale(dp, en),
            SpanRules::RivasEddy => PkPenalties::scale(pen.re.g_interior, en),
        };
        let mut total = 0;
        for span in &node.span_loops {
            let ((k, pk), (k2, pk2)) = (span.outer, span.inner);
            let en = match span.kind {
                SpanKind::Stack => {
                    scaled(pen.st_p, self.oracle.stack(model.pair_type(k), model.pair_type(pk2)))
                }
                SpanKind::Interior => {
                    if k2 > k + 1 {
                        ctx.dangles.consume(k2 - 1)?;
                    }
                    if pk2 + 1 < pk {
                        ctx.dangles.consume(pk2 + 1)?;
                    }
                    scaled(pen.int_p, self.oracle.interior(&seq[k..=k2], &seq[pk2..=pk]))
                }
                SpanKind::Multi if rules == SpanRules::RivasEddy => {
                    self.span_multi_energy_re(model, tree, span, ctx)?
                }
                SpanKind::Multi => self.span_multi_energy(model, tree, span, ctx)?,
            };
            total += en;
        }
        Ok(total)
    }

    /// A multiloop closed by two pairs of the same band, with the pseudoknot
    /// specific penalties.
    fn span_multi_energy(&self,
        model: &SequenceModel,
        tree: &LoopTree,
        span: &SpanLoop,
        ctx: &mut EvaluationContext,
    ) -> Result<i32, EnergyError> {
        let face = span_face(tree, span);
        let pen = &self.penalties;
        Ok(pen.a_p + pen.b_p * (span.branches.len() as i32 + 2) + pen.c_p * face.unpaired() as i32
            + self.terminal_energy(model, &face.stems)
            + self.coaxial_energy(model, &face, &mut ctx.dangles, false)?
            + self.dangle_energy(model, &face, &mut ctx.dangles)?)
    }

    /// Rivas & Eddy: one penalty per nested branch, one per band pair, no
    /// coaxial stacking and no cost for unpaired bases.
    fn span_multi_energy_re(&self,
        model: &SequenceModel,
        tree: &LoopTree,
        span: &SpanLoop,
        ctx: &mut EvaluationContext,
    ) -> Result<i32, EnergyError> {
        let face = span_face(tree, span);
        let re = &self.penalties.re;
        Ok(re.m_tilda + self.penalties.b * span.branches.len() as i32 + 2 * re.p_paired
            + self.terminal_energy(model, &face.stems)
            + self.dangle_energy(model, &face, &mut ctx.dangles)?)
    }

    /// Tabulated loop cost of a simple two-band pseudoknot, if the tables
    /// cover its loop lengths.
    fn htype_loops(&self, node: &LoopNode) -> Option<i32> {
        let tables = &self.htype;
        if node.bands.len() != 2 || node.num_children > 0 || node.count_spans(SpanKind::Multi) > 0 {
            return None;
        }
        let (b1, b2) = (&node.bands[0], &node.bands[1]);
        if !(b1.inner.0 < b2.outer.0 && b2.inner.0 < b1.inner.1 && b1.outer.1 < b2.inner.1) {
            return None;
        }
        let l1 = b2.outer.0 - b1.inner.0 - 1;
        let l2 = b1.inner.1 - b2.inner.0 - 1;
        let l3 = b2.inner.1 - b1.outer.1 - 1;
        let kcal = tables.lookup(l1, l2, l3)?;
        Some((kcal * KCAL_TO_DCAL).round() as i32)
    }

    /// Terminal penalties of all stems. A stem whose ends belong to two
    /// different pairs pays for both.
    fn terminal_energy(&self, model: &SequenceModel, stems: &[Stem]) -> i32 {
        stems.iter().map(|s| {
            let five = self.oracle.terminal_penalty(five_pair(model, s));
            if model.partner(s.five) == Some(s.three) {
                five
            } else {
                five + self.oracle.terminal_penalty(three_pair(model, s))
            }
        }).sum()
    }

    /// Stacks between neighboring stems that beat the dangles they displace.
    fn coaxial_candidates(&self,
        model: &SequenceModel,
        face: &LoopFace,
        dangles: &DanglingTable,
    ) -> Vec<CoaxialCandidate> {
        let free = |k: usize| face.in_gaps(k) && model.may_dangle(k) && dangles.is_available(k);
        let mut candidates = Vec::new();

        for gap in &face.gaps {
            let (Some(l), Some(r)) = (gap.left, gap.right) else { continue };
            let (pa, pb) = (three_pair(model, &face.stems[l]), five_pair(model, &face.stems[r]));
            let far5 = |k: usize| self.oracle.dangle5(pa, model.base(k));
            let far3 = |k: usize| self.oracle.dangle3(pb, model.base(k));
            let left_far = model.partner(face.stems[l].three)
                .and_then(|p| p.checked_sub(1))
                .filter(|&k| free(k));
            let right_far = model.partner(face.stems[r].five)
                .map(|p| p + 1)
                .filter(|&k| free(k));

            let (energy, consumes, displaced) = match gap.len() {
                0 => {
                    let en = self.oracle.coaxial_flush(pa, pb);
                    match self.config.mismatch_dangles {
                        MismatchDangles::Involved => (en, Vec::new(), 0),
                        MismatchDangles::Both => {
                            let consumes: Vec<usize> = left_far.into_iter().chain(right_far).collect();
                            let displaced = left_far.map_or(0, far5) + right_far.map_or(0, far3);
                            (en, consumes, displaced)
                        }
                    }
                }
                1 => {
                    let mid = gap.start;
                    if !model.may_dangle(mid) || !dangles.is_available(mid) {
                        continue;
                    }
                    let Some((en, side)) = self.oracle.coaxial_mismatch_choice(
                        pa, left_far.map(|k| model.base(k)),
                        model.base(mid),
                        pb, right_far.map(|k| model.base(k)),
                    ) else { continue };

                    let (take_left, take_right) = match (self.config.mismatch_dangles, side) {
                        (MismatchDangles::Both, _) => (true, true),
                        (MismatchDangles::Involved, MismatchSide::Left) => (true, false),
                        (MismatchDangles::Involved, MismatchSide::Right) => (false, true),
                    };
                    let mut consumes = vec![mid];
                    let mut displaced = self.oracle.dangle3(pa, model.base(mid))
                        .min(self.oracle.dangle5(pb, model.base(mid)));
                    if let Some(k) = left_far.filter(|_| take_left) {
                        consumes.push(k);
                        displaced += far5(k);
                    }
                    if let Some(k) = right_far.filter(|_| take_right) {
                        consumes.push(k);
                        displaced += far3(k);
                    }
                    (en, consumes, displaced)
                }
                _ => continue,
            };

            let displaced = if self.config.dangles { displaced } else { 0 };
            if energy < 0 && energy < displaced {
                candidates.push(CoaxialCandidate { left: l, right: r, energy, consumes });
            }
        }
        candidates
    }

    fn coaxial_energy(&self,
        model: &SequenceModel,
        face: &LoopFace,
        dangles: &mut DanglingTable,
        allow_empty: bool,
    ) -> Result<i32, EnergyError> {
        if self.config.coaxial == CoaxialStrategy::Disabled {
            return Ok(0);
        }
        let candidates = self.coaxial_candidates(model, face, dangles);
        if candidates.is_empty() {
            return Ok(0);
        }
        let choice = match self.config.coaxial {
            CoaxialStrategy::AllPairs => all_pairs(&candidates),
            _ => best_combination(&candidates, face.stems.len(), allow_empty),
        };

        let mut claimed: Vec<usize> = choice.chosen.iter()
            .flat_map(|&c| candidates[c].consumes.iter().copied())
            .collect();
        claimed.sort_unstable();
        claimed.dedup();
        for k in claimed {
            dangles.consume(k)?;
        }
        Ok(choice.energy)
    }

    /// Dangles into every gap that coaxial stacking left alone. A single
    /// base between two stems dangles on whichever side is more favorable.
    fn dangle_energy(&self,
        model: &SequenceModel,
        face: &LoopFace,
        dangles: &mut DanglingTable,
    ) -> Result<i32, EnergyError> {
        if !self.config.dangles {
            return Ok(0);
        }
        let mut en = 0;
        for gap in &face.gaps {
            if gap.len() == 0 {
                continue;
            }
            let d3 = |k: usize| gap.left
                .map(|s| self.oracle.dangle3(three_pair(model, &face.stems[s]), model.base(k)));
            let d5 = |k: usize| gap.right
                .map(|s| self.oracle.dangle5(five_pair(model, &face.stems[s]), model.base(k)));
            let (first, last) = (gap.start, gap.end - 1);

            if first == last {
                if !model.may_dangle(first) || !dangles.is_available(first) {
                    continue;
                }
                let best = match (d3(first), d5(first)) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
                if let Some(e) = best {
                    en += e;
                    dangles.consume(first)?;
                }
                continue;
            }
            if let Some(e) = d3(first).filter(|_| model.may_dangle(first) && dangles.is_available(first)) {
                en += e;
                dangles.consume(first)?;
            }
            if let Some(e) = d5(last).filter(|_| model.may_dangle(last) && dangles.is_available(last)) {
                en += e;
                dangles.consume(last)?;
            }
        }
        Ok(en)
    }
}

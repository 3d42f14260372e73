use std::fmt;
use std::convert::TryFrom;

use log::debug;
use nohash_hasher::IntMap;

use crate::Band;
use crate::BandPattern;
use crate::ClosedRegion;
use crate::PairTable;
use crate::StructureError;
use crate::detect_regions;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    Hairpin,
    Stack,
    Interior,
    Multi,
    Pseudo,
    Exterior,
}

impl LoopKind {
    pub fn name(&self) -> &'static str {
        match self {
            LoopKind::Hairpin => "hairpin",
            LoopKind::Stack => "stack",
            LoopKind::Interior => "interior",
            LoopKind::Multi => "multi",
            LoopKind::Pseudo => "pseudo",
            LoopKind::Exterior => "exterior",
        }
    }
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where a child of a pseudoknot sits relative to the bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nesting {
    /// Not the child of a pseudoknot.
    Unset,
    /// Inside a loop that spans a band.
    InBand,
    /// In the pseudoloop, between bands.
    UnBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Stack,
    Interior,
    Multi,
}

/// A loop closed by two consecutive pairs of the same band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanLoop {
    pub kind: SpanKind,
    pub outer: (usize, usize),
    pub inner: (usize, usize),
    /// Closed regions nested in this loop, 5' to 3'.
    pub branches: Vec<NodeId>,
    pub unpaired: usize,
}

#[derive(Debug, Clone)]
pub struct LoopNode {
    pub begin: usize,
    pub end: usize,
    pub kind: LoopKind,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub num_children: usize,
    /// Unpaired bases of this loop. For pseudoknots these are the bases of
    /// the pseudoloop proper, outside of band-spanning loops.
    pub unpaired: usize,
    pub nesting: Nesting,
    pub bands: Vec<Band>,
    pub span_loops: Vec<SpanLoop>,
}

impl LoopNode {
    fn new(begin: usize, end: usize, kind: LoopKind) -> Self {
        LoopNode {
            begin,
            end,
            kind,
            parent: None,
            first_child: None,
            next_sibling: None,
            num_children: 0,
            unpaired: 0,
            nesting: Nesting::Unset,
            bands: Vec::new(),
            span_loops: Vec::new(),
        }
    }

    pub fn count_spans(&self, kind: SpanKind) -> usize {
        self.span_loops.iter().filter(|s| s.kind == kind).count()
    }
}

/// Arena of loops. Node `0` is the exterior loop; every other node is a
/// closed region. Nodes are stored in the order their regions closed, so
/// every child has a smaller id than its parent.
#[derive(Debug, Clone)]
pub struct LoopTree {
    nodes: Vec<LoopNode>,
    len: usize,
    /// Closed regions by their begin position.
    region_at: IntMap<usize, NodeId>,
    /// Nodes without a parent yet, ordered by position.
    frontier: Vec<NodeId>,
}

pub struct Children<'a> {
    tree: &'a LoopTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.nodes[id].next_sibling;
        Some(id)
    }
}

impl LoopTree {
    pub const ROOT: NodeId = 0;

    pub fn new(len: usize) -> Self {
        LoopTree {
            nodes: vec![LoopNode::new(0, len.saturating_sub(1), LoopKind::Exterior)],
            len,
            region_at: IntMap::default(),
            frontier: Vec::new(),
        }
    }

    /// Length of the underlying sequence.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &LoopNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &LoopNode)> {
        self.nodes.iter().enumerate()
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children { tree: self, next: self.nodes[id].first_child }
    }

    /// The closed region starting at `begin`, if there is one.
    pub fn region_at(&self, begin: usize) -> Option<NodeId> {
        self.region_at.get(&begin).copied()
    }

    /// Children before parents, siblings 5' to 3', root last.
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(LoopTree::ROOT, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            let children: Vec<NodeId> = self.children(id).collect();
            stack.extend(children.into_iter().rev().map(|c| (c, false)));
        }
        order
    }

    /// True if neither this loop nor any loop below it is a pseudoknot.
    pub fn is_pseudoknot_free(&self, id: NodeId) -> bool {
        self.nodes[id].kind != LoopKind::Pseudo && self.children(id).all(|c| self.is_pseudoknot_free(c))
    }

    /// Add a region in the order [`detect_regions`] emits it. Regions on the
    /// frontier that start inside the new one become its children.
    pub fn insert(&mut self, region: ClosedRegion) -> NodeId {
        let id = self.nodes.len();
        let mut node = LoopNode::new(region.begin, region.end, LoopKind::Hairpin);

        let split = self.frontier.iter()
            .rposition(|&c| self.nodes[c].begin < region.begin)
            .map_or(0, |p| p + 1);
        let enclosed: Vec<NodeId> = self.frontier.drain(split..).collect();

        for (k, &c) in enclosed.iter().enumerate() {
            self.nodes[c].parent = Some(id);
            self.nodes[c].next_sibling = enclosed.get(k + 1).copied();
        }
        node.first_child = enclosed.first().copied();
        node.num_children = enclosed.len();

        if let Some(&last) = self.frontier.last() {
            self.nodes[last].next_sibling = Some(id);
        }
        self.nodes.push(node);
        self.region_at.insert(region.begin, id);
        self.frontier.push(id);
        id
    }

    /// Attach the remaining frontier to the exterior loop.
    fn close_frontier(&mut self) {
        if self.frontier.is_empty() {
            return;
        }
        let top: Vec<NodeId> = std::mem::take(&mut self.frontier);
        for &c in &top {
            self.nodes[c].parent = Some(LoopTree::ROOT);
        }
        if let Some(&last) = top.last() {
            self.nodes[last].next_sibling = None;
        }
        let root = &mut self.nodes[LoopTree::ROOT];
        root.first_child = top.first().copied();
        root.num_children = top.len();
    }

    /// Count the unpaired bases of `[lo, hi)` that are not inside a child.
    fn unpaired_between(&self, pt: &PairTable, lo: usize, hi: usize, skip_span: Option<&[Band]>) -> usize {
        let mut k = lo;
        let mut count = 0;
        while k < hi {
            if let Some(c) = self.region_at(k) {
                k = self.nodes[c].end + 1;
                continue;
            }
            let spanned = skip_span.is_some_and(|bands| bands.iter().any(|b| b.spans(k)));
            if !pt.is_paired(k) && !spanned {
                count += 1;
            }
            k += 1;
        }
        count
    }

    fn classify_node(&mut self, pt: &PairTable, id: NodeId) -> LoopKind {
        let node = &self.nodes[id];
        if pt.partner(node.begin) != Some(node.end) {
            return LoopKind::Pseudo;
        }
        let mut children = self.children(id);
        match (children.next(), children.next()) {
            (None, _) => LoopKind::Hairpin,
            (Some(c), None) if self.nodes[c].kind != LoopKind::Pseudo => {
                let child = &self.nodes[c];
                if child.begin == node.begin + 1 && child.end + 1 == node.end {
                    LoopKind::Stack
                } else {
                    LoopKind::Interior
                }
            }
            _ => LoopKind::Multi,
        }
    }

    /// Walk the pairs of each band and record the loops between consecutive
    /// pairs. Children found inside such a loop are marked as in-band; the
    /// remaining children of the pseudoknot sit in the pseudoloop.
    fn find_span_loops(&mut self, pt: &PairTable, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).collect();
        let bands = self.nodes[id].bands.clone();
        let mut spans = Vec::new();

        for band in &bands {
            let mut stems = Vec::new();
            let mut k = band.outer.0;
            while k <= band.inner.0 {
                match self.region_at(k) {
                    Some(c) if children.contains(&c) => {
                        k = self.nodes[c].end + 1;
                        continue;
                    }
                    _ => (),
                }
                if let Some(l) = pt.partner(k) {
                    stems.push((k, l));
                }
                k += 1;
            }

            for w in stems.windows(2) {
                let (outer, inner) = (w[0], w[1]);
                let branches: Vec<NodeId> = children.iter().copied()
                    .filter(|&c| {
                        let b = self.nodes[c].begin;
                        (outer.0 < b && b < inner.0) || (inner.1 < b && b < outer.1)
                    })
                    .collect();
                let unpaired = self.unpaired_between(pt, outer.0 + 1, inner.0, None)
                    + self.unpaired_between(pt, inner.1 + 1, outer.1, None);
                let kind = if !branches.is_empty() {
                    SpanKind::Multi
                } else if inner.0 == outer.0 + 1 && outer.1 == inner.1 + 1 {
                    SpanKind::Stack
                } else {
                    SpanKind::Interior
                };
                for &c in &branches {
                    self.nodes[c].nesting = Nesting::InBand;
                }
                spans.push(SpanLoop { kind, outer, inner, branches, unpaired });
            }
        }

        for &c in &children {
            if self.nodes[c].nesting == Nesting::Unset {
                self.nodes[c].nesting = Nesting::UnBand;
            }
        }
        self.nodes[id].span_loops = spans;
    }

    /// Split every crossing region into bands, post-order. The nested regions
    /// of a region are unlinked from the shared pattern before the region
    /// itself is decomposed.
    pub fn decompose_bands(&mut self, pt: &PairTable, pattern: &mut BandPattern) {
        self.close_frontier();

        for id in self.post_order() {
            let (begin, end) = (self.nodes[id].begin, self.nodes[id].end);
            if id == LoopTree::ROOT || pt.partner(begin) == Some(end) {
                continue;
            }
            let children: Vec<NodeId> = self.children(id).collect();
            for c in children {
                pattern.splice_out(self.nodes[c].begin, self.nodes[c].end);
            }
            let bands = pattern.decompose(pt, begin, end);
            debug!("pseudoknot [{}, {}]: {} bands", begin, end, bands.len());
            self.nodes[id].bands = bands;
        }
    }

    /// Type every loop, post-order, and count its unpaired bases. Expects
    /// [`LoopTree::decompose_bands`] to have run.
    pub fn classify(&mut self, pt: &PairTable) {
        self.close_frontier();

        for id in self.post_order() {
            if id == LoopTree::ROOT {
                let n = self.len;
                self.nodes[id].unpaired = self.unpaired_between(pt, 0, n, None);
                continue;
            }
            let kind = self.classify_node(pt, id);
            self.nodes[id].kind = kind;
            let (begin, end) = (self.nodes[id].begin, self.nodes[id].end);

            if kind == LoopKind::Pseudo {
                let bands = std::mem::take(&mut self.nodes[id].bands);
                self.nodes[id].unpaired = self.unpaired_between(pt, begin + 1, end, Some(&bands));
                self.nodes[id].bands = bands;
                self.find_span_loops(pt, id);
            } else {
                self.nodes[id].unpaired = self.unpaired_between(pt, begin + 1, end, None);
            }
        }
    }

    /// Detect, insert and classify in one go, using the given band pattern.
    pub fn build(pt: &PairTable, pattern: &mut BandPattern) -> Result<Self, StructureError> {
        let mut tree = LoopTree::new(pt.len());
        for region in detect_regions(pt)? {
            tree.insert(region);
        }
        tree.decompose_bands(pt, pattern);
        tree.classify(pt);
        debug!("loop tree: {} loops for {} positions", tree.num_nodes(), tree.len());
        Ok(tree)
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = &self.nodes[id];
        write!(f, "{:indent$}[{:>3}, {:>3}] {}", "", node.begin, node.end, node.kind, indent = 2 * depth)?;
        if node.nesting != Nesting::Unset {
            write!(f, " ({:?})", node.nesting)?;
        }
        writeln!(f)?;
        for band in &node.bands {
            writeln!(f, "{:indent$}band {}", "", band, indent = 2 * depth + 4)?;
        }
        for span in &node.span_loops {
            writeln!(f, "{:indent$}{:?}-span ({}, {}) ({}, {})", "",
                span.kind, span.outer.0, span.outer.1, span.inner.0, span.inner.1,
                indent = 2 * depth + 4)?;
        }
        for c in self.children(id) {
            self.fmt_node(f, c, depth + 1)?;
        }
        Ok(())
    }
}

impl TryFrom<&PairTable> for LoopTree {
    type Error = StructureError;

    fn try_from(pt: &PairTable) -> Result<Self, Self::Error> {
        let mut pattern = BandPattern::new(pt);
        LoopTree::build(pt, &mut pattern)
    }
}

impl fmt::Display for LoopTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, LoopTree::ROOT, 0)
    }
}

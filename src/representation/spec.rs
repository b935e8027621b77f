//! Knob specifications.
//!
//! A [`KnobSpec`] describes one kind of decision variable. Field sets are
//! built from `(spec, count)` pairs via
//! [`FieldSet::build_spec`](super::FieldSet::build_spec).

use super::instance::{Contin, Disc};
use rand::Rng;

/// A discrete knob with `multiplicity` legal values `0..multiplicity`.
///
/// Multiplicity 2 is a boolean knob and is stored among the bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscSpec {
    pub multiplicity: Disc,
}

impl DiscSpec {
    /// # Panics
    /// Panics if `multiplicity < 2`.
    pub fn new(multiplicity: Disc) -> Self {
        assert!(
            multiplicity >= 2,
            "discrete knob needs at least 2 values, got {multiplicity}"
        );
        Self { multiplicity }
    }

    /// A boolean knob.
    pub fn bit() -> Self {
        Self { multiplicity: 2 }
    }

    pub fn is_bit(&self) -> bool {
        self.multiplicity == 2
    }
}

/// A continuous knob explored by interval bisection.
///
/// Starting from a value, one bisection step moves left or right by
/// `step(level)`; successive levels shrink the step by `expansion`. A
/// path of at most `depth` steps reaches `2^depth` distinct endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContinSpec {
    /// Default value of the knob.
    pub mean: Contin,
    /// Magnitude of the first bisection step.
    pub step_size: Contin,
    /// Ratio between successive step sizes.
    pub expansion: Contin,
    /// Maximum number of bisection steps.
    pub depth: u32,
}

impl Default for ContinSpec {
    fn default() -> Self {
        Self {
            mean: 0.0,
            step_size: 1.0,
            expansion: 2.0,
            depth: 5,
        }
    }
}

impl ContinSpec {
    /// Largest supported bisection depth.
    pub const MAX_DEPTH: u32 = 32;

    /// # Panics
    /// Panics on a non-positive step size, an expansion below 2 (paths
    /// would no longer reach distinct endpoints) or a depth outside
    /// `1..=MAX_DEPTH`.
    pub fn new(mean: Contin, step_size: Contin, expansion: Contin, depth: u32) -> Self {
        assert!(
            step_size > 0.0 && step_size.is_finite(),
            "contin step_size must be positive and finite, got {step_size}"
        );
        assert!(expansion >= 2.0, "contin expansion must be >= 2, got {expansion}");
        assert!(
            (1..=Self::MAX_DEPTH).contains(&depth),
            "contin depth must be in 1..={}, got {depth}",
            Self::MAX_DEPTH
        );
        Self {
            mean,
            step_size,
            expansion,
            depth,
        }
    }

    /// Step magnitude at bisection `level` (0-based).
    pub fn step(&self, level: u32) -> Contin {
        self.step_size / self.expansion.powi(level as i32)
    }

    /// Offset reached by a path of `len` steps. Bit `i` of `directions`
    /// set means step `i` goes right.
    pub fn path_offset(&self, directions: u64, len: u32) -> Contin {
        (0..len)
            .map(|level| {
                let step = self.step(level);
                if directions >> level & 1 == 1 {
                    step
                } else {
                    -step
                }
            })
            .sum()
    }

    /// Number of distinct offsets reachable by bisection paths of length
    /// `1..=depth`, that is `2^(depth + 1) - 2`.
    pub fn neighbor_count(&self) -> usize {
        let n = (1u128 << (self.depth + 1)) - 2;
        usize::try_from(n).unwrap_or(usize::MAX)
    }

    /// The `alt`-th offset of [`neighbor_count`](Self::neighbor_count):
    /// the two length-1 paths first, then the four length-2 paths, and
    /// so on. Every offset is non-zero and all are distinct.
    pub fn neighbor_offset(&self, alt: usize) -> Contin {
        let mut rest = alt as u64;
        let mut len = 1u32;
        while len < self.depth && rest >= 1u64 << len {
            rest -= 1u64 << len;
            len += 1;
        }
        self.path_offset(rest, len)
    }

    /// Applies one random bisection step to `value`.
    pub fn bisect<R: Rng>(&self, value: Contin, rng: &mut R) -> Contin {
        let level = rng.random_range(0..self.depth);
        if rng.random_bool(0.5) {
            value + self.step(level)
        } else {
            value - self.step(level)
        }
    }
}

/// One node of a [`TermTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TermNode {
    label: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// A tree of terms selectable by a term knob. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TermTree {
    nodes: Vec<TermNode>,
}

impl TermTree {
    pub const ROOT: usize = 0;

    pub fn new(root_label: impl Into<String>) -> Self {
        Self {
            nodes: vec![TermNode {
                label: root_label.into(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Appends a child under `parent` and returns its node id.
    ///
    /// # Panics
    /// Panics if `parent` is not a node of this tree.
    pub fn add_child(&mut self, parent: usize, label: impl Into<String>) -> usize {
        assert!(parent < self.nodes.len(), "no term node {parent}");
        let id = self.nodes.len();
        self.nodes.push(TermNode {
            label: label.into(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn label(&self, node: usize) -> &str {
        &self.nodes[node].label
    }

    pub fn children(&self, node: usize) -> &[usize] {
        &self.nodes[node].children
    }

    /// The `idx`-th child of `node`, if present.
    pub fn child(&self, node: usize, idx: usize) -> Option<usize> {
        self.nodes[node].children.get(idx).copied()
    }

    /// Number of edges between the root and `node`.
    pub fn depth_of(&self, node: usize) -> usize {
        let mut depth = 0;
        let mut cur = node;
        while let Some(parent) = self.nodes[cur].parent {
            depth += 1;
            cur = parent;
        }
        depth
    }

    pub fn max_depth(&self) -> usize {
        (0..self.nodes.len())
            .map(|n| self.depth_of(n))
            .max()
            .unwrap_or(0)
    }

    pub fn max_branching(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.children.len())
            .max()
            .unwrap_or(0)
    }

    /// Child positions leading from the root to `node`.
    pub fn path_to(&self, node: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cur = node;
        while let Some(parent) = self.nodes[cur].parent {
            let pos = self.nodes[parent]
                .children
                .iter()
                .position(|&c| c == cur)
                .unwrap_or_default();
            path.push(pos);
            cur = parent;
        }
        path.reverse();
        path
    }
}

/// Term trees shared by all term knobs of one problem.
///
/// Term knobs refer to trees by index; the trees are never copied into
/// instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TermCatalog {
    trees: Vec<TermTree>,
}

impl TermCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tree and returns its index.
    pub fn add(&mut self, tree: TermTree) -> usize {
        self.trees.push(tree);
        self.trees.len() - 1
    }

    pub fn get(&self, idx: usize) -> Option<&TermTree> {
        self.trees.get(idx)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

impl std::ops::Index<usize> for TermCatalog {
    type Output = TermTree;

    fn index(&self, idx: usize) -> &TermTree {
        &self.trees[idx]
    }
}

/// A term knob: a path selector of `depth` raw fields down a catalog tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TermSpec {
    /// Index of the tree in the [`TermCatalog`].
    pub tree: usize,
    /// Number of raw fields (levels) in the path.
    pub depth: usize,
    /// Maximum number of children of any node.
    pub branching: usize,
}

impl TermSpec {
    /// Raw value that ends a path walk.
    pub const STOP: Disc = 0;

    /// Derives depth and branching from the catalog tree.
    ///
    /// # Panics
    /// Panics if `tree` is not in the catalog.
    pub fn new(catalog: &TermCatalog, tree: usize) -> Self {
        let t = catalog
            .get(tree)
            .unwrap_or_else(|| panic!("term tree {tree} is not in the catalog"));
        Self {
            tree,
            depth: t.max_depth(),
            branching: t.max_branching(),
        }
    }

    /// Number of distinct raw values per level (children plus stop).
    pub fn raw_multiplicity(&self) -> Disc {
        (self.branching + 1) as Disc
    }

    pub fn to_child_idx(raw: Disc) -> usize {
        raw as usize - 1
    }

    pub fn from_child_idx(idx: usize) -> Disc {
        (idx + 1) as Disc
    }
}

/// Any knob kind accepted by a field set.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KnobSpec {
    Disc(DiscSpec),
    Contin(ContinSpec),
    Term(TermSpec),
}

impl From<DiscSpec> for KnobSpec {
    fn from(spec: DiscSpec) -> Self {
        KnobSpec::Disc(spec)
    }
}

impl From<ContinSpec> for KnobSpec {
    fn from(spec: ContinSpec) -> Self {
        KnobSpec::Contin(spec)
    }
}

impl From<TermSpec> for KnobSpec {
    fn from(spec: TermSpec) -> Self {
        KnobSpec::Term(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    fn sample_tree() -> TermTree {
        // root -> {a -> {a1, a2}, b}
        let mut t = TermTree::new("root");
        let a = t.add_child(TermTree::ROOT, "a");
        t.add_child(TermTree::ROOT, "b");
        t.add_child(a, "a1");
        t.add_child(a, "a2");
        t
    }

    #[test]
    #[should_panic]
    fn test_disc_spec_rejects_unary() {
        DiscSpec::new(1);
    }

    #[test]
    fn test_term_tree_shape() {
        let t = sample_tree();
        assert_eq!(t.len(), 5);
        assert_eq!(t.max_depth(), 2);
        assert_eq!(t.max_branching(), 2);
        assert_eq!(t.path_to(4), vec![0, 1]);
        assert_eq!(t.label(t.child(TermTree::ROOT, 1).unwrap()), "b");
    }

    #[test]
    fn test_term_spec_from_catalog() {
        let mut catalog = TermCatalog::new();
        let idx = catalog.add(sample_tree());
        let spec = TermSpec::new(&catalog, idx);
        assert_eq!(spec.depth, 2);
        assert_eq!(spec.raw_multiplicity(), 3);
        assert_eq!(TermSpec::to_child_idx(TermSpec::from_child_idx(1)), 1);
    }

    #[test]
    fn test_contin_neighbor_offsets_distinct_and_nonzero() {
        let spec = ContinSpec::new(0.0, 1.0, 2.0, 3);
        assert_eq!(spec.neighbor_count(), 14);
        let mut offsets: Vec<f64> = (0..spec.neighbor_count())
            .map(|alt| spec.neighbor_offset(alt))
            .collect();
        assert!(offsets.iter().all(|o| *o != 0.0));
        offsets.sort_by(|a, b| a.total_cmp(b));
        offsets.dedup();
        assert_eq!(offsets.len(), 14);
    }

    #[test]
    fn test_contin_neighbor_offsets_by_length() {
        let spec = ContinSpec::new(0.0, 1.0, 2.0, 3);
        assert_eq!(spec.neighbor_offset(0), -1.0);
        assert_eq!(spec.neighbor_offset(1), 1.0);
        // first length-2 path: left, left
        assert_eq!(spec.neighbor_offset(2), -1.5);
        // last length-3 path: right, right, right
        assert_eq!(spec.neighbor_offset(13), 1.75);
    }

    #[test]
    fn test_contin_bisect_moves_by_a_step() {
        let spec = ContinSpec::new(0.0, 1.0, 2.0, 3);
        let mut rng = create_rng(11);
        for _ in 0..50 {
            let moved = spec.bisect(0.0, &mut rng).abs();
            assert!([1.0, 0.5, 0.25].contains(&moved), "unexpected step {moved}");
        }
    }

    #[test]
    #[should_panic]
    fn test_contin_spec_rejects_small_expansion() {
        ContinSpec::new(0.0, 1.0, 1.5, 3);
    }
}

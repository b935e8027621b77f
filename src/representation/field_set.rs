//! Field sets: the schema mapping knobs to packed storage.
//!
//! A [`FieldSet`] is built once per problem from `(spec, count)` pairs and
//! then shared read-only (behind an `Arc`) by every instance, deme and
//! optimizer iteration of that problem.
//!
//! # Layout
//!
//! Knobs are grouped in a fixed order: term, contin, disc, bit. Term, disc
//! and bit knobs occupy raw fields inside the packed words; contin knobs
//! live in the instance's float vector. Raw fields never straddle a word,
//! and every term knob starts on a word boundary and fills a whole number
//! of words. The offset table is computed once per `build_spec` call and
//! never per access.

use super::instance::{Contin, Disc, Instance, PackedWord, BITS_PER_WORD};
use super::spec::{ContinSpec, DiscSpec, KnobSpec, TermCatalog, TermSpec, TermTree};
use rand::Rng;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Location of one raw field inside the packed words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawField {
    /// Number of bits.
    pub width: u32,
    /// Index of the word holding the field.
    pub word: usize,
    /// Bit offset of the field inside its word.
    pub shift: u32,
}

impl RawField {
    fn mask(&self) -> PackedWord {
        if self.width == 0 {
            0
        } else {
            (1 << self.width) - 1
        }
    }
}

/// Number of bits needed to store values `0..multiplicity`.
pub fn nbits_to_pack(multiplicity: usize) -> u32 {
    if multiplicity <= 1 {
        0
    } else {
        usize::BITS - (multiplicity - 1).leading_zeros()
    }
}

/// Kind of a logical knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnobKind {
    Term,
    Contin,
    Disc,
    Bit,
}

/// Schema of one optimization problem.
#[derive(Debug, Clone)]
pub struct FieldSet {
    term: Vec<TermSpec>,
    contin: Vec<ContinSpec>,
    disc: Vec<DiscSpec>,
    nbool: usize,
    catalog: Arc<TermCatalog>,

    // Filled by compute_starts.
    fields: Vec<RawField>,
    term_starts: Vec<usize>,
    packed_width: usize,
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for FieldSet {
    fn eq(&self, other: &Self) -> bool {
        self.disc == other.disc
            && self.contin == other.contin
            && self.term == other.term
            && self.nbool == other.nbool
    }
}

impl FieldSet {
    /// An empty field set without term trees.
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(TermCatalog::new()))
    }

    /// An empty field set whose term knobs resolve against `catalog`.
    pub fn with_catalog(catalog: Arc<TermCatalog>) -> Self {
        Self {
            term: Vec::new(),
            contin: Vec::new(),
            disc: Vec::new(),
            nbool: 0,
            catalog,
            fields: Vec::new(),
            term_starts: Vec::new(),
            packed_width: 0,
        }
    }

    /// Builds a field set from `(spec, count)` pairs.
    pub fn from_specs<I>(specs: I, catalog: Arc<TermCatalog>) -> Self
    where
        I: IntoIterator<Item = (KnobSpec, usize)>,
    {
        let mut fs = Self::with_catalog(catalog);
        for (spec, n) in specs {
            fs.build_spec(&spec, n);
        }
        fs
    }

    /// Chained form of [`build_spec`](Self::build_spec).
    pub fn with_spec(mut self, spec: impl Into<KnobSpec>, n: usize) -> Self {
        self.build_spec(&spec.into(), n);
        self
    }

    /// Appends `n` knobs of the given spec and recomputes the offsets.
    ///
    /// # Panics
    /// Panics on a malformed spec: a discrete multiplicity below 2, an
    /// invalid contin spec, or a term spec whose tree is not in the
    /// catalog. These are caller contract violations.
    pub fn build_spec(&mut self, spec: &KnobSpec, n: usize) {
        match spec {
            KnobSpec::Term(ts) => self.build_term_spec(ts, n),
            KnobSpec::Contin(cs) => self.build_contin_spec(cs, n),
            KnobSpec::Disc(ds) => self.build_disc_spec(ds, n),
        }
        self.compute_starts();
    }

    fn build_disc_spec(&mut self, ds: &DiscSpec, n: usize) {
        assert!(
            ds.multiplicity >= 2,
            "malformed disc spec: multiplicity {}",
            ds.multiplicity
        );
        if ds.is_bit() {
            self.nbool += n;
        } else {
            self.disc.extend(std::iter::repeat(*ds).take(n));
        }
    }

    fn build_contin_spec(&mut self, cs: &ContinSpec, n: usize) {
        // Re-validates specs assembled through the public fields.
        let cs = ContinSpec::new(cs.mean, cs.step_size, cs.expansion, cs.depth);
        self.contin.extend(std::iter::repeat(cs).take(n));
    }

    fn build_term_spec(&mut self, ts: &TermSpec, n: usize) {
        let tree = self
            .catalog
            .get(ts.tree)
            .unwrap_or_else(|| panic!("malformed term spec: tree {} not in catalog", ts.tree));
        assert!(
            ts.depth >= tree.max_depth() && ts.branching >= tree.max_branching(),
            "malformed term spec: depth/branching smaller than tree {}",
            ts.tree
        );
        self.term.extend(std::iter::repeat(*ts).take(n));
    }

    fn compute_starts(&mut self) {
        fn align(pos: usize) -> usize {
            pos.div_ceil(BITS_PER_WORD) * BITS_PER_WORD
        }
        fn push(fields: &mut Vec<RawField>, pos: &mut usize, width: u32) {
            let w = width as usize;
            if w > 0 && *pos % BITS_PER_WORD + w > BITS_PER_WORD {
                *pos = align(*pos);
            }
            fields.push(RawField {
                width,
                word: *pos / BITS_PER_WORD,
                shift: (*pos % BITS_PER_WORD) as u32,
            });
            *pos += w;
        }

        self.fields.clear();
        self.term_starts.clear();
        let mut pos = 0usize;

        for ts in &self.term {
            pos = align(pos);
            self.term_starts.push(self.fields.len());
            let width = nbits_to_pack(ts.raw_multiplicity() as usize);
            for _ in 0..ts.depth {
                push(&mut self.fields, &mut pos, width);
            }
            // term knobs must pack evenly
            pos = align(pos);
        }
        for ds in &self.disc {
            push(
                &mut self.fields,
                &mut pos,
                nbits_to_pack(ds.multiplicity as usize),
            );
        }
        for _ in 0..self.nbool {
            push(&mut self.fields, &mut pos, 1);
        }
        self.packed_width = pos.div_ceil(BITS_PER_WORD);
    }

    // ------------------------------------------------------------------
    // Shape
    // ------------------------------------------------------------------

    pub fn term(&self) -> &[TermSpec] {
        &self.term
    }

    pub fn contin(&self) -> &[ContinSpec] {
        &self.contin
    }

    /// Discrete specs with multiplicity above 2.
    pub fn disc(&self) -> &[DiscSpec] {
        &self.disc
    }

    pub fn catalog(&self) -> &Arc<TermCatalog> {
        &self.catalog
    }

    /// Raw field table.
    pub fn raw_fields(&self) -> &[RawField] {
        &self.fields
    }

    /// Number of packed words per instance.
    pub fn packed_width(&self) -> usize {
        self.packed_width
    }

    pub fn n_term_fields(&self) -> usize {
        self.term.len()
    }

    pub fn n_contin_fields(&self) -> usize {
        self.contin.len()
    }

    pub fn n_disc_fields(&self) -> usize {
        self.disc.len()
    }

    pub fn n_bits(&self) -> usize {
        self.nbool
    }

    /// Total number of logical knobs.
    pub fn n_knobs(&self) -> usize {
        self.term.len() + self.contin.len() + self.disc.len() + self.nbool
    }

    /// Number of packed-storage dimensions plus contin knobs, the
    /// dimension of the search space seen by particle swarm.
    pub fn dimension(&self) -> usize {
        self.nbool + self.disc.len() + self.contin.len()
    }

    pub fn term_knobs(&self) -> Range<usize> {
        0..self.term.len()
    }

    pub fn contin_knobs(&self) -> Range<usize> {
        let start = self.term.len();
        start..start + self.contin.len()
    }

    pub fn disc_knobs(&self) -> Range<usize> {
        let start = self.term.len() + self.contin.len();
        start..start + self.disc.len()
    }

    pub fn bit_knobs(&self) -> Range<usize> {
        let start = self.term.len() + self.contin.len() + self.disc.len();
        start..start + self.nbool
    }

    /// Kind of the logical knob `knob`.
    ///
    /// # Panics
    /// Panics if `knob >= n_knobs()`.
    pub fn knob_kind(&self, knob: usize) -> KnobKind {
        if knob < self.term.len() {
            KnobKind::Term
        } else if self.contin_knobs().contains(&knob) {
            KnobKind::Contin
        } else if self.disc_knobs().contains(&knob) {
            KnobKind::Disc
        } else {
            assert!(knob < self.n_knobs(), "knob {knob} out of range");
            KnobKind::Bit
        }
    }

    pub fn term_raw_range(&self) -> Range<usize> {
        0..self.term.iter().map(|t| t.depth).sum()
    }

    pub fn disc_raw_range(&self) -> Range<usize> {
        let start = self.term_raw_range().end;
        start..start + self.disc.len()
    }

    pub fn bit_raw_range(&self) -> Range<usize> {
        let start = self.disc_raw_range().end;
        start..start + self.nbool
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    /// True if `inst` has exactly this field set's widths.
    pub fn fits(&self, inst: &Instance) -> bool {
        inst.has_widths(self.packed_width, self.contin.len())
    }

    /// All packed knobs zero (term knobs at the root, discs at 0) and
    /// every contin knob at its mean.
    pub fn default_instance(&self) -> Instance {
        let contin = self.contin.iter().map(|c| c.mean).collect();
        Instance::from_parts(vec![0; self.packed_width], contin)
    }

    /// A uniformly random assignment of every knob.
    ///
    /// Contin knobs are placed at the end of a random full-depth
    /// bisection path around their mean.
    pub fn random_instance<R: Rng>(&self, rng: &mut R) -> Instance {
        let mut inst = self.default_instance();
        for idx in 0..self.term.len() {
            let node = rng.random_range(0..self.term_tree(idx).len());
            self.set_term_node(&mut inst, idx, node);
        }
        for (idx, cs) in self.contin.iter().enumerate() {
            let dirs = rng.random::<u64>();
            inst.contin_mut()[idx] = cs.mean + cs.path_offset(dirs, cs.depth);
        }
        for (idx, ds) in self.disc.iter().enumerate() {
            let v = rng.random_range(0..ds.multiplicity);
            self.set_disc(&mut inst, idx, v);
        }
        for idx in 0..self.nbool {
            self.set_bit(&mut inst, idx, rng.random_bool(0.5));
        }
        inst
    }

    // ------------------------------------------------------------------
    // Raw access
    // ------------------------------------------------------------------

    pub fn get_raw(&self, inst: &Instance, raw_idx: usize) -> Disc {
        let f = &self.fields[raw_idx];
        ((inst.packed()[f.word] >> f.shift) & f.mask()) as Disc
    }

    pub fn set_raw(&self, inst: &mut Instance, raw_idx: usize, value: Disc) {
        let f = self.fields[raw_idx];
        let mask = f.mask();
        debug_assert!(
            (value as PackedWord) <= mask,
            "raw value {value} does not fit in {} bits",
            f.width
        );
        let word = &mut inst.packed_mut()[f.word];
        *word = (*word & !(mask << f.shift)) | ((value as PackedWord & mask) << f.shift);
    }

    // ------------------------------------------------------------------
    // Typed access
    // ------------------------------------------------------------------

    pub fn get_bit(&self, inst: &Instance, idx: usize) -> bool {
        debug_assert!(idx < self.nbool);
        self.get_raw(inst, self.bit_raw_range().start + idx) == 1
    }

    pub fn set_bit(&self, inst: &mut Instance, idx: usize, value: bool) {
        debug_assert!(idx < self.nbool);
        self.set_raw(inst, self.bit_raw_range().start + idx, value as Disc);
    }

    pub fn flip_bit(&self, inst: &mut Instance, idx: usize) {
        let v = self.get_bit(inst, idx);
        self.set_bit(inst, idx, !v);
    }

    pub fn get_disc(&self, inst: &Instance, idx: usize) -> Disc {
        self.get_raw(inst, self.disc_raw_range().start + idx)
    }

    pub fn set_disc(&self, inst: &mut Instance, idx: usize, value: Disc) {
        debug_assert!(
            value < self.disc[idx].multiplicity,
            "disc value {value} out of range for multiplicity {}",
            self.disc[idx].multiplicity
        );
        self.set_raw(inst, self.disc_raw_range().start + idx, value);
    }

    pub fn get_contin(&self, inst: &Instance, idx: usize) -> Contin {
        inst.contin()[idx]
    }

    pub fn set_contin(&self, inst: &mut Instance, idx: usize, value: Contin) {
        inst.contin_mut()[idx] = value;
    }

    /// The catalog tree behind term knob `idx`.
    pub fn term_tree(&self, idx: usize) -> &TermTree {
        &self.catalog[self.term[idx].tree]
    }

    /// Walks the term tree of knob `idx`, reading one raw field per level.
    /// A stop code, or a code naming a missing child, ends the walk.
    pub fn get_term_node(&self, inst: &Instance, idx: usize) -> usize {
        let spec = &self.term[idx];
        let tree = self.term_tree(idx);
        let start = self.term_starts[idx];
        let mut node = TermTree::ROOT;
        for level in 0..spec.depth {
            let raw = self.get_raw(inst, start + level);
            if raw == TermSpec::STOP {
                break;
            }
            match tree.child(node, TermSpec::to_child_idx(raw)) {
                Some(child) => node = child,
                None => break,
            }
        }
        node
    }

    /// The term selected by knob `idx`.
    pub fn get_term(&self, inst: &Instance, idx: usize) -> &str {
        self.term_tree(idx).label(self.get_term_node(inst, idx))
    }

    /// Encodes the path to `node` into term knob `idx`.
    pub fn set_term_node(&self, inst: &mut Instance, idx: usize, node: usize) {
        let spec = self.term[idx];
        let path = self.term_tree(idx).path_to(node);
        debug_assert!(path.len() <= spec.depth);
        let start = self.term_starts[idx];
        for level in 0..spec.depth {
            let raw = path
                .get(level)
                .map_or(TermSpec::STOP, |&c| TermSpec::from_child_idx(c));
            self.set_raw(inst, start + level, raw);
        }
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    pub fn bits<'a>(&'a self, inst: &'a Instance) -> impl Iterator<Item = bool> + 'a {
        (0..self.nbool).map(move |i| self.get_bit(inst, i))
    }

    pub fn discs<'a>(&'a self, inst: &'a Instance) -> impl Iterator<Item = Disc> + 'a {
        (0..self.disc.len()).map(move |i| self.get_disc(inst, i))
    }

    pub fn contins<'a>(&'a self, inst: &'a Instance) -> impl Iterator<Item = Contin> + 'a {
        inst.contin().iter().copied()
    }

    pub fn terms<'a>(&'a self, inst: &'a Instance) -> impl Iterator<Item = &'a str> + 'a {
        (0..self.term.len()).map(move |i| self.get_term(inst, i))
    }

    pub fn raws<'a>(&'a self, inst: &'a Instance) -> impl Iterator<Item = Disc> + 'a {
        (0..self.fields.len()).map(move |i| self.get_raw(inst, i))
    }

    // ------------------------------------------------------------------
    // Knob-level operations
    // ------------------------------------------------------------------

    /// True if logical knob `knob` has the same value in `a` and `b`.
    pub fn knob_eq(&self, a: &Instance, b: &Instance, knob: usize) -> bool {
        match self.knob_kind(knob) {
            KnobKind::Term => self.get_term_node(a, knob) == self.get_term_node(b, knob),
            KnobKind::Contin => {
                let i = knob - self.term.len();
                a.contin()[i].to_bits() == b.contin()[i].to_bits()
            }
            KnobKind::Disc => {
                let i = knob - self.disc_knobs().start;
                self.get_disc(a, i) == self.get_disc(b, i)
            }
            KnobKind::Bit => {
                let i = knob - self.bit_knobs().start;
                self.get_bit(a, i) == self.get_bit(b, i)
            }
        }
    }

    /// Copies knob `knob` from `source` into `target`.
    pub fn copy_knob(&self, target: &mut Instance, source: &Instance, knob: usize) {
        match self.knob_kind(knob) {
            KnobKind::Term => {
                let start = self.term_starts[knob];
                for raw_idx in start..start + self.term[knob].depth {
                    self.set_raw(target, raw_idx, self.get_raw(source, raw_idx));
                }
            }
            KnobKind::Contin => {
                let i = knob - self.term.len();
                target.contin_mut()[i] = source.contin()[i];
            }
            KnobKind::Disc => {
                let i = knob - self.disc_knobs().start;
                self.set_disc(target, i, self.get_disc(source, i));
            }
            KnobKind::Bit => {
                let i = knob - self.bit_knobs().start;
                self.set_bit(target, i, self.get_bit(source, i));
            }
        }
    }

    /// Number of knobs whose decoded values differ.
    pub fn knob_distance(&self, a: &Instance, b: &Instance) -> usize {
        (0..self.n_knobs())
            .filter(|&k| !self.knob_eq(a, b, k))
            .count()
    }

    /// Copies into `target` every knob on which `reference` differs
    /// from `base`.
    pub fn merge_instance(&self, target: &mut Instance, base: &Instance, reference: &Instance) {
        for knob in 0..self.n_knobs() {
            if !self.knob_eq(base, reference, knob) {
                self.copy_knob(target, reference, knob);
            }
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Human-readable form: `[#terms|contins discs bits]`.
    pub fn render(&self, inst: &Instance) -> String {
        let mut out = String::from("[");
        for t in self.terms(inst) {
            out.push('#');
            out.push_str(t);
        }
        for c in self.contins(inst) {
            out.push('|');
            out.push_str(&c.to_string());
        }
        for d in self.discs(inst) {
            out.push(' ');
            out.push_str(&d.to_string());
        }
        if self.nbool > 0 {
            out.push(' ');
        }
        for b in self.bits(inst) {
            out.push(if b { '1' } else { '0' });
        }
        out.push(']');
        out
    }

    /// Raw field values, in raw index order.
    pub fn render_raw(&self, inst: &Instance) -> String {
        let raws: Vec<String> = self.raws(inst).map(|r| r.to_string()).collect();
        format!("[{}]", raws.join(""))
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "field_set = {{")?;
        writeln!(
            f,
            "n_term_fields= {}; n_term_raw= {};",
            self.term.len(),
            self.term_raw_range().len()
        )?;
        writeln!(f, "n_contin_fields= {};", self.contin.len())?;
        writeln!(f, "n_disc_fields= {};", self.disc.len())?;
        writeln!(f, "n_bit_fields= {};", self.nbool)?;
        writeln!(f, "packed_width= {};", self.packed_width)?;
        writeln!(f, "fields = {{")?;
        let mut idx = 0;
        for t in &self.term {
            writeln!(
                f,
                "\t{{ idx={idx}; type=term; depth={}; branching={}; }},",
                t.depth, t.branching
            )?;
            idx += 1;
        }
        for c in &self.contin {
            writeln!(
                f,
                "\t{{ idx={idx}; type=contin; mean={}; step={}; expansion={}; depth={}; }},",
                c.mean, c.step_size, c.expansion, c.depth
            )?;
            idx += 1;
        }
        for d in &self.disc {
            writeln!(
                f,
                "\t{{ idx={idx}; type=disc; multiplicity={}; }},",
                d.multiplicity
            )?;
            idx += 1;
        }
        for _ in 0..self.nbool {
            writeln!(f, "\t{{ idx={idx}; type=bit; }},")?;
            idx += 1;
        }
        write!(f, "}}; }};")
    }
}

//! Neighbor generation: exhaustive enumeration and random sampling.

use super::count::{count_neighborhood_size, knob_alternatives};
use crate::representation::{Deme, FieldSet, Instance, KnobKind};
use rand::seq::index;
use rand::Rng;
use std::collections::HashSet;
use tracing::trace;

/// Attempts per requested sample before giving up on finding a new one.
const MAX_SAMPLE_RETRIES: usize = 8;

/// How [`generate_contin_neighbor`] spreads its steps over contin knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContinNeighborMode {
    /// Pick one contin knob and apply every bisection step to it.
    #[default]
    SameIndex,
    /// Apply one bisection step to each of `dist` distinct contin knobs.
    DistinctIndices,
}

/// Sets knob `knob` of `target` to its `alt`-th alternative relative to
/// `center`. `alt` ranges over `0..knob_alternatives(fs, knob)`.
fn apply_alternative(fs: &FieldSet, center: &Instance, target: &mut Instance, knob: usize, alt: usize) {
    match fs.knob_kind(knob) {
        KnobKind::Term => {
            let current = fs.get_term_node(center, knob);
            let node = if alt < current { alt } else { alt + 1 };
            fs.set_term_node(target, knob, node);
        }
        KnobKind::Contin => {
            let idx = knob - fs.contin_knobs().start;
            let offset = fs.contin()[idx].neighbor_offset(alt);
            fs.set_contin(target, idx, fs.get_contin(center, idx) + offset);
        }
        KnobKind::Disc => {
            let idx = knob - fs.disc_knobs().start;
            let current = fs.get_disc(center, idx) as usize;
            let value = if alt < current { alt } else { alt + 1 };
            fs.set_disc(target, idx, value as u32);
        }
        KnobKind::Bit => {
            let idx = knob - fs.bit_knobs().start;
            fs.set_bit(target, idx, !fs.get_bit(center, idx));
        }
    }
}

/// Appends to `out` every instance at distance exactly `dist` from
/// `center`, in lexicographic knob order.
///
/// The number of instances appended equals
/// `count_neighborhood_size(fs, center, dist, usize::MAX)`.
pub fn generate_all_in_neighborhood(
    fs: &FieldSet,
    dist: usize,
    center: &Instance,
    out: &mut Vec<Instance>,
) {
    assert!(fs.fits(center), "center widths do not match the field set");
    let mut work = center.clone();
    generate_from(fs, center, &mut work, dist, 0, out);
}

fn generate_from(
    fs: &FieldSet,
    center: &Instance,
    work: &mut Instance,
    dist: usize,
    start: usize,
    out: &mut Vec<Instance>,
) {
    if dist == 0 {
        out.push(work.clone());
        return;
    }
    let n_knobs = fs.n_knobs();
    if start >= n_knobs || dist > n_knobs - start {
        return;
    }
    for knob in start..=n_knobs - dist {
        for alt in 0..knob_alternatives(fs, knob) {
            apply_alternative(fs, center, work, knob, alt);
            generate_from(fs, center, work, dist - 1, knob + 1, out);
        }
        fs.copy_knob(work, center, knob);
    }
}

/// Appends up to `n` random distinct instances at distance exactly `dist`
/// from `center`.
///
/// Each sample picks `dist` distinct knobs uniformly, then a uniform
/// alternative for each. Duplicates are rejected on a best-effort basis:
/// after a bounded number of retries a slot is left unfilled, so fewer
/// than `n` instances may be appended. Returns the number appended.
pub fn sample_from_neighborhood<R: Rng>(
    fs: &FieldSet,
    dist: usize,
    n: usize,
    center: &Instance,
    out: &mut Vec<Instance>,
    rng: &mut R,
) -> usize {
    assert!(fs.fits(center), "center widths do not match the field set");
    if n == 0 {
        return 0;
    }
    if dist == 0 {
        out.push(center.clone());
        return 1;
    }

    // knobs that can actually change
    let mutable: Vec<usize> = (0..fs.n_knobs())
        .filter(|&k| knob_alternatives(fs, k) > 0)
        .collect();
    if mutable.len() < dist {
        return 0;
    }

    let mut seen: HashSet<Instance> = HashSet::with_capacity(n);
    let mut added = 0;
    for _ in 0..n {
        for _ in 0..MAX_SAMPLE_RETRIES {
            let picks = index::sample(rng, mutable.len(), dist);

            let mut inst = center.clone();
            for p in picks {
                let knob = mutable[p];
                let alt = rng.random_range(0..knob_alternatives(fs, knob));
                apply_alternative(fs, center, &mut inst, knob, alt);
            }
            if seen.insert(inst.clone()) {
                out.push(inst);
                added += 1;
                break;
            }
        }
    }
    if added < n {
        trace!(requested = n, added, dist, "neighborhood sampling hit duplicates");
    }
    added
}

/// Appends about `n_new` instances at distance `dist` from `center` to
/// `deme`, unscored.
///
/// `total` is an estimate of the neighborhood size. When the request is
/// within a factor of two of it, the size is recounted exactly; if the
/// request then covers the whole neighborhood, every neighbor is
/// generated, otherwise `n_new` are sampled. Returns the number of
/// instances appended.
pub fn sample_new_instances<R: Rng>(
    deme: &mut Deme,
    center: &Instance,
    dist: usize,
    total: usize,
    n_new: usize,
    rng: &mut R,
) -> usize {
    let fs = deme.shared_fields();
    let mut total = total;
    if n_new.saturating_mul(2) > total {
        total = count_neighborhood_size(&fs, center, dist, n_new);
    }

    let mut fresh = Vec::with_capacity(n_new.min(total));
    if n_new < total {
        sample_from_neighborhood(&fs, dist, n_new, center, &mut fresh, rng);
    } else {
        generate_all_in_neighborhood(&fs, dist, center, &mut fresh);
    }
    let added = fresh.len();
    deme.reserve(added);
    deme.extend(fresh);
    added
}

/// Returns a copy of `center` with contin knobs moved by `dist` random
/// bisection steps.
///
/// With [`ContinNeighborMode::SameIndex`] one randomly chosen contin knob
/// takes all `dist` steps; with [`ContinNeighborMode::DistinctIndices`]
/// `min(dist, n_contin)` distinct knobs take one step each. Without contin
/// knobs the center is returned unchanged.
pub fn generate_contin_neighbor<R: Rng>(
    fs: &FieldSet,
    center: &Instance,
    dist: usize,
    mode: ContinNeighborMode,
    rng: &mut R,
) -> Instance {
    let mut inst = center.clone();
    let n_contin = fs.n_contin_fields();
    if n_contin == 0 || dist == 0 {
        return inst;
    }
    match mode {
        ContinNeighborMode::SameIndex => {
            let idx = rng.random_range(0..n_contin);
            let spec = &fs.contin()[idx];
            for _ in 0..dist.min(n_contin) {
                let v = spec.bisect(fs.get_contin(&inst, idx), rng);
                fs.set_contin(&mut inst, idx, v);
            }
        }
        ContinNeighborMode::DistinctIndices => {
            for idx in index::sample(rng, n_contin, dist.min(n_contin)) {
                let spec = &fs.contin()[idx];
                let v = spec.bisect(fs.get_contin(&inst, idx), rng);
                fs.set_contin(&mut inst, idx, v);
            }
        }
    }
    inst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighborhood::count_neighborhood_size;
    use crate::random::create_rng;
    use crate::representation::{ContinSpec, DiscSpec, TermCatalog, TermSpec, TermTree};
    use std::sync::Arc;

    fn mixed() -> FieldSet {
        let mut tree = TermTree::new("r");
        let a = tree.add_child(TermTree::ROOT, "a");
        tree.add_child(TermTree::ROOT, "b");
        tree.add_child(a, "c");
        let mut catalog = TermCatalog::new();
        let idx = catalog.add(tree);
        let term = TermSpec::new(&catalog, idx);
        FieldSet::with_catalog(Arc::new(catalog))
            .with_spec(term, 1)
            .with_spec(ContinSpec::new(0.0, 1.0, 2.0, 2), 1)
            .with_spec(DiscSpec::new(3), 2)
            .with_spec(DiscSpec::bit(), 3)
    }

    #[test]
    fn test_three_bits_distance_one() {
        let fs = FieldSet::new().with_spec(DiscSpec::bit(), 3);
        let center = fs.default_instance();
        let mut out = Vec::new();
        generate_all_in_neighborhood(&fs, 1, &center, &mut out);
        let patterns: Vec<Vec<bool>> = out.iter().map(|i| fs.bits(i).collect()).collect();
        assert_eq!(
            patterns,
            vec![
                vec![true, false, false],
                vec![false, true, false],
                vec![false, false, true],
            ]
        );
    }

    #[test]
    fn test_disc_distance_one() {
        let fs = FieldSet::new().with_spec(DiscSpec::new(4), 1);
        let mut center = fs.default_instance();
        fs.set_disc(&mut center, 0, 1);
        let mut out = Vec::new();
        generate_all_in_neighborhood(&fs, 1, &center, &mut out);
        let values: Vec<u32> = out.iter().map(|i| fs.get_disc(i, 0)).collect();
        assert_eq!(values, vec![0, 2, 3]);
    }

    #[test]
    fn test_exhaustive_matches_count_on_mixed() {
        let fs = mixed();
        let mut rng = create_rng(3);
        let center = fs.random_instance(&mut rng);
        for dist in 0..=4 {
            let mut out = Vec::new();
            generate_all_in_neighborhood(&fs, dist, &center, &mut out);
            assert_eq!(
                out.len(),
                count_neighborhood_size(&fs, &center, dist, usize::MAX),
                "dist {dist}"
            );
            let distinct: HashSet<_> = out.iter().collect();
            assert_eq!(distinct.len(), out.len(), "duplicates at dist {dist}");
            for inst in &out {
                assert_eq!(fs.knob_distance(&center, inst), dist);
            }
        }
    }

    #[test]
    fn test_sampling_exact_distance_and_distinct() {
        let fs = mixed();
        let mut rng = create_rng(8);
        let center = fs.default_instance();
        let mut out = Vec::new();
        let added = sample_from_neighborhood(&fs, 2, 30, &center, &mut out, &mut rng);
        assert_eq!(added, out.len());
        assert!(added > 0);
        let distinct: HashSet<_> = out.iter().collect();
        assert_eq!(distinct.len(), out.len());
        for inst in &out {
            assert_eq!(fs.knob_distance(&center, inst), 2);
        }
    }

    #[test]
    fn test_sampling_too_far_adds_nothing() {
        let fs = FieldSet::new().with_spec(DiscSpec::bit(), 2);
        let center = fs.default_instance();
        let mut out = Vec::new();
        let mut rng = create_rng(1);
        assert_eq!(sample_from_neighborhood(&fs, 3, 5, &center, &mut out, &mut rng), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_sample_new_instances_switches_to_exhaustive() {
        let fs = Arc::new(FieldSet::new().with_spec(DiscSpec::bit(), 5));
        let mut deme = Deme::new(Arc::clone(&fs));
        let center = fs.default_instance();
        let mut rng = create_rng(2);
        // request exceeds C(5, 2) = 10 and a bad estimate triggers a recount
        let added = sample_new_instances(&mut deme, &center, 2, 4, 50, &mut rng);
        assert_eq!(added, 10);
        assert_eq!(deme.len(), 10);
    }

    #[test]
    fn test_sample_new_instances_samples_large_neighborhoods() {
        let fs = Arc::new(FieldSet::new().with_spec(DiscSpec::bit(), 40));
        let mut deme = Deme::new(Arc::clone(&fs));
        let center = fs.default_instance();
        let mut rng = create_rng(2);
        let total = count_neighborhood_size(&fs, &center, 3, 1000);
        let added = sample_new_instances(&mut deme, &center, 3, total, 100, &mut rng);
        assert_eq!(added, 100);
        assert_eq!(deme.len(), 100);
    }

    #[test]
    fn test_contin_neighbor_same_index() {
        let fs = FieldSet::new().with_spec(ContinSpec::default(), 4);
        let center = fs.default_instance();
        let mut rng = create_rng(4);
        for _ in 0..20 {
            let inst =
                generate_contin_neighbor(&fs, &center, 3, ContinNeighborMode::SameIndex, &mut rng);
            assert!(fs.knob_distance(&center, &inst) <= 1);
        }
    }

    #[test]
    fn test_contin_neighbor_distinct_indices() {
        let fs = FieldSet::new().with_spec(ContinSpec::default(), 4);
        let center = fs.default_instance();
        let mut rng = create_rng(4);
        let inst = generate_contin_neighbor(
            &fs,
            &center,
            3,
            ContinNeighborMode::DistinctIndices,
            &mut rng,
        );
        assert_eq!(fs.knob_distance(&center, &inst), 3);
    }

    #[test]
    fn test_contin_neighbor_without_contins() {
        let fs = FieldSet::new().with_spec(DiscSpec::bit(), 3);
        let center = fs.default_instance();
        let mut rng = create_rng(0);
        let inst =
            generate_contin_neighbor(&fs, &center, 2, ContinNeighborMode::SameIndex, &mut rng);
        assert_eq!(inst, center);
    }
}

//! Neighborhood size counting.

use crate::representation::{FieldSet, Instance, KnobKind};

/// `C(n, k)`, saturating to `usize::MAX` instead of overflowing.
pub fn safe_binomial_coefficient(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // acc * (n - i) is divisible by (i + 1) at every step
        acc = match acc.checked_mul((n - i) as u128) {
            Some(v) => v / (i as u128 + 1),
            None => return usize::MAX,
        };
        if acc > usize::MAX as u128 {
            return usize::MAX;
        }
    }
    acc as usize
}

/// Number of values knob `knob` can take other than its current one.
pub(crate) fn knob_alternatives(fs: &FieldSet, knob: usize) -> usize {
    match fs.knob_kind(knob) {
        KnobKind::Term => fs.term_tree(knob).len().saturating_sub(1),
        KnobKind::Contin => fs.contin()[knob - fs.contin_knobs().start].neighbor_count(),
        KnobKind::Disc => {
            let spec = &fs.disc()[knob - fs.disc_knobs().start];
            spec.multiplicity as usize - 1
        }
        KnobKind::Bit => 1,
    }
}

/// Number of instances at distance exactly `dist` from `center`.
///
/// See [`count_neighborhood_size_from_index`].
pub fn count_neighborhood_size(
    fs: &FieldSet,
    center: &Instance,
    dist: usize,
    max_count: usize,
) -> usize {
    count_neighborhood_size_from_index(fs, center, dist, 0, max_count)
}

/// Number of instances that differ from `center` in exactly `dist` of the
/// knobs `start..n_knobs`.
///
/// Counting stops as soon as the running total exceeds `max_count`: the
/// result is then `max_count + 1` (saturating). Results up to
/// `max_count` are exact. Trailing bit knobs are counted in closed form
/// as `C(remaining_bits, dist)`.
///
/// The count is built knob by knob from the end of the field set, keeping
/// one entry per remaining distance, so the cost is `O(knobs * dist)` at
/// worst and the stack depth is constant.
pub fn count_neighborhood_size_from_index(
    fs: &FieldSet,
    center: &Instance,
    dist: usize,
    start: usize,
    max_count: usize,
) -> usize {
    debug_assert!(fs.fits(center));
    let n_knobs = fs.n_knobs();
    if dist == 0 {
        return 1;
    }
    if start >= n_knobs || dist > n_knobs - start {
        return 0;
    }
    let cap = max_count.saturating_add(1);

    // by_dist[d]: instances at distance d over the knobs already folded in
    let bit_start = fs.bit_knobs().start.clamp(start, n_knobs);
    let n_bits = n_knobs - bit_start;
    let mut by_dist: Vec<usize> = (0..=dist)
        .map(|d| safe_binomial_coefficient(n_bits, d).min(cap))
        .collect();
    if by_dist[dist] >= cap {
        return cap;
    }

    for knob in (start..bit_start).rev() {
        let alternatives = knob_alternatives(fs, knob);
        if alternatives == 0 {
            continue;
        }
        // descending so by_dist[d - 1] still holds the previous suffix
        for d in (1..=dist).rev() {
            let moved = alternatives.saturating_mul(by_dist[d - 1]);
            by_dist[d] = by_dist[d].saturating_add(moved).min(cap);
        }
        // adding knobs never shrinks a count
        if by_dist[dist] >= cap {
            return cap;
        }
    }
    by_dist[dist]
}

/// Sum of the neighborhood sizes at distances `1..=max_dist`, clamped the
/// same way as [`count_neighborhood_size`].
pub fn estimate_neighborhood_size(
    fs: &FieldSet,
    center: &Instance,
    max_dist: usize,
    max_count: usize,
) -> usize {
    let cap = max_count.saturating_add(1);
    let mut total = 0usize;
    for dist in 1..=max_dist {
        total = total.saturating_add(count_neighborhood_size(fs, center, dist, max_count));
        if total >= cap {
            return cap;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::representation::{ContinSpec, DiscSpec, TermCatalog, TermSpec, TermTree};
    use std::sync::Arc;

    #[test]
    fn test_binomial_small() {
        assert_eq!(safe_binomial_coefficient(5, 0), 1);
        assert_eq!(safe_binomial_coefficient(5, 2), 10);
        assert_eq!(safe_binomial_coefficient(5, 5), 1);
        assert_eq!(safe_binomial_coefficient(3, 4), 0);
        assert_eq!(safe_binomial_coefficient(64, 32), 1_832_624_140_942_590_534);
    }

    #[test]
    fn test_binomial_saturates() {
        assert_eq!(safe_binomial_coefficient(10_000, 5_000), usize::MAX);
        assert_eq!(safe_binomial_coefficient(200, 100), usize::MAX);
    }

    #[test]
    fn test_three_bits() {
        let fs = FieldSet::new().with_spec(DiscSpec::bit(), 3);
        let center = fs.default_instance();
        assert_eq!(count_neighborhood_size(&fs, &center, 0, 100), 1);
        assert_eq!(count_neighborhood_size(&fs, &center, 1, 100), 3);
        assert_eq!(count_neighborhood_size(&fs, &center, 2, 100), 3);
        assert_eq!(count_neighborhood_size(&fs, &center, 3, 100), 1);
        assert_eq!(count_neighborhood_size(&fs, &center, 4, 100), 0);
    }

    #[test]
    fn test_single_disc() {
        let fs = FieldSet::new().with_spec(DiscSpec::new(4), 1);
        let center = fs.default_instance();
        assert_eq!(count_neighborhood_size(&fs, &center, 1, 100), 3);
    }

    #[test]
    fn test_mixed_disc_and_bits() {
        // 2 discs of multiplicity 3 and 4 bits
        let fs = FieldSet::new()
            .with_spec(DiscSpec::new(3), 2)
            .with_spec(DiscSpec::bit(), 4);
        let center = fs.default_instance();
        // dist 1: 2 + 2 + 4
        assert_eq!(count_neighborhood_size(&fs, &center, 1, 1000), 8);
        // dist 2: both discs 2*2, one disc + one bit 2*2*4, two bits C(4,2)
        assert_eq!(count_neighborhood_size(&fs, &center, 2, 1000), 4 + 16 + 6);
    }

    #[test]
    fn test_contin_paths() {
        let fs = FieldSet::new().with_spec(ContinSpec::new(0.0, 1.0, 2.0, 3), 2);
        let center = fs.default_instance();
        // 2 + 4 + 8 offsets per knob
        assert_eq!(count_neighborhood_size(&fs, &center, 1, 1000), 28);
        assert_eq!(count_neighborhood_size(&fs, &center, 2, 1000), 14 * 14);
    }

    #[test]
    fn test_term_counts_other_nodes() {
        let mut tree = TermTree::new("r");
        let a = tree.add_child(TermTree::ROOT, "a");
        tree.add_child(a, "b");
        let mut catalog = TermCatalog::new();
        let idx = catalog.add(tree);
        let term = TermSpec::new(&catalog, idx);
        let fs = FieldSet::with_catalog(Arc::new(catalog))
            .with_spec(term, 1)
            .with_spec(DiscSpec::bit(), 1);
        let center = fs.default_instance();
        assert_eq!(count_neighborhood_size(&fs, &center, 1, 100), 3);
        assert_eq!(count_neighborhood_size(&fs, &center, 2, 100), 2);
    }

    #[test]
    fn test_max_count_clamps() {
        let fs = FieldSet::new().with_spec(DiscSpec::new(10), 40);
        let center = fs.default_instance();
        assert_eq!(count_neighborhood_size(&fs, &center, 5, 1000), 1001);
        // 9^5 * C(40, 5)
        assert_eq!(
            count_neighborhood_size(&fs, &center, 5, usize::MAX),
            38_854_714_392
        );
    }

    #[test]
    fn test_huge_bit_neighborhood_does_not_overflow() {
        let fs = FieldSet::new().with_spec(DiscSpec::bit(), 10_000);
        let center = fs.default_instance();
        assert_eq!(
            count_neighborhood_size(&fs, &center, 5_000, usize::MAX),
            usize::MAX
        );
    }

    #[test]
    fn test_many_disc_knobs() {
        let fs = FieldSet::new().with_spec(DiscSpec::new(3), 100_000);
        let center = fs.default_instance();
        assert_eq!(count_neighborhood_size(&fs, &center, 1, 1000), 1001);
        assert_eq!(count_neighborhood_size(&fs, &center, 2, 1000), 1001);
        assert_eq!(count_neighborhood_size(&fs, &center, 1, usize::MAX), 200_000);
        // 2^2 * C(100_000, 2)
        assert_eq!(
            count_neighborhood_size(&fs, &center, 2, usize::MAX),
            19_999_800_000
        );
    }

    #[test]
    fn test_many_contin_knobs() {
        let spec = ContinSpec::default();
        let fs = FieldSet::new().with_spec(spec, 50_000);
        let center = fs.default_instance();
        assert_eq!(count_neighborhood_size(&fs, &center, 1, 1000), 1001);
        assert_eq!(count_neighborhood_size(&fs, &center, 2, 1000), 1001);
        assert_eq!(
            count_neighborhood_size(&fs, &center, 1, usize::MAX),
            50_000 * spec.neighbor_count()
        );
    }

    #[test]
    fn test_from_index_skips_prefix() {
        let fs = FieldSet::new()
            .with_spec(DiscSpec::new(5), 1)
            .with_spec(DiscSpec::bit(), 3);
        let center = fs.default_instance();
        assert_eq!(count_neighborhood_size_from_index(&fs, &center, 1, 1, 100), 3);
        assert_eq!(count_neighborhood_size_from_index(&fs, &center, 1, 0, 100), 7);
    }

    #[test]
    fn test_estimate_sums_distances() {
        let fs = FieldSet::new().with_spec(DiscSpec::bit(), 4);
        let center = fs.default_instance();
        assert_eq!(estimate_neighborhood_size(&fs, &center, 2, 1000), 4 + 6);
        assert_eq!(estimate_neighborhood_size(&fs, &center, 4, 5), 6);
    }
}

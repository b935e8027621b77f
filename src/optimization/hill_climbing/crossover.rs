//! Simplex crossover of top-scoring instances.
//!
//! All instances of a sample were derived from one base instance. The
//! best of them is combined with the changes (relative to the base) of
//! one, two or three other good instances, yielding points on the 1-, 2-
//! and 3-dimensional simplices spanned by the top scorers.

use crate::representation::{FieldSet, Instance, ScoredInstance};

/// Indices of `sample` ordered best-first.
fn ranked(sample: &[ScoredInstance]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..sample.len()).collect();
    order.sort_by(|&a, &b| sample[b].score.cmp(&sample[a].score));
    order
}

/// Copy of the top scorer with the changes of every `others` entry
/// merged in.
fn cross(
    fs: &FieldSet,
    sample: &[ScoredInstance],
    base: &Instance,
    top: usize,
    others: &[usize],
) -> Instance {
    let mut inst = sample[top].instance.clone();
    for &o in others {
        fs.merge_instance(&mut inst, base, &sample[o].instance);
    }
    inst
}

/// Crosses the top scorer with each of the next best, one at a time.
///
/// Makes at most `min(num_to_make, sample.len() - 1)` instances. Returns
/// the number appended to `out`.
pub fn cross_top_one(
    fs: &FieldSet,
    sample: &[ScoredInstance],
    base: &Instance,
    num_to_make: usize,
    out: &mut Vec<Instance>,
) -> usize {
    if sample.len() < 2 {
        return 0;
    }
    let order = ranked(sample);
    let n = num_to_make.min(sample.len() - 1);
    for &other in &order[1..=n] {
        out.push(cross(fs, sample, base, order[0], &[other]));
    }
    n
}

/// Crosses the top scorer with pairs of the next best.
///
/// Returns the number appended to `out`.
pub fn cross_top_two(
    fs: &FieldSet,
    sample: &[ScoredInstance],
    base: &Instance,
    num_to_make: usize,
    out: &mut Vec<Instance>,
) -> usize {
    if sample.len() < 3 {
        return 0;
    }
    let order = ranked(sample);
    let mut made = 0;
    'outer: for i in 2..order.len() {
        for j in 1..i {
            if made >= num_to_make {
                break 'outer;
            }
            out.push(cross(fs, sample, base, order[0], &[order[j], order[i]]));
            made += 1;
        }
    }
    made
}

/// Crosses the top scorer with triples of the next best.
///
/// Returns the number appended to `out`.
pub fn cross_top_three(
    fs: &FieldSet,
    sample: &[ScoredInstance],
    base: &Instance,
    num_to_make: usize,
    out: &mut Vec<Instance>,
) -> usize {
    if sample.len() < 4 {
        return 0;
    }
    let order = ranked(sample);
    let mut made = 0;
    'outer: for i in 3..order.len() {
        for j in 2..i {
            for k in 1..j {
                if made >= num_to_make {
                    break 'outer;
                }
                out.push(cross(
                    fs,
                    sample,
                    base,
                    order[0],
                    &[order[k], order[j], order[i]],
                ));
                made += 1;
            }
        }
    }
    made
}

/// Chains the three crossovers, each making up to `pop_size / 3`
/// instances. Returns the number appended to `out`.
pub fn crossover(
    fs: &FieldSet,
    sample: &[ScoredInstance],
    base: &Instance,
    pop_size: usize,
    out: &mut Vec<Instance>,
) -> usize {
    let share = pop_size / 3;
    cross_top_one(fs, sample, base, share, out)
        + cross_top_two(fs, sample, base, share, out)
        + cross_top_three(fs, sample, base, share, out)
}

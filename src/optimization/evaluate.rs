//! Batch scoring.

use crate::representation::{FieldSet, ScoredInstance};
use crate::scoring::Scorer;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Scores every entry of `batch`.
///
/// With `parallel` set and the `parallel` feature enabled the batch is
/// spread over the rayon pool. All scores are written before this returns.
#[cfg_attr(not(feature = "parallel"), allow(unused_variables))]
pub(crate) fn score_batch<S>(fields: &FieldSet, batch: &mut [ScoredInstance], scorer: &S, parallel: bool)
where
    S: Scorer + ?Sized,
{
    #[cfg(feature = "parallel")]
    if parallel {
        batch.par_iter_mut().for_each(|entry| {
            entry.score = scorer.score(fields, &entry.instance);
        });
        return;
    }

    for entry in batch.iter_mut() {
        entry.score = scorer.score(fields, &entry.instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::representation::{DiscSpec, Instance};
    use crate::scoring::CompositeScore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_scores_every_entry() {
        let fs = FieldSet::new().with_spec(DiscSpec::new(8), 1);
        let mut batch: Vec<ScoredInstance> = (0..8)
            .map(|v| {
                let mut inst = fs.default_instance();
                fs.set_disc(&mut inst, 0, v);
                ScoredInstance::unscored(inst)
            })
            .collect();

        let calls = AtomicUsize::new(0);
        let scorer = |fs: &FieldSet, inst: &Instance| {
            calls.fetch_add(1, Ordering::Relaxed);
            CompositeScore::from_raw(fs.get_disc(inst, 0) as f64)
        };

        for parallel in [false, true] {
            calls.store(0, Ordering::Relaxed);
            score_batch(&fs, &mut batch, &scorer, parallel);
            assert_eq!(calls.load(Ordering::Relaxed), 8);
            for (v, entry) in batch.iter().enumerate() {
                assert_eq!(entry.score.raw, v as f64);
            }
        }
    }
}

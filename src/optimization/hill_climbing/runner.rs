//! Hill-climbing loop.
//!
//! The climber keeps a center instance. Each step scores a batch of
//! neighbors of the center (or crossovers of the previous step's best
//! neighbors) and recenters on the best of them if it beats the center.

use super::config::HcConfig;
use super::crossover::crossover;
use crate::error::ConfigError;
use crate::neighborhood::{count_neighborhood_size, sample_new_instances};
use crate::optimization::evaluate::score_batch;
use crate::optimization::resize::DemeTrimmer;
use crate::optimization::stats::RunTracker;
use crate::optimization::{OptimConfig, Optimizer, SearchStats, Termination};
use crate::representation::{Deme, FieldSet, Instance, ScoredInstance};
use crate::scoring::{CompositeScore, Scorer};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Result of one neighborhood step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// The center moved to a better instance.
    Improved,
    /// Instances were scored but none beat the center.
    Flat,
    /// Nothing left to score at the current distance.
    Empty,
}

/// Per-call hill-climbing state, shared with the hybrid optimizer.
pub(crate) struct Climber<'a, S: Scorer + ?Sized> {
    fs: Arc<FieldSet>,
    hc: &'a HcConfig,
    optim: &'a OptimConfig,
    scorer: &'a S,
    trimmer: DemeTrimmer,
    pub(crate) tracker: RunTracker,
    pub(crate) center: Instance,
    pub(crate) center_score: CompositeScore,
    pub(crate) distance: usize,
    prev_sample: Option<(Vec<ScoredInstance>, Instance)>,
    already_xover: bool,
}

impl<'a, S: Scorer + ?Sized> Climber<'a, S> {
    pub(crate) fn new(
        deme: &Deme,
        init: Option<&Instance>,
        scorer: &'a S,
        hc: &'a HcConfig,
        optim: &'a OptimConfig,
        max_evals: usize,
        max_time: Option<Duration>,
    ) -> Self {
        let fs = deme.shared_fields();
        let center = init.cloned().unwrap_or_else(|| fs.default_instance());
        assert!(fs.fits(&center), "initial instance widths do not match the field set");
        Self {
            fs,
            hc,
            optim,
            scorer,
            trimmer: DemeTrimmer::new(optim.resize.clone()),
            tracker: RunTracker::new(optim, max_evals, max_time),
            center,
            center_score: CompositeScore::worst(),
            distance: 1,
            prev_sample: None,
            already_xover: false,
        }
    }

    pub(crate) fn fields(&self) -> &Arc<FieldSet> {
        &self.fs
    }

    /// Scores the center alone as the first iteration.
    pub(crate) fn score_center(&mut self, deme: &mut Deme) {
        deme.push(self.center.clone());
        let start = deme.len() - 1;
        self.evaluate_tail(deme, start);
        self.center_score = deme[start].score;
        self.tracker.end_iteration(true);
        debug!(score = %self.center_score, "scored initial center");
    }

    /// Scores `deme[start..]`, recording the batch, and recenters on its
    /// best entry if that beats the center. Returns true on improvement.
    pub(crate) fn evaluate_tail(&mut self, deme: &mut Deme, start: usize) -> bool {
        let batch = &mut deme.as_mut_slice()[start..];
        score_batch(&self.fs, batch, self.scorer, self.optim.parallel);
        self.tracker.record_batch(batch.iter().map(|e| &e.score));

        let best = batch
            .iter()
            .max_by(|a, b| a.score.cmp(&b.score))
            .filter(|e| e.score > self.center_score);
        match best {
            Some(entry) => {
                self.center = entry.instance.clone();
                self.center_score = entry.score;
                true
            }
            None => false,
        }
    }

    /// Number of neighbors to score at the current distance.
    fn n_new_instances(&self, total: usize) -> usize {
        let by_fraction = (self.hc.fraction_of_nn * total as f64).ceil();
        let by_fraction = if by_fraction >= usize::MAX as f64 {
            usize::MAX
        } else {
            by_fraction as usize
        };
        self.tracker
            .remaining_evals()
            .min(self.hc.max_nn_evals)
            .min(by_fraction)
            .max(1)
    }

    /// Scores one batch around the center. Closes the iteration.
    pub(crate) fn step<R: Rng>(&mut self, deme: &mut Deme, rng: &mut R) -> Step {
        // large enough to tell whether crossover applies
        let count_cap = if self.hc.crossover {
            self.hc.max_nn_evals.max(self.hc.crossover_min_neighbors)
        } else {
            self.hc.max_nn_evals
        };
        let total = count_neighborhood_size(&self.fs, &self.center, self.distance, count_cap);
        let start = deme.len();
        let old_center = self.center.clone();

        let use_crossover = self.hc.crossover
            && self.tracker.iterations >= 2
            && total > self.hc.crossover_min_neighbors
            && !self.already_xover
            && self.prev_sample.is_some();

        let mut crossed = false;
        if use_crossover {
            let mut fresh = Vec::new();
            if let Some((sample, base)) = &self.prev_sample {
                crossover(&self.fs, sample, base, self.hc.crossover_pop_size, &mut fresh);
            }
            fresh.truncate(self.tracker.remaining_evals());
            crossed = !fresh.is_empty();
            deme.extend(fresh);
        }
        if !crossed && total > 0 {
            let n_new = self.n_new_instances(total);
            sample_new_instances(deme, &self.center, self.distance, total, n_new, rng);
        }
        self.already_xover = crossed;

        let added = deme.len() - start;
        if added == 0 {
            return Step::Empty;
        }

        let improved = self.evaluate_tail(deme, start);
        self.tracker.end_iteration(improved);
        debug!(
            iteration = self.tracker.iterations,
            distance = self.distance,
            neighbors = total,
            scored = added,
            crossover = crossed,
            improved,
            best = %self.center_score,
            "hill-climbing step"
        );

        if improved {
            self.prev_sample = Some((deme.as_slice()[start..].to_vec(), old_center));
            self.distance = 1;
            self.already_xover = false;
            Step::Improved
        } else {
            Step::Flat
        }
    }

    /// Moves to the next distance after a non-improving step. Returns
    /// false at a hilltop.
    pub(crate) fn widen(&mut self) -> bool {
        if self.already_xover {
            // crossover missed: sample the same neighborhood next
            return true;
        }
        if self.hc.widen_search
            && self.distance < self.hc.max_dist
            && self.distance < self.fs.n_knobs()
        {
            self.distance += 1;
            true
        } else {
            false
        }
    }

    /// Resumes at distance 1 after the center moved outside a neighborhood
    /// step.
    pub(crate) fn restart(&mut self) {
        self.distance = 1;
        self.prev_sample = None;
        self.already_xover = false;
    }

    pub(crate) fn trim(&self, deme: &mut Deme) {
        self.trimmer.resize_deme(deme, self.center_score.penalized());
    }

    pub(crate) fn finish(self, termination: Termination) -> SearchStats {
        let stats = self.tracker.finish(termination);
        info!(
            evals = stats.evals,
            iterations = stats.iterations,
            termination = %stats.termination,
            best = %self.center_score,
            "hill-climbing done"
        );
        stats
    }
}

/// Local search by repeated neighborhood sampling around the best
/// instance found so far.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use moses_optim::optimization::{Optimizer, OptimConfig};
/// use moses_optim::optimization::hill_climbing::{HcConfig, HillClimbing};
/// use moses_optim::representation::{Deme, DiscSpec, FieldSet, Instance};
/// use moses_optim::scoring::CompositeScore;
/// use moses_optim::random::create_rng;
///
/// let fs = Arc::new(FieldSet::new().with_spec(DiscSpec::bit(), 8));
/// let onemax = |fs: &FieldSet, inst: &Instance| {
///     CompositeScore::from_raw(fs.bits(inst).filter(|&b| b).count() as f64)
/// };
/// let hc = HillClimbing::new(OptimConfig::default().with_target_score(8.0), HcConfig::default())
///     .unwrap();
/// let mut deme = Deme::new(fs);
/// let stats = hc.search(&mut deme, None, &onemax, 1000, None, &mut create_rng(1));
/// assert_eq!(stats.best_score.map(|s| s.raw), Some(8.0));
/// ```
#[derive(Debug, Clone)]
pub struct HillClimbing {
    optim: OptimConfig,
    hc: HcConfig,
}

impl HillClimbing {
    pub fn new(optim: OptimConfig, hc: HcConfig) -> Result<Self, ConfigError> {
        optim.validate()?;
        hc.validate()?;
        Ok(Self { optim, hc })
    }

    pub fn hc_config(&self) -> &HcConfig {
        &self.hc
    }
}

impl Optimizer for HillClimbing {
    fn config(&self) -> &OptimConfig {
        &self.optim
    }

    fn search<S, R>(
        &self,
        deme: &mut Deme,
        init: Option<&Instance>,
        scorer: &S,
        max_evals: usize,
        max_time: Option<Duration>,
        rng: &mut R,
    ) -> SearchStats
    where
        S: Scorer + ?Sized,
        R: Rng,
    {
        deme.clear();
        let mut climber = Climber::new(deme, init, scorer, &self.hc, &self.optim, max_evals, max_time);
        if let Some(t) = climber.tracker.check() {
            return climber.finish(t);
        }

        climber.score_center(deme);
        loop {
            if let Some(t) = climber.tracker.check() {
                return climber.finish(t);
            }
            match climber.step(deme, rng) {
                Step::Improved => {
                    climber.trim(deme);
                    if self.hc.single_step {
                        if let Some(t) = climber.tracker.check() {
                            return climber.finish(t);
                        }
                        return climber.finish(Termination::Converged);
                    }
                }
                Step::Flat | Step::Empty => {
                    climber.trim(deme);
                    if !climber.widen() {
                        if let Some(t) = climber.tracker.check() {
                            return climber.finish(t);
                        }
                        debug!(distance = climber.distance, "reached a hilltop");
                        return climber.finish(Termination::Converged);
                    }
                }
            }
        }
    }
}

//! Run statistics and termination tracking.

use super::config::OptimConfig;
use crate::scoring::CompositeScore;
use std::fmt;
use std::time::{Duration, Instant};

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Termination {
    /// No improvement for more than `max_stagnation` iterations, or a
    /// local optimum that cannot be left.
    Converged,
    /// The evaluation budget is spent.
    OverBudget,
    /// The time budget is spent.
    OverTime,
    /// The best raw score reached the target.
    TargetScoreReached,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::Converged => "converged",
            Termination::OverBudget => "over budget",
            Termination::OverTime => "over time",
            Termination::TargetScoreReached => "target score reached",
        };
        f.write_str(s)
    }
}

/// Outcome of one `search` call.
#[derive(Debug, Clone)]
pub struct SearchStats {
    /// Scorer calls made.
    pub evals: usize,

    /// Value of `evals` when the best score was found.
    pub evals_at_best: usize,

    /// Number of times the best score improved.
    pub improvements: usize,

    /// Iterations (scored batches) completed.
    pub iterations: usize,

    pub termination: Termination,

    /// Best score seen, if anything was scored.
    pub best_score: Option<CompositeScore>,

    pub elapsed: Duration,

    /// Best penalized score at the end of each iteration.
    pub score_history: Vec<f64>,
}

/// Mutable per-call state shared by all optimizers: budgets, best score,
/// stagnation counter.
#[derive(Debug)]
pub(crate) struct RunTracker {
    start: Instant,
    max_evals: usize,
    max_time: Option<Duration>,
    target_score: f64,
    max_stagnation: usize,

    pub(crate) evals: usize,
    pub(crate) evals_at_best: usize,
    pub(crate) improvements: usize,
    pub(crate) iterations: usize,
    pub(crate) stagnation: usize,
    best: Option<CompositeScore>,
    history: Vec<f64>,
}

impl RunTracker {
    pub(crate) fn new(config: &OptimConfig, max_evals: usize, max_time: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            max_evals,
            max_time,
            target_score: config.target_score,
            max_stagnation: config.max_stagnation,
            evals: 0,
            evals_at_best: 0,
            improvements: 0,
            iterations: 0,
            stagnation: 0,
            best: None,
            history: Vec::new(),
        }
    }

    pub(crate) fn remaining_evals(&self) -> usize {
        self.max_evals.saturating_sub(self.evals)
    }

    pub(crate) fn best(&self) -> Option<CompositeScore> {
        self.best
    }

    /// Records a scored batch. Returns true if any score in it beat the
    /// best so far.
    pub(crate) fn record_batch<'a, I>(&mut self, scores: I) -> bool
    where
        I: IntoIterator<Item = &'a CompositeScore>,
    {
        let mut improved = false;
        for score in scores {
            self.evals += 1;
            if self.best.map_or(true, |best| *score > best) {
                self.best = Some(*score);
                self.evals_at_best = self.evals;
                self.improvements += 1;
                improved = true;
            }
        }
        improved
    }

    /// Closes one iteration.
    pub(crate) fn end_iteration(&mut self, improved: bool) {
        self.iterations += 1;
        if improved {
            self.stagnation = 0;
        } else {
            self.stagnation += 1;
        }
        self.history.push(
            self.best
                .map_or(f64::NEG_INFINITY, |b| b.penalized()),
        );
    }

    /// Termination checks, first match wins.
    pub(crate) fn check(&self) -> Option<Termination> {
        if self.evals >= self.max_evals {
            return Some(Termination::OverBudget);
        }
        if self.max_time.is_some_and(|t| self.start.elapsed() >= t) {
            return Some(Termination::OverTime);
        }
        if self.best.is_some_and(|b| b.raw >= self.target_score) {
            return Some(Termination::TargetScoreReached);
        }
        if self.stagnation > self.max_stagnation {
            return Some(Termination::Converged);
        }
        None
    }

    pub(crate) fn finish(self, termination: Termination) -> SearchStats {
        SearchStats {
            evals: self.evals,
            evals_at_best: self.evals_at_best,
            improvements: self.improvements,
            iterations: self.iterations,
            termination,
            best_score: self.best,
            elapsed: self.start.elapsed(),
            score_history: self.history,
        }
    }
}

//! Local-search optimizers over packed instances.
//!
//! Every optimizer implements [`Optimizer::search`]: given a deme, an
//! optional starting instance, a scorer and an evaluation/time budget, it
//! fills the deme with scored instances and reports [`SearchStats`].
//!
//! One iteration scores one batch of instances. Batches may be scored in
//! parallel; the deme and all run state are only touched between batches.
//! After each batch the run stops on the first matching condition:
//!
//! 1. evaluation budget spent ([`Termination::OverBudget`])
//! 2. time budget spent ([`Termination::OverTime`])
//! 3. best raw score at or above the target ([`Termination::TargetScoreReached`])
//! 4. no improvement for more than `max_stagnation` iterations
//!    ([`Termination::Converged`])
//!
//! # Optimizers
//!
//! - [`hill_climbing`]: neighborhood sampling around the best instance,
//!   with simplex crossover of the best neighbors
//! - [`particle_swarm`]: a swarm over all knob kinds with per-kind update
//!   rules
//! - [`hybrid`]: hill-climbing that refines continuous knobs with a
//!   particle-swarm phase when a neighborhood gives no improvement
//!
//! # References
//!
//! - Looks (2006), "Competent Program Evolution"
//! - Kennedy & Eberhart (1995), "Particle Swarm Optimization"
//! - Clerc & Kennedy (2002), "The particle swarm: explosion, stability, and
//!   convergence in a multidimensional complex space"

mod any;
mod config;
mod evaluate;
mod resize;
mod stats;

pub mod hill_climbing;
pub mod hybrid;
pub mod particle_swarm;

pub use any::{AnyOptimizer, OptimAlgorithm};
pub use config::OptimConfig;
pub use resize::{DemeTrimmer, ResizeConfig};
pub use stats::{SearchStats, Termination};

use crate::random::rng_from_seed;
use crate::representation::{Deme, Instance};
use crate::scoring::Scorer;
use rand::Rng;
use std::time::Duration;

/// A search strategy over the instances of a deme's field set.
pub trait Optimizer {
    /// Parameters shared by all optimizers.
    fn config(&self) -> &OptimConfig;

    /// Searches from `init` (or the field set's default instance) until a
    /// termination condition fires.
    ///
    /// The deme is cleared first and holds the scored instances on return.
    /// At most `max_evals` scorer calls are made; with `max_evals == 0`
    /// the scorer is never called and the run ends `OverBudget`.
    ///
    /// # Panics
    /// Panics if `init` does not have the widths of the deme's field set.
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
        R: Rng;

    /// [`search`](Self::search) with a generator seeded from
    /// [`OptimConfig::seed`].
    fn run<S>(
        &self,
        deme: &mut Deme,
        init: Option<&Instance>,
        scorer: &S,
        max_evals: usize,
        max_time: Option<Duration>,
    ) -> SearchStats
    where
        S: Scorer + ?Sized,
    {
        let mut rng = rng_from_seed(self.config().seed);
        self.search(deme, init, scorer, max_evals, max_time, &mut rng)
    }
}

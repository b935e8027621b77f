//! Particle-swarm loop.

use super::config::PsConfig;
use super::update::{Particle, SwarmRules};
use crate::error::ConfigError;
use crate::optimization::evaluate::score_batch;
use crate::optimization::stats::RunTracker;
use crate::optimization::{OptimConfig, Optimizer, SearchStats, Termination};
use crate::representation::{Deme, Instance, ScoredInstance};
use crate::scoring::{CompositeScore, Scorer};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Global-best particle swarm over bit, disc and contin knobs.
///
/// Each iteration scores every particle's position as one batch, updates
/// the personal and global bests, then moves every particle. On return the
/// deme holds each particle's personal best.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use moses_optim::optimization::{Optimizer, OptimConfig};
/// use moses_optim::optimization::particle_swarm::{ParticleSwarm, PsConfig};
/// use moses_optim::representation::{ContinSpec, Deme, FieldSet, Instance};
/// use moses_optim::scoring::CompositeScore;
/// use moses_optim::random::create_rng;
///
/// let fs = Arc::new(FieldSet::new().with_spec(ContinSpec::default(), 2));
/// let sphere = |fs: &FieldSet, inst: &Instance| {
///     CompositeScore::from_raw(-fs.contins(inst).map(|x| x * x).sum::<f64>())
/// };
/// let pso = ParticleSwarm::new(OptimConfig::default(), PsConfig::default()).unwrap();
/// let mut deme = Deme::new(fs);
/// let stats = pso.search(&mut deme, None, &sphere, 2000, None, &mut create_rng(7));
/// assert!(stats.evals <= 2000);
/// assert!(deme.len() <= 50);
/// ```
#[derive(Debug, Clone)]
pub struct ParticleSwarm {
    optim: OptimConfig,
    ps: PsConfig,
}

impl ParticleSwarm {
    pub fn new(optim: OptimConfig, ps: PsConfig) -> Result<Self, ConfigError> {
        optim.validate()?;
        ps.validate()?;
        Ok(Self { optim, ps })
    }

    pub fn ps_config(&self) -> &PsConfig {
        &self.ps
    }
}

impl Optimizer for ParticleSwarm {
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
        let fs = deme.shared_fields();
        let base = init.cloned().unwrap_or_else(|| fs.default_instance());
        assert!(fs.fits(&base), "initial instance widths do not match the field set");

        let mut tracker = RunTracker::new(&self.optim, max_evals, max_time);
        if let Some(t) = tracker.check() {
            return finish(tracker, t);
        }

        let rules = SwarmRules::new(&fs, &self.ps);
        let swarm_size = self.ps.swarm_size(rules.dims(), max_evals);
        let mut swarm: Vec<Particle> = Vec::with_capacity(swarm_size);
        if init.is_some() {
            swarm.push(rules.particle_at(base.clone(), rng));
        }
        while swarm.len() < swarm_size {
            swarm.push(rules.random_particle(&base, rng));
        }
        debug!(swarm_size, dims = rules.dims(), "initialized swarm");

        let mut global = base;
        let mut global_shadow = swarm[0].shadow.clone();
        let mut global_score = CompositeScore::worst();

        let termination = loop {
            let n = swarm.len().min(tracker.remaining_evals());
            let mut batch: Vec<ScoredInstance> = swarm[..n]
                .iter()
                .map(|p| ScoredInstance::unscored(p.position.clone()))
                .collect();
            score_batch(&fs, &mut batch, scorer, self.optim.parallel);
            let improved = tracker.record_batch(batch.iter().map(|e| &e.score));

            for (particle, entry) in swarm.iter_mut().zip(&batch) {
                particle.record(entry.score);
                if entry.score > global_score {
                    global.clone_from(&particle.position);
                    global_shadow.clone_from(&particle.shadow);
                    global_score = entry.score;
                }
            }
            tracker.end_iteration(improved);
            debug!(
                iteration = tracker.iterations,
                evals = tracker.evals,
                improved,
                best = %global_score,
                "particle-swarm iteration"
            );

            if let Some(t) = tracker.check() {
                break t;
            }
            for particle in swarm.iter_mut() {
                rules.update(particle, &global, &global_shadow, rng);
            }
        };

        for particle in swarm {
            deme.push_scored(ScoredInstance::new(particle.best, particle.best_score));
        }
        finish(tracker, termination)
    }
}

fn finish(tracker: RunTracker, termination: Termination) -> SearchStats {
    let stats = tracker.finish(termination);
    info!(
        evals = stats.evals,
        iterations = stats.iterations,
        termination = %stats.termination,
        best = stats.best_score.map_or(f64::NEG_INFINITY, |s| s.penalized()),
        "particle-swarm done"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use crate::representation::{ContinSpec, DiscSpec, FieldSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sphere(fs: &FieldSet, inst: &Instance) -> CompositeScore {
        CompositeScore::from_raw(-fs.contins(inst).map(|x| (x - 3.0) * (x - 3.0)).sum::<f64>())
    }

    fn pso() -> ParticleSwarm {
        ParticleSwarm::new(OptimConfig::default(), PsConfig::default()).unwrap()
    }

    #[test]
    fn test_zero_budget() {
        let calls = AtomicUsize::new(0);
        let scorer = |fs: &FieldSet, inst: &Instance| {
            calls.fetch_add(1, Ordering::Relaxed);
            sphere(fs, inst)
        };
        let mut deme = Deme::new(Arc::new(FieldSet::new().with_spec(ContinSpec::default(), 2)));
        let stats = pso().search(&mut deme, None, &scorer, 0, None, &mut create_rng(0));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert_eq!(stats.termination, Termination::OverBudget);
        assert!(deme.is_empty());
    }

    #[test]
    fn test_budget_is_exact() {
        let mut deme = Deme::new(Arc::new(FieldSet::new().with_spec(ContinSpec::default(), 4)));
        let stats = pso().search(&mut deme, None, &sphere, 95, None, &mut create_rng(1));
        assert_eq!(stats.evals, 95);
        assert_eq!(stats.termination, Termination::OverBudget);
        // 10 + 2 * sqrt(4) particles
        assert_eq!(deme.len(), 14);
    }

    #[test]
    fn test_sphere_improves() {
        let optim = OptimConfig::default().with_max_stagnation(50);
        let pso = ParticleSwarm::new(optim, PsConfig::default()).unwrap();
        let fs = Arc::new(FieldSet::new().with_spec(ContinSpec::default(), 2));
        let mut deme = Deme::new(Arc::clone(&fs));
        let start = sphere(&fs, &fs.default_instance()).raw;
        let stats = pso.search(&mut deme, None, &sphere, 5000, None, &mut create_rng(4));
        let best = stats.best_score.unwrap().raw;
        assert!(best > start, "best {best} start {start}");
        assert!(best > -0.5, "best {best}");
        assert_eq!(deme.best().map(|e| e.score.raw), Some(best));
    }

    #[test]
    fn test_onemax_bits() {
        let fs = Arc::new(FieldSet::new().with_spec(DiscSpec::bit(), 12));
        let onemax = |fs: &FieldSet, inst: &Instance| {
            CompositeScore::from_raw(fs.bits(inst).filter(|&b| b).count() as f64)
        };
        let optim = OptimConfig::default().with_target_score(12.0).with_max_stagnation(100);
        let pso = ParticleSwarm::new(optim, PsConfig::default()).unwrap();
        let mut deme = Deme::new(fs);
        let stats = pso.search(&mut deme, None, &onemax, 20_000, None, &mut create_rng(9));
        assert!(stats.best_score.unwrap().raw >= 10.0);
    }

    #[test]
    fn test_init_is_first_particle() {
        let fs = Arc::new(FieldSet::new().with_spec(DiscSpec::new(6), 3));
        let mut init = fs.default_instance();
        for i in 0..3 {
            fs.set_disc(&mut init, i, 5);
        }
        let target = |fs: &FieldSet, inst: &Instance| {
            CompositeScore::from_raw(fs.discs(inst).map(f64::from).sum())
        };
        let optim = OptimConfig::default().with_target_score(15.0);
        let pso = ParticleSwarm::new(optim, PsConfig::default()).unwrap();
        let mut deme = Deme::new(fs);
        let stats = pso.search(&mut deme, Some(&init), &target, 1000, None, &mut create_rng(2));
        assert_eq!(stats.termination, Termination::TargetScoreReached);
        assert_eq!(stats.iterations, 1);
    }

    #[test]
    fn test_converges_without_improvement() {
        let flat = |_: &FieldSet, _: &Instance| CompositeScore::from_raw(1.0);
        let optim = OptimConfig::default().with_max_stagnation(3);
        let pso = ParticleSwarm::new(optim, PsConfig::default().with_max_particles(5)).unwrap();
        let mut deme = Deme::new(Arc::new(FieldSet::new().with_spec(DiscSpec::bit(), 4)));
        let stats = pso.search(&mut deme, None, &flat, 10_000, None, &mut create_rng(0));
        assert_eq!(stats.termination, Termination::Converged);
        // one improving iteration, then four stagnant ones
        assert_eq!(stats.iterations, 5);
        assert_eq!(stats.evals, 25);
    }
}

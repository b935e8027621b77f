//! Hybrid loop.

use super::config::HybridConfig;
use crate::error::ConfigError;
use crate::neighborhood::generate_contin_neighbor;
use crate::optimization::hill_climbing::{Climber, Step};
use crate::optimization::particle_swarm::{Particle, SwarmRules};
use crate::optimization::{OptimConfig, Optimizer, SearchStats, Termination};
use crate::representation::{Deme, Instance};
use crate::scoring::Scorer;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Hill-climbing whose hilltops are refined by a particle swarm over the
/// contin knobs.
///
/// Neighborhood steps work as in
/// [`HillClimbing`](crate::optimization::hill_climbing::HillClimbing). When
/// a step does not improve and the field set has contin knobs, particles
/// are scattered around the center and flown for a few batches with the
/// center as global best. An improvement restarts hill-climbing at
/// distance 1; otherwise the search widens or stops as hill-climbing does.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use moses_optim::optimization::{Optimizer, OptimConfig};
/// use moses_optim::optimization::hybrid::{HybridConfig, HybridHcPs};
/// use moses_optim::representation::{ContinSpec, Deme, DiscSpec, FieldSet, Instance};
/// use moses_optim::scoring::CompositeScore;
/// use moses_optim::random::create_rng;
///
/// let fs = Arc::new(
///     FieldSet::new()
///         .with_spec(ContinSpec::default(), 1)
///         .with_spec(DiscSpec::bit(), 4),
/// );
/// let score = |fs: &FieldSet, inst: &Instance| {
///     let bits = fs.bits(inst).filter(|&b| b).count() as f64;
///     let x = fs.get_contin(inst, 0);
///     CompositeScore::from_raw(bits - (x - 0.3).powi(2))
/// };
/// let hybrid = HybridHcPs::new(OptimConfig::default(), HybridConfig::default()).unwrap();
/// let mut deme = Deme::new(fs);
/// let stats = hybrid.search(&mut deme, None, &score, 2000, None, &mut create_rng(3));
/// assert!(stats.best_score.unwrap().raw > 3.9);
/// ```
#[derive(Debug, Clone)]
pub struct HybridHcPs {
    optim: OptimConfig,
    hybrid: HybridConfig,
}

impl HybridHcPs {
    pub fn new(optim: OptimConfig, hybrid: HybridConfig) -> Result<Self, ConfigError> {
        optim.validate()?;
        hybrid.validate()?;
        Ok(Self { optim, hybrid })
    }

    pub fn hybrid_config(&self) -> &HybridConfig {
        &self.hybrid
    }

    /// Flies a contin-only swarm around the climber's center. Returns
    /// whether the center improved, or the termination that cut the phase
    /// short.
    fn refine_contin<S, R>(
        &self,
        climber: &mut Climber<'_, S>,
        deme: &mut Deme,
        rng: &mut R,
    ) -> Result<bool, Termination>
    where
        S: Scorer + ?Sized,
        R: Rng,
    {
        let fs = Arc::clone(climber.fields());
        let params = self.hybrid.contin_params(&fs);
        let rules = SwarmRules::contin_only(&fs, params);

        let mut swarm: Vec<Particle> = (0..self.hybrid.ps_particles)
            .map(|_| {
                let mut seed = generate_contin_neighbor(
                    &fs,
                    &climber.center,
                    climber.distance,
                    self.hybrid.seed_mode,
                    rng,
                );
                for x in seed.contin_mut() {
                    *x = params.confine(*x);
                }
                rules.particle_at(seed, rng)
            })
            .collect();

        let mut improved_any = false;
        for round in 0..self.hybrid.ps_iterations {
            if let Some(t) = climber.tracker.check() {
                return Err(t);
            }
            let n = swarm.len().min(climber.tracker.remaining_evals());
            let start = deme.len();
            deme.extend(swarm[..n].iter().map(|p| p.position.clone()));

            let improved = climber.evaluate_tail(deme, start);
            climber.tracker.end_iteration(improved);
            improved_any |= improved;
            for (particle, entry) in swarm.iter_mut().zip(&deme.as_slice()[start..]) {
                particle.record(entry.score);
            }
            debug!(round, scored = n, improved, best = %climber.center_score, "contin swarm batch");

            let global = climber.center.clone();
            for particle in swarm.iter_mut() {
                rules.update(particle, &global, &[], rng);
            }
        }
        Ok(improved_any)
    }
}

impl Optimizer for HybridHcPs {
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
        let hc = &self.hybrid.hc;
        deme.clear();
        let mut climber = Climber::new(deme, init, scorer, hc, &self.optim, max_evals, max_time);
        if let Some(t) = climber.tracker.check() {
            return climber.finish(t);
        }
        let has_contin = climber.fields().n_contin_fields() > 0;

        climber.score_center(deme);
        loop {
            if let Some(t) = climber.tracker.check() {
                return climber.finish(t);
            }
            match climber.step(deme, rng) {
                Step::Improved => {
                    climber.trim(deme);
                    if hc.single_step {
                        if let Some(t) = climber.tracker.check() {
                            return climber.finish(t);
                        }
                        return climber.finish(Termination::Converged);
                    }
                }
                Step::Flat | Step::Empty => {
                    if has_contin {
                        let refined = self.refine_contin(&mut climber, deme, rng);
                        climber.trim(deme);
                        match refined {
                            Err(t) => return climber.finish(t),
                            Ok(true) => {
                                climber.restart();
                                continue;
                            }
                            Ok(false) => {}
                        }
                    } else {
                        climber.trim(deme);
                    }
                    if !climber.widen() {
                        if let Some(t) = climber.tracker.check() {
                            return climber.finish(t);
                        }
                        return climber.finish(Termination::Converged);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::hill_climbing::{HcConfig, HillClimbing};
    use crate::random::create_rng;
    use crate::representation::{ContinSpec, DiscSpec, FieldSet};
    use crate::scoring::CompositeScore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn near(fs: &FieldSet, inst: &Instance) -> CompositeScore {
        let x = fs.get_contin(inst, 0);
        CompositeScore::from_raw(-(x - 1.3) * (x - 1.3))
    }

    fn contin_deme() -> Deme {
        Deme::new(Arc::new(
            FieldSet::new().with_spec(ContinSpec::new(0.0, 1.0, 2.0, 5), 1),
        ))
    }

    #[test]
    fn test_zero_budget() {
        let calls = AtomicUsize::new(0);
        let scorer = |fs: &FieldSet, inst: &Instance| {
            calls.fetch_add(1, Ordering::Relaxed);
            near(fs, inst)
        };
        let hybrid = HybridHcPs::new(OptimConfig::default(), HybridConfig::default()).unwrap();
        let mut deme = contin_deme();
        let stats = hybrid.search(&mut deme, None, &scorer, 0, None, &mut create_rng(0));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert_eq!(stats.termination, Termination::OverBudget);
    }

    #[test]
    fn test_swarm_refines_hilltop() {
        // Hill-climbing alone stops at 1.3125, the nearest grid point.
        let hc = HillClimbing::new(OptimConfig::default(), HcConfig::default()).unwrap();
        let mut deme = contin_deme();
        let hc_stats = hc.search(&mut deme, None, &near, 10_000, None, &mut create_rng(1));
        assert_eq!(hc_stats.termination, Termination::Converged);
        assert_eq!(hc_stats.evals, 125);
        let hilltop = hc_stats.best_score.unwrap().raw;

        let hybrid = HybridHcPs::new(OptimConfig::default(), HybridConfig::default()).unwrap();
        let mut deme = contin_deme();
        let stats = hybrid.search(&mut deme, None, &near, 10_000, None, &mut create_rng(1));
        assert!(stats.evals >= 225);
        assert!(stats.best_score.unwrap().raw >= hilltop);
        assert!(deme.iter().any(|e| e.score.raw >= hilltop));
    }

    #[test]
    fn test_without_contin_matches_hill_climbing() {
        let fs = Arc::new(FieldSet::new().with_spec(DiscSpec::bit(), 6));
        let onemax = |fs: &FieldSet, inst: &Instance| {
            CompositeScore::from_raw(fs.bits(inst).filter(|&b| b).count() as f64)
        };
        let hybrid = HybridHcPs::new(OptimConfig::default(), HybridConfig::default()).unwrap();
        let mut deme = Deme::new(Arc::clone(&fs));
        let stats = hybrid.search(&mut deme, None, &onemax, 10_000, None, &mut create_rng(2));
        assert_eq!(stats.best_score.unwrap().raw, 6.0);
        // six improving steps of six neighbors, a final flat step, plus the center
        assert_eq!(stats.evals, 1 + 7 * 6);
        assert_eq!(stats.termination, Termination::Converged);
    }

    #[test]
    fn test_budget_respected_in_swarm_phase() {
        let hybrid = HybridHcPs::new(OptimConfig::default(), HybridConfig::default()).unwrap();
        let mut deme = contin_deme();
        let stats = hybrid.search(&mut deme, None, &near, 150, None, &mut create_rng(3));
        assert_eq!(stats.evals, 150);
        assert_eq!(stats.termination, Termination::OverBudget);
    }
}

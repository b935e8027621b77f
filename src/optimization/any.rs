//! Optimizer selection by name.

use super::hill_climbing::{HcConfig, HillClimbing};
use super::hybrid::{HybridConfig, HybridHcPs};
use super::particle_swarm::{ParticleSwarm, PsConfig};
use super::{OptimConfig, Optimizer, SearchStats};
use crate::error::ConfigError;
use crate::representation::{Deme, Instance};
use crate::scoring::Scorer;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which optimizer to run.
///
/// # Examples
///
/// ```
/// use moses_optim::optimization::OptimAlgorithm;
///
/// let algo: OptimAlgorithm = "ps".parse().unwrap();
/// assert_eq!(algo, OptimAlgorithm::ParticleSwarm);
/// assert_eq!(algo.to_string(), "particle-swarm");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OptimAlgorithm {
    #[default]
    HillClimbing,
    ParticleSwarm,
    Hybrid,
}

impl fmt::Display for OptimAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OptimAlgorithm::HillClimbing => "hill-climbing",
            OptimAlgorithm::ParticleSwarm => "particle-swarm",
            OptimAlgorithm::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

impl FromStr for OptimAlgorithm {
    type Err = ConfigError;

    /// Accepts the long names and the short forms `hc`, `ps` and `hy`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hc" | "hill-climbing" | "hill_climbing" => Ok(OptimAlgorithm::HillClimbing),
            "ps" | "pso" | "particle-swarm" | "particle_swarm" => Ok(OptimAlgorithm::ParticleSwarm),
            "hy" | "hybrid" | "hybrid-hc-ps" => Ok(OptimAlgorithm::Hybrid),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// One of the crate's optimizers behind a single type.
#[derive(Debug, Clone)]
pub enum AnyOptimizer {
    HillClimbing(HillClimbing),
    ParticleSwarm(ParticleSwarm),
    Hybrid(HybridHcPs),
}

impl AnyOptimizer {
    /// The chosen optimizer with its default algorithm parameters.
    pub fn new(algorithm: OptimAlgorithm, optim: OptimConfig) -> Result<Self, ConfigError> {
        Ok(match algorithm {
            OptimAlgorithm::HillClimbing => HillClimbing::new(optim, HcConfig::default())?.into(),
            OptimAlgorithm::ParticleSwarm => ParticleSwarm::new(optim, PsConfig::default())?.into(),
            OptimAlgorithm::Hybrid => HybridHcPs::new(optim, HybridConfig::default())?.into(),
        })
    }

    pub fn algorithm(&self) -> OptimAlgorithm {
        match self {
            AnyOptimizer::HillClimbing(_) => OptimAlgorithm::HillClimbing,
            AnyOptimizer::ParticleSwarm(_) => OptimAlgorithm::ParticleSwarm,
            AnyOptimizer::Hybrid(_) => OptimAlgorithm::Hybrid,
        }
    }
}

impl From<HillClimbing> for AnyOptimizer {
    fn from(o: HillClimbing) -> Self {
        AnyOptimizer::HillClimbing(o)
    }
}

impl From<ParticleSwarm> for AnyOptimizer {
    fn from(o: ParticleSwarm) -> Self {
        AnyOptimizer::ParticleSwarm(o)
    }
}

impl From<HybridHcPs> for AnyOptimizer {
    fn from(o: HybridHcPs) -> Self {
        AnyOptimizer::Hybrid(o)
    }
}

impl Optimizer for AnyOptimizer {
    fn config(&self) -> &OptimConfig {
        match self {
            AnyOptimizer::HillClimbing(o) => o.config(),
            AnyOptimizer::ParticleSwarm(o) => o.config(),
            AnyOptimizer::Hybrid(o) => o.config(),
        }
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
        match self {
            AnyOptimizer::HillClimbing(o) => o.search(deme, init, scorer, max_evals, max_time, rng),
            AnyOptimizer::ParticleSwarm(o) => o.search(deme, init, scorer, max_evals, max_time, rng),
            AnyOptimizer::Hybrid(o) => o.search(deme, init, scorer, max_evals, max_time, rng),
        }
    }
}

//! Hybrid hill-climbing / particle-swarm configuration.

use crate::error::ConfigError;
use crate::neighborhood::ContinNeighborMode;
use crate::optimization::hill_climbing::HcConfig;
use crate::optimization::particle_swarm::KindParams;
use crate::representation::FieldSet;

/// Configuration for [`HybridHcPs`](super::HybridHcPs).
///
/// The hill-climbing part is configured by `hc`. The particle-swarm phase
/// moves contin knobs only; its value range is `±2^depth` for the largest
/// contin depth of the field set and its velocity range is half of that.
///
/// # Examples
///
/// ```
/// use moses_optim::optimization::hill_climbing::HcConfig;
/// use moses_optim::optimization::hybrid::HybridConfig;
///
/// let config = HybridConfig::default()
///     .with_hc(HcConfig::default().with_widen_search(true))
///     .with_ps_particles(20)
///     .with_ps_iterations(5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HybridConfig {
    pub hc: HcConfig,

    /// Particles per particle-swarm phase.
    pub ps_particles: usize,

    /// Batches per particle-swarm phase.
    pub ps_iterations: usize,

    /// Individual learning rate.
    pub c1: f64,

    /// Social learning rate.
    pub c2: f64,

    pub inertia: f64,

    /// How particles are scattered around the center.
    pub seed_mode: ContinNeighborMode,
}

impl Default for HybridConfig {
    fn default() -> Self {
        let contin = KindParams::contin();
        Self {
            hc: HcConfig::default(),
            ps_particles: 10,
            ps_iterations: 10,
            c1: contin.c1,
            c2: contin.c2,
            inertia: contin.inertia,
            seed_mode: ContinNeighborMode::default(),
        }
    }
}

impl HybridConfig {
    pub fn with_hc(mut self, hc: HcConfig) -> Self {
        self.hc = hc;
        self
    }

    pub fn with_ps_particles(mut self, n: usize) -> Self {
        self.ps_particles = n;
        self
    }

    pub fn with_ps_iterations(mut self, n: usize) -> Self {
        self.ps_iterations = n;
        self
    }

    pub fn with_learning_rates(mut self, c1: f64, c2: f64) -> Self {
        self.c1 = c1;
        self.c2 = c2;
        self
    }

    pub fn with_inertia(mut self, inertia: f64) -> Self {
        self.inertia = inertia;
        self
    }

    pub fn with_seed_mode(mut self, mode: ContinNeighborMode) -> Self {
        self.seed_mode = mode;
        self
    }

    /// Contin update parameters for the field set `fs`.
    pub fn contin_params(&self, fs: &FieldSet) -> KindParams {
        let depth = fs.contin().iter().map(|c| c.depth).max().unwrap_or(0);
        KindParams::contin_within(2f64.powi(depth as i32))
            .with_learning_rates(self.c1, self.c2)
            .with_inertia(self.inertia)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hc.validate()?;
        if self.ps_particles == 0 {
            return Err(ConfigError::out_of_range("ps_particles", ">= 1", 0.0));
        }
        if self.ps_iterations == 0 {
            return Err(ConfigError::out_of_range("ps_iterations", ">= 1", 0.0));
        }
        for (name, v) in [("c1", self.c1), ("c2", self.c2), ("inertia", self.inertia)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ConfigError::out_of_range(name, "finite and non-negative", v));
            }
        }
        Ok(())
    }
}

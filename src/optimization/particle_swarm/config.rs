//! Particle-swarm configuration.

use crate::error::ConfigError;
use rand::Rng;

/// Update-rule parameters for one knob kind.
///
/// Velocity follows
/// `v' = inertia * v + c1 * r1 * (personal - x) + c2 * r2 * (global - x)`
/// clamped to `[min_vel, max_vel]`; positions are confined to
/// `[min_value, max_value]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KindParams {
    /// Individual learning rate.
    pub c1: f64,
    /// Social learning rate.
    pub c2: f64,
    pub inertia: f64,
    pub min_vel: f64,
    pub max_vel: f64,
    pub min_value: f64,
    pub max_value: f64,
}

impl KindParams {
    /// Binary PSO: velocity is the log-odds of a set bit.
    pub fn bit() -> Self {
        Self {
            c1: 0.7,
            c2: 1.43,
            inertia: 1.0,
            min_vel: -6.0,
            max_vel: 6.0,
            min_value: 0.0,
            max_value: 1.0,
        }
    }

    /// Discrete knobs move in a `[0, 1]` shadow space and are rounded on
    /// decode.
    pub fn disc() -> Self {
        Self {
            c1: 2.05,
            c2: 2.05,
            inertia: 1.0,
            min_vel: -0.5,
            max_vel: 0.5,
            min_value: 0.0,
            max_value: 1.0,
        }
    }

    pub fn contin() -> Self {
        Self {
            c1: 0.7,
            c2: 1.43,
            inertia: 0.7,
            min_vel: -16.0,
            max_vel: 16.0,
            min_value: -32.0,
            max_value: 32.0,
        }
    }

    /// Contin parameters whose value range is `[-limit, limit]` and whose
    /// velocity range is half of that.
    pub fn contin_within(limit: f64) -> Self {
        Self {
            min_vel: -limit / 2.0,
            max_vel: limit / 2.0,
            min_value: -limit,
            max_value: limit,
            ..Self::contin()
        }
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

    pub fn with_velocity_range(mut self, min: f64, max: f64) -> Self {
        self.min_vel = min;
        self.max_vel = max;
        self
    }

    pub fn with_value_range(mut self, min: f64, max: f64) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    #[inline]
    pub fn clamp_velocity(&self, vel: f64) -> f64 {
        vel.clamp(self.min_vel, self.max_vel)
    }

    #[inline]
    pub fn confine(&self, value: f64) -> f64 {
        value.clamp(self.min_value, self.max_value)
    }

    /// Uniform velocity in `[min_vel, max_vel]`.
    pub fn random_velocity<R: Rng>(&self, rng: &mut R) -> f64 {
        self.min_vel + rng.random::<f64>() * (self.max_vel - self.min_vel)
    }

    /// Uniform position in `[min_value, max_value]`.
    pub fn random_value<R: Rng>(&self, rng: &mut R) -> f64 {
        self.min_value + rng.random::<f64>() * (self.max_value - self.min_value)
    }

    fn validate(&self, kind: &'static str) -> Result<(), ConfigError> {
        for (name, v) in [("c1", self.c1), ("c2", self.c2), ("inertia", self.inertia)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ConfigError::Inconsistent(format!(
                    "{kind} {name} must be finite and non-negative, got {v}"
                )));
            }
        }
        if !(self.min_vel.is_finite() && self.max_vel.is_finite() && self.min_vel <= self.max_vel) {
            return Err(ConfigError::Inconsistent(format!(
                "{kind} velocity range [{}, {}] is empty or unbounded",
                self.min_vel, self.max_vel
            )));
        }
        if !(self.min_value.is_finite()
            && self.max_value.is_finite()
            && self.min_value <= self.max_value)
        {
            return Err(ConfigError::Inconsistent(format!(
                "{kind} value range [{}, {}] is empty or unbounded",
                self.min_value, self.max_value
            )));
        }
        Ok(())
    }
}

/// Configuration for particle-swarm optimization.
///
/// # Examples
///
/// ```
/// use moses_optim::optimization::particle_swarm::{KindParams, PsConfig};
///
/// let config = PsConfig::default()
///     .with_max_particles(30)
///     .with_contin(KindParams::contin_within(8.0));
/// assert!(config.validate().is_ok());
/// assert_eq!(config.swarm_size(16, 1000), 18);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PsConfig {
    /// Upper bound on the swarm size.
    pub max_particles: usize,
    pub bit: KindParams,
    pub disc: KindParams,
    pub contin: KindParams,
}

impl Default for PsConfig {
    fn default() -> Self {
        Self {
            max_particles: 50,
            bit: KindParams::bit(),
            disc: KindParams::disc(),
            contin: KindParams::contin(),
        }
    }
}

impl PsConfig {
    pub fn with_max_particles(mut self, n: usize) -> Self {
        self.max_particles = n;
        self
    }

    pub fn with_bit(mut self, params: KindParams) -> Self {
        self.bit = params;
        self
    }

    pub fn with_disc(mut self, params: KindParams) -> Self {
        self.disc = params;
        self
    }

    pub fn with_contin(mut self, params: KindParams) -> Self {
        self.contin = params;
        self
    }

    /// Constriction factor damping discrete velocities:
    /// `2 / |2 - phi - sqrt(phi^2 - 4 phi)|` with `phi = c1 + c2 > 4`.
    pub fn disc_constriction(&self) -> f64 {
        let phi = self.disc.c1 + self.disc.c2;
        2.0 / (2.0 - phi - (phi * phi - 4.0 * phi).sqrt()).abs()
    }

    /// Number of particles for a problem with `dims` swarm dimensions:
    /// `min(max_particles, 10 + 2 sqrt(dims), max_evals)`.
    pub fn swarm_size(&self, dims: usize, max_evals: usize) -> usize {
        let by_dims = 10 + (2.0 * (dims as f64).sqrt()) as usize;
        self.max_particles.min(by_dims).min(max_evals)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_particles == 0 {
            return Err(ConfigError::out_of_range("max_particles", ">= 1", 0.0));
        }
        self.bit.validate("bit")?;
        self.disc.validate("disc")?;
        self.contin.validate("contin")?;
        let phi = self.disc.c1 + self.disc.c2;
        if !(phi > 4.0) {
            return Err(ConfigError::out_of_range("disc c1 + c2", "> 4", phi));
        }
        Ok(())
    }
}

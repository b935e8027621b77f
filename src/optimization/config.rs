//! Parameters shared by every optimizer.

use super::resize::ResizeConfig;
use crate::error::ConfigError;

/// Parameters common to hill-climbing, particle-swarm and the hybrid.
///
/// # Examples
///
/// ```
/// use moses_optim::optimization::OptimConfig;
///
/// let config = OptimConfig::default()
///     .with_target_score(0.0)
///     .with_max_stagnation(10)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimConfig {
    /// Stop once the best raw score reaches this value.
    pub target_score: f64,

    /// Stop after more than this many consecutive iterations without
    /// improvement.
    pub max_stagnation: usize,

    /// Score batches on the rayon pool (requires the `parallel` feature).
    pub parallel: bool,

    /// Seed used by [`Optimizer::run`](super::Optimizer::run).
    pub seed: Option<u64>,

    /// Deme trimming policy.
    pub resize: ResizeConfig,
}

impl Default for OptimConfig {
    fn default() -> Self {
        Self {
            target_score: f64::INFINITY,
            max_stagnation: 20,
            parallel: true,
            seed: None,
            resize: ResizeConfig::default(),
        }
    }
}

impl OptimConfig {
    pub fn with_target_score(mut self, score: f64) -> Self {
        self.target_score = score;
        self
    }

    pub fn with_max_stagnation(mut self, n: usize) -> Self {
        self.max_stagnation = n;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_resize(mut self, resize: ResizeConfig) -> Self {
        self.resize = resize;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_score.is_nan() {
            return Err(ConfigError::out_of_range(
                "target_score",
                "a number",
                self.target_score,
            ));
        }
        self.resize.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = OptimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_stagnation, 20);
        assert!(config.target_score.is_infinite());
    }

    #[test]
    fn test_nan_target_rejected() {
        let config = OptimConfig::default().with_target_score(f64::NAN);
        assert!(config.validate().is_err());
    }
}

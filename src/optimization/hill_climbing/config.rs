//! Hill-climbing configuration.

use crate::error::ConfigError;

/// Configuration for hill-climbing.
///
/// # Examples
///
/// ```
/// use moses_optim::optimization::hill_climbing::HcConfig;
///
/// let config = HcConfig::default()
///     .with_widen_search(true)
///     .with_max_dist(3)
///     .with_crossover(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HcConfig {
    /// Search farther neighborhoods when the current one has no better
    /// instance. Without it a hilltop ends the run.
    pub widen_search: bool,

    /// Largest neighborhood distance explored when widening.
    pub max_dist: usize,

    /// Stop after the first improvement.
    pub single_step: bool,

    /// Try crossovers of the previous step's best instances before
    /// sampling large neighborhoods.
    pub crossover: bool,

    /// Instances built per crossover pass.
    pub crossover_pop_size: usize,

    /// Crossover is only tried when the neighborhood has more than this
    /// many instances.
    pub crossover_min_neighbors: usize,

    /// Most instances scored per neighborhood step.
    pub max_nn_evals: usize,

    /// Fraction of the neighborhood sampled per step.
    pub fraction_of_nn: f64,
}

impl Default for HcConfig {
    fn default() -> Self {
        Self {
            widen_search: false,
            max_dist: 4,
            single_step: false,
            crossover: true,
            crossover_pop_size: 120,
            crossover_min_neighbors: 400,
            max_nn_evals: 20_000,
            fraction_of_nn: 2.0,
        }
    }
}

impl HcConfig {
    pub fn with_widen_search(mut self, widen: bool) -> Self {
        self.widen_search = widen;
        self
    }

    pub fn with_max_dist(mut self, dist: usize) -> Self {
        self.max_dist = dist;
        self
    }

    pub fn with_single_step(mut self, single: bool) -> Self {
        self.single_step = single;
        self
    }

    pub fn with_crossover(mut self, crossover: bool) -> Self {
        self.crossover = crossover;
        self
    }

    pub fn with_crossover_pop_size(mut self, n: usize) -> Self {
        self.crossover_pop_size = n;
        self
    }

    pub fn with_crossover_min_neighbors(mut self, n: usize) -> Self {
        self.crossover_min_neighbors = n;
        self
    }

    pub fn with_max_nn_evals(mut self, n: usize) -> Self {
        self.max_nn_evals = n;
        self
    }

    pub fn with_fraction_of_nn(mut self, fraction: f64) -> Self {
        self.fraction_of_nn = fraction;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dist == 0 {
            return Err(ConfigError::out_of_range("max_dist", ">= 1", 0.0));
        }
        if self.max_nn_evals == 0 {
            return Err(ConfigError::out_of_range("max_nn_evals", ">= 1", 0.0));
        }
        if !(self.fraction_of_nn > 0.0) {
            return Err(ConfigError::out_of_range(
                "fraction_of_nn",
                "positive",
                self.fraction_of_nn,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = HcConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.max_nn_evals, 20_000);
        assert_eq!(c.crossover_pop_size, 120);
        assert!(!c.widen_search);
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(HcConfig::default().with_fraction_of_nn(0.0).validate().is_err());
        assert!(HcConfig::default()
            .with_fraction_of_nn(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_invalid_max_dist() {
        let err = HcConfig::default().with_max_dist(0).validate().unwrap_err();
        assert!(err.to_string().contains("max_dist"));
    }
}

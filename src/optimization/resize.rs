//! Deme trimming under score and memory pressure.

use crate::error::ConfigError;
use crate::representation::Deme;
use sysinfo::System;
use tracing::debug;

/// Eviction policy for oversized demes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResizeConfig {
    /// Trim at all.
    pub enabled: bool,

    /// Entries with penalized score at or below `best - score_range` are
    /// eviction candidates.
    pub score_range: f64,

    /// Hard cap on the deme size.
    pub max_allowed_instances: usize,

    /// Eviction never shrinks the deme below this size.
    pub min_to_keep: usize,

    /// Score-based eviction runs only once more than this many
    /// candidates accumulate (or memory is short).
    pub bad_score_threshold: usize,

    /// Fraction of total RAM the deme may occupy.
    pub ram_fraction: f64,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            score_range: 5.0,
            max_allowed_instances: 100_000,
            min_to_keep: 20,
            bad_score_threshold: 500,
            ram_fraction: 0.5,
        }
    }
}

impl ResizeConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_score_range(mut self, range: f64) -> Self {
        self.score_range = range;
        self
    }

    pub fn with_max_allowed_instances(mut self, n: usize) -> Self {
        self.max_allowed_instances = n;
        self
    }

    pub fn with_min_to_keep(mut self, n: usize) -> Self {
        self.min_to_keep = n;
        self
    }

    pub fn with_bad_score_threshold(mut self, n: usize) -> Self {
        self.bad_score_threshold = n;
        self
    }

    pub fn with_ram_fraction(mut self, fraction: f64) -> Self {
        self.ram_fraction = fraction;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.score_range > 0.0) {
            return Err(ConfigError::out_of_range(
                "score_range",
                "positive",
                self.score_range,
            ));
        }
        if !(self.ram_fraction > 0.0 && self.ram_fraction <= 1.0) {
            return Err(ConfigError::out_of_range(
                "ram_fraction",
                "in (0, 1]",
                self.ram_fraction,
            ));
        }
        if self.max_allowed_instances < self.min_to_keep {
            return Err(ConfigError::Inconsistent(format!(
                "max_allowed_instances ({}) < min_to_keep ({})",
                self.max_allowed_instances, self.min_to_keep
            )));
        }
        Ok(())
    }
}

/// Applies a [`ResizeConfig`] to demes, knowing the machine's RAM.
#[derive(Debug, Clone)]
pub struct DemeTrimmer {
    config: ResizeConfig,
    total_ram: u64,
}

impl DemeTrimmer {
    /// Reads total system RAM once.
    pub fn new(config: ResizeConfig) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        Self::with_total_ram(config, sys.total_memory())
    }

    /// A trimmer assuming `total_ram` bytes of memory.
    pub fn with_total_ram(config: ResizeConfig, total_ram: u64) -> Self {
        Self { config, total_ram }
    }

    pub fn config(&self) -> &ResizeConfig {
        &self.config
    }

    /// Memory the deme may use, in bytes. Unknown RAM means no limit.
    fn ram_budget(&self) -> f64 {
        if self.total_ram == 0 {
            f64::INFINITY
        } else {
            self.config.ram_fraction * self.total_ram as f64
        }
    }

    fn over_ram(&self, deme: &Deme) -> bool {
        let usage = deme.entry_byte_size() as f64 * deme.len() as f64;
        usage > self.ram_budget()
    }

    /// Largest deme size allowed by both the instance cap and RAM.
    pub fn max_instances(&self, deme: &Deme) -> usize {
        let by_ram = self.ram_budget() / deme.entry_byte_size().max(1) as f64;
        let by_ram = if by_ram >= usize::MAX as f64 {
            usize::MAX
        } else {
            by_ram as usize
        };
        self.config.max_allowed_instances.min(by_ram)
    }

    /// Evicts entries whose penalized score is at or below `cutoff`, in a
    /// single compaction pass, never shrinking the deme below
    /// `min_to_keep`. Returns the number of entries evicted.
    pub fn resize_by_score(&self, deme: &mut Deme, cutoff: f64) -> usize {
        let before = deme.len();
        let mut budget = before.saturating_sub(self.config.min_to_keep);
        deme.retain(|entry| {
            if budget > 0 && entry.score.penalized() <= cutoff {
                budget -= 1;
                false
            } else {
                true
            }
        });
        let evicted = before - deme.len();
        debug!(evicted, cutoff, remaining = deme.len(), "trimmed low scoring instances");
        evicted
    }

    /// Keeps the deme at a manageable size. Returns true if anything was
    /// removed.
    ///
    /// Low scorers (relative to `best_score`) are evicted once there are
    /// more than `bad_score_threshold` of them or the deme exceeds its RAM
    /// share. A deme still larger than [`max_instances`](Self::max_instances)
    /// afterwards keeps only its best entries.
    pub fn resize_deme(&self, deme: &mut Deme, best_score: f64) -> bool {
        if !self.config.enabled {
            return false;
        }
        let mut did_resize = false;
        let cutoff = best_score - self.config.score_range;
        let bad = deme
            .iter()
            .filter(|e| e.score.penalized() <= cutoff)
            .count();

        if bad > self.config.bad_score_threshold || self.over_ram(deme) {
            debug!(bad, size = deme.len(), "trimming deme by score");
            did_resize |= self.resize_by_score(deme, cutoff) > 0;
        }

        let limit = self.max_instances(deme).max(self.config.min_to_keep);
        if deme.len() > limit {
            debug!(size = deme.len(), limit, "truncating deme to best entries");
            deme.partial_sort_desc(limit);
            deme.truncate(limit);
            did_resize = true;
        }
        did_resize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::representation::{DiscSpec, FieldSet, ScoredInstance};
    use crate::scoring::CompositeScore;
    use std::sync::Arc;

    const GIB: u64 = 1 << 30;

    fn deme(scores: &[f64]) -> Deme {
        let fs = Arc::new(FieldSet::new().with_spec(DiscSpec::bit(), 8));
        let mut deme = Deme::new(Arc::clone(&fs));
        for &s in scores {
            deme.push_scored(ScoredInstance::new(
                fs.default_instance(),
                CompositeScore::from_raw(s),
            ));
        }
        deme
    }

    #[test]
    fn test_resize_by_score_respects_cutoff() {
        let trimmer = DemeTrimmer::with_total_ram(ResizeConfig::default().with_min_to_keep(0), GIB);
        let mut d = deme(&[10.0, 1.0, 2.0, 9.0, 0.0, 8.0]);
        let evicted = trimmer.resize_by_score(&mut d, 2.0);
        assert_eq!(evicted, 3);
        assert!(d.iter().all(|e| e.score.raw > 2.0));
    }

    #[test]
    fn test_resize_by_score_keeps_floor() {
        let trimmer = DemeTrimmer::with_total_ram(ResizeConfig::default().with_min_to_keep(4), GIB);
        let scores: Vec<f64> = (0..10).map(|i| if i == 0 { 100.0 } else { 0.0 }).collect();
        let mut d = deme(&scores);
        trimmer.resize_by_score(&mut d, 50.0);
        assert_eq!(d.len(), 4);
        assert!(d.iter().any(|e| e.score.raw == 100.0));
    }

    #[test]
    fn test_resize_deme_below_threshold_untouched() {
        let trimmer = DemeTrimmer::with_total_ram(ResizeConfig::default(), GIB);
        let mut d = deme(&[10.0, 0.0, 0.0]);
        assert!(!trimmer.resize_deme(&mut d, 10.0));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn test_resize_deme_evicts_past_threshold() {
        let config = ResizeConfig::default()
            .with_bad_score_threshold(2)
            .with_min_to_keep(1);
        let trimmer = DemeTrimmer::with_total_ram(config, GIB);
        let mut d = deme(&[10.0, 0.0, 0.0, 0.0, 7.0]);
        assert!(trimmer.resize_deme(&mut d, 10.0));
        let mut left: Vec<f64> = d.iter().map(|e| e.score.raw).collect();
        left.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(left, vec![7.0, 10.0]);
    }

    #[test]
    fn test_resize_deme_truncates_to_cap() {
        let config = ResizeConfig::default()
            .with_max_allowed_instances(3)
            .with_min_to_keep(2);
        let trimmer = DemeTrimmer::with_total_ram(config, GIB);
        let mut d = deme(&[1.0, 5.0, 3.0, 4.0, 2.0]);
        assert!(trimmer.resize_deme(&mut d, 5.0));
        assert_eq!(d.len(), 3);
        let kept: Vec<f64> = d.iter().map(|e| e.score.raw).collect();
        assert_eq!(kept, vec![5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_ram_pressure_limits_size() {
        let trimmer = DemeTrimmer::with_total_ram(ResizeConfig::default().with_min_to_keep(1), 1);
        let d = deme(&[1.0, 2.0]);
        assert_eq!(trimmer.max_instances(&d), 0);
    }

    #[test]
    fn test_disabled_does_nothing() {
        let config = ResizeConfig::default()
            .with_enabled(false)
            .with_max_allowed_instances(1)
            .with_min_to_keep(0);
        let trimmer = DemeTrimmer::with_total_ram(config, GIB);
        let mut d = deme(&[1.0, 2.0, 3.0]);
        assert!(!trimmer.resize_deme(&mut d, 3.0));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn test_validate() {
        assert!(ResizeConfig::default().validate().is_ok());
        assert!(ResizeConfig::default().with_ram_fraction(0.0).validate().is_err());
        assert!(ResizeConfig::default()
            .with_max_allowed_instances(5)
            .with_min_to_keep(10)
            .validate()
            .is_err());
    }
}

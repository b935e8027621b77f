//! Scores and the scorer contract.

use crate::representation::{FieldSet, Instance};
use std::cmp::Ordering;
use std::fmt;

/// Score of one instance.
///
/// Higher is better. Selection orders by the penalized value
/// (`raw - penalty`); ties go to the lower complexity. Termination checks
/// against a target score read the raw value.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompositeScore {
    /// Unpenalized objective value.
    pub raw: f64,
    /// Size measure of the candidate, used for tie-breaking.
    pub complexity: u32,
    /// Amount subtracted from `raw` for selection.
    pub penalty: f64,
}

impl CompositeScore {
    pub fn new(raw: f64, complexity: u32, penalty: f64) -> Self {
        Self {
            raw,
            complexity,
            penalty,
        }
    }

    /// A score with no complexity and no penalty.
    pub fn from_raw(raw: f64) -> Self {
        Self::new(raw, 0, 0.0)
    }

    /// A score below every finite score.
    pub fn worst() -> Self {
        Self::new(f64::NEG_INFINITY, u32::MAX, 0.0)
    }

    /// Value used for selection.
    pub fn penalized(&self) -> f64 {
        self.raw - self.penalty
    }

    pub fn is_worst(&self) -> bool {
        self.raw == f64::NEG_INFINITY
    }
}

impl Default for CompositeScore {
    fn default() -> Self {
        Self::worst()
    }
}

impl PartialEq for CompositeScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CompositeScore {}

impl PartialOrd for CompositeScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompositeScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.penalized()
            .total_cmp(&other.penalized())
            .then_with(|| other.complexity.cmp(&self.complexity))
    }
}

impl fmt::Display for CompositeScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[score={}, penalized={}, complexity={}]",
            self.raw,
            self.penalized(),
            self.complexity
        )
    }
}

/// Maps an instance to its score.
///
/// Implementations must be pure: the same instance always gets the same
/// score and neither the instance nor the field set is modified. Scoring
/// may run on several threads at once.
///
/// Any `Fn(&FieldSet, &Instance) -> CompositeScore` closure is a scorer.
pub trait Scorer: Send + Sync {
    fn score(&self, fields: &FieldSet, inst: &Instance) -> CompositeScore;
}

impl<F> Scorer for F
where
    F: Fn(&FieldSet, &Instance) -> CompositeScore + Send + Sync,
{
    fn score(&self, fields: &FieldSet, inst: &Instance) -> CompositeScore {
        self(fields, inst)
    }
}

/// Adapts a plain `f64` objective into a [`Scorer`].
pub struct RawScorer<F>(pub F);

impl<F> Scorer for RawScorer<F>
where
    F: Fn(&FieldSet, &Instance) -> f64 + Send + Sync,
{
    fn score(&self, fields: &FieldSet, inst: &Instance) -> CompositeScore {
        CompositeScore::from_raw((self.0)(fields, inst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::representation::DiscSpec;

    #[test]
    fn test_orders_by_penalized() {
        let a = CompositeScore::new(10.0, 1, 4.0);
        let b = CompositeScore::new(7.0, 1, 0.0);
        assert!(b > a, "expected 7 > 6 penalized");
    }

    #[test]
    fn test_lower_complexity_wins_ties() {
        let simple = CompositeScore::new(5.0, 2, 0.0);
        let complex = CompositeScore::new(5.0, 9, 0.0);
        assert!(simple > complex);
    }

    #[test]
    fn test_worst_is_minimal() {
        let worst = CompositeScore::worst();
        assert!(worst < CompositeScore::from_raw(-1e300));
        assert!(worst.is_worst());
        assert_eq!(CompositeScore::default(), worst);
    }

    #[test]
    fn test_closure_and_raw_scorers() {
        let fs = FieldSet::new().with_spec(DiscSpec::bit(), 4);
        let mut inst = fs.default_instance();
        fs.set_bit(&mut inst, 2, true);

        let closure = |fs: &FieldSet, inst: &Instance| {
            CompositeScore::from_raw(fs.bits(inst).filter(|&b| b).count() as f64)
        };
        assert_eq!(closure.score(&fs, &inst).raw, 1.0);

        let raw = RawScorer(|fs: &FieldSet, inst: &Instance| {
            -(fs.bits(inst).filter(|&b| b).count() as f64)
        });
        assert_eq!(raw.score(&fs, &inst).raw, -1.0);
    }
}

//! Hill-climbing.
//!
//! Starting from a center instance, score the instances at distance 1;
//! move to the best one if it beats the center and repeat. When no
//! neighbor improves, either widen to larger distances or stop at the
//! hilltop.
//!
//! After an improving step, the next step first tries crossovers of that
//! step's best neighbors (see [`crossover`]) when the neighborhood is large:
//! good neighbors often combine into better instances, and a crossover
//! pass costs far fewer evaluations than sampling.
//!
//! # References
//!
//! - Looks (2006), "Competent Program Evolution", ch. 6

mod config;
mod crossover;
mod runner;

pub use config::HcConfig;
pub use crossover::{cross_top_one, cross_top_three, cross_top_two, crossover};
pub use runner::HillClimbing;

pub(crate) use runner::{Climber, Step};

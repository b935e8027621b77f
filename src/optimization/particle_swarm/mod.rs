//! Particle Swarm Optimization (PSO).
//!
//! A population of particles moves through the knob space. Each particle
//! is pulled toward its own best position and the best position of the
//! whole swarm, with per-kind update rules:
//!
//! - continuous knobs: classical PSO with inertia and confinement
//! - discrete knobs: PSO on a `[0, 1]` shadow position with a constriction
//!   factor, rounded to the nearest legal value
//! - bits: binary PSO, velocity is the log-odds of the bit being set
//!
//! # References
//!
//! - Kennedy & Eberhart (1995), "Particle Swarm Optimization"
//! - Kennedy & Eberhart (1997), "A discrete binary version of the particle
//!   swarm algorithm"
//! - Nouaouria & Boukadoum (2014), "Improved global-best particle swarm
//!   optimization algorithm with mixed-attribute data classification
//!   capability"

mod config;
mod runner;
mod update;

pub use config::{KindParams, PsConfig};
pub use runner::ParticleSwarm;
pub use update::{disc_to_shadow, shadow_to_disc, sigmoid, update_velocity};

pub(crate) use update::{Particle, SwarmRules};

//! Hill-climbing with particle-swarm refinement of continuous knobs.
//!
//! Neighborhood sampling only reaches contin values on a bisection grid
//! around the center. When a neighborhood step gives nothing better, a
//! short particle-swarm phase searches the contin knobs between the grid
//! points.

mod config;
mod runner;

pub use config::HybridConfig;
pub use runner::HybridHcPs;

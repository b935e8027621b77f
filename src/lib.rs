//! Knob-space local search for program evolution.
//!
//! Candidate programs are reduced to a fixed set of *knobs* (bits,
//! discrete choices, continuous constants and term-tree selections) and
//! searched by local optimizers:
//!
//! - **Representation**: a [`FieldSet`](representation::FieldSet) packs
//!   every knob of an [`Instance`](representation::Instance) into 64-bit
//!   words with O(1) typed access; a [`Deme`](representation::Deme) is a
//!   scored population of instances.
//! - **Neighborhoods**: counting and materializing the instances at an
//!   exact knob distance from a center, exhaustively or by sampling.
//! - **Hill-climbing**: neighborhood sampling around the best instance,
//!   with simplex crossover of the best neighbors.
//! - **Particle Swarm (PSO)**: a swarm with per-kind update rules for
//!   bits, discrete and continuous knobs.
//! - **Hybrid**: hill-climbing whose hilltops are refined by a
//!   particle swarm over the continuous knobs.
//!
//! # Architecture
//!
//! Scoring is external: callers supply a [`Scorer`](scoring::Scorer) that
//! maps an instance to a [`CompositeScore`](scoring::CompositeScore).
//! Each optimizer iteration scores one batch, optionally in parallel
//! (feature `parallel`); everything else runs on the calling thread.
//! Randomness is always passed in explicitly (see [`random`]).

pub mod error;
pub mod neighborhood;
pub mod optimization;
pub mod random;
pub mod representation;
pub mod scoring;

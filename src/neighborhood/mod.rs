//! Neighborhoods of an instance.
//!
//! Distance between two instances is the number of knobs whose decoded
//! values differ. This module counts the instances at an exact distance
//! from a center and materializes them, either exhaustively or by random
//! sampling.
//!
//! Knobs are visited in the field set's logical order (term, contin,
//! disc, bit). A selected knob may take any value other than the center's:
//!
//! - term: every other node of its term tree
//! - contin: the center plus any of the `2^(depth + 1) - 2` endpoints of
//!   bisection paths of length `1..=depth`
//! - disc: every other value of `0..m`
//! - bit: the flipped bit
//!
//! Counting and exhaustive generation follow the same enumeration, so
//! generation yields exactly the counted number of distinct instances.

mod count;
mod generate;

pub use count::{
    count_neighborhood_size, count_neighborhood_size_from_index, estimate_neighborhood_size,
    safe_binomial_coefficient,
};
pub use generate::{
    generate_all_in_neighborhood, generate_contin_neighbor, sample_from_neighborhood,
    sample_new_instances, ContinNeighborMode,
};

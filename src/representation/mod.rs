//! Packed representation of candidate solutions.
//!
//! A [`FieldSet`] describes the knobs of one problem; an [`Instance`] holds
//! one assignment of values to those knobs; a [`Deme`] is a scored
//! population of instances sharing a field set.

mod deme;
mod field_set;
mod instance;
mod spec;

pub use deme::{Deme, ScoredInstance};
pub use field_set::{nbits_to_pack, FieldSet, KnobKind, RawField};
pub use instance::{Contin, Disc, Instance, PackedWord, BITS_PER_WORD};
pub use spec::{ContinSpec, DiscSpec, KnobSpec, TermCatalog, TermNode, TermSpec, TermTree};

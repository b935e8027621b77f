//! Packed candidate solutions.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Storage word for packed bit, discrete and term knobs.
pub type PackedWord = u64;

/// Number of bits in one [`PackedWord`].
pub const BITS_PER_WORD: usize = PackedWord::BITS as usize;

/// Decoded value of a discrete (or raw) field.
pub type Disc = u32;

/// Decoded value of a continuous knob.
pub type Contin = f64;

/// One concrete assignment of values to all knobs of a field set.
///
/// Boolean, discrete and term knobs live in `packed`; continuous knobs
/// live in `contin`, one value per knob. Both lengths are fixed by the
/// owning [`FieldSet`](super::FieldSet) and never change on their own.
///
/// Equality, ordering and hashing are bit-for-bit: two contin values
/// compare equal only when their IEEE representations match, so
/// instances can key hash maps and sets.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instance {
    packed: Vec<PackedWord>,
    contin: Vec<Contin>,
}

impl Instance {
    /// Creates an all-zero instance with the given widths.
    pub fn new(packed_width: usize, n_contin: usize) -> Self {
        Self {
            packed: vec![0; packed_width],
            contin: vec![0.0; n_contin],
        }
    }

    /// Assembles an instance from raw parts.
    pub fn from_parts(packed: Vec<PackedWord>, contin: Vec<Contin>) -> Self {
        Self { packed, contin }
    }

    /// Packed words holding bit, discrete and term knobs.
    pub fn packed(&self) -> &[PackedWord] {
        &self.packed
    }

    pub fn packed_mut(&mut self) -> &mut [PackedWord] {
        &mut self.packed
    }

    /// Continuous knob values.
    pub fn contin(&self) -> &[Contin] {
        &self.contin
    }

    pub fn contin_mut(&mut self) -> &mut [Contin] {
        &mut self.contin
    }

    /// Total number of storage cells (words plus contin values).
    pub fn size(&self) -> usize {
        self.packed.len() + self.contin.len()
    }

    /// Approximate memory footprint, including the heap buffers.
    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.packed.len() * std::mem::size_of::<PackedWord>()
            + self.contin.len() * std::mem::size_of::<Contin>()
    }

    /// True when both vectors have exactly the given widths.
    pub fn has_widths(&self, packed_width: usize, n_contin: usize) -> bool {
        self.packed.len() == packed_width && self.contin.len() == n_contin
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.packed == other.packed
            && self.contin.len() == other.contin.len()
            && self
                .contin
                .iter()
                .zip(&other.contin)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.packed.hash(state);
        self.contin.len().hash(state);
        for c in &self.contin {
            c.to_bits().hash(state);
        }
    }
}

impl PartialOrd for Instance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.packed.cmp(&other.packed).then_with(|| {
            for (a, b) in self.contin.iter().zip(&other.contin) {
                match a.total_cmp(b) {
                    Ordering::Equal => continue,
                    ord => return ord,
                }
            }
            self.contin.len().cmp(&other.contin.len())
        })
    }
}

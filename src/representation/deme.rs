//! Scored instance populations.

use super::field_set::FieldSet;
use super::instance::Instance;
use crate::scoring::CompositeScore;
use std::ops::{Index, IndexMut, Range};
use std::sync::Arc;

/// An instance together with its score.
///
/// Freshly appended entries carry [`CompositeScore::worst`] until they
/// are scored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredInstance {
    pub instance: Instance,
    pub score: CompositeScore,
}

impl ScoredInstance {
    pub fn new(instance: Instance, score: CompositeScore) -> Self {
        Self { instance, score }
    }

    pub fn unscored(instance: Instance) -> Self {
        Self::new(instance, CompositeScore::worst())
    }
}

/// A population of scored instances sharing one field set.
///
/// Every instance has the widths of the deme's field set; appending an
/// instance of any other shape panics.
#[derive(Debug, Clone)]
pub struct Deme {
    fields: Arc<FieldSet>,
    entries: Vec<ScoredInstance>,
}

impl Deme {
    pub fn new(fields: Arc<FieldSet>) -> Self {
        Self {
            fields,
            entries: Vec::new(),
        }
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// A new handle to the shared field set.
    pub fn shared_fields(&self) -> Arc<FieldSet> {
        Arc::clone(&self.fields)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredInstance> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ScoredInstance> {
        self.entries.iter_mut()
    }

    pub fn as_slice(&self) -> &[ScoredInstance] {
        &self.entries
    }

    pub fn as_mut_slice(&mut self) -> &mut [ScoredInstance] {
        &mut self.entries
    }

    /// Appends an unscored instance.
    pub fn push(&mut self, instance: Instance) {
        self.push_scored(ScoredInstance::unscored(instance));
    }

    pub fn push_scored(&mut self, entry: ScoredInstance) {
        assert!(
            self.fields.fits(&entry.instance),
            "instance widths do not match the deme's field set"
        );
        self.entries.push(entry);
    }

    /// Appends every instance of `instances`, unscored.
    pub fn extend<I: IntoIterator<Item = Instance>>(&mut self, instances: I) {
        for inst in instances {
            self.push(inst);
        }
    }

    /// Grows with copies of `fill` or shrinks to `len` entries.
    pub fn resize(&mut self, len: usize, fill: &Instance) {
        assert!(self.fields.fits(fill));
        self.entries
            .resize(len, ScoredInstance::unscored(fill.clone()));
    }

    pub fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Removes a contiguous range of entries.
    pub fn erase(&mut self, range: Range<usize>) {
        self.entries.drain(range);
    }

    pub fn retain<F: FnMut(&ScoredInstance) -> bool>(&mut self, f: F) {
        self.entries.retain(f);
    }

    /// Sorts best-first.
    pub fn sort_desc(&mut self) {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
    }

    /// Moves the `k` best entries to the front, sorted best-first. The
    /// order of the remaining entries is unspecified.
    pub fn partial_sort_desc(&mut self, k: usize) {
        let k = k.min(self.entries.len());
        if k == 0 {
            return;
        }
        if k < self.entries.len() {
            self.entries
                .select_nth_unstable_by(k - 1, |a, b| b.score.cmp(&a.score));
        }
        self.entries[..k].sort_by(|a, b| b.score.cmp(&a.score));
    }

    /// The highest scoring entry.
    pub fn best(&self) -> Option<&ScoredInstance> {
        self.entries.iter().max_by(|a, b| a.score.cmp(&b.score))
    }

    /// Approximate memory footprint of one entry.
    pub fn entry_byte_size(&self) -> usize {
        std::mem::size_of::<ScoredInstance>() - std::mem::size_of::<Instance>()
            + self.fields.default_instance().byte_size()
    }

    pub fn into_entries(self) -> Vec<ScoredInstance> {
        self.entries
    }
}

impl Index<usize> for Deme {
    type Output = ScoredInstance;

    fn index(&self, idx: usize) -> &ScoredInstance {
        &self.entries[idx]
    }
}

impl IndexMut<usize> for Deme {
    fn index_mut(&mut self, idx: usize) -> &mut ScoredInstance {
        &mut self.entries[idx]
    }
}

impl<'a> IntoIterator for &'a Deme {
    type Item = &'a ScoredInstance;
    type IntoIter = std::slice::Iter<'a, ScoredInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

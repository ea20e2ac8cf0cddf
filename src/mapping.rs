//! Index maps between an original molecule and its copies.
//!
//! Extraction produces two graph copies and needs to answer, for any
//! original atom or bond, where its counterpart lives in each copy, and
//! for any copied atom, which original it came from. Both directions are
//! plain vectors indexed by handle, so lookups never hash and the reverse
//! direction does not degrade to a linear scan.
//!
//! A map entry must be cleared in the same operation that removes its
//! target from the copy: stable-graph slots freed by a removal can be
//! reused by a later insertion, and a stale entry would then alias an
//! unrelated atom or bond.

use petgraph::graph::{EdgeIndex, NodeIndex};

/// Handle types that can key a [`CopyMap`].
pub trait SlotIndex: Copy + Eq {
    fn slot(self) -> usize;
}

impl SlotIndex for NodeIndex {
    fn slot(self) -> usize {
        self.index()
    }
}

impl SlotIndex for EdgeIndex {
    fn slot(self) -> usize {
        self.index()
    }
}

/// Bidirectional original-to-copy handle map.
#[derive(Debug, Clone, Default)]
pub struct CopyMap<I: SlotIndex> {
    fwd: Vec<Option<I>>,
    rev: Vec<Option<I>>,
}

/// Original atom to copied atom.
pub type AtomMap = CopyMap<NodeIndex>;
/// Original bond to copied bond.
pub type BondMap = CopyMap<EdgeIndex>;

impl<I: SlotIndex> CopyMap<I> {
    pub fn new() -> Self {
        Self {
            fwd: Vec::new(),
            rev: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fwd: Vec::with_capacity(capacity),
            rev: Vec::with_capacity(capacity),
        }
    }

    /// Maps `original` to `copy`, replacing any previous image.
    pub fn insert(&mut self, original: I, copy: I) {
        if let Some(Some(previous)) = self.fwd.get(original.slot()) {
            let stale = previous.slot();
            if stale < self.rev.len() {
                self.rev[stale] = None;
            }
        }
        grow_to(&mut self.fwd, original.slot());
        self.fwd[original.slot()] = Some(copy);
        grow_to(&mut self.rev, copy.slot());
        self.rev[copy.slot()] = Some(original);
    }

    /// Image of `original` in the copy, if one is mapped.
    pub fn get(&self, original: I) -> Option<I> {
        self.fwd.get(original.slot()).copied().flatten()
    }

    /// Original handle a copied entity came from, if any.
    pub fn original_of(&self, copy: I) -> Option<I> {
        self.rev.get(copy.slot()).copied().flatten()
    }

    /// Clears the entry for `original` and returns its former image.
    pub fn remove(&mut self, original: I) -> Option<I> {
        let copy = self.fwd.get_mut(original.slot())?.take()?;
        if let Some(slot) = self.rev.get_mut(copy.slot()) {
            *slot = None;
        }
        Some(copy)
    }

    /// Clears the entry whose image is `copy`, if one exists.
    pub fn remove_by_copy(&mut self, copy: I) {
        if let Some(original) = self.original_of(copy) {
            self.remove(original);
        }
    }

    /// Number of mapped entries.
    pub fn len(&self) -> usize {
        self.fwd.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.fwd.iter().all(|slot| slot.is_none())
    }
}

fn grow_to<T>(vec: &mut Vec<Option<T>>, slot: usize) {
    if vec.len() <= slot {
        vec.resize_with(slot + 1, || None);
    }
}

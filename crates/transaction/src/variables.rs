use std::collections::{BTreeMap, btree_map};

use allocator::Compaction;

/// Maps variable names to the start address of the block they are bound to.
///
/// Several names may share an address; the allocator's reference count for
/// that block mirrors the number of names bound to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    bindings: BTreeMap<String, usize>,
}

impl VariableTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<usize> {
        self.bindings.get(name).copied()
    }

    /// Binds `name` to `address`, returning the address it was bound to
    /// before.
    pub fn bind(&mut self, name: &str, address: usize) -> Option<usize> {
        self.bindings.insert(name.to_owned(), address)
    }

    pub fn unbind(&mut self, name: &str) -> Option<usize> {
        self.bindings.remove(name)
    }

    /// Returns the number of names bound to `address`.
    #[must_use]
    pub fn aliases(&self, address: usize) -> usize {
        self.bindings
            .values()
            .filter(|&&bound| bound == address)
            .count()
    }

    /// Rewrites every binding whose block was moved by `compaction`.
    ///
    /// Returns the number of bindings that changed.
    pub fn apply_compaction(&mut self, compaction: &Compaction) -> usize {
        let mut updated = 0;
        for address in self.bindings.values_mut() {
            if let Some(to) = compaction.relocated(*address) {
                *address = to;
                updated += 1;
            }
        }
        updated
    }

    /// Returns an iterator over the bindings, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.bindings
            .iter()
            .map(|(name, &address)| (name.as_str(), address))
    }
}

impl<'a> IntoIterator for &'a VariableTable {
    type Item = (&'a String, &'a usize);
    type IntoIter = btree_map::Iter<'a, String, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

//! An ordered, singly linked collection of address ranges.
//!
//! `BlockList` stores [`Block`]s describing disjoint byte ranges of a
//! simulated address space. Link order is whatever order the owner builds:
//! [`push_front`](BlockList::push_front) prepends, and the `Extend` and
//! `FromIterator` impls append in iteration order. The list never reorders
//! its blocks on its own.
//!
//! # Storage
//!
//! Nodes live in a growable table of slots and are linked by slot index
//! rather than by pointer:
//!
//! ```text
//! head ──▶ slot 2 ──▶ slot 0 ──▶ slot 3 ──▶ (end)
//! vacant ─▶ slot 1 ──▶ (end)
//! ```
//!
//! Removing a block releases its slot onto the vacant chain, and the next
//! insertion reuses it. Every slot carries a generation counter that is
//! bumped on release, so a [`BlockId`] obtained before a removal can never
//! resolve to a block inserted later into the same slot.
//!
//! # Examples
//!
//! ```
//! use block_list::{Block, BlockList};
//!
//! let mut list = BlockList::new();
//! list.push_front(Block::new(100, 924));
//! let id = list.push_front(Block::new(0, 100).with_ref_count(1));
//!
//! assert_eq!(list.find_by_start(0), Some(id));
//! assert_eq!(list.remove(id), Some(Block::new(0, 100).with_ref_count(1)));
//! assert_eq!(list.get(id), None); // stale handle
//!
//! let starts: Vec<_> = list.iter().map(|b| b.start).collect();
//! assert_eq!(starts, vec![100]);
//! ```
//!
//! # Performance
//!
//! - Insert at head or tail: O(1) amortized
//! - Search and removal: O(n), where n is the number of blocks
//! - Iteration: O(1) per element

use core::{iter::FusedIterator, ops::Range};

/// A contiguous range `[start, start + size)` of the simulated address space.
///
/// `ref_count` is only meaningful while the block sits in a used list; free
/// blocks keep whatever value they had when released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    /// Byte offset of the first byte of the block.
    pub start: usize,
    /// Length of the block in bytes.
    pub size: usize,
    /// Number of live bindings that refer to this block.
    pub ref_count: usize,
}

impl Block {
    /// Creates a block with a zero reference count.
    #[must_use]
    pub const fn new(start: usize, size: usize) -> Self {
        Self {
            start,
            size,
            ref_count: 0,
        }
    }

    /// Returns the same block with its reference count replaced.
    #[must_use]
    pub const fn with_ref_count(self, ref_count: usize) -> Self {
        Self { ref_count, ..self }
    }

    /// Returns the offset one past the last byte of the block.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.size
    }

    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Returns `true` if `next` begins exactly where `self` ends.
    #[must_use]
    pub const fn abuts(&self, next: &Self) -> bool {
        self.end() == next.start
    }

    /// Returns `true` if the two blocks share at least one byte.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// A handle to a block stored in a [`BlockList`].
///
/// Handles stay valid until the block is removed. After that, lookups with
/// the handle return `None`, even if the slot has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display("#{index}@{generation}")]
pub struct BlockId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone)]
enum Entry {
    Occupied { block: Block, next: Option<usize> },
    Vacant { next_vacant: Option<usize> },
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entry: Entry,
}

/// A singly linked list of [`Block`]s backed by an index-addressed arena.
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    slots: Vec<Slot>,
    head: Option<usize>,
    tail: Option<usize>,
    vacant: Option<usize>,
    len: usize,
}

impl BlockList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of blocks in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the sum of the sizes of all blocks.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.iter().map(|block| block.size).sum()
    }

    /// Inserts `block` at the head of the list.
    pub fn push_front(&mut self, block: Block) -> BlockId {
        let index = self.occupy(block, self.head);
        self.head = Some(index);
        if self.tail.is_none() {
            self.tail = Some(index);
        }
        self.id_at(index)
    }

    /// Appends `block` at the tail of the list.
    pub fn push_back(&mut self, block: Block) -> BlockId {
        let index = self.occupy(block, None);
        match self.tail {
            Some(tail) => self.set_next(tail, Some(index)),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.id_at(index)
    }

    /// Returns the handle of the first block in link order.
    #[must_use]
    pub fn head(&self) -> Option<BlockId> {
        self.head.map(|index| self.id_at(index))
    }

    /// Returns the handle of the block linked after `id`.
    ///
    /// Returns `None` if `id` is the last block or is stale.
    #[must_use]
    pub fn next(&self, id: BlockId) -> Option<BlockId> {
        let index = self.resolve(id)?;
        let (_, next) = self.link(index)?;
        next.map(|next| self.id_at(next))
    }

    #[must_use]
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        let index = self.resolve(id)?;
        self.link(index).map(|(block, _)| block)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        let index = self.resolve(id)?;
        match &mut self.slots[index].entry {
            Entry::Occupied { block, .. } => Some(block),
            Entry::Vacant { .. } => None,
        }
    }

    /// Returns the first block, in link order, for which `pred` holds.
    pub fn find<P>(&self, mut pred: P) -> Option<BlockId>
    where
        P: FnMut(&Block) -> bool,
    {
        self.ids().find(|&id| self.get(id).is_some_and(&mut pred))
    }

    /// Like [`find`](Self::find), but also hands out the matching block for
    /// in-place modification.
    pub fn find_mut<P>(&mut self, pred: P) -> Option<(BlockId, &mut Block)>
    where
        P: FnMut(&Block) -> bool,
    {
        let id = self.find(pred)?;
        let block = self.get_mut(id)?;
        Some((id, block))
    }

    /// Returns the first block, in link order, starting at `start`.
    #[must_use]
    pub fn find_by_start(&self, start: usize) -> Option<BlockId> {
        self.find(|block| block.start == start)
    }

    /// Unlinks the block identified by `id` and releases its slot.
    ///
    /// Returns `None` if `id` is stale.
    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        let target = self.resolve(id)?;

        let mut prev = None;
        let mut cursor = self.head;
        while cursor != Some(target) {
            let index = cursor?;
            prev = Some(index);
            cursor = self.link(index)?.1;
        }

        let (&block, next) = self.link(target)?;
        match prev {
            Some(prev) => self.set_next(prev, next),
            None => self.head = next,
        }
        if self.tail == Some(target) {
            self.tail = prev;
        }

        let slot = &mut self.slots[target];
        slot.generation = slot.generation.wrapping_add(1);
        slot.entry = Entry::Vacant {
            next_vacant: self.vacant,
        };
        self.vacant = Some(target);
        self.len -= 1;

        Some(block)
    }

    /// Returns an iterator over the blocks in link order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    /// Returns an iterator over the block handles in link order.
    #[must_use]
    pub fn ids(&self) -> Ids<'_> {
        Ids {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    fn occupy(&mut self, block: Block, next: Option<usize>) -> usize {
        self.len += 1;
        let entry = Entry::Occupied { block, next };
        let reusable = self
            .vacant
            .and_then(|index| match self.slots.get(index)?.entry {
                Entry::Vacant { next_vacant } => Some((index, next_vacant)),
                Entry::Occupied { .. } => None,
            });
        let Some((index, next_vacant)) = reusable else {
            self.slots.push(Slot {
                generation: 0,
                entry,
            });
            return self.slots.len() - 1;
        };

        self.vacant = next_vacant;
        self.slots[index].entry = entry;
        index
    }

    fn id_at(&self, index: usize) -> BlockId {
        BlockId {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn resolve(&self, id: BlockId) -> Option<usize> {
        let slot = self.slots.get(id.index)?;
        (slot.generation == id.generation && matches!(slot.entry, Entry::Occupied { .. }))
            .then_some(id.index)
    }

    fn link(&self, index: usize) -> Option<(&Block, Option<usize>)> {
        match &self.slots.get(index)?.entry {
            Entry::Occupied { block, next } => Some((block, *next)),
            Entry::Vacant { .. } => None,
        }
    }

    fn set_next(&mut self, index: usize, new_next: Option<usize>) {
        if let Some(Slot {
            entry: Entry::Occupied { next, .. },
            ..
        }) = self.slots.get_mut(index)
        {
            *next = new_next;
        }
    }
}

impl FromIterator<Block> for BlockList {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        let mut this = Self::new();
        this.extend(iter);
        this
    }
}

impl Extend<Block> for BlockList {
    fn extend<T: IntoIterator<Item = Block>>(&mut self, iter: T) {
        for block in iter {
            self.push_back(block);
        }
    }
}

impl<'a> IntoIterator for &'a BlockList {
    type Item = &'a Block;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the blocks of a [`BlockList`] in link order.
///
/// This struct is created by [`BlockList::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    list: &'a BlockList,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let (block, next) = self.list.link(index)?;
        self.cursor = next;
        self.remaining -= 1;
        Some(block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}
impl FusedIterator for Iter<'_> {}

/// An iterator over the block handles of a [`BlockList`] in link order.
///
/// This struct is created by [`BlockList::ids`].
#[derive(Debug, Clone)]
pub struct Ids<'a> {
    list: &'a BlockList,
    cursor: Option<usize>,
    remaining: usize,
}

impl Iterator for Ids<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        self.cursor = self.list.link(index)?.1;
        self.remaining -= 1;
        Some(self.list.id_at(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Ids<'_> {}
impl FusedIterator for Ids<'_> {}

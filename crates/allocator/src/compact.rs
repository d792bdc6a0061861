//! Single-pass compaction of the used list.
//!
//! Compaction walks the used list in link order and slides a used block down
//! into the free block (the *hole*) that sits directly in front of it. The
//! hole moves up behind the block and keeps its size:
//!
//! ```text
//! before:  │ hole (100,100) │ used (200,100) │ free (300,50) │
//! after:   │ used (100,100) │ hole (200,100) │ free (300,50) │
//! merged:  │ used (100,100) │ hole (200,150)                 │
//! ```
//!
//! The walk is driven by a cursor that starts at the first block of the free
//! list and then follows the end of the last hole it moved. A used block
//! only moves when a hole starts exactly at the cursor *and* ends exactly
//! where the block begins; otherwise the block stays put and the cursor is
//! left unchanged. After a move, the hole absorbs the free block linked
//! right after it if the two now touch.
//!
//! This is a best-effort pass: the free list is neither sorted nor
//! revisited, so fragmentation that does not line up with the cursor chain
//! survives.

use block_list::{Block, BlockId};

use crate::RefCountAllocator;

/// A used block that was moved by [`RefCountAllocator::compact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display("{from} -> {to} ({size} bytes)")]
pub struct Relocation {
    pub from: usize,
    pub to: usize,
    pub size: usize,
}

/// What a compaction pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compaction {
    /// Moved used blocks, in used-list order.
    pub relocations: Vec<Relocation>,
    /// Number of free blocks absorbed into a neighbour.
    pub merged: usize,
}

impl Compaction {
    /// Returns `true` if the pass changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.relocations.is_empty() && self.merged == 0
    }

    /// Returns the new start address of a block that used to start at
    /// `address`, if it was moved.
    #[must_use]
    pub fn relocated(&self, address: usize) -> Option<usize> {
        self.relocations
            .iter()
            .find(|relocation| relocation.from == address)
            .map(|relocation| relocation.to)
    }
}

impl RefCountAllocator {
    /// Slides used blocks toward address zero and coalesces the holes they
    /// leave behind.
    ///
    /// The new free list is built on a working copy and swapped in once the
    /// pass is over; used blocks are updated in place.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::num::NonZeroUsize;
    ///
    /// use allocator::RefCountAllocator;
    ///
    /// let nz = |n| NonZeroUsize::new(n).unwrap();
    /// let mut allocator = RefCountAllocator::new(nz(350));
    /// let a = allocator.allocate(nz(100)).unwrap().address;
    /// let b = allocator.allocate(nz(100)).unwrap().address;
    /// let c = allocator.allocate(nz(100)).unwrap().address;
    /// allocator.deallocate(b).unwrap();
    ///
    /// let compaction = allocator.compact();
    /// assert_eq!(compaction.relocated(c), Some(100));
    /// assert_eq!(compaction.relocated(a), None);
    /// assert_eq!(compaction.merged, 1);
    /// ```
    pub fn compact(&mut self) -> Compaction {
        let mut holes: Vec<Block> = self.free.iter().copied().collect();
        let mut compaction = Compaction::default();

        let Some(mut cursor) = holes.first().map(|hole| hole.start) else {
            return compaction;
        };

        let mut next_used = self.used.head();
        while let Some(id) = next_used {
            next_used = self.used.next(id);
            if let Some(end) = self.slide(id, cursor, &mut holes, &mut compaction) {
                cursor = end;
            }
        }

        self.free = holes.into_iter().collect();
        compaction
    }

    /// Moves one used block into the hole starting at `cursor`.
    ///
    /// Returns the end of the (possibly merged) hole, which becomes the next
    /// cursor, or `None` if the block could not be moved.
    fn slide(
        &mut self,
        id: BlockId,
        cursor: usize,
        holes: &mut Vec<Block>,
        compaction: &mut Compaction,
    ) -> Option<usize> {
        let block = self.used.get_mut(id)?;
        let index = holes.iter().position(|hole| hole.start == cursor)?;
        let hole = &mut holes[index];
        if !hole.abuts(block) {
            return None;
        }

        compaction.relocations.push(Relocation {
            from: block.start,
            to: hole.start,
            size: block.size,
        });
        block.start = hole.start;
        hole.start += block.size;

        let absorbed = holes
            .get(index + 1)
            .copied()
            .filter(|next| holes[index].abuts(next));
        if let Some(next) = absorbed {
            holes[index].size += next.size;
            holes.remove(index + 1);
            compaction.merged += 1;
        }

        Some(holes[index].end())
    }
}

//! Reference-counted first-fit allocator over a simulated address space.
//!
//! The allocator tracks byte ranges of `[0, memory_chunk)` in two
//! [`BlockList`]s: one for blocks currently bound to at least one owner and
//! one for blocks nobody owns. No memory is actually handed out; addresses
//! are plain offsets.
//!
//! ```text
//! used: (300,50,rc=2) ─▶ (0,100,rc=1)
//! free: (350,674) ─▶ (100,200)
//!
//! 0        100            300   350                        1024
//! ├────────┼──────────────┼─────┼───────────────────────────┤
//! │ used   │ free         │used │ free                      │
//! ```
//!
//! # Algorithm
//!
//! - **Allocation**: first-fit over the free list in link order. The chosen
//!   free block is shrunk from the front; it is dropped once it reaches zero
//!   bytes. The new used block is prepended to the used list.
//! - **Fallback**: when first-fit fails, one [`compact`] pass runs and the
//!   request is retried exactly once.
//! - **Deallocation**: decrements the reference count; the block moves to
//!   the head of the free list only when the count reaches zero. Freed
//!   blocks are not coalesced at this point.
//!
//! [`compact`]: RefCountAllocator::compact

use core::num::NonZeroUsize;

use block_list::{Block, BlockList};
use snafu::OptionExt as _;

use crate::{
    compact::Compaction,
    error::{Action, AllocationFailureSnafu, AllocatorError, UnknownAddressSnafu},
    status::{FreeBlock, MemoryStatus, UsedBlock},
};

/// The result of a successful [`RefCountAllocator::allocate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Start address of the new used block.
    pub address: usize,
    /// The compaction pass that made room for the block, if one was needed.
    pub compaction: Option<Compaction>,
}

/// The result of a successful [`RefCountAllocator::deallocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Release {
    /// The block is still referenced and stays in the used list.
    Shared { remaining: usize },
    /// The last reference went away and the block moved to the free list.
    Freed { start: usize, size: usize },
}

/// A first-fit allocator with reference-counted used blocks.
///
/// Requests are served from the first free block in link order that is large
/// enough. If none is, one [`compact`](Self::compact) pass runs and the
/// request is retried once.
#[derive(Debug, Clone)]
pub struct RefCountAllocator {
    memory_chunk: NonZeroUsize,
    pub(crate) used: BlockList,
    pub(crate) free: BlockList,
}

impl RefCountAllocator {
    /// Creates an allocator whose whole address space is one free block.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::num::NonZeroUsize;
    ///
    /// use allocator::RefCountAllocator;
    ///
    /// let allocator = RefCountAllocator::new(NonZeroUsize::new(1024).unwrap());
    /// let status = allocator.status();
    /// assert!(status.used.is_empty());
    /// assert_eq!(status.free_bytes(), 1024);
    /// ```
    #[must_use]
    pub fn new(memory_chunk: NonZeroUsize) -> Self {
        let mut free = BlockList::new();
        free.push_front(Block::new(0, memory_chunk.get()));
        Self {
            memory_chunk,
            used: BlockList::new(),
            free,
        }
    }

    /// Returns the size of the managed address space in bytes.
    #[must_use]
    pub fn memory_chunk(&self) -> usize {
        self.memory_chunk.get()
    }

    /// Performs a single first-fit attempt without any fallback.
    ///
    /// Returns the start address of the new used block, or `None` if no free
    /// block in the list is at least `size` bytes long.
    pub fn allocate_block(&mut self, size: NonZeroUsize) -> Option<usize> {
        let size = size.get();
        let (id, hole) = self.free.find_mut(|block| block.size >= size)?;

        let start = hole.start;
        hole.start += size;
        hole.size -= size;
        if hole.size == 0 {
            self.free.remove(id);
        }

        self.used.push_front(Block::new(start, size).with_ref_count(1));
        Some(start)
    }

    /// Allocates `size` bytes, compacting once if first-fit fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::num::NonZeroUsize;
    ///
    /// use allocator::RefCountAllocator;
    ///
    /// let mut allocator = RefCountAllocator::new(NonZeroUsize::new(1024).unwrap());
    /// let a = allocator.allocate(NonZeroUsize::new(100).unwrap()).unwrap();
    /// let b = allocator.allocate(NonZeroUsize::new(200).unwrap()).unwrap();
    /// assert_eq!((a.address, b.address), (0, 100));
    ///
    /// assert!(allocator.allocate(NonZeroUsize::new(2048).unwrap()).is_err());
    /// ```
    pub fn allocate(&mut self, size: NonZeroUsize) -> Result<Allocation, AllocatorError> {
        if let Some(address) = self.allocate_block(size) {
            return Ok(Allocation {
                address,
                compaction: None,
            });
        }

        let compaction = self.compact();
        match self.allocate_block(size) {
            Some(address) => Ok(Allocation {
                address,
                compaction: Some(compaction),
            }),
            None => AllocationFailureSnafu {
                size: size.get(),
                compaction,
            }
            .fail(),
        }
    }

    /// Drops one reference to the used block starting at `address`.
    pub fn deallocate(&mut self, address: usize) -> Result<Release, AllocatorError> {
        let selector = UnknownAddressSnafu {
            address,
            action: Action::Deallocate,
        };
        let (id, block) = self
            .used
            .find_mut(|block| block.start == address)
            .context(selector)?;

        debug_assert!(block.ref_count > 0, "used block must be referenced");
        block.ref_count -= 1;
        if block.ref_count > 0 {
            return Ok(Release::Shared {
                remaining: block.ref_count,
            });
        }

        let block = self.used.remove(id).context(selector)?;
        self.free.push_front(block);
        Ok(Release::Freed {
            start: block.start,
            size: block.size,
        })
    }

    /// Adds one reference to the used block starting at `address`.
    ///
    /// Returns the new reference count.
    pub fn retain(&mut self, address: usize) -> Result<usize, AllocatorError> {
        let (_, block) = self
            .used
            .find_mut(|block| block.start == address)
            .context(UnknownAddressSnafu {
                address,
                action: Action::Retain,
            })?;
        block.ref_count += 1;
        Ok(block.ref_count)
    }

    /// Returns the reference count of the used block starting at `address`.
    #[must_use]
    pub fn ref_count(&self, address: usize) -> Option<usize> {
        let id = self.used.find_by_start(address)?;
        self.used.get(id).map(|block| block.ref_count)
    }

    /// Takes a snapshot of both lists in link order.
    #[must_use]
    pub fn status(&self) -> MemoryStatus {
        MemoryStatus {
            used: self
                .used
                .iter()
                .map(|block| UsedBlock {
                    start: block.start,
                    size: block.size,
                    ref_count: block.ref_count,
                })
                .collect(),
            free: self
                .free
                .iter()
                .map(|block| FreeBlock {
                    start: block.start,
                    size: block.size,
                })
                .collect(),
        }
    }
}

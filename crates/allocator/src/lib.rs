//! A simulated first-fit allocator with reference-counted blocks.
//!
//! This crate models allocation over a fixed, purely numeric address space
//! `[0, memory_chunk)`. It never touches real memory: an "address" is a byte
//! offset, and the allocator only keeps books on which ranges are in use.
//!
//! # Model
//!
//! [`RefCountAllocator`] owns two [`BlockList`](block_list::BlockList)s:
//!
//! - **used**: blocks bound to at least one owner, each with a reference
//!   count of one or more
//! - **free**: blocks nobody owns
//!
//! Together the two lists cover the whole address space without overlap,
//! and their sizes always add up to `memory_chunk`. Both properties can be
//! verified at any time with
//! [`check_invariants`](RefCountAllocator::check_invariants).
//!
//! # Operations
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`allocate`](RefCountAllocator::allocate) | first-fit, one compaction retry |
//! | [`deallocate`](RefCountAllocator::deallocate) | drop a reference, free at zero |
//! | [`retain`](RefCountAllocator::retain) | add a reference |
//! | [`compact`](RefCountAllocator::compact) | single best-effort defragmentation pass |
//! | [`status`](RefCountAllocator::status) | snapshot of both lists |
//!
//! Every operation reports its outcome as a value; nothing is printed and
//! nothing aborts. Callers decide how to render [`AllocatorError`]s.
//!
//! # Usage Example
//!
//! ```rust
//! use core::num::NonZeroUsize;
//!
//! use allocator::{Release, RefCountAllocator};
//!
//! let nz = |n| NonZeroUsize::new(n).unwrap();
//! let mut allocator = RefCountAllocator::new(nz(1024));
//!
//! let a = allocator.allocate(nz(100)).unwrap().address;
//! assert_eq!(a, 0);
//!
//! // a second owner for the same block
//! allocator.retain(a).unwrap();
//! assert_eq!(allocator.deallocate(a).unwrap(), Release::Shared { remaining: 1 });
//! assert!(allocator.deallocate(a).unwrap().is_freed());
//!
//! allocator.check_invariants().unwrap();
//! println!("{}", allocator.status());
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub use self::{
    compact::{Compaction, Relocation},
    error::{Action, AllocatorError, InvariantError},
    ref_counted::{Allocation, RefCountAllocator, Release},
    status::{FreeBlock, MemoryStatus, UsedBlock},
};

mod compact;
mod error;
mod invariant;
mod ref_counted;
mod status;

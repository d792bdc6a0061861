use core::ops::Range;

use snafu::Snafu;
use snafu_utils::Location;

use crate::compact::Compaction;

/// The operation that was looking for a used block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Action {
    #[display("deallocation")]
    Deallocate,
    #[display("reference count increase")]
    Retain,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AllocatorError {
    /// No free block was large enough, even after one compaction pass.
    ///
    /// The compaction may still have relocated used blocks, so it is kept
    /// here for the caller to act on.
    #[snafu(display("unable to allocate memory of size {size}"))]
    AllocationFailure {
        size: usize,
        compaction: Compaction,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("block at address {address} not found for {action}"))]
    UnknownAddress {
        address: usize,
        action: Action,
        #[snafu(implicit)]
        location: Location,
    },
}

impl AllocatorError {
    /// Returns the compaction that ran before the request was given up.
    #[must_use]
    pub fn compaction(&self) -> Option<&Compaction> {
        match self {
            Self::AllocationFailure { compaction, .. } => Some(compaction),
            Self::UnknownAddress { .. } => None,
        }
    }
}

/// A violated structural invariant of the allocator state.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum InvariantError {
    #[snafu(display("block at address {start} is empty"))]
    ZeroSize {
        start: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("used block at address {start} has no references"))]
    ZeroRefCount {
        start: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display(
        "block {}..{} exceeds memory chunk of {memory_chunk} bytes",
        range.start, range.end
    ))]
    OutOfBounds {
        range: Range<usize>,
        memory_chunk: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display(
        "blocks {}..{} and {}..{} overlap",
        first.start, first.end, second.start, second.end
    ))]
    Overlap {
        first: Range<usize>,
        second: Range<usize>,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("blocks cover {actual} bytes, expected {expected}"))]
    SizeMismatch {
        expected: usize,
        actual: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

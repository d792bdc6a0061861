use snafu::ensure;

use crate::{
    RefCountAllocator,
    error::{
        InvariantError, OutOfBoundsSnafu, OverlapSnafu, SizeMismatchSnafu, ZeroRefCountSnafu,
        ZeroSizeSnafu,
    },
};

impl RefCountAllocator {
    /// Verifies the structural invariants of both lists.
    ///
    /// - every block is non-empty and lies inside `[0, memory_chunk)`
    /// - every used block has at least one reference
    /// - no two blocks, used or free, overlap
    /// - block sizes add up to `memory_chunk`
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let memory_chunk = self.memory_chunk();

        for block in self.used.iter().chain(&self.free) {
            ensure!(block.size > 0, ZeroSizeSnafu { start: block.start });
            ensure!(
                block.end() <= memory_chunk,
                OutOfBoundsSnafu {
                    range: block.range(),
                    memory_chunk,
                }
            );
        }
        for block in &self.used {
            ensure!(
                block.ref_count > 0,
                ZeroRefCountSnafu { start: block.start }
            );
        }

        let mut blocks: Vec<_> = self.used.iter().chain(&self.free).collect();
        blocks.sort_unstable_by_key(|block| block.start);
        for pair in blocks.windows(2) {
            let [first, second] = pair else {
                continue;
            };
            ensure!(
                !first.overlaps(second),
                OverlapSnafu {
                    first: first.range(),
                    second: second.range(),
                }
            );
        }

        let actual = self.used.total_size() + self.free.total_size();
        ensure!(
            actual == memory_chunk,
            SizeMismatchSnafu {
                expected: memory_chunk,
                actual,
            }
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::num::NonZeroUsize;

    use block_list::Block;

    use super::*;

    fn allocator(memory_chunk: usize) -> RefCountAllocator {
        RefCountAllocator::new(NonZeroUsize::new(memory_chunk).unwrap())
    }

    #[test]
    fn test_fresh_allocator_is_consistent() {
        allocator(4096).check_invariants().unwrap();
    }

    #[test]
    fn test_detects_overlap() {
        let mut allocator = allocator(100);
        allocator.used = [Block::new(0, 60).with_ref_count(1)].into_iter().collect();
        allocator.free = [Block::new(50, 50)].into_iter().collect();
        let err = allocator.check_invariants().unwrap_err();
        assert!(matches!(err, InvariantError::Overlap { .. }));
        assert_eq!(err.to_string(), "blocks 0..60 and 50..100 overlap");
    }

    #[test]
    fn test_touching_blocks_do_not_overlap() {
        let mut allocator = allocator(100);
        allocator.used = [Block::new(50, 50).with_ref_count(2)]
            .into_iter()
            .collect();
        allocator.free = [Block::new(0, 50)].into_iter().collect();
        allocator.check_invariants().unwrap();
    }

    #[test]
    fn test_detects_lost_bytes() {
        let mut allocator = allocator(100);
        allocator.free = [Block::new(0, 90)].into_iter().collect();
        let err = allocator.check_invariants().unwrap_err();
        assert!(matches!(
            err,
            InvariantError::SizeMismatch {
                expected: 100,
                actual: 90,
                ..
            }
        ));
    }

    #[test]
    fn test_detects_unreferenced_used_block() {
        let mut allocator = allocator(100);
        allocator.used = [Block::new(0, 10)].into_iter().collect();
        allocator.free = [Block::new(10, 90)].into_iter().collect();
        let err = allocator.check_invariants().unwrap_err();
        assert!(matches!(err, InvariantError::ZeroRefCount { start: 0, .. }));
    }

    #[test]
    fn test_detects_out_of_bounds_and_empty_blocks() {
        let mut allocator = allocator(100);
        allocator.free = [Block::new(50, 60)].into_iter().collect();
        assert!(matches!(
            allocator.check_invariants().unwrap_err(),
            InvariantError::OutOfBounds { .. }
        ));

        allocator.free = [Block::new(0, 100), Block::new(100, 0)]
            .into_iter()
            .collect();
        assert!(matches!(
            allocator.check_invariants().unwrap_err(),
            InvariantError::ZeroSize { start: 100, .. }
        ));
    }
}

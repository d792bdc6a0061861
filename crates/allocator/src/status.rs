use core::fmt;

/// A used block as seen in a [`MemoryStatus`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsedBlock {
    pub start: usize,
    pub size: usize,
    pub ref_count: usize,
}

/// A free block as seen in a [`MemoryStatus`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    pub start: usize,
    pub size: usize,
}

/// A read-only snapshot of both block lists, each in link order.
///
/// The `Display` impl renders the status report:
///
/// ```text
/// Used Blocks:
/// Address: 100, Size: 200, Reference Count: 1
/// Address: 0, Size: 100, Reference Count: 2
///
/// Free Blocks:
/// Address: 300, Size: 724
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStatus {
    pub used: Vec<UsedBlock>,
    pub free: Vec<FreeBlock>,
}

impl MemoryStatus {
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.used.iter().map(|block| block.size).sum()
    }

    #[must_use]
    pub fn free_bytes(&self) -> usize {
        self.free.iter().map(|block| block.size).sum()
    }

    /// Returns the size of the largest free block, or 0 if there is none.
    #[must_use]
    pub fn largest_free(&self) -> usize {
        self.free.iter().map(|block| block.size).max().unwrap_or(0)
    }
}

impl fmt::Display for MemoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Used Blocks:")?;
        for block in &self.used {
            writeln!(
                f,
                "Address: {}, Size: {}, Reference Count: {}",
                block.start, block.size, block.ref_count
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Free Blocks:")?;
        for block in &self.free {
            writeln!(f, "Address: {}, Size: {}", block.start, block.size)?;
        }
        Ok(())
    }
}

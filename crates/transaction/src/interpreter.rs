use core::{fmt, num::NonZeroUsize};
use std::io::BufRead;

use allocator::{Compaction, RefCountAllocator, Release};
use snafu::{OptionExt as _, ResultExt as _};

use crate::{
    error::{ReadSnafu, TransactionError, UnboundVariableSnafu},
    parse::Transaction,
    variables::VariableTable,
};

/// What a successfully executed line did.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::IsVariant)]
pub enum Outcome {
    Allocated {
        var: String,
        address: usize,
        compaction: Option<Compaction>,
    },
    Released {
        var: String,
        address: usize,
        release: Release,
    },
    Aliased {
        dst: String,
        address: usize,
        ref_count: usize,
    },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocated {
                var,
                address,
                compaction,
            } => {
                write!(f, "{var} -> {address}")?;
                if let Some(compaction) = compaction {
                    write!(
                        f,
                        " after compaction ({} moved, {} merged)",
                        compaction.relocations.len(),
                        compaction.merged
                    )?;
                }
                Ok(())
            }
            Self::Released {
                var,
                address,
                release: Release::Shared { remaining },
            } => write!(f, "{var} released {address}, {remaining} reference(s) left"),
            Self::Released {
                var,
                address,
                release: Release::Freed { size, .. },
            } => write!(f, "{var} released {address}, {size} bytes freed"),
            Self::Aliased {
                dst,
                address,
                ref_count,
            } => write!(f, "{dst} -> {address}, reference count {ref_count}"),
        }
    }
}

/// Counters collected by [`Interpreter::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lines: usize,
    pub executed: usize,
    pub failed: usize,
}

/// Executes transactions against an allocator and a variable table.
///
/// # Examples
///
/// ```
/// use core::num::NonZeroUsize;
///
/// use transaction::Interpreter;
///
/// let mut interpreter = Interpreter::new(NonZeroUsize::new(1024).unwrap());
/// interpreter.execute_line("a = allocate 100").unwrap();
/// interpreter.execute_line("b = a").unwrap();
///
/// assert_eq!(interpreter.variables().get("b"), Some(0));
/// assert_eq!(interpreter.allocator().ref_count(0), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct Interpreter {
    allocator: RefCountAllocator,
    variables: VariableTable,
}

impl Interpreter {
    #[must_use]
    pub fn new(memory_chunk: NonZeroUsize) -> Self {
        Self::with_allocator(RefCountAllocator::new(memory_chunk))
    }

    #[must_use]
    pub fn with_allocator(allocator: RefCountAllocator) -> Self {
        Self {
            allocator,
            variables: VariableTable::new(),
        }
    }

    #[must_use]
    pub fn allocator(&self) -> &RefCountAllocator {
        &self.allocator
    }

    #[must_use]
    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Parses and executes one line.
    pub fn execute_line(&mut self, line: &str) -> Result<Outcome, TransactionError> {
        let transaction = Transaction::parse(line)?;
        self.execute(&transaction)
    }

    /// Executes one transaction.
    ///
    /// On error, neither the allocator nor the variable table is left
    /// half-updated: a failed transaction changes no binding, except that
    /// bindings are always kept in step with blocks moved by compaction.
    pub fn execute(&mut self, transaction: &Transaction) -> Result<Outcome, TransactionError> {
        match transaction {
            Transaction::Allocate { var, size } => self.allocate(var, *size),
            Transaction::Free { var } => self.free(var),
            Transaction::Alias { dst, src } => self.alias(dst, src),
        }
    }

    /// Executes every line of `reader`.
    ///
    /// `on_line` is called with the 1-based line number, the raw line and
    /// its result. Transaction errors do not stop the run; only a failure
    /// to read from `reader` does.
    pub fn run<R, F>(&mut self, reader: R, mut on_line: F) -> Result<RunSummary, TransactionError>
    where
        R: BufRead,
        F: FnMut(&Self, usize, &str, Result<Outcome, TransactionError>),
    {
        let mut summary = RunSummary::default();
        for (index, line) in reader.lines().enumerate() {
            let number = index + 1;
            let line = line.context(ReadSnafu { line: number })?;

            let result = self.execute_line(&line);
            summary.lines += 1;
            if result.is_ok() {
                summary.executed += 1;
            } else {
                summary.failed += 1;
            }
            on_line(self, number, &line, result);
        }
        Ok(summary)
    }

    fn allocate(&mut self, var: &str, size: NonZeroUsize) -> Result<Outcome, TransactionError> {
        let allocation = match self.allocator.allocate(size) {
            Ok(allocation) => allocation,
            Err(err) => {
                if let Some(compaction) = err.compaction() {
                    self.variables.apply_compaction(compaction);
                }
                return Err(err.into());
            }
        };
        if let Some(compaction) = &allocation.compaction {
            self.variables.apply_compaction(compaction);
        }

        self.rebind(var, allocation.address)?;
        Ok(Outcome::Allocated {
            var: var.to_owned(),
            address: allocation.address,
            compaction: allocation.compaction,
        })
    }

    fn free(&mut self, var: &str) -> Result<Outcome, TransactionError> {
        let address = self
            .variables
            .get(var)
            .context(UnboundVariableSnafu { name: var })?;
        let release = self.allocator.deallocate(address)?;
        self.variables.unbind(var);
        Ok(Outcome::Released {
            var: var.to_owned(),
            address,
            release,
        })
    }

    fn alias(&mut self, dst: &str, src: &str) -> Result<Outcome, TransactionError> {
        let address = self
            .variables
            .get(src)
            .context(UnboundVariableSnafu { name: src })?;
        self.allocator.retain(address)?;
        self.rebind(dst, address)?;

        let ref_count = self.allocator.ref_count(address).unwrap_or_default();
        Ok(Outcome::Aliased {
            dst: dst.to_owned(),
            address,
            ref_count,
        })
    }

    /// Binds `var` to `address` and drops the reference held by its previous
    /// binding, if any.
    fn rebind(&mut self, var: &str, address: usize) -> Result<(), TransactionError> {
        if let Some(previous) = self.variables.bind(var, address) {
            self.allocator.deallocate(previous)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use allocator::{FreeBlock, UsedBlock};

    use super::*;
    use crate::error::ErrorKind;

    fn interpreter(memory_chunk: usize) -> Interpreter {
        Interpreter::new(NonZeroUsize::new(memory_chunk).unwrap())
    }

    fn exec(interpreter: &mut Interpreter, line: &str) -> Outcome {
        let outcome = interpreter.execute_line(line).unwrap();
        interpreter.allocator().check_invariants().unwrap();
        outcome
    }

    fn kind(interpreter: &mut Interpreter, line: &str) -> ErrorKind {
        interpreter.execute_line(line).unwrap_err().kind()
    }

    #[test]
    fn test_alias_then_free_both() {
        let mut it = interpreter(1024);
        exec(&mut it, "a = allocate 100");
        exec(&mut it, "b = allocate 200");
        assert_eq!(
            exec(&mut it, "c = a"),
            Outcome::Aliased {
                dst: "c".to_owned(),
                address: 0,
                ref_count: 2,
            }
        );

        let outcome = exec(&mut it, "free a");
        assert_eq!(
            outcome,
            Outcome::Released {
                var: "a".to_owned(),
                address: 0,
                release: Release::Shared { remaining: 1 },
            }
        );
        assert_eq!(it.allocator().ref_count(0), Some(1));

        assert!(exec(&mut it, "free c").is_released());
        let status = it.allocator().status();
        assert_eq!(
            status.used,
            vec![UsedBlock {
                start: 100,
                size: 200,
                ref_count: 1
            }]
        );
        assert_eq!(
            status.free,
            vec![
                FreeBlock {
                    start: 0,
                    size: 100
                },
                FreeBlock {
                    start: 300,
                    size: 724
                },
            ]
        );
    }

    #[test]
    fn test_free_unbinds_variable() {
        let mut it = interpreter(64);
        exec(&mut it, "a = allocate 8");
        exec(&mut it, "free a");
        assert_eq!(it.variables().get("a"), None);
        assert_eq!(kind(&mut it, "free a"), ErrorKind::MalformedTransaction);
    }

    #[test]
    fn test_unbound_variables_are_rejected() {
        let mut it = interpreter(64);
        exec(&mut it, "a = allocate 8");
        assert_eq!(kind(&mut it, "free nope"), ErrorKind::MalformedTransaction);
        assert_eq!(kind(&mut it, "b = nope"), ErrorKind::MalformedTransaction);
        assert_eq!(it.allocator().ref_count(0), Some(1));
        assert_eq!(it.variables().len(), 1);
    }

    #[test]
    fn test_blank_line_is_malformed() {
        let mut it = interpreter(64);
        exec(&mut it, "a = allocate 8");
        assert_eq!(kind(&mut it, ""), ErrorKind::MalformedTransaction);
        assert_eq!(kind(&mut it, "  \t"), ErrorKind::MalformedTransaction);
        assert_eq!(it.variables().len(), 1);
        assert_eq!(it.allocator().status().free_bytes(), 56);
    }

    #[test]
    fn test_rebinding_releases_previous_block() {
        let mut it = interpreter(64);
        exec(&mut it, "a = allocate 8");
        exec(&mut it, "b = allocate 8");
        exec(&mut it, "a = b");
        assert_eq!(it.allocator().ref_count(0), None);
        assert_eq!(it.allocator().ref_count(8), Some(2));

        exec(&mut it, "b = allocate 4");
        assert_eq!(it.variables().get("b"), Some(0));
        assert_eq!(it.allocator().ref_count(8), Some(1));
    }

    #[test]
    fn test_self_alias_is_noop() {
        let mut it = interpreter(64);
        exec(&mut it, "a = allocate 8");
        assert_eq!(
            exec(&mut it, "a = a"),
            Outcome::Aliased {
                dst: "a".to_owned(),
                address: 0,
                ref_count: 1,
            }
        );
    }

    #[test]
    fn test_allocation_failure_binds_nothing() {
        let mut it = interpreter(64);
        assert_eq!(kind(&mut it, "a = allocate 65"), ErrorKind::AllocationFailure);
        assert_eq!(it.variables().get("a"), None);
        assert_eq!(it.allocator().status().free_bytes(), 64);
    }

    #[test]
    fn test_compaction_updates_bindings() {
        let mut it = interpreter(350);
        exec(&mut it, "a = allocate 100");
        exec(&mut it, "b = allocate 100");
        exec(&mut it, "c = allocate 100");
        exec(&mut it, "d = c");
        exec(&mut it, "free b");

        let outcome = exec(&mut it, "e = allocate 150");
        let Outcome::Allocated {
            address,
            compaction: Some(compaction),
            ..
        } = outcome
        else {
            panic!("expected allocation after compaction, got {outcome:?}");
        };
        assert_eq!(address, 200);
        assert_eq!(compaction.relocated(200), Some(100));

        assert_eq!(it.variables().get("c"), Some(100));
        assert_eq!(it.variables().get("d"), Some(100));
        assert_eq!(it.allocator().ref_count(100), Some(2));

        // the relocated binding can still be released through both names
        exec(&mut it, "free c");
        exec(&mut it, "free d");
        assert_eq!(it.allocator().ref_count(100), None);
    }

    #[test]
    fn test_run_counts_lines() {
        let mut it = interpreter(128);
        let log = "a = allocate 16\n\nbogus line\nb = a\nfree a\nc = allocate 500\n";
        let mut seen = Vec::new();
        let summary = it
            .run(log.as_bytes(), |_, number, _, result| {
                seen.push((number, result.is_ok()));
            })
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                lines: 6,
                executed: 3,
                failed: 3,
            }
        );
        assert_eq!(
            seen,
            vec![
                (1, true),
                (2, false),
                (3, false),
                (4, true),
                (5, true),
                (6, false)
            ]
        );
        assert_eq!(it.variables().get("b"), Some(0));
    }

    #[test]
    fn test_outcome_display() {
        let mut it = interpreter(64);
        assert_eq!(exec(&mut it, "a = allocate 8").to_string(), "a -> 0");
        assert_eq!(
            exec(&mut it, "b = a").to_string(),
            "b -> 0, reference count 2"
        );
        assert_eq!(
            exec(&mut it, "free a").to_string(),
            "a released 0, 1 reference(s) left"
        );
        assert_eq!(
            exec(&mut it, "free b").to_string(),
            "b released 0, 8 bytes freed"
        );
    }
}

//! Transaction log interpreter for the reference-counted allocator.
//!
//! A transaction log is a text file with one command per line:
//!
//! ```text
//! a = allocate 100    # bind `a` to a new 100-byte block
//! b = a               # bind `b` to the same block, raising its count
//! free a              # drop `a`'s reference
//! ```
//!
//! (Comments are shown for illustration only; they are not part of the
//! grammar.)
//!
//! [`Transaction::parse`] turns a line into a [`Transaction`], and
//! [`Interpreter`] executes it against a
//! [`RefCountAllocator`](allocator::RefCountAllocator) and a
//! [`VariableTable`]. Every failure is reported as a [`TransactionError`]
//! whose [`kind`](TransactionError::kind) tells whether the line was
//! malformed, named an unknown block, or could not be allocated. None of
//! them stop a run.
//!
//! # Usage Example
//!
//! ```rust
//! use core::num::NonZeroUsize;
//!
//! use transaction::Interpreter;
//!
//! let log = "a = allocate 100\nb = allocate 200\nc = a\nfree a\nfree c\n";
//! let mut interpreter = Interpreter::new(NonZeroUsize::new(1024).unwrap());
//! let summary = interpreter.run(log.as_bytes(), |_, _, _, _| {}).unwrap();
//! assert_eq!(summary.executed, 5);
//!
//! print!("{}", interpreter.allocator().status());
//! ```

pub use self::{
    error::{ErrorKind, TransactionError},
    interpreter::{Interpreter, Outcome, RunSummary},
    parse::Transaction,
    variables::VariableTable,
};

mod error;
mod interpreter;
mod parse;
mod variables;

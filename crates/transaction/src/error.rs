use core::num::ParseIntError;
use std::io;

use allocator::AllocatorError;
use snafu::Snafu;
use snafu_utils::Location;

/// The broad class of a [`TransactionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ErrorKind {
    #[display("allocation failure")]
    AllocationFailure,
    #[display("unknown address")]
    UnknownAddress,
    #[display("malformed transaction")]
    MalformedTransaction,
    #[display("I/O error")]
    Io,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum TransactionError {
    #[snafu(display("unsupported operation or incorrect syntax: {line}"))]
    Malformed {
        line: String,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("invalid allocation size `{token}`"))]
    InvalidSize {
        token: String,
        #[snafu(source)]
        source: ParseIntError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("variable `{name}` is not bound"))]
    UnboundVariable {
        name: String,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Allocator { source: AllocatorError },
    #[snafu(display("failed to read transaction log at line {line}"))]
    Read {
        line: usize,
        #[snafu(source)]
        source: io::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

impl TransactionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed { .. } | Self::InvalidSize { .. } | Self::UnboundVariable { .. } => {
                ErrorKind::MalformedTransaction
            }
            Self::Allocator {
                source: AllocatorError::AllocationFailure { .. },
            } => ErrorKind::AllocationFailure,
            Self::Allocator {
                source: AllocatorError::UnknownAddress { .. },
            } => ErrorKind::UnknownAddress,
            Self::Read { .. } => ErrorKind::Io,
        }
    }
}

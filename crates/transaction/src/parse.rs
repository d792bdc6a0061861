use core::num::NonZeroUsize;

use snafu::ResultExt as _;

use crate::error::{InvalidSizeSnafu, MalformedSnafu, TransactionError};

const ASSIGN: &str = "=";
const ALLOCATE: &str = "allocate";
const FREE: &str = "free";

/// One line of a transaction log.
///
/// Lines are split on whitespace and matched against three forms:
///
/// ```text
/// <var> = allocate <size>
/// free <var>
/// <var> = <other_var>
/// ```
///
/// The allocation form is tried first, so `free = allocate 8` allocates a
/// variable named `free`.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum Transaction {
    #[display("{var} = allocate {size}")]
    Allocate { var: String, size: NonZeroUsize },
    #[display("free {var}")]
    Free { var: String },
    #[display("{dst} = {src}")]
    Alias { dst: String, src: String },
}

impl Transaction {
    /// Parses one line of a transaction log.
    ///
    /// A line matching none of the three forms, blank lines included, is
    /// malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use transaction::Transaction;
    ///
    /// let tx = Transaction::parse("a = allocate 100").unwrap();
    /// assert!(tx.is_allocate());
    /// assert_eq!(tx.to_string(), "a = allocate 100");
    ///
    /// assert!(Transaction::parse("   ").is_err());
    /// assert!(Transaction::parse("a = allocate 0").is_err());
    /// ```
    pub fn parse(line: &str) -> Result<Self, TransactionError> {
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        let transaction = match tokens.as_slice() {
            [var, ASSIGN, ALLOCATE, size] if is_name(var) => Self::Allocate {
                var: (*var).to_owned(),
                size: parse_size(size)?,
            },
            [FREE, var] if is_name(var) => Self::Free {
                var: (*var).to_owned(),
            },
            [dst, ASSIGN, src] if is_name(dst) && is_name(src) && *src != ALLOCATE => {
                Self::Alias {
                    dst: (*dst).to_owned(),
                    src: (*src).to_owned(),
                }
            }
            _ => return MalformedSnafu { line: line.trim() }.fail(),
        };
        Ok(transaction)
    }
}

fn is_name(token: &str) -> bool {
    token != ASSIGN
}

fn parse_size(token: &str) -> Result<NonZeroUsize, TransactionError> {
    token
        .parse::<NonZeroUsize>()
        .context(InvalidSizeSnafu { token })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parse(line: &str) -> Transaction {
        Transaction::parse(line).unwrap()
    }

    fn malformed(line: &str) -> bool {
        Transaction::parse(line)
            .is_err_and(|err| err.kind() == ErrorKind::MalformedTransaction)
    }

    #[test]
    fn test_parse_allocate() {
        assert_eq!(
            parse("a = allocate 100"),
            Transaction::Allocate {
                var: "a".to_owned(),
                size: NonZeroUsize::new(100).unwrap(),
            }
        );
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        assert_eq!(parse("  b\t=  allocate   7 \r"), parse("b = allocate 7"));
    }

    #[test]
    fn test_parse_free() {
        assert_eq!(
            parse("free a"),
            Transaction::Free {
                var: "a".to_owned()
            }
        );
    }

    #[test]
    fn test_parse_alias() {
        assert_eq!(
            parse("c = a"),
            Transaction::Alias {
                dst: "c".to_owned(),
                src: "a".to_owned(),
            }
        );
    }

    #[test]
    fn test_allocate_form_wins_over_free() {
        assert!(parse("free = allocate 8").is_allocate());
        assert!(parse("free = a").is_alias());
    }

    #[test]
    fn test_blank_line_is_malformed() {
        assert!(malformed(""));
        assert!(malformed(" \t "));
        let err = Transaction::parse("\r").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported operation or incorrect syntax: "
        );
    }

    #[test]
    fn test_rejects_bad_sizes() {
        for line in [
            "a = allocate 0",
            "a = allocate -4",
            "a = allocate ten",
            "a = allocate 1.5",
        ] {
            assert!(malformed(line), "{line}");
        }
        let err = Transaction::parse("a = allocate x").unwrap_err();
        assert_eq!(err.to_string(), "invalid allocation size `x`");
    }

    #[test]
    fn test_rejects_malformed_lines() {
        for line in [
            "a",
            "a =",
            "a = allocate",
            "a = allocate 10 20",
            "free",
            "free a b",
            "a = b c",
            "a b c",
            "= = a",
            "allocate 10",
        ] {
            assert!(malformed(line), "{line}");
        }
        let err = Transaction::parse(" a b c ").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported operation or incorrect syntax: a b c"
        );
    }
}

//! Errors for reading and writing CLF/CTF files.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Result alias for read operations.
pub type IoResult<T> = Result<T, Error>;

/// Categories of read failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// End tag does not match the open element.
    TagMismatch,
    /// The stream ended with open elements.
    UnclosedElement,
    /// Element name not in the recognized set.
    UnknownElement,
    /// Element recognized but not legal under its parent.
    MisplacedElement,
    /// Required attribute absent or empty.
    MissingAttribute,
    /// Style value not in the enumeration.
    UnknownStyle,
    /// No reader exists for this (type, version, dialect).
    UnsupportedOperator,
    /// Version attributes conflict or cannot be parsed.
    VersionConflict,
    /// Array entry count disagrees with the declared dims.
    ArrayLength,
    /// IndexMap used where it is not allowed.
    IndexMapMisuse,
    /// Modern and Cineon log parameters combined.
    MixedLogParams,
    /// Adjacent operators have inconsistent bit depths.
    BitDepthMismatch,
    /// Inverse requested on a singular matrix.
    SingularMatrix,
    /// A number could not be parsed.
    InvalidNumber,
    /// The abort signal was observed.
    Cancelled,
    /// The stream held no ProcessList element.
    NoProcessList,
    /// The ProcessList held no operator.
    EmptyProcessList,
    /// Element structure is inconsistent.
    StructuralError,
    /// Duplicate identifier in a CDL collection.
    DuplicateId,
    /// Operator parameters are not legal.
    Validation,
    /// The underlying XML was malformed.
    Xml,
    /// Reading the file itself failed.
    Io,
}

/// A read failure with its file and line context.
///
/// Displays as the canonical diagnostic:
/// `Error parsing CTF/CLF file (<path>). Error is: <message>. At line (<line>)`.
#[derive(Debug, Clone)]
pub struct Error {
    /// Failure category.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Path or name of the offending file.
    pub file: String,
    /// 1-based line number; 0 when no location applies.
    pub line: u32,
}

impl Error {
    /// Creates an error with full context.
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self { kind, message: message.into(), file: file.into(), line }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error parsing CTF/CLF file ({}). Error is: {}. At line ({})",
            self.file, self.message, self.line
        )
    }
}

impl std::error::Error for Error {}

/// Failures while writing or baking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WriteError {
    /// The list holds an operator CLF cannot represent.
    #[error("operator '{0}' cannot be written to a CLF file")]
    UnsupportedInClf(String),

    /// A requested LUT size is too small to interpolate.
    #[error("invalid cube size {0}, must be at least 2")]
    InvalidCubeSize(usize),

    /// The list failed validation before writing.
    #[error("process list is not valid: {0}")]
    Validation(String),

    /// The XML writer failed.
    #[error("XML write error: {0}")]
    Xml(String),
}

/// A cooperative abort signal checked between XML events.
///
/// Clones share the flag, so a caller can keep one half and hand the
/// other to the parser.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let e = Error::new(ErrorKind::ArrayLength, "Expected 9 Array values, found 8", "x.clf", 12);
        assert_eq!(
            e.to_string(),
            "Error parsing CTF/CLF file (x.clf). Error is: Expected 9 Array values, found 8. At line (12)"
        );
    }

    #[test]
    fn cancel_token_is_shared() {
        let t = CancelToken::new();
        let t2 = t.clone();
        assert!(!t2.is_cancelled());
        t.cancel();
        assert!(t2.is_cancelled());
    }
}

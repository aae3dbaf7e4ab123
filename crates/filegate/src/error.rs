use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Better control over error handling
- No dependencies to compile and integrate
- More transparency into error handling logic
 */

/// Error variants that can occur in filegate operations.
///
/// Every failure surfaced by this crate is exactly one of these two
/// categories; no raw `io::Error` escapes the facade.
#[derive(Debug)]
pub enum ErrorKind {
    /// Stream-level failure: an operation on an open (or already-closed)
    /// file handle went wrong — read, write, seek, truncate, or flush.
    FileError {
        path: PathBuf,
        source: io::Error,
    },

    /// OS/path-level failure: the platform rejected a path operation —
    /// open, create, remove, stat, listing, or glob.
    PathError {
        path: PathBuf,
        source: io::Error,
    },
}

/* 📖 # Why separate ErrorKind and Error?
This two-layer design provides a clear separation of concerns:
- ErrorKind: the two normalized variants with their offending path
- Error: wraps ErrorKind with additional runtime context strings

Users pattern match on ErrorKind to decide whether a failure is about
stream content/state or about path existence/permissions/type, while
Error provides ergonomic context attachment for propagation.
*/

/// Error type wrapping ErrorKind with optional context.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    context: Vec<String>,
}

impl Error {
    /// Creates a new error from an ErrorKind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
        }
    }

    /// Normalizes a stream-level failure into a boxed [`ErrorKind::FileError`].
    ///
    /// This is the adapter applied at every I/O call site on an open handle.
    pub fn file(path: impl Into<PathBuf>, source: io::Error) -> Box<Self> {
        Box::new(Self::new(ErrorKind::FileError {
            path: path.into(),
            source,
        }))
    }

    /// Normalizes an OS/path-level failure into a boxed [`ErrorKind::PathError`].
    pub fn path(path: impl Into<PathBuf>, source: io::Error) -> Box<Self> {
        Box::new(Self::new(ErrorKind::PathError {
            path: path.into(),
            source,
        }))
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    /// Useful to avoid expensive string construction for successful paths.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    /// Allows pattern matching on specific error variants.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// True if this is a stream-level [`ErrorKind::FileError`].
    pub fn is_file_error(&self) -> bool {
        matches!(self.kind, ErrorKind::FileError { .. })
    }

    /// True if this is an OS/path-level [`ErrorKind::PathError`].
    pub fn is_path_error(&self) -> bool {
        matches!(self.kind, ErrorKind::PathError { .. })
    }

    /// The path the failed operation was about.
    pub fn offending_path(&self) -> &Path {
        match &self.kind {
            ErrorKind::FileError { path, .. } | ErrorKind::PathError { path, .. } => path,
        }
    }

    /// Returns the innermost error in the chain.
    /// Traverses the error source chain to find the root cause.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } | ErrorKind::PathError { source, .. } => {
                Some(source)
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display context first if present
        for (i, ctx) in self.context.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", ctx)?;
            } else {
                write!(f, ": {}", ctx)?;
            }
        }

        // Add a separator if we have context
        if !self.context.is_empty() {
            write!(f, ": ")?;
        }

        // Display the underlying error kind
        match &self.kind {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::PathError { path, source } => {
                write!(f, "Path error at {}: {}", path.display(), source)
            }
        }
    }
}

/* 📖 # Why use Box<Error> in the result type?

Boxing the error reduces the size of the result type, making it more
efficient to return in the common case.
*/

/// Standard result type for filegate operations.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Extension trait for attaching context to Results.
/// Provides ergonomic error context attachment during error propagation.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    /// Eager evaluation: context is evaluated immediately.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    /// Prefer this to avoid expensive string formatting in the success path.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/* 📖 # What is filegate?

filegate is a filesystem-access facade: a synchronized file handle that
serializes I/O through a pluggable locking strategy, and a set of free
functions for directory and file management. Every platform failure is
normalized into one of two error categories, so downstream code can tell
"the open stream misbehaved" apart from "the operating system rejected a
path operation" without inspecting platform error codes.
*/

pub mod error;
pub mod fileops;
pub mod handle;
pub mod locking;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use fileops::{
    delete_recursively, exists, glob, is_directory, list_directory, make_dirs, mkdir, remove,
    rmdir,
};
pub use handle::{FastFile, FileHandle, Lines, OpenMode, SyncFile};
pub use locking::{LockStrategy, NullLocker, ReentrantLocker};

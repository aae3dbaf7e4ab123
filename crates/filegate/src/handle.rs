use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::locking::{LockStrategy, NullLocker, ReentrantLocker};

/* 📖 # What is a FileHandle?

A wrapper owning exactly one OS file descriptor. Every operation is the
same composition: acquire the locking strategy, delegate to the
descriptor, normalize any failure into the stream-level error category,
release the lock on every exit path. The composition lives in one place,
the `with_stream` combinator, instead of being repeated per method.

Two concrete configurations exist: `SyncFile` (reentrant lock, shareable
across threads) and `FastFile` (no lock, `!Sync`, single-thread only).
*/

/// Stream state guarded by the locking strategy; `None` once closed.
pub type Stream = Option<BufReader<File>>;

const CLOSED: &str = "operation on closed file handle";

/// Mode a file handle is opened with.
///
/// The Rust rendering of the classic mode strings; `as_str` returns the
/// corresponding string for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only; the file must exist ("r").
    Read,
    /// Write-only; creates the file, truncating existing content ("w").
    Write,
    /// Read and write, truncating or creating ("w+").
    WriteRead,
    /// Appending writes; creates the file if missing ("a").
    Append,
    /// Read and write on an existing file ("r+").
    ReadWrite,
}

impl OpenMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::Write => "w",
            OpenMode::WriteRead => "w+",
            OpenMode::Append => "a",
            OpenMode::ReadWrite => "r+",
        }
    }

    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::Read => {
                options.read(true);
            }
            OpenMode::Write => {
                options.write(true).create(true).truncate(true);
            }
            OpenMode::WriteRead => {
                options.read(true).write(true).create(true).truncate(true);
            }
            OpenMode::Append => {
                options.append(true).create(true);
            }
            OpenMode::ReadWrite => {
                options.read(true).write(true);
            }
        }
        options
    }
}

impl std::fmt::Display for OpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wrapper owning one open file descriptor, serialized by the locking
/// strategy `L`.
///
/// State machine: open → any number of read/write/seek/flush operations
/// → closed (terminal; further operations fail with a stream-level
/// error, except [`close`](FileHandle::close) which is idempotent).
/// Dropping the handle releases the descriptor deterministically, so any
/// scope acts as a scoped-acquisition block.
#[derive(Debug)]
pub struct FileHandle<L> {
    path: PathBuf,
    mode: OpenMode,
    locker: L,
}

/// File handle wired to the reentrant locking strategy.
///
/// `Sync`: independent threads may call into the same handle through an
/// `Arc`; all operations except [`lines`](FileHandle::lines) are
/// serialized, and a thread already holding the lock may re-enter it.
pub type SyncFile = FileHandle<ReentrantLocker<Stream>>;

/// File handle wired to the null locking strategy.
///
/// Faster, but `!Sync`: the compiler rejects sharing it across threads,
/// which is the point — the caller guarantees single-threaded access.
pub type FastFile = FileHandle<NullLocker<Stream>>;

impl<L: LockStrategy<Stream>> FileHandle<L> {
    /// Opens `path` with the given mode.
    ///
    /// Open failures are path-level errors: a missing file in `Read` mode
    /// is a `PathError`, while `Write` and `Append` create the file.
    pub fn open(path: impl Into<PathBuf>, mode: OpenMode) -> Result<Self> {
        let path = path.into();
        debug!(path = %path.display(), mode = %mode, "opening file handle");
        let file = mode
            .options()
            .open(&path)
            .map_err(|e| Error::path(&path, e))?;
        Ok(Self {
            locker: L::new(Some(BufReader::new(file))),
            mode,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Lock-then-normalize combinator backing every synchronized
    /// operation: acquire the strategy, run `op` against the open stream,
    /// map any `io::Error` into the stream-level normalized error. A
    /// closed handle fails the same way, with a synthesized source.
    fn with_stream<R>(&self, op: impl FnOnce(&mut BufReader<File>) -> io::Result<R>) -> Result<R> {
        let cell = self.locker.acquire();
        let mut guard = cell.borrow_mut();
        match guard.as_mut() {
            Some(stream) => op(stream).map_err(|e| Error::file(&self.path, e)),
            None => Err(Error::file(&self.path, io::Error::other(CLOSED))),
        }
    }

    /// Writes `data` at the current position (at end-of-file in `Append`
    /// mode).
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.with_stream(|stream| {
            sync_for_write(stream)?;
            stream.get_mut().write_all(data)
        })
    }

    /// Writes a sequence of strings back to back; no separators are added.
    pub fn write_lines<I>(&self, lines: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.with_stream(|stream| {
            sync_for_write(stream)?;
            let file = stream.get_mut();
            for line in lines {
                file.write_all(line.as_ref().as_bytes())?;
            }
            Ok(())
        })
    }

    /// Reads up to `limit` bytes, or to end-of-stream when `None`.
    ///
    /// Returns an empty vector at end-of-file.
    pub fn read(&self, limit: Option<usize>) -> Result<Vec<u8>> {
        self.with_stream(|stream| {
            let mut data = Vec::new();
            match limit {
                Some(n) => {
                    stream.by_ref().take(n as u64).read_to_end(&mut data)?;
                }
                None => {
                    stream.read_to_end(&mut data)?;
                }
            }
            Ok(data)
        })
    }

    /// Reads a single line including its terminator, bounded by `max_len`
    /// bytes when given. An empty string signals end-of-stream.
    pub fn read_line(&self, max_len: Option<usize>) -> Result<String> {
        self.with_stream(|stream| read_line_bounded(stream, max_len))
    }

    /// Reads the remaining lines.
    ///
    /// With a `size_hint`, reading stops once at least that many bytes
    /// have been consumed (whole lines only, so slightly more may be
    /// read).
    pub fn read_lines(&self, size_hint: Option<usize>) -> Result<Vec<String>> {
        self.with_stream(|stream| {
            let mut lines = Vec::new();
            let mut consumed = 0;
            loop {
                let line = read_line_bounded(stream, None)?;
                if line.is_empty() {
                    break;
                }
                consumed += line.len();
                lines.push(line);
                if size_hint.is_some_and(|hint| consumed >= hint) {
                    break;
                }
            }
            Ok(lines)
        })
    }

    /// Current byte offset.
    pub fn tell(&self) -> Result<u64> {
        self.with_stream(|stream| stream.stream_position())
    }

    /// Repositions the stream; returns the new offset.
    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        self.with_stream(|stream| stream.seek(pos))
    }

    /// Truncates the file to `new_size`, or to 0 bytes when unspecified.
    /// The current offset is left where it is.
    pub fn truncate(&self, new_size: Option<u64>) -> Result<()> {
        let size = new_size.unwrap_or(0);
        debug!(path = %self.path.display(), size, "truncating file");
        self.with_stream(|stream| {
            sync_for_write(stream)?;
            stream.get_mut().set_len(size)
        })
    }

    /// Byte size of the file, leaving the current offset untouched.
    ///
    /// Composite operation: the lock is held across the whole sequence
    /// while the inner `tell`/`seek` calls re-enter it. The saved offset
    /// is restored on every exit path, including a failed seek to the
    /// end.
    pub fn size(&self) -> Result<u64> {
        let _held = self.locker.acquire();
        let saved = self.tell()?;
        let size = self.seek(SeekFrom::End(0)).and_then(|_| self.tell());
        let restored = self.seek(SeekFrom::Start(saved));
        let size = size?;
        restored?;
        Ok(size)
    }

    /// Forces buffered writes down to the descriptor.
    pub fn flush(&self) -> Result<()> {
        self.with_stream(|stream| stream.get_mut().flush())
    }

    /// True once [`close`](FileHandle::close) has completed.
    pub fn closed(&self) -> bool {
        let cell = self.locker.acquire();
        let closed = cell.borrow().is_none();
        closed
    }

    /// Releases the underlying descriptor. Safe to invoke redundantly.
    pub fn close(&self) -> Result<()> {
        let cell = self.locker.acquire();
        if let Some(stream) = cell.borrow_mut().take() {
            debug!(path = %self.path.display(), "closing file handle");
            drop(stream);
        }
        Ok(())
    }

    /// Lazy, finite, non-restartable iterator over the remaining lines.
    ///
    /// The one documented exception to the locking rule: per-line fetches
    /// are not serialized by the strategy. The exclusive borrow stands in
    /// for the lock — no other access to the handle can exist while the
    /// iterator lives. The iterator is fused: it ends after end-of-stream
    /// or the first error, and a closed handle yields one error.
    pub fn lines(&mut self) -> Lines<'_, L> {
        Lines {
            handle: self,
            done: false,
        }
    }
}

/// Drops the read buffer so the descriptor offset matches the logical
/// position before writing through to the file.
fn sync_for_write(stream: &mut BufReader<File>) -> io::Result<()> {
    let pos = stream.stream_position()?;
    stream.seek(SeekFrom::Start(pos))?;
    Ok(())
}

/// Reads one line including its terminator, consuming at most `max_len`
/// bytes when a bound is given. An empty string signals end-of-stream.
fn read_line_bounded(stream: &mut BufReader<File>, max_len: Option<usize>) -> io::Result<String> {
    let mut line = Vec::new();
    loop {
        let budget = match max_len {
            Some(max) if line.len() >= max => break,
            Some(max) => max - line.len(),
            None => usize::MAX,
        };
        let available = stream.fill_buf()?;
        if available.is_empty() {
            break;
        }
        let window = &available[..available.len().min(budget)];
        match window.iter().position(|&byte| byte == b'\n') {
            Some(at) => {
                line.extend_from_slice(&window[..=at]);
                stream.consume(at + 1);
                break;
            }
            None => {
                let taken = window.len();
                line.extend_from_slice(window);
                stream.consume(taken);
            }
        }
    }
    String::from_utf8(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Line iterator returned by [`FileHandle::lines`].
pub struct Lines<'a, L> {
    handle: &'a mut FileHandle<L>,
    done: bool,
}

impl<L: LockStrategy<Stream>> Iterator for Lines<'_, L> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let handle = &mut *self.handle;
        let item = match handle.locker.get_mut().as_mut() {
            None => Err(Error::file(&handle.path, io::Error::other(CLOSED))),
            Some(stream) => match read_line_bounded(stream, None) {
                Ok(line) if line.is_empty() => {
                    self.done = true;
                    return None;
                }
                Ok(line) => Ok(line),
                Err(e) => Err(Error::file(&handle.path, e)),
            },
        };
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

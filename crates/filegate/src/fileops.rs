use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/* 📖 # Why free functions instead of methods on some Filesystem type?

Each operation here is a thin, single-call delegation to the OS, wrapped
by the path-level error normalization. They are stateless and hold no
locks; concurrent calls are independently safe (any races are at the OS
level). A carrier type would add nothing but ceremony.
*/

/// True iff `path` exists (as a directory, file, or non-broken symlink).
///
/// Only "not found" maps to `false`; any other stat failure is surfaced
/// as a `PathError`.
pub fn exists(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::path(path, e)),
    }
}

/// True iff `path` exists and is a directory.
pub fn is_directory(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::path(path, e)),
    }
}

/// Returns the paths matching the glob `pattern`.
///
/// `*` and `?` do not cross directory separators. A pattern without
/// wildcards names a single path, returned iff it exists. A missing base
/// directory yields an empty list. Order is walk order, not sorted.
#[instrument]
pub fn glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let Some(meta) = pattern.find(|c| matches!(c, '*' | '?' | '[' | '{')) else {
        let path = PathBuf::from(pattern);
        return Ok(if exists(&path)? { vec![path] } else { Vec::new() });
    };

    // Split at the last separator before the first meta character: the
    // literal base is walked, the remainder is matched.
    let (base, rest) = match pattern[..meta].rfind('/') {
        Some(0) => (&pattern[..1], &pattern[1..]),
        Some(at) => (&pattern[..at], &pattern[at + 1..]),
        None => (".", pattern),
    };

    let matcher = GlobBuilder::new(rest)
        .literal_separator(true)
        .build()
        .map_err(|e| {
            debug!(pattern, error = %e, "failed to compile glob pattern");
            Error::path(
                pattern,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid glob pattern: {e}"),
                ),
            )
        })?
        .compile_matcher();

    let base_path = Path::new(base);
    if !base_path.is_dir() {
        debug!(base, "glob base directory missing, nothing can match");
        return Ok(Vec::new());
    }

    let depth = rest.split('/').count();
    let mut matches = Vec::new();
    for entry in WalkDir::new(base_path).min_depth(1).max_depth(depth) {
        let entry = entry.map_err(|e| {
            let at = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| base_path.to_path_buf());
            Error::path(at, io::Error::other(e.to_string()))
        })?;
        let Ok(relative) = entry.path().strip_prefix(base_path) else {
            continue;
        };
        if matcher.is_match(relative) {
            if base == "." {
                matches.push(relative.to_path_buf());
            } else {
                matches.push(entry.path().to_path_buf());
            }
        }
    }
    debug!(count = matches.len(), "glob finished");
    Ok(matches)
}

/// Creates the directory `path` with the given permission mode.
///
/// Fails with a `PathError` if `path` already exists or its parent is
/// missing. `mode` is applied on Unix and ignored elsewhere.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn mkdir(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    let path = path.as_ref();
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path).map_err(|e| Error::path(path, e))
}

/// Recursively creates `path` and any missing parents with the given
/// permission mode.
///
/// Fails with a `PathError` if the full path already exists.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn make_dirs(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    let path = path.as_ref();
    // DirBuilder::recursive succeeds on an existing path; the contract
    // here is that the full path must not exist yet.
    if exists(path)? {
        return Err(Error::path(
            path,
            io::Error::new(io::ErrorKind::AlreadyExists, "path already exists"),
        ));
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path).map_err(|e| Error::path(path, e))
}

/// Removes `path` iff it is an existing, empty directory.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn rmdir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::remove_dir(path).map_err(|e| Error::path(path, e))
}

/// Deletes the non-directory file `path`.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn remove(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::remove_file(path).map_err(|e| Error::path(path, e))
}

/// Deletes `path` recursively: the whole subtree for a directory, a
/// single unlink otherwise. A missing path is a `PathError`.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn delete_recursively(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if is_directory(path)? {
        debug!("removing directory subtree");
        fs::remove_dir_all(path).map_err(|e| Error::path(path, e))
    } else {
        fs::remove_file(path).map_err(|e| Error::path(path, e))
    }
}

/// Lists the entry basenames of `path`.
///
/// The entries "." and ".." are never returned. Entries starting with a
/// dot are only returned when `include_hidden` is set. Order is as
/// produced by the platform, not sorted.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn list_directory(path: impl AsRef<Path>, include_hidden: bool) -> Result<Vec<String>> {
    let path = path.as_ref();
    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| Error::path(path, e))? {
        let entry = entry.map_err(|e| Error::path(path, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if include_hidden || !name.starts_with('.') {
            entries.push(name);
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        TempDir::new().expect("failed to create temp dir")
    }

    #[test]
    fn test_exists() {
        let temp_dir = setup_test_dir();
        let file = temp_dir.path().join("here.txt");
        fs::write(&file, "content").unwrap();

        assert!(exists(&file).unwrap());
        assert!(exists(temp_dir.path()).unwrap());
        assert!(!exists(temp_dir.path().join("gone.txt")).unwrap());
    }

    #[test]
    fn test_is_directory() {
        let temp_dir = setup_test_dir();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "").unwrap();

        assert!(is_directory(temp_dir.path()).unwrap());
        assert!(!is_directory(&file).unwrap());
        assert!(!is_directory(temp_dir.path().join("gone")).unwrap());
    }

    #[test]
    fn test_glob_star() {
        let temp_dir = setup_test_dir();
        fs::write(temp_dir.path().join("a.txt"), "").unwrap();
        fs::write(temp_dir.path().join("b.txt"), "").unwrap();
        fs::write(temp_dir.path().join("c.log"), "").unwrap();

        let pattern = format!("{}/*.txt", temp_dir.path().display());
        let mut found = glob(&pattern).unwrap();
        found.sort();
        assert_eq!(
            found,
            vec![
                temp_dir.path().join("a.txt"),
                temp_dir.path().join("b.txt"),
            ]
        );
    }

    #[test]
    fn test_glob_does_not_cross_separators() {
        let temp_dir = setup_test_dir();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("sub/deep.txt"), "").unwrap();
        fs::write(temp_dir.path().join("top.txt"), "").unwrap();

        let pattern = format!("{}/*.txt", temp_dir.path().display());
        let found = glob(&pattern).unwrap();
        assert_eq!(found, vec![temp_dir.path().join("top.txt")]);

        let pattern = format!("{}/*/*.txt", temp_dir.path().display());
        let found = glob(&pattern).unwrap();
        assert_eq!(found, vec![temp_dir.path().join("sub/deep.txt")]);
    }

    #[test]
    fn test_glob_without_wildcards() {
        let temp_dir = setup_test_dir();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "").unwrap();

        let found = glob(&file.display().to_string()).unwrap();
        assert_eq!(found, vec![file]);

        let found = glob(&temp_dir.path().join("gone.txt").display().to_string()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_glob_missing_base_is_empty() {
        let temp_dir = setup_test_dir();
        let pattern = format!("{}/nowhere/*.txt", temp_dir.path().display());
        assert!(glob(&pattern).unwrap().is_empty());
    }

    #[test]
    fn test_glob_invalid_pattern() {
        let err = glob("[invalid").unwrap_err();
        assert!(err.is_path_error());
    }

    #[test]
    fn test_mkdir() {
        let temp_dir = setup_test_dir();
        let dir = temp_dir.path().join("fresh");

        mkdir(&dir, 0o755).unwrap();
        assert!(is_directory(&dir).unwrap());

        // Existing path fails.
        assert!(mkdir(&dir, 0o755).unwrap_err().is_path_error());
        // Missing parent fails: mkdir is a single level.
        let nested = temp_dir.path().join("a/b");
        assert!(mkdir(&nested, 0o755).unwrap_err().is_path_error());
    }

    #[cfg(unix)]
    #[test]
    fn test_mkdir_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = setup_test_dir();
        let dir = temp_dir.path().join("locked");
        mkdir(&dir, 0o700).unwrap();

        let mode = fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_make_dirs() {
        let temp_dir = setup_test_dir();
        let nested = temp_dir.path().join("a/b/c");

        make_dirs(&nested, 0o755).unwrap();
        assert!(exists(&nested).unwrap());

        // The full path existing is an error.
        assert!(make_dirs(&nested, 0o755).unwrap_err().is_path_error());
    }

    #[test]
    fn test_rmdir() {
        let temp_dir = setup_test_dir();
        let empty = temp_dir.path().join("empty");
        let full = temp_dir.path().join("full");
        fs::create_dir(&empty).unwrap();
        fs::create_dir(&full).unwrap();
        fs::write(full.join("x.txt"), "").unwrap();

        rmdir(&empty).unwrap();
        assert!(!exists(&empty).unwrap());

        assert!(rmdir(&full).unwrap_err().is_path_error());
        assert!(rmdir(temp_dir.path().join("gone")).unwrap_err().is_path_error());
    }

    #[test]
    fn test_remove() {
        let temp_dir = setup_test_dir();
        let file = temp_dir.path().join("x.txt");
        let dir = temp_dir.path().join("d");
        fs::write(&file, "").unwrap();
        fs::create_dir(&dir).unwrap();

        remove(&file).unwrap();
        assert!(!exists(&file).unwrap());

        assert!(remove(&dir).unwrap_err().is_path_error());
        assert!(remove(temp_dir.path().join("gone.txt")).unwrap_err().is_path_error());
    }

    #[test]
    fn test_delete_recursively() {
        let temp_dir = setup_test_dir();
        let tree = temp_dir.path().join("tree");
        fs::create_dir_all(tree.join("sub")).unwrap();
        fs::write(tree.join("a.txt"), "").unwrap();
        fs::write(tree.join("sub/b.txt"), "").unwrap();

        delete_recursively(&tree).unwrap();
        assert!(!exists(&tree).unwrap());

        // A single file works too.
        let file = temp_dir.path().join("single.txt");
        fs::write(&file, "").unwrap();
        delete_recursively(&file).unwrap();
        assert!(!exists(&file).unwrap());

        // A missing path is a PathError.
        assert!(
            delete_recursively(temp_dir.path().join("gone"))
                .unwrap_err()
                .is_path_error()
        );
    }

    #[test]
    fn test_list_directory_excludes_hidden() {
        let temp_dir = setup_test_dir();
        fs::write(temp_dir.path().join("a.txt"), "").unwrap();
        fs::write(temp_dir.path().join(".hidden"), "").unwrap();

        let entries = list_directory(temp_dir.path(), false).unwrap();
        assert_eq!(entries, vec!["a.txt"]);

        let mut entries = list_directory(temp_dir.path(), true).unwrap();
        entries.sort();
        assert_eq!(entries, vec![".hidden", "a.txt"]);
    }

    #[test]
    fn test_list_directory_missing_path() {
        let temp_dir = setup_test_dir();
        let err = list_directory(temp_dir.path().join("gone"), false).unwrap_err();
        assert!(err.is_path_error());
    }
}

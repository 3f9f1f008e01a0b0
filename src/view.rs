//! # Repository File Views
//!
//! A file view is the read-only window the resolution engine has onto a
//! repository: the list of tracked paths, plus `stat` and `read_file` on any
//! one of them. The engine never walks a filesystem itself; it only consumes
//! this trait.
//!
//! Three implementations are provided:
//!
//! - **`MemoryView`**: an in-memory map of paths to contents, used by tests
//!   and by callers that already hold the files.
//! - **`DirectoryView`**: every regular file below a directory, skipping
//!   `.git`. Used when a locator points at a plain directory.
//! - **`GitWorkTree`** (in [`crate::git`]): the tracked paths of a git
//!   working copy.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Metadata returned by [`FileView::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Size in bytes
    pub size: u64,
    /// Unix permission bits
    pub mode: u32,
}

/// Read-only access to a repository's files.
///
/// Paths are relative, `/`-separated, and never start with `./`.
pub trait FileView: Send + Sync {
    /// All tracked paths, in no particular order.
    fn list_paths(&self) -> Result<Vec<String>>;

    /// Size and mode of `path`, or `Error::NotFound`.
    fn stat(&self, path: &str) -> Result<FileStat>;

    /// Contents of `path`, or `Error::NotFound`.
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
}

impl<V: FileView + ?Sized> FileView for Box<V> {
    fn list_paths(&self) -> Result<Vec<String>> {
        (**self).list_paths()
    }

    fn stat(&self, path: &str) -> Result<FileStat> {
        (**self).stat(path)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        (**self).read_file(path)
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    content: Vec<u8>,
    mode: u32,
}

/// In-memory file view.
#[derive(Debug, Clone, Default)]
pub struct MemoryView {
    files: BTreeMap<String, MemoryFile>,
}

impl MemoryView {
    /// Create a new empty view
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file with mode `0o644`.
    pub fn add_file(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.add_file_with_mode(path, content, 0o644);
    }

    /// Add or replace a file with an explicit mode.
    pub fn add_file_with_mode(
        &mut self,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
        mode: u32,
    ) {
        self.files.insert(
            path.into(),
            MemoryFile {
                content: content.into(),
                mode,
            },
        );
    }

    /// Builder-style [`MemoryView::add_file`].
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileView for MemoryView {
    fn list_paths(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn stat(&self, path: &str) -> Result<FileStat> {
        self.files
            .get(path)
            .map(|f| FileStat {
                size: f.content.len() as u64,
                mode: f.mode,
            })
            .ok_or_else(|| Error::not_found(path))
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files.get(path).map(|f| f.content.clone()).ok_or_else(|| Error::not_found(path))
    }
}

/// Every regular file under a directory, `.git` excluded.
#[derive(Debug, Clone)]
pub struct DirectoryView {
    root: PathBuf,
}

impl DirectoryView {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileView for DirectoryView {
    fn list_paths(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

        for entry in walker {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                paths.push(to_slash_path(relative));
            }
        }
        Ok(paths)
    }

    fn stat(&self, path: &str) -> Result<FileStat> {
        stat_on_disk(&self.root, path)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        read_on_disk(&self.root, path)
    }
}

/// Join relative path components with `/` regardless of platform.
pub(crate) fn to_slash_path(path: &Path) -> String {
    path.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/")
}

pub(crate) fn stat_on_disk(root: &Path, path: &str) -> Result<FileStat> {
    let metadata = fs::metadata(root.join(path)).map_err(|e| map_missing(e, path))?;
    if !metadata.is_file() {
        return Err(Error::not_found(path));
    }
    Ok(FileStat {
        size: metadata.len(),
        mode: file_mode(&metadata),
    })
}

pub(crate) fn read_on_disk(root: &Path, path: &str) -> Result<Vec<u8>> {
    fs::read(root.join(path)).map_err(|e| map_missing(e, path))
}

fn map_missing(e: std::io::Error, path: &str) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::not_found(path)
    } else {
        Error::Io(e)
    }
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_view_lists_and_reads() {
        let view = MemoryView::new()
            .with_file("README.md", "# Project")
            .with_file("src/main.rs", "fn main() {}");

        let mut paths = view.list_paths().unwrap();
        paths.sort();
        assert_eq!(paths, vec!["README.md", "src/main.rs"]);
        assert_eq!(view.read_file("README.md").unwrap(), b"# Project");
        assert_eq!(
            view.stat("src/main.rs").unwrap(),
            FileStat {
                size: 12,
                mode: 0o644
            }
        );
    }

    #[test]
    fn test_memory_view_missing_file() {
        let view = MemoryView::new();
        assert!(matches!(
            view.read_file("test/doesntexist"),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(view.stat("nope"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_directory_view_skips_git() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join(".git/config"), b"git config").unwrap();
        fs::write(root.join("README.md"), b"readme").unwrap();
        fs::write(root.join("src/main.rs"), b"code").unwrap();

        let view = DirectoryView::new(root);
        let mut paths = view.list_paths().unwrap();
        paths.sort();
        assert_eq!(paths, vec!["README.md", "src/main.rs"]);
        assert_eq!(view.read_file("src/main.rs").unwrap(), b"code");
        assert_eq!(view.stat("README.md").unwrap().size, 6);
    }

    #[test]
    fn test_directory_view_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let view = DirectoryView::new(temp_dir.path());
        assert!(matches!(
            view.read_file("missing.txt"),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(view.stat("missing.txt"), Err(Error::NotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_view_reports_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("run.sh");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let view = DirectoryView::new(temp_dir.path());
        assert_eq!(view.stat("run.sh").unwrap().mode, 0o755);
    }
}

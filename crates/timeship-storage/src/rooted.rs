// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Rooted filesystem gateway.
//!
//! A `RootedDir` pins one directory at construction and services every
//! subsequent open strictly beneath it. Resolution happens in two steps:
//! the candidate path is canonicalized and verified to still sit under the
//! canonical root, then the verified path is re-opened through a descriptor
//! chain (`openat` with `O_NOFOLLOW` per component) so a symlink swapped in
//! after the check cannot redirect the open outside the root.
//!
//! Errors carry the relative path only, never the absolute on-disk location.

use crate::error::{Result, StorageError};
use crate::locator::normalize_relpath;
use std::fs::{File, Metadata};
use std::path::{Path, PathBuf};

/// Directory handle confining all relative opens beneath a fixed root
#[derive(Debug)]
pub struct RootedDir {
    /// Long-lived handle to the root directory, pinned at construction
    root: File,
    /// Canonical root path, used for resolution math only
    root_path: PathBuf,
}

impl RootedDir {
    /// Pin `path` as the root. The path must exist and be a directory.
    pub fn open_root(path: &Path) -> Result<Self> {
        let label = path.display().to_string();
        let root_path = path
            .canonicalize()
            .map_err(|e| StorageError::from_io(&label, e))?;
        let metadata = std::fs::metadata(&root_path).map_err(|e| StorageError::from_io(&label, e))?;
        if !metadata.is_dir() {
            return Err(StorageError::InvalidParameter(format!(
                "storage root '{}' is not a directory",
                label
            )));
        }
        let root = File::open(&root_path).map_err(|e| StorageError::from_io(&label, e))?;
        Ok(Self { root, root_path })
    }

    pub(crate) fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Open the node at `relpath` for reading. Directories are opened too;
    /// use [`RootedDir::read_dir`] to enumerate them.
    pub fn open(&self, relpath: &str) -> Result<File> {
        let (canonical, rel) = self.resolve(relpath)?;
        self.open_beneath(&canonical, &rel, false)
    }

    /// Stat the node at `relpath` through an opened handle.
    pub fn stat(&self, relpath: &str) -> Result<Metadata> {
        let handle = self.open(relpath)?;
        handle.metadata().map_err(|e| StorageError::from_io(relpath, e))
    }

    /// Enumerate the directory at `relpath`: entry names with per-entry
    /// metadata (symlinks are reported as themselves, not followed).
    /// Entries whose metadata cannot be read are skipped with a warning.
    pub fn read_dir(&self, relpath: &str) -> Result<Vec<(String, Metadata)>> {
        let (canonical, rel) = self.resolve(relpath)?;
        // Enumerate through the verified descriptor, not the path string:
        // a rename or symlink swap of any component after verification
        // cannot redirect a read that re-resolves via the open handle.
        let dir = self.open_beneath(&canonical, &rel, true)?;
        let via = Self::enumeration_path(&dir, canonical);

        let mut entries = Vec::new();
        let iter = std::fs::read_dir(&via).map_err(|e| StorageError::from_io(&rel, e))?;
        for entry in iter {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(path = %rel, error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => {
                    tracing::warn!(path = %rel, "skipping entry with non-UTF-8 name");
                    continue;
                }
            };
            match entry.metadata() {
                Ok(metadata) => entries.push((name, metadata)),
                Err(err) => {
                    tracing::warn!(path = %rel, entry = %name, error = %err, "skipping entry without metadata");
                }
            }
        }
        drop(dir);
        Ok(entries)
    }

    /// Open the directory at `relpath` for a read-only walk (total-size
    /// aggregation). Returns the verified handle together with a path that
    /// re-resolves through it; the walk must keep the handle alive.
    pub(crate) fn open_dir(&self, relpath: &str) -> Result<(File, PathBuf)> {
        let (canonical, rel) = self.resolve(relpath)?;
        let handle = self.open_beneath(&canonical, &rel, true)?;
        let path = Self::enumeration_path(&handle, canonical);
        Ok((handle, path))
    }

    /// Path that re-resolves through the open descriptor on every access,
    /// so later path-based reads cannot be redirected by renames.
    #[cfg(target_os = "linux")]
    fn enumeration_path(handle: &File, _canonical: PathBuf) -> PathBuf {
        use std::os::fd::AsRawFd;
        PathBuf::from(format!("/proc/self/fd/{}", handle.as_raw_fd()))
    }

    #[cfg(not(target_os = "linux"))]
    fn enumeration_path(_handle: &File, canonical: PathBuf) -> PathBuf {
        canonical
    }

    /// Canonicalize `<root>/<relpath>` and verify it is still beneath the
    /// root. Returns the canonical path and the normalized relative path.
    fn resolve(&self, relpath: &str) -> Result<(PathBuf, String)> {
        let rel = normalize_relpath(relpath)?;
        let candidate = if rel.is_empty() {
            self.root_path.clone()
        } else {
            self.root_path.join(&rel)
        };
        let label = if rel.is_empty() { ".".to_string() } else { rel };
        let canonical = candidate
            .canonicalize()
            .map_err(|e| StorageError::from_io(&label, e))?;
        if !canonical.starts_with(&self.root_path) {
            return Err(StorageError::PathEscape(label));
        }
        Ok((canonical, label))
    }

    /// Re-open the verified canonical path through a descriptor chain that
    /// refuses symlinks, so the check cannot be raced.
    #[cfg(unix)]
    fn open_beneath(&self, canonical: &Path, rel: &str, want_dir: bool) -> Result<File> {
        use std::ffi::CString;
        use std::os::fd::{AsRawFd, FromRawFd};
        use std::os::unix::ffi::OsStrExt;

        let relative = canonical
            .strip_prefix(&self.root_path)
            .expect("resolve() verified the path is beneath the root");

        let mut current = self
            .root
            .try_clone()
            .map_err(|e| StorageError::from_io(rel, e))?;

        let components: Vec<_> = relative.components().collect();
        for (index, component) in components.iter().enumerate() {
            let name = CString::new(component.as_os_str().as_bytes())
                .map_err(|_| StorageError::InvalidPath(rel.to_string()))?;
            let last = index + 1 == components.len();
            let mut flags = libc::O_RDONLY | libc::O_CLOEXEC | libc::O_NOFOLLOW;
            if !last || want_dir {
                flags |= libc::O_DIRECTORY;
            }
            // SAFETY: `current` is a valid open directory descriptor and
            // `name` is a NUL-terminated single path component.
            let fd = unsafe { libc::openat(current.as_raw_fd(), name.as_ptr(), flags) };
            if fd < 0 {
                let err = std::io::Error::last_os_error();
                return Err(match err.raw_os_error() {
                    // A symlink appeared after canonicalization; refuse it.
                    Some(libc::ELOOP) | Some(libc::EMLINK) => {
                        StorageError::PathEscape(rel.to_string())
                    }
                    _ => StorageError::from_io(rel, err),
                });
            }
            // SAFETY: openat returned a fresh descriptor we now own.
            current = unsafe { File::from_raw_fd(fd) };
        }
        Ok(current)
    }

    #[cfg(not(unix))]
    fn open_beneath(&self, canonical: &Path, rel: &str, _want_dir: bool) -> Result<File> {
        File::open(canonical).map_err(|e| StorageError::from_io(rel, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn fixture() -> (tempfile::TempDir, RootedDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("docs")).expect("mkdir");
        std::fs::write(dir.path().join("docs/note.txt"), b"hello").expect("write");
        std::fs::write(dir.path().join("top.txt"), b"top").expect("write");
        let rooted = RootedDir::open_root(dir.path()).expect("open root");
        (dir, rooted)
    }

    #[test]
    fn opens_files_beneath_the_root() {
        let (_dir, rooted) = fixture();
        let mut file = rooted.open("docs/note.txt").expect("open");
        let mut content = String::new();
        file.read_to_string(&mut content).expect("read");
        assert_eq!(content, "hello");
    }

    #[test]
    fn empty_path_addresses_the_root() {
        let (_dir, rooted) = fixture();
        let names: Vec<String> = rooted
            .read_dir("")
            .expect("read root")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert!(names.contains(&"docs".to_string()));
        assert!(names.contains(&"top.txt".to_string()));

        for alias in ["", "/", "."] {
            let mut listed: Vec<String> = rooted
                .read_dir(alias)
                .expect("read alias")
                .into_iter()
                .map(|(name, _)| name)
                .collect();
            listed.sort();
            let mut expected = names.clone();
            expected.sort();
            assert_eq!(listed, expected, "alias {:?}", alias);
        }
    }

    #[test]
    fn refuses_parent_traversal_without_touching_the_fs() {
        let (_dir, rooted) = fixture();
        for hostile in ["..", "../outside.txt", "docs/../../outside.txt", "/../x"] {
            assert!(
                matches!(rooted.open(hostile), Err(StorageError::InvalidPath(_))),
                "expected refusal for {:?}",
                hostile
            );
        }
    }

    #[test]
    fn errors_do_not_leak_the_absolute_root() {
        let (dir, rooted) = fixture();
        let err = rooted.open("missing.txt").unwrap_err();
        let message = err.to_string();
        assert!(!message.contains(&dir.path().display().to_string()));
        assert!(message.contains("missing.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn refuses_symlink_escape() {
        let (dir, rooted) = fixture();
        let outside = tempfile::tempdir().expect("outside dir");
        std::fs::write(outside.path().join("secret.txt"), b"secret").expect("write");
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("sneaky.txt"),
        )
        .expect("symlink");

        let err = rooted.open("sneaky.txt").unwrap_err();
        assert!(
            matches!(err, StorageError::PathEscape(_)),
            "expected escape refusal, got {:?}",
            err
        );
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinks_that_stay_inside_the_root() {
        let (dir, rooted) = fixture();
        std::os::unix::fs::symlink(dir.path().join("docs/note.txt"), dir.path().join("alias.txt"))
            .expect("symlink");

        let mut file = rooted.open("alias.txt").expect("open in-root symlink");
        let mut content = String::new();
        file.read_to_string(&mut content).expect("read");
        assert_eq!(content, "hello");
    }

    #[test]
    fn missing_nodes_are_not_found() {
        let (_dir, rooted) = fixture();
        assert!(matches!(
            rooted.stat("nope/nothing.txt"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn adversarial_strings_never_resolve_outside_the_root() {
        let (dir, rooted) = fixture();
        let root = dir.path().canonicalize().expect("canonical root");
        let hostile = [
            "..",
            "../..",
            "....//",
            "..%2F..",
            "a/../../b",
            "/etc/passwd",
            "//etc//passwd",
            "docs/%2e%2e/top.txt",
        ];
        for input in hostile {
            match rooted.open_dir(input) {
                Ok((_handle, path)) => {
                    let real = path.canonicalize().expect("canonicalize walk root");
                    assert!(real.starts_with(&root), "escaped via {:?}", input);
                }
                Err(_) => {}
            }
        }
    }
}

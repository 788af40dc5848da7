//! Fast-resume files stored next to the downloaded payload.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ResumeError;

const EXTENSION: &str = "fastresume";

/// Reads and writes `<save_path>/<name>.fastresume`.
#[derive(Debug, Clone)]
pub struct FastResumeStore {
    root: PathBuf,
}

impl FastResumeStore {
    /// Store rooted at the torrent save path.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the resume files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File used for the torrent called `name`; the name cannot escape the root.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        let mut file = sanitize_filename::sanitize(name);
        if file.is_empty() {
            file.push_str("unnamed");
        }
        self.root.join(format!("{file}.{EXTENSION}"))
    }

    /// Previously saved resume data, `None` when no file exists.
    ///
    /// # Errors
    ///
    /// Returns [`ResumeError::Read`] when the file exists but cannot be read.
    pub fn load(&self, name: &str) -> Result<Option<Vec<u8>>, ResumeError> {
        let path = self.path_for(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ResumeError::Read { path, source }),
        }
    }

    /// Write `payload` verbatim, creating the root directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ResumeError::CreateDir`] or [`ResumeError::Write`] on IO failure.
    pub fn save(&self, name: &str, payload: &[u8]) -> Result<PathBuf, ResumeError> {
        fs::create_dir_all(&self.root).map_err(|source| ResumeError::CreateDir {
            path: self.root.clone(),
            source,
        })?;
        let path = self.path_for(name);
        fs::write(&path, payload).map_err(|source| ResumeError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_then_load_returns_the_same_bytes() {
        let dir = TempDir::new().expect("tempdir");
        let store = FastResumeStore::new(dir.path().join("output"));

        assert_eq!(store.load("ubuntu.iso").expect("missing is fine"), None);
        let path = store.save("ubuntu.iso", b"resume").expect("saved");
        assert_eq!(path, dir.path().join("output").join("ubuntu.iso.fastresume"));
        assert_eq!(
            store.load("ubuntu.iso").expect("readable"),
            Some(b"resume".to_vec())
        );
    }

    #[test]
    fn names_cannot_escape_the_root() {
        let store = FastResumeStore::new("/srv/output");
        let path = store.path_for("../../etc/passwd");
        assert_eq!(path.parent(), Some(Path::new("/srv/output")));

        let nested = store.path_for("album/disc 1");
        assert_eq!(nested.parent(), Some(Path::new("/srv/output")));
        assert!(store.path_for("").ends_with("unnamed.fastresume"));
    }

    #[test]
    fn unreadable_entry_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let store = FastResumeStore::new(dir.path());
        fs::create_dir_all(store.path_for("dir")).expect("mkdir");
        assert!(matches!(store.load("dir"), Err(ResumeError::Read { .. })));
    }
}

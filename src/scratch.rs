//! Request-scoped temporary files.
//!
//! A [`Scratch`] is a registry of paths that must not outlive the work that
//! created them. Each file is registered the moment it is created and the
//! whole set is removed when the last handle is dropped, including when axum
//! drops the handler future because the client went away. Handles are cheap
//! clones; a blocking task that still writes into a registered path keeps the
//! registry alive until it finishes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Shared handle to a set of temporary paths deleted on drop.
#[derive(Clone, Default)]
pub struct Scratch {
    inner: Arc<Registry>,
}

#[derive(Default)]
struct Registry {
    paths: Mutex<Vec<PathBuf>>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` for removal. Registering the same path twice is harmless.
    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut paths = self.inner.paths.lock().unwrap_or_else(PoisonError::into_inner);
        if !paths.contains(&path) {
            debug!("Scratch: tracking {}", path.display());
            paths.push(path);
        }
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.inner
            .paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let paths = std::mem::take(self.paths.get_mut().unwrap_or_else(PoisonError::into_inner));
        // Newest first: derived files go before the files they came from.
        for path in paths.iter().rev() {
            remove_quietly(path);
        }
    }
}

/// Best-effort delete. A missing file is not an error; anything else is
/// logged and swallowed so cleanup never masks the request's own result.
pub fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed temporary file {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temporary file {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_removed_when_last_handle_drops() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let scratch = Scratch::new();
        scratch.register(&a);
        let clone = scratch.clone();
        clone.register(&b);
        assert_eq!(scratch.len(), 2);

        drop(scratch);
        assert!(a.exists() && b.exists(), "clone still alive");

        drop(clone);
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn missing_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = Scratch::new();
        scratch.register(dir.path().join("never-created"));
        drop(scratch);
    }

    #[test]
    fn duplicate_registration_is_tracked_once() {
        let scratch = Scratch::new();
        scratch.register("/tmp/same");
        scratch.register("/tmp/same");
        assert_eq!(scratch.len(), 1);
    }

    #[test]
    fn cleanup_runs_on_early_return() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.pdf");

        let run = || -> Result<(), String> {
            let scratch = Scratch::new();
            std::fs::write(&path, b"%PDF-1.4").map_err(|e| e.to_string())?;
            scratch.register(&path);
            Err("extraction failed".to_string())
        };

        assert!(run().is_err());
        assert!(!path.exists());
    }
}

// src/utils/scoped.rs
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};
use uuid::Uuid;

// Transient files still on disk. The interrupt handler removes whatever is
// left here before exiting.
static PENDING: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

fn pending() -> std::sync::MutexGuard<'static, Vec<PathBuf>> {
    PENDING.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A file that exists for the lifetime of the guard.
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    /// Writes `contents` to a uniquely named hidden file in `dir`.
    pub fn create(dir: &Path, label: &str, contents: &str) -> io::Result<Self> {
        let path = dir.join(format!(".{}-{}.cnf", label, Uuid::new_v4()));
        pending().push(path.clone());

        // Construct the guard first so a failed write still cleans up.
        let guard = Self { path };
        fs::write(&guard.path, contents)?;
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
        pending().retain(|p| p != &self.path);
    }
}

/// Removes every transient file still registered and returns how many were removed.
pub fn purge_pending() -> usize {
    let paths: Vec<PathBuf> = pending().drain(..).collect();
    remove_all(&paths)
}

fn remove_all(paths: &[PathBuf]) -> usize {
    paths
        .iter()
        .filter(|path| fs::remove_file(path).is_ok())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_is_removed_when_guard_drops() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let guard = ScopedFile::create(dir.path(), "policy", "[v3_ext]\n").unwrap();
            assert_eq!(fs::read_to_string(guard.path()).unwrap(), "[v3_ext]\n");
            guard.path().to_path_buf()
        };
        assert!(!path.exists());
        assert!(!pending().contains(&path));
    }

    #[test]
    fn file_is_removed_on_early_return() {
        fn failing_step(dir: &Path) -> Result<PathBuf, String> {
            let guard = ScopedFile::create(dir, "policy", "x").map_err(|e| e.to_string())?;
            let path = guard.path().to_path_buf();
            Err(path.display().to_string())
        }

        let dir = tempfile::tempdir().unwrap();
        let leaked = failing_step(dir.path()).unwrap_err();
        assert!(!Path::new(&leaked).exists());
    }

    #[test]
    fn purge_removes_registered_files() {
        let dir = tempfile::tempdir().unwrap();
        let guard = ScopedFile::create(dir.path(), "interrupted", "x").unwrap();
        let path = guard.path().to_path_buf();
        // Simulates the interrupt path, where destructors never run.
        std::mem::forget(guard);

        assert!(path.exists());
        assert!(pending().contains(&path));
        assert_eq!(remove_all(&[path.clone()]), 1);
        assert!(!path.exists());
        pending().retain(|p| p != &path);
    }
}

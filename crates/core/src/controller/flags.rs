//! Out-of-band operator inputs: well-known marker files on disk, plus the
//! remote force-up flag flipped by the telemetry subscriber. The atomic is
//! the only state shared across threads; the supervisor reads it without
//! blocking.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct OverrideFlags {
    shutdown_marker: PathBuf,
    defer_marker: PathBuf,
    force_up: Arc<AtomicBool>,
}

impl OverrideFlags {
    pub fn new(shutdown_marker: impl Into<PathBuf>, defer_marker: impl Into<PathBuf>) -> Self {
        Self {
            shutdown_marker: shutdown_marker.into(),
            defer_marker: defer_marker.into(),
            force_up: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for the telemetry subscriber to write into.
    pub fn force_up_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.force_up)
    }

    /// An operator asked for shutdown now, regardless of remaining stay-up.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_marker.exists()
    }

    /// An operator asked the next shutdown to be deferred.
    pub fn defer_requested(&self) -> bool {
        self.defer_marker.exists()
    }

    /// Remote hold: keep the node up while set.
    pub fn force_up(&self) -> bool {
        self.force_up.load(Ordering::Relaxed)
    }

    pub fn shutdown_marker(&self) -> &Path {
        &self.shutdown_marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_track_file_presence() {
        let dir = tempfile::tempdir().unwrap();
        let shutdown = dir.path().join("shutdown");
        let defer = dir.path().join("defer");
        let flags = OverrideFlags::new(&shutdown, &defer);

        assert!(!flags.shutdown_requested());
        assert!(!flags.defer_requested());

        std::fs::write(&shutdown, b"").unwrap();
        assert!(flags.shutdown_requested());
        assert!(!flags.defer_requested());

        std::fs::write(&defer, b"").unwrap();
        assert!(flags.defer_requested());
    }

    #[test]
    fn force_up_is_shared() {
        let flags = OverrideFlags::new("/nonexistent/a", "/nonexistent/b");
        let handle = flags.force_up_flag();
        assert!(!flags.force_up());
        handle.store(true, Ordering::Relaxed);
        assert!(flags.force_up());
    }
}

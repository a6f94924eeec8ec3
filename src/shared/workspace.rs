//! Per-invocation scratch directories with guaranteed cleanup.

use std::path::Path;

use tempfile::TempDir;

use crate::error::ScanError;

/// A freshly-created directory owned by exactly one scan invocation.
///
/// Every downloaded or synthesized artifact of a scan lives inside the
/// workspace, and the backing directory is removed when the workspace is
/// dropped, on success, error, and unwinding alike. The unique suffix
/// from `tempfile` keeps concurrent scans on disjoint paths.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new(prefix: &str) -> Result<Self, ScanError> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(ScanError::Workspace)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_removed_on_drop() {
        let ws = Workspace::new("tfgate-test-").unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.is_dir());
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn workspace_is_removed_when_a_scan_panics() {
        let path = {
            let captured = std::sync::Arc::new(std::sync::Mutex::new(None));
            let captured_clone = captured.clone();
            let result = std::panic::catch_unwind(move || {
                let ws = Workspace::new("tfgate-panic-").unwrap();
                *captured_clone.lock().unwrap() = Some(ws.path().to_path_buf());
                panic!("simulated scan failure");
            });
            assert!(result.is_err());
            let guard = captured.lock().unwrap();
            guard.clone().unwrap()
        };
        assert!(!path.exists());
    }

    #[test]
    fn concurrent_workspaces_do_not_collide() {
        let a = Workspace::new("tfgate-scan-").unwrap();
        let b = Workspace::new("tfgate-scan-").unwrap();
        assert_ne!(a.path(), b.path());
    }
}

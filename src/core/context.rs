//! Capability wiring for the scan pipelines.

use std::sync::Arc;

use crate::fetch::{GoGetter, RemoteFetcher};
use crate::shared::exec::{CommandRunner, OsCommandRunner};

/// The capabilities a scan needs from the outside world: a remote
/// fetcher and a command runner. Production wiring talks to the network
/// and the OS; tests substitute fakes at construction time instead of
/// patching globals.
#[derive(Clone)]
pub struct ScanContext {
    pub fetcher: Arc<dyn RemoteFetcher>,
    pub runner: Arc<dyn CommandRunner>,
}

impl ScanContext {
    /// Production wiring: go-getter style fetcher + OS process runner.
    pub fn new() -> Self {
        Self::with_parts(Arc::new(GoGetter::new()), Arc::new(OsCommandRunner))
    }

    pub fn with_parts(fetcher: Arc<dyn RemoteFetcher>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { fetcher, runner }
    }
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::new()
    }
}

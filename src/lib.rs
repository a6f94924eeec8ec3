// Re-export modules for testing and external use
pub mod conftest;
pub mod error;
pub mod fetch;
pub mod tflint;

pub mod core {
    pub mod context;
}

pub mod mcp {
    pub mod server;
    pub mod types;
}

pub mod shared {
    pub mod exec;
    pub mod workspace;
}

// Re-export commonly used types for easier testing and external use
pub use crate::core::context::ScanContext;
pub use error::ScanError;
pub use fetch::{FetchError, GoGetter, RemoteFetcher};
pub use mcp::server::TfGateServer;
pub use shared::exec::{CommandOutput, CommandRunner, OsCommandRunner};
pub use shared::workspace::Workspace;

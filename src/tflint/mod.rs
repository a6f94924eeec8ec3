//! TFLint scan pipeline: config materialization, binary invocation, and
//! structured result parsing.

pub mod config;
pub mod scanner;
pub mod types;

pub use scanner::scan;
pub use types::{Issue, Point, Range, ScanParam, ScanResult, ScanSummary};

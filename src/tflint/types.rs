use serde::{Deserialize, Serialize};

/// Input parameters for a TFLint scan.
#[derive(Debug, Clone, Default)]
pub struct ScanParam {
    /// Type of Terraform code to scan: "reusable" (default) or "example".
    /// Mutually exclusive with `remote_config_url`.
    pub category: String,
    /// go-getter URL of a single-file TFLint config. Mutually exclusive
    /// with `category`.
    pub remote_config_url: String,
    /// Directory containing the Terraform code. Defaults to the current
    /// working directory.
    pub target_directory: String,
    /// TFLint rule IDs disabled for this scan.
    pub ignored_rule_ids: Vec<String>,
}

/// Result of a complete TFLint scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub success: bool,
    pub category: String,
    pub target_directory: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    pub output: String,
    pub summary: ScanSummary,
}

/// A single finding, either a TFLint issue or an application error
/// converted to `rule = "tflint_error"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub rule: String,
    pub severity: String,
    pub message: String,
    pub range: Range,
}

/// Source location of an issue, verbatim from the tool output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Range {
    pub filename: String,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point {
    pub line: i64,
    pub column: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub total_issues: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

/// Raw TFLint JSON output shape (`tflint --format=json`).
#[derive(Debug, Deserialize)]
pub struct RawOutput {
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default)]
    pub errors: Vec<RawError>,
}

#[derive(Debug, Deserialize)]
pub struct RawIssue {
    pub rule: RawRule,
    pub message: String,
    #[serde(default)]
    pub range: Range,
}

#[derive(Debug, Deserialize)]
pub struct RawRule {
    pub name: String,
    pub severity: String,
}

#[derive(Debug, Deserialize)]
pub struct RawError {
    pub message: String,
    #[serde(default)]
    pub range: Range,
}

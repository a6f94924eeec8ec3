use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Input parameters for a Conftest scan.
#[derive(Debug, Clone)]
pub struct ScanParam {
    /// Predefined policy library alias: "aprl", "avmsec", "all", or empty
    /// (defaults to "all"). Mutually exclusive with `policy_urls`.
    pub predefined_policy_library_alias: String,
    /// Policy bundle URLs in go-getter format. Mutually exclusive with
    /// the alias.
    pub policy_urls: Vec<String>,
    /// Required path to a Terraform plan (JSON) or state file.
    pub target_file: String,
    /// Policies suppressed via synthesized Rego exception files.
    pub ignored_policies: Vec<IgnoredPolicy>,
    /// Namespaces to test; empty means all namespaces.
    pub namespaces: Vec<String>,
    /// Whether to append the default AVM exceptions bundle. Defaults to
    /// true.
    pub include_default_avm_exceptions: bool,
}

impl Default for ScanParam {
    fn default() -> Self {
        Self {
            predefined_policy_library_alias: String::new(),
            policy_urls: Vec::new(),
            target_file: String::new(),
            ignored_policies: Vec::new(),
            namespaces: Vec::new(),
            include_default_avm_exceptions: true,
        }
    }
}

/// A Rego rule to suppress, identified by namespace and rule name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoredPolicy {
    pub namespace: String,
    pub name: String,
}

/// Which policy namespaces conftest evaluates. Exactly one of the two
/// flag families is ever emitted on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceSelection {
    All,
    Only(Vec<String>),
}

impl NamespaceSelection {
    pub fn from_list(namespaces: &[String]) -> Self {
        if namespaces.is_empty() {
            NamespaceSelection::All
        } else {
            NamespaceSelection::Only(namespaces.to_vec())
        }
    }

    pub fn flags(&self) -> Vec<String> {
        match self {
            NamespaceSelection::All => vec!["--all-namespaces".to_string()],
            NamespaceSelection::Only(namespaces) => namespaces
                .iter()
                .flat_map(|ns| ["--namespace".to_string(), ns.clone()])
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Directory,
    File,
}

/// A resolved policy source. `resolved_path` and `source_type` are
/// workspace internals; the hand-written `Serialize` impl below is the
/// external contract and exposes only `original_url` and `policy_count`.
#[derive(Debug, Clone)]
pub struct PolicySource {
    pub original_url: String,
    pub resolved_path: PathBuf,
    pub source_type: SourceType,
    pub policy_count: usize,
}

impl Serialize for PolicySource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PolicySource", 2)?;
        state.serialize_field("original_url", &self.original_url)?;
        state.serialize_field("policy_count", &self.policy_count)?;
        state.end()
    }
}

/// A failed policy evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub policy: String,
    pub rule: String,
    pub message: String,
    pub namespace: String,
    pub severity: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource: String,
}

/// A warning-level policy result.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub policy: String,
    pub rule: String,
    pub message: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub total_violations: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub policies_run: usize,
}

/// Result of a complete Conftest scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub success: bool,
    pub target_file: String,
    pub policy_sources: Vec<PolicySource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    pub output: String,
    pub summary: Summary,
}

/// Raw conftest JSON output: an array of per-namespace records.
pub type RawOutput = Vec<NamespaceResult>;

#[derive(Debug, Deserialize)]
pub struct NamespaceResult {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub successes: i64,
    #[serde(default)]
    pub failures: Vec<ResultDetail>,
    #[serde(default)]
    pub warnings: Vec<ResultDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ResultDetail {
    pub msg: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

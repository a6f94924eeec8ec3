//! Ignored-policy materialization: synthesized Rego exception files,
//! one directory per suppressed namespace.

use std::collections::BTreeMap;
use std::path::Path;

use crate::conftest::types::{IgnoredPolicy, PolicySource, SourceType};
use crate::error::ScanError;

/// Validates every ignored policy, reporting the first offender by index.
pub fn validate_ignored_policies(ignored: &[IgnoredPolicy]) -> Result<(), ScanError> {
    for (index, policy) in ignored.iter().enumerate() {
        if policy.namespace.is_empty() {
            return Err(ScanError::validation(format!(
                "ignored_policies[{index}]: namespace is required"
            )));
        }
        if policy.name.is_empty() {
            return Err(ScanError::validation(format!(
                "ignored_policies[{index}]: name is required"
            )));
        }
    }
    Ok(())
}

/// Writes one `exceptions_<ns>/exceptions_<ns>.rego` per suppressed
/// namespace and returns the directories as additional policy sources.
///
/// Namespaces are emitted sorted by their lowercased form, rule names in
/// first-seen order, so identical input always produces identical files.
pub fn materialize_ignored_policies(
    workspace: &Path,
    ignored: &[IgnoredPolicy],
) -> Result<Vec<PolicySource>, ScanError> {
    if ignored.is_empty() {
        return Ok(Vec::new());
    }

    let mut grouped: BTreeMap<String, (String, Vec<String>)> = BTreeMap::new();
    for policy in ignored {
        let entry = grouped
            .entry(policy.namespace.to_lowercase())
            .or_insert_with(|| (policy.namespace.clone(), Vec::new()));
        entry.1.push(policy.name.clone());
    }

    let mut sources = Vec::with_capacity(grouped.len());
    for (lowered, (namespace, rules)) in grouped {
        let namespace_dir = workspace.join(format!("exceptions_{lowered}"));
        std::fs::create_dir_all(&namespace_dir).map_err(ScanError::Workspace)?;

        let exception_file = namespace_dir.join(format!("exceptions_{lowered}.rego"));
        std::fs::write(&exception_file, exception_rego(&namespace, &rules))
            .map_err(ScanError::Workspace)?;

        sources.push(PolicySource {
            original_url: "ignore-config".to_string(),
            resolved_path: namespace_dir,
            source_type: SourceType::Directory,
            policy_count: 1,
        });
    }

    Ok(sources)
}

/// Renders the exception document for one namespace.
fn exception_rego(namespace: &str, rules: &[String]) -> String {
    let quoted: Vec<String> = rules.iter().map(|rule| format!("\"{rule}\"")).collect();
    format!(
        "package {namespace}\n\nimport rego.v1\n\nexception contains rules if {{\n    rules = [{}]\n}}",
        quoted.join(", ")
    )
}

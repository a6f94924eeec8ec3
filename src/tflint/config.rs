//! TFLint config resolution: one HCL file per scan, downloaded either
//! from a predefined category URL or from a caller-supplied remote URL.

use std::path::{Path, PathBuf};

use crate::core::context::ScanContext;
use crate::error::ScanError;
use crate::fetch::timeout_from_env;

pub const REMOTE_CONFIG_TIMEOUT_VAR: &str = "TFLINT_REMOTE_CONFIG_TIMEOUT_SECONDS";

const REUSABLE_CONFIG_URL: &str = "https://raw.githubusercontent.com/Azure/avm-terraform-governance/refs/heads/main/tflint-configs/avm.tflint.hcl";
const EXAMPLE_CONFIG_URL: &str = "https://raw.githubusercontent.com/Azure/avm-terraform-governance/refs/heads/main/tflint-configs/avm.tflint_example.hcl";

/// Normalizes a category, falling back to "reusable" when empty or
/// unknown.
pub fn normalize_category(category: &str) -> &'static str {
    match category {
        "example" => "example",
        _ => "reusable",
    }
}

fn config_url(category: &str) -> &'static str {
    match category {
        "example" => EXAMPLE_CONFIG_URL,
        _ => REUSABLE_CONFIG_URL,
    }
}

/// Rejects `git::` URLs that point at a repository root instead of a
/// single file inside it. Catches the common misuse before any fetch.
pub fn validate_remote_config_url(url: &str) -> Result<(), ScanError> {
    if url.starts_with("git::") && !url.contains(".git//") {
        return Err(ScanError::validation(format!(
            "git repository root detected: remote_config_url must point to a single file inside the repository (e.g. git::https://host/org/repo.git//configs/avm.tflint.hcl), got: {url}"
        )));
    }
    Ok(())
}

/// Materializes the single config file for this scan into the workspace
/// and returns its absolute path.
pub async fn resolve_config(
    ctx: &ScanContext,
    workspace: &Path,
    category: &str,
    remote_config_url: &str,
) -> Result<PathBuf, ScanError> {
    let timeout = timeout_from_env(REMOTE_CONFIG_TIMEOUT_VAR);

    if !remote_config_url.is_empty() {
        let dst = workspace.join("remote.tflint.hcl");
        ctx.fetcher
            .fetch_file(remote_config_url, &dst, timeout)
            .await
            .map_err(|e| ScanError::fetch(remote_config_url, e))?;
        return Ok(dst);
    }

    let url = config_url(normalize_category(category));
    let dst = workspace.join("base.tflint.hcl");
    ctx.fetcher
        .fetch_file(url, &dst, timeout)
        .await
        .map_err(|e| ScanError::fetch(url, e))?;
    Ok(dst)
}

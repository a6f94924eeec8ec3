//! Policy source resolution: alias expansion, bundle downloads, and the
//! default AVM exceptions.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use walkdir::WalkDir;

use crate::conftest::types::{PolicySource, ScanParam, SourceType};
use crate::core::context::ScanContext;
use crate::error::ScanError;
use crate::fetch::timeout_from_env;

pub const POLICY_DOWNLOAD_TIMEOUT_VAR: &str = "CONFTEST_POLICY_DOWNLOAD_TIMEOUT_SECONDS";

const APRL_POLICY_URL: &str =
    "git::https://github.com/Azure/policy-library-avm.git//policy/Azure-Proactive-Resiliency-Library-v2";
const AVMSEC_POLICY_URL: &str =
    "git::https://github.com/Azure/policy-library-avm.git//policy/avmsec";

// The upstream exceptions file really is named `.rego.bak`; the URL is
// mirrored verbatim. See README.
pub const DEFAULT_AVM_EXCEPTIONS_URL: &str =
    "https://raw.githubusercontent.com/Azure/policy-library-avm/refs/heads/main/policy/avmsec/avm_exceptions.rego.bak";

static PREDEFINED_POLICY_LIBRARIES: Lazy<HashMap<&'static str, Vec<&'static str>>> =
    Lazy::new(|| {
        HashMap::from([
            ("aprl", vec![APRL_POLICY_URL]),
            ("avmsec", vec![AVMSEC_POLICY_URL]),
            ("all", vec![APRL_POLICY_URL, AVMSEC_POLICY_URL]),
        ])
    });

/// Expands a predefined library alias into its URL list. The empty alias
/// means "all".
pub fn resolve_predefined_library(alias: &str) -> Result<Vec<String>, ScanError> {
    let key = if alias.is_empty() { "all" } else { alias };
    PREDEFINED_POLICY_LIBRARIES
        .get(key)
        .map(|urls| urls.iter().map(|u| u.to_string()).collect())
        .ok_or_else(|| {
            ScanError::validation(format!("invalid predefined_policy_library_alias: {alias}"))
        })
}

/// Downloads every policy source for this scan into the workspace and
/// returns them in order: caller URLs first, then the default AVM
/// exceptions when requested. Ignore-config sources are appended later by
/// the ignore materializer.
pub async fn resolve_policy_sources(
    ctx: &ScanContext,
    workspace: &Path,
    param: &ScanParam,
) -> Result<Vec<PolicySource>, ScanError> {
    let urls = if !param.policy_urls.is_empty() {
        param.policy_urls.clone()
    } else {
        resolve_predefined_library(&param.predefined_policy_library_alias)?
    };

    let timeout = timeout_from_env(POLICY_DOWNLOAD_TIMEOUT_VAR);
    let mut sources = Vec::with_capacity(urls.len() + 1);

    for (index, url) in urls.iter().enumerate() {
        // The workspace is exclusive to this scan, so an index-based
        // subdirectory is collision-proof even for duplicate URLs.
        let policy_dir = workspace.join(format!("policy-{index}"));
        std::fs::create_dir_all(&policy_dir).map_err(ScanError::Workspace)?;

        ctx.fetcher
            .fetch_any(url, &policy_dir, timeout)
            .await
            .map_err(|e| ScanError::fetch(url, e))?;

        let policy_count = count_rego_files(&policy_dir);
        sources.push(PolicySource {
            original_url: url.clone(),
            resolved_path: policy_dir,
            source_type: SourceType::Directory,
            policy_count,
        });
    }

    if param.include_default_avm_exceptions {
        sources.push(download_default_avm_exceptions(ctx, workspace, timeout).await?);
    }

    Ok(sources)
}

/// Fetches the default AVM exceptions file into its own directory. The
/// caller opted in, so a failed fetch is fatal rather than degraded.
async fn download_default_avm_exceptions(
    ctx: &ScanContext,
    workspace: &Path,
    timeout: std::time::Duration,
) -> Result<PolicySource, ScanError> {
    let exceptions_dir = workspace.join("default_exceptions");
    std::fs::create_dir_all(&exceptions_dir).map_err(ScanError::Workspace)?;

    let exceptions_file = exceptions_dir.join("avmsec_exceptions.rego");
    ctx.fetcher
        .fetch_file(DEFAULT_AVM_EXCEPTIONS_URL, &exceptions_file, timeout)
        .await
        .map_err(|e| ScanError::fetch(DEFAULT_AVM_EXCEPTIONS_URL, e))?;

    Ok(PolicySource {
        original_url: DEFAULT_AVM_EXCEPTIONS_URL.to_string(),
        resolved_path: exceptions_dir,
        source_type: SourceType::Directory,
        policy_count: 1,
    })
}

/// Counts `.rego` files under `dir` recursively, matching the extension
/// case-insensitively. Unreadable entries are skipped rather than failing
/// the scan.
pub fn count_rego_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .ends_with(".rego")
        })
        .count()
}

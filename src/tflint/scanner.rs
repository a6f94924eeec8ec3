//! TFLint scan orchestration: validate, materialize config, init, scan,
//! parse.

use std::path::{Path, PathBuf};

use crate::core::context::ScanContext;
use crate::error::ScanError;
use crate::shared::workspace::Workspace;
use crate::tflint::config::{normalize_category, resolve_config, validate_remote_config_url};
use crate::tflint::types::{Issue, RawOutput, ScanParam, ScanResult, ScanSummary};

const TOOL: &str = "tflint";

/// Runs a complete TFLint scan.
///
/// A non-zero tflint exit whose stdout still parses as the TFLint JSON
/// shape is the findings case and yields a successful result; everything
/// else surfaces as a typed [`ScanError`].
pub async fn scan(ctx: &ScanContext, param: ScanParam) -> Result<ScanResult, ScanError> {
    if !param.category.is_empty() && !param.remote_config_url.is_empty() {
        return Err(ScanError::validation(
            "category and remote_config_url are mutually exclusive; set only one",
        ));
    }
    validate_remote_config_url(&param.remote_config_url)?;

    let category = normalize_category(&param.category).to_string();
    let target_directory = resolve_target_directory(&param.target_directory)?;

    let workspace = Workspace::new("tflint-config-")?;
    let config_path = resolve_config(
        ctx,
        workspace.path(),
        &category,
        &param.remote_config_url,
    )
    .await?;

    let init_output = run_init(ctx, &target_directory, &config_path)?;
    let scan_output = run_scan(ctx, &target_directory, &config_path, &param.ignored_rule_ids)?;

    parse_scan_output(&scan_output, &category, &target_directory, &init_output)
}

/// Resolves the target to an absolute path, defaulting to the current
/// working directory, and requires it to be an existing directory.
fn resolve_target_directory(target: &str) -> Result<PathBuf, ScanError> {
    let path = if target.is_empty() {
        std::env::current_dir().map_err(|e| {
            ScanError::validation(format!("failed to resolve current directory: {e}"))
        })?
    } else {
        let raw = PathBuf::from(target);
        if raw.is_absolute() {
            raw
        } else {
            std::env::current_dir()
                .map_err(|e| {
                    ScanError::validation(format!("failed to resolve current directory: {e}"))
                })?
                .join(raw)
        }
    };

    if !path.exists() {
        return Err(ScanError::validation(format!(
            "target directory does not exist: {}",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(ScanError::validation(format!(
            "target path is not a directory: {}",
            path.display()
        )));
    }
    Ok(path)
}

/// `tflint --init` downloads the plugins the config requires. Any failure
/// here is fatal; there is no findings case for init.
fn run_init(
    ctx: &ScanContext,
    target_directory: &Path,
    config_path: &Path,
) -> Result<String, ScanError> {
    let args = vec!["--init".to_string(), format!("--config={}", config_path.display())];
    let output = ctx
        .runner
        .run(Some(target_directory), TOOL, &args)
        .map_err(|e| ScanError::exec(TOOL, format!("failed to start tflint --init: {e}")))?;

    if !output.success {
        return Err(ScanError::exec(
            TOOL,
            format!("tflint --init failed: {}", output.stderr.trim()),
        ));
    }
    Ok(output.stdout)
}

fn run_scan(
    ctx: &ScanContext,
    target_directory: &Path,
    config_path: &Path,
    ignored_rule_ids: &[String],
) -> Result<String, ScanError> {
    let mut args = vec![
        "--format=json".to_string(),
        format!("--config={}", config_path.display()),
    ];
    for rule in ignored_rule_ids {
        args.push(format!("--disable-rule={rule}"));
    }

    let output = ctx
        .runner
        .run(Some(target_directory), TOOL, &args)
        .map_err(|e| ScanError::exec(TOOL, format!("failed to start tflint: {e}")))?;

    if !output.success {
        // TFLint exits non-zero when issues exist; valid JSON on stdout
        // means findings, not failure.
        if !output.stdout.is_empty()
            && serde_json::from_str::<RawOutput>(&output.stdout).is_ok()
        {
            return Ok(output.stdout);
        }
        return Err(ScanError::exec(
            TOOL,
            format!(
                "tflint scan failed (status {:?}): {}",
                output.status_code,
                output.stderr.trim()
            ),
        ));
    }
    Ok(output.stdout)
}

fn parse_scan_output(
    scan_output: &str,
    category: &str,
    target_directory: &Path,
    init_output: &str,
) -> Result<ScanResult, ScanError> {
    let raw: RawOutput = serde_json::from_str(scan_output)
        .map_err(|e| ScanError::parse(TOOL, &e, scan_output))?;

    let mut issues = Vec::with_capacity(raw.issues.len() + raw.errors.len());
    let mut summary = ScanSummary::default();

    for raw_issue in raw.issues {
        let issue = Issue {
            rule: raw_issue.rule.name,
            severity: raw_issue.rule.severity,
            message: raw_issue.message,
            range: raw_issue.range,
        };
        count_severity(&mut summary, &issue.severity);
        issues.push(issue);
    }

    // Application-level tflint errors become error-severity issues so a
    // single list carries everything the caller must look at.
    for raw_error in raw.errors {
        issues.push(Issue {
            rule: "tflint_error".to_string(),
            severity: "error".to_string(),
            message: raw_error.message,
            range: raw_error.range,
        });
        summary.error_count += 1;
    }

    summary.total_issues = issues.len();

    Ok(ScanResult {
        success: true,
        category: category.to_string(),
        target_directory: target_directory.display().to_string(),
        issues,
        output: format!("Init: {init_output}\nScan: {scan_output}"),
        summary,
    })
}

fn count_severity(summary: &mut ScanSummary, severity: &str) {
    match severity.to_lowercase().as_str() {
        "error" => summary.error_count += 1,
        "warning" => summary.warning_count += 1,
        _ => summary.info_count += 1,
    }
}

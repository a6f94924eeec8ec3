//! Conftest scan orchestration: validate, resolve policies, materialize
//! ignores, run, parse.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::conftest::ignore::{materialize_ignored_policies, validate_ignored_policies};
use crate::conftest::policy::resolve_policy_sources;
use crate::conftest::types::{
    NamespaceSelection, PolicySource, RawOutput, ScanParam, ScanResult, Summary, Violation,
    Warning,
};
use crate::core::context::ScanContext;
use crate::error::ScanError;
use crate::shared::workspace::Workspace;

const TOOL: &str = "conftest";

/// Runs a complete Conftest scan against a plan or state file.
pub async fn scan(ctx: &ScanContext, param: ScanParam) -> Result<ScanResult, ScanError> {
    validate(&param)?;

    let workspace = Workspace::new("conftest-scan-")?;

    let mut policy_sources = resolve_policy_sources(ctx, workspace.path(), &param).await?;
    policy_sources.extend(materialize_ignored_policies(
        workspace.path(),
        &param.ignored_policies,
    )?);

    let selection = NamespaceSelection::from_list(&param.namespaces);
    let args = build_args(&param.target_file, &policy_sources, &selection);

    let output = run_conftest(ctx, &args)?;
    let (violations, warnings) = parse_output(&output)?;

    // Counts come from the arrays we just populated, never from numbers
    // embedded in the tool output.
    let summary = Summary {
        total_violations: violations.len(),
        error_count: violations.len(),
        warning_count: warnings.len(),
        info_count: 0,
        policies_run: policy_sources.len(),
    };

    Ok(ScanResult {
        success: true,
        target_file: param.target_file,
        policy_sources,
        violations,
        warnings,
        output,
        summary,
    })
}

fn validate(param: &ScanParam) -> Result<(), ScanError> {
    if !param.predefined_policy_library_alias.is_empty() && !param.policy_urls.is_empty() {
        return Err(ScanError::validation(
            "predefined_policy_library_alias and policy_urls are mutually exclusive; set only one",
        ));
    }

    if !param.predefined_policy_library_alias.is_empty()
        && !matches!(
            param.predefined_policy_library_alias.as_str(),
            "aprl" | "avmsec" | "all"
        )
    {
        return Err(ScanError::validation(format!(
            "invalid predefined_policy_library_alias: {}",
            param.predefined_policy_library_alias
        )));
    }

    validate_ignored_policies(&param.ignored_policies)?;

    if param.target_file.is_empty() {
        return Err(ScanError::validation("target_file is required"));
    }
    let target = std::path::Path::new(&param.target_file);
    if !target.exists() {
        return Err(ScanError::validation(format!(
            "target file does not exist: {}",
            param.target_file
        )));
    }
    if !target.is_file() {
        return Err(ScanError::validation(format!(
            "target path is not a file: {}",
            param.target_file
        )));
    }

    Ok(())
}

fn build_args(
    target_file: &str,
    policy_sources: &[PolicySource],
    selection: &NamespaceSelection,
) -> Vec<String> {
    let mut args = vec![
        "test".to_string(),
        "--no-color".to_string(),
        "-o".to_string(),
        "json".to_string(),
    ];
    args.extend(selection.flags());
    for source in policy_sources {
        args.push("-p".to_string());
        args.push(source.resolved_path.display().to_string());
    }
    args.push(target_file.to_string());
    args
}

fn run_conftest(ctx: &ScanContext, args: &[String]) -> Result<String, ScanError> {
    let output = ctx
        .runner
        .run(None, TOOL, args)
        .map_err(|e| ScanError::exec(TOOL, format!("failed to start conftest: {e}")))?;

    if !output.success {
        // Conftest exits non-zero when violations exist; valid JSON on
        // stdout means findings, not failure.
        if !output.stdout.is_empty()
            && serde_json::from_str::<RawOutput>(&output.stdout).is_ok()
        {
            return Ok(output.stdout);
        }
        return Err(ScanError::exec(
            TOOL,
            format!(
                "conftest test failed (status {:?}): {}",
                output.status_code,
                output.stderr.trim()
            ),
        ));
    }
    Ok(output.stdout)
}

fn parse_output(output: &str) -> Result<(Vec<Violation>, Vec<Warning>), ScanError> {
    let raw: RawOutput =
        serde_json::from_str(output).map_err(|e| ScanError::parse(TOOL, &e, output))?;

    let mut violations = Vec::new();
    let mut warnings = Vec::new();

    for record in raw {
        for detail in &record.failures {
            violations.push(Violation {
                policy: record.namespace.clone(),
                rule: rule_from_message(&detail.msg),
                message: detail.msg.clone(),
                namespace: record.namespace.clone(),
                severity: "error".to_string(),
                resource: resource_from_message(&detail.msg),
            });
        }
        for detail in &record.warnings {
            warnings.push(Warning {
                policy: record.namespace.clone(),
                rule: rule_from_message(&detail.msg),
                message: detail.msg.clone(),
                namespace: record.namespace.clone(),
                resource: resource_from_message(&detail.msg),
            });
        }
    }

    Ok((violations, warnings))
}

/// Best-effort rule extraction from Azure policy message conventions
/// (`namespace/rule: detail`). Never fails; unknown shapes yield
/// "unknown".
fn rule_from_message(message: &str) -> String {
    match message.split_once(':') {
        Some((head, _)) => {
            let head = head.trim();
            match head.rsplit_once('/') {
                Some((_, tail)) => tail.to_string(),
                None => head.to_string(),
            }
        }
        None => "unknown".to_string(),
    }
}

static QUOTED_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'([^']+)'").expect("quoted token pattern is valid"));

/// Best-effort resource extraction: the first single-quoted token that
/// looks like a Terraform resource address (`azurerm_…` or `module.…`).
fn resource_from_message(message: &str) -> String {
    let Some(capture) = QUOTED_TOKEN.captures(message) else {
        return String::new();
    };
    let token = &capture[1];
    if token.contains('.') && (token.starts_with("azurerm_") || token.starts_with("module.")) {
        token.to_string()
    } else {
        String::new()
    }
}

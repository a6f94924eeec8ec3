//! End-to-end tests for the TFLint scan pipeline with fake fetcher and
//! runner capabilities.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tfgate::fetch::{FetchError, RemoteFetcher};
use tfgate::shared::exec::{CommandOutput, CommandRunner};
use tfgate::tflint::{self, ScanParam};
use tfgate::{ScanContext, ScanError};

/// Fake fetcher that writes canned bytes straight into the target path
/// and records every request.
#[derive(Default)]
struct FakeFetcher {
    /// URL substring → file content; unmatched URLs get a stub config.
    files: HashMap<String, String>,
    /// URL substrings that fail with an HTTP 500.
    failing: Vec<String>,
    /// URL substrings that fail with a timeout.
    timing_out: Vec<String>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeFetcher {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn recorded_workspaces(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, dst)| dst.parent().map(|p| p.to_path_buf()))
            .collect()
    }
}

#[async_trait]
impl RemoteFetcher for FakeFetcher {
    async fn fetch_file(
        &self,
        url: &str,
        dst_file: &Path,
        _timeout: Duration,
    ) -> Result<(), FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), dst_file.to_path_buf()));
        if self.failing.iter().any(|f| url.contains(f.as_str())) {
            return Err(FetchError::HttpStatus(500));
        }
        if self.timing_out.iter().any(|f| url.contains(f.as_str())) {
            return Err(FetchError::Timeout(Duration::from_secs(1)));
        }
        let content = self
            .files
            .iter()
            .find(|(key, _)| url.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| "rule \"terraform_deprecated_syntax\" { enabled = true }".to_string());
        std::fs::write(dst_file, content)?;
        Ok(())
    }

    async fn fetch_any(
        &self,
        url: &str,
        dst_dir: &Path,
        _timeout: Duration,
    ) -> Result<(), FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), dst_dir.to_path_buf()));
        Ok(())
    }
}

/// Fake runner keyed by command-line prefix, in the spirit of the tool's
/// own mocked executors.
struct FakeRunner {
    responses: Vec<(String, CommandOutput)>,
    invocations: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    fn new(responses: Vec<(&str, CommandOutput)>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .map(|(prefix, output)| (prefix.to_string(), output))
                .collect(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(
        &self,
        _dir: Option<&Path>,
        program: &str,
        args: &[String],
    ) -> std::io::Result<CommandOutput> {
        let mut argv = vec![program.to_string()];
        argv.extend(args.iter().cloned());
        self.invocations.lock().unwrap().push(argv.clone());

        let joined = argv.join(" ");
        for (prefix, output) in &self.responses {
            if joined.starts_with(prefix.as_str()) {
                return Ok(output.clone());
            }
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no fake response for: {joined}"),
        ))
    }
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        status_code: Some(0),
        success: true,
    }
}

fn findings(stdout: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        status_code: Some(2),
        success: false,
    }
}

fn context(fetcher: Arc<FakeFetcher>, runner: Arc<FakeRunner>) -> ScanContext {
    ScanContext::with_parts(fetcher, runner)
}

fn target_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.tf"), "resource \"null_resource\" \"x\" {}\n").unwrap();
    dir
}

#[tokio::test]
async fn clean_scan_succeeds_with_empty_summary() {
    let target = target_dir();
    let fetcher = Arc::new(FakeFetcher::default());
    let runner = Arc::new(FakeRunner::new(vec![
        ("tflint --init", ok("init ok")),
        ("tflint --format=json", ok(r#"{"issues":[],"errors":[]}"#)),
    ]));
    let ctx = context(fetcher.clone(), runner.clone());

    let result = tflint::scan(
        &ctx,
        ScanParam {
            target_directory: target.path().display().to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(result.success);
    assert_eq!(result.category, "reusable");
    assert!(result.issues.is_empty());
    assert_eq!(result.summary.total_issues, 0);
    assert!(result.output.starts_with("Init: init ok"));

    // The category config was fetched once, to base.tflint.hcl.
    let calls = fetcher.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.ends_with("avm.tflint.hcl"));
    assert!(calls[0].1.ends_with("base.tflint.hcl"));

    // Init ran before the scan.
    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0][1], "--init");
    assert_eq!(invocations[1][1], "--format=json");
}

#[tokio::test]
async fn findings_with_ignored_rules_disable_flags_and_count() {
    let target = target_dir();
    let scan_json = r#"{
        "issues": [
            {
                "rule": {"name": "azurerm_resource_tagging", "severity": "warning"},
                "message": "resource should be tagged",
                "range": {"filename": "main.tf", "start": {"line": 1, "column": 1}, "end": {"line": 1, "column": 2}}
            }
        ],
        "errors": [
            {
                "message": "failed to evaluate module call",
                "range": {"filename": "main.tf", "start": {"line": 5, "column": 1}, "end": {"line": 5, "column": 2}}
            }
        ]
    }"#;
    let fetcher = Arc::new(FakeFetcher::default());
    let runner = Arc::new(FakeRunner::new(vec![
        ("tflint --init", ok("init ok")),
        ("tflint --format=json", findings(scan_json)),
    ]));
    let ctx = context(fetcher, runner.clone());

    let result = tflint::scan(
        &ctx,
        ScanParam {
            target_directory: target.path().display().to_string(),
            ignored_rule_ids: vec!["terraform_unused_declarations".to_string()],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // Non-zero exit with valid JSON is the findings case, not a failure.
    assert!(result.success);
    assert_eq!(result.issues.len(), 2);
    let error_issue = result.issues.iter().find(|i| i.rule == "tflint_error").unwrap();
    assert_eq!(error_issue.severity, "error");
    assert_eq!(result.summary.total_issues, 2);
    assert_eq!(result.summary.error_count, 1);
    assert_eq!(result.summary.warning_count, 1);
    assert_eq!(result.summary.info_count, 0);

    let scan_argv = &runner.invocations()[1];
    assert!(scan_argv.contains(&"--disable-rule=terraform_unused_declarations".to_string()));
}

#[tokio::test]
async fn git_repo_root_url_is_rejected_before_any_work() {
    let fetcher = Arc::new(FakeFetcher::default());
    let runner = Arc::new(FakeRunner::new(vec![]));
    let ctx = context(fetcher.clone(), runner.clone());

    let err = tflint::scan(
        &ctx,
        ScanParam {
            remote_config_url: "git::https://host/org/repo.git?ref=v1".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("git repository root detected"));
    assert_eq!(fetcher.call_count(), 0, "no fetch may be attempted");
    assert!(runner.invocations().is_empty(), "no binary may be invoked");
}

#[tokio::test]
async fn category_and_remote_config_url_are_mutually_exclusive() {
    let fetcher = Arc::new(FakeFetcher::default());
    let runner = Arc::new(FakeRunner::new(vec![]));
    let ctx = context(fetcher.clone(), runner);

    let err = tflint::scan(
        &ctx,
        ScanParam {
            category: "reusable".to_string(),
            remote_config_url: "https://example.com/config.tflint.hcl".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("mutually exclusive"));
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn remote_config_lands_as_single_file_in_workspace() {
    let target = target_dir();
    let fetcher = Arc::new(FakeFetcher {
        files: HashMap::from([(
            "example.com/remote.tflint.hcl".to_string(),
            "rule \"x\" { enabled = true }".to_string(),
        )]),
        ..Default::default()
    });
    let runner = Arc::new(FakeRunner::new(vec![
        ("tflint --init", ok("init ok")),
        ("tflint --format=json", ok(r#"{"issues":[],"errors":[]}"#)),
    ]));
    let ctx = context(fetcher.clone(), runner);

    let result = tflint::scan(
        &ctx,
        ScanParam {
            remote_config_url: "https://example.com/remote.tflint.hcl".to_string(),
            target_directory: target.path().display().to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(result.success);
    assert_eq!(result.category, "reusable");
    let calls = fetcher.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.ends_with("remote.tflint.hcl"));
}

#[tokio::test]
async fn workspace_is_removed_after_success_and_after_failure() {
    let target = target_dir();

    // Success path.
    let fetcher = Arc::new(FakeFetcher::default());
    let runner = Arc::new(FakeRunner::new(vec![
        ("tflint --init", ok("init ok")),
        ("tflint --format=json", ok(r#"{"issues":[],"errors":[]}"#)),
    ]));
    let ctx = context(fetcher.clone(), runner);
    tflint::scan(
        &ctx,
        ScanParam {
            target_directory: target.path().display().to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    for workspace in fetcher.recorded_workspaces() {
        assert!(!workspace.exists(), "workspace survived: {workspace:?}");
    }

    // Failure path: scan output is not JSON and exit is non-zero.
    let fetcher = Arc::new(FakeFetcher::default());
    let runner = Arc::new(FakeRunner::new(vec![
        ("tflint --init", ok("init ok")),
        (
            "tflint --format=json",
            CommandOutput {
                stdout: String::new(),
                stderr: "plugin crashed".to_string(),
                status_code: Some(1),
                success: false,
            },
        ),
    ]));
    let ctx = context(fetcher.clone(), runner);
    let err = tflint::scan(
        &ctx,
        ScanParam {
            target_directory: target.path().display().to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ScanError::Exec { .. }));
    for workspace in fetcher.recorded_workspaces() {
        assert!(!workspace.exists(), "workspace survived: {workspace:?}");
    }
}

#[tokio::test]
async fn init_failure_is_fatal() {
    let target = target_dir();
    let fetcher = Arc::new(FakeFetcher::default());
    let runner = Arc::new(FakeRunner::new(vec![(
        "tflint --init",
        CommandOutput {
            stdout: String::new(),
            stderr: "failed to install plugins".to_string(),
            status_code: Some(1),
            success: false,
        },
    )]));
    let ctx = context(fetcher, runner.clone());

    let err = tflint::scan(
        &ctx,
        ScanParam {
            target_directory: target.path().display().to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("tflint --init failed"));
    assert_eq!(runner.invocations().len(), 1, "scan must not run after failed init");
}

#[tokio::test]
async fn invalid_json_scan_output_is_a_parse_error() {
    let target = target_dir();
    let fetcher = Arc::new(FakeFetcher::default());
    let runner = Arc::new(FakeRunner::new(vec![
        ("tflint --init", ok("init ok")),
        ("tflint --format=json", ok("<html>not json</html>")),
    ]));
    let ctx = context(fetcher, runner);

    let err = tflint::scan(
        &ctx,
        ScanParam {
            target_directory: target.path().display().to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ScanError::Parse { tool: "tflint", .. }));
}

#[tokio::test]
async fn fetch_failure_carries_the_url() {
    let target = target_dir();
    let fetcher = Arc::new(FakeFetcher {
        failing: vec!["avm.tflint.hcl".to_string()],
        ..Default::default()
    });
    let runner = Arc::new(FakeRunner::new(vec![]));
    let ctx = context(fetcher, runner.clone());

    let err = tflint::scan(
        &ctx,
        ScanParam {
            target_directory: target.path().display().to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ScanError::Fetch { .. }));
    assert!(err.to_string().contains("avm.tflint.hcl"));
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn fetch_timeout_is_a_resource_error_mentioning_the_url() {
    let target = target_dir();
    let fetcher = Arc::new(FakeFetcher {
        timing_out: vec!["slow.example.com".to_string()],
        ..Default::default()
    });
    let runner = Arc::new(FakeRunner::new(vec![]));
    let ctx = context(fetcher, runner);

    let err = tflint::scan(
        &ctx,
        ScanParam {
            remote_config_url: "https://slow.example.com/config.tflint.hcl".to_string(),
            target_directory: target.path().display().to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ScanError::Fetch { .. }));
    let text = err.to_string();
    assert!(text.contains("slow.example.com"));
    assert!(text.contains("timed out"));
}

#[tokio::test]
async fn result_json_round_trips_through_its_own_parser_shape() {
    let target = target_dir();
    let scan_json = r#"{"issues":[{"rule":{"name":"r","severity":"error"},"message":"m","range":{"filename":"f.tf","start":{"line":1,"column":1},"end":{"line":1,"column":2}}}],"errors":[]}"#;
    let fetcher = Arc::new(FakeFetcher::default());
    let runner = Arc::new(FakeRunner::new(vec![
        ("tflint --init", ok("init")),
        ("tflint --format=json", ok(scan_json)),
    ]));
    let ctx = context(fetcher, runner);

    let result = tflint::scan(
        &ctx,
        ScanParam {
            target_directory: target.path().display().to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let encoded = serde_json::to_value(&result).unwrap();
    assert_eq!(encoded["summary"]["total_issues"], 1);
    assert_eq!(encoded["issues"][0]["rule"], "r");
    assert_eq!(encoded["issues"][0]["range"]["start"]["line"], 1);
}

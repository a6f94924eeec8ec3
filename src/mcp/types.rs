//! Input types for RMCP tools with automatic JSON Schema generation.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::conftest;
use crate::tflint;

/// Input for the `tflint_scan` tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct TflintScanInput {
    /// Type of Terraform code to scan: "reusable" for reusable modules
    /// (default) or "example" for example code. Mutually exclusive with
    /// `remote_config_url`.
    pub category: Option<String>,
    /// Remote TFLint configuration URL (HTTP(S) or git go-getter syntax,
    /// e.g. git::https://host/org/repo.git//configs/avm.tflint.hcl).
    /// Must point to a single file. Mutually exclusive with `category`.
    pub remote_config_url: Option<String>,
    /// Directory containing the Terraform code to scan. Defaults to the
    /// current working directory.
    pub target_directory: Option<String>,
    /// TFLint rule IDs to disable during scanning
    /// (e.g. "terraform_unused_declarations").
    pub ignored_rule_ids: Option<Vec<String>>,
}

impl From<TflintScanInput> for tflint::ScanParam {
    fn from(input: TflintScanInput) -> Self {
        tflint::ScanParam {
            category: input.category.unwrap_or_default(),
            remote_config_url: input.remote_config_url.unwrap_or_default(),
            target_directory: input.target_directory.unwrap_or_default(),
            ignored_rule_ids: input.ignored_rule_ids.unwrap_or_default(),
        }
    }
}

/// Input for the `conftest_scan` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConftestScanInput {
    /// Required path to the target file: a Terraform plan in JSON format
    /// (generate with `terraform plan -out=plan.tfplan && terraform show
    /// -json plan.tfplan > plan.json`) or a state file.
    pub target_file: String,
    /// Predefined policy library alias: "aprl" (Azure Proactive
    /// Resiliency Library), "avmsec" (AVM security policies), or "all"
    /// (both, the default). Mutually exclusive with `policy_urls`.
    pub predefined_policy_library_alias: Option<String>,
    /// Policy bundle URLs in go-getter format
    /// (git::…, https://…, s3::…, file://…, archives auto-extracted).
    /// Mutually exclusive with `predefined_policy_library_alias`.
    pub policy_urls: Option<Vec<String>>,
    /// Policies to suppress; each entry needs both `namespace` and
    /// `name`.
    pub ignored_policies: Option<Vec<IgnoredPolicyInput>>,
    /// Policy namespaces to test. All namespaces when omitted.
    pub namespaces: Option<Vec<String>>,
    /// Whether to include the default Azure Verified Modules exceptions
    /// bundle. Defaults to true.
    pub include_default_avm_exceptions: Option<bool>,
}

/// One suppressed policy rule.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IgnoredPolicyInput {
    /// Policy namespace (e.g. "avmsec", "aprl").
    pub namespace: String,
    /// Policy rule name (e.g. "storage_account_https_only").
    pub name: String,
}

impl From<ConftestScanInput> for conftest::ScanParam {
    fn from(input: ConftestScanInput) -> Self {
        conftest::ScanParam {
            predefined_policy_library_alias: input
                .predefined_policy_library_alias
                .unwrap_or_default(),
            policy_urls: input.policy_urls.unwrap_or_default(),
            target_file: input.target_file,
            ignored_policies: input
                .ignored_policies
                .unwrap_or_default()
                .into_iter()
                .map(|p| conftest::IgnoredPolicy {
                    namespace: p.namespace,
                    name: p.name,
                })
                .collect(),
            namespaces: input.namespaces.unwrap_or_default(),
            include_default_avm_exceptions: input.include_default_avm_exceptions.unwrap_or(true),
        }
    }
}

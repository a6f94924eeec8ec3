use clap::{Parser, Subcommand};
use tfgate::conftest;
use tfgate::mcp::server::TfGateServer;
use tfgate::tflint;
use tfgate::ScanContext;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "tfgate",
    about = "Gate Terraform code with TFLint and Conftest policy scans, locally or as a Model Context Protocol (MCP) server.",
    version = APP_VERSION,
    disable_version_flag(true)
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, short = 'V', help = "Print version")]
    pub version: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "mcp", about = "Launch tfgate as an MCP server over stdio")]
    Mcp,

    #[command(name = "lint", about = "Run a TFLint scan and print the JSON result")]
    Lint {
        #[arg(long, value_name = "CATEGORY", help = "Config category: reusable or example")]
        category: Option<String>,

        #[arg(
            long,
            value_name = "URL",
            help = "Remote TFLint config URL (go-getter syntax, single file)"
        )]
        remote_config_url: Option<String>,

        #[arg(long, short = 'd', value_name = "PATH", help = "Terraform directory to scan")]
        dir: Option<String>,

        #[arg(long = "ignore-rule", value_name = "RULE_ID", help = "TFLint rule ID to disable")]
        ignored_rules: Vec<String>,
    },

    #[command(name = "policy", about = "Run a Conftest policy scan and print the JSON result")]
    Policy {
        #[arg(
            long,
            short = 'f',
            value_name = "PATH",
            help = "Terraform plan (JSON) or state file to test"
        )]
        target_file: String,

        #[arg(
            long,
            value_name = "ALIAS",
            help = "Predefined policy library: aprl, avmsec, or all"
        )]
        library: Option<String>,

        #[arg(long = "policy-url", value_name = "URL", help = "Policy bundle URL (go-getter syntax)")]
        policy_urls: Vec<String>,

        #[arg(long = "namespace", value_name = "NS", help = "Policy namespace to test")]
        namespaces: Vec<String>,

        #[arg(
            long = "ignore",
            value_name = "NAMESPACE/NAME",
            help = "Policy to suppress, as namespace/name"
        )]
        ignored: Vec<String>,

        #[arg(long, help = "Skip the default AVM exceptions bundle")]
        no_default_avm_exceptions: bool,
    },
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();

    if cli.version {
        println!("{}", APP_VERSION);
        std::process::exit(0);
    }

    match cli.command {
        Some(Commands::Mcp) => {
            info!("Starting tfgate in MCP server mode");
            if let Err(err) = TfGateServer::serve_stdio(ScanContext::new()).await {
                error!("Error launching MCP server: {:?}", err);
                std::process::exit(1);
            }
        }
        Some(Commands::Lint {
            category,
            remote_config_url,
            dir,
            ignored_rules,
        }) => {
            let param = tflint::ScanParam {
                category: category.unwrap_or_default(),
                remote_config_url: remote_config_url.unwrap_or_default(),
                target_directory: dir.unwrap_or_default(),
                ignored_rule_ids: ignored_rules,
            };
            run_lint(param).await;
        }
        Some(Commands::Policy {
            target_file,
            library,
            policy_urls,
            namespaces,
            ignored,
            no_default_avm_exceptions,
        }) => {
            let ignored_policies = match parse_ignored(&ignored) {
                Ok(policies) => policies,
                Err(message) => {
                    error!("{message}");
                    std::process::exit(1);
                }
            };
            let param = conftest::ScanParam {
                predefined_policy_library_alias: library.unwrap_or_default(),
                policy_urls,
                target_file,
                ignored_policies,
                namespaces,
                include_default_avm_exceptions: !no_default_avm_exceptions,
            };
            run_policy(param).await;
        }
        None => {
            println!("No command specified. Use --help for usage information.");
        }
    }
}

async fn run_lint(param: tflint::ScanParam) {
    let ctx = ScanContext::new();
    match tflint::scan(&ctx, param).await {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to encode scan result: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("TFLint scan failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_policy(param: conftest::ScanParam) {
    let ctx = ScanContext::new();
    match conftest::scan(&ctx, param).await {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to encode scan result: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Conftest scan failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Parses `namespace/name` pairs from the CLI into ignored policies.
fn parse_ignored(entries: &[String]) -> Result<Vec<conftest::IgnoredPolicy>, String> {
    entries
        .iter()
        .map(|entry| match entry.split_once('/') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(conftest::IgnoredPolicy {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(format!(
                "invalid --ignore value {entry:?}: expected namespace/name"
            )),
        })
        .collect()
}

fn init_logging() {
    let log_level = std::env::var("TFGATE_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();

    let filter = match log_level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tfgate={},reqwest=warn,hyper=warn", filter).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

//! RMCP-based MCP server exposing the policy-gate tools.

use crate::core::context::ScanContext;
use crate::error::ScanError;
use crate::mcp::types::*;
use crate::{conftest, tflint};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, InitializeResult, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ToolsCapability,
    },
    service::{RequestContext, RoleServer, ServiceExt},
    tool, tool_router,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// MCP server for Terraform policy-gate scans.
#[derive(Clone)]
pub struct TfGateServer {
    ctx: Arc<ScanContext>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TfGateServer {
    pub fn new(ctx: ScanContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            tool_router: Self::tool_router(),
        }
    }

    /// Serve the MCP server over stdio.
    pub async fn serve_stdio(ctx: ScanContext) -> anyhow::Result<()> {
        use tokio::io::{stdin, stdout};

        let server = Self::new(ctx);
        let transport = (stdin(), stdout());

        info!("Starting tfgate MCP server via stdio...");
        let service = server.serve(transport).await?;

        // Wait for the server to finish (keep it alive)
        service.waiting().await?;

        Ok(())
    }

    #[tool(
        description = "Run TFLint against a Terraform directory using the Azure Verified Modules lint configuration (category 'reusable' or 'example') or a caller-supplied remote config URL. Returns structured issues with severities, source ranges, and a summary. A scan that finds issues is still a successful scan.",
        annotations(title = "TFLint Scan", read_only_hint = true)
    )]
    async fn tflint_scan(
        &self,
        params: Parameters<TflintScanInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("Executing tflint_scan tool");
        match tflint::scan(&self.ctx, params.0.into()).await {
            Ok(result) => {
                let json = serde_json::to_string(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            Err(e) => scan_error_response("TFLint scan failed", e),
        }
    }

    #[tool(
        description = "Run Conftest (OPA/Rego) policy tests against a Terraform plan JSON or state file. Policies come from the predefined Azure policy libraries ('aprl', 'avmsec', 'all') or from caller-supplied go-getter URLs; individual policies can be suppressed via ignored_policies. Returns structured violations, warnings, and a summary. A scan that finds violations is still a successful scan.",
        annotations(title = "Conftest Scan", read_only_hint = true)
    )]
    async fn conftest_scan(
        &self,
        params: Parameters<ConftestScanInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("Executing conftest_scan tool");
        match conftest::scan(&self.ctx, params.0.into()).await {
            Ok(result) => {
                let json = serde_json::to_string(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            Err(e) => scan_error_response("Conftest scan failed", e),
        }
    }
}

/// Maps the error taxonomy onto the MCP surface: validation errors are
/// protocol-level invalid_params, everything else is a tool error.
fn scan_error_response(
    prefix: &str,
    error: ScanError,
) -> Result<CallToolResult, McpError> {
    if error.is_validation() {
        return Err(McpError::invalid_params(error.to_string(), None));
    }
    error!("{prefix}: {error}");
    Ok(CallToolResult::error(vec![Content::text(format!(
        "{prefix}: {error}"
    ))]))
}

// The ServerHandler trait requires this specific impl Future pattern
#[allow(clippy::manual_async_fn)]
impl ServerHandler for TfGateServer {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                ..Default::default()
            },
            server_info: Implementation {
                name: "tfgate".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "tfgate gates Terraform code with read-only policy scans: tflint_scan lints Terraform source, conftest_scan tests a plan or state file against OPA/Rego policy libraries.".into(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            let tools = self.tool_router.list_all();
            Ok(ListToolsResult {
                tools,
                ..Default::default()
            })
        }
    }

    fn call_tool(
        &self,
        request: rmcp::model::CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let tool_context =
                rmcp::handler::server::tool::ToolCallContext::new(self, request, context);
            self.tool_router.call(tool_context).await
        }
    }
}

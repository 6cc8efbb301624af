//! Streamable-HTTP MCP server exposing a [`ToolRuntime`].
//!
//! `rmcp` handles the JSON-RPC session on `/mcp`; axum adds bearer-token
//! checks in front of it and a plain `/health` route beside it.

use anyhow::Result;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo, Tool as McpTool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{ErrorData, ServerHandler};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::tools::runtime::ToolRuntime;
use crate::tools::{ToolCall, ToolContext};

#[derive(Clone)]
pub struct McpServer {
    runtime: Arc<ToolRuntime>,
    name: String,
    version: String,
    bearer_token: Option<Arc<str>>,
}

impl McpServer {
    pub fn new(runtime: ToolRuntime) -> Self {
        Self {
            runtime: Arc::new(runtime),
            name: "blog_writing_search_mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            bearer_token: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Require `Authorization: Bearer <token>` on `/mcp`.
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty()).map(Arc::from);
        self
    }

    pub fn router(self) -> Router {
        let handler = self.clone();
        let mcp = StreamableHttpService::new(
            move || Ok(handler.clone()),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig::default(),
        );

        let protected = Router::new()
            .route_service("/mcp", mcp)
            .route_layer(middleware::from_fn_with_state(
                self.bearer_token.clone(),
                require_bearer,
            ));

        Router::new()
            .route("/health", get(health))
            .with_state(self)
            .merge(protected)
            .layer(CorsLayer::permissive())
    }

    fn tool_list(&self) -> Vec<McpTool> {
        self.runtime.descriptors()
    }

    async fn run_tool(&self, request: CallToolRequestParams) -> Result<CallToolResult, ErrorData> {
        let name = request.name.to_string();
        if !self.runtime.contains(&name) {
            return Err(ErrorData::invalid_params(
                format!("Unknown tool: {}", name),
                None,
            ));
        }

        let call = ToolCall {
            name: name.clone(),
            params: Value::Object(request.arguments.unwrap_or_default()),
        };
        let context = ToolContext::new("mcp-client", name.as_str());
        log::info!("mcp tools/call {}", name);

        match self.runtime.execute(&call, &context).await {
            Ok(result) if result.success => {
                Ok(CallToolResult::success(vec![Content::text(result.to_text())]))
            }
            Ok(result) => Ok(CallToolResult::error(vec![Content::text(result.to_text())])),
            Err(e) => {
                log::warn!("tool {} failed: {}", name, e);
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
                ..Default::default()
            },
            instructions: Some("Search, extract and keyword tools for blog research.".to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tool_list()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run_tool(request).await
    }
}

async fn require_bearer(
    State(expected): State<Option<Arc<str>>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = expected.as_deref() {
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected) {
            return (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response();
        }
    }
    next.run(request).await
}

async fn health(State(server): State<McpServer>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "server": server.name,
        "tools": server.runtime.names(),
    }))
}

pub async fn serve(server: McpServer, port: u16) -> Result<()> {
    let app = server.router();
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    log::info!("MCP tool server listening on port {} (/mcp)", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::providers::search::{MockKeywordSource, MockSearchProvider};
    use crate::tools::runtime::ToolConfig;
    use std::borrow::Cow;

    fn test_server() -> McpServer {
        let runtime = ToolRuntime::new(ToolConfig {
            search_provider: Some(Arc::new(MockSearchProvider::new())),
            keyword_source: Some(Arc::new(MockKeywordSource::default())),
            fetch_timeout_secs: 5,
        })
        .unwrap()
        .restricted_to(&crate::definitions::ToolType::research_suite());
        McpServer::new(runtime)
    }

    fn call(name: &str, arguments: Value) -> CallToolRequestParams {
        CallToolRequestParams {
            meta: None,
            name: Cow::Owned(name.to_string()),
            arguments: arguments.as_object().cloned(),
            task: None,
        }
    }

    fn first_text(result: &CallToolResult) -> String {
        crate::mcp::joined_text(result)
    }

    fn mcp_post(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("accept", "application/json, text/event-stream");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder
            .body(Body::from(
                json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string(),
            ))
            .unwrap()
    }

    #[test]
    fn test_server_info_and_name() {
        let info = test_server().get_info();
        assert_eq!(info.server_info.name, "blog_writing_search_mcp");
        assert!(info.capabilities.tools.is_some());

        let info = test_server().with_name("research-tools").get_info();
        assert_eq!(info.server_info.name, "research-tools");
    }

    #[test]
    fn test_tool_list_has_research_suite() {
        let tools = test_server().tool_list();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(
            names,
            vec!["extract_web_content_from_links", "keyword_research", "multi_engine_search"]
        );
        assert_eq!(tools[0].input_schema["type"], "object");
        assert!(tools[2].description.is_some());
    }

    #[tokio::test]
    async fn test_call_returns_text_content() {
        let result = test_server()
            .run_tool(call("multi_engine_search", json!({"query": "AI in healthcare"})))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
        let links: Vec<String> = serde_json::from_str(&first_text(&result)).unwrap();
        assert_eq!(links.len(), 5);
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_in_result() {
        let result = test_server()
            .run_tool(call("keyword_research", json!({})))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(first_text(&result).contains("Missing topic"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let err = test_server()
            .run_tool(call("web_search", json!({"query": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_health_lists_tools() {
        let response = test_server()
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["server"], "blog_writing_search_mcp");
        assert_eq!(json["tools"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_bearer_token_guards_mcp_but_not_health() {
        let app = test_server()
            .with_bearer_token(Some("secret".to_string()))
            .router();

        let response = app.clone().oneshot(mcp_post(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.clone().oneshot(mcp_post(Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.clone().oneshot(mcp_post(Some("secret"))).await.unwrap();
        assert_ne!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_empty_token_disables_auth() {
        let server = test_server().with_bearer_token(Some(String::new()));
        assert!(server.bearer_token.is_none());
    }
}

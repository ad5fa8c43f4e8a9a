//! HTTP transport.
//!
//! JSON-RPC 2.0 over POST, so plain HTTP clients (curl, browsers) can list
//! and call the tools without an MCP session transport. The endpoint is
//! stateless apart from remembering whether a client has initialized.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::McpServer;
use crate::core::server::SERVER_INSTRUCTIONS;

const PROTOCOL_VERSION: &str = "2024-11-05";

const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

pub struct HttpTransport {
    config: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResourceReadParams {
    uri: String,
}

#[derive(Clone)]
struct AppState {
    server: McpServer,
    rpc_path: Arc<str>,
    initialized: Arc<AtomicBool>,
}

impl AppState {
    fn new(server: McpServer, rpc_path: &str) -> Self {
        Self {
            server,
            rpc_path: Arc::from(rpc_path),
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    fn router(&self, server: McpServer) -> Router {
        let state = AppState::new(server, &self.config.rpc_path);

        let app = Router::new()
            .route(&self.config.rpc_path, post(handle_rpc))
            .route("/health", get(health_check))
            .route("/", get(root_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            app
        }
    }

    /// Serve until the listener fails.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let app = self.router(server);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        info!(
            cors = self.config.enable_cors,
            "Listening on http://{}{} (JSON-RPC over POST)", addr, self.config.rpc_path
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))
    }
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "HTTP",
        "protocol": "JSON-RPC 2.0",
        "endpoints": {
            "rpc": &*state.rpc_path,
            "health": "/health"
        },
        "tools": state.server.list_tools().len(),
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[instrument(skip_all, fields(method = %request.method))]
async fn handle_rpc(
    State(state): State<AppState>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    debug!("JSON-RPC request");
    (StatusCode::OK, Json(process_request(&state, request).await))
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, String> {
    let params = params.ok_or_else(|| "Missing params".to_string())?;
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {}", e))
}

async fn process_request(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let JsonRpcRequest {
        jsonrpc,
        id,
        method,
        params,
    } = request;

    if jsonrpc != "2.0" {
        return JsonRpcResponse::error(id, INVALID_REQUEST, "Invalid Request");
    }

    let outcome: Result<Value, String> = match method.as_str() {
        "initialize" => {
            state.initialized.store(true, Ordering::Relaxed);
            Ok(initialize_result(state))
        }
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": state.server.list_tools() })),
        "tools/call" => match parse_params::<ToolCallParams>(params) {
            Ok(call) => {
                info!("Calling tool {}", call.name);
                let arguments = call.arguments.unwrap_or_else(|| json!({}));
                state.server.call_tool(&call.name, arguments).await
            }
            Err(e) => Err(e),
        },
        "resources/list" => Ok(json!({ "resources": state.server.list_resources().await })),
        "resources/read" => match parse_params::<ResourceReadParams>(params) {
            Ok(read) => state.server.read_resource(&read.uri).await,
            Err(e) => Err(e),
        },
        m if m.starts_with("notifications/") => {
            debug!("Notification {}", m);
            Ok(Value::Null)
        }
        _ => {
            warn!("Unknown method: {}", method);
            return JsonRpcResponse::error(id, METHOD_NOT_FOUND, "Method not found");
        }
    };

    match outcome {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(message) => JsonRpcResponse::error(id, INVALID_PARAMS, message),
    }
}

fn initialize_result(state: &AppState) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "resources": {}
        },
        "serverInfo": {
            "name": state.server.name(),
            "version": state.server.version()
        },
        "instructions": SERVER_INSTRUCTIONS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;

    fn state() -> AppState {
        AppState::new(McpServer::new(Config::default()), "/mcp")
    }

    fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(1)),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize_advertises_tools_and_resources() {
        let state = state();
        let response = process_request(&state, request("initialize", None)).await;
        let result = response.result.unwrap();
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"].get("prompts").is_none());
        assert_eq!(result["serverInfo"]["name"], "tools-universe");
        assert!(state.initialized.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let state = state();
        let response = process_request(&state, request("tools/list", None)).await;
        assert_eq!(response.result.unwrap()["tools"].as_array().unwrap().len(), 11);

        let call = request(
            "tools/call",
            Some(json!({
                "name": "calc_bmi",
                "arguments": { "weight": 70, "height": 175 }
            })),
        );
        let result = process_request(&state, call).await.result.unwrap();
        assert_eq!(result["structuredContent"]["category"], "Normal");
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_version() {
        let state = state();
        let response = process_request(&state, request("prompts/list", None)).await;
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);

        let mut bad = request("tools/list", None);
        bad.jsonrpc = "1.0".to_string();
        assert_eq!(process_request(&state, bad).await.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_resources_read_missing_uri() {
        let state = state();
        let response = process_request(&state, request("resources/read", Some(json!({})))).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let state = state();
        let call = request("tools/call", Some(json!({ "name": "nope" })));
        let error = process_request(&state, call).await.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert!(error.message.contains("nope"));
    }
}

//! Line-delimited JSON-RPC 2.0 tool server.
//!
//! Each input line is one request, each response is written as one line.
//! Only the methods an agent needs to discover and call the price tools are
//! implemented.

use crate::resolver::PriceResolver;
use crate::tools::{self, GET_ASSET_PRICE, LIST_ASSETS, ToolOutput};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "asset-price";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    /// `None` only when the member is absent; `"id": null` is a request.
    #[serde(default, deserialize_with = "present_id")]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GetAssetPriceArgs {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    crate::core::config::DEFAULT_CURRENCY.to_string()
}

fn tool_descriptors() -> Value {
    json!([
        {
            "name": GET_ASSET_PRICE,
            "description": "Retrieves current pricing information for specific assets or a default list of major assets. Supports automatic currency conversion.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "description": "The asset symbol to query (e.g., XAU, BTC). If omitted, returns a default list of major assets."
                    },
                    "currency": {
                        "type": "string",
                        "description": "The currency to express the price in (default: USD)",
                        "default": "USD"
                    }
                }
            }
        },
        {
            "name": LIST_ASSETS,
            "description": "List all supported assets available for price queries",
            "inputSchema": { "type": "object", "properties": {} }
        }
    ])
}

fn tool_result(output: ToolOutput) -> Value {
    json!({
        "content": [{ "type": "text", "text": output.text }],
        "isError": output.is_error,
    })
}

pub struct ToolServer {
    resolver: Arc<PriceResolver>,
}

impl ToolServer {
    pub fn new(resolver: Arc<PriceResolver>) -> Self {
        Self { resolver }
    }

    /// Serves requests from `reader` until it reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Asset price server running on stdio");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                writer
                    .write_all(response.as_bytes())
                    .await
                    .context("Failed to write response")?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    /// Handles one request line. Notifications produce no response.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<RpcRequest>(line) {
            Ok(request) => self.handle_request(request).await?,
            Err(e) => {
                warn!(error = %e, "Unparseable request");
                RpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))
            }
        };

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "Failed to encode response");
                None
            }
        }
    }

    async fn handle_request(&self, request: RpcRequest) -> Option<RpcResponse> {
        debug!(method = %request.method, "Handling request");
        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification received");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => RpcResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
            "ping" => RpcResponse::success(id, json!({})),
            "tools/list" => RpcResponse::success(id, json!({ "tools": tool_descriptors() })),
            "tools/call" => self.call_tool(id, request.params).await,
            other => RpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };
        Some(response)
    }

    async fn call_tool(&self, id: Value, params: Value) -> RpcResponse {
        let call: ToolCall = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(e) => {
                return RpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {e}"));
            }
        };
        let arguments = call.arguments.unwrap_or_else(|| json!({}));

        match call.name.as_str() {
            GET_ASSET_PRICE => {
                let args: GetAssetPriceArgs = match serde_json::from_value(arguments) {
                    Ok(args) => args,
                    Err(e) => {
                        return RpcResponse::failure(
                            id,
                            INVALID_PARAMS,
                            format!("Invalid arguments: {e}"),
                        );
                    }
                };
                let output =
                    tools::get_asset_price(&self.resolver, args.symbol.as_deref(), &args.currency)
                        .await;
                RpcResponse::success(id, tool_result(output))
            }
            LIST_ASSETS => match tools::list_assets(&self.resolver).await {
                Ok(output) => RpcResponse::success(id, tool_result(output)),
                Err(e) => RpcResponse::failure(id, INTERNAL_ERROR, format!("{e:#}")),
            },
            other => RpcResponse::failure(id, INVALID_PARAMS, format!("Unknown tool: {other}")),
        }
    }
}

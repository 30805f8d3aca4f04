// MCP server: newline-delimited JSON-RPC over any async byte stream

use crate::protocol::{
    is_valid_id, salvage_id, CallToolParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult,
};
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use coordinator_core::CoordinatorError;
use futures::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tracing::{debug, error, info, warn};

/// Reads one request per line, answers every call with exactly one line,
/// and never answers notifications.
pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Serve until `reader` reaches end of input.
    ///
    /// Only a read failure ends the loop with an error; failed writes are
    /// logged and the next request is still served.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let codec = AnyDelimiterCodec::new(b"\n".to_vec(), b"\n".to_vec());
        let mut frames = FramedRead::new(reader, codec);

        info!("MCP server started with {} tools", self.registry.list_schemas().len());

        while let Some(frame) = frames.next().await {
            let frame = frame.context("Failed to read request from input")?;
            let line = String::from_utf8_lossy(&frame);
            if let Some(response) = self.handle_line(&line).await {
                write_response(&mut writer, &response).await;
            }
        }

        info!("Input closed, MCP server stopping");
        Ok(())
    }

    /// Handle one raw input line; `None` means nothing is written back
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim_start_matches('\u{feff}').trim_end_matches('\r');
        if line.trim().is_empty() {
            return None;
        }

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Failed to decode request: {}", e);
                return salvage_id(line)
                    .map(|id| JsonRpcResponse::error(id, JsonRpcError::parse_error(e)));
            }
        };

        match request.id.clone() {
            None => {
                self.handle_notification(&request);
                None
            }
            Some(id) if is_valid_id(&id) => Some(self.handle_call(id, request).await),
            Some(id) => {
                warn!("Dropping request with unusable id {}", id);
                None
            }
        }
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "initialized" | "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => debug!("Client cancelled a request: {:?}", request.params),
            other => debug!("Ignoring notification {}", other),
        }
    }

    async fn handle_call(&self, id: Value, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling {} (id {})", request.method, id);
        match request.method.as_str() {
            "initialize" => JsonRpcResponse::from_result(id, &InitializeResult::current()),
            "tools/list" => JsonRpcResponse::from_result(
                id,
                &ListToolsResult {
                    tools: self.registry.list_schemas(),
                },
            ),
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        }
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let Some(Ok(params)) = params.map(serde_json::from_value::<CallToolParams>) else {
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params());
        };

        let Some(tool) = self.registry.get(&params.name) else {
            let err = CoordinatorError::UnknownTool(params.name);
            return JsonRpcResponse::error(id, JsonRpcError::internal_error(err.to_string()));
        };

        match tool.execute(Value::Object(params.arguments)).await {
            Ok(result) => JsonRpcResponse::from_result(id, &result),
            Err(e) => {
                debug!("Tool {} failed: {:#}", params.name, e);
                JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string()))
            }
        }
    }
}

/// Write one response frame with a single write and flush
async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &JsonRpcResponse) {
    let frame = match response.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            error!("Failed to encode response: {}", e);
            return;
        }
    };

    let written = async {
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await
    };
    if let Err(e) = written.await {
        error!("Failed to write response: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::build_registry;
    use coordinator_core::{FilesystemKnowledgeBase, ProjectStore, SecurityConfig, SecurityValidator};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    struct Harness {
        temp_dir: TempDir,
        server: Arc<McpServer>,
    }

    impl Harness {
        async fn new(extended: bool) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let kb = Arc::new(FilesystemKnowledgeBase::new(temp_dir.path().join("kb")));
            let store = ProjectStore::spawn(kb).await;
            let validator = Arc::new(SecurityValidator::new(SecurityConfig {
                allowed_paths: vec![temp_dir.path().to_string_lossy().into_owned()],
                ..SecurityConfig::default()
            }));
            let server = Arc::new(McpServer::new(build_registry(store, validator, extended)));
            Self { temp_dir, server }
        }

        fn project_dir(&self, name: &str) -> String {
            let path = self.temp_dir.path().join(name);
            std::fs::create_dir_all(&path).unwrap();
            path.to_string_lossy().into_owned()
        }

        /// Feed `input` through `run` over an in-memory pipe and collect the output lines
        async fn exchange(&self, input: &str) -> Vec<String> {
            let (mut client, server_io) = tokio::io::duplex(256 * 1024);
            let (reader, writer) = tokio::io::split(server_io);
            let server = self.server.clone();
            let task = tokio::spawn(async move { server.run(reader, writer).await });

            client.write_all(input.as_bytes()).await.unwrap();
            client.shutdown().await.unwrap();
            task.await.unwrap().unwrap();

            let mut output = String::new();
            client.read_to_string(&mut output).await.unwrap();
            output.lines().map(str::to_string).collect()
        }

        async fn call(&self, id: u64, tool: &str, arguments: Value) -> Value {
            let request = json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": {"name": tool, "arguments": arguments}
            });
            let lines = self.exchange(&format!("{}\n", request)).await;
            assert_eq!(lines.len(), 1);
            serde_json::from_str(&lines[0]).unwrap()
        }
    }

    fn text(response: &Value) -> &str {
        response["result"]["content"][0]["text"].as_str().unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let harness = Harness::new(false).await;
        let lines = harness
            .exchange("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n")
            .await;
        assert_eq!(lines.len(), 1);
        let response: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(response["result"]["serverInfo"]["name"], "project-coordinator");
        assert!(response.get("error").is_none());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let harness = Harness::new(false).await;
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"initialized\",\"id\":null}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"tools/list\"}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/cancelled\",\"params\":{\"requestId\":3}}\n",
        );
        assert!(harness.exchange(input).await.is_empty());
    }

    #[tokio::test]
    async fn test_one_response_per_call_in_order() {
        let harness = Harness::new(false).await;
        let input = concat!(
            "\u{feff}{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\r\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":\"two\",\"method\":\"tools/list\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"resources/list\"}",
        );
        let lines = harness.exchange(input).await;
        let ids: Vec<Value> = lines
            .iter()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(1), json!("two"), json!(3)]);

        let unknown: Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(unknown["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_tools_list_catalog() {
        let harness = Harness::new(false).await;
        let lines = harness
            .exchange("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n")
            .await;
        let response: Value = serde_json::from_str(&lines[0]).unwrap();
        let names: Vec<&str> = response["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "list_projects",
                "get_project_status",
                "search_code_patterns",
                "add_project",
                "update_project_status"
            ]
        );
        assert_eq!(
            response["result"]["tools"][3]["inputSchema"]["required"],
            json!(["name", "path"])
        );

        let extended = Harness::new(true).await;
        let lines = extended
            .exchange("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n")
            .await;
        let response: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(response["result"]["tools"].as_array().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn test_malformed_input() {
        let harness = Harness::new(false).await;
        let input = concat!(
            "this is not json\n",
            "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":42}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":true,\"method\":\"initialize\"}\n",
            "{\"id\":10}\n",
        );
        let lines = harness.exchange(input).await;
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["id"], 9);
        assert_eq!(first["error"]["code"], -32700);
        assert!(first["error"]["message"].as_str().unwrap().starts_with("Parse error: "));

        let second: Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second["id"], 10);
        assert_eq!(second["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let harness = Harness::new(false).await;
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"list_projects\"}}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"tools/call\",\"params\":{\"name\":7,\"arguments\":{}}}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":4,\"method\":\"tools/call\",\"params\":{\"name\":\"list_projects\",\"arguments\":[]}}\n",
        );
        let lines = harness.exchange(input).await;
        assert_eq!(lines.len(), 4);
        for line in lines {
            let response: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(response["error"]["code"], -32602);
            assert_eq!(response["error"]["message"], "Invalid params");
        }
    }

    #[tokio::test]
    async fn test_tool_errors_become_internal_errors() {
        let harness = Harness::new(false).await;

        let unknown = harness.call(1, "delete_everything", json!({})).await;
        assert_eq!(unknown["error"]["code"], -32603);
        assert_eq!(unknown["error"]["message"], "Unknown tool: delete_everything");

        let missing = harness.call(2, "get_project_status", json!({})).await;
        assert_eq!(missing["error"]["code"], -32603);
        assert_eq!(
            missing["error"]["message"],
            "Invalid arguments provided: projectName is required"
        );

        let absent = harness.call(3, "get_project_status", json!({"projectName": "Ghost"})).await;
        assert_eq!(absent["error"]["message"], "Project not found: Ghost");
    }

    #[tokio::test]
    async fn test_add_then_status_and_list() {
        let harness = Harness::new(false).await;
        let path = harness.project_dir("Foo");

        let added = harness
            .call(1, "add_project", json!({"name": "Foo", "path": path}))
            .await;
        assert!(text(&added).starts_with("Successfully added project: Foo"));

        let status = harness.call(2, "get_project_status", json!({"projectName": "Foo"})).await;
        assert!(text(&status).contains("## Current Status\nActive"));
        assert!(text(&status).contains("- Swift"));

        let list = harness.call(3, "list_projects", json!({})).await;
        assert_eq!(text(&list).matches("\n## ").count(), 1);
        assert!(text(&list).contains("## Foo"));

        let search = harness.call(4, "search_code_patterns", json!({"pattern": "swift"})).await;
        assert!(text(&search).contains("- Foo uses Swift"));
    }

    #[tokio::test]
    async fn test_validation_rejects_outside_paths() {
        let harness = Harness::new(false).await;
        let response = harness
            .call(1, "add_project", json!({"name": "Evil", "path": "/etc"}))
            .await;
        assert_eq!(response["error"]["code"], -32603);
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains(&harness.temp_dir.path().to_string_lossy().into_owned()));

        let response = harness
            .call(2, "search_code_patterns", json!({"pattern": "rm -rf /"}))
            .await;
        assert_eq!(response["error"]["code"], -32603);
    }

    #[tokio::test]
    async fn test_extended_tools() {
        let harness = Harness::new(true).await;
        let path = harness.project_dir("Foo");
        harness.call(1, "add_project", json!({"name": "Foo", "path": path})).await;

        let added = harness
            .call(2, "add_project_task", json!({"projectName": "Foo", "task": "Write tests"}))
            .await;
        assert_eq!(text(&added), "Added task to Foo: Write tests");

        let done = harness
            .call(3, "complete_project_task", json!({"projectName": "Foo", "task": "Write tests"}))
            .await;
        assert_eq!(text(&done), "Completed task in Foo: Write tests");

        let health = harness.call(4, "get_project_health", json!({"projectName": "Foo"})).await;
        assert!(text(&health).contains("Task Completion: 100/100 - 1/1 tasks completed"));

        let heat = harness.call(5, "get_activity_heatmap", json!({"days": 3})).await;
        assert!(text(&heat).contains("(Past 3 Days)"));

        let bad_days = harness.call(6, "get_activity_heatmap", json!({"days": 0})).await;
        assert_eq!(bad_days["error"]["code"], -32603);

        let trends = harness.call(7, "get_technology_trends", json!({})).await;
        assert!(text(&trends).starts_with("## Technology Analysis"));

        let timeline = harness.call(8, "get_status_timeline", json!({"projectName": "Foo"})).await;
        assert!(text(&timeline).starts_with("## Status Timeline for Foo"));
    }

    #[tokio::test]
    async fn test_responses_are_byte_reproducible() {
        let first = Harness::new(false).await;
        let second = Harness::new(false).await;
        let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n";
        assert_eq!(first.exchange(input).await, second.exchange(input).await);
    }
}

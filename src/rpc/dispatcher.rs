//! Dispatches incoming JSON-RPC messages to the fixed method set spec.md
//! §4.9 names: `initialize`, `tools/list`, `tools/call`, `tasks/list`,
//! `tasks/cancel`, and the `initialized` notification.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::rpc::protocol::{Response, RpcError};
use crate::rpc::registry::ToolRegistry;
use crate::tasks::TaskManager;

pub struct Dispatcher {
    tools: Arc<ToolRegistry>,
    tasks: Arc<TaskManager>,
    initialized: AtomicBool,
}

impl Dispatcher {
    pub fn new(tools: Arc<ToolRegistry>, tasks: Arc<TaskManager>) -> Self {
        Self { tools, tasks, initialized: AtomicBool::new(false) }
    }

    /// Parse, validate, and route one message. Returns the encoded response
    /// bytes for a request, or `None` for a notification (and for
    /// malformed input with no recoverable `id` to answer against).
    pub async fn dispatch(&self, raw: &[u8]) -> Option<Vec<u8>> {
        let value: Value = match serde_json::from_slice(raw) {
            Ok(v) => v,
            Err(e) => return Some(encode(Response::failure(Value::Null, &RpcError::ParseError(e.to_string())))),
        };

        let Some(obj) = value.as_object() else {
            return Some(encode(Response::failure(
                Value::Null,
                &RpcError::InvalidRequest("message must be a JSON object".to_string()),
            )));
        };

        let has_id = obj.contains_key("id");
        let id = obj.get("id").cloned().unwrap_or(Value::Null);
        let jsonrpc_ok = obj.get("jsonrpc").and_then(Value::as_str) == Some("2.0");
        let method = obj.get("method").and_then(Value::as_str).map(str::to_string);
        let params = obj.get("params").cloned();

        let Some(method) = method.filter(|_| jsonrpc_ok) else {
            if has_id {
                return Some(encode(Response::failure(
                    id,
                    &RpcError::InvalidRequest("missing or invalid 'jsonrpc'/'method'".to_string()),
                )));
            }
            return None;
        };

        if !has_id {
            self.handle_notification(&method, params).await;
            return None;
        }

        match self.handle_request(&method, params).await {
            Ok(result) => Some(encode(Response::success(id, result))),
            Err(err) => Some(encode(Response::failure(id, &err))),
        }
    }

    async fn handle_notification(&self, method: &str, _params: Option<Value>) {
        if method == "initialized" {
            self.initialized.store(true, Ordering::Release);
        }
        // Unknown notifications are silently ignored per JSON-RPC convention:
        // there is no id to answer against, so nothing further to do.
    }

    async fn handle_request(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(json!({
                "server_info": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
            "tools/list" => {
                self.require_initialized()?;
                let tools = self.tools.list().await;
                serde_json::to_value(json!({ "tools": tools })).map_err(|e| RpcError::InternalError(e.to_string()))
            }
            "tools/call" => {
                self.require_initialized()?;
                self.handle_tools_call(params).await
            }
            "tasks/list" => {
                self.require_initialized()?;
                let params = params.unwrap_or_else(|| json!({}));
                let cursor = params.get("cursor").and_then(Value::as_str).map(str::to_string);
                let limit = params.get("limit").and_then(Value::as_u64).unwrap_or(50) as usize;
                let page = self.tasks.list_tasks(cursor.as_deref(), limit);
                serde_json::to_value(page).map_err(|e| RpcError::InternalError(e.to_string()))
            }
            "tasks/cancel" => {
                self.require_initialized()?;
                let params = params.ok_or_else(|| RpcError::InvalidParams("missing params".to_string()))?;
                let task_id = params
                    .get("task_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::InvalidParams("missing 'task_id'".to_string()))?;
                let task = self
                    .tasks
                    .cancel_task(task_id)
                    .ok_or_else(|| RpcError::InvalidParams(format!("no task '{task_id}'")))?;
                serde_json::to_value(task).map_err(|e| RpcError::InternalError(e.to_string()))
            }
            other => Err(RpcError::MethodNotFound(other.to_string())),
        }
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::InvalidParams("missing params".to_string()))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::InvalidParams("missing 'name'".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let handler = self
            .tools
            .get(name)
            .await
            .ok_or_else(|| RpcError::MethodNotFound(format!("no tool named '{name}'")))?;

        let result = handler.call(arguments).await?;
        serde_json::to_value(result).map_err(|e| RpcError::InternalError(e.to_string()))
    }

    fn require_initialized(&self) -> Result<(), RpcError> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(RpcError::ServerNotInitialized)
        }
    }
}

fn encode(response: Response) -> Vec<u8> {
    serde_json::to_vec(&response).unwrap_or_else(|_| b"{}".to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::registry::{ToolAnnotations, ToolDefinition, ToolHandler};
    use crate::tasks::{Content, ToolCallResult};
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        async fn call(&self, arguments: Value) -> Result<ToolCallResult, RpcError> {
            Ok(ToolCallResult::success(vec![Content::text(arguments.to_string())]))
        }
    }

    async fn dispatcher_with_echo_tool() -> Dispatcher {
        let tools = Arc::new(ToolRegistry::new());
        tools
            .register(
                ToolDefinition {
                    name: "echo".to_string(),
                    description: "echoes arguments".to_string(),
                    input_schema: json!({"type": "object"}),
                    output_schema: None,
                    annotations: ToolAnnotations::default(),
                },
                Arc::new(EchoTool),
            )
            .await;
        Dispatcher::new(tools, Arc::new(TaskManager::new()))
    }

    fn response_value(bytes: Vec<u8>) -> Value {
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn calls_before_initialized_are_rejected() {
        let dispatcher = dispatcher_with_echo_tool().await;
        let request = br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let response = response_value(dispatcher.dispatch(request).await.unwrap());
        assert_eq!(response["error"]["code"], -32003);
    }

    #[tokio::test]
    async fn full_handshake_then_tool_call_round_trips() {
        let dispatcher = dispatcher_with_echo_tool().await;

        let init = br#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
        let init_response = response_value(dispatcher.dispatch(init).await.unwrap());
        assert!(init_response.get("result").is_some());

        let notification = br#"{"jsonrpc":"2.0","method":"initialized"}"#;
        assert!(dispatcher.dispatch(notification).await.is_none());

        let call = br#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"echo","arguments":{"x":1}}}"#;
        let response = response_value(dispatcher.dispatch(call).await.unwrap());
        assert_eq!(response["id"], 2);
        assert!(response.get("result").is_some());
    }

    #[tokio::test]
    async fn unknown_method_yields_method_not_found() {
        let dispatcher = dispatcher_with_echo_tool().await;
        dispatcher.dispatch(br#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#).await;
        dispatcher.dispatch(br#"{"jsonrpc":"2.0","method":"initialized"}"#).await;

        let request = br#"{"jsonrpc":"2.0","id":3,"method":"nonexistent"}"#;
        let response = response_value(dispatcher.dispatch(request).await.unwrap());
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn malformed_json_yields_parse_error() {
        let dispatcher = dispatcher_with_echo_tool().await;
        let request = br#"{"jsonrpc":"2.0","id":1,"method":"m", /*c*/ }"#;
        let response = response_value(dispatcher.dispatch(request).await.unwrap());
        assert_eq!(response["error"]["code"], -32700);
    }
}

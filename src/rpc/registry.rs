//! Insertion-ordered tool registry. Re-registering an existing name updates
//! its handler and definition but preserves its original position — a dual
//! structure (an order list plus a lookup map) rather than a single
//! ordered-map type, per spec.md §9's "dual map + ordered key list" guidance.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::rpc::protocol::RpcError;
use crate::tasks::ToolCallResult;

#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct ToolAnnotations {
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
    pub open_world: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    pub annotations: ToolAnnotations,
}

/// A tool implementation. Handlers receive already-extracted `arguments`
/// (the `tools/call` params' `arguments` field), not the whole RPC params
/// envelope.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> Result<ToolCallResult, RpcError>;
}

#[derive(Clone)]
struct ToolEntry {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

#[derive(Default)]
struct RegistryState {
    order: Vec<String>,
    entries: HashMap<String, ToolEntry>,
}

pub struct ToolRegistry {
    state: RwLock<RegistryState>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { state: RwLock::new(RegistryState::default()) }
    }

    pub async fn register(&self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) {
        let mut state = self.state.write().await;
        let name = definition.name.clone();
        if !state.entries.contains_key(&name) {
            state.order.push(name.clone());
        }
        state.entries.insert(name, ToolEntry { definition, handler });
    }

    /// Definitions in registration order (first-registered first; a
    /// re-registered name keeps its original slot).
    pub async fn list(&self) -> Vec<ToolDefinition> {
        let state = self.state.read().await;
        state.order.iter().filter_map(|name| state.entries.get(name).map(|e| e.definition.clone())).collect()
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        let state = self.state.read().await;
        state.entries.get(name).map(|e| e.handler.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::Content;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        async fn call(&self, arguments: Value) -> Result<ToolCallResult, RpcError> {
            Ok(ToolCallResult::success(vec![Content::text(arguments.to_string())]))
        }
    }

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: String::new(),
            input_schema: serde_json::json!({"type": "object"}),
            output_schema: None,
            annotations: ToolAnnotations::default(),
        }
    }

    #[tokio::test]
    async fn re_registering_a_name_preserves_its_position() {
        let registry = ToolRegistry::new();
        registry.register(definition("a"), Arc::new(EchoTool)).await;
        registry.register(definition("b"), Arc::new(EchoTool)).await;
        registry.register(definition("a"), Arc::new(EchoTool)).await;

        let names: Vec<String> = registry.list().await.into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn get_returns_the_latest_handler_for_a_name() {
        let registry = ToolRegistry::new();
        registry.register(definition("a"), Arc::new(EchoTool)).await;
        let handler = registry.get("a").await.unwrap();
        let result = handler.call(serde_json::json!({"x": 1})).await.unwrap();
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn unknown_tool_is_absent() {
        let registry = ToolRegistry::new();
        assert!(registry.get("missing").await.is_none());
    }
}

//! Concrete tool handlers for the six tools spec.md §4.9 names at minimum:
//! `index_codebase`, `check_indexing_status`, `search_code`, `code_research`,
//! `parse_tree`, `watch_codebase`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::chunking::{self, ParseError};
use crate::domain::hashing::file_hash;
use crate::domain::types::SearchOptions;
use crate::rpc::{RpcError, ToolAnnotations, ToolDefinition, ToolHandler, ToolRegistry};
use crate::server::state::AppState;
use crate::tasks::{Content, TaskStatus, ToolCallResult};

pub async fn register_all(registry: &ToolRegistry, state: Arc<AppState>) {
    registry
            .register(
                ToolDefinition {
                    name: "index_codebase".to_string(),
                    description: "Parse, chunk, and embed a directory tree into the index".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "path": {"type": "string"},
                            "force": {"type": "boolean", "default": false},
                            "async": {"type": "boolean", "default": false},
                            "poll_interval": {"type": "integer", "minimum": 1000, "maximum": 300000}
                        },
                        "required": ["path"]
                    }),
                    output_schema: None,
                    annotations: ToolAnnotations { destructive: true, idempotent: true, ..Default::default() },
                },
                Arc::new(IndexCodebaseTool { state: state.clone() }),
            )
            .await;

        registry
            .register(
                ToolDefinition {
                    name: "check_indexing_status".to_string(),
                    description: "Poll the status of an async indexing task".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {"task_id": {"type": "string"}},
                        "required": ["task_id"]
                    }),
                    output_schema: None,
                    annotations: ToolAnnotations { read_only: true, idempotent: true, ..Default::default() },
                },
                Arc::new(CheckIndexingStatusTool { state: state.clone() }),
            )
            .await;

        registry
            .register(
                ToolDefinition {
                    name: "search_code".to_string(),
                    description: "Hybrid lexical + semantic search over the index".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "query": {"type": "string"},
                            "limit": {"type": "integer", "minimum": 1, "default": 10},
                            "path": {"type": "string"},
                            "semantic_weight": {"type": "number", "minimum": 0.0, "maximum": 1.0}
                        },
                        "required": ["query"]
                    }),
                    output_schema: None,
                    annotations: ToolAnnotations { read_only: true, idempotent: true, ..Default::default() },
                },
                Arc::new(SearchCodeTool { state: state.clone() }),
            )
            .await;

        registry
            .register(
                ToolDefinition {
                    name: "code_research".to_string(),
                    description: "Multi-hop search that follows reference chains out from top hits".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "query": {"type": "string"},
                            "depth": {"type": "integer", "minimum": 1, "maximum": 5},
                            "focus": {"type": "string"},
                            "path": {"type": "string"}
                        },
                        "required": ["query", "depth"]
                    }),
                    output_schema: None,
                    annotations: ToolAnnotations { read_only: true, idempotent: true, ..Default::default() },
                },
                Arc::new(CodeResearchTool { state: state.clone() }),
            )
            .await;

        registry
            .register(
                ToolDefinition {
                    name: "parse_tree".to_string(),
                    description: "Parse a single file and return its chunk tree".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "path": {"type": "string"},
                            "pattern": {"type": "string"},
                            "format": {"type": "string", "enum": ["toon", "human", "json"], "default": "human"},
                            "max_depth": {"type": "integer"},
                            "kind_filter": {"type": "string"}
                        },
                        "required": ["path", "format"]
                    }),
                    output_schema: None,
                    annotations: ToolAnnotations { read_only: true, idempotent: true, ..Default::default() },
                },
                Arc::new(ParseTreeTool { state: state.clone() }),
            )
            .await;

        registry
            .register(
                ToolDefinition {
                    name: "watch_codebase".to_string(),
                    description: "Start, stop, or check a filesystem watch on a directory".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "path": {"type": "string"},
                            "action": {"type": "string", "enum": ["start", "stop", "status"]}
                        },
                        "required": ["path", "action"]
                    }),
                    output_schema: None,
                    annotations: ToolAnnotations { idempotent: true, ..Default::default() },
                },
                Arc::new(WatchCodebaseTool { state }),
            )
            .await;
}

fn text_result(value: impl Serialize) -> ToolCallResult {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
    ToolCallResult::success(vec![Content::text(text)])
}

fn error_result(message: impl Into<String>) -> ToolCallResult {
    ToolCallResult::error(vec![Content::text(message.into())])
}

fn require_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    arguments.get(key).and_then(Value::as_str).ok_or_else(|| RpcError::InvalidParams(format!("missing '{key}'")))
}

// ---------------------------------------------------------------- index_codebase

struct IndexCodebaseTool {
    state: Arc<AppState>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IndexSummary {
    files_scanned: usize,
    files_indexed: usize,
    chunks_indexed: usize,
    reused: usize,
    embedded: usize,
}

impl std::fmt::Display for IndexSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scanned {}, indexed {} ({} chunks, {} reused, {} embedded)",
            self.files_scanned, self.files_indexed, self.chunks_indexed, self.reused, self.embedded
        )
    }
}

#[async_trait]
impl ToolHandler for IndexCodebaseTool {
    async fn call(&self, arguments: Value) -> Result<ToolCallResult, RpcError> {
        let path = require_str(&arguments, "path")?.to_string();
        let force = arguments.get("force").and_then(Value::as_bool).unwrap_or(false);
        let run_async = arguments.get("async").and_then(Value::as_bool).unwrap_or(false);
        let poll_interval_ms = arguments.get("poll_interval").and_then(Value::as_u64);

        if run_async {
            let file_count = count_candidate_files(&path);
            let task = self.state.tasks.create_task(Some(self.state.config.task_ttl_ms), poll_interval_ms, file_count);
            let task_id = task.task_id.clone();
            let state = self.state.clone();
            let job_path = path.clone();
            tokio::spawn(async move {
                if let Err(err) = run_index_job(&state, &job_path, force, Some(&task_id)).await {
                    state.tasks.update_status(&task_id, TaskStatus::Failed, Some(err.to_string()));
                }
            });
            return Ok(text_result(json!({"task_id": task_id, "status": "started"})));
        }

        match run_index_job(&self.state, &path, force, None).await {
            Ok(summary) => Ok(text_result(summary)),
            Err(err) => Ok(error_result(err.to_string())),
        }
    }
}

fn count_candidate_files(path: &str) -> usize {
    ignore::WalkBuilder::new(path)
        .build()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .count()
}

pub(crate) async fn run_index_job(
    state: &AppState,
    path: &str,
    force: bool,
    task_id: Option<&str>,
) -> crate::domain::Result<IndexSummary> {
    let mut files_scanned = 0usize;
    let mut files_indexed = 0usize;
    let mut chunks_indexed = 0usize;
    let mut reused_total = 0usize;
    let mut embedded_total = 0usize;

    for entry in ignore::WalkBuilder::new(path).build() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(id) = task_id {
            if state.tasks.is_cancelled(id) {
                break;
            }
        }

        files_scanned += 1;
        let file_path = entry.path();
        let Ok(bytes) = std::fs::read(file_path) else { continue };
        let hash = file_hash(&bytes);
        let rel_path = file_path.to_string_lossy().into_owned();

        if !force {
            let mgr = state.index.lock().await;
            if !mgr.needs_indexing(&hash).await? {
                continue;
            }
        }

        let Ok(content) = String::from_utf8(bytes) else { continue };
        let parsed = chunking::parse(&rel_path, &content, state.limits);
        let (chunks, snippets) = match parsed {
            Ok(result) => result,
            Err(ParseError::EmptyContent) => continue,
            Err(err) => return Err(crate::domain::Error::internal(err.to_string())),
        };
        let chunks: Vec<_> = chunks.into_iter().map(|c| c.with_file_hash(hash.clone())).collect();

        let batcher = state.batcher.clone();
        let mut mgr = state.index.lock().await;
        let result = mgr
            .reindex_with_change_detection(&rel_path, chunks, move |to_embed| async move {
                let requests = to_embed.iter().map(|chunk| batcher.embed(chunk.content.clone()));
                let vectors = futures::future::join_all(requests).await;
                vectors
                    .into_iter()
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| crate::domain::Error::internal(e.to_string()))
            })
            .await?;

        if !snippets.is_empty() {
            mgr.chunk_store().upsert_snippets(&snippets).await?;
        }
        mgr.record_indexed(&hash, &rel_path).await?;
        drop(mgr);

        files_indexed += 1;
        chunks_indexed += result.total;
        reused_total += result.reused;
        embedded_total += result.embedded;

        if let Some(id) = task_id {
            state.tasks.update_status(id, TaskStatus::Working, Some(format!("indexed {files_indexed} files")));
        }
    }

    {
        let mgr = state.index.lock().await;
        mgr.save_vectors(&state.data_dir())?;
    }

    let summary =
        IndexSummary { files_scanned, files_indexed, chunks_indexed, reused: reused_total, embedded: embedded_total };

    if let Some(id) = task_id {
        state.tasks.store_result(id, text_result(&summary));
        state.tasks.update_status(id, TaskStatus::Completed, Some("indexing complete".to_string()));
    }
    Ok(summary)
}

// ---------------------------------------------------------- check_indexing_status

struct CheckIndexingStatusTool {
    state: Arc<AppState>,
}

#[async_trait]
impl ToolHandler for CheckIndexingStatusTool {
    async fn call(&self, arguments: Value) -> Result<ToolCallResult, RpcError> {
        let task_id = require_str(&arguments, "task_id")?;
        let Some(task) = self.state.tasks.get_task(task_id) else {
            return Ok(error_result(format!("no task '{task_id}'")));
        };
        let mut payload = json!({
            "task_id": task.task_id,
            "status": task.status,
            "message": task.message,
        });
        if let Some(retry_after_ms) = task.retry_after_ms() {
            payload["retry_after_ms"] = json!(retry_after_ms);
        }
        if task.status == TaskStatus::Completed {
            if let Some(result) = self.state.tasks.get_result(task_id) {
                payload["result"] = json!(result);
            }
        }
        Ok(text_result(payload))
    }
}

// --------------------------------------------------------------------- search_code

struct SearchCodeTool {
    state: Arc<AppState>,
}

#[async_trait]
impl ToolHandler for SearchCodeTool {
    async fn call(&self, arguments: Value) -> Result<ToolCallResult, RpcError> {
        let query = require_str(&arguments, "query")?.to_string();
        let options = SearchOptions {
            limit: arguments.get("limit").and_then(Value::as_u64).unwrap_or(10) as usize,
            semantic_weight: arguments
                .get("semantic_weight")
                .and_then(Value::as_f64)
                .map(|w| w as f32)
                .unwrap_or(self.state.config.semantic_weight),
            path_filter: arguments.get("path").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        };

        let mgr = self.state.index.lock().await;
        let results =
            self.state.search.search(&mgr, &query, &options).await.map_err(|e| RpcError::InternalError(e.to_string()))?;
        Ok(text_result(results))
    }
}

// ------------------------------------------------------------------- code_research

struct CodeResearchTool {
    state: Arc<AppState>,
}

#[async_trait]
impl ToolHandler for CodeResearchTool {
    async fn call(&self, arguments: Value) -> Result<ToolCallResult, RpcError> {
        let mut query = require_str(&arguments, "query")?.to_string();
        let depth = arguments.get("depth").and_then(Value::as_u64).ok_or_else(|| {
            RpcError::InvalidParams("missing 'depth'".to_string())
        })?;
        if !(1..=5).contains(&depth) {
            return Err(RpcError::InvalidParams(format!("'depth' must be in 1..=5, got {depth}")));
        }
        if let Some(focus) = arguments.get("focus").and_then(Value::as_str) {
            query.push(' ');
            query.push_str(focus);
        }

        let options = SearchOptions {
            multi_hop: depth as usize,
            path_filter: arguments.get("path").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        };

        let mgr = self.state.index.lock().await;
        let results =
            self.state.search.search(&mgr, &query, &options).await.map_err(|e| RpcError::InternalError(e.to_string()))?;
        Ok(text_result(results))
    }
}

// ---------------------------------------------------------------------- parse_tree

struct ParseTreeTool {
    state: Arc<AppState>,
}

#[async_trait]
impl ToolHandler for ParseTreeTool {
    async fn call(&self, arguments: Value) -> Result<ToolCallResult, RpcError> {
        let path = require_str(&arguments, "path")?;
        let format = arguments.get("format").and_then(Value::as_str).unwrap_or("human");
        let kind_filter = arguments.get("kind_filter").and_then(Value::as_str);
        let max_depth = arguments.get("max_depth").and_then(Value::as_u64).map(|d| d as usize);

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => return Ok(error_result(format!("failed to read '{path}': {err}"))),
        };

        let (mut chunks, _) = match chunking::parse(path, &content, self.state.limits) {
            Ok(result) => result,
            Err(err) => return Ok(error_result(err.to_string())),
        };

        if let Some(kind_filter) = kind_filter {
            chunks.retain(|c| c.kind.to_string() == kind_filter);
        }
        if let Some(max_depth) = max_depth {
            chunks.retain(|c| c.breadcrumb.as_deref().map(|b| b.matches('>').count()).unwrap_or(0) < max_depth);
        }

        let rendered = match format {
            "json" => serde_json::to_string_pretty(&chunks).unwrap_or_default(),
            "toon" => chunks
                .iter()
                .map(|c| format!("{}:{}-{} {} {}", c.path, c.start_line, c.end_line, c.kind, c.symbols.join(",")))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => chunks
                .iter()
                .map(|c| {
                    let breadcrumb = c.breadcrumb.as_deref().unwrap_or("(root)");
                    format!("{breadcrumb}\n  {} [{}:{}-{}]", c.kind, c.path, c.start_line, c.end_line)
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        };

        Ok(ToolCallResult::success(vec![Content::text(rendered)]))
    }
}

// ------------------------------------------------------------------ watch_codebase

struct WatchCodebaseTool {
    state: Arc<AppState>,
}

#[async_trait]
impl ToolHandler for WatchCodebaseTool {
    async fn call(&self, arguments: Value) -> Result<ToolCallResult, RpcError> {
        let path = require_str(&arguments, "path")?;
        let action = require_str(&arguments, "action")?;

        let status = match action {
            "start" => {
                self.state.watches.start(path);
                "watching"
            }
            "stop" => {
                if self.state.watches.stop(path) {
                    "stopped"
                } else {
                    "not_watched"
                }
            }
            "status" => {
                if self.state.watches.is_watched(path) {
                    "watching"
                } else {
                    "not_watched"
                }
            }
            other => return Err(RpcError::InvalidParams(format!("unknown action '{other}'"))),
        };

        Ok(text_result(json!({"path": path, "status": status})))
    }
}

//! Long-running task lifecycle: creation, status/result tracking, cursor
//! pagination, TTL eviction, and best-effort cancellation.
//!
//! Grounded on the teacher's `McpIndexingOperations` shape (a
//! `DashMap<String, _>` keyed by operation id, behind a thin interface) —
//! generalised here from indexing-only tracking to any async tool call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Floor for the computed poll interval, and the fallback `retry_after_ms`
/// a caller sees when a task was created without an explicit one.
pub const MIN_POLL_INTERVAL_MS: u64 = 10_000;
/// Per-file weight in the computed poll interval.
pub const POLL_INTERVAL_PER_FILE_MS: u64 = 100;
/// Default TTL for a task that didn't specify one. Not given a concrete
/// value by spec.md; an hour is long enough to outlive any interactive
/// polling loop without leaking memory indefinitely.
pub const DEFAULT_TTL_MS: u64 = 3_600_000;

/// `max(MIN_POLL_INTERVAL_MS, file_count * POLL_INTERVAL_PER_FILE_MS)`.
pub fn default_poll_interval_ms(file_count: usize) -> u64 {
    (file_count as u64).saturating_mul(POLL_INTERVAL_PER_FILE_MS).max(MIN_POLL_INTERVAL_MS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Working,
    Completed,
    Failed,
    Cancelled,
    InputRequired,
}

impl TaskStatus {
    /// All states but `Working` are terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Working)
    }
}

/// A single piece of tool-call output content, mirroring the `{type, text}`
/// shape the MCP wire protocol uses for text content blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self { kind: "text".to_string(), text: text.into() }
    }
}

/// The result a tool call produces, stored against a task id once work
/// finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn success(content: Vec<Content>) -> Self {
        Self { content, is_error: false }
    }

    pub fn error(content: Vec<Content>) -> Self {
        Self { content, is_error: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub status: TaskStatus,
    pub message: Option<String>,
    pub poll_interval_ms: u64,
    pub ttl_ms: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// `retry_after_ms` a status poll should report: `poll_interval_ms`
    /// while the task is still `Working`, `None` once it's terminal.
    pub fn retry_after_ms(&self) -> Option<u64> {
        (!self.status.is_terminal()).then_some(self.poll_interval_ms)
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age_ms = (now - self.created_at).num_milliseconds();
        age_ms >= 0 && age_ms as u64 >= self.ttl_ms
    }
}

/// A page of [`Task`]s plus an opaque cursor for the next page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub next_cursor: Option<String>,
}

/// Process-wide task registry. Single-owner in spirit (one instance lives
/// in the server's global state per spec.md's concurrency model) but backed
/// by `DashMap` so concurrent RPC handlers can read/write tasks without an
/// external `Mutex` serialising unrelated task ids against each other.
pub struct TaskManager {
    tasks: DashMap<String, Task>,
    results: DashMap<String, ToolCallResult>,
    cancellation_flags: DashMap<String, Arc<AtomicBool>>,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
            results: DashMap::new(),
            cancellation_flags: DashMap::new(),
        }
    }

    pub fn create_task(&self, ttl_ms: Option<u64>, poll_interval_ms: Option<u64>, file_count: usize) -> Task {
        let now = Utc::now();
        let task = Task {
            task_id: Uuid::new_v4().to_string(),
            status: TaskStatus::Working,
            message: None,
            poll_interval_ms: poll_interval_ms.unwrap_or_else(|| default_poll_interval_ms(file_count)),
            ttl_ms: ttl_ms.unwrap_or(DEFAULT_TTL_MS),
            created_at: now,
            updated_at: now,
        };
        self.tasks.insert(task.task_id.clone(), task.clone());
        self.cancellation_flags.insert(task.task_id.clone(), Arc::new(AtomicBool::new(false)));
        task
    }

    pub fn update_status(&self, id: &str, status: TaskStatus, message: Option<String>) -> Option<Task> {
        self.evict_expired();
        let mut entry = self.tasks.get_mut(id)?;
        entry.status = status;
        if message.is_some() {
            entry.message = message;
        }
        entry.updated_at = Utc::now();
        Some(entry.clone())
    }

    pub fn store_result(&self, id: &str, result: ToolCallResult) {
        self.results.insert(id.to_string(), result);
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.evict_expired();
        self.tasks.get(id).map(|t| t.clone())
    }

    pub fn get_result(&self, id: &str) -> Option<ToolCallResult> {
        self.results.get(id).map(|r| r.clone())
    }

    /// Transition a `Working` task to `Cancelled` and flip its cooperative
    /// cancellation flag so any in-flight work checking
    /// [`Self::is_cancelled`] can abort at its next checkpoint. A no-op on
    /// an already-terminal task (the terminal status is returned unchanged).
    pub fn cancel_task(&self, id: &str) -> Option<Task> {
        self.evict_expired();
        let mut entry = self.tasks.get_mut(id)?;
        if !entry.status.is_terminal() {
            entry.status = TaskStatus::Cancelled;
            entry.updated_at = Utc::now();
        }
        if let Some(flag) = self.cancellation_flags.get(id) {
            flag.store(true, Ordering::Relaxed);
        }
        Some(entry.clone())
    }

    /// Cooperative cancellation check for code running a task's work.
    pub fn is_cancelled(&self, id: &str) -> bool {
        self.cancellation_flags.get(id).map(|f| f.load(Ordering::Relaxed)).unwrap_or(false)
    }

    /// Page through tasks in deterministic `(created_at, task_id)` ascending
    /// order. `cursor` is the `task_id` of the last task seen on the
    /// previous page; pass `None` for the first page.
    pub fn list_tasks(&self, cursor: Option<&str>, limit: usize) -> TaskPage {
        self.evict_expired();
        let mut all: Vec<Task> = self.tasks.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.task_id.cmp(&b.task_id)));

        let start = match cursor {
            Some(cursor_id) => all.iter().position(|t| t.task_id == cursor_id).map(|i| i + 1).unwrap_or(0),
            None => 0,
        };

        let page: Vec<Task> = all.iter().skip(start).take(limit).cloned().collect();
        let next_cursor = if start + page.len() < all.len() {
            page.last().map(|t| t.task_id.clone())
        } else {
            None
        };
        TaskPage { tasks: page, next_cursor }
    }

    /// Drop tasks (and their results/cancellation flags) whose TTL has
    /// elapsed since creation. Called lazily from every accessor above, and
    /// can also be driven periodically by a background sweep.
    pub fn evict_expired(&self) {
        let now = Utc::now();
        let expired: Vec<String> = self
            .tasks
            .iter()
            .filter(|e| e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();
        for id in expired {
            self.tasks.remove(&id);
            self.results.remove(&id);
            self.cancellation_flags.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_poll_interval_uses_the_larger_of_floor_and_file_weight() {
        assert_eq!(default_poll_interval_ms(0), MIN_POLL_INTERVAL_MS);
        assert_eq!(default_poll_interval_ms(50), MIN_POLL_INTERVAL_MS);
        assert_eq!(default_poll_interval_ms(200), 20_000);
    }

    #[test]
    fn create_then_update_then_fetch_round_trips() {
        let mgr = TaskManager::new();
        let task = mgr.create_task(None, None, 0);
        assert_eq!(task.status, TaskStatus::Working);
        assert_eq!(task.retry_after_ms(), Some(MIN_POLL_INTERVAL_MS));

        let updated = mgr.update_status(&task.task_id, TaskStatus::Completed, Some("done".to_string())).unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.message.as_deref(), Some("done"));
        assert_eq!(updated.retry_after_ms(), None);

        mgr.store_result(&task.task_id, ToolCallResult::success(vec![Content::text("ok")]));
        let result = mgr.get_result(&task.task_id).unwrap();
        assert!(!result.is_error);
    }

    #[test]
    fn cancel_transitions_working_task_and_sets_flag() {
        let mgr = TaskManager::new();
        let task = mgr.create_task(None, None, 0);
        let cancelled = mgr.cancel_task(&task.task_id).unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);
        assert!(mgr.is_cancelled(&task.task_id));
    }

    #[test]
    fn cancel_is_a_no_op_on_an_already_terminal_task() {
        let mgr = TaskManager::new();
        let task = mgr.create_task(None, None, 0);
        mgr.update_status(&task.task_id, TaskStatus::Completed, None);
        let result = mgr.cancel_task(&task.task_id).unwrap();
        assert_eq!(result.status, TaskStatus::Completed);
    }

    #[test]
    fn list_tasks_paginates_in_creation_order() {
        let mgr = TaskManager::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(mgr.create_task(None, None, 0).task_id);
        }

        let page1 = mgr.list_tasks(None, 2);
        assert_eq!(page1.tasks.len(), 2);
        assert!(page1.next_cursor.is_some());

        let page2 = mgr.list_tasks(page1.next_cursor.as_deref(), 2);
        assert_eq!(page2.tasks.len(), 2);

        let page3 = mgr.list_tasks(page2.next_cursor.as_deref(), 2);
        assert_eq!(page3.tasks.len(), 1);
        assert!(page3.next_cursor.is_none());
    }

    #[test]
    fn evict_expired_removes_tasks_past_their_ttl() {
        let mgr = TaskManager::new();
        let task = mgr.create_task(Some(0), None, 0);
        // ttl_ms = 0 means "already expired" the moment any time passes.
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(mgr.get_task(&task.task_id).is_none());
    }
}

//! Demo route table used by `bendf serve` and the integration tests.
//!
//! | Method | Path | Roles |
//! |---|---|---|
//! | `GET` | `/hello` | |
//! | `GET` | `/tasks` | `ADMIN`, `MEMBER` |
//! | `POST` | `/tasks` | `ADMIN` |
//! | `GET` | `/tasks/{id}` | |
//! | `POST` | `/upload` | |
//!
//! Tasks live in memory for the lifetime of the [`TaskStore`].

use crate::dispatcher::RequestData;
use crate::multipart::FileEntry;
use crate::route::{HandlerError, RouteDefinition, RouteDefinitionError, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct NewTask {
    title: String,
    description: String,
    status: String,
}

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Mutex<Vec<Task>>,
    next_id: AtomicU64,
}

impl TaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
    ) -> Task {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let task = Task {
            id: id.to_string(),
            title: title.into(),
            description: description.into(),
            status: status.into(),
        };
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task.clone());
        task
    }

    /// Tasks in creation order, optionally filtered by status.
    #[must_use]
    pub fn list(&self, status: Option<&str>) -> Vec<Task> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }
}

fn status_schema() -> Schema {
    json!({ "type": "string", "enum": ["active", "inactive"] })
}

fn task_schema() -> Schema {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "title": { "type": "string" },
            "description": { "type": "string" },
            "status": status_schema()
        },
        "required": ["id", "title", "description", "status"]
    })
}

fn hello(_req: RequestData) -> Result<Value, HandlerError> {
    Ok(json!({
        "message": "Hello from bendf!",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn list_tasks(store: &TaskStore, req: &RequestData) -> Result<Value, HandlerError> {
    let tasks = store.list(req.query_param("status"));
    Ok(json!({ "tasks": tasks }))
}

fn create_task(store: &TaskStore, req: RequestData) -> Result<Value, HandlerError> {
    let input = req
        .input
        .ok_or_else(|| HandlerError::new("Missing task input"))?;
    let new: NewTask = serde_json::from_value(input)?;
    let task = store.create(new.title, new.description, new.status);
    info!(task_id = %task.id, request_id = %req.request_id, "Task created");
    Ok(json!({ "task": task }))
}

fn get_task(store: &TaskStore, req: &RequestData) -> Result<Value, HandlerError> {
    let id = req
        .query_param("id")
        .ok_or_else(|| HandlerError::new("Missing task id"))?;
    store
        .get(id)
        .map(|task| json!({ "task": task }))
        .ok_or_else(|| HandlerError::new(format!("Task {id} not found")))
}

fn upload(req: RequestData) -> Result<Value, HandlerError> {
    let files: Vec<Value> = req
        .files
        .iter()
        .flat_map(|files| files.values())
        .flat_map(FileEntry::iter)
        .map(|f| json!({ "filename": f.filename, "mimetype": f.mimetype, "size": f.size }))
        .collect();
    if files.is_empty() {
        return Err(HandlerError::new("No files uploaded"));
    }

    let description = req
        .input
        .as_ref()
        .and_then(|i| i.get("description"))
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty());
    let mut message = format!("Successfully uploaded {} file(s)", files.len());
    if let Some(d) = description {
        // Writing into a `String` cannot fail.
        write!(message, ". Description: {d}").unwrap_or_default();
    }
    Ok(json!({ "message": message, "files": files }))
}

/// Build the demo routes over a shared task store.
///
/// # Errors
///
/// Never in practice; the definitions are static.
pub fn routes(store: &Arc<TaskStore>) -> Result<Vec<RouteDefinition>, RouteDefinitionError> {
    let list_store = Arc::clone(store);
    let create_store = Arc::clone(store);
    let get_store = Arc::clone(store);

    Ok(vec![
        RouteDefinition::builder()
            .method("GET")
            .path("/hello")
            .handler(hello)
            .response_schema(json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                    "timestamp": { "type": "string" }
                },
                "required": ["message", "timestamp"]
            }))
            .build()?,
        RouteDefinition::builder()
            .method("GET")
            .path("/tasks")
            .handler(move |req| list_tasks(&list_store, &req))
            .roles(["ADMIN", "MEMBER"])
            .query_params_schema(json!({
                "type": "object",
                "properties": { "status": status_schema() }
            }))
            .response_schema(json!({
                "type": "object",
                "properties": { "tasks": { "type": "array", "items": task_schema() } },
                "required": ["tasks"]
            }))
            .build()?,
        RouteDefinition::builder()
            .method("POST")
            .path("/tasks")
            .handler(move |req| create_task(&create_store, req))
            .roles(["ADMIN"])
            .input_schema(json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "status": {
                        "type": "string",
                        "enum": ["active", "inactive"],
                        "default": "active"
                    }
                },
                "required": ["title", "description"]
            }))
            .response_schema(json!({
                "type": "object",
                "properties": { "task": task_schema() },
                "required": ["task"]
            }))
            .build()?,
        RouteDefinition::builder()
            .method("GET")
            .path("/tasks/{id}")
            .handler(move |req| get_task(&get_store, &req))
            .response_schema(json!({
                "type": "object",
                "properties": { "task": task_schema() },
                "required": ["task"]
            }))
            .build()?,
        RouteDefinition::builder()
            .method("POST")
            .path("/upload")
            .handler(upload)
            .input_schema(json!({
                "type": "object",
                "properties": { "description": { "type": "string" } }
            }))
            .response_schema(json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                    "files": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "filename": { "type": "string" },
                                "mimetype": { "type": "string" },
                                "size": { "type": "number" }
                            },
                            "required": ["filename", "mimetype", "size"]
                        }
                    }
                },
                "required": ["message", "files"]
            }))
            .build()?,
    ])
}

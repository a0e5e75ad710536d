//! To-do list storage.
//!
//! A single `todos` table (`id`, `content`, `completed`) behind the REST
//! handlers in [`crate::server`]. Listing is newest first.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Longest accepted `content`, in characters.
pub const MAX_CONTENT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Todo {
    pub id: i64,
    pub content: String,
    pub completed: bool,
}

/// Body of `POST /api/todos`.
#[derive(Debug, Deserialize)]
pub struct NewTodo {
    #[serde(default)]
    pub content: Option<String>,
}

/// Body of `PUT /api/todos/{id}`; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct TodoPatch {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Trimmed content, or a message saying why it is unacceptable.
pub fn validate_content(content: Option<&str>) -> Result<&str, String> {
    let content = content.map(str::trim).unwrap_or_default();
    if content.is_empty() {
        return Err("content is required".to_string());
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(format!(
            "content must be at most {} characters",
            MAX_CONTENT_CHARS
        ));
    }
    Ok(content)
}

fn from_row(row: &SqliteRow) -> Todo {
    Todo {
        id: row.get("id"),
        content: row.get("content"),
        completed: row.get("completed"),
    }
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Todo>> {
    let rows = sqlx::query("SELECT id, content, completed FROM todos ORDER BY id DESC")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(from_row).collect())
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Todo>> {
    let row = sqlx::query("SELECT id, content, completed FROM todos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(from_row))
}

pub async fn create(pool: &SqlitePool, content: &str) -> Result<Todo> {
    let result = sqlx::query("INSERT INTO todos (content, completed) VALUES (?, 0)")
        .bind(content)
        .execute(pool)
        .await?;
    Ok(Todo {
        id: result.last_insert_rowid(),
        content: content.to_string(),
        completed: false,
    })
}

/// Apply `patch`; `None` when no such todo exists.
pub async fn update(pool: &SqlitePool, id: i64, patch: &TodoPatch) -> Result<Option<Todo>> {
    let Some(mut todo) = get(pool, id).await? else {
        return Ok(None);
    };
    if let Some(content) = &patch.content {
        todo.content = content.clone();
    }
    if let Some(completed) = patch.completed {
        todo.completed = completed;
    }

    sqlx::query("UPDATE todos SET content = ?, completed = ? WHERE id = ?")
        .bind(&todo.content)
        .bind(todo.completed)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(Some(todo))
}

/// Whether a row was removed.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM todos WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

//! Task service: input validation and cursor pagination on top of the store.
//!
//! Handlers call into this layer so that nothing invalid ever reaches the
//! store, and so the pagination window logic has a home that unit tests can
//! reach without a WebSocket in the way.

use serde::{Deserialize, Serialize};

use super::{Task, TaskError, TaskStore};

/// Inclusive bounds on `task.getPaginated`'s `limit` parameter. Part of the
/// wire contract, not configurable.
pub const PAGE_LIMIT_MIN: usize = 1;
pub const PAGE_LIMIT_MAX: usize = 20;

/// Partial update for a task. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// One page of a paginated task listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Task>,
    /// Id of the last returned item when more items remain beyond this
    /// window, else `None`.
    pub next_cursor: Option<String>,
}

/// Validate and create. The title must be non-empty after trimming; the
/// store is not touched otherwise.
pub fn create(
    store: &TaskStore,
    title: String,
    description: Option<String>,
) -> Result<Task, TaskError> {
    if title.trim().is_empty() {
        return Err(TaskError::InvalidInput("title must not be empty".into()));
    }
    Ok(store.create(title, description))
}

/// Validate and update. At least one field must be supplied, and a supplied
/// title must be non-empty after trimming.
pub fn update(store: &TaskStore, id: &str, patch: TaskPatch) -> Result<Task, TaskError> {
    if patch.title.is_none() && patch.description.is_none() {
        return Err(TaskError::InvalidInput(
            "update requires at least one of title or description".into(),
        ));
    }
    if let Some(title) = &patch.title {
        if title.trim().is_empty() {
            return Err(TaskError::InvalidInput("title must not be empty".into()));
        }
    }
    store.update(id, &patch)
}

/// Compute one pagination window over the live creation-ordered list.
///
/// The cursor is the id of the last item of the previous page; the window
/// starts immediately after its position. A cursor id that is no longer in
/// the list (deleted between pages) silently restarts at position 0 — the
/// caller may see earlier items again. Recomputed from the full list on
/// every call, so concurrent mutations between pages can skip or duplicate
/// items.
pub fn get_paginated(
    store: &TaskStore,
    limit: usize,
    cursor: Option<&str>,
) -> Result<Page, TaskError> {
    if !(PAGE_LIMIT_MIN..=PAGE_LIMIT_MAX).contains(&limit) {
        return Err(TaskError::InvalidInput(format!(
            "limit must be between {PAGE_LIMIT_MIN} and {PAGE_LIMIT_MAX}"
        )));
    }

    let all = store.get_all();

    let start = cursor
        .and_then(|c| all.iter().position(|t| t.id == c).map(|i| i + 1))
        .unwrap_or(0);

    let end = (start + limit).min(all.len());
    let items = all[start..end].to_vec();

    let next_cursor = if start + limit < all.len() {
        items.last().map(|t| t.id.clone())
    } else {
        None
    };

    Ok(Page { items, next_cursor })
}

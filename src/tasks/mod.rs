//! Task domain: the record type, the in-memory store, and the service layer
//! (validation + cursor pagination) on top of it.

pub mod service;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use service::{Page, TaskPatch, PAGE_LIMIT_MAX, PAGE_LIMIT_MIN};
pub use store::TaskStore;

/// A single task record.
///
/// `created_at` is assigned once by the store and never changes. `updated_at`
/// is absent until the first successful update and stamped on every update
/// after that, whether or not a field actually changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Errors raised by the task store and service.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The referenced task id does not exist in the store.
    #[error("task not found")]
    NotFound,
    /// Input rejected before the store was touched.
    #[error("{0}")]
    InvalidInput(String),
}

//! In-memory task store.
//!
//! The authoritative collection. Lives behind an `RwLock<Vec<Task>>` on the
//! `AppContext`, so tests construct isolated instances and a persistence
//! backend can be swapped in without touching the handlers. Append order is
//! creation order and every read returns tasks in that order. All scans are
//! linear.

use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use super::{Task, TaskError, TaskPatch};

/// Authoritative in-memory task collection. Not persisted — contents are
/// lost when the daemon exits.
pub struct TaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
        }
    }

    /// Append a new task. The store assigns the id and `created_at`;
    /// `updated_at` starts absent. Title validation is the caller's job.
    pub fn create(&self, title: String, description: Option<String>) -> Task {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut tasks = self.tasks.write().expect("task store lock poisoned");
        tasks.push(task.clone());
        task
    }

    /// All tasks in creation order.
    pub fn get_all(&self) -> Vec<Task> {
        self.tasks.read().expect("task store lock poisoned").clone()
    }

    pub fn get_by_id(&self, id: &str) -> Result<Task, TaskError> {
        self.tasks
            .read()
            .expect("task store lock poisoned")
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(TaskError::NotFound)
    }

    /// Overwrite only the supplied fields and stamp `updated_at`, whether or
    /// not anything actually changed.
    pub fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.write().expect("task store lock poisoned");
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskError::NotFound)?;

        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = Some(description.clone());
        }
        task.updated_at = Some(Utc::now());

        Ok(task.clone())
    }

    /// Remove a task permanently. Later entries shift down; relative order of
    /// the survivors is preserved. No soft-delete, no tombstone.
    pub fn delete(&self, id: &str) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().expect("task store lock poisoned");
        let index = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskError::NotFound)?;
        tasks.remove(index);
        Ok(())
    }

    /// Number of tasks currently held. Reported by `/health` and `daemon.status`.
    pub fn len(&self) -> usize {
        self.tasks.read().expect("task store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_unique_ids_and_no_updated_at() {
        let store = TaskStore::new();
        let a = store.create("first".into(), None);
        let b = store.create("second".into(), Some("notes".into()));

        assert_ne!(a.id, b.id);
        assert!(a.updated_at.is_none());
        assert!(b.updated_at.is_none());
        assert_eq!(b.description.as_deref(), Some("notes"));
    }

    #[test]
    fn get_all_preserves_creation_order() {
        let store = TaskStore::new();
        for title in ["a", "b", "c"] {
            store.create(title.into(), None);
        }
        let titles: Vec<_> = store.get_all().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, ["a", "b", "c"]);
    }

    #[test]
    fn get_by_id_unknown_is_not_found() {
        let store = TaskStore::new();
        store.create("only".into(), None);
        assert!(matches!(
            store.get_by_id("no-such-id"),
            Err(TaskError::NotFound)
        ));
    }

    #[test]
    fn update_overwrites_only_supplied_fields() {
        let store = TaskStore::new();
        let task = store.create("title".into(), Some("desc".into()));

        let updated = store
            .update(
                &task.id,
                &TaskPatch {
                    title: Some("new title".into()),
                    description: None,
                },
            )
            .unwrap();

        assert_eq!(updated.title, "new title");
        assert_eq!(updated.description.as_deref(), Some("desc"));
        assert_eq!(updated.created_at, task.created_at);
        assert!(updated.updated_at.is_some());
    }

    #[test]
    fn update_stamps_updated_at_even_when_nothing_changed() {
        let store = TaskStore::new();
        let task = store.create("same".into(), None);

        let updated = store
            .update(
                &task.id,
                &TaskPatch {
                    title: Some("same".into()),
                    description: None,
                },
            )
            .unwrap();

        assert!(updated.updated_at.unwrap() >= task.created_at);
    }

    #[test]
    fn update_unknown_is_not_found() {
        let store = TaskStore::new();
        let result = store.update(
            "missing",
            &TaskPatch {
                title: Some("x".into()),
                description: None,
            },
        );
        assert!(matches!(result, Err(TaskError::NotFound)));
    }

    #[test]
    fn delete_removes_and_keeps_relative_order() {
        let store = TaskStore::new();
        let ids: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|t| store.create((*t).into(), None).id)
            .collect();

        store.delete(&ids[1]).unwrap();

        let remaining: Vec<_> = store.get_all().into_iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![ids[0].clone(), ids[2].clone(), ids[3].clone()]);
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let store = TaskStore::new();
        assert!(matches!(store.delete("missing"), Err(TaskError::NotFound)));
    }

    #[test]
    fn duplicate_titles_are_permitted() {
        let store = TaskStore::new();
        store.create("dup".into(), None);
        store.create("dup".into(), None);
        assert_eq!(store.len(), 2);
    }
}

//! Client-held cache of the paginated task query, with an optimistic-patch
//! protocol for create and update mutations.
//!
//! Each mutation is an explicit state machine: `Pending` with a captured
//! immutable snapshot of the cached pages, resolved to `Committed` or
//! `RolledBack`.
//!
//! Known inherent hazard: mutations may resolve out of order, and a rollback
//! restores the snapshot captured at its *own* start. An older mutation
//! failing after a newer one succeeded will clobber the newer optimistic
//! patch. The server refetch triggered by staleness heals the cache
//! afterwards.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::tasks::{Page, Task, TaskPatch};

/// Lifecycle of one optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    /// Patch applied locally, remote call not yet resolved.
    Pending,
    /// Remote call succeeded; snapshot discarded, cache marked stale.
    Committed,
    /// Remote call failed; pre-patch snapshot restored.
    RolledBack,
}

struct Mutation {
    phase: MutationPhase,
    /// Immutable copy of the cached pages taken before the patch.
    snapshot: Vec<Page>,
}

/// Keyed cache of one paginated task query (the key is the page limit).
pub struct PageCache {
    limit: usize,
    pages: Vec<Page>,
    /// Set after a committed mutation or an invalidation hint; the owner
    /// refetches from page zero on next access.
    stale: bool,
    /// Bumped to cancel in-flight reads: a fetch completed under an older
    /// epoch is discarded instead of clobbering a fresher patch.
    fetch_epoch: u64,
    next_mutation_id: u64,
    mutations: HashMap<u64, Mutation>,
}

impl PageCache {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            pages: Vec::new(),
            stale: false,
            fetch_epoch: 0,
            next_mutation_id: 0,
            mutations: HashMap::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Cursor for the next page fetch, from the last cached page.
    pub fn next_cursor(&self) -> Option<&str> {
        self.pages.last().and_then(|p| p.next_cursor.as_deref())
    }

    /// Whether another page remains to be fetched. True before the first
    /// fetch has landed.
    pub fn has_more(&self) -> bool {
        match self.pages.last() {
            Some(page) => page.next_cursor.is_some(),
            None => true,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Invalidation hint (e.g. a `task.*` notification from another client).
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Drop all cached pages for a full refetch. Used after a confirmed
    /// delete, which has no optimistic phase.
    pub fn reset(&mut self) {
        self.pages.clear();
        self.stale = false;
        self.fetch_epoch += 1;
    }

    // ── Fetch protocol ───────────────────────────────────────────────────────

    /// Start a page fetch; the returned epoch must be handed back to
    /// [`complete_fetch`].
    pub fn begin_fetch(&mut self) -> u64 {
        self.fetch_epoch
    }

    /// Land a fetched page. Returns false (page discarded) when the epoch is
    /// stale, i.e. an optimistic patch or reset happened mid-flight.
    pub fn complete_fetch(&mut self, epoch: u64, page: Page) -> bool {
        if epoch != self.fetch_epoch {
            return false;
        }
        self.pages.push(page);
        self.stale = false;
        true
    }

    // ── Optimistic mutations ─────────────────────────────────────────────────

    /// Apply an optimistic create: a provisional record with a fresh random
    /// id spliced at the front of the first cached page. Returns the
    /// mutation id for [`commit`] / [`rollback`].
    pub fn begin_create(&mut self, title: &str, description: Option<&str>) -> u64 {
        let id = self.register_mutation();

        if let Some(first) = self.pages.first_mut() {
            let provisional = Task {
                id: Uuid::new_v4().to_string(),
                title: title.to_owned(),
                description: description.map(str::to_owned),
                created_at: Utc::now(),
                updated_at: None,
            };
            first.items.insert(0, provisional);
        }
        id
    }

    /// Apply an optimistic update: merge the patch into the matching record
    /// in every cached page and stamp a provisional `updated_at`.
    pub fn begin_update(&mut self, task_id: &str, patch: &TaskPatch) -> u64 {
        let id = self.register_mutation();

        let now = Utc::now();
        for page in &mut self.pages {
            for task in page.items.iter_mut().filter(|t| t.id == task_id) {
                if let Some(title) = &patch.title {
                    task.title = title.clone();
                }
                if let Some(description) = &patch.description {
                    task.description = Some(description.clone());
                }
                task.updated_at = Some(now);
            }
        }
        id
    }

    /// Resolve a mutation as successful. The snapshot is discarded, the
    /// optimistic patch stays in place, and the query is marked stale so the
    /// next access refetches from the server.
    pub fn commit(&mut self, mutation_id: u64) -> MutationPhase {
        if let Some(m) = self.mutations.get_mut(&mutation_id) {
            if m.phase == MutationPhase::Pending {
                m.phase = MutationPhase::Committed;
                m.snapshot.clear();
                self.stale = true;
            }
            m.phase
        } else {
            MutationPhase::Committed
        }
    }

    /// Resolve a mutation as failed: restore the exact pre-patch snapshot,
    /// discarding the optimistic change. Only this mutation's own snapshot
    /// is restored — see the module note on out-of-order resolution.
    pub fn rollback(&mut self, mutation_id: u64) -> MutationPhase {
        if let Some(m) = self.mutations.get_mut(&mutation_id) {
            if m.phase == MutationPhase::Pending {
                m.phase = MutationPhase::RolledBack;
                self.pages = std::mem::take(&mut m.snapshot);
                self.fetch_epoch += 1;
            }
            m.phase
        } else {
            MutationPhase::RolledBack
        }
    }

    /// Number of unresolved mutations. The form disables submission while
    /// this is non-zero.
    pub fn in_flight(&self) -> usize {
        self.mutations
            .values()
            .filter(|m| m.phase == MutationPhase::Pending)
            .count()
    }

    /// Flattened view for rendering: duplicate ids across cached pages
    /// (possible after invalidation races) are de-duplicated, keeping the
    /// last-seen record at the position of the first.
    pub fn tasks(&self) -> Vec<Task> {
        let mut ordered: Vec<Task> = Vec::new();
        let mut index_by_id: HashMap<String, usize> = HashMap::new();

        for task in self.pages.iter().flat_map(|p| p.items.iter()) {
            match index_by_id.get(&task.id) {
                Some(&i) => ordered[i] = task.clone(),
                None => {
                    index_by_id.insert(task.id.clone(), ordered.len());
                    ordered.push(task.clone());
                }
            }
        }
        ordered
    }

    fn register_mutation(&mut self) -> u64 {
        // Cancel any in-flight read before patching.
        self.fetch_epoch += 1;

        let id = self.next_mutation_id;
        self.next_mutation_id += 1;
        self.mutations.insert(
            id,
            Mutation {
                phase: MutationPhase::Pending,
                snapshot: self.pages.clone(),
            },
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: &str, title: &str) -> Task {
        Task {
            id: id.into(),
            title: title.into(),
            description: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn seeded_cache() -> PageCache {
        let mut cache = PageCache::new(5);
        let epoch = cache.begin_fetch();
        cache.complete_fetch(
            epoch,
            Page {
                items: vec![task("a", "alpha"), task("b", "beta")],
                next_cursor: Some("b".into()),
            },
        );
        cache
    }

    #[test]
    fn optimistic_create_splices_at_front_of_first_page() {
        let mut cache = seeded_cache();
        cache.begin_create("fresh", Some("notes"));

        let tasks = cache.tasks();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].title, "fresh");
        assert_eq!(tasks[1].id, "a");
    }

    #[test]
    fn committed_create_marks_query_stale_and_keeps_patch() {
        let mut cache = seeded_cache();
        let m = cache.begin_create("fresh", None);

        assert_eq!(cache.commit(m), MutationPhase::Committed);
        assert!(cache.is_stale());
        assert_eq!(cache.tasks().len(), 3);
        assert_eq!(cache.in_flight(), 0);
    }

    #[test]
    fn failed_update_restores_exact_pre_mutation_pages() {
        let mut cache = seeded_cache();
        let before = cache.pages().to_vec();

        let m = cache.begin_update(
            "a",
            &TaskPatch {
                title: Some("patched".into()),
                description: None,
            },
        );
        assert_eq!(cache.tasks()[0].title, "patched");

        assert_eq!(cache.rollback(m), MutationPhase::RolledBack);
        assert_eq!(cache.pages().to_vec(), before);
        assert!(cache.tasks()[0].updated_at.is_none());
    }

    #[test]
    fn optimistic_update_patches_every_cached_page() {
        let mut cache = seeded_cache();
        let epoch = cache.begin_fetch();
        cache.complete_fetch(
            epoch,
            Page {
                items: vec![task("a", "alpha-dup"), task("c", "gamma")],
                next_cursor: None,
            },
        );

        cache.begin_update(
            "a",
            &TaskPatch {
                title: Some("patched".into()),
                description: None,
            },
        );

        for page in cache.pages() {
            for t in page.items.iter().filter(|t| t.id == "a") {
                assert_eq!(t.title, "patched");
                assert!(t.updated_at.is_some());
            }
        }
    }

    #[test]
    fn patch_cancels_in_flight_fetch() {
        let mut cache = seeded_cache();
        let epoch = cache.begin_fetch();

        cache.begin_create("racer", None);

        // The read that was in flight when the patch landed is discarded.
        assert!(!cache.complete_fetch(
            epoch,
            Page {
                items: vec![task("z", "late")],
                next_cursor: None,
            },
        ));
        assert_eq!(cache.pages().len(), 1);
    }

    #[test]
    fn older_rollback_clobbers_newer_commit() {
        // Known inherent behavior of per-mutation snapshots, not mitigated.
        let mut cache = seeded_cache();

        let older = cache.begin_update(
            "a",
            &TaskPatch {
                title: Some("older".into()),
                description: None,
            },
        );
        let newer = cache.begin_update(
            "b",
            &TaskPatch {
                title: Some("newer".into()),
                description: None,
            },
        );

        cache.commit(newer);
        cache.rollback(older);

        // The rollback restored the snapshot from before *either* patch.
        let tasks = cache.tasks();
        assert_eq!(tasks[0].title, "alpha");
        assert_eq!(tasks[1].title, "beta");
    }

    #[test]
    fn resolving_twice_keeps_first_outcome() {
        let mut cache = seeded_cache();
        let m = cache.begin_create("once", None);

        assert_eq!(cache.commit(m), MutationPhase::Committed);
        assert_eq!(cache.rollback(m), MutationPhase::Committed);
        assert_eq!(cache.tasks().len(), 3);
    }

    #[test]
    fn create_with_no_cached_pages_patches_nothing() {
        let mut cache = PageCache::new(5);
        let m = cache.begin_create("early", None);

        assert!(cache.tasks().is_empty());
        cache.rollback(m);
        assert!(cache.tasks().is_empty());
    }

    #[test]
    fn delete_flow_resets_all_pages() {
        let mut cache = seeded_cache();
        cache.reset();
        assert!(cache.pages().is_empty());
        assert!(cache.has_more());
    }

    #[test]
    fn duplicate_ids_across_pages_keep_last_seen_record() {
        let mut cache = seeded_cache();
        let epoch = cache.begin_fetch();
        cache.complete_fetch(
            epoch,
            Page {
                items: vec![task("a", "alpha-v2")],
                next_cursor: None,
            },
        );

        let tasks = cache.tasks();
        assert_eq!(tasks.len(), 2);
        // Position of first occurrence, content of last.
        assert_eq!(tasks[0].id, "a");
        assert_eq!(tasks[0].title, "alpha-v2");
    }

    #[test]
    fn next_cursor_tracks_last_page() {
        let mut cache = seeded_cache();
        assert_eq!(cache.next_cursor(), Some("b"));
        assert!(cache.has_more());

        let epoch = cache.begin_fetch();
        cache.complete_fetch(
            epoch,
            Page {
                items: vec![task("c", "gamma")],
                next_cursor: None,
            },
        );
        assert_eq!(cache.next_cursor(), None);
        assert!(!cache.has_more());
    }
}

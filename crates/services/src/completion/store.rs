use std::sync::Arc;

use prepare_core::model::{Catalog, CompletionState, LessonId, ModuleId};
use storage::repository::KeyValueStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::mirror::{RemoteMirror, RemoteTarget};
use crate::config::CompletionConfig;
use crate::error::CompletionError;
use crate::overview::ModulesOverview;

/// Owns the persisted [`CompletionState`].
///
/// The local key-value entry is authoritative for the running session; the
/// remote document is consulted only at init/sync time and otherwise
/// receives best-effort copies through [`RemoteMirror`]. Every
/// read-modify-write runs under one async lock so rapid repeated calls
/// cannot lose updates.
pub struct CompletionStore {
    catalog: Arc<Catalog>,
    local: Arc<dyn KeyValueStore>,
    config: CompletionConfig,
    remote: Option<RemoteTarget>,
    mirror: Option<RemoteMirror>,
    write_lock: Mutex<()>,
}

impl CompletionStore {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, local: Arc<dyn KeyValueStore>, config: CompletionConfig) -> Self {
        Self {
            catalog,
            local,
            config,
            remote: None,
            mirror: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Attach a remote mirror and start its writer task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn with_remote(mut self, target: RemoteTarget) -> Self {
        self.mirror = Some(RemoteMirror::spawn(target.clone()));
        self.remote = Some(target);
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    //
    // ─── READ PATHS ─────────────────────────────────────────────────────────────
    //

    /// Load the state, preferring remote, then local, then a fresh skeleton.
    pub async fn init_completion_state(&self) -> CompletionState {
        let _guard = self.write_lock.lock().await;
        self.init_locked().await
    }

    /// Local read; falls back to [`Self::init_completion_state`] when absent.
    ///
    /// Does not consult the remote document when a local copy exists.
    pub async fn get_completion_state(&self) -> CompletionState {
        if let Some(state) = self.read_local().await {
            return state;
        }
        let _guard = self.write_lock.lock().await;
        // Another caller may have initialized while we waited.
        if let Some(state) = self.read_local().await {
            return state;
        }
        self.init_locked().await
    }

    /// Pull the remote document over the local copy (app-open reconciliation).
    pub async fn sync_remote_to_local(&self) -> CompletionState {
        let _guard = self.write_lock.lock().await;
        if let Some(state) = self.read_remote().await {
            info!("local completion state replaced from remote");
            self.write_local_logged(&state).await;
            return state;
        }
        if let Some(state) = self.read_local().await {
            return state;
        }
        self.persist_skeleton().await
    }

    /// Resume position for a lesson; `0` when unknown.
    pub async fn get_lesson_current_page_index(&self, lesson_id: &LessonId) -> usize {
        self.get_completion_state()
            .await
            .current_page_index(lesson_id)
    }

    /// Catalog joined with the current state, for dashboard surfaces.
    pub async fn modules_with_completion(&self) -> ModulesOverview {
        let state = self.get_completion_state().await;
        ModulesOverview::build(&self.catalog, &state)
    }

    //
    // ─── MUTATIONS ──────────────────────────────────────────────────────────────
    //

    /// Record the page a lesson is on, completing it at the end.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::LocalWrite` if the local store rejects the
    /// write; the state is then unchanged.
    pub async fn set_lesson_current_page(
        &self,
        module_id: &ModuleId,
        lesson_id: &LessonId,
        page_index: usize,
    ) -> Result<CompletionState, CompletionError> {
        debug!(%module_id, %lesson_id, page_index, "set lesson page");
        self.mutate(|state, catalog| {
            state.set_current_page(catalog, module_id, lesson_id, page_index);
        })
        .await
    }

    /// Mark a lesson completed and refresh its module's flag.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::LocalWrite` if the local store rejects the
    /// write; the state is then unchanged.
    pub async fn mark_lesson_completed(
        &self,
        module_id: &ModuleId,
        lesson_id: &LessonId,
    ) -> Result<CompletionState, CompletionError> {
        debug!(%module_id, %lesson_id, "mark lesson completed");
        self.mutate(|state, catalog| {
            state.mark_lesson_completed(catalog, module_id, lesson_id);
        })
        .await
    }

    /// Override a module's completed flag. Lessons are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::LocalWrite` if the local store rejects the
    /// write; the state is then unchanged.
    pub async fn set_module_completed(
        &self,
        module_id: &ModuleId,
        completed: bool,
    ) -> Result<CompletionState, CompletionError> {
        debug!(%module_id, completed, "set module completed");
        self.mutate(|state, catalog| {
            state.set_module_completed(catalog, module_id, completed);
        })
        .await
    }

    /// Drop the local copy (account deletion). The remote document is not touched.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::LocalWrite` if the entry cannot be removed.
    pub async fn reset(&self) -> Result<(), CompletionError> {
        let _guard = self.write_lock.lock().await;
        self.local
            .remove(&self.config.storage_key)
            .await
            .map_err(CompletionError::LocalWrite)?;
        info!("local completion state cleared");
        Ok(())
    }

    /// Wait until the latest remote snapshot has been attempted.
    pub async fn flush_remote(&self) {
        if let Some(mirror) = &self.mirror {
            mirror.flush().await;
        }
    }

    //
    // ─── INTERNALS ──────────────────────────────────────────────────────────────
    //

    async fn mutate<F>(&self, apply: F) -> Result<CompletionState, CompletionError>
    where
        F: FnOnce(&mut CompletionState, &Catalog),
    {
        let _guard = self.write_lock.lock().await;
        let mut state = match self.read_local().await {
            Some(state) => state,
            None => self.init_locked().await,
        };
        apply(&mut state, &self.catalog);
        self.commit(&state).await?;
        Ok(state)
    }

    /// Two-phase write: local must succeed before the remote copy is queued.
    async fn commit(&self, state: &CompletionState) -> Result<(), CompletionError> {
        let encoded = serde_json::to_string(state)?;
        self.local
            .set(&self.config.storage_key, &encoded)
            .await
            .map_err(|err| {
                warn!(error = %err, "local completion write failed");
                CompletionError::LocalWrite(err)
            })?;
        self.mirror(state);
        Ok(())
    }

    async fn init_locked(&self) -> CompletionState {
        if let Some(state) = self.read_remote().await {
            info!("completion state initialized from remote");
            self.write_local_logged(&state).await;
            return state;
        }
        if let Some(state) = self.read_local().await {
            return state;
        }
        self.persist_skeleton().await
    }

    async fn persist_skeleton(&self) -> CompletionState {
        info!("building fresh completion state from catalog");
        let state = CompletionState::skeleton(&self.catalog);
        self.write_local_logged(&state).await;
        self.mirror(&state);
        state
    }

    async fn read_local(&self) -> Option<CompletionState> {
        let raw = match self.local.get(&self.config.storage_key).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(error = %err, "local completion read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(error = %err, "discarding malformed local completion state");
                None
            }
        }
    }

    async fn read_remote(&self) -> Option<CompletionState> {
        let target = self.remote.as_ref()?;
        let document = match target.store().read(target.path()).await {
            Ok(document) => document?,
            Err(err) => {
                warn!(path = target.path(), error = %err, "remote completion read failed");
                return None;
            }
        };
        match serde_json::from_value(document) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(path = target.path(), error = %err, "discarding malformed remote completion state");
                None
            }
        }
    }

    /// Local write on read paths: failures are logged and the caller proceeds.
    async fn write_local_logged(&self, state: &CompletionState) {
        let encoded = match serde_json::to_string(state) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(error = %err, "failed to encode completion state");
                return;
            }
        };
        if let Err(err) = self.local.set(&self.config.storage_key, &encoded).await {
            warn!(error = %err, "local completion write failed");
        }
    }

    fn mirror(&self, state: &CompletionState) {
        let Some(mirror) = &self.mirror else {
            return;
        };
        match serde_json::to_value(state) {
            Ok(snapshot) => {
                mirror.enqueue(snapshot);
            }
            Err(err) => warn!(error = %err, "failed to encode snapshot for remote mirror"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prepare_core::model::{Lesson, Module, RawPage, UserId};
    use serde_json::json;
    use storage::repository::{
        InMemoryDocumentStore, InMemoryKeyValueStore, RemoteDocumentStore, StorageError,
    };

    fn pages(n: usize) -> Vec<RawPage> {
        (0..n).map(|i| RawPage::text(format!("P{i}"), "")).collect()
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::new(vec![
            Module::new("1", "Understand", vec![Lesson::new("1-1", "Faults", pages(3))]),
            Module::new(
                "2",
                "Prepare",
                vec![
                    Lesson::new("2-1", "Kit", pages(2)),
                    Lesson::new("2-2", "Space", pages(2)),
                    Lesson::new("2-3", "Plan", pages(2)),
                ],
            ),
        ]))
    }

    fn m(id: &str) -> ModuleId {
        ModuleId::new(id)
    }

    fn l(id: &str) -> LessonId {
        LessonId::new(id)
    }

    const DEFAULT_KEY: &str = crate::config::DEFAULT_STORAGE_KEY;

    /// Local store whose reads and/or writes always fail.
    #[derive(Default)]
    struct FailingLocal {
        fail_reads: bool,
        fail_writes: bool,
    }

    #[async_trait]
    impl KeyValueStore for FailingLocal {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads {
                Err(StorageError::Connection("disk unavailable".into()))
            } else {
                Ok(None)
            }
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            if self.fail_writes {
                Err(StorageError::Connection("disk full".into()))
            } else {
                Ok(())
            }
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    /// Remote store that is reachable but rejects every request.
    struct BrokenRemote;

    #[async_trait]
    impl RemoteDocumentStore for BrokenRemote {
        async fn read(&self, _path: &str) -> Result<Option<serde_json::Value>, StorageError> {
            Err(StorageError::Connection("timeout".into()))
        }

        async fn write(&self, _path: &str, _document: &serde_json::Value) -> Result<(), StorageError> {
            Err(StorageError::Connection("timeout".into()))
        }
    }

    fn local_store(local: Arc<dyn KeyValueStore>) -> CompletionStore {
        CompletionStore::new(catalog(), local, CompletionConfig::default())
    }

    fn remote_store(
        local: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteDocumentStore>,
    ) -> CompletionStore {
        let config = CompletionConfig::default();
        let target = RemoteTarget::resolve(remote, Some(&UserId::new("u1")), &config).unwrap();
        CompletionStore::new(catalog(), local, config).with_remote(target)
    }

    #[tokio::test]
    async fn init_builds_and_persists_skeleton() {
        let local = InMemoryKeyValueStore::new();
        let store = local_store(Arc::new(local.clone()));

        let state = store.init_completion_state().await;
        assert_eq!(state, CompletionState::skeleton(&catalog()));
        assert!(local.get(DEFAULT_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn resume_position_round_trips() {
        let store = local_store(Arc::new(InMemoryKeyValueStore::new()));
        store
            .set_lesson_current_page(&m("1"), &l("1-1"), 2)
            .await
            .unwrap();
        assert_eq!(store.get_lesson_current_page_index(&l("1-1")).await, 2);
    }

    #[tokio::test]
    async fn unreadable_local_and_no_remote_yields_skeleton() {
        let local = Arc::new(FailingLocal {
            fail_reads: true,
            fail_writes: true,
            ..FailingLocal::default()
        });
        let store = local_store(local);

        let state = store.get_completion_state().await;
        assert_eq!(state, CompletionState::skeleton(&catalog()));
        assert!(state.modules.values().all(|module| {
            module
                .lessons
                .values()
                .all(|lesson| !lesson.completed && lesson.current_page_index == 0)
        }));
    }

    #[tokio::test]
    async fn malformed_local_json_is_treated_as_absent() {
        let local = InMemoryKeyValueStore::new();
        local.set(DEFAULT_KEY, "{ definitely not json").await.unwrap();
        let store = local_store(Arc::new(local.clone()));

        let state = store.get_completion_state().await;
        assert_eq!(state, CompletionState::skeleton(&catalog()));
        let repaired = local.get(DEFAULT_KEY).await.unwrap().unwrap();
        assert!(serde_json::from_str::<CompletionState>(&repaired).is_ok());
    }

    #[tokio::test]
    async fn local_write_failure_is_reported_and_not_mirrored() {
        let remote = InMemoryDocumentStore::new();
        let local = Arc::new(FailingLocal {
            fail_writes: true,
            ..FailingLocal::default()
        });
        let store = remote_store(local, Arc::new(remote.clone()));

        let err = store
            .mark_lesson_completed(&m("2"), &l("2-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::LocalWrite(_)));

        store.flush_remote().await;
        let mirrored = remote.document("completion/u1");
        assert!(mirrored.is_none_or(|doc| {
            doc["modules"]["2"]["lessons"]["2-1"]["completed"] == json!(false)
        }));
    }

    #[tokio::test]
    async fn remote_failure_never_blocks_local_writes() {
        let local = InMemoryKeyValueStore::new();
        let store = remote_store(Arc::new(local.clone()), Arc::new(BrokenRemote));

        let state = store
            .set_lesson_current_page(&m("1"), &l("1-1"), 1)
            .await
            .unwrap();
        store.flush_remote().await;

        assert_eq!(state.current_page_index(&l("1-1")), 1);
        assert_eq!(store.get_completion_state().await, state);
    }

    #[tokio::test]
    async fn init_prefers_remote_and_copies_it_locally() {
        let remote = InMemoryDocumentStore::new();
        let mut remote_state = CompletionState::skeleton(&catalog());
        remote_state.mark_lesson_completed(&catalog(), &m("1"), &l("1-1"));
        remote
            .write("completion/u1", &serde_json::to_value(&remote_state).unwrap())
            .await
            .unwrap();

        let local = InMemoryKeyValueStore::new();
        local
            .set(DEFAULT_KEY, &serde_json::to_string(&CompletionState::skeleton(&catalog())).unwrap())
            .await
            .unwrap();

        let store = remote_store(Arc::new(local.clone()), Arc::new(remote));
        let state = store.init_completion_state().await;
        assert_eq!(state, remote_state);

        let stored: CompletionState =
            serde_json::from_str(&local.get(DEFAULT_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored, remote_state);
    }

    #[tokio::test]
    async fn get_does_not_recheck_remote_once_local_exists() {
        let remote = InMemoryDocumentStore::new();
        let local = InMemoryKeyValueStore::new();
        let store = remote_store(Arc::new(local), Arc::new(remote.clone()));

        let first = store.get_completion_state().await;
        store.flush_remote().await;

        let mut newer = first.clone();
        newer.mark_lesson_completed(&catalog(), &m("1"), &l("1-1"));
        remote
            .write("completion/u1", &serde_json::to_value(&newer).unwrap())
            .await
            .unwrap();

        assert_eq!(store.get_completion_state().await, first);
        assert_eq!(store.sync_remote_to_local().await, newer);
        assert_eq!(store.get_completion_state().await, newer);
    }

    #[tokio::test]
    async fn sync_without_remote_ensures_local_exists() {
        let local = InMemoryKeyValueStore::new();
        let store = local_store(Arc::new(local.clone()));

        let state = store.sync_remote_to_local().await;
        assert_eq!(state, CompletionState::skeleton(&catalog()));
        assert!(local.get(DEFAULT_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn mutations_mirror_full_document() {
        let remote = InMemoryDocumentStore::new();
        let store = remote_store(Arc::new(InMemoryKeyValueStore::new()), Arc::new(remote.clone()));

        let state = store
            .mark_lesson_completed(&m("1"), &l("1-1"))
            .await
            .unwrap();
        store.flush_remote().await;

        assert_eq!(
            remote.document("completion/u1"),
            Some(serde_json::to_value(&state).unwrap())
        );
        assert_eq!(
            remote.document("completion/u1").unwrap()["modules"]["1"]["completed"],
            json!(true)
        );
    }

    #[tokio::test]
    async fn module_flag_tracks_sibling_lessons() {
        let store = local_store(Arc::new(InMemoryKeyValueStore::new()));
        for lesson in ["2-1", "2-2", "2-3"] {
            let state = store.mark_lesson_completed(&m("2"), &l(lesson)).await.unwrap();
            for module in state.modules.values() {
                let all = module.lessons.values().all(|lesson| lesson.completed);
                assert_eq!(module.completed, all);
            }
        }
    }

    #[tokio::test]
    async fn set_module_completed_overrides_flag_only() {
        let store = local_store(Arc::new(InMemoryKeyValueStore::new()));
        let state = store.set_module_completed(&m("1"), true).await.unwrap();
        let module = state.module(&m("1")).unwrap();
        assert!(module.completed);
        assert!(!module.lessons[&l("1-1")].completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_advances_do_not_lose_updates() {
        let store = Arc::new(local_store(Arc::new(InMemoryKeyValueStore::new())));
        let targets = [("1", "1-1"), ("2", "2-1"), ("2", "2-2"), ("2", "2-3")];
        let mut handles = Vec::new();
        for (module, lesson) in targets {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .set_lesson_current_page(&m(module), &l(lesson), 1)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let state = store.get_completion_state().await;
        for (_, lesson) in targets {
            assert_eq!(state.current_page_index(&l(lesson)), 1, "lesson {lesson}");
        }
    }

    #[tokio::test]
    async fn reset_clears_local_copy() {
        let local = InMemoryKeyValueStore::new();
        let store = local_store(Arc::new(local.clone()));
        store.mark_lesson_completed(&m("1"), &l("1-1")).await.unwrap();

        store.reset().await.unwrap();
        assert!(local.get(DEFAULT_KEY).await.unwrap().is_none());
        assert_eq!(
            store.get_completion_state().await,
            CompletionState::skeleton(&catalog())
        );
    }
}

use std::sync::Arc;

use prepare_core::model::{Catalog, LessonId, ModuleId, UserId};
use storage::repository::{RemoteDocumentStore, Storage};
use tracing::info;

use crate::completion::{CompletionStore, RemoteTarget};
use crate::config::CompletionConfig;
use crate::error::AppServicesError;
use crate::lessons::LessonRuntime;

/// Assembles app-facing services around one shared [`CompletionStore`].
#[derive(Clone)]
pub struct AppServices {
    completion: Arc<CompletionStore>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// The remote mirror is enabled only when both `session` and an
    /// available `remote` store are given.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        catalog: Catalog,
        session: Option<UserId>,
        remote: Option<Arc<dyn RemoteDocumentStore>>,
    ) -> Result<Self, AppServicesError> {
        let mut storage = Storage::sqlite(db_url).await?;
        if let Some(remote) = remote {
            storage = storage.with_remote(remote);
        }
        Ok(Self::from_storage(
            storage,
            catalog,
            session.as_ref(),
            CompletionConfig::default(),
        ))
    }

    /// Build services over an already assembled [`Storage`].
    ///
    /// # Panics
    ///
    /// Panics if a remote is resolved outside a tokio runtime.
    #[must_use]
    pub fn from_storage(
        storage: Storage,
        catalog: Catalog,
        session: Option<&UserId>,
        config: CompletionConfig,
    ) -> Self {
        let target = RemoteTarget::resolve(Arc::clone(&storage.remote), session, &config);
        let mut store = CompletionStore::new(Arc::new(catalog), storage.local, config);
        match target {
            Some(target) => {
                info!(path = target.path(), "remote mirror enabled");
                store = store.with_remote(target);
            }
            None => info!("running with local completion state only"),
        }
        Self {
            completion: Arc::new(store),
        }
    }

    #[must_use]
    pub fn completion(&self) -> Arc<CompletionStore> {
        Arc::clone(&self.completion)
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        self.completion.catalog()
    }

    /// Open a lesson walk; `None` if the lesson is not in the catalog.
    pub async fn open_lesson(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> Option<LessonRuntime> {
        LessonRuntime::open(self.completion(), module_id, lesson_id).await
    }
}

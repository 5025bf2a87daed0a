use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::queue::QueueService;
use crate::services::storage::StorageService;
use crate::services::verification::VerificationService;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    storage: Option<StorageService>,
    queue: Option<QueueService>,
    verification: VerificationService,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        storage: Option<StorageService>,
        queue: Option<QueueService>,
        verification: VerificationService,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, storage, queue, verification }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn storage(&self) -> Option<&StorageService> {
        self.inner.storage.as_ref()
    }

    pub(crate) fn queue(&self) -> Option<&QueueService> {
        self.inner.queue.as_ref()
    }

    pub(crate) fn verification(&self) -> &VerificationService {
        &self.inner.verification
    }
}

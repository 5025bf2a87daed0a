pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::queue::QueueService;
use crate::services::storage::StorageService;
use crate::services::verification::VerificationService;

pub async fn run() -> anyhow::Result<()> {
    let state = init_state().await?;
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Enrolld API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    Ok(())
}

pub async fn run_worker() -> anyhow::Result<()> {
    let state = init_state().await?;
    tasks::scheduler::run(state).await
}

async fn init_state() -> anyhow::Result<AppState> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let storage = StorageService::from_settings(&settings).await?;
    if storage.is_none() {
        tracing::warn!("Object storage credentials missing; uploads and downloads are disabled");
    }

    let queue = QueueService::from_settings(&settings).await;
    if queue.is_none() {
        tracing::warn!("Upload queue URL missing; extraction notifications are disabled");
    }

    let verification = VerificationService::from_settings(&settings)?;

    Ok(AppState::new(settings, db_pool, storage, queue, verification))
}

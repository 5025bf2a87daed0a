use thiserror::Error;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc as now_primitive;
use crate::db::models::Document;
use crate::db::types::DocumentStatus;
use crate::repositories;
use crate::services::enrollment;

#[derive(Debug, Error)]
pub(crate) enum DocumentActionError {
    #[error("Document not found")]
    NotFound,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Creates the candidate's document of the given type, or replaces the
/// existing one. Replacement restarts the review cycle and deletes the
/// superseded stored object best-effort.
pub(crate) async fn save_or_replace(
    state: &AppState,
    candidate_id: i32,
    document_type_id: i32,
    file_key: &str,
    subtype: Option<&str>,
) -> Result<Document, sqlx::Error> {
    let existing = repositories::documents::find_by_candidate_and_type(
        state.db(),
        candidate_id,
        document_type_id,
    )
    .await?;

    match existing {
        Some(existing) => {
            let old_key = existing.file_key.clone();
            let updated = repositories::documents::replace_file(
                state.db(),
                existing.id,
                file_key,
                subtype,
                now_primitive(),
            )
            .await?;

            delete_superseded_object(state, &old_key, file_key).await;
            Ok(updated)
        }
        None => {
            repositories::documents::create(
                state.db(),
                repositories::documents::CreateDocument {
                    candidate_id,
                    document_type_id,
                    subtype,
                    file_key,
                    uploaded_at: now_primitive(),
                },
            )
            .await
        }
    }
}

pub(crate) async fn reupload(
    state: &AppState,
    document_id: i32,
    file_key: &str,
    subtype: Option<&str>,
) -> Result<Document, DocumentActionError> {
    let existing = repositories::documents::find_by_id(state.db(), document_id)
        .await?
        .ok_or(DocumentActionError::NotFound)?;

    let old_key = existing.file_key.clone();
    let updated = repositories::documents::replace_file(
        state.db(),
        document_id,
        file_key,
        subtype,
        now_primitive(),
    )
    .await?;

    delete_superseded_object(state, &old_key, file_key).await;
    Ok(updated)
}

/// Applies the extraction pipeline's verdict to a document. An approval is
/// the trigger for enrollment reconciliation, dispatched without blocking
/// the caller.
pub(crate) async fn update_status(
    state: &AppState,
    document_id: i32,
    status: DocumentStatus,
    extracted_data: Option<serde_json::Value>,
    rejection_reason: Option<&str>,
) -> Result<Document, DocumentActionError> {
    repositories::documents::find_by_id(state.db(), document_id)
        .await?
        .ok_or(DocumentActionError::NotFound)?;

    let updated = repositories::documents::update_status(
        state.db(),
        document_id,
        status,
        extracted_data,
        rejection_reason,
        now_primitive(),
    )
    .await?;

    if status == DocumentStatus::Approved {
        dispatch_reconciliation(state, updated.candidate_id).await;
    }

    Ok(updated)
}

/// Hands reconciliation to the runtime as a background task so the document
/// update returns immediately. If no runtime handle is available the work
/// runs inline rather than being dropped.
pub(crate) async fn dispatch_reconciliation(state: &AppState, candidate_id: i32) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let state = state.clone();
            handle.spawn(async move {
                if let Err(err) = enrollment::reconcile(&state, candidate_id).await {
                    tracing::error!(
                        candidate_id,
                        error = %err,
                        "Background enrollment reconciliation failed"
                    );
                }
            });
        }
        Err(_) => {
            tracing::warn!(
                candidate_id,
                "No runtime handle for background dispatch; reconciling inline"
            );
            if let Err(err) = enrollment::reconcile(state, candidate_id).await {
                tracing::error!(candidate_id, error = %err, "Inline enrollment reconciliation failed");
            }
        }
    }
}

async fn delete_superseded_object(state: &AppState, old_key: &str, new_key: &str) {
    if old_key.is_empty() || old_key == new_key {
        return;
    }

    let Some(storage) = state.storage() else {
        return;
    };

    if let Err(err) = storage.delete_object(old_key).await {
        tracing::warn!(key = old_key, error = %err, "Failed to delete superseded stored object");
    }
}

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::ExtractionApiKey;
use crate::api::validation::validate_document_upload;
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::db::models::{Candidate, DocumentType};
use crate::repositories;
use crate::schemas::document::{
    DocumentTypeResponse, StatusUpdateRequest, StatusUpdateResponse, UploadResponse,
};
use crate::services;
use crate::services::queue::UploadNotification;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_document))
        .route("/reupload", post(reupload_document))
        .route("/types", get(list_document_types))
        .route("/status", post(update_document_status))
        // Per-file size is enforced against MAX_UPLOAD_SIZE_MB while the
        // multipart stream is read; this only lifts axum's 2MB default.
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
}

#[derive(Default)]
struct UploadForm {
    candidate_id: Option<i32>,
    document_id: Option<i32>,
    document_type: Option<i32>,
    subtype: Option<String>,
    file_bytes: Option<Vec<u8>>,
    filename: Option<String>,
    content_type: Option<String>,
}

async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_upload_form(&mut multipart, &state).await?;
    let UploadForm { candidate_id, document_type, subtype, file_bytes, filename, content_type, .. } =
        form;

    let candidate_id =
        candidate_id.ok_or_else(|| ApiError::BadRequest("candidate_id is required".to_string()))?;
    let document_type_id = document_type
        .ok_or_else(|| ApiError::BadRequest("document_type is required".to_string()))?;

    let candidate = fetch_candidate(&state, candidate_id).await?;
    let document_type = fetch_document_type(&state, document_type_id).await?;
    let subtype = subtype_for_type(&state, document_type_id, subtype.as_deref())?;

    let (file_bytes, filename, content_type) = required_file(file_bytes, filename, content_type)?;
    let extension = validate_document_upload(
        &filename,
        &content_type,
        &state.settings().documents().allowed_extensions,
    )?;

    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("Object storage is not configured".to_string())
    })?;

    let file_key = format!("documents/{}/{}.{extension}", candidate.id, Uuid::new_v4());
    storage
        .upload_bytes(&file_key, &content_type, file_bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store uploaded file"))?;

    let document = services::documents::save_or_replace(
        &state,
        candidate.id,
        document_type_id,
        &file_key,
        subtype,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to persist document"))?;

    metrics::counter!("documents_uploaded_total").increment(1);
    notify_extraction_queue(&state, document.id, &file_key, &document_type, &candidate, subtype)
        .await;

    Ok(Json(UploadResponse {
        id: document.id,
        status: document.status,
        uploaded_at: format_primitive(document.uploaded_at),
        message: "Upload stored; the document is under review".to_string(),
    }))
}

async fn reupload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_upload_form(&mut multipart, &state).await?;
    let UploadForm { candidate_id, document_id, subtype, file_bytes, filename, content_type, .. } =
        form;

    let candidate_id =
        candidate_id.ok_or_else(|| ApiError::BadRequest("candidate_id is required".to_string()))?;
    let document_id =
        document_id.ok_or_else(|| ApiError::BadRequest("document_id is required".to_string()))?;

    let candidate = fetch_candidate(&state, candidate_id).await?;

    let existing = repositories::documents::find_by_id(state.db(), document_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch document"))?
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    if existing.candidate_id != candidate.id {
        return Err(ApiError::Forbidden("Document does not belong to this candidate"));
    }

    let document_type = fetch_document_type(&state, existing.document_type_id).await?;
    let subtype = subtype_for_type(&state, existing.document_type_id, subtype.as_deref())?;

    let (file_bytes, filename, content_type) = required_file(file_bytes, filename, content_type)?;
    let extension = validate_document_upload(
        &filename,
        &content_type,
        &state.settings().documents().allowed_extensions,
    )?;

    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("Object storage is not configured".to_string())
    })?;

    let file_key = format!("documents/{}/{}.{extension}", candidate.id, Uuid::new_v4());
    storage
        .upload_bytes(&file_key, &content_type, file_bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store uploaded file"))?;

    let document = services::documents::reupload(&state, document_id, &file_key, subtype).await?;

    metrics::counter!("documents_uploaded_total").increment(1);
    notify_extraction_queue(&state, document.id, &file_key, &document_type, &candidate, subtype)
        .await;

    Ok(Json(UploadResponse {
        id: document.id,
        status: document.status,
        uploaded_at: format_primitive(document.uploaded_at),
        message: "Re-upload stored; the document is under review".to_string(),
    }))
}

async fn list_document_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentTypeResponse>>, ApiError> {
    let types = repositories::document_types::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list document types"))?;

    let response = types
        .into_iter()
        .map(|document_type| DocumentTypeResponse {
            id: document_type.id,
            name: document_type.name,
            required: document_type.required,
        })
        .collect();

    Ok(Json(response))
}

/// Extraction pipeline callback: records the review verdict and, on
/// approval, kicks off enrollment reconciliation in the background.
async fn update_document_status(
    _: ExtractionApiKey,
    State(state): State<AppState>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    let document = services::documents::update_status(
        &state,
        payload.document_id,
        payload.status,
        payload.extracted_data,
        payload.rejection_reason.as_deref(),
    )
    .await?;

    Ok(Json(StatusUpdateResponse {
        document_id: document.id,
        status: document.status,
        message: "Status updated".to_string(),
    }))
}

async fn read_upload_form(
    multipart: &mut Multipart,
    state: &AppState,
) -> Result<UploadForm, ApiError> {
    let max_mb = state.settings().documents().max_upload_size_mb;
    let max_bytes = max_mb * 1024 * 1024;
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                form.filename = field.file_name().map(|s| s.to_string());
                form.content_type = field.content_type().map(|s| s.to_string());
                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
                {
                    let next_size = bytes.len() as u64 + chunk.len() as u64;
                    if next_size > max_bytes {
                        return Err(ApiError::BadRequest(format!(
                            "File size exceeds {max_mb}MB limit"
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                form.file_bytes = Some(bytes);
            }
            "candidate_id" => {
                form.candidate_id = Some(parse_int_field(field, "candidate_id").await?)
            }
            "document_id" => form.document_id = Some(parse_int_field(field, "document_id").await?),
            "document_type" => {
                form.document_type = Some(parse_int_field(field, "document_type").await?)
            }
            "subtype" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid subtype".to_string()))?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    form.subtype = Some(trimmed.to_string());
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn parse_int_field(
    field: axum::extract::multipart::Field<'_>,
    name: &'static str,
) -> Result<i32, ApiError> {
    let text =
        field.text().await.map_err(|_| ApiError::BadRequest(format!("Invalid {name}")))?;
    text.trim()
        .parse::<i32>()
        .map_err(|_| ApiError::BadRequest(format!("{name} must be a valid integer")))
}

fn required_file(
    file_bytes: Option<Vec<u8>>,
    filename: Option<String>,
    content_type: Option<String>,
) -> Result<(Vec<u8>, String, String), ApiError> {
    let bytes = file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }
    let filename = filename.unwrap_or_else(|| "document.pdf".to_string());
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    Ok((bytes, filename, content_type))
}

/// Identity documents carry a subtype naming which card was submitted;
/// other types ignore it.
fn subtype_for_type<'a>(
    state: &AppState,
    document_type_id: i32,
    subtype: Option<&'a str>,
) -> Result<Option<&'a str>, ApiError> {
    if document_type_id == state.settings().documents().identity_type_id {
        if subtype.is_none() {
            return Err(ApiError::BadRequest(
                "Subtype is required for identity documents (RG or CIN)".to_string(),
            ));
        }
        Ok(subtype)
    } else {
        Ok(None)
    }
}

async fn fetch_candidate(state: &AppState, candidate_id: i32) -> Result<Candidate, ApiError> {
    repositories::candidates::find_by_id(state.db(), candidate_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch candidate"))?
        .ok_or_else(|| ApiError::NotFound("Candidate not found".to_string()))
}

async fn fetch_document_type(
    state: &AppState,
    document_type_id: i32,
) -> Result<DocumentType, ApiError> {
    repositories::document_types::find_by_id(state.db(), document_type_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch document type"))?
        .ok_or_else(|| ApiError::BadRequest("Invalid document type".to_string()))
}

async fn notify_extraction_queue(
    state: &AppState,
    document_id: i32,
    file_key: &str,
    document_type: &DocumentType,
    candidate: &Candidate,
    subtype: Option<&str>,
) {
    let Some(queue) = state.queue() else {
        return;
    };

    let notification = UploadNotification {
        document_id,
        file_key,
        document_type: &document_type.name,
        national_id: &candidate.national_id,
        subtype,
    };

    if let Err(err) = queue.notify_upload(&notification).await {
        tracing::warn!(document_id, error = %err, "Failed to enqueue extraction notification");
    }
}

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::validation::content_type_for_extension;
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::db::models::Enrollment;
use crate::db::types::EnrollmentStatus;
use crate::repositories;
use crate::schemas::candidate::CandidateResponse;
use crate::schemas::document::DocumentResponse;
use crate::schemas::enrollment::{
    ApproveRequest, EnrollmentDecisionResponse, EnrollmentDetails, EnrollmentSummary,
    RejectRequest, SectionResponse, SweepResponse,
};
use crate::services;
use crate::tasks;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/review", get(list_for_review))
        .route("/process-pending", post(process_pending))
        .route("/:enrollment_id", get(get_details))
        .route("/:enrollment_id/approve", post(approve))
        .route("/:enrollment_id/reject", post(reject))
        .route("/:enrollment_id/verify", post(verify_documents))
        .route("/documents/:document_id/download", get(download_document))
        .route("/documents/:document_id/view", get(view_document))
}

#[derive(Debug, Deserialize)]
struct ReviewQuery {
    status: Option<String>,
}

async fn list_for_review(
    Query(query): Query<ReviewQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<EnrollmentSummary>>, ApiError> {
    let status = query.status.as_deref().map(parse_status_filter).transpose()?;

    let rows = repositories::enrollments::list_for_review(state.db(), status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    Ok(Json(rows.into_iter().map(EnrollmentSummary::from_row).collect()))
}

async fn get_details(
    Path(enrollment_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentDetails>, ApiError> {
    let enrollment = fetch_enrollment(&state, enrollment_id).await?;
    let details = build_details(&state, enrollment).await?;
    Ok(Json(details))
}

async fn approve(
    Path(enrollment_id): Path<i32>,
    State(state): State<AppState>,
    Json(payload): Json<ApproveRequest>,
) -> Result<Json<EnrollmentDecisionResponse>, ApiError> {
    let updated =
        services::enrollment::approve(&state, enrollment_id, payload.observations.as_deref())
            .await?;
    Ok(Json(EnrollmentDecisionResponse::from_db(updated)))
}

async fn reject(
    Path(enrollment_id): Path<i32>,
    State(state): State<AppState>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<EnrollmentDecisionResponse>, ApiError> {
    let updated =
        services::enrollment::reject(&state, enrollment_id, &payload.observations).await?;
    Ok(Json(EnrollmentDecisionResponse::from_db(updated)))
}

/// Manual re-run of the verification call for one enrollment. Skips the
/// reconciler's completeness and novelty gates on purpose: an operator
/// asking for a re-check wants the call made now. The outcome (including a
/// transport failure) lands on the record the same way as the automated
/// path.
async fn verify_documents(
    Path(enrollment_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    fetch_enrollment(&state, enrollment_id).await?;

    services::enrollment::run_verification(&state, enrollment_id).await;

    Ok(Json(serde_json::json!({ "message": "Verification executed" })))
}

async fn process_pending(State(state): State<AppState>) -> Result<Json<SweepResponse>, ApiError> {
    let processed = tasks::precheck::sweep(&state)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to process pending enrollments"))?;

    Ok(Json(SweepResponse { processed }))
}

async fn download_document(
    Path(document_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let document = repositories::documents::find_by_id(state.db(), document_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch document"))?
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    if document.file_key.is_empty() {
        return Err(ApiError::NotFound("Document has no stored file".to_string()));
    }

    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("Object storage is not configured".to_string())
    })?;

    let bytes = storage.download_bytes(&document.file_key).await.map_err(|err| {
        tracing::warn!(document_id, error = %err, "Stored object could not be fetched");
        ApiError::NotFound("Stored file not found".to_string())
    })?;

    let extension =
        document.file_key.rsplit('.').next().unwrap_or("pdf").to_ascii_lowercase();
    let content_type = content_type_for_extension(&extension);
    let disposition = format!("attachment; filename=\"document_{document_id}.{extension}\"");

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// Short-lived presigned URL for previewing a stored document in the
/// review UI without proxying the bytes through the API.
async fn view_document(
    Path(document_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let document = repositories::documents::find_by_id(state.db(), document_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch document"))?
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("Object storage is not configured".to_string())
    })?;

    let expires = std::time::Duration::from_secs(
        state.settings().documents().presigned_url_expire_minutes * 60,
    );
    let url = storage
        .presign_get(&document.file_key, expires)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate presigned URL"))?;

    Ok(Json(serde_json::json!({ "url": url })))
}

/// Assembles the admin/candidate detail view: profile, assigned section,
/// uploaded documents, and placeholder rows for required types that were
/// never submitted.
pub(crate) async fn build_details(
    state: &AppState,
    enrollment: Enrollment,
) -> Result<EnrollmentDetails, ApiError> {
    let candidate = repositories::candidates::find_by_id(state.db(), enrollment.candidate_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch candidate"))?
        .ok_or_else(|| {
            ApiError::Internal(format!(
                "Enrollment {} has no candidate record",
                enrollment.id
            ))
        })?;

    let section = match enrollment.section_id {
        Some(section_id) => {
            repositories::sections::find_detail_by_id(state.db(), section_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch section"))?
                .map(SectionResponse::from_detail)
        }
        None => None,
    };

    let documents = repositories::documents::list_by_candidate(state.db(), candidate.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list documents"))?;
    let document_types = repositories::document_types::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list document types"))?;

    let submitted_types: HashSet<i32> =
        documents.iter().map(|document| document.document_type_id).collect();

    let mut document_responses: Vec<DocumentResponse> =
        documents.into_iter().map(DocumentResponse::from_db).collect();
    document_responses.extend(
        document_types
            .iter()
            .filter(|document_type| {
                document_type.required && !submitted_types.contains(&document_type.id)
            })
            .map(DocumentResponse::placeholder),
    );

    Ok(EnrollmentDetails {
        id: enrollment.id,
        status: enrollment.status,
        precheck_status: enrollment.precheck_status,
        precheck_note: enrollment.precheck_note,
        candidate: CandidateResponse::from_db(candidate),
        section,
        documents: document_responses,
        observations: enrollment.observations,
        updated_at: enrollment.updated_at.map(format_primitive),
    })
}

async fn fetch_enrollment(state: &AppState, enrollment_id: i32) -> Result<Enrollment, ApiError> {
    repositories::enrollments::find_by_id(state.db(), enrollment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?
        .ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))
}

fn parse_status_filter(raw: &str) -> Result<EnrollmentStatus, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" => Ok(EnrollmentStatus::Pending),
        "approved" => Ok(EnrollmentStatus::Approved),
        other => Err(ApiError::BadRequest(format!("Unknown enrollment status '{other}'"))),
    }
}

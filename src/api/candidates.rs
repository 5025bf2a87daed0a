use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use time::Date;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::candidate::{CandidateCreate, CandidateResponse};
use crate::schemas::document::DocumentResponse;
use crate::schemas::enrollment::EnrollmentDetails;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_candidate))
        .route("/:candidate_id", get(get_candidate))
        .route("/:candidate_id/documents", get(list_candidate_documents))
        .route("/:candidate_id/enrollment", get(get_candidate_enrollment))
}

async fn create_candidate(
    State(state): State<AppState>,
    Json(payload): Json<CandidateCreate>,
) -> Result<(axum::http::StatusCode, Json<CandidateResponse>), ApiError> {
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let birth_date = payload
        .birth_date
        .as_deref()
        .map(parse_birth_date)
        .transpose()?;

    let existing =
        repositories::candidates::find_by_national_id(state.db(), payload.national_id.trim())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check existing candidate"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "A candidate with this national id already exists".to_string(),
        ));
    }

    let candidate = repositories::candidates::create(
        state.db(),
        repositories::candidates::CreateCandidate {
            full_name: payload.full_name.trim(),
            national_id: payload.national_id.trim(),
            email: payload.email.trim(),
            phone: payload.phone.as_deref(),
            birth_date,
            social_name: payload.social_name.as_deref(),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create candidate"))?;

    Ok((axum::http::StatusCode::CREATED, Json(CandidateResponse::from_db(candidate))))
}

async fn get_candidate(
    Path(candidate_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<CandidateResponse>, ApiError> {
    let candidate = repositories::candidates::find_by_id(state.db(), candidate_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch candidate"))?
        .ok_or_else(|| ApiError::NotFound("Candidate not found".to_string()))?;

    Ok(Json(CandidateResponse::from_db(candidate)))
}

async fn list_candidate_documents(
    Path(candidate_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    repositories::candidates::find_by_id(state.db(), candidate_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch candidate"))?
        .ok_or_else(|| ApiError::NotFound("Candidate not found".to_string()))?;

    let documents = repositories::documents::list_by_candidate(state.db(), candidate_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list documents"))?;

    Ok(Json(documents.into_iter().map(DocumentResponse::from_db).collect()))
}

async fn get_candidate_enrollment(
    Path(candidate_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentDetails>, ApiError> {
    let enrollment = repositories::enrollments::find_latest_by_candidate(state.db(), candidate_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?
        .ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))?;

    let details = crate::api::enrollments::build_details(&state, enrollment).await?;
    Ok(Json(details))
}

fn parse_birth_date(value: &str) -> Result<Date, ApiError> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(value, &format)
        .map_err(|_| ApiError::BadRequest("birth_date must be an ISO date (YYYY-MM-DD)".to_string()))
}

use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Document;
use crate::db::types::DocumentStatus;

const COLUMNS: &str = "\
    id, candidate_id, document_type_id, subtype, file_key, status, \
    extracted_data, rejection_reason, uploaded_at, validated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(&format!("SELECT {COLUMNS} FROM documents WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_candidate(
    pool: &PgPool,
    candidate_id: i32,
) -> Result<Vec<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(&format!(
        "SELECT {COLUMNS} FROM documents WHERE candidate_id = $1 ORDER BY document_type_id"
    ))
    .bind(candidate_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_candidate_and_type(
    pool: &PgPool,
    candidate_id: i32,
    document_type_id: i32,
) -> Result<Option<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(&format!(
        "SELECT {COLUMNS} FROM documents WHERE candidate_id = $1 AND document_type_id = $2"
    ))
    .bind(candidate_id)
    .bind(document_type_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateDocument<'a> {
    pub candidate_id: i32,
    pub document_type_id: i32,
    pub subtype: Option<&'a str>,
    pub file_key: &'a str,
    pub uploaded_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateDocument<'_>,
) -> Result<Document, sqlx::Error> {
    sqlx::query_as::<_, Document>(&format!(
        "INSERT INTO documents (candidate_id, document_type_id, subtype, file_key, status, uploaded_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}",
    ))
    .bind(params.candidate_id)
    .bind(params.document_type_id)
    .bind(params.subtype)
    .bind(params.file_key)
    .bind(DocumentStatus::Review)
    .bind(params.uploaded_at)
    .fetch_one(pool)
    .await
}

/// Point an existing row at a new stored object. The review cycle restarts:
/// status back to `review`, extraction output and rejection reason cleared,
/// validation timestamp cleared.
pub(crate) async fn replace_file(
    pool: &PgPool,
    id: i32,
    file_key: &str,
    subtype: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<Document, sqlx::Error> {
    sqlx::query_as::<_, Document>(&format!(
        "UPDATE documents
         SET file_key = $1,
             subtype = $2,
             status = $3,
             extracted_data = NULL,
             rejection_reason = NULL,
             uploaded_at = $4,
             validated_at = NULL
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(file_key)
    .bind(subtype)
    .bind(DocumentStatus::Review)
    .bind(now)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update_status(
    pool: &PgPool,
    id: i32,
    status: DocumentStatus,
    extracted_data: Option<serde_json::Value>,
    rejection_reason: Option<&str>,
    validated_at: PrimitiveDateTime,
) -> Result<Document, sqlx::Error> {
    sqlx::query_as::<_, Document>(&format!(
        "UPDATE documents
         SET status = $1,
             extracted_data = COALESCE($2, extracted_data),
             rejection_reason = COALESCE($3, rejection_reason),
             validated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(status)
    .bind(extracted_data.map(Json))
    .bind(rejection_reason)
    .bind(validated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}

/// Validation timestamp of the candidate's most recently approved document.
pub(crate) async fn latest_approved_validated_at(
    pool: &PgPool,
    candidate_id: i32,
) -> Result<Option<PrimitiveDateTime>, sqlx::Error> {
    sqlx::query_scalar::<_, PrimitiveDateTime>(
        "SELECT validated_at FROM documents
         WHERE candidate_id = $1 AND status = $2 AND validated_at IS NOT NULL
         ORDER BY validated_at DESC
         LIMIT 1",
    )
    .bind(candidate_id)
    .bind(DocumentStatus::Approved)
    .fetch_optional(pool)
    .await
}

use sqlx::{FromRow, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::Enrollment;
use crate::db::types::{precheck, EnrollmentStatus};

const COLUMNS: &str = "\
    id, candidate_id, section_id, status, precheck_status, precheck_note, \
    observations, enrolled_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!("SELECT {COLUMNS} FROM enrollments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Most recent enrollment for a candidate. The schema allows duplicates to
/// exist historically; the latest inscription is authoritative.
pub(crate) async fn find_latest_by_candidate(
    pool: &PgPool,
    candidate_id: i32,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments
         WHERE candidate_id = $1
         ORDER BY enrolled_at DESC
         LIMIT 1"
    ))
    .bind(candidate_id)
    .fetch_optional(pool)
    .await
}

/// Creates the record with both statuses pending and no update timestamp;
/// the first pre-check attempt is what stamps `updated_at`.
pub(crate) async fn create(
    pool: &PgPool,
    candidate_id: i32,
    enrolled_at: PrimitiveDateTime,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "INSERT INTO enrollments (candidate_id, status, precheck_status, enrolled_at)
         VALUES ($1, $2, $3, $4)
         RETURNING {COLUMNS}",
    ))
    .bind(candidate_id)
    .bind(EnrollmentStatus::Pending)
    .bind(precheck::PENDING)
    .bind(enrolled_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_pending_precheck(pool: &PgPool) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments WHERE precheck_status = $1 ORDER BY enrolled_at"
    ))
    .bind(precheck::PENDING)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ReviewRow {
    pub(crate) id: i32,
    pub(crate) candidate_id: i32,
    pub(crate) candidate_name: String,
    pub(crate) candidate_national_id: String,
    pub(crate) section_id: Option<i32>,
    pub(crate) section_code: Option<String>,
    pub(crate) course_name: Option<String>,
    pub(crate) status: EnrollmentStatus,
    pub(crate) precheck_status: String,
    pub(crate) precheck_note: Option<String>,
    pub(crate) enrolled_at: PrimitiveDateTime,
}

const REVIEW_SELECT: &str = "\
    SELECT e.id, e.candidate_id, c.full_name AS candidate_name, \
           c.national_id AS candidate_national_id, \
           e.section_id, s.code AS section_code, co.name AS course_name, \
           e.status, e.precheck_status, e.precheck_note, e.enrolled_at \
    FROM enrollments e \
    JOIN candidates c ON c.id = e.candidate_id \
    LEFT JOIN sections s ON s.id = e.section_id \
    LEFT JOIN courses co ON co.id = s.course_id";

/// Review queue: pre-check approved, optionally narrowed by the human
/// decision status.
pub(crate) async fn list_for_review(
    pool: &PgPool,
    status: Option<EnrollmentStatus>,
) -> Result<Vec<ReviewRow>, sqlx::Error> {
    match status {
        Some(status) => {
            sqlx::query_as::<_, ReviewRow>(&format!(
                "{REVIEW_SELECT} WHERE e.precheck_status = $1 AND e.status = $2 ORDER BY e.enrolled_at DESC"
            ))
            .bind(precheck::APPROVED)
            .bind(status)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, ReviewRow>(&format!(
                "{REVIEW_SELECT} WHERE e.precheck_status = $1 ORDER BY e.enrolled_at DESC"
            ))
            .bind(precheck::APPROVED)
            .fetch_all(pool)
            .await
        }
    }
}

/// Conditional claim of the `processing` marker. Returns false when another
/// worker already holds it, which closes the read-then-write race between
/// concurrent reconciliations sharing one database.
pub(crate) async fn mark_processing(
    pool: &PgPool,
    id: i32,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE enrollments
         SET precheck_status = $1, updated_at = $2
         WHERE id = $3 AND precheck_status <> $1",
    )
    .bind(precheck::PROCESSING)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(updated.rows_affected() > 0)
}

pub(crate) async fn record_precheck_result(
    pool: &PgPool,
    id: i32,
    precheck_status: &str,
    precheck_note: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE enrollments
         SET precheck_status = $1, precheck_note = $2, updated_at = $3
         WHERE id = $4",
    )
    .bind(precheck_status)
    .bind(precheck_note)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Human approval: only the decision status and observations change.
pub(crate) async fn approve(
    pool: &PgPool,
    id: i32,
    observations: Option<&str>,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments
         SET status = $1, observations = $2
         WHERE id = $3
         RETURNING {COLUMNS}",
    ))
    .bind(EnrollmentStatus::Approved)
    .bind(observations)
    .bind(id)
    .fetch_one(pool)
    .await
}

/// Human rejection keeps the record pending and re-arms the automated
/// pre-check by resetting its status.
pub(crate) async fn reject(
    pool: &PgPool,
    id: i32,
    observations: &str,
    now: PrimitiveDateTime,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments
         SET status = $1, precheck_status = $2, observations = $3, updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(EnrollmentStatus::Pending)
    .bind(precheck::PENDING)
    .bind(observations)
    .bind(now)
    .bind(id)
    .fetch_one(pool)
    .await
}

use sqlx::PgPool;
use time::{Date, PrimitiveDateTime};

use crate::db::models::Candidate;

const COLUMNS: &str =
    "id, full_name, national_id, email, phone, birth_date, social_name, created_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Candidate>, sqlx::Error> {
    sqlx::query_as::<_, Candidate>(&format!("SELECT {COLUMNS} FROM candidates WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_national_id(
    pool: &PgPool,
    national_id: &str,
) -> Result<Option<Candidate>, sqlx::Error> {
    sqlx::query_as::<_, Candidate>(&format!(
        "SELECT {COLUMNS} FROM candidates WHERE national_id = $1"
    ))
    .bind(national_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateCandidate<'a> {
    pub full_name: &'a str,
    pub national_id: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub birth_date: Option<Date>,
    pub social_name: Option<&'a str>,
    pub created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateCandidate<'_>,
) -> Result<Candidate, sqlx::Error> {
    sqlx::query_as::<_, Candidate>(&format!(
        "INSERT INTO candidates (full_name, national_id, email, phone, birth_date, social_name, created_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}",
    ))
    .bind(params.full_name)
    .bind(params.national_id)
    .bind(params.email)
    .bind(params.phone)
    .bind(params.birth_date)
    .bind(params.social_name)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

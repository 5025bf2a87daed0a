use sqlx::PgPool;

use crate::db::models::DocumentType;

const COLUMNS: &str = "id, name, required, created_at";

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<DocumentType>, sqlx::Error> {
    sqlx::query_as::<_, DocumentType>(&format!(
        "SELECT {COLUMNS} FROM document_types ORDER BY id"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: i32,
) -> Result<Option<DocumentType>, sqlx::Error> {
    sqlx::query_as::<_, DocumentType>(&format!("SELECT {COLUMNS} FROM document_types WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct SectionDetail {
    pub(crate) id: i32,
    pub(crate) code: String,
    pub(crate) term: String,
    pub(crate) shift: Option<String>,
    pub(crate) course_name: String,
}

pub(crate) async fn find_detail_by_id(
    pool: &PgPool,
    id: i32,
) -> Result<Option<SectionDetail>, sqlx::Error> {
    sqlx::query_as::<_, SectionDetail>(
        "SELECT s.id, s.code, s.term, s.shift, co.name AS course_name
         FROM sections s
         JOIN courses co ON co.id = s.course_id
         WHERE s.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

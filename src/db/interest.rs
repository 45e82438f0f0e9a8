use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{dto::InterestForm, models::Interest, PGPool};

pub async fn create(executor: impl PgExecutor<'_>, form: &InterestForm) -> Result<Interest, sqlx::Error> {
    sqlx::query_as::<_, Interest>(
        "INSERT INTO interests (id, name, email, phone, company, training_name, periods, comments)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&form.name)
    .bind(&form.email)
    .bind(&form.phone)
    .bind(&form.company)
    .bind(&form.training_name)
    .bind(&form.periods)
    .bind(&form.comments)
    .fetch_one(executor)
    .await
}

/// Whether an interest for the same email and training was recorded after `since`.
pub async fn exists_since(
    executor: impl PgExecutor<'_>,
    email: &str,
    training_name: &str,
    since: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM interests
        WHERE email = $1 AND lower(training_name) = lower($2) AND created_at > $3)",
    )
    .bind(email)
    .bind(training_name)
    .bind(since)
    .fetch_one(executor)
    .await
}

pub async fn get_all(pool: &PGPool) -> Result<Vec<Interest>, sqlx::Error> {
    sqlx::query_as::<_, Interest>("SELECT * FROM interests ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn delete(id: Uuid, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM interests WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

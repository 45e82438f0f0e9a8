use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    dto::{self, ContactDetails},
    models::User,
    PGPool,
};

/// Inserts the user or, when the email is already known, refreshes the contact columns.
/// The access key of an existing user is kept.
pub async fn upsert_by_email(
    executor: impl PgExecutor<'_>,
    contact: &ContactDetails,
    access_key: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, name, phone, company, access_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE SET
            name = EXCLUDED.name,
            phone = COALESCE(EXCLUDED.phone, users.phone),
            company = COALESCE(EXCLUDED.company, users.company),
            updated_at = now()
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&contact.email)
    .bind(&contact.name)
    .bind(&contact.phone)
    .bind(&contact.company)
    .bind(access_key)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id(id: Uuid, pool: &PGPool) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn get_by_access_key(access_key: &str, pool: &PGPool) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE access_key = $1 AND active")
        .bind(access_key)
        .fetch_one(pool)
        .await
}

pub async fn get_all(filter: &dto::UserFilter, pool: &PGPool) -> Result<Vec<User>, sqlx::Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT * FROM users WHERE TRUE");
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = super::like_pattern(q);
        query_builder.push(" AND (name ILIKE ");
        query_builder.push_bind(pattern.clone());
        query_builder.push(" OR email ILIKE ");
        query_builder.push_bind(pattern.clone());
        query_builder.push(" OR company ILIKE ");
        query_builder.push_bind(pattern);
        query_builder.push(")");
    }
    if let Some(active) = filter.active {
        query_builder.push(" AND active = ");
        query_builder.push_bind(active);
    }
    query_builder.push(" ORDER BY name");
    query_builder
        .build_query_as::<User>()
        .fetch_all(pool)
        .await
}

pub async fn set_fields(id: Uuid, user_fields: dto::UpdateUserDto, pool: &PGPool) -> Result<u64, sqlx::Error> {
    match user_fields.get_values() {
        Some(fields) => {
            let mut query_builder = super::update_builder("users", fields);
            query_builder.push(" WHERE id = ");
            query_builder.push_bind(id);
            let res = query_builder.build().execute(pool).await?;
            Ok(res.rows_affected())
        }
        None => Ok(0u64),
    }
}

pub async fn set_access_key(id: Uuid, access_key: &str, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("UPDATE users SET access_key = $1, updated_at = now() WHERE id = $2")
        .bind(access_key)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn delete(id: Uuid, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

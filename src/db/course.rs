use chrono::{DateTime, Utc};
use sqlx::{postgres::PgQueryResult, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    dto,
    models::{Course, CourseWithCount},
    PGPool,
};

const WITH_COUNT: &str = "SELECT c.*, (SELECT COUNT(*) FROM course_participants cp
    WHERE cp.course_id = c.id AND cp.payment_status <> 'cancelled') AS enrolled
    FROM courses c";

pub async fn create(course: &Course, pool: &PGPool) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        "INSERT INTO courses (id, name, description, course_date, location, price_cents, max_participants, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(course.id)
    .bind(&course.name)
    .bind(&course.description)
    .bind(course.course_date)
    .bind(&course.location)
    .bind(course.price_cents)
    .bind(course.max_participants)
    .bind(course.active)
    .execute(pool)
    .await
}

pub async fn get_by_id(id: Uuid, pool: &PGPool) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Reads the course and holds its row lock until the surrounding transaction ends,
/// serialising enrollments for the same course.
pub async fn lock_by_id(executor: impl PgExecutor<'_>, id: Uuid) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn count_active_participants(executor: impl PgExecutor<'_>, id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM course_participants WHERE course_id = $1 AND payment_status <> 'cancelled'",
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

pub async fn get_with_count(id: Uuid, pool: &PGPool) -> Result<CourseWithCount, sqlx::Error> {
    sqlx::query_as::<_, CourseWithCount>(&format!("{WITH_COUNT} WHERE c.id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn get_all(filter: &dto::CourseFilter, pool: &PGPool) -> Result<Vec<CourseWithCount>, sqlx::Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(WITH_COUNT);
    query_builder.push(" WHERE TRUE");
    if let Some(active) = filter.active {
        query_builder.push(" AND c.active = ");
        query_builder.push_bind(active);
    }
    if let Some(location) = filter.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        query_builder.push(" AND c.location ILIKE ");
        query_builder.push_bind(super::like_pattern(location));
    }
    if let Some(from) = filter.from {
        query_builder.push(" AND c.course_date >= ");
        query_builder.push_bind(from);
    }
    if let Some(to) = filter.to {
        query_builder.push(" AND c.course_date < ");
        query_builder.push_bind(to);
    }
    query_builder.push(" ORDER BY c.course_date");
    query_builder
        .build_query_as::<CourseWithCount>()
        .fetch_all(pool)
        .await
}

pub async fn upcoming(after: DateTime<Utc>, limit: i64, pool: &PGPool) -> Result<Vec<CourseWithCount>, sqlx::Error> {
    sqlx::query_as::<_, CourseWithCount>(&format!(
        "{WITH_COUNT} WHERE c.active AND c.course_date >= $1 ORDER BY c.course_date LIMIT $2"
    ))
    .bind(after)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn set_fields(id: Uuid, course_fields: dto::UpdateCourseDto, pool: &PGPool) -> Result<u64, sqlx::Error> {
    match course_fields.get_values() {
        Some(fields) => {
            let mut query_builder = super::update_builder("courses", fields);
            query_builder.push(" WHERE id = ");
            query_builder.push_bind(id);
            let res = query_builder.build().execute(pool).await?;
            Ok(res.rows_affected())
        }
        None => Ok(0u64),
    }
}

/// Fails with a foreign key violation while enrollments still reference the course.
pub async fn delete(id: Uuid, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

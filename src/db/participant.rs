use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    models::{CourseParticipant, ParticipantDetail, PaymentStatus},
    PGPool,
};

const DETAIL: &str = "SELECT cp.id, cp.user_id, cp.course_id, cp.payment_status, cp.enrollment_date, cp.notes,
    u.name, u.email, u.company, c.name AS course_name, c.course_date, c.location
    FROM course_participants cp
    JOIN users u ON u.id = cp.user_id
    JOIN courses c ON c.id = cp.course_id";

pub async fn create(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    course_id: Uuid,
    payment_status: PaymentStatus,
    notes: Option<&str>,
) -> Result<CourseParticipant, sqlx::Error> {
    sqlx::query_as::<_, CourseParticipant>(
        "INSERT INTO course_participants (id, user_id, course_id, payment_status, notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(course_id)
    .bind(payment_status)
    .bind(notes)
    .fetch_one(executor)
    .await
}

/// The enrollment of the user for the course that still holds a seat, if any.
pub async fn find_active(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    course_id: Uuid,
) -> Result<Option<CourseParticipant>, sqlx::Error> {
    sqlx::query_as::<_, CourseParticipant>(
        "SELECT * FROM course_participants
        WHERE user_id = $1 AND course_id = $2 AND payment_status <> 'cancelled'",
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await
}

pub async fn get_detail(id: Uuid, pool: &PGPool) -> Result<ParticipantDetail, sqlx::Error> {
    sqlx::query_as::<_, ParticipantDetail>(&format!("{DETAIL} WHERE cp.id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn list_for_course(course_id: Uuid, pool: &PGPool) -> Result<Vec<ParticipantDetail>, sqlx::Error> {
    sqlx::query_as::<_, ParticipantDetail>(&format!(
        "{DETAIL} WHERE cp.course_id = $1 ORDER BY cp.enrollment_date"
    ))
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_user(user_id: Uuid, pool: &PGPool) -> Result<Vec<ParticipantDetail>, sqlx::Error> {
    sqlx::query_as::<_, ParticipantDetail>(&format!(
        "{DETAIL} WHERE cp.user_id = $1 ORDER BY c.course_date DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn set_payment_status(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    payment_status: PaymentStatus,
) -> Result<CourseParticipant, sqlx::Error> {
    sqlx::query_as::<_, CourseParticipant>(
        "UPDATE course_participants SET payment_status = $1 WHERE id = $2 RETURNING *",
    )
    .bind(payment_status)
    .bind(id)
    .fetch_one(executor)
    .await
}

use sqlx::prelude::FromRow;

use crate::PGPool;

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct DashboardCounts {
    pub active_courses: i64,
    pub active_users: i64,
    pub active_enrollments: i64,
    pub pending_payments: i64,
    pub paid_revenue_cents: i64,
    pub new_incompany_requests: i64,
    pub recent_interests: i64,
    pub queued_emails: i64,
    pub failed_emails: i64,
}

pub async fn dashboard_counts(pool: &PGPool) -> Result<DashboardCounts, sqlx::Error> {
    sqlx::query_as::<_, DashboardCounts>(
        "SELECT
            (SELECT COUNT(*) FROM courses WHERE active) AS active_courses,
            (SELECT COUNT(*) FROM users WHERE active) AS active_users,
            (SELECT COUNT(*) FROM course_participants WHERE payment_status <> 'cancelled') AS active_enrollments,
            (SELECT COUNT(*) FROM course_participants WHERE payment_status = 'pending') AS pending_payments,
            (SELECT COALESCE(SUM(c.price_cents), 0)::BIGINT FROM course_participants cp
                JOIN courses c ON c.id = cp.course_id
                WHERE cp.payment_status = 'paid') AS paid_revenue_cents,
            (SELECT COUNT(*) FROM incompany_requests WHERE status = 'new') AS new_incompany_requests,
            (SELECT COUNT(*) FROM interests WHERE created_at > now() - interval '30 days') AS recent_interests,
            (SELECT COUNT(*) FROM email_queue WHERE status = 'pending') AS queued_emails,
            (SELECT COUNT(*) FROM email_queue WHERE status = 'failed') AS failed_emails",
    )
    .fetch_one(pool)
    .await
}

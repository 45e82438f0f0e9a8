use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    models::{EmailQueueItem, EmailStatus},
    PGPool,
};

#[derive(Debug, Clone)]
pub struct NewEmail {
    pub recipient: String,
    pub subject: String,
    pub template: &'static str,
    pub body: String,
    pub send_after: DateTime<Utc>,
}

pub async fn enqueue(executor: impl PgExecutor<'_>, email: &NewEmail) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO email_queue (id, recipient, subject, template, body, send_after)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(&email.recipient)
    .bind(&email.subject)
    .bind(email.template)
    .bind(&email.body)
    .bind(email.send_after)
    .fetch_one(executor)
    .await
}

/// Puts items left in `sending` by a crashed run back to `pending`.
pub async fn reset_stale(older_than: DateTime<Utc>, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE email_queue SET status = 'pending', updated_at = now()
        WHERE status = 'sending' AND updated_at < $1",
    )
    .bind(older_than)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

/// Claims up to `limit` due items: marks them `sending` and counts the attempt.
/// Rows locked by a concurrent run are skipped.
pub async fn claim_batch(limit: i64, pool: &PGPool) -> Result<Vec<EmailQueueItem>, sqlx::Error> {
    sqlx::query_as::<_, EmailQueueItem>(
        "UPDATE email_queue SET status = 'sending', attempts = attempts + 1, updated_at = now()
        WHERE id IN (
            SELECT id FROM email_queue
            WHERE status = 'pending' AND send_after <= now()
            ORDER BY send_after, created_at
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING *",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn mark_sent(id: Uuid, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE email_queue SET status = 'sent', sent_at = now(), last_error = NULL, updated_at = now()
        WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

/// Records a failed attempt; the item is rescheduled at `retry_at` or marked `failed` when there is none.
pub async fn mark_failed_attempt(
    id: Uuid,
    error: &str,
    retry_at: Option<DateTime<Utc>>,
    pool: &PGPool,
) -> Result<u64, sqlx::Error> {
    let res = match retry_at {
        Some(retry_at) => {
            sqlx::query(
                "UPDATE email_queue SET status = 'pending', last_error = $1, send_after = $2, updated_at = now()
                WHERE id = $3",
            )
            .bind(error)
            .bind(retry_at)
            .bind(id)
            .execute(pool)
            .await?
        }
        None => {
            sqlx::query(
                "UPDATE email_queue SET status = 'failed', last_error = $1, updated_at = now()
                WHERE id = $2",
            )
            .bind(error)
            .bind(id)
            .execute(pool)
            .await?
        }
    };
    Ok(res.rows_affected())
}

pub async fn cancel(id: Uuid, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE email_queue SET status = 'cancelled', updated_at = now()
        WHERE id = $1 AND status = 'pending'",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

pub async fn retry(id: Uuid, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE email_queue SET status = 'pending', attempts = 0, send_after = now(), updated_at = now()
        WHERE id = $1 AND status = 'failed'",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

pub async fn get_all(status: Option<EmailStatus>, pool: &PGPool) -> Result<Vec<EmailQueueItem>, sqlx::Error> {
    match status {
        Some(status) => {
            sqlx::query_as::<_, EmailQueueItem>(
                "SELECT * FROM email_queue WHERE status = $1 ORDER BY created_at DESC LIMIT 500",
            )
            .bind(status)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, EmailQueueItem>("SELECT * FROM email_queue ORDER BY created_at DESC LIMIT 500")
                .fetch_all(pool)
                .await
        }
    }
}
